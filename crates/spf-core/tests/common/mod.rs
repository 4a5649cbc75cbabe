//! Test doubles and common utilities for contract tests
//!
//! The mocks count every mutating call so tests can assert the
//! idempotency and no-op guarantees of the reconciler.

use async_trait::async_trait;
use spf_core::error::{Error, Result};
use spf_core::notify::{DigestTransport, LiveDestination, Notifier};
use spf_core::traits::{
    ApiMessage, DnsApi, DnsRecord, FlatRecord, RecordFilter, RecordPage, SpfSplitter, SplitPlan,
    UpdateResponse, Zone,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// In-memory DnsApi double with call counters
///
/// Records live in one flat store; create and update mutate it, so a
/// second reconciliation run observes the first run's writes.
pub struct MockDnsApi {
    zones: Vec<Zone>,
    records: Mutex<Vec<DnsRecord>>,
    next_id: AtomicUsize,
    list_zones_calls: AtomicUsize,
    list_records_calls: AtomicUsize,
    add_calls: AtomicUsize,
    update_calls: AtomicUsize,
    update_success: bool,
    update_errors: Vec<ApiMessage>,
    fail_records_for: Vec<String>,
}

impl MockDnsApi {
    pub fn new(zones: Vec<Zone>) -> Self {
        Self {
            zones,
            records: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(1),
            list_zones_calls: AtomicUsize::new(0),
            list_records_calls: AtomicUsize::new(0),
            add_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            update_success: true,
            update_errors: Vec::new(),
            fail_records_for: Vec::new(),
        }
    }

    /// Seed an existing TXT record with a provider-assigned id
    pub fn with_txt(self, name: &str, content: &str) -> Self {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().push(DnsRecord {
            id: Some(format!("rec-{id}")),
            name: name.to_string(),
            record_type: "TXT".to_string(),
            content: content.to_string(),
            ttl: 300,
            comment: None,
            proxied: false,
        });
        self
    }

    /// Make every update fail with the given provider messages
    /// (`None` simulates a malformed error entry)
    pub fn failing_updates(mut self, messages: Vec<Option<&str>>) -> Self {
        self.update_success = false;
        self.update_errors = messages
            .into_iter()
            .map(|m| ApiMessage {
                message: m.map(str::to_string),
            })
            .collect();
        self
    }

    /// Make record listings fail for one zone id
    pub fn failing_records_for(mut self, zone_id: &str) -> Self {
        self.fail_records_for.push(zone_id.to_string());
        self
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Total mutating calls: the idempotency currency
    pub fn mutation_calls(&self) -> usize {
        self.add_calls() + self.update_calls()
    }

    /// Snapshot of the stored record with the given name
    pub fn record(&self, name: &str) -> Option<DnsRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.name == name)
            .cloned()
    }
}

#[async_trait]
impl DnsApi for MockDnsApi {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        self.list_zones_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.zones.clone())
    }

    async fn list_records(
        &self,
        zone_id: &str,
        filter: &RecordFilter,
        _page: u32,
        _per_page: u32,
    ) -> Result<RecordPage> {
        self.list_records_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_records_for.iter().any(|z| z == zone_id) {
            return Err(Error::api(format!("listing failed for zone {zone_id}")));
        }

        let result = self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| filter.name.as_deref().is_none_or(|n| r.name == n))
            .filter(|r| {
                filter
                    .record_type
                    .as_deref()
                    .is_none_or(|t| r.record_type == t)
            })
            .filter(|r| {
                filter
                    .content_contains
                    .as_deref()
                    .is_none_or(|c| r.content.contains(c))
            })
            .cloned()
            .collect();
        Ok(RecordPage {
            result,
            result_info: None,
        })
    }

    async fn add_record(
        &self,
        _zone_id: &str,
        record_type: &str,
        name: &str,
        content: &str,
        ttl: u32,
        proxied: bool,
    ) -> Result<bool> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.records.lock().unwrap().push(DnsRecord {
            id: Some(format!("rec-{id}")),
            name: name.to_string(),
            record_type: record_type.to_string(),
            content: content.to_string(),
            ttl,
            comment: None,
            proxied,
        });
        Ok(true)
    }

    async fn update_record(
        &self,
        _zone_id: &str,
        record_id: &str,
        record: &DnsRecord,
    ) -> Result<UpdateResponse> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if !self.update_success {
            return Ok(UpdateResponse {
                success: false,
                errors: self.update_errors.clone(),
            });
        }

        let mut records = self.records.lock().unwrap();
        if let Some(stored) = records
            .iter_mut()
            .find(|r| r.id.as_deref() == Some(record_id))
        {
            *stored = record.clone();
        }
        Ok(UpdateResponse {
            success: true,
            errors: Vec::new(),
        })
    }
}

/// Splitter double returning a canned plan and recording its inputs
pub struct MockSplitter {
    plan: SplitPlan,
    received: Mutex<Vec<String>>,
}

impl MockSplitter {
    /// A plan with the given primary content and sub-record entries
    pub fn with_plan(primary: &str, subs: &[(&str, &str)]) -> Self {
        let mut plan = SplitPlan::new();
        for (name, content) in subs {
            plan.insert(*name, *content);
        }
        plan.insert(spf_core::traits::PRIMARY_KEY, primary);
        Self {
            plan,
            received: Mutex::new(Vec::new()),
        }
    }

    /// A primary-only, degenerate plan
    pub fn degenerate(primary: &str) -> Self {
        Self::with_plan(primary, &[])
    }

    /// The SPF texts handed to `flatten_from_text`
    pub fn received_texts(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpfSplitter for MockSplitter {
    async fn flatten_from_text(&self, zone: &str, spf_text: &str) -> Result<FlatRecord> {
        self.received.lock().unwrap().push(spf_text.to_string());
        Ok(FlatRecord {
            zone: zone.to_string(),
            content: spf_text.to_string(),
        })
    }

    async fn split(
        &self,
        _flat: &FlatRecord,
        _max_chars: usize,
        _pattern: &str,
    ) -> Result<SplitPlan> {
        Ok(self.plan.clone())
    }
}

/// Live destination collecting formatted lines in arrival order
pub struct CollectingLive {
    lines: Arc<Mutex<Vec<String>>>,
}

impl CollectingLive {
    pub fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                lines: Arc::clone(&lines),
            },
            lines,
        )
    }
}

impl LiveDestination for CollectingLive {
    fn deliver(&self, line: &str) {
        self.lines.lock().unwrap().push(line.to_string());
    }
}

/// Digest transport collecting delivered bodies
pub struct CollectingTransport {
    name: &'static str,
    bodies: Arc<Mutex<Vec<String>>>,
}

impl CollectingTransport {
    pub fn new(name: &'static str) -> (Self, Arc<Mutex<Vec<String>>>) {
        let bodies = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                name,
                bodies: Arc::clone(&bodies),
            },
            bodies,
        )
    }
}

#[async_trait]
impl DigestTransport for CollectingTransport {
    fn name(&self) -> &str {
        self.name
    }

    async fn deliver(&self, _subject: &str, body: &str) -> Result<()> {
        self.bodies.lock().unwrap().push(body.to_string());
        Ok(())
    }
}

/// A notifier with one collecting live destination
pub fn observed_notifier() -> (Arc<Notifier>, Arc<Mutex<Vec<String>>>) {
    let (live, lines) = CollectingLive::new();
    let mut notifier = Notifier::new();
    notifier.add_live(Box::new(live));
    (Arc::new(notifier), lines)
}

pub fn zone(name: &str, id: &str) -> Zone {
    Zone {
        name: name.to_string(),
        id: id.to_string(),
    }
}
