//! Per-zone reconciliation engine
//!
//! The ZoneReconciler is responsible for:
//! - Resolving the zone's provider id by name
//! - Locating the stub SPF record that holds the authored policy
//! - Obtaining the desired split plan from the splitting collaborator
//! - Applying the minimal set of create/update operations
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────┐
//! │ ResolveZoneId│───▶│  FetchStub   │───▶│  BuildPlan   │
//! └──────────────┘    └──────────────┘    └──────────────┘
//!                                                │
//!                         ┌──────────────────────┘
//!                         ▼
//!                 ┌───────────────┐    ┌────────────────────┐
//!                 │ApplySubRecords│───▶│ ApplyPrimaryRecord │
//!                 └───────────────┘    └────────────────────┘
//! ```
//!
//! A missing stub or a degenerate split plan terminates the zone as a
//! no-op with a warning; they are valid states, not errors. Any write
//! failure aborts the zone immediately. Records already written in the
//! same pass are not rolled back.

use crate::error::{Error, Result};
use crate::notify::Notifier;
use crate::traits::{DnsApi, DnsRecord, RecordFilter, SpfSplitter, SplitPlan};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Marker content the stub record must begin with
pub const DEFAULT_STUB_MARKER: &str = "v=spfmaster";

/// The real SPF version marker substituted for the stub marker
pub const SPF_VERSION_MARKER: &str = "v=spf1";

/// Maximum characters per generated TXT record
pub const DEFAULT_MAX_CHARS: usize = 2048;

/// Sub-record naming pattern; `#` is the running number, the zone is appended
pub const DEFAULT_SUB_PATTERN: &str = "spf#";

/// TTL applied to every record the reconciler writes
pub const RECORD_TTL: u32 = 60;

/// Comment stamped onto every updated record
pub const AUTOGENERATED_COMMENT: &str =
    "DO NOT EDIT!! Autogenerated by spf-flatten. Edit the stub TXT record starting with v=spfmaster";

/// Page size for record listings; large enough to fetch a zone in one page
const LIST_PAGE_SIZE: u32 = 5000;

/// Tunables for one reconciliation run
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Content marker identifying the stub record
    pub stub_marker: String,
    /// Maximum characters per generated record
    pub max_chars: usize,
    /// Sub-record naming pattern, without the zone suffix
    pub sub_pattern: String,
    /// TTL for written records
    pub ttl: u32,
    /// Comment stamped onto updated records
    pub comment: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            stub_marker: DEFAULT_STUB_MARKER.to_string(),
            max_chars: DEFAULT_MAX_CHARS,
            sub_pattern: DEFAULT_SUB_PATTERN.to_string(),
            ttl: RECORD_TTL,
            comment: AUTOGENERATED_COMMENT.to_string(),
        }
    }
}

/// Reconciles one zone's TXT records against its desired split plan
///
/// Created per zone per run; the provider-assigned zone id is resolved
/// lazily and cached only for the lifetime of this value.
pub struct ZoneReconciler {
    zone: String,
    api: Arc<dyn DnsApi>,
    splitter: Arc<dyn SpfSplitter>,
    notifier: Arc<Notifier>,
    opts: ReconcileOptions,
    zone_id: Option<String>,
}

impl ZoneReconciler {
    /// Create a reconciler for one zone
    pub fn new(
        zone: impl Into<String>,
        api: Arc<dyn DnsApi>,
        splitter: Arc<dyn SpfSplitter>,
        notifier: Arc<Notifier>,
        opts: ReconcileOptions,
    ) -> Self {
        Self {
            zone: zone.into(),
            api,
            splitter,
            notifier,
            opts,
            zone_id: None,
        }
    }

    /// The zone apex name this reconciler works on
    pub fn zone(&self) -> &str {
        &self.zone
    }

    /// Run the full reconciliation for this zone
    ///
    /// Returns the success flag per record touched. An empty map means the
    /// zone completed as a no-op (no stub record, or nothing to split).
    pub async fn flatten(&mut self) -> Result<BTreeMap<String, bool>> {
        self.notifier
            .notice(format!("Started splitting SPF records for {}", self.zone));

        let mut results = BTreeMap::new();

        let Some(plan) = self.build_plan().await? else {
            return Ok(results);
        };
        if plan.is_degenerate() {
            self.notifier.warning(format!(
                "Problem splitting SPF record or record doesnt need splitting for zone {}",
                self.zone
            ));
            return Ok(results);
        }

        // Sub-records first so the primary never references a missing record.
        for (name, content) in plan.sub_records() {
            let existing = self.find_txt_record(name, None).await?;
            let ok = self.upsert(existing, name, content).await?;
            results.insert(name.to_string(), ok);
        }

        let primary_content = plan
            .primary()
            .ok_or_else(|| Error::splitter("split plan has no primary entry"))?;
        let zone = self.zone.clone();
        let existing = self
            .find_txt_record(&zone, Some(SPF_VERSION_MARKER))
            .await?;
        let ok = self.upsert(existing, &zone, primary_content).await?;
        results.insert(zone, ok);

        self.notifier
            .notice(format!("Finished splitting SPF records for {}", self.zone));
        Ok(results)
    }

    /// Locate the stub record and hand its normalized content to the splitter
    ///
    /// `Ok(None)` means no stub record exists: an un-configured zone, valid
    /// and reported with a warning.
    async fn build_plan(&mut self) -> Result<Option<SplitPlan>> {
        let zone = self.zone.clone();
        let marker = self.opts.stub_marker.clone();

        let Some(stub) = self.find_txt_record(&zone, Some(&marker)).await? else {
            self.notifier.warning(format!(
                "No Stub SPF record found using {} for domain {}",
                marker, zone
            ));
            return Ok(None);
        };

        let content = strip_quotes(&stub.content);
        let rewritten = content.replace(&marker, SPF_VERSION_MARKER);
        debug!("Stub content for {} rewritten to: {}", zone, rewritten);

        let flat = self.splitter.flatten_from_text(&zone, &rewritten).await?;
        let pattern = format!("{}.{}", self.opts.sub_pattern, zone);
        let plan = self
            .splitter
            .split(&flat, self.opts.max_chars, &pattern)
            .await?;
        Ok(Some(plan))
    }

    /// Decide and apply create / update / no-op for one record
    async fn upsert(
        &mut self,
        existing: Option<DnsRecord>,
        name: &str,
        desired: &str,
    ) -> Result<bool> {
        let zone_id = self.zone_id().await?;
        self.notifier
            .info(format!("Adding/Updating record for {}", name));

        let Some(mut record) = existing.filter(|r| r.id.is_some()) else {
            // create
            let accepted = self
                .api
                .add_record(&zone_id, "TXT", name, desired, self.opts.ttl, false)
                .await?;
            if !accepted {
                return Err(Error::CreateFailed {
                    name: name.to_string(),
                    message: "provider rejected the record".to_string(),
                });
            }
            self.notifier
                .notice(format!("New record created for {}", name));
            return Ok(true);
        };

        if record.content == desired {
            // no-op: repeated runs must perform zero mutating calls
            self.notifier.debug(format!("No change needed for {}", name));
            return Ok(true);
        }
        self.notifier
            .debug(format!("Changes detected in record for {}", name));

        let record_id = record.id.clone().unwrap_or_default();
        record.ttl = self.opts.ttl;
        record.comment = Some(self.opts.comment.clone());
        record.content = desired.to_string();

        let response = self.api.update_record(&zone_id, &record_id, &record).await?;
        if !response.success {
            let messages = response
                .errors
                .iter()
                .map(|e| {
                    e.message
                        .clone()
                        .unwrap_or_else(|| "Unknown error".to_string())
                })
                .collect();
            return Err(Error::UpdateFailed {
                name: name.to_string(),
                messages,
            });
        }

        self.notifier
            .notice(format!("Record added/updated for {}", name));
        Ok(true)
    }

    /// Find the single TXT record with the given name, optionally restricted
    /// to content containing `contains`
    ///
    /// More than one match is a configuration problem at the provider and
    /// fails the zone.
    async fn find_txt_record(
        &mut self,
        name: &str,
        contains: Option<&str>,
    ) -> Result<Option<DnsRecord>> {
        let zone_id = self.zone_id().await?;
        let mut filter = RecordFilter::txt().with_name(name);
        if let Some(contains) = contains {
            filter = filter.with_content_contains(contains);
        }

        let page = self
            .api
            .list_records(&zone_id, &filter, 1, LIST_PAGE_SIZE)
            .await?;
        if page.result.len() > 1 {
            return Err(Error::ambiguous_record(name, &self.zone));
        }
        Ok(page.result.into_iter().next())
    }

    /// Resolve the provider-assigned zone id, cached for this run
    async fn zone_id(&mut self) -> Result<String> {
        if let Some(ref id) = self.zone_id {
            return Ok(id.clone());
        }

        let zones = self.api.list_zones().await?;
        let mut matches = zones.into_iter().filter(|z| z.name == self.zone);
        let id = match (matches.next(), matches.next()) {
            (Some(zone), None) => zone.id,
            // zero or ambiguous matches both abort the zone
            _ => return Err(Error::zone_not_found(&self.zone)),
        };

        debug!("Resolved zone id for {}", self.zone);
        self.zone_id = Some(id.clone());
        Ok(id)
    }
}

/// Strip one pair of surrounding double quotes, as returned by some TXT APIs
pub fn strip_quotes(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}
