// # DNS API Trait
//
// Defines the interface to the DNS provider's record API.
//
// ## Implementations
//
// - Cloudflare: `spf-provider-cloudflare` crate
//
// Implementations are thin wire clients: no retry logic, no caching, no
// decisions about whether a write is needed. All of that is owned by the
// reconciler.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A zone as reported by the provider listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Provider-assigned zone id
    pub id: String,
    /// Zone apex name
    pub name: String,
}

/// A DNS record as stored at the provider
///
/// A record without an id does not exist yet and is a candidate for creation;
/// a record with an id is a candidate for update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Provider-assigned record id, absent for records not yet created
    pub id: Option<String>,
    /// Fully-qualified record name
    pub name: String,
    /// Record type, e.g. `TXT`
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record content
    pub content: String,
    /// Time-to-live in seconds
    pub ttl: u32,
    /// Provider-side comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Whether the record is proxied (always false for TXT)
    #[serde(default)]
    pub proxied: bool,
}

impl DnsRecord {
    /// A record that does not exist yet at the provider
    pub fn candidate(name: impl Into<String>, record_type: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            record_type: record_type.into(),
            content: String::new(),
            ttl: 0,
            comment: None,
            proxied: false,
        }
    }
}

/// Server-side filter for record listings
///
/// Maps onto the provider's query parameters (`name`, `type`,
/// `content.contains`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    /// Exact record name
    pub name: Option<String>,
    /// Record type
    pub record_type: Option<String>,
    /// Substring the record content must contain
    pub content_contains: Option<String>,
}

impl RecordFilter {
    /// Filter for TXT records
    pub fn txt() -> Self {
        Self {
            record_type: Some("TXT".to_string()),
            ..Self::default()
        }
    }

    /// Restrict to an exact record name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Restrict to records whose content contains the given text
    pub fn with_content_contains(mut self, contains: impl Into<String>) -> Self {
        self.content_contains = Some(contains.into());
        self
    }
}

/// Pagination metadata echoed back by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultInfo {
    /// Page number of this result set
    #[serde(default)]
    pub page: u32,
    /// Requested page size
    #[serde(default)]
    pub per_page: u32,
    /// Records in this page
    #[serde(default)]
    pub count: u32,
    /// Total matching records
    #[serde(default)]
    pub total_count: u32,
}

/// One page of a record listing
#[derive(Debug, Clone, Default)]
pub struct RecordPage {
    /// The records on this page
    pub result: Vec<DnsRecord>,
    /// Pagination metadata, when the provider reports it
    pub result_info: Option<ResultInfo>,
}

/// One provider-reported error entry
///
/// The message is optional because providers have been observed to return
/// malformed error entries; callers substitute `"Unknown error"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiMessage {
    /// Human-readable error detail
    #[serde(default)]
    pub message: Option<String>,
}

/// Provider response to a record update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateResponse {
    /// Explicit success flag; anything else is a failure
    #[serde(default)]
    pub success: bool,
    /// Provider-reported errors accompanying a failure
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
}

/// Trait for DNS provider API clients
///
/// Implementations must be thread-safe and usable across async tasks. Each
/// method performs exactly one API call; the reconciler owns sequencing and
/// error policy.
#[async_trait]
pub trait DnsApi: Send + Sync {
    /// List the zones visible to this credential
    async fn list_zones(&self) -> Result<Vec<Zone>>;

    /// List records in a zone matching the filter
    async fn list_records(
        &self,
        zone_id: &str,
        filter: &RecordFilter,
        page: u32,
        per_page: u32,
    ) -> Result<RecordPage>;

    /// Create a record; `true` means the provider accepted it
    async fn add_record(
        &self,
        zone_id: &str,
        record_type: &str,
        name: &str,
        content: &str,
        ttl: u32,
        proxied: bool,
    ) -> Result<bool>;

    /// Overwrite an existing record's details
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecord,
    ) -> Result<UpdateResponse>;
}
