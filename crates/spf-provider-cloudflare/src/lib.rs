// # Cloudflare DNS API Client
//
// Implements the `DnsApi` trait against Cloudflare API v4. A thin wire
// client: one HTTP request per call, no retries, no caching, no decisions
// about whether a write is needed. Sequencing and error policy are owned by
// the reconciler.
//
// ## Security
//
// - The API token never appears in logs; the `Debug` implementation redacts
//   it.
// - The client fails fast on an empty token.
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List Zones: GET `/zones?name=...`
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...&type=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use serde::Deserialize;
use spf_core::error::{Error, Result};
use spf_core::traits::{
    ApiMessage, DnsApi, DnsRecord, RecordFilter, RecordPage, ResultInfo, UpdateResponse, Zone,
};
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// HTTP timeout for API requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Page size for zone listings
const ZONE_PAGE_SIZE: u32 = 50;

/// Cloudflare API v4 client
pub struct CloudflareApi {
    /// API token, never logged
    api_token: String,
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for CloudflareApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareApi")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Standard Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
    result_info: Option<ResultInfo>,
}

impl CloudflareApi {
    /// Create a client for the given API token
    ///
    /// The token needs Zone:Read and Zone:DNS:Edit permissions.
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::api(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            client,
            base_url: CLOUDFLARE_API_BASE.to_string(),
        })
    }

    /// Point the client at a different base URL, for tests against a local
    /// HTTP stub
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn get_envelope<T: serde::de::DeserializeOwned>(
        &self,
        what: &str,
        path: &str,
        query: &[(String, String)],
    ) -> Result<Envelope<T>> {
        let url = format!("{}/{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .query(query)
            .bearer_auth(&self.api_token)
            .send()
            .await
            .map_err(|e| Error::api(format!("HTTP request failed: {}", e)))?;

        let response = fail_for_status(what, response).await?;
        response
            .json()
            .await
            .map_err(|e| Error::api(format!("Failed to parse {} response: {}", what, e)))
    }
}

/// Map non-success HTTP statuses onto errors, with auth, rate-limit and
/// server errors called out explicitly
async fn fail_for_status(what: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    Err(status_error(what, status, &body))
}

fn status_error(what: &str, status: reqwest::StatusCode, body: &str) -> Error {
    match status.as_u16() {
        401 | 403 => Error::api(format!(
            "Authentication failed: invalid API token or insufficient permissions. Status: {}",
            status
        )),
        429 => Error::api(format!(
            "Rate limit exceeded. Please retry later. Status: {}",
            status
        )),
        500..=599 => Error::api(format!(
            "Cloudflare server error (transient): {} - {}",
            status, body
        )),
        _ => Error::api(format!("{} failed: {} - {}", what, status, body)),
    }
}

/// Render a record filter as Cloudflare query parameters
fn filter_query(filter: &RecordFilter, page: u32, per_page: u32) -> Vec<(String, String)> {
    let mut query = vec![
        ("page".to_string(), page.to_string()),
        ("per_page".to_string(), per_page.to_string()),
        ("match".to_string(), "all".to_string()),
    ];
    if let Some(ref name) = filter.name {
        query.push(("name".to_string(), name.clone()));
    }
    if let Some(ref record_type) = filter.record_type {
        query.push(("type".to_string(), record_type.clone()));
    }
    if let Some(ref contains) = filter.content_contains {
        query.push(("content.contains".to_string(), contains.clone()));
    }
    query
}

#[async_trait]
impl DnsApi for CloudflareApi {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        let mut zones = Vec::new();
        let mut page = 1u32;

        loop {
            let query = vec![
                ("page".to_string(), page.to_string()),
                ("per_page".to_string(), ZONE_PAGE_SIZE.to_string()),
            ];
            let envelope: Envelope<Vec<Zone>> =
                self.get_envelope("Zone listing", "zones", &query).await?;

            let batch = envelope
                .result
                .ok_or_else(|| Error::api("Zone listing returned no result"))?;
            let fetched = batch.len() as u32;
            zones.extend(batch);

            let total = envelope
                .result_info
                .map(|info| info.total_count)
                .unwrap_or(0);
            if fetched < ZONE_PAGE_SIZE || zones.len() as u32 >= total {
                break;
            }
            page += 1;
        }

        tracing::debug!("Listed {} zones", zones.len());
        Ok(zones)
    }

    async fn list_records(
        &self,
        zone_id: &str,
        filter: &RecordFilter,
        page: u32,
        per_page: u32,
    ) -> Result<RecordPage> {
        let path = format!("zones/{}/dns_records", zone_id);
        let query = filter_query(filter, page, per_page);
        let envelope: Envelope<Vec<DnsRecord>> =
            self.get_envelope("Record listing", &path, &query).await?;

        Ok(RecordPage {
            result: envelope.result.unwrap_or_default(),
            result_info: envelope.result_info,
        })
    }

    async fn add_record(
        &self,
        zone_id: &str,
        record_type: &str,
        name: &str,
        content: &str,
        ttl: u32,
        proxied: bool,
    ) -> Result<bool> {
        let url = format!("{}/zones/{}/dns_records", self.base_url, zone_id);
        let payload = serde_json::json!({
            "type": record_type,
            "name": name,
            "content": content,
            "ttl": ttl,
            "proxied": proxied,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::api(format!("HTTP request failed: {}", e)))?;

        let response = fail_for_status("Record creation", response).await?;
        let envelope: Envelope<DnsRecord> = response
            .json()
            .await
            .map_err(|e| Error::api(format!("Failed to parse creation response: {}", e)))?;
        Ok(envelope.success)
    }

    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        record: &DnsRecord,
    ) -> Result<UpdateResponse> {
        let url = format!(
            "{}/zones/{}/dns_records/{}",
            self.base_url, zone_id, record_id
        );

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.api_token)
            .json(record)
            .send()
            .await
            .map_err(|e| Error::api(format!("HTTP request failed: {}", e)))?;

        // Validation failures come back as 4xx with success:false and error
        // details in the body; surface those to the caller instead of
        // mapping them to a transport error.
        let status = response.status();
        if !status.is_success() && !matches!(status.as_u16(), 400 | 422) {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(status_error("Record update", status, &body));
        }

        let envelope: Envelope<DnsRecord> = response
            .json()
            .await
            .map_err(|e| Error::api(format!("Failed to parse update response: {}", e)))?;
        Ok(UpdateResponse {
            success: envelope.success,
            errors: envelope.errors,
        })
    }
}
