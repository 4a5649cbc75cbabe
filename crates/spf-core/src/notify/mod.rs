//! Notification sink: fans events out to live and digest destinations
//!
//! Live destinations receive every event immediately, already formatted.
//! Digest destinations buffer entries and deliver one aggregate message at
//! end-of-run, filtered by a per-destination severity threshold. The flush is
//! an explicit call driven by the caller's lifecycle, on every exit path;
//! there is no flush-on-drop.

use crate::error::{Error, Result};
use crate::severity::Severity;
use async_trait::async_trait;
use std::mem;
use std::sync::Mutex;

/// Event context: a string-keyed map serialized alongside the message
pub type Context = serde_json::Map<String, serde_json::Value>;

/// Substituted for the context when serialization fails
const CONTEXT_FALLBACK: &str = r#"{"message":"Failed to encode context"}"#;

/// A single diagnostic event. Immutable once created.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Event severity
    pub level: Severity,
    /// Human-readable message
    pub message: String,
    /// Structured context, order irrelevant
    pub context: Context,
}

impl LogEntry {
    /// Format as `LEVEL: message context`, context omitted when empty
    pub fn format(&self) -> String {
        let level = self.level.as_str().to_uppercase();
        if self.context.is_empty() {
            return format!("{}: {}", level, self.message);
        }
        let context = serde_json::to_string(&self.context)
            .unwrap_or_else(|_| CONTEXT_FALLBACK.to_string());
        format!("{}: {} {}", level, self.message, context)
    }
}

/// Destination that receives every event immediately
///
/// The base design applies no filtering on the live path; a destination that
/// wants one filters internally.
pub trait LiveDestination: Send + Sync {
    /// Deliver one formatted line
    fn deliver(&self, line: &str);
}

/// Delivery mechanism for an aggregate digest message
#[async_trait]
pub trait DigestTransport: Send + Sync {
    /// Destination name, used in flush failure reports
    fn name(&self) -> &str;

    /// Deliver one aggregate message
    async fn deliver(&self, subject: &str, body: &str) -> Result<()>;
}

/// A registered digest destination with its own buffer and threshold
struct DigestSlot {
    transport: Box<dyn DigestTransport>,
    threshold: Severity,
    buffer: Mutex<Vec<LogEntry>>,
}

/// Fans a single event out to all registered destinations
///
/// Shared across components as `Arc<Notifier>`; digest buffers use interior
/// mutability so `record` takes `&self`.
#[derive(Default)]
pub struct Notifier {
    live: Vec<Box<dyn LiveDestination>>,
    digests: Vec<DigestSlot>,
}

impl Notifier {
    /// Create an empty notifier with no destinations
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live destination
    pub fn add_live(&mut self, destination: Box<dyn LiveDestination>) {
        self.live.push(destination);
    }

    /// Register a digest destination with its severity threshold
    pub fn add_digest(&mut self, transport: Box<dyn DigestTransport>, threshold: Severity) {
        self.digests.push(DigestSlot {
            transport,
            threshold,
            buffer: Mutex::new(Vec::new()),
        });
    }

    /// Number of registered digest destinations
    pub fn digest_count(&self) -> usize {
        self.digests.len()
    }

    /// Record one event: buffer for every digest, deliver to every live
    /// destination regardless of level
    pub fn record(&self, level: Severity, message: impl Into<String>, context: Context) {
        let entry = LogEntry {
            level,
            message: message.into(),
            context,
        };

        for slot in &self.digests {
            slot.buffer.lock().unwrap().push(entry.clone());
        }

        if self.live.is_empty() {
            return;
        }
        let line = entry.format();
        for destination in &self.live {
            destination.deliver(&line);
        }
    }

    /// Flush every digest destination, once, delivering one aggregate message
    /// per destination whose filtered buffer is non-empty
    ///
    /// A failed delivery never prevents the remaining flushes; all failures
    /// are collected into a single [`Error::DigestFlush`]. Buffers are drained
    /// so a second call delivers nothing.
    pub async fn flush_digests(&self) -> Result<()> {
        let mut failures = Vec::new();

        for slot in &self.digests {
            let entries = mem::take(&mut *slot.buffer.lock().unwrap());
            let filtered: Vec<&LogEntry> = entries
                .iter()
                .filter(|entry| entry.level.at_least(slot.threshold))
                .collect();
            if filtered.is_empty() {
                continue;
            }

            let subject = format!("[SPF Flattener] {}", capitalize(slot.threshold.as_str()));
            let body = filtered
                .iter()
                .map(|entry| entry.format())
                .collect::<Vec<_>>()
                .join("\n");

            if let Err(e) = slot.transport.deliver(&subject, &body).await {
                tracing::error!("Digest delivery failed for {}: {}", slot.transport.name(), e);
                failures.push(format!("{}: {}", slot.transport.name(), e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(Error::DigestFlush { failures })
        }
    }

    /// System is unusable
    pub fn emergency(&self, message: impl Into<String>) {
        self.record(Severity::Emergency, message, Context::new());
    }

    /// Action must be taken immediately
    pub fn alert(&self, message: impl Into<String>) {
        self.record(Severity::Alert, message, Context::new());
    }

    /// Critical conditions (unexpected exception)
    pub fn critical(&self, message: impl Into<String>) {
        self.record(Severity::Critical, message, Context::new());
    }

    /// Runtime errors that should be logged and monitored
    pub fn error(&self, message: impl Into<String>) {
        self.record(Severity::Error, message, Context::new());
    }

    /// Exceptional occurrences that are not errors
    pub fn warning(&self, message: impl Into<String>) {
        self.record(Severity::Warning, message, Context::new());
    }

    /// Normal but significant events
    pub fn notice(&self, message: impl Into<String>) {
        self.record(Severity::Notice, message, Context::new());
    }

    /// Interesting events
    pub fn info(&self, message: impl Into<String>) {
        self.record(Severity::Info, message, Context::new());
    }

    /// Detailed debug information
    pub fn debug(&self, message: impl Into<String>) {
        self.record(Severity::Debug, message, Context::new());
    }

    /// [`Self::critical`] with structured context
    pub fn critical_with(&self, message: impl Into<String>, context: Context) {
        self.record(Severity::Critical, message, context);
    }

    /// [`Self::error`] with structured context
    pub fn error_with(&self, message: impl Into<String>, context: Context) {
        self.record(Severity::Error, message, context);
    }

    /// [`Self::warning`] with structured context
    pub fn warning_with(&self, message: impl Into<String>, context: Context) {
        self.record(Severity::Warning, message, context);
    }

    /// [`Self::notice`] with structured context
    pub fn notice_with(&self, message: impl Into<String>, context: Context) {
        self.record(Severity::Notice, message, context);
    }

    /// [`Self::info`] with structured context
    pub fn info_with(&self, message: impl Into<String>, context: Context) {
        self.record(Severity::Info, message, context);
    }

    /// [`Self::debug`] with structured context
    pub fn debug_with(&self, message: impl Into<String>, context: Context) {
        self.record(Severity::Debug, message, context);
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Live destination that forwards formatted lines to `tracing`
///
/// Severity maps onto the nearest tracing level; the line keeps its own
/// `LEVEL:` prefix so digest and console output stay identical.
#[derive(Default)]
pub struct TracingLive;

impl TracingLive {
    /// Forward every event
    pub fn new() -> Self {
        Self
    }
}

impl LiveDestination for TracingLive {
    fn deliver(&self, line: &str) {
        if line.starts_with("EMERGENCY:")
            || line.starts_with("ALERT:")
            || line.starts_with("CRITICAL:")
            || line.starts_with("ERROR:")
        {
            tracing::error!("{}", line);
        } else if line.starts_with("WARNING:") {
            tracing::warn!("{}", line);
        } else if line.starts_with("DEBUG:") {
            tracing::debug!("{}", line);
        } else {
            tracing::info!("{}", line);
        }
    }
}
