// # spf-core
//
// Core library for SPF record flattening.
//
// ## Architecture Overview
//
// - **DnsApi**: Trait for the DNS provider's record API
// - **SpfSplitter**: Trait for the flattening/splitting collaborator
// - **ZoneReconciler**: Per-zone create/update/no-op reconciliation
// - **AccountOrchestrator**: Ordering, exclusion and failure policy over zones
// - **Notifier**: Live and digest notification fan-out with per-destination
//   severity thresholds
//
// ## Design Principles
//
// 1. **Separation of Concerns**: wire clients and the splitting algorithm
//    live behind traits in their own crates
// 2. **Idempotency**: re-running reconciliation with nothing changed
//    performs zero mutating calls
// 3. **Sequential Execution**: zones one at a time, records within a zone
//    one at a time, sub-records before primary
// 4. **Explicit Lifecycle**: digest flush is a call on every exit path,
//    never a side effect of teardown

pub mod config;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod reconciler;
pub mod severity;
pub mod traits;

// Re-export core types for convenience
pub use config::{ChannelConfig, Settings, SslMode};
pub use error::{Error, Result};
pub use notify::{Context, DigestTransport, LiveDestination, LogEntry, Notifier, TracingLive};
pub use orchestrator::{AccountOrchestrator, FailurePolicy, ZoneOutcome};
pub use reconciler::{ReconcileOptions, ZoneReconciler};
pub use severity::Severity;
pub use traits::{DnsApi, DnsRecord, FlatRecord, RecordFilter, SpfSplitter, SplitPlan, Zone};
