//! Account-level orchestration
//!
//! The AccountOrchestrator decides which zones get reconciled, in what
//! order, and what happens when one of them fails. Zones are processed
//! strictly sequentially; one zone's record mutations are never
//! interleaved with another's.

use crate::error::Result;
use crate::notify::Notifier;
use crate::reconciler::{ReconcileOptions, ZoneReconciler};
use crate::traits::{DnsApi, SpfSplitter, Zone};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// What to do when one zone's reconciliation fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Propagate the first zone error, halting all subsequent zones.
    /// The default: a broken account run should be noticed, not papered over.
    #[default]
    AbortOnFirstError,
    /// Record the failure in the outcome map and keep going
    ContinueAndCollect,
}

/// Result of one zone's reconciliation within an account run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneOutcome {
    /// Zone reconciled; success flag per record touched (empty for a no-op)
    Completed(BTreeMap<String, bool>),
    /// Zone failed; only produced under [`FailurePolicy::ContinueAndCollect`]
    Failed(String),
}

impl ZoneOutcome {
    /// Whether this zone completed without error
    pub fn is_completed(&self) -> bool {
        matches!(self, ZoneOutcome::Completed(_))
    }
}

/// Drives the ZoneReconciler over every retained zone of an account
pub struct AccountOrchestrator {
    api: Arc<dyn DnsApi>,
    splitter: Arc<dyn SpfSplitter>,
    notifier: Arc<Notifier>,
    excluded: Vec<String>,
    order: Vec<String>,
    policy: FailurePolicy,
    opts: ReconcileOptions,
}

impl AccountOrchestrator {
    /// Create an orchestrator with default options and policy
    pub fn new(
        api: Arc<dyn DnsApi>,
        splitter: Arc<dyn SpfSplitter>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            api,
            splitter,
            notifier,
            excluded: Vec::new(),
            order: Vec::new(),
            policy: FailurePolicy::default(),
            opts: ReconcileOptions::default(),
        }
    }

    /// Replace the exclusion set
    pub fn set_excluded(mut self, excluded: Vec<String>) -> Self {
        self.excluded = excluded;
        self
    }

    /// Add one zone name to the exclusion set
    pub fn add_excluded(mut self, zone: impl Into<String>) -> Self {
        self.excluded.push(zone.into());
        self
    }

    /// Replace the explicit order list
    pub fn set_order(mut self, order: Vec<String>) -> Self {
        self.order = order;
        self
    }

    /// Append one zone name to the explicit order list
    pub fn add_order(mut self, zone: impl Into<String>) -> Self {
        self.order.push(zone.into());
        self
    }

    /// Select the failure policy
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override reconciliation options
    pub fn with_options(mut self, opts: ReconcileOptions) -> Self {
        self.opts = opts;
        self
    }

    /// The current exclusion set
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    /// The current explicit order list
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Reconcile every retained zone of the account
    ///
    /// Ordering: zones named in the order list first, in list sequence, then
    /// every remaining zone in the provider's own listing order. Exclusion
    /// takes precedence: an excluded zone is skipped with a warning and never
    /// appears in the result, even when the order list names it.
    pub async fn flatten(&self) -> Result<BTreeMap<String, ZoneOutcome>> {
        let zones = self.api.list_zones().await?;
        let ordered = order_zones(&zones, &self.order);

        self.notifier.notice("Start account spf flattening");

        let mut results = BTreeMap::new();
        for zone in ordered {
            if self.excluded.contains(&zone.name) {
                self.notifier
                    .warning(format!("Excluded {}.  Skipping", zone.name));
                continue;
            }

            let mut reconciler = ZoneReconciler::new(
                zone.name.clone(),
                Arc::clone(&self.api),
                Arc::clone(&self.splitter),
                Arc::clone(&self.notifier),
                self.opts.clone(),
            );
            match reconciler.flatten().await {
                Ok(records) => {
                    results.insert(zone.name, ZoneOutcome::Completed(records));
                }
                Err(e) => match self.policy {
                    FailurePolicy::AbortOnFirstError => return Err(e),
                    FailurePolicy::ContinueAndCollect => {
                        self.notifier
                            .error(format!("Zone {} failed: {}", zone.name, e));
                        results.insert(zone.name, ZoneOutcome::Failed(e.to_string()));
                    }
                },
            }
        }

        self.notifier.notice("Finished account spf flattening");
        Ok(results)
    }
}

/// Deterministic processing order: explicit priorities first, in caller
/// sequence, then the remainder in listing order
///
/// Order names absent from the listing are skipped. A name that occurs
/// more than once, in either input, is visited once per match.
fn order_zones(zones: &[Zone], order: &[String]) -> Vec<Zone> {
    let mut ordered = Vec::with_capacity(zones.len());
    for name in order {
        for zone in zones {
            if zone.name == *name {
                ordered.push(zone.clone());
            }
        }
    }
    for zone in zones {
        if !order.contains(&zone.name) {
            ordered.push(zone.clone());
        }
    }
    ordered
}
