use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::network::Network;
use crate::sources::{SourceKind, SourceOutcome};

/// What caused a refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshTrigger {
    /// Pull-to-refresh gesture
    UserGesture,
    /// Connectivity came back after being offline
    ConnectivityRestored,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefreshTrigger::UserGesture => f.write_str("user_gesture"),
            RefreshTrigger::ConnectivityRestored => f.write_str("connectivity_restored"),
        }
    }
}

/// Options handed to the on-chain balance source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceOptions {
    pub keep_polling: bool,
    pub with_prices: bool,
}

impl Default for BalanceOptions {
    fn default() -> Self {
        // A pull-to-refresh only needs one balance pass and no price lookups
        Self {
            keep_polling: false,
            with_prices: false,
        }
    }
}

/// Read-only context every source receives when fetching
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub session_id: u64,
    pub trigger: RefreshTrigger,
    pub network: Network,
    pub wallet_addresses: Arc<[String]>,
    pub balance_options: BalanceOptions,
}

/// One refresh cycle, alive from trigger acceptance until every unit settles
#[derive(Debug)]
pub struct RefreshSession {
    context: SessionContext,
    started_at: Instant,
    started_at_utc: DateTime<Utc>,
    sources: Vec<SourceKind>,
    source_results: Mutex<BTreeMap<SourceKind, SourceOutcome>>,
}

impl RefreshSession {
    /// Start a session; every selected source begins as pending
    pub fn start(context: SessionContext, sources: Vec<SourceKind>) -> Self {
        let source_results = sources
            .iter()
            .map(|kind| (*kind, SourceOutcome::Pending))
            .collect();

        Self {
            context,
            started_at: Instant::now(),
            started_at_utc: Utc::now(),
            sources,
            source_results: Mutex::new(source_results),
        }
    }

    pub fn id(&self) -> u64 {
        self.context.session_id
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn network(&self) -> Network {
        self.context.network
    }

    pub fn trigger(&self) -> RefreshTrigger {
        self.context.trigger
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    pub fn sources(&self) -> &[SourceKind] {
        &self.sources
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Record the terminal state of one source
    pub fn settle(&self, kind: SourceKind, outcome: SourceOutcome) {
        let mut results = self
            .source_results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        results.insert(kind, outcome);
    }

    pub fn outcome(&self, kind: SourceKind) -> Option<SourceOutcome> {
        self.source_results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&kind)
            .cloned()
    }

    /// Whether every selected source has reached a terminal state
    pub fn all_settled(&self) -> bool {
        self.source_results
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .all(SourceOutcome::is_settled)
    }

    /// Consume the session into its report
    pub fn into_report(self, first_failure: Option<String>) -> SessionReport {
        let elapsed = self.elapsed();
        let outcomes = self
            .source_results
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        SessionReport {
            session_id: self.context.session_id,
            trigger: self.context.trigger,
            network: self.context.network,
            started_at: self.started_at_utc,
            elapsed,
            outcomes,
            first_failure,
        }
    }
}

/// Summary of a settled session
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: u64,
    pub trigger: RefreshTrigger,
    pub network: Network,
    pub started_at: DateTime<Utc>,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    pub outcomes: BTreeMap<SourceKind, SourceOutcome>,
    pub first_failure: Option<String>,
}

impl SessionReport {
    pub fn is_success(&self) -> bool {
        self.first_failure.is_none()
    }

    pub fn failed_sources(&self) -> Vec<SourceKind> {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_failure())
            .map(|(kind, _)| *kind)
            .collect()
    }
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}
