//! Single-flight refresh coordinator.
//!
//! A [`RefreshCoordinator`] accepts refresh triggers, runs at most one
//! session at a time and drops any trigger that arrives while a session is in
//! flight. The busy flag is published through a watch channel so consumers
//! can keep a refresh indicator visible.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::aggregator::run_session;
use crate::config::RefreshConfig;
use crate::error::Error;
use crate::network::Network;
use crate::policy::{select_sources, FeatureFlags};
use crate::session::{RefreshSession, RefreshTrigger, SessionContext, SessionReport};
use crate::sources::SourceRegistry;
use crate::store::AccountStore;

/// Result of a refresh request
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// A session was already in flight, or the coordinator is shut down
    Rejected,
    /// Every source succeeded
    Completed(SessionReport),
    /// At least one source failed; the report names the first failure
    Failed(SessionReport),
}

impl RefreshOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, RefreshOutcome::Rejected)
    }

    pub fn report(&self) -> Option<&SessionReport> {
        match self {
            RefreshOutcome::Rejected => None,
            RefreshOutcome::Completed(report) | RefreshOutcome::Failed(report) => Some(report),
        }
    }
}

/// Holds the busy flag for one session and clears it on drop
struct InFlight {
    flag: Arc<watch::Sender<bool>>,
}

impl InFlight {
    fn acquire(flag: &Arc<watch::Sender<bool>>) -> Option<Self> {
        let acquired = flag.send_if_modified(|busy| {
            if *busy {
                false
            } else {
                *busy = true;
                true
            }
        });

        acquired.then(|| Self {
            flag: Arc::clone(flag),
        })
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.flag.send_replace(false);
    }
}

pub struct RefreshCoordinator {
    registry: SourceRegistry,
    store: AccountStore,
    config: RwLock<RefreshConfig>,
    refreshing: Arc<watch::Sender<bool>>,
    next_session_id: AtomicU64,
    shut_down: AtomicBool,
    last_report: Mutex<Option<SessionReport>>,
}

impl RefreshCoordinator {
    /// Create a coordinator over the given sources and store
    pub fn new(
        config: RefreshConfig,
        registry: SourceRegistry,
        store: AccountStore,
    ) -> Result<Self, Error> {
        config.validate()?;
        let (refreshing, _) = watch::channel(false);

        Ok(Self {
            registry,
            store,
            config: RwLock::new(config),
            refreshing: Arc::new(refreshing),
            next_session_id: AtomicU64::new(1),
            shut_down: AtomicBool::new(false),
            last_report: Mutex::new(None),
        })
    }

    pub fn store(&self) -> &AccountStore {
        &self.store
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> RefreshConfig {
        self.config
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Switch the active network; applies from the next session on
    pub fn set_network(&self, network: Network) {
        let mut config = self
            .config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if config.network != network {
            info!(from = %config.network, to = %network, "Active network changed");
            config.network = network;
        }
    }

    pub fn set_features(&self, features: FeatureFlags) {
        self.config
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .features = features;
    }

    pub fn is_refreshing(&self) -> bool {
        *self.refreshing.borrow()
    }

    /// Observe the busy flag
    pub fn subscribe_refreshing(&self) -> watch::Receiver<bool> {
        self.refreshing.subscribe()
    }

    /// Report of the most recently settled session
    pub fn last_report(&self) -> Option<SessionReport> {
        self.last_report
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Request a refresh and run it in the background.
    ///
    /// Returns `false` without side effects when a session is already in
    /// flight or the coordinator is shut down.
    pub fn request_refresh(self: &Arc<Self>, trigger: RefreshTrigger) -> bool {
        let Some(guard) = self.begin(trigger) else {
            return false;
        };

        let coordinator = Arc::clone(self);
        tokio::spawn(async move {
            coordinator.run_guarded(trigger, guard).await;
        });
        true
    }

    /// Request a refresh and wait for it to settle.
    ///
    /// The session runs on its own task, so dropping the returned future
    /// only stops waiting; the fetches still run to completion.
    pub async fn refresh(self: &Arc<Self>, trigger: RefreshTrigger) -> RefreshOutcome {
        let Some(guard) = self.begin(trigger) else {
            return RefreshOutcome::Rejected;
        };

        let coordinator = Arc::clone(self);
        let handle =
            tokio::spawn(async move { coordinator.run_guarded(trigger, guard).await });

        match handle.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => {
                error!("Refresh task cancelled: {}", err);
                RefreshOutcome::Rejected
            }
        }
    }

    /// Wait until no session is in flight
    pub async fn wait_idle(&self) {
        let mut refreshing = self.refreshing.subscribe();
        let _ = refreshing.wait_for(|busy| !*busy).await;
    }

    /// Stop accepting triggers and wait for the in-flight session to settle
    pub async fn shutdown(&self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            info!("Refresh coordinator shutting down");
        }
        self.wait_idle().await;
    }

    fn begin(&self, trigger: RefreshTrigger) -> Option<InFlight> {
        if self.is_shut_down() {
            debug!(trigger = %trigger, "Coordinator shut down, dropping trigger");
            return None;
        }

        let Some(guard) = InFlight::acquire(&self.refreshing) else {
            debug!(trigger = %trigger, "Refresh already in flight, dropping trigger");
            return None;
        };

        // Checked again after acquiring so shutdown either sees this session or rejects it
        if self.is_shut_down() {
            debug!(trigger = %trigger, "Coordinator shut down, dropping trigger");
            return None;
        }

        Some(guard)
    }

    async fn run_guarded(&self, trigger: RefreshTrigger, _guard: InFlight) -> RefreshOutcome {
        let config = self.config();
        let sources = select_sources(
            config.network,
            config.secondary_test_network,
            config.features,
        );

        let context = SessionContext {
            session_id: self.next_session_id.fetch_add(1, Ordering::Relaxed),
            trigger,
            network: config.network,
            wallet_addresses: config.wallet_addresses.clone().into(),
            balance_options: config.balances,
        };
        let session = RefreshSession::start(context, sources.into_iter().collect());

        info!(
            session_id = session.id(),
            trigger = %trigger,
            network = %session.network(),
            sources = ?session.sources(),
            "Refresh started"
        );

        let outcome = match run_session(&session, &self.registry, &self.store, config.gate()).await
        {
            Ok(()) => {
                let report = session.into_report(None);
                info!(
                    session_id = report.session_id,
                    elapsed_ms = report.elapsed.as_millis() as u64,
                    "Refresh completed"
                );
                RefreshOutcome::Completed(report)
            }
            Err(err) => {
                let report = session.into_report(Some(err.to_string()));
                error!(
                    session_id = report.session_id,
                    failed = ?report.failed_sources(),
                    "Refresh failed: {}",
                    err
                );
                RefreshOutcome::Failed(report)
            }
        };

        if let Some(report) = outcome.report() {
            *self
                .last_report
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(report.clone());
        }

        outcome
    }
}
