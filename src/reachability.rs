//! Network reachability tracking.
//!
//! [`ReachabilityMonitor`] is a small state machine fed by platform
//! connectivity observations. Only an offline to online edge produces a
//! refresh trigger; flaps while already online never do.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::coordinator::RefreshCoordinator;
use crate::session::RefreshTrigger;

const DEFAULT_HISTORY_LIMIT: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    /// No observation has arrived yet
    Unknown,
    Reachable,
    Unreachable,
}

impl From<bool> for Reachability {
    fn from(reachable: bool) -> Self {
        if reachable {
            Reachability::Reachable
        } else {
            Reachability::Unreachable
        }
    }
}

impl fmt::Display for Reachability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reachability::Unknown => f.write_str("unknown"),
            Reachability::Reachable => f.write_str("reachable"),
            Reachability::Unreachable => f.write_str("unreachable"),
        }
    }
}

/// A recorded observation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transition {
    pub from: Reachability,
    pub to: Reachability,
    pub at: DateTime<Utc>,
    pub triggered_refresh: bool,
}

#[derive(Debug)]
pub struct ReachabilityMonitor {
    state: Reachability,
    history: VecDeque<Transition>,
    history_limit: usize,
}

impl Default for ReachabilityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ReachabilityMonitor {
    pub fn new() -> Self {
        Self::with_history_limit(DEFAULT_HISTORY_LIMIT)
    }

    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            state: Reachability::Unknown,
            history: VecDeque::new(),
            history_limit: history_limit.max(1),
        }
    }

    pub fn state(&self) -> Reachability {
        self.state
    }

    /// Recorded transitions, oldest first
    pub fn history(&self) -> impl Iterator<Item = &Transition> {
        self.history.iter()
    }

    /// Feed one connectivity observation.
    ///
    /// `None` means the platform could not tell and is ignored. Returns a
    /// trigger only for an `Unreachable -> Reachable` edge.
    pub fn observe(&mut self, reachable: Option<bool>) -> Option<RefreshTrigger> {
        let to = Reachability::from(reachable?);
        let from = self.state;
        let restored = from == Reachability::Unreachable && to == Reachability::Reachable;

        self.state = to;
        self.record(Transition {
            from,
            to,
            at: Utc::now(),
            triggered_refresh: restored,
        });

        if restored {
            info!("Reconnected after offline");
            Some(RefreshTrigger::ConnectivityRestored)
        } else {
            if to == Reachability::Unreachable {
                info!(from = %from, "Offline / lost connection");
            } else {
                debug!(from = %from, to = %to, "Reachability observed");
            }
            None
        }
    }

    fn record(&mut self, transition: Transition) {
        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(transition);
    }
}

/// Handle of a running connectivity listener
pub struct Subscription {
    token: CancellationToken,
    status: watch::Receiver<Reachability>,
    handle: JoinHandle<ReachabilityMonitor>,
}

impl Subscription {
    /// Latest reachability seen by the listener
    pub fn status(&self) -> watch::Receiver<Reachability> {
        self.status.clone()
    }

    /// Stop listening; observations still queued are dropped
    pub fn unsubscribe(&self) {
        self.token.cancel();
    }

    /// Wait for the listener to stop and return its monitor
    pub async fn join(self) -> Option<ReachabilityMonitor> {
        self.handle.await.ok()
    }
}

/// Forward connectivity observations to a coordinator.
///
/// Every restored edge requests a refresh; the coordinator drops the request
/// when a session is already in flight. The listener stops when the
/// observation channel closes or the subscription is cancelled.
pub fn subscribe(
    coordinator: Arc<RefreshCoordinator>,
    mut observations: mpsc::Receiver<Option<bool>>,
) -> Subscription {
    let token = CancellationToken::new();
    let (status_tx, status) = watch::channel(Reachability::Unknown);
    let cancelled = token.clone();

    let handle = tokio::spawn(async move {
        let mut monitor = ReachabilityMonitor::new();

        loop {
            tokio::select! {
                _ = cancelled.cancelled() => break,
                observation = observations.recv() => {
                    let Some(observation) = observation else { break };
                    if let Some(trigger) = monitor.observe(observation) {
                        let accepted = coordinator.request_refresh(trigger);
                        debug!(accepted, "Refresh requested after reconnect");
                    }
                    status_tx.send_replace(monitor.state());
                }
            }
        }

        debug!("Connectivity listener stopped");
        monitor
    });

    Subscription {
        token,
        status,
        handle,
    }
}
