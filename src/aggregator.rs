//! Fan-out/fan-in over the sources of a session.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Mutex;

use futures::future::join_all;
use futures::FutureExt;
use tracing::{debug, error, warn};

use crate::error::Error;
use crate::gate::MinimumDurationGate;
use crate::session::RefreshSession;
use crate::sources::{SourceKind, SourceOutcome, SourcePayload, SourceRegistry};
use crate::store::AccountStore;

/// Run every selected source of the session concurrently with the minimum duration gate.
///
/// Each source writes its payload to the store as soon as it settles. A
/// failing source never cancels its siblings: the first failure to settle is
/// returned once every source and the gate have settled. A panicking fetcher
/// counts as a failure of its own source.
pub async fn run_session(
    session: &RefreshSession,
    registry: &SourceRegistry,
    store: &AccountStore,
    gate: MinimumDurationGate,
) -> Result<(), Error> {
    let first_failure: Mutex<Option<Error>> = Mutex::new(None);

    let units = session
        .sources()
        .iter()
        .map(|&kind| run_unit(kind, session, registry, store, &first_failure));

    tokio::join!(join_all(units), gate.wait(session.started_at()));
    debug_assert!(session.all_settled());

    let first_failure = first_failure
        .into_inner()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    match first_failure {
        Some(err) => {
            error!(
                session_id = session.id(),
                network = %session.network(),
                "Error refreshing data: {}",
                err
            );
            Err(err)
        }
        None => Ok(()),
    }
}

async fn run_unit(
    kind: SourceKind,
    session: &RefreshSession,
    registry: &SourceRegistry,
    store: &AccountStore,
    first_failure: &Mutex<Option<Error>>,
) {
    let result = match registry.get(kind) {
        Some(fetcher) => AssertUnwindSafe(fetcher.fetch(session.context()))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(Error::source_failed(
                    kind,
                    format!("fetcher panicked: {}", panic_message(panic.as_ref())),
                ))
            })
            .and_then(|payload| check_payload(kind, payload)),
        None => Err(Error::SourceUnavailable(kind)),
    };

    match result {
        Ok(payload) => {
            let entries = payload.len();
            store.apply(session.id(), payload).await;
            session.settle(kind, SourceOutcome::Success { entries });
            debug!(
                session_id = session.id(),
                source = %kind,
                entries,
                elapsed_ms = session.elapsed().as_millis() as u64,
                "Source refreshed"
            );
        }
        Err(err) => {
            warn!(session_id = session.id(), source = %kind, "Source failed: {}", err);
            session.settle(
                kind,
                SourceOutcome::Failure {
                    message: err.to_string(),
                },
            );
            let mut slot = first_failure
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if slot.is_none() {
                *slot = Some(err);
            }
        }
    }
}

fn check_payload(kind: SourceKind, payload: SourcePayload) -> Result<SourcePayload, Error> {
    if payload.kind() == kind {
        Ok(payload)
    } else {
        Err(Error::source_failed(
            kind,
            format!("fetcher returned a {} payload", payload.kind()),
        ))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic"
    }
}
