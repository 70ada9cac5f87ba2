mod utils;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use utils::test_utils::{init_test_env, recording_sources, TEST_ADDRESSES};
use wallet_refresh_sdk::{
    run_session, AccountStore, BalanceOptions, Error, FnSource, MinimumDurationGate, Network,
    RefreshSession, RefreshTrigger, SessionContext, SourceKind, SourceOutcome, SourcePayload,
};

fn test_context() -> SessionContext {
    SessionContext {
        session_id: 7,
        trigger: RefreshTrigger::UserGesture,
        network: Network::Mainnet,
        wallet_addresses: TEST_ADDRESSES.iter().map(|a| a.to_string()).collect(),
        balance_options: BalanceOptions::default(),
    }
}

async fn crashing_fetch(_ctx: SessionContext) -> Result<SourcePayload, Error> {
    panic!("positions backend crashed")
}

#[tokio::test(start_paused = true)]
async fn test_every_source_settles_before_return() {
    init_test_env();
    let (registry, _) = recording_sources(Duration::from_millis(100), &[SourceKind::WalletConnect]);
    let store = AccountStore::new();
    let session = RefreshSession::start(
        test_context(),
        vec![SourceKind::UniqueTokens, SourceKind::WalletConnect],
    );

    assert_eq!(
        session.outcome(SourceKind::UniqueTokens),
        Some(SourceOutcome::Pending)
    );
    assert!(!session.all_settled());

    let result = run_session(&session, &registry, &store, MinimumDurationGate::default()).await;

    assert!(matches!(result, Err(Error::Network(_))));
    assert!(session.all_settled());
    assert_eq!(
        session.outcome(SourceKind::UniqueTokens),
        Some(SourceOutcome::Success { entries: 1 })
    );
    assert!(session
        .outcome(SourceKind::WalletConnect)
        .is_some_and(|outcome| outcome.is_failure()));
    assert_eq!(session.outcome(SourceKind::Positions), None);
    assert_eq!(store.version(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_fetcher_fails_only_its_source() {
    init_test_env();
    let (mut registry, _) = recording_sources(Duration::from_millis(300), &[]);
    registry.register(Arc::new(FnSource::new(SourceKind::Positions, crashing_fetch)));
    let store = AccountStore::new();
    let session = RefreshSession::start(
        test_context(),
        vec![
            SourceKind::WalletNames,
            SourceKind::OnchainBalances,
            SourceKind::Positions,
        ],
    );

    let started = Instant::now();
    let result = run_session(&session, &registry, &store, MinimumDurationGate::default()).await;

    assert_eq!(started.elapsed(), Duration::from_millis(1250));
    let err = result.expect_err("Panicking source should fail the session");
    assert!(err.to_string().contains("positions backend crashed"));

    match session.outcome(SourceKind::Positions) {
        Some(SourceOutcome::Failure { message }) => {
            assert!(message.contains("fetcher panicked"))
        }
        other => panic!("Expected positions to fail, got {:?}", other),
    }

    // Siblings still wrote their slices
    assert_eq!(store.wallet_names().await.len(), TEST_ADDRESSES.len());
    assert_eq!(store.balances().await.len(), 1);
    assert!(store.positions().await.is_empty());
}
