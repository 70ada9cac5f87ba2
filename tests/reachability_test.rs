mod utils;

use std::time::Duration;

use tokio::sync::mpsc;
use utils::test_utils::{create_test_coordinator, test_config};
use wallet_refresh_sdk::reachability::subscribe;
use wallet_refresh_sdk::{Reachability, ReachabilityMonitor, RefreshTrigger, SourceKind};

#[test]
fn test_offline_to_online_emits_one_trigger() {
    let mut monitor = ReachabilityMonitor::new();

    assert_eq!(monitor.observe(Some(false)), None);
    assert_eq!(monitor.state(), Reachability::Unreachable);
    assert_eq!(
        monitor.observe(Some(true)),
        Some(RefreshTrigger::ConnectivityRestored)
    );
    assert_eq!(monitor.observe(Some(true)), None);
    assert_eq!(monitor.state(), Reachability::Reachable);
}

#[test]
fn test_initial_unknown_never_triggers() {
    let mut monitor = ReachabilityMonitor::new();
    assert_eq!(monitor.state(), Reachability::Unknown);
    assert_eq!(monitor.observe(Some(true)), None);

    let mut monitor = ReachabilityMonitor::new();
    assert_eq!(monitor.observe(Some(false)), None);
}

#[test]
fn test_unknown_observations_are_ignored() {
    let mut monitor = ReachabilityMonitor::new();
    monitor.observe(Some(false));

    assert_eq!(monitor.observe(None), None);
    assert_eq!(monitor.state(), Reachability::Unreachable);
    assert_eq!(monitor.history().count(), 1);

    // The offline state survives the unknown observation
    assert_eq!(
        monitor.observe(Some(true)),
        Some(RefreshTrigger::ConnectivityRestored)
    );
}

#[test]
fn test_every_transition_is_recorded() {
    let mut monitor = ReachabilityMonitor::new();
    for reachable in [true, true, false, false, true] {
        monitor.observe(Some(reachable));
    }

    let triggered: Vec<bool> = monitor.history().map(|t| t.triggered_refresh).collect();
    assert_eq!(triggered, vec![false, false, false, false, true]);

    let first = monitor.history().next().unwrap();
    assert_eq!(first.from, Reachability::Unknown);
    assert_eq!(first.to, Reachability::Reachable);
}

#[test]
fn test_history_is_bounded() {
    let mut monitor = ReachabilityMonitor::with_history_limit(3);
    for reachable in [false, true, false, true, false] {
        monitor.observe(Some(reachable));
    }
    assert_eq!(monitor.history().count(), 3);
    assert_eq!(monitor.history().last().unwrap().to, Reachability::Unreachable);
}

#[tokio::test(start_paused = true)]
async fn test_listener_refreshes_after_reconnect() {
    let (coordinator, sources) =
        create_test_coordinator(test_config(), Duration::from_millis(50), &[]);
    let (tx, rx) = mpsc::channel(8);
    let subscription = subscribe(coordinator.clone(), rx);
    let mut status = subscription.status();

    tx.send(Some(true)).await.unwrap();
    tx.send(Some(true)).await.unwrap();
    tx.send(None).await.unwrap();
    tx.send(Some(false)).await.unwrap();
    status
        .wait_for(|state| *state == Reachability::Unreachable)
        .await
        .unwrap();
    assert_eq!(sources[&SourceKind::UniqueTokens].calls(), 0);
    assert!(!coordinator.is_refreshing());

    tx.send(Some(true)).await.unwrap();
    status
        .wait_for(|state| *state == Reachability::Reachable)
        .await
        .unwrap();
    assert!(coordinator.is_refreshing());

    coordinator.wait_idle().await;
    assert_eq!(sources[&SourceKind::UniqueTokens].calls(), 1);
    let report = coordinator.last_report().expect("Reconnect should refresh");
    assert_eq!(report.trigger, RefreshTrigger::ConnectivityRestored);

    drop(tx);
    let monitor = subscription.join().await.expect("Listener should exit cleanly");
    assert_eq!(monitor.history().filter(|t| t.triggered_refresh).count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_during_refresh_is_dropped() {
    let (coordinator, sources) =
        create_test_coordinator(test_config(), Duration::from_millis(50), &[]);
    let (tx, rx) = mpsc::channel(8);
    let subscription = subscribe(coordinator.clone(), rx);
    let mut status = subscription.status();

    assert!(coordinator.request_refresh(RefreshTrigger::UserGesture));
    tx.send(Some(false)).await.unwrap();
    tx.send(Some(true)).await.unwrap();
    status
        .wait_for(|state| *state == Reachability::Reachable)
        .await
        .unwrap();

    coordinator.wait_idle().await;
    assert_eq!(sources[&SourceKind::UniqueTokens].calls(), 1);
    assert_eq!(
        coordinator.last_report().unwrap().trigger,
        RefreshTrigger::UserGesture
    );

    subscription.unsubscribe();
    assert!(subscription.join().await.is_some());
}

#[tokio::test]
async fn test_unsubscribe_stops_listener() {
    let (coordinator, _) = create_test_coordinator(test_config(), Duration::ZERO, &[]);
    let (tx, rx) = mpsc::channel(8);
    let subscription = subscribe(coordinator, rx);

    subscription.unsubscribe();
    let monitor = subscription.join().await.expect("Listener should stop");
    assert_eq!(monitor.state(), Reachability::Unknown);
    assert!(tx.is_closed());
}
