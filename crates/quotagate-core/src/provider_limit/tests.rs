//! Tests for provider rate limiting

use super::*;
use crate::clock::{Clock, ManualClock};
use chrono::{Duration, TimeZone, Utc};
use quotagate_types::{GateConfig, ProviderLimitsConfig, RateLimitStatus, StatusChange};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()))
}

fn manager_with(limits: ProviderLimitsConfig) -> (RateLimitManager, Arc<ManualClock>) {
    let clock = clock();
    let manager = RateLimitManager::with_clock(clock.clone());
    manager.configure_provider("p", limits).unwrap();
    (manager, clock)
}

fn scenario_limits() -> ProviderLimitsConfig {
    ProviderLimitsConfig::per_minute(4).with_thresholds(0.75, 1.0)
}

async fn next_change(rx: &mut mpsc::UnboundedReceiver<StatusChange>) -> StatusChange {
    tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
        .await
        .expect("status change delivered")
        .expect("channel open")
}

async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<StatusChange>) {
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(rx.try_recv().is_err(), "unexpected extra notification");
}

fn channel_observer(manager: &RateLimitManager) -> mpsc::UnboundedReceiver<StatusChange> {
    let (tx, rx) = mpsc::unbounded_channel();
    manager.register_status_callback(move |change| {
        let _ = tx.send(change.clone());
    });
    rx
}

#[test]
fn test_scenario_warning_throttled_recovery() {
    let (manager, clock) = manager_with(scenario_limits());

    for _ in 0..3 {
        manager.register_call("p");
    }
    assert_eq!(manager.get_provider_status("p"), RateLimitStatus::Warning);

    manager.register_call("p");
    assert_eq!(manager.get_provider_status("p"), RateLimitStatus::Throttled);
    assert!(!manager.can_call("p"));

    clock.advance_secs(61);
    assert_eq!(manager.get_provider_status("p"), RateLimitStatus::Normal);
    assert_eq!(manager.get_provider_usage("p"), (0, 4));
    assert!(manager.can_call("p"));
}

#[test]
fn test_threshold_boundaries_follow_ceil() {
    // limit 10, warning 0.5 -> 5 calls, throttled 0.8 -> 8 calls
    let (manager, _clock) =
        manager_with(ProviderLimitsConfig::per_minute(10).with_thresholds(0.5, 0.8));

    for call in 1..=10 {
        manager.register_call("p");
        let expected = match call {
            1..=4 => RateLimitStatus::Normal,
            5..=7 => RateLimitStatus::Warning,
            _ => RateLimitStatus::Throttled,
        };
        assert_eq!(manager.get_provider_status("p"), expected, "after {} calls", call);
    }
}

#[test]
fn test_sliding_window_excludes_old_calls() {
    let (manager, clock) = manager_with(scenario_limits());

    manager.register_call("p");
    manager.register_call("p");
    clock.advance_secs(40);
    manager.register_call("p");
    assert_eq!(manager.get_provider_usage("p"), (3, 4));

    // First two calls are now 61s old, the third 21s
    clock.advance_secs(21);
    assert_eq!(manager.get_provider_usage("p"), (1, 4));
    assert_eq!(manager.get_provider_status("p"), RateLimitStatus::Normal);
}

#[test]
fn test_out_of_order_timestamps_are_pruned() {
    let (manager, clock) = manager_with(scenario_limits());
    let start = clock.now();

    clock.set(start + Duration::seconds(50));
    manager.register_call("p");
    // Late registration carrying an earlier instant
    clock.set(start + Duration::seconds(10));
    manager.register_call("p");
    clock.set(start + Duration::seconds(30));
    manager.register_call("p");
    assert_eq!(manager.get_provider_usage("p"), (3, 4));

    // Only the call at +10s is older than a minute
    clock.set(start + Duration::seconds(75));
    assert_eq!(manager.get_provider_usage("p"), (2, 4));
    manager.register_call("p");
    assert_eq!(manager.snapshot("p").unwrap().minute_count, 3);

    // +30s and +50s have aged out, only the +75s call remains
    clock.set(start + Duration::seconds(115));
    assert_eq!(manager.get_provider_usage("p"), (1, 4));
}

#[test]
fn test_unknown_provider_degrades_gracefully() {
    let manager = RateLimitManager::with_clock(clock());
    manager.register_call("ghost");
    manager.set_quota_exhausted("ghost", Utc::now());
    manager.clear_quota_exhaustion("ghost");
    assert_eq!(manager.get_provider_usage("ghost"), (0, 0));
    assert_eq!(manager.get_provider_status("ghost"), RateLimitStatus::Normal);
    assert!(manager.can_call("ghost"));
    assert!(manager.snapshot("ghost").is_none());
}

#[test]
fn test_unconfigured_primary_window_is_normal() {
    let limits = ProviderLimitsConfig { per_hour: 2, ..ProviderLimitsConfig::default() };
    let (manager, _clock) = manager_with(limits);

    for _ in 0..5 {
        manager.register_call("p");
    }
    assert_eq!(manager.get_provider_status("p"), RateLimitStatus::Normal);
    assert_eq!(manager.get_provider_usage("p"), (0, 0));
    // Hourly window is at its limit even though status is Normal
    assert!(!manager.can_call("p"));
    assert!(manager.time_until_available("p").is_some());
}

#[test]
fn test_quota_auto_recovers_on_query() {
    let (manager, clock) = manager_with(scenario_limits());
    manager.register_call("p");

    let reset = clock.now() + Duration::hours(2);
    manager.set_quota_exhausted("p", reset);
    assert_eq!(manager.get_provider_status("p"), RateLimitStatus::QuotaExhausted);
    assert!(!manager.can_call("p"));

    clock.set(reset + Duration::seconds(1));
    assert_eq!(manager.get_provider_status("p"), RateLimitStatus::Normal);
    assert!(!manager.snapshot("p").unwrap().quota_exhausted);
}

#[test]
fn test_quota_recovery_falls_through_to_thresholds() {
    let (manager, clock) = manager_with(scenario_limits());
    let reset = clock.now() + Duration::seconds(10);
    manager.set_quota_exhausted("p", reset);

    for _ in 0..3 {
        manager.register_call("p");
    }
    assert_eq!(manager.get_provider_status("p"), RateLimitStatus::QuotaExhausted);

    clock.advance_secs(10);
    assert_eq!(manager.get_provider_status("p"), RateLimitStatus::Warning);
}

#[test]
fn test_time_until_available() {
    let (manager, clock) = manager_with(scenario_limits());
    for _ in 0..4 {
        manager.register_call("p");
    }
    clock.advance_secs(15);
    let wait = manager.time_until_available("p").unwrap();
    assert_eq!(wait.as_secs(), 45);
    assert_eq!(manager.status_message("p"), "Throttled (try again in 45 seconds)");

    let midnight = quotagate_types::next_midnight_utc(clock.now());
    manager.set_quota_exhausted("p", midnight);
    assert_eq!(manager.status_message("p"), "Quota Exhausted (service restored at midnight UTC)");
    assert_eq!(
        manager.time_until_available("p").unwrap().as_secs(),
        u64::try_from((midnight - clock.now()).num_seconds()).unwrap()
    );
}

#[test]
fn test_invalid_thresholds_rejected() {
    let manager = RateLimitManager::with_clock(clock());
    let err = manager
        .configure_provider("p", ProviderLimitsConfig::per_minute(5).with_thresholds(0.9, 0.6))
        .unwrap_err();
    assert!(err.to_string().contains("providers.p.warning_threshold"));
    assert!(manager.is_empty());
}

#[test]
fn test_from_config_registers_providers() {
    let mut config = GateConfig::default();
    config.providers.insert("claude".into(), ProviderLimitsConfig::per_minute(10));
    config.providers.insert("gemini".into(), ProviderLimitsConfig::per_minute(20));

    let manager = RateLimitManager::from_config(&config, clock()).unwrap();
    assert_eq!(manager.providers(), vec!["claude".to_string(), "gemini".to_string()]);
    assert_eq!(manager.get_provider_usage("gemini"), (0, 20));
}

#[test]
fn test_reconfigure_keeps_history() {
    let (manager, _clock) = manager_with(scenario_limits());
    manager.register_call("p");
    manager.register_call("p");
    manager.configure_provider("p", ProviderLimitsConfig::per_minute(2).with_thresholds(0.5, 1.0)).unwrap();
    assert_eq!(manager.get_provider_usage("p"), (2, 2));
    assert_eq!(manager.get_provider_status("p"), RateLimitStatus::Throttled);
}

#[tokio::test]
async fn test_notifications_are_debounced() {
    let (manager, _clock) = manager_with(scenario_limits());
    let mut rx = channel_observer(&manager);

    manager.register_call("p");
    manager.register_call("p");
    assert_quiet(&mut rx).await;

    manager.register_call("p");
    let change = next_change(&mut rx).await;
    assert_eq!(change.previous, RateLimitStatus::Normal);
    assert_eq!(change.status, RateLimitStatus::Warning);

    manager.register_call("p");
    assert_eq!(next_change(&mut rx).await.status, RateLimitStatus::Throttled);

    // Sustained saturation does not re-notify
    manager.register_call("p");
    manager.register_call("p");
    assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn test_set_quota_exhausted_is_idempotent() {
    let (manager, clock) = manager_with(scenario_limits());
    let mut rx = channel_observer(&manager);

    let reset = clock.now() + Duration::hours(1);
    manager.set_quota_exhausted("p", reset);
    manager.set_quota_exhausted("p", reset + Duration::hours(1));

    let change = next_change(&mut rx).await;
    assert_eq!(change.status, RateLimitStatus::QuotaExhausted);
    assert_quiet(&mut rx).await;
    assert_eq!(manager.get_provider_status("p"), RateLimitStatus::QuotaExhausted);
    assert_eq!(
        manager.snapshot("p").unwrap().quota_reset_time,
        Some(reset + Duration::hours(1))
    );
}

#[tokio::test]
async fn test_clear_quota_notifies_threshold_status() {
    let (manager, clock) = manager_with(scenario_limits());
    for _ in 0..3 {
        manager.register_call("p");
    }
    let mut rx = channel_observer(&manager);

    manager.set_quota_exhausted("p", clock.now() + Duration::hours(1));
    assert_eq!(next_change(&mut rx).await.status, RateLimitStatus::QuotaExhausted);

    manager.clear_quota_exhaustion("p");
    let change = next_change(&mut rx).await;
    assert_eq!(change.previous, RateLimitStatus::QuotaExhausted);
    assert_eq!(change.status, RateLimitStatus::Warning);

    // Clearing again is a no-op
    manager.clear_quota_exhaustion("p");
    assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn test_panicking_observer_is_isolated() {
    let (manager, _clock) = manager_with(scenario_limits());
    manager.register_status_callback(|_| panic!("observer failure"));
    let mut rx = channel_observer(&manager);
    let counter = Arc::new(AtomicUsize::new(0));
    let seen = counter.clone();
    manager.register_status_callback(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    assert_eq!(manager.callback_count(), 3);

    for _ in 0..4 {
        manager.register_call("p");
    }

    assert_eq!(next_change(&mut rx).await.status, RateLimitStatus::Warning);
    assert_eq!(next_change(&mut rx).await.status, RateLimitStatus::Throttled);
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert_eq!(manager.get_provider_status("p"), RateLimitStatus::Throttled);
}

#[tokio::test]
async fn test_broadcast_subscription() {
    let (manager, clock) = manager_with(scenario_limits());
    let mut sub = manager.subscribe();

    manager.set_quota_exhausted("p", clock.now() + Duration::minutes(5));
    let change = sub.recv().await.unwrap();
    assert_eq!(change.provider, "p");
    assert_eq!(change.status, RateLimitStatus::QuotaExhausted);
}

#[test]
fn test_concurrent_registration() {
    let (manager, _clock) =
        manager_with(ProviderLimitsConfig::per_minute(1000).with_thresholds(0.5, 0.9));
    let manager = Arc::new(manager);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let m = manager.clone();
            std::thread::spawn(move || {
                for _ in 0..50 {
                    m.register_call("p");
                    let _ = m.get_provider_status("p");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(manager.get_provider_usage("p"), (400, 1000));
}

#[tokio::test]
async fn test_status_query_notifies_window_decay() {
    let (manager, clock) = manager_with(scenario_limits());
    let mut rx = channel_observer(&manager);

    for _ in 0..4 {
        manager.register_call("p");
    }
    assert_eq!(next_change(&mut rx).await.status, RateLimitStatus::Warning);
    assert_eq!(next_change(&mut rx).await.status, RateLimitStatus::Throttled);

    clock.advance_secs(61);
    assert_eq!(manager.get_provider_status("p"), RateLimitStatus::Normal);
    let change = next_change(&mut rx).await;
    assert_eq!(change.previous, RateLimitStatus::Throttled);
    assert_eq!(change.status, RateLimitStatus::Normal);

    // Repeated queries at the same status stay quiet
    assert_eq!(manager.get_provider_status("p"), RateLimitStatus::Normal);
    assert_quiet(&mut rx).await;
}

#[tokio::test]
async fn test_observer_sees_transitions_in_order() {
    let (manager, clock) = manager_with(scenario_limits());
    let (tx, mut rx) = mpsc::unbounded_channel();
    manager.register_status_callback(move |change| {
        // Slow observer: later changes must still queue behind this one
        std::thread::sleep(std::time::Duration::from_millis(5));
        let _ = tx.send(change.status);
    });

    let mut expected = Vec::new();
    for _ in 0..5 {
        for _ in 0..4 {
            manager.register_call("p");
        }
        clock.advance_secs(61);
        assert_eq!(manager.get_provider_status("p"), RateLimitStatus::Normal);
        expected.extend([RateLimitStatus::Warning, RateLimitStatus::Throttled, RateLimitStatus::Normal]);
    }

    let mut received = Vec::new();
    while received.len() < expected.len() {
        let status = tokio::time::timeout(std::time::Duration::from_secs(2), rx.recv())
            .await
            .expect("status change delivered")
            .expect("channel open");
        received.push(status);
    }
    assert_eq!(received, expected);
}
