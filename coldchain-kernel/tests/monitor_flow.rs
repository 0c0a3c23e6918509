use coldchain_devkit::{StubReadingFeed, TelemetryMessageBuilder, TestHarness};
use coldchain_kernel::models::{MonitorStatus, TemperatureRange};
use coldchain_kernel::ports::{KeyValueStore, MemoryStore};
use coldchain_kernel::range_store::{KEY_MAX_CELSIUS, KEY_MIN_CELSIUS};
use coldchain_kernel::{FeedError, MonitorError, MonitorHandle, TemperatureMonitor};
use std::sync::Arc;

#[tokio::test]
async fn alerts_fire_only_on_transitions() {
    let mut h = TestHarness::new().unwrap();

    // 41 °F = 5 °C, 68 °F = 20 °C, plage par défaut [-10, 10]
    h.feed_fahrenheit(&[41.0, 42.0, 68.0, 70.0, 75.0, 41.0, 40.0]).await.unwrap();

    let flags: Vec<bool> = h.drain_alerts().iter().map(|a| a.is_out_of_range).collect();
    assert_eq!(flags, vec![false, true, false]);
    assert_eq!(h.monitor.stats().alerts_emitted, 3);
    assert_eq!(h.monitor.stats().readings_applied, 7);
}

#[tokio::test]
async fn late_subscriber_receives_last_transition() {
    let h = TestHarness::new().unwrap();
    h.feed_fahrenheit(&[68.0, 69.0]).await.unwrap();

    let mut late = h.monitor.subscribe_alerts();
    let replay = late.try_recv().unwrap();
    assert!(replay.is_out_of_range);
    assert_eq!(replay.fahrenheit, Some(68.0));
    assert!(late.try_recv().is_none());
}

#[tokio::test]
async fn malformed_readings_are_dropped() {
    let h = TestHarness::new().unwrap();
    h.feed_fahrenheit(&[50.0]).await.unwrap();
    let before = h.monitor.state();

    assert!(h.feed.simulate_text("sensor offline"));
    assert!(h.feed.simulate_payload(b"\"\""));
    h.wait_for_processed(3).await.unwrap();

    assert_eq!(h.monitor.state(), before);
    assert_eq!(h.monitor.stats().readings_dropped, 2);
}

#[tokio::test]
async fn telemetry_payloads_reach_the_monitor() {
    let h = TestHarness::new().unwrap();
    let payload = TelemetryMessageBuilder::reading_at(71.6, 1_700_000_000_000);
    assert!(h.feed.simulate_payload(&TelemetryMessageBuilder::to_bytes(&payload)));

    let state = h.wait_for_state(|s| s.fahrenheit.is_some()).await.unwrap();
    assert_eq!(state.formatted_fahrenheit(), "71.60 °F");
    assert_eq!(state.formatted_celsius(), "22.00 °C");
    assert_eq!(state.last_updated_millis, Some(1_700_000_000_000));
    assert_eq!(state.status(), MonitorStatus::OutOfRange);
}

#[tokio::test]
async fn feed_error_is_kept_until_acknowledged() {
    let h = TestHarness::new().unwrap();
    h.feed_fahrenheit(&[41.0]).await.unwrap();
    h.feed.simulate_error("connection cancelled");

    let state = h.wait_for_state(|s| s.error.is_some()).await.unwrap();
    assert_eq!(state.status(), MonitorStatus::Error);
    assert_eq!(state.fahrenheit, Some(41.0));

    h.monitor.acknowledge_error();
    let state = h.monitor.state();
    assert_eq!(state.error, None);
    assert_eq!(state.status(), MonitorStatus::InRange);
}

#[tokio::test]
async fn range_update_reclassifies_and_persists() {
    let mut h = TestHarness::new().unwrap();
    h.feed_fahrenheit(&[41.0]).await.unwrap(); // 5 °C
    assert!(!h.next_alert().await.unwrap().is_out_of_range);

    h.monitor.update_range(6.0, 12.0).unwrap();
    let alert = h.next_alert().await.unwrap();
    assert!(alert.is_out_of_range);
    assert_eq!(alert.range, TemperatureRange::new(6.0, 12.0));
    assert_eq!(h.store.get(KEY_MIN_CELSIUS).unwrap().as_deref(), Some("6"));
    assert_eq!(h.store.get(KEY_MAX_CELSIUS).unwrap().as_deref(), Some("12"));

    let err = h.monitor.update_range(12.0, 6.0).unwrap_err();
    assert!(matches!(err, MonitorError::InvalidRange { .. }));
    assert_eq!(h.monitor.state().range, TemperatureRange::new(6.0, 12.0));
    assert_eq!(h.store.get(KEY_MIN_CELSIUS).unwrap().as_deref(), Some("6"));
    assert!(h.drain_alerts().is_empty());
}

#[tokio::test]
async fn persisted_range_is_used_at_startup() {
    let mut h = TestHarness::with_range(-2.0, 4.0).unwrap();
    h.feed_fahrenheit(&[41.0]).await.unwrap(); // 5 °C > 4 °C
    assert!(h.next_alert().await.unwrap().is_out_of_range);
}

#[tokio::test]
async fn shutdown_unsubscribes_exactly_once() {
    let h = TestHarness::new().unwrap();
    h.handle.shutdown();
    h.handle.shutdown();
    assert!(!h.handle.is_attached());
    assert!(!h.feed.is_subscribed());
    assert_eq!(h.feed.unsubscribe_calls(), 1);

    // après arrêt, plus aucune lecture n'atteint le moniteur
    assert!(!h.feed.simulate_reading(68.0));
    assert_eq!(h.monitor.stats().readings_applied, 0);

    let controller = h.feed.clone();
    drop(h);
    assert_eq!(controller.unsubscribe_calls(), 1);
}

#[tokio::test]
async fn dropping_handle_unsubscribes() {
    let monitor = Arc::new(TemperatureMonitor::new(Arc::new(MemoryStore::new())));
    let (feed, controller) = StubReadingFeed::new();
    let handle = MonitorHandle::attach(monitor, Box::new(feed)).unwrap();
    assert!(controller.is_subscribed());

    drop(handle);
    assert!(!controller.is_subscribed());
    assert_eq!(controller.unsubscribe_calls(), 1);
}

#[tokio::test]
async fn attach_reports_subscribe_failure() {
    let monitor = Arc::new(TemperatureMonitor::new(Arc::new(MemoryStore::new())));
    let (feed, controller) = StubReadingFeed::new();
    controller.fail_next_subscribe("broker down");

    let result = MonitorHandle::attach(monitor, Box::new(feed));
    assert!(matches!(result, Err(FeedError::Transport(_))));
    assert_eq!(controller.unsubscribe_calls(), 0);
}
