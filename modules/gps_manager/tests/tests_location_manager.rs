// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::{
    error::GpsError,
    request::{AccessState, AccuracyLevel, BackgroundMode, ListenerRequest},
    test_helper::test_time_source::TestTimeSource,
};
use gps_manager::{GpsManager, ManagerConfig};
use module_core::{
    EventBus, EventKind, EventKindType, payload_ref,
    test_helper::{simulated_platform::SimulatedPlatform, wait_for_event},
};
use std::time::Duration;

use test_utils::*;

fn high_accuracy() -> ListenerRequest {
    ListenerRequest::new(BackgroundMode::None, AccuracyLevel::High)
}

#[tokio::test]
#[test_log::test]
async fn nothing_is_cached_before_the_first_listener() {
    let platform = SimulatedPlatform::default();
    let manager = create_manager(
        &platform,
        &EventBus::default(),
        test_config(),
        &TestTimeSource::default(),
    );
    assert_eq!(manager.current_listener(), None);
    assert_eq!(manager.get_last_reading(), None);
}

#[tokio::test]
#[test_log::test]
async fn listen_receive_and_stop() {
    let platform = SimulatedPlatform::default();
    let clock = TestTimeSource::default();
    let manager = create_manager(&platform, &EventBus::default(), test_config(), &clock);

    let access = manager
        .request_access(ListenerRequest::default())
        .await
        .unwrap();
    assert_eq!(access, AccessState::Available);

    let listener = manager.start_listener(high_accuracy()).await.unwrap();
    assert_eq!(listener.accuracy, AccuracyLevel::High);
    assert_eq!(listener.background_mode, BackgroundMode::None);
    assert_eq!(manager.current_listener(), Some(listener));
    assert_eq!(platform.subscriptions(), vec![high_accuracy()]);

    let mut readings = manager.readings();
    let reading = reading_at(&clock, 52.026649, 11.282535);
    assert_eq!(platform.emit(reading), 1);
    assert_eq!(next_reading(&mut readings).await, Some(reading));

    manager.stop_listener().await;
    assert_eq!(next_reading(&mut readings).await, None);
    assert_eq!(manager.current_listener(), None);
    assert_eq!(platform.active_subscriptions(), 0);
}

#[tokio::test]
#[test_log::test]
async fn denied_access_prevents_listener() {
    let platform = SimulatedPlatform::new(AccessState::Denied);
    let manager = create_manager(
        &platform,
        &EventBus::default(),
        test_config(),
        &TestTimeSource::default(),
    );

    let access = manager.request_access(high_accuracy()).await.unwrap();
    assert_eq!(access, AccessState::Denied);

    let result = manager.start_listener(high_accuracy()).await;
    assert_eq!(result, Err(GpsError::Permission(AccessState::Denied)));
    assert_eq!(manager.current_listener(), None);
    assert!(platform.subscriptions().is_empty());
}

#[tokio::test]
#[test_log::test]
async fn platform_failure_is_not_a_denial() {
    let platform = SimulatedPlatform::default();
    platform.fail_with("location service crashed");
    let manager = create_manager(
        &platform,
        &EventBus::default(),
        test_config(),
        &TestTimeSource::default(),
    );
    let result = manager.request_access(high_accuracy()).await;
    assert_eq!(
        result,
        Err(GpsError::Platform("location service crashed".to_string()))
    );
}

#[tokio::test]
#[test_log::test]
async fn second_start_is_rejected_and_keeps_first_listener() {
    let platform = SimulatedPlatform::default();
    let clock = TestTimeSource::default();
    let manager = create_manager(&platform, &EventBus::default(), test_config(), &clock);

    let first = manager.start_listener(high_accuracy()).await.unwrap();
    let mut readings = manager.readings();
    let second = manager
        .start_listener(ListenerRequest::new(
            BackgroundMode::Realtime,
            AccuracyLevel::Lowest,
        ))
        .await;
    assert_eq!(second, Err(GpsError::AlreadyListening(first.session)));
    assert_eq!(manager.current_listener(), Some(first));
    assert_eq!(platform.active_subscriptions(), 1);

    let reading = reading_at(&clock, 1.0, 2.0);
    platform.emit(reading);
    assert_eq!(next_reading(&mut readings).await, Some(reading));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[test_log::test]
async fn concurrent_starts_create_a_single_listener() {
    let platform = SimulatedPlatform::default();
    let manager = create_manager(
        &platform,
        &EventBus::default(),
        test_config(),
        &TestTimeSource::default(),
    );

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let manager = manager.clone();
            tokio::spawn(async move { manager.start_listener(high_accuracy()).await })
        })
        .collect();
    let mut started = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => started += 1,
            Err(e) => assert!(matches!(e, GpsError::AlreadyListening(1))),
        }
    }
    assert_eq!(started, 1);
    assert_eq!(platform.active_subscriptions(), 1);

    manager.stop_listener().await;
    assert_eq!(platform.active_subscriptions(), 0);
}

#[tokio::test]
#[test_log::test]
async fn stop_is_idempotent_and_sessions_count_up() {
    let platform = SimulatedPlatform::default();
    let manager = create_manager(
        &platform,
        &EventBus::default(),
        test_config(),
        &TestTimeSource::default(),
    );
    manager.stop_listener().await;

    let first = manager.start_listener(high_accuracy()).await.unwrap();
    manager.stop_listener().await;
    manager.stop_listener().await;
    assert_eq!(manager.current_listener(), None);

    let second = manager.start_listener(high_accuracy()).await.unwrap();
    assert_eq!(first.session, 1);
    assert_eq!(second.session, 2);
}

#[tokio::test]
#[test_log::test]
async fn stopped_stream_drops_pending_readings() {
    let platform = SimulatedPlatform::default();
    let clock = TestTimeSource::default();
    let manager = create_manager(&platform, &EventBus::default(), test_config(), &clock);
    manager.start_listener(high_accuracy()).await.unwrap();
    let mut readings = manager.readings();

    for i in 0..3 {
        platform.emit(reading_at(&clock, f64::from(i), 0.0));
    }
    manager.stop_listener().await;
    assert_eq!(next_reading(&mut readings).await, None);
}

#[tokio::test]
#[test_log::test]
async fn readings_without_listener_are_complete() {
    let platform = SimulatedPlatform::default();
    let manager = create_manager(
        &platform,
        &EventBus::default(),
        test_config(),
        &TestTimeSource::default(),
    );
    let mut readings = manager.readings();
    assert_eq!(next_reading(&mut readings).await, None);
}

#[tokio::test]
#[test_log::test]
async fn late_stream_only_sees_new_readings() {
    let platform = SimulatedPlatform::default();
    let clock = TestTimeSource::default();
    let manager = create_manager(&platform, &EventBus::default(), test_config(), &clock);
    manager.start_listener(high_accuracy()).await.unwrap();

    let mut early = manager.readings();
    let first = reading_at(&clock, 1.0, 1.0);
    platform.emit(first);
    assert_eq!(next_reading(&mut early).await, Some(first));

    let mut late = manager.readings();
    let second = reading_at(&clock, 2.0, 2.0);
    platform.emit(second);
    assert_eq!(next_reading(&mut late).await, Some(second));
    assert_eq!(next_reading(&mut early).await, Some(second));
}

#[tokio::test]
#[test_log::test]
async fn slow_stream_skips_oldest_readings() {
    let platform = SimulatedPlatform::default();
    let clock = TestTimeSource::default();
    let event_bus = EventBus::default();
    let mut events = event_bus.subscribe();
    let config = ManagerConfig {
        reading_buffer: 4,
        ..test_config()
    };
    let manager = create_manager(&platform, &event_bus, config, &clock);
    manager.start_listener(high_accuracy()).await.unwrap();
    let mut readings = manager.readings();

    for i in 0..20 {
        platform.emit(reading_at(&clock, f64::from(i), 0.0));
    }
    loop {
        let event = wait_for_event(
            &mut events,
            Duration::from_millis(TIMEOUT_MS),
            EventKindType::ReadingEvent,
        )
        .await;
        let latitude = payload_ref!(event.kind, EventKind::ReadingEvent).map(|r| r.latitude());
        if latitude == Some(19.0) {
            break;
        }
    }

    let mut latitudes = Vec::new();
    for _ in 0..4 {
        let reading = next_reading(&mut readings).await.unwrap();
        latitudes.push(reading.latitude());
    }
    assert_eq!(latitudes, vec![16.0, 17.0, 18.0, 19.0]);

    let next = reading_at(&clock, 20.0, 0.0);
    platform.emit(next);
    assert_eq!(next_reading(&mut readings).await, Some(next));
}

#[tokio::test]
#[test_log::test]
async fn last_reading_follows_the_stream() {
    let platform = SimulatedPlatform::default();
    let clock = TestTimeSource::default();
    let manager = create_manager(&platform, &EventBus::default(), test_config(), &clock);
    manager.start_listener(high_accuracy()).await.unwrap();
    let mut readings = manager.readings();

    let first = reading_at(&clock, 1.0, 1.0);
    platform.emit(first);
    next_reading(&mut readings).await;
    assert_eq!(manager.get_last_reading(), Some(first));
    assert_eq!(manager.get_last_reading(), Some(first));

    clock.advance(Duration::from_secs(1));
    let second = reading_at(&clock, 2.0, 2.0);
    platform.emit(second);
    next_reading(&mut readings).await;
    assert_eq!(manager.get_last_reading(), Some(second));

    manager.stop_listener().await;
    assert_eq!(manager.get_last_reading(), Some(second));
}

#[tokio::test]
#[test_log::test]
async fn current_position_times_out_without_signal() {
    let platform = SimulatedPlatform::default();
    let manager = create_manager(
        &platform,
        &EventBus::default(),
        test_config(),
        &TestTimeSource::default(),
    );
    let result = manager.get_current_position().await;
    assert!(matches!(result, Err(GpsError::Unavailable(_))));
    assert_eq!(manager.get_last_reading(), None);
}

#[tokio::test]
#[test_log::test]
async fn current_position_updates_cache() {
    let platform = SimulatedPlatform::default();
    let clock = TestTimeSource::default();
    let manager = create_manager(&platform, &EventBus::default(), test_config(), &clock);
    let fix = reading_at(&clock, 52.0, 11.0);
    platform.queue_fix(fix);

    assert_eq!(manager.get_current_position().await, Ok(fix));
    assert_eq!(manager.get_last_reading(), Some(fix));
    assert_eq!(platform.fix_requests(), vec![AccuracyLevel::Normal]);
}

#[tokio::test]
#[test_log::test]
async fn older_fix_does_not_replace_cached_reading() {
    let platform = SimulatedPlatform::default();
    let clock = TestTimeSource::default();
    let manager = create_manager(&platform, &EventBus::default(), test_config(), &clock);
    let old_fix = reading_at(&clock, 1.0, 1.0);
    clock.advance(Duration::from_secs(10));
    let new_fix = reading_at(&clock, 2.0, 2.0);

    platform.queue_fix(new_fix);
    platform.queue_fix(old_fix);
    manager.get_current_position().await.unwrap();
    assert_eq!(manager.get_current_position().await, Ok(old_fix));
    assert_eq!(manager.get_last_reading(), Some(new_fix));
}

#[tokio::test]
#[test_log::test]
async fn current_position_runs_next_to_listener() {
    let platform = SimulatedPlatform::default();
    let clock = TestTimeSource::default();
    let manager = create_manager(&platform, &EventBus::default(), test_config(), &clock);
    let listener = manager.start_listener(high_accuracy()).await.unwrap();
    let mut readings = manager.readings();

    let fix = reading_at(&clock, 4.0, 4.0);
    platform.queue_fix(fix);
    let one_shot = {
        let manager = manager.clone();
        tokio::spawn(async move {
            manager
                .get_current_position_within(Duration::from_millis(500))
                .await
        })
    };
    let streamed = reading_at(&clock, 3.0, 3.0);
    platform.emit(streamed);
    assert_eq!(next_reading(&mut readings).await, Some(streamed));
    assert_eq!(one_shot.await.unwrap(), Ok(fix));
    assert_eq!(manager.current_listener(), Some(listener));

    let result = manager.get_current_position().await;
    assert!(matches!(result, Err(GpsError::Unavailable(_))));
    assert_eq!(manager.current_listener(), Some(listener));

    let after = reading_at(&clock, 5.0, 5.0);
    platform.emit(after);
    assert_eq!(next_reading(&mut readings).await, Some(after));
    assert_eq!(
        platform.fix_requests(),
        vec![AccuracyLevel::High, AccuracyLevel::High]
    );
}

#[tokio::test]
#[test_log::test]
async fn request_access_keeps_listener_running() {
    let platform = SimulatedPlatform::default();
    let clock = TestTimeSource::default();
    let manager = create_manager(&platform, &EventBus::default(), test_config(), &clock);
    let listener = manager.start_listener(high_accuracy()).await.unwrap();
    let mut readings = manager.readings();

    platform.set_access(AccessState::Restricted);
    let access = manager
        .request_access(ListenerRequest::new(
            BackgroundMode::Standard,
            AccuracyLevel::High,
        ))
        .await
        .unwrap();
    assert_eq!(access, AccessState::Restricted);
    assert_eq!(manager.current_listener(), Some(listener));

    let reading = reading_at(&clock, 7.0, 7.0);
    platform.emit(reading);
    assert_eq!(next_reading(&mut readings).await, Some(reading));
}

#[tokio::test]
#[test_log::test]
async fn fresh_cache_answers_without_fix() {
    let platform = SimulatedPlatform::default();
    let clock = TestTimeSource::default();
    let config = ManagerConfig {
        max_reading_age: Duration::from_secs(60),
        ..test_config()
    };
    let manager = create_manager(&platform, &EventBus::default(), config, &clock);
    manager.start_listener(high_accuracy()).await.unwrap();
    let mut readings = manager.readings();
    let cached = reading_at(&clock, 10.0, 10.0);
    platform.emit(cached);
    next_reading(&mut readings).await;

    clock.advance(Duration::from_secs(60));
    assert_eq!(
        manager.get_last_reading_or_current_position().await,
        Ok(cached)
    );
    assert!(platform.fix_requests().is_empty());
}

#[tokio::test]
#[test_log::test]
async fn stale_cache_requests_new_fix() {
    let platform = SimulatedPlatform::default();
    let clock = TestTimeSource::default();
    let config = ManagerConfig {
        max_reading_age: Duration::from_secs(60),
        ..test_config()
    };
    let manager = create_manager(&platform, &EventBus::default(), config, &clock);
    let cached = reading_at(&clock, 10.0, 10.0);
    platform.queue_fix(cached);
    manager.get_current_position().await.unwrap();

    clock.advance(Duration::from_secs(61));
    let fix = reading_at(&clock, 11.0, 11.0);
    platform.queue_fix(fix);
    assert_eq!(
        manager.get_last_reading_or_current_position().await,
        Ok(fix)
    );
    assert_eq!(platform.fix_requests().len(), 2);

    clock.advance(Duration::from_secs(61));
    let result = manager.get_last_reading_or_current_position().await;
    assert!(matches!(result, Err(GpsError::Unavailable(_))));
}

#[tokio::test]
#[test_log::test]
async fn platform_closing_subscription_completes_stream() {
    let platform = SimulatedPlatform::default();
    let manager = create_manager(
        &platform,
        &EventBus::default(),
        test_config(),
        &TestTimeSource::default(),
    );
    let listener = manager.start_listener(high_accuracy()).await.unwrap();
    let mut readings = manager.readings();

    platform.close_subscriptions();
    assert_eq!(next_reading(&mut readings).await, None);
    assert_eq!(manager.current_listener(), Some(listener));

    manager.stop_listener().await;
    assert_eq!(manager.current_listener(), None);
}

#[tokio::test]
#[test_log::test]
async fn listener_lifecycle_is_published() {
    let platform = SimulatedPlatform::default();
    let clock = TestTimeSource::default();
    let event_bus = EventBus::default();
    let mut events = event_bus.subscribe();
    let manager = create_manager(&platform, &event_bus, test_config(), &clock);

    manager.request_access(high_accuracy()).await.unwrap();
    let event = wait_for_event(
        &mut events,
        Duration::from_millis(TIMEOUT_MS),
        EventKindType::AccessChangedEvent,
    )
    .await;
    assert_eq!(
        payload_ref!(event.kind, EventKind::AccessChangedEvent),
        Some(&AccessState::Available)
    );

    let listener = manager.start_listener(high_accuracy()).await.unwrap();
    let event = wait_for_event(
        &mut events,
        Duration::from_millis(TIMEOUT_MS),
        EventKindType::ListenerStartedEvent,
    )
    .await;
    assert_eq!(
        payload_ref!(event.kind, EventKind::ListenerStartedEvent),
        Some(&listener)
    );

    let reading = reading_at(&clock, 8.0, 8.0);
    platform.emit(reading);
    let event = wait_for_event(
        &mut events,
        Duration::from_millis(TIMEOUT_MS),
        EventKindType::ReadingEvent,
    )
    .await;
    assert_eq!(payload_ref!(event.kind, EventKind::ReadingEvent), Some(&reading));

    manager.stop_listener().await;
    let event = wait_for_event(
        &mut events,
        Duration::from_millis(TIMEOUT_MS),
        EventKindType::ListenerStoppedEvent,
    )
    .await;
    assert_eq!(
        payload_ref!(event.kind, EventKind::ListenerStoppedEvent),
        Some(&listener)
    );
}

#[tokio::test]
#[test_log::test]
async fn notification_text_is_independent_of_listener() {
    let platform = SimulatedPlatform::default();
    let event_bus = EventBus::default();
    let mut events = event_bus.subscribe();
    let manager = create_manager(
        &platform,
        &event_bus,
        test_config(),
        &TestTimeSource::default(),
    );
    assert_eq!(manager.title(), "");

    manager.set_title("Tracking");
    manager.set_message("Recording your run");
    assert_eq!(manager.title(), "Tracking");
    assert_eq!(manager.message(), "Recording your run");
    assert_eq!(manager.current_listener(), None);

    wait_for_event(
        &mut events,
        Duration::from_millis(TIMEOUT_MS),
        EventKindType::NotificationChangedEvent,
    )
    .await;
    let event = wait_for_event(
        &mut events,
        Duration::from_millis(TIMEOUT_MS),
        EventKindType::NotificationChangedEvent,
    )
    .await;
    let text = payload_ref!(event.kind, EventKind::NotificationChangedEvent).unwrap();
    assert_eq!(text.title, "Tracking");
    assert_eq!(text.message, "Recording your run");
}

#[test]
fn config_defaults_fill_missing_fields() {
    let config: ManagerConfig =
        serde_json::from_str(r#"{ "max_reading_age": "00:02:00.000" }"#).unwrap();
    assert_eq!(config.max_reading_age, Duration::from_secs(120));
    assert_eq!(
        config.current_position_timeout,
        ManagerConfig::default().current_position_timeout
    );
    assert_eq!(config.one_shot_accuracy, AccuracyLevel::Normal);
}
