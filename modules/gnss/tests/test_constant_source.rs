// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::{
    position::Position,
    request::{AccessState, AccuracyLevel, BackgroundMode, ListenerRequest},
};
use gnss::constant_source::{ConstantSource, ConstantSourceConfig};
use module_core::platform::LocationPlatform;
use std::{io::ErrorKind, time::Duration};
use tokio::time::timeout;

const TIMEOUT_MS: u64 = 100;
const VELOCITY: f64 = 2.77778;

fn route() -> Vec<Position> {
    vec![
        Position::new(52.026649, 11.282535),
        Position::new(52.026751, 11.282047),
        Position::new(52.026807, 11.281746),
    ]
}

fn create_source(access: AccessState) -> ConstantSource {
    ConstantSource::new(
        &route(),
        ConstantSourceConfig {
            velocity: VELOCITY,
            interval: Duration::from_millis(20),
            access,
        },
    )
    .unwrap()
}

#[test]
fn report_creation_error_with_empty_positions() {
    let source = ConstantSource::new(&[], ConstantSourceConfig::default());
    assert!(source.is_err());
}

#[test]
fn report_creation_error_with_invalid_position() {
    let source = ConstantSource::new(
        &[Position::new(91.0, 11.0)],
        ConstantSourceConfig::default(),
    );
    assert!(source.is_err());
}

#[test]
fn report_creation_error_with_zero_interval() {
    let source = ConstantSource::new(
        &route(),
        ConstantSourceConfig {
            interval: Duration::ZERO,
            ..ConstantSourceConfig::default()
        },
    );
    assert_eq!(source.err().map(|e| e.kind()), Some(ErrorKind::InvalidInput));
}

#[test]
fn report_creation_error_with_invalid_velocity() {
    for velocity in [-1000.0, -0.5, f64::NAN, f64::INFINITY] {
        let source = ConstantSource::new(
            &route(),
            ConstantSourceConfig {
                velocity,
                ..ConstantSourceConfig::default()
            },
        );
        assert_eq!(
            source.err().map(|e| e.kind()),
            Some(ErrorKind::InvalidInput),
            "velocity {velocity} accepted"
        );
    }
}

#[tokio::test]
#[test_log::test]
async fn standing_receiver_keeps_its_position() {
    let source = ConstantSource::new(
        &route(),
        ConstantSourceConfig {
            velocity: 0.0,
            interval: Duration::from_millis(10),
            access: AccessState::Available,
        },
    )
    .unwrap();
    let request = ListenerRequest::new(BackgroundMode::None, AccuracyLevel::High);
    let mut subscription = source.subscribe(&request).await.unwrap();
    let first = timeout(Duration::from_millis(TIMEOUT_MS), subscription.next())
        .await
        .expect("No reading within timeout")
        .unwrap();
    let second = timeout(Duration::from_millis(TIMEOUT_MS), subscription.next())
        .await
        .expect("No reading within timeout")
        .unwrap();
    assert_eq!(first.position, second.position);
    assert_eq!(second.speed, 0.0);
}

#[tokio::test]
#[test_log::test]
async fn configured_access_is_reported() {
    let source = create_source(AccessState::Denied);
    let request = ListenerRequest::new(BackgroundMode::None, AccuracyLevel::High);
    assert_eq!(
        source.request_access(&request).await.unwrap(),
        AccessState::Denied
    );
    assert_eq!(
        source.access_state(&request).await.unwrap(),
        AccessState::Denied
    );
}

#[tokio::test]
#[test_log::test]
async fn subscription_drives_along_the_route() {
    let source = create_source(AccessState::Available);
    let request = ListenerRequest::new(BackgroundMode::None, AccuracyLevel::High);
    let mut subscription = source.subscribe(&request).await.unwrap();

    let first = timeout(Duration::from_millis(TIMEOUT_MS), subscription.next())
        .await
        .expect("No reading within timeout")
        .unwrap();
    let second = timeout(Duration::from_millis(TIMEOUT_MS), subscription.next())
        .await
        .expect("No reading within timeout")
        .unwrap();

    assert!((first.latitude() - 52.026649).abs() < 1e-7);
    assert!((first.longitude() - 11.282535).abs() < 1e-7);
    assert_eq!(first.speed, VELOCITY);
    assert_eq!(first.position_accuracy, 10.0);
    assert!(first.heading > 270.0 && first.heading < 360.0);
    assert_ne!(first.position, second.position);
    assert!(second.timestamp >= first.timestamp);
}

#[tokio::test]
#[test_log::test]
async fn current_position_does_not_move_the_route() {
    let source = create_source(AccessState::Available);
    let first = source.current_position(AccuracyLevel::Low).await.unwrap();
    let second = source.current_position(AccuracyLevel::Low).await.unwrap();
    assert_eq!(first.position, second.position);
    assert_eq!(first.position_accuracy, 1000.0);
}
