use crate::position::Position;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sampled location and motion observation produced by a location platform.
///
/// Readings are plain values: once produced they are never modified, consumers
/// receive copies. Units are meters for `altitude` and both accuracy radii,
/// degrees (north = 0, clockwise) for `heading` and `heading_accuracy`, and
/// meters per second for `speed`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub position: Position,
    pub altitude: f64,
    pub position_accuracy: f64,
    pub heading: f64,
    pub heading_accuracy: f64,
    pub speed: f64,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Creates a reading for `position` sampled at `timestamp`.
    ///
    /// All motion values start at zero, use the `with_*` functions to fill them in.
    ///
    /// ```rust
    /// use common::{position::Position, reading::Reading};
    ///
    /// let reading = Reading::new(Position::new(52.0, 11.0), chrono::Utc::now())
    ///     .with_speed(2.5)
    ///     .with_heading(90.0, 5.0);
    /// assert_eq!(reading.speed, 2.5);
    /// ```
    pub fn new(position: Position, timestamp: DateTime<Utc>) -> Self {
        Reading {
            position,
            altitude: 0.0,
            position_accuracy: 0.0,
            heading: 0.0,
            heading_accuracy: 0.0,
            speed: 0.0,
            timestamp,
        }
    }

    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = altitude;
        self
    }

    pub fn with_position_accuracy(mut self, accuracy: f64) -> Self {
        self.position_accuracy = accuracy;
        self
    }

    pub fn with_heading(mut self, heading: f64, accuracy: f64) -> Self {
        self.heading = heading;
        self.heading_accuracy = accuracy;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn latitude(&self) -> f64 {
        self.position.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.position.longitude
    }

    /// Returns how old the reading is at `now`.
    ///
    /// Readings stamped in the future (misbehaving sensor clock) have an age of zero.
    pub fn age(&self, now: DateTime<Utc>) -> std::time::Duration {
        (now - self.timestamp).to_std().unwrap_or_default()
    }

    /// Returns `true` if the reading is not older than `max_age` at `now`.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: std::time::Duration) -> bool {
        self.age(now) <= max_age
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
