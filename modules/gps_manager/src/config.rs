use common::request::AccuracyLevel;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables of a [`crate::LocationManager`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// How long a one-shot position request may wait for a fix before it fails as unavailable.
    #[serde(with = "common::serde::duration")]
    pub current_position_timeout: Duration,

    /// The maximum age of a cached reading that is still answered without a new fix.
    #[serde(with = "common::serde::duration")]
    pub max_reading_age: Duration,

    /// Accuracy used for one-shot requests while no listener is active.
    pub one_shot_accuracy: AccuracyLevel,

    /// How many readings a slow stream consumer may fall behind before it skips readings.
    pub reading_buffer: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            current_position_timeout: Duration::from_secs(10),
            max_reading_age: Duration::from_secs(60),
            one_shot_accuracy: AccuracyLevel::Normal,
            reading_buffer: 32,
        }
    }
}
