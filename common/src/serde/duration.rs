use chrono::{NaiveTime, Timelike};
use serde::{self, Deserialize, Deserializer, Serializer};
use std::time::Duration;

const FORMAT: &str = "%H:%M:%S%.3f";

/// Formats a duration below 24 hours as `HH:MM:SS.fff`.
pub fn duration_to_string(duration: &Duration) -> Option<String> {
    let total_seconds = u32::try_from(duration.as_secs()).ok()?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(total_seconds, duration.subsec_nanos())?;
    Some(time.format(FORMAT).to_string())
}

pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let formatted = duration_to_string(duration)
        .ok_or_else(|| serde::ser::Error::custom("Duration exceeds 24 hours"))?;
    serializer.serialize_str(&formatted)
}

/// Deserialize a time string like "00:00:25.144" into a [`Duration`].
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let time = NaiveTime::parse_from_str(&s, FORMAT).map_err(serde::de::Error::custom)?;
    Ok(Duration::new(
        u64::from(time.num_seconds_from_midnight()),
        time.nanosecond(),
    ))
}
