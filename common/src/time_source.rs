use chrono::{DateTime, Utc};

/// A trait for reading the current wall-clock time.
///
/// The manager compares reading timestamps against this clock to decide
/// whether a cached reading is still fresh. Implementations must be usable
/// from several tasks at once.
pub trait TimeSource: Send + Sync {
    /// Returns the current time in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// A [`TimeSource`] backed by the system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    pub fn new() -> Self {
        SystemTimeSource
    }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
