use crate::time_source::TimeSource;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

/// A test implementation of [`TimeSource`] that allows deterministic control
/// of the current time in unit tests.
///
/// Clones share the same clock, so a test can keep one handle and pass another
/// one into the code under test.
#[derive(Clone, Debug)]
pub struct TestTimeSource {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl Default for TestTimeSource {
    /// Creates a clock that starts at the current system time.
    fn default() -> Self {
        TestTimeSource::new(Utc::now())
    }
}

impl TestTimeSource {
    pub fn new(start: DateTime<Utc>) -> Self {
        TestTimeSource {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock to `now`.
    pub fn set_now(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    /// Moves the clock forward by `duration`.
    pub fn advance(&self, duration: std::time::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += chrono::Duration::from_std(duration)
            .unwrap_or_else(|_| panic!("Duration {duration:?} is out of range for the test clock"));
    }
}

impl TimeSource for TestTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}
