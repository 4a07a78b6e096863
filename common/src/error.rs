//! Error types of the location manager and the location platforms.

use crate::request::AccessState;
use thiserror::Error;

/// Failures of location operations.
///
/// A denied permission request is not an error, it is reported as an
/// [`AccessState`] value. Only operations that require access fail with
/// [`GpsError::Permission`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GpsError {
    /// Location access has not been granted, the caller may request access again.
    #[error("Location access not granted (access state: {0})")]
    Permission(AccessState),

    /// A listener session is already active, it must be stopped first.
    #[error("A location listener is already active (session {0})")]
    AlreadyListening(u64),

    /// No position fix could be obtained, e.g. timeout or no signal.
    #[error("No position fix available: {0}")]
    Unavailable(String),

    /// The underlying sensor or transport failed.
    #[error("Location platform failure: {0}")]
    Platform(String),
}

impl From<std::io::Error> for GpsError {
    fn from(e: std::io::Error) -> Self {
        GpsError::Platform(e.to_string())
    }
}

pub type Result<T, E = GpsError> = std::result::Result<T, E>;
