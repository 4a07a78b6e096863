//! The seam between the location manager and the platform location subsystem.

use common::{
    error::Result,
    reading::Reading,
    request::{AccessState, AccuracyLevel, ListenerRequest},
};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::debug;

/// Common interface that every location platform must support.
///
/// A platform owns the permission negotiation and the sensor access. It does not
/// enforce any listener policy, the manager decides when to subscribe.
#[async_trait::async_trait]
pub trait LocationPlatform: Send + Sync {
    /// Negotiates location access for `request`, prompting the user if the platform has a prompt.
    ///
    /// A refusal is returned as an [`AccessState`], `Err` is reserved for platform failures.
    async fn request_access(&self, request: &ListenerRequest) -> Result<AccessState>;

    /// Returns the current access state for `request` without prompting.
    async fn access_state(&self, request: &ListenerRequest) -> Result<AccessState>;

    /// Starts continuous location updates for `request`.
    ///
    /// Dropping the returned subscription must release the sensor.
    async fn subscribe(&self, request: &ListenerRequest) -> Result<PlatformSubscription>;

    /// Waits for one position fix at `accuracy`.
    ///
    /// May wait forever without a signal, callers bound it with a timeout.
    async fn current_position(&self, accuracy: AccuracyLevel) -> Result<Reading>;
}

/// A running platform location subscription.
///
/// Readings are delivered in sensor order through the channel. The optional
/// producer task is aborted when the subscription is dropped so no platform
/// resources outlive it.
#[derive(Debug)]
pub struct PlatformSubscription {
    receiver: mpsc::Receiver<Reading>,
    producer: Option<JoinHandle<()>>,
}

impl PlatformSubscription {
    /// Creates a subscription whose readings are produced by the task `producer`.
    pub fn new(receiver: mpsc::Receiver<Reading>, producer: JoinHandle<()>) -> Self {
        PlatformSubscription {
            receiver,
            producer: Some(producer),
        }
    }

    /// Creates a subscription fed by a sender the platform keeps itself.
    pub fn from_receiver(receiver: mpsc::Receiver<Reading>) -> Self {
        PlatformSubscription {
            receiver,
            producer: None,
        }
    }

    /// Receives the next reading, `None` once the platform closed the subscription.
    pub async fn next(&mut self) -> Option<Reading> {
        self.receiver.recv().await
    }
}

impl Drop for PlatformSubscription {
    fn drop(&mut self) {
        self.receiver.close();
        if let Some(producer) = self.producer.take() {
            producer.abort();
            debug!("Platform subscription dropped and producer task aborted.");
        }
    }
}
