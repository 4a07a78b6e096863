use crate::stream::ReadingStream;
use common::{reading::Reading, request::ActiveListener};
use module_core::{Event, EventKind, platform::PlatformSubscription};
use std::sync::Arc;
use tokio::{
    sync::{broadcast, watch},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// The shareable part of a running session.
///
/// A snapshot of it is published through the manager's watch channel so
/// [`crate::GpsManager::readings`] and [`crate::GpsManager::current_listener`]
/// never wait for a start or stop in progress.
#[derive(Clone, Debug)]
pub(crate) struct SessionHandle {
    pub(crate) listener: ActiveListener,
    readings: broadcast::Sender<Reading>,
    stopped: CancellationToken,
}

impl SessionHandle {
    pub(crate) fn subscribe(&self) -> ReadingStream {
        ReadingStream::new(self.readings.subscribe(), self.stopped.clone())
    }
}

/// A listener session owned by the manager while it is active.
pub(crate) struct ListenerSession {
    handle: SessionHandle,
    forwarder: JoinHandle<()>,
}

impl ListenerSession {
    /// Starts forwarding the readings of `subscription` to the session streams.
    pub(crate) fn start(
        listener: ActiveListener,
        subscription: PlatformSubscription,
        last_reading: Arc<watch::Sender<Option<Reading>>>,
        bus: broadcast::Sender<Event>,
        buffer: usize,
    ) -> Self {
        let (readings, _) = broadcast::channel(buffer.max(1));
        let handle = SessionHandle {
            listener,
            readings,
            stopped: CancellationToken::new(),
        };
        let forwarder = tokio::spawn(forward_readings(
            handle.clone(),
            subscription,
            last_reading,
            bus,
        ));
        ListenerSession { handle, forwarder }
    }

    pub(crate) fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Completes all session streams and waits until the platform subscription is released.
    pub(crate) async fn stop(self) -> ActiveListener {
        self.handle.stopped.cancel();
        if let Err(e) = self.forwarder.await {
            error!(
                "Reading forwarder of session {} failed. Error: {}",
                self.handle.listener.session, e
            );
        }
        self.handle.listener
    }
}

async fn forward_readings(
    session: SessionHandle,
    mut subscription: PlatformSubscription,
    last_reading: Arc<watch::Sender<Option<Reading>>>,
    bus: broadcast::Sender<Event>,
) {
    let id = session.listener.session;
    loop {
        let next = tokio::select! {
            biased;
            _ = session.stopped.cancelled() => break,
            reading = subscription.next() => reading,
        };
        let Some(reading) = next else {
            warn!("Location platform closed the subscription of session {id}");
            session.stopped.cancel();
            break;
        };
        last_reading.send_replace(Some(reading));
        let _ = session.readings.send(reading);
        let _ = bus.send(Event {
            kind: EventKind::ReadingEvent(reading),
        });
    }
    debug!("Reading forwarder of session {id} finished");
}
