// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! GPS manager Modul
//!
//! Mediates all location access of the application: access requests, the single
//! continuous listener and one-shot position reads on top of a
//! [`LocationPlatform`].

use common::{
    error::{GpsError, Result},
    notification::NotificationText,
    reading::Reading,
    request::{AccessState, ActiveListener, ListenerRequest},
    time_source::{SystemTimeSource, TimeSource},
};
use module_core::{Event, EventKind, ModuleCtx, platform::LocationPlatform};
use session::{ListenerSession, SessionHandle};
use std::{
    sync::{
        Arc, RwLock,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info, warn};

pub mod config;
mod session;
pub mod stream;

pub use config::ManagerConfig;
pub use stream::ReadingStream;

/// The location manager contract used by front-ends.
///
/// At most one listener is active at a time. Starting a second listener while
/// one is active is rejected with [`GpsError::AlreadyListening`], the running
/// listener is not touched.
#[async_trait::async_trait]
pub trait GpsManager: Send + Sync {
    /// Requests location access for `request`.
    ///
    /// A refusal is returned as [`AccessState`], only platform failures are errors.
    /// Never affects an active listener.
    async fn request_access(&self, request: ListenerRequest) -> Result<AccessState>;

    /// Starts the continuous listener.
    ///
    /// # Errors
    /// * [`GpsError::Permission`] if access is not available for `request`.
    /// * [`GpsError::AlreadyListening`] if a listener is already active.
    /// * [`GpsError::Platform`] if the platform fails to subscribe.
    async fn start_listener(&self, request: ListenerRequest) -> Result<ActiveListener>;

    /// Stops the active listener, does nothing if no listener is active.
    ///
    /// All reading streams of the session are complete when this returns.
    async fn stop_listener(&self);

    /// Returns the active listener, if any.
    fn current_listener(&self) -> Option<ActiveListener>;

    /// Waits for a single position fix, independent of the continuous listener.
    ///
    /// Fails with [`GpsError::Unavailable`] if no fix arrives within the configured timeout.
    async fn get_current_position(&self) -> Result<Reading>;

    /// Returns the most recent reading without accessing the sensor.
    fn get_last_reading(&self) -> Option<Reading>;

    /// Returns the cached reading while it is fresh, otherwise waits for a new fix.
    async fn get_last_reading_or_current_position(&self) -> Result<Reading>;

    /// Returns the readings of the active listener session.
    ///
    /// The stream completes when the listener is stopped. Without an active
    /// listener the returned stream is already complete.
    fn readings(&self) -> ReadingStream;

    /// Returns the notification title, independent of the listener state.
    fn title(&self) -> String;

    /// Changes the notification title and publishes a `NotificationChangedEvent`.
    fn set_title(&self, title: &str);

    /// Returns the notification message, independent of the listener state.
    fn message(&self) -> String;

    /// Changes the notification message and publishes a `NotificationChangedEvent`.
    fn set_message(&self, message: &str);
}

/// The [`GpsManager`] implementation on top of a [`LocationPlatform`].
///
/// Start and stop are serialized through an async mutex. The active session and
/// the last reading are published through watch channels, so the synchronous
/// getters always observe a consistent snapshot.
///
/// `start_listener` keeps the start/stop lock while the platform checks access
/// and subscribes. A slow platform therefore delays a concurrent
/// `stop_listener` or `start_listener` until it answers. Platforms that talk to
/// a remote daemon have to bound their connect time.
pub struct LocationManager<P: LocationPlatform> {
    platform: P,
    config: ManagerConfig,
    time_source: Arc<dyn TimeSource>,
    bus: broadcast::Sender<Event>,
    session: Mutex<Option<ListenerSession>>,
    current: watch::Sender<Option<SessionHandle>>,
    last_reading: Arc<watch::Sender<Option<Reading>>>,
    notification: RwLock<NotificationText>,
    sessions: AtomicU64,
}

impl<P: LocationPlatform> LocationManager<P> {
    /// Creates a manager with the default [`ManagerConfig`].
    pub fn new(platform: P, ctx: ModuleCtx) -> Self {
        LocationManager::with_config(platform, ctx, ManagerConfig::default())
    }

    pub fn with_config(platform: P, ctx: ModuleCtx, config: ManagerConfig) -> Self {
        let (current, _) = watch::channel(None);
        let (last_reading, _) = watch::channel(None);
        LocationManager {
            platform,
            config,
            time_source: Arc::new(SystemTimeSource::new()),
            bus: ctx.sender,
            session: Mutex::new(None),
            current,
            last_reading: Arc::new(last_reading),
            notification: RwLock::new(NotificationText::default()),
            sessions: AtomicU64::new(0),
        }
    }

    /// Replaces the clock used to judge the age of cached readings.
    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Waits for a single position fix for at most `timeout`.
    pub async fn get_current_position_within(&self, timeout: Duration) -> Result<Reading> {
        let accuracy = self
            .current_listener()
            .map_or(self.config.one_shot_accuracy, |l| l.accuracy);
        debug!("Requesting current position with accuracy {accuracy}");
        match tokio::time::timeout(timeout, self.platform.current_position(accuracy)).await {
            Ok(Ok(reading)) => {
                self.cache_reading(reading);
                Ok(reading)
            }
            Ok(Err(e)) => {
                warn!("Failed to get current position. Error: {e}");
                Err(e)
            }
            Err(_) => Err(GpsError::Unavailable(format!(
                "no position fix within {timeout:?}"
            ))),
        }
    }

    /// Stores a one-shot fix unless the cache already holds a newer reading.
    fn cache_reading(&self, reading: Reading) {
        self.last_reading.send_if_modified(|last| {
            if last.is_some_and(|l| l.timestamp > reading.timestamp) {
                return false;
            }
            *last = Some(reading);
            true
        });
    }

    fn publish(&self, kind: EventKind) {
        let _ = self.bus.send(Event { kind });
    }

    fn update_notification(&self, update: impl FnOnce(&mut NotificationText)) {
        let text = {
            let mut notification = self
                .notification
                .write()
                .unwrap_or_else(|e| e.into_inner());
            update(&mut notification);
            notification.clone()
        };
        self.publish(EventKind::NotificationChangedEvent(Arc::new(text)));
    }

    fn notification(&self) -> NotificationText {
        self.notification
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl<P: LocationPlatform> GpsManager for LocationManager<P> {
    async fn request_access(&self, request: ListenerRequest) -> Result<AccessState> {
        let access = self.platform.request_access(&request).await?;
        info!(
            "Location access for {:?} background mode: {}",
            request.background_mode, access
        );
        self.publish(EventKind::AccessChangedEvent(access));
        Ok(access)
    }

    async fn start_listener(&self, request: ListenerRequest) -> Result<ActiveListener> {
        let mut session = self.session.lock().await;
        if let Some(active) = session.as_ref() {
            let id = active.handle().listener.session;
            warn!("Listener session {id} is already active, rejecting start");
            return Err(GpsError::AlreadyListening(id));
        }
        let access = self.platform.access_state(&request).await?;
        if !access.is_available() {
            warn!("Can't start listener, location access is {access}");
            return Err(GpsError::Permission(access));
        }
        let subscription = self.platform.subscribe(&request).await?;
        let id = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        let listener = ActiveListener::new(id, &request);
        let started = ListenerSession::start(
            listener,
            subscription,
            self.last_reading.clone(),
            self.bus.clone(),
            self.config.reading_buffer,
        );
        self.current.send_replace(Some(started.handle().clone()));
        *session = Some(started);
        info!(
            "Listener session {id} started with accuracy {} and background mode {}",
            listener.accuracy, listener.background_mode
        );
        self.publish(EventKind::ListenerStartedEvent(listener));
        Ok(listener)
    }

    async fn stop_listener(&self) {
        let mut session = self.session.lock().await;
        let Some(active) = session.take() else {
            debug!("No active listener to stop");
            return;
        };
        self.current.send_replace(None);
        let listener = active.stop().await;
        info!("Listener session {} stopped", listener.session);
        self.publish(EventKind::ListenerStoppedEvent(listener));
    }

    fn current_listener(&self) -> Option<ActiveListener> {
        self.current.borrow().as_ref().map(|h| h.listener)
    }

    async fn get_current_position(&self) -> Result<Reading> {
        self.get_current_position_within(self.config.current_position_timeout)
            .await
    }

    fn get_last_reading(&self) -> Option<Reading> {
        *self.last_reading.borrow()
    }

    async fn get_last_reading_or_current_position(&self) -> Result<Reading> {
        if let Some(reading) = self.get_last_reading()
            && reading.is_fresh(self.time_source.now(), self.config.max_reading_age)
        {
            debug!("Answering with cached reading from {}", reading.timestamp);
            return Ok(reading);
        }
        self.get_current_position().await
    }

    fn readings(&self) -> ReadingStream {
        match self.current.borrow().as_ref() {
            Some(handle) => handle.subscribe(),
            None => ReadingStream::completed(),
        }
    }

    fn title(&self) -> String {
        self.notification().title
    }

    fn set_title(&self, title: &str) {
        self.update_notification(|n| n.title = title.to_string());
    }

    fn message(&self) -> String {
        self.notification().message
    }

    fn set_message(&self, message: &str) {
        self.update_notification(|n| n.message = message.to_string());
    }
}
