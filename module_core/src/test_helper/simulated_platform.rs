use crate::platform::{LocationPlatform, PlatformSubscription};
use common::{
    error::{GpsError, Result},
    reading::Reading,
    request::{AccessState, AccuracyLevel, ListenerRequest},
};
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};
use tokio::sync::mpsc;
use tracing::debug;

const SUBSCRIPTION_CAPACITY: usize = 64;

#[derive(Debug)]
struct SimulatedState {
    access: AccessState,
    failure: Option<String>,
    fixes: VecDeque<Reading>,
    subscribers: Vec<mpsc::Sender<Reading>>,
    access_requests: Vec<ListenerRequest>,
    subscriptions: Vec<ListenerRequest>,
    fix_requests: Vec<AccuracyLevel>,
}

/// An in-memory [`LocationPlatform`] for tests.
///
/// The test decides the access state, pushes readings to the open
/// subscriptions with [`SimulatedPlatform::emit`] and queues one-shot fixes
/// with [`SimulatedPlatform::queue_fix`]. Without a queued fix
/// `current_position` never completes, which behaves like a receiver without
/// signal. Clones share the same state.
#[derive(Clone, Debug)]
pub struct SimulatedPlatform {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedPlatform {
    pub fn new(access: AccessState) -> Self {
        SimulatedPlatform {
            state: Arc::new(Mutex::new(SimulatedState {
                access,
                failure: None,
                fixes: VecDeque::new(),
                subscribers: Vec::new(),
                access_requests: Vec::new(),
                subscriptions: Vec::new(),
                fix_requests: Vec::new(),
            })),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_access(&self, access: AccessState) {
        self.state().access = access;
    }

    /// Makes every following platform call fail with [`GpsError::Platform`].
    pub fn fail_with(&self, reason: &str) {
        self.state().failure = Some(reason.to_string());
    }

    pub fn clear_failure(&self) {
        self.state().failure = None;
    }

    /// Delivers `reading` to every open subscription and returns how many received it.
    pub fn emit(&self, reading: Reading) -> usize {
        let mut state = self.state();
        state.subscribers.retain(|s| !s.is_closed());
        state
            .subscribers
            .iter()
            .filter(|s| s.try_send(reading).is_ok())
            .count()
    }

    /// Queues a fix that the next `current_position` call returns.
    pub fn queue_fix(&self, reading: Reading) {
        self.state().fixes.push_back(reading);
    }

    /// Closes all open subscriptions from the platform side.
    pub fn close_subscriptions(&self) {
        self.state().subscribers.clear();
    }

    /// Returns the amount of subscriptions whose consumer is still alive.
    pub fn active_subscriptions(&self) -> usize {
        let mut state = self.state();
        state.subscribers.retain(|s| !s.is_closed());
        state.subscribers.len()
    }

    pub fn access_requests(&self) -> Vec<ListenerRequest> {
        self.state().access_requests.clone()
    }

    pub fn subscriptions(&self) -> Vec<ListenerRequest> {
        self.state().subscriptions.clone()
    }

    pub fn fix_requests(&self) -> Vec<AccuracyLevel> {
        self.state().fix_requests.clone()
    }

    fn check_failure(&self) -> Result<()> {
        match &self.state().failure {
            Some(reason) => Err(GpsError::Platform(reason.clone())),
            None => Ok(()),
        }
    }
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        SimulatedPlatform::new(AccessState::Available)
    }
}

#[async_trait::async_trait]
impl LocationPlatform for SimulatedPlatform {
    async fn request_access(&self, request: &ListenerRequest) -> Result<AccessState> {
        self.check_failure()?;
        let mut state = self.state();
        state.access_requests.push(*request);
        Ok(state.access)
    }

    async fn access_state(&self, _request: &ListenerRequest) -> Result<AccessState> {
        self.check_failure()?;
        Ok(self.state().access)
    }

    async fn subscribe(&self, request: &ListenerRequest) -> Result<PlatformSubscription> {
        self.check_failure()?;
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_CAPACITY);
        let mut state = self.state();
        state.subscribers.push(sender);
        state.subscriptions.push(*request);
        debug!("Simulated platform subscribed with {:?}", request);
        Ok(PlatformSubscription::from_receiver(receiver))
    }

    async fn current_position(&self, accuracy: AccuracyLevel) -> Result<Reading> {
        self.check_failure()?;
        let fix = {
            let mut state = self.state();
            state.fix_requests.push(accuracy);
            state.fixes.pop_front()
        };
        match fix {
            Some(reading) => Ok(reading),
            None => std::future::pending().await,
        }
    }
}
