use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

/// Requested precision and power tradeoff of the location sensing.
///
/// The levels are ordered, `Lowest < Low < Normal < High < Highest`.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
)]
pub enum AccuracyLevel {
    Lowest,
    Low,
    #[default]
    Normal,
    High,
    Highest,
}

impl AccuracyLevel {
    /// The horizontal accuracy in meters a platform should aim for at this level.
    pub fn desired_accuracy_meters(&self) -> f64 {
        match self {
            AccuracyLevel::Lowest => 3000.0,
            AccuracyLevel::Low => 1000.0,
            AccuracyLevel::Normal => 100.0,
            AccuracyLevel::High => 10.0,
            AccuracyLevel::Highest => 1.0,
        }
    }
}

/// Whether and how location updates continue while the application is not in the foreground.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum BackgroundMode {
    /// Updates are only delivered while the application is in the foreground.
    #[default]
    None,
    /// Updates continue in the background, the platform may batch or delay them.
    Standard,
    /// Updates continue in the background with minimal batching and delay.
    Realtime,
}

impl BackgroundMode {
    /// Derives the mode from the two front-end toggles.
    ///
    /// `realtime` only has an effect when `background` is enabled.
    pub fn from_toggles(background: bool, realtime: bool) -> Self {
        match (background, realtime) {
            (false, _) => BackgroundMode::None,
            (true, false) => BackgroundMode::Standard,
            (true, true) => BackgroundMode::Realtime,
        }
    }

    pub fn is_background(&self) -> bool {
        *self != BackgroundMode::None
    }

    pub fn is_realtime(&self) -> bool {
        *self == BackgroundMode::Realtime
    }
}

/// The outcome of a location permission negotiation.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter,
)]
pub enum AccessState {
    #[default]
    Unknown,
    Available,
    Denied,
    Disabled,
    Restricted,
}

impl AccessState {
    pub fn is_available(&self) -> bool {
        *self == AccessState::Available
    }
}

/// The parameters of an access request or a listener start.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerRequest {
    pub background_mode: BackgroundMode,
    pub accuracy: AccuracyLevel,
}

impl ListenerRequest {
    pub fn new(background_mode: BackgroundMode, accuracy: AccuracyLevel) -> Self {
        ListenerRequest {
            background_mode,
            accuracy,
        }
    }
}

/// The listener session that is currently delivering readings.
///
/// `session` is the generation number the manager assigned when the listener
/// was started, the first listener of a manager is session `1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveListener {
    pub session: u64,
    pub background_mode: BackgroundMode,
    pub accuracy: AccuracyLevel,
}

impl ActiveListener {
    pub fn new(session: u64, request: &ListenerRequest) -> Self {
        ActiveListener {
            session,
            background_mode: request.background_mode,
            accuracy: request.accuracy,
        }
    }

    pub fn request(&self) -> ListenerRequest {
        ListenerRequest::new(self.background_mode, self.accuracy)
    }
}
