use crate::KeyValueStore;
use common::{
    notification::NotificationText,
    request::{AccuracyLevel, BackgroundMode, ListenerRequest},
};
use serde::{Deserialize, Serialize};
use std::io;
use tracing::debug;

const ACCURACY_KEY: &str = "accuracy";
const BACKGROUND_MODE_KEY: &str = "background_mode";
const TITLE_KEY: &str = "title";
const MESSAGE_KEY: &str = "message";

/// The listener settings a front-end restores on the next start.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsPreferences {
    pub accuracy: AccuracyLevel,
    pub background_mode: BackgroundMode,
    pub title: String,
    pub message: String,
}

impl GpsPreferences {
    /// Reads the preferences from `store`, missing keys keep their default value.
    pub fn load(store: &impl KeyValueStore) -> io::Result<Self> {
        let defaults = GpsPreferences::default();
        let preferences = GpsPreferences {
            accuracy: store
                .get_value(ACCURACY_KEY)?
                .unwrap_or(defaults.accuracy),
            background_mode: store
                .get_value(BACKGROUND_MODE_KEY)?
                .unwrap_or(defaults.background_mode),
            title: store.get_value(TITLE_KEY)?.unwrap_or(defaults.title),
            message: store.get_value(MESSAGE_KEY)?.unwrap_or(defaults.message),
        };
        debug!("Loaded preferences {:?} from {}", preferences, store.alias());
        Ok(preferences)
    }

    pub fn save(&self, store: &mut impl KeyValueStore) -> io::Result<()> {
        store.set_value(ACCURACY_KEY, &self.accuracy)?;
        store.set_value(BACKGROUND_MODE_KEY, &self.background_mode)?;
        store.set_value(TITLE_KEY, &self.title)?;
        store.set_value(MESSAGE_KEY, &self.message)?;
        debug!("Saved preferences to {}", store.alias());
        Ok(())
    }

    pub fn request(&self) -> ListenerRequest {
        ListenerRequest::new(self.background_mode, self.accuracy)
    }

    pub fn notification_text(&self) -> NotificationText {
        NotificationText::new(&self.title, &self.message)
    }
}
