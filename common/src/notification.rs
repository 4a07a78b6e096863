use serde::{Deserialize, Serialize};

/// Display metadata of the persistent notification shown while a background listener runs.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationText {
    pub title: String,
    pub message: String,
}

impl NotificationText {
    pub fn new(title: &str, message: &str) -> Self {
        NotificationText {
            title: title.to_string(),
            message: message.to_string(),
        }
    }
}
