// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Storage Modul for the GPS manager
//!
//! Provides a small key-value persistence interface, an in memory and a file
//! based implementation of it and the persisted listener preferences of the
//! front-end.

use serde::{Serialize, de::DeserializeOwned};
use std::io;

pub mod file_store;
pub mod memory_store;
pub mod preferences;

pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use preferences::GpsPreferences;

/// Common interface of every key-value store.
///
/// Values are stored as strings. Use [`KeyValueStore::get_value`] and
/// [`KeyValueStore::set_value`] to store typed values as JSON.
pub trait KeyValueStore: Send {
    /// The name of the store, used in log messages.
    fn alias(&self) -> &str;

    /// Returns `true` if every mutation of the store fails.
    fn is_read_only(&self) -> bool;

    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` for `key`, replacing a previous value.
    ///
    /// # Errors
    /// `ErrorKind::PermissionDenied` for read only stores, otherwise the error
    /// of the underlying storage.
    fn set(&mut self, key: &str, value: &str) -> io::Result<()>;

    /// Removes `key`, returns `true` if the key was present.
    fn remove(&mut self, key: &str) -> io::Result<bool>;

    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Removes every key of the store.
    fn clear(&mut self) -> io::Result<()>;

    /// Reads the JSON value of `key` as `T`.
    ///
    /// Returns `Ok(None)` if the key is missing and `ErrorKind::InvalidData` if
    /// the stored value is not a valid `T`.
    fn get_value<T: DeserializeOwned>(&self, key: &str) -> io::Result<Option<T>>
    where
        Self: Sized,
    {
        match self.get(key) {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Stores `value` as JSON for `key`.
    fn set_value<T: Serialize>(&mut self, key: &str, value: &T) -> io::Result<()>
    where
        Self: Sized,
    {
        let json = serde_json::to_string(value)?;
        self.set(key, &json)
    }
}

pub(crate) fn read_only_error(alias: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::PermissionDenied,
        format!("store {alias} is read only"),
    )
}
