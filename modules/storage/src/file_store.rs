// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{KeyValueStore, read_only_error};
use std::{
    collections::BTreeMap,
    fs::{self, DirBuilder, File},
    io::{self, ErrorKind, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, error, info};

/// A file system based key-value store.
///
/// All values are kept in one JSON object file. The file is loaded when the
/// store is opened and rewritten after every mutation. The new content is
/// written to a temporary file next to the store file first and then renamed,
/// so the store file is never left half written.
///
/// ## Important
///
/// `FileStore` **does not lock the file**. Only one instance should be used
/// per file at any time.
#[derive(Debug)]
pub struct FileStore {
    alias: String,
    path: PathBuf,
    read_only: bool,
    values: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens the store at `path`, creating missing parent folders.
    ///
    /// A missing file is an empty store, the file is created with the first mutation.
    ///
    /// # Errors
    /// `ErrorKind::InvalidData` if the file is not a JSON object of strings,
    /// otherwise the I/O error of reading the file.
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            DirBuilder::new().recursive(true).create(parent)?;
        }
        FileStore::load(path, false)
    }

    /// Opens an existing store file that can't be modified.
    pub fn open_read_only(path: &Path) -> io::Result<Self> {
        FileStore::load(path, true)
    }

    fn load(path: &Path, read_only: bool) -> io::Result<Self> {
        let values = match fs::read_to_string(path) {
            Ok(json) => serde_json::from_str::<BTreeMap<String, String>>(&json).map_err(|e| {
                error!(
                    "Failed to parse store file {}. Error: {}",
                    path.to_string_lossy(),
                    e
                );
                io::Error::from(e)
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound && !read_only => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        let alias = path
            .file_stem()
            .map_or_else(|| "store".to_string(), |s| s.to_string_lossy().to_string());
        info!(
            "Using store {} with {} keys from {}",
            alias,
            values.len(),
            path.to_string_lossy()
        );
        Ok(FileStore {
            alias,
            path: path.to_path_buf(),
            read_only,
            values,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> io::Result<()> {
        let json = serde_json::to_string_pretty(&self.values)?;
        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        debug!(
            "Stored {} keys in {}",
            self.values.len(),
            self.path.to_string_lossy()
        );
        Ok(())
    }

    /// Applies `update` and persists the result, the in memory state is rolled back on failure.
    fn mutate<R>(
        &mut self,
        update: impl FnOnce(&mut BTreeMap<String, String>) -> R,
    ) -> io::Result<R> {
        if self.read_only {
            return Err(read_only_error(&self.alias));
        }
        let previous = self.values.clone();
        let result = update(&mut self.values);
        if let Err(e) = self.persist() {
            error!(
                "Failed to write store file {}. Error: {}",
                self.path.to_string_lossy(),
                e
            );
            self.values = previous;
            return Err(e);
        }
        Ok(result)
    }
}

impl KeyValueStore for FileStore {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> io::Result<()> {
        self.mutate(|values| {
            values.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&mut self, key: &str) -> io::Result<bool> {
        if !self.read_only && !self.values.contains_key(key) {
            return Ok(false);
        }
        self.mutate(|values| values.remove(key).is_some())
    }

    fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn clear(&mut self) -> io::Result<()> {
        self.mutate(|values| values.clear())
    }
}
