use crate::{KeyValueStore, read_only_error};
use std::{collections::BTreeMap, io};

/// A store that keeps its values in memory only.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    alias: String,
    read_only: bool,
    values: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new(alias: &str) -> Self {
        MemoryStore {
            alias: alias.to_string(),
            read_only: false,
            values: BTreeMap::new(),
        }
    }

    /// Creates a read only store holding `values`.
    pub fn read_only(alias: &str, values: BTreeMap<String, String>) -> Self {
        MemoryStore {
            alias: alias.to_string(),
            read_only: true,
            values,
        }
    }

    fn check_writable(&self) -> io::Result<()> {
        if self.read_only {
            return Err(read_only_error(&self.alias));
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryStore {
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
        self.check_writable()?;
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> io::Result<bool> {
        self.check_writable()?;
        Ok(self.values.remove(key).is_some())
    }

    fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    fn clear(&mut self) -> io::Result<()> {
        self.check_writable()?;
        self.values.clear();
        Ok(())
    }
}
