//! Key-value lookup for delivery credentials
//!
//! The webhook URL is a secret and is never part of the controller
//! configuration. At startup the sink asks a [`KeyValueStore`] for it under
//! a configured key; on the device this is the platform's persistent store.

use std::collections::HashMap;

/// Read-only key-value lookup
pub trait KeyValueStore {
    /// Value stored under `key`, if any
    fn get(&self, key: &str) -> Option<String>;
}

/// In-memory store, for tests and for values provisioned at runtime
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Environment variables as a store
///
/// `notify.url` with prefix `COOLGUARD_` reads `COOLGUARD_NOTIFY_URL`.
#[derive(Debug, Clone)]
pub struct EnvStore {
    prefix: String,
}

impl EnvStore {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    fn variable(&self, key: &str) -> String {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("{}{}", self.prefix, name)
    }
}

impl KeyValueStore for EnvStore {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(self.variable(key)).ok().filter(|v| !v.is_empty())
    }
}
