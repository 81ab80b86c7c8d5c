//! Ambient secret lookup: process environment with a `.env`-style overlay.

use std::collections::HashMap;

/// Named-secret lookup. Missing keys return `None`; callers interpret
/// absence per context.
pub trait SecretProvider: Send + Sync {
    fn get(&self, name: &str) -> Option<String>;
}

/// Secrets snapshotted once at construction from a `.env` file (if present)
/// overlaid by the process environment; the environment wins on conflicts.
///
/// The snapshot is read-only for its lifetime, so concurrent invocations
/// share it without locking.
#[derive(Debug, Clone)]
pub struct EnvSecrets {
    values: HashMap<String, String>,
}

impl EnvSecrets {
    /// Loads `.env` (ignored if absent or unreadable) and the process
    /// environment.
    pub fn load() -> Self {
        let dotenv = dotenvy::dotenv_iter()
            .map(|iter| iter.flatten().collect::<Vec<_>>())
            .unwrap_or_default();
        Self::from_layers(dotenv, std::env::vars().collect())
    }

    fn from_layers(dotenv: Vec<(String, String)>, env: Vec<(String, String)>) -> Self {
        let mut values: HashMap<String, String> = dotenv.into_iter().collect();
        values.extend(env);
        Self { values }
    }
}

impl SecretProvider for EnvSecrets {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}

/// Fixed in-memory secrets, for tests and embedded callers that manage
/// their own key material.
#[derive(Debug, Clone, Default)]
pub struct MapSecrets {
    values: HashMap<String, String>,
}

impl MapSecrets {
    pub fn new<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl SecretProvider for MapSecrets {
    fn get(&self, name: &str) -> Option<String> {
        self.values.get(name).cloned()
    }
}
