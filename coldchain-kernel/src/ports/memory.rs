use super::{KeyValueStore, PortError};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Stockage clé/valeur purement en mémoire (tests, repli si le disque est indisponible)
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pré-remplit le stockage, ex: pour simuler des valeurs persistées corrompues
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map = values.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Self { values: Mutex::new(map) }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, PortError> {
        Ok(self.values.lock().get(key).cloned())
    }

    fn put_many(&self, entries: &[(&str, &str)]) -> Result<(), PortError> {
        let mut values = self.values.lock();
        for (key, value) in entries {
            values.insert(key.to_string(), value.to_string());
        }
        Ok(())
    }
}
