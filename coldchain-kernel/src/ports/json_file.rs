/**
 * PORT FICHIER JSON - Stockage clé/valeur persistant sur disque
 *
 * FONCTIONNEMENT :
 * - Un objet JSON plat {"clé": "valeur"} dans un fichier
 * - Cache mémoire protégé par mutex, écriture immédiate à chaque put
 * - Un put en échec ne touche ni le cache ni le fichier
 * - Fichier absent = créé vide ; fichier corrompu = ignoré (auto-réparation
 *   au premier put)
 */

use super::{KeyValueStore, PortError};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

pub struct JsonFileStore {
    /// Chemin du fichier de stockage JSON
    storage_path: PathBuf,
    /// Cache en mémoire des valeurs
    cache: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Ouvre (ou crée) le fichier de stockage spécifié
    pub fn open<P: Into<PathBuf>>(storage_path: P) -> Result<Self, PortError> {
        let store = Self {
            storage_path: storage_path.into(),
            cache: Mutex::new(BTreeMap::new()),
        };
        store.load_from_disk()?;
        debug!("json store initialized at {:?}", store.storage_path);
        Ok(store)
    }

    fn load_from_disk(&self) -> Result<(), PortError> {
        if !self.storage_path.exists() {
            if let Some(parent) = self.storage_path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            fs::write(&self.storage_path, "{}")?;
            return Ok(());
        }

        let content = fs::read_to_string(&self.storage_path)?;
        match serde_json::from_str::<BTreeMap<String, String>>(&content) {
            Ok(values) => *self.cache.lock() = values,
            Err(e) => {
                warn!("settings file {:?} is corrupt, starting empty: {}", self.storage_path, e);
            }
        }
        Ok(())
    }

    fn save_to_disk(&self, values: &BTreeMap<String, String>) -> Result<(), PortError> {
        let json = serde_json::to_string_pretty(values)?;
        fs::write(&self.storage_path, json)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, PortError> {
        Ok(self.cache.lock().get(key).cloned())
    }

    fn put_many(&self, entries: &[(&str, &str)]) -> Result<(), PortError> {
        // verrou conservé pendant l'écriture : deux put ne se croisent pas sur disque
        let mut cache = self.cache.lock();
        let mut next = cache.clone();
        for (key, value) in entries {
            next.insert(key.to_string(), value.to_string());
        }
        // le cache ne change qu'une fois le fichier écrit
        self.save_to_disk(&next)?;
        *cache = next;
        Ok(())
    }
}
