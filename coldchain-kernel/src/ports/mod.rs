/**
 * PORTS DE PERSISTANCE - Interface clé/valeur pour la configuration locale
 *
 * RÔLE :
 * Ce module définit la surface de stockage dont le moteur a besoin : un
 * simple get/put de chaînes, sans dépendre d'un backend particulier.
 *
 * FONCTIONNEMENT :
 * - KeyValueStore trait = interface commune (get/put) injectée dans les composants
 * - JsonFileStore = fichier JSON sur disque avec cache mémoire
 * - MemoryStore = map en mémoire (tests, repli)
 *
 * UTILITÉ :
 * ✅ Testable sans disque ni backend distant
 * ✅ Les bornes de température sont stockées en chaînes décimales
 */

pub mod json_file;
pub mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Erreurs possibles lors des opérations de stockage
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Surface de persistance clé/valeur, synchrone et rapide (locale)
pub trait KeyValueStore: Send + Sync {
    /// Lecture d'une valeur, None si la clé est absente
    fn get(&self, key: &str) -> Result<Option<String>, PortError>;

    /// Écriture inconditionnelle (écrase la valeur existante)
    fn put(&self, key: &str, value: &str) -> Result<(), PortError> {
        self.put_many(&[(key, value)])
    }

    /// Écriture groupée tout-ou-rien : en cas d'erreur, aucune clé n'est modifiée
    fn put_many(&self, entries: &[(&str, &str)]) -> Result<(), PortError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for std::sync::Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, PortError> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &str) -> Result<(), PortError> {
        (**self).put(key, value)
    }

    fn put_many(&self, entries: &[(&str, &str)]) -> Result<(), PortError> {
        (**self).put_many(entries)
    }
}
