/**
 * STOCKAGE DE LA PLAGE - Persistance de la plage de température acceptable
 *
 * RÔLE : Charger/sauver (min, max) en °C via le port clé/valeur injecté.
 *
 * POLITIQUE DE CHARGEMENT :
 * - paire persistée, numérique et min < max → retournée telle quelle
 * - sinon → plage par défaut {-10, 10}, persistée immédiatement
 *   (un stockage corrompu ou vide se répare à la première lecture)
 */

use crate::models::TemperatureRange;
use crate::ports::{KeyValueStore, PortError};
use tracing::warn;

pub const KEY_MIN_CELSIUS: &str = "min_celsius";
pub const KEY_MAX_CELSIUS: &str = "max_celsius";

pub struct TemperatureRangeStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> TemperatureRangeStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn load(&self) -> TemperatureRange {
        if let Some(range) = self.read_persisted() {
            return range;
        }

        let default = TemperatureRange::default();
        if let Err(e) = self.save(&default) {
            warn!("failed to persist default temperature range: {}", e);
        } else {
            warn!(
                "no valid persisted temperature range, reset to default [{}, {}]",
                default.min_celsius, default.max_celsius
            );
        }
        default
    }

    /// Écrase toujours, les deux bornes ensemble ; la validation min < max
    /// est à la charge de l'appelant
    pub fn save(&self, range: &TemperatureRange) -> Result<(), PortError> {
        let min = range.min_celsius.to_string();
        let max = range.max_celsius.to_string();
        self.store.put_many(&[(KEY_MIN_CELSIUS, &min), (KEY_MAX_CELSIUS, &max)])
    }

    fn read_persisted(&self) -> Option<TemperatureRange> {
        let min = self.read_number(KEY_MIN_CELSIUS)?;
        let max = self.read_number(KEY_MAX_CELSIUS)?;
        TemperatureRange::new(min, max)
    }

    fn read_number(&self, key: &str) -> Option<f64> {
        match self.store.get(key) {
            Ok(value) => value?.trim().parse::<f64>().ok(),
            Err(e) => {
                warn!("failed to read {} from settings store: {}", key, e);
                None
            }
        }
    }
}
