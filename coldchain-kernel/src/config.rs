use crate::geo::{Coordinate, GeoError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

pub const DEFAULT_READING_TOPIC: &str = "coldchain/temperature/reading@v1";

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct KernelConfig {
    pub store: StoreConf,
    pub mqtt: MqttConf,
    pub storage: StorageConf,
    pub http: HttpConf,
}

/// Position de la boutique, fixe pour un déploiement
#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct StoreConf {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct MqttConf {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub topic: String, // ex: "coldchain/temperature/reading@v1"
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StorageConf {
    pub path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct HttpConf {
    pub bind: String,
}

impl Default for StoreConf {
    fn default() -> Self {
        Self { latitude: -43.6167, longitude: -71.8000 }
    }
}

impl Default for MqttConf {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 1883,
            client_id: "coldchain-kernel".into(),
            topic: DEFAULT_READING_TOPIC.into(),
        }
    }
}

impl Default for StorageConf {
    fn default() -> Self {
        Self { path: PathBuf::from("./data/settings.json") }
    }
}

impl Default for HttpConf {
    fn default() -> Self {
        Self { bind: "0.0.0.0:8080".into() }
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            store: StoreConf::default(),
            mqtt: MqttConf::default(),
            storage: StorageConf::default(),
            http: HttpConf::default(),
        }
    }
}

impl KernelConfig {
    pub fn store_coordinate(&self) -> Result<Coordinate, GeoError> {
        Coordinate::new(self.store.latitude, self.store.longitude)
    }
}

pub async fn load_config() -> KernelConfig {
    let path = std::env::var("COLDCHAIN_KERNEL_CONFIG").unwrap_or_else(|_| "kernel.yaml".into());
    load_config_from(&path).await
}

pub async fn load_config_from(path: impl AsRef<Path>) -> KernelConfig {
    let path = path.as_ref();
    if !path.exists() {
        warn!("no config at {:?}, using defaults", path);
        return KernelConfig::default();
    }
    let txt = fs::read_to_string(path).await.unwrap_or_default();
    if txt.trim().is_empty() {
        return KernelConfig::default();
    }
    serde_yaml::from_str(&txt).unwrap_or_else(|e| {
        warn!("invalid config {:?}: {}, using defaults", path, e);
        KernelConfig::default()
    })
}
