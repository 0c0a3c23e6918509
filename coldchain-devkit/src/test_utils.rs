/*!
Test Harness pour le moteur coldchain

Facilite l'écriture de tests avec:
- Moniteur branché sur un stockage mémoire et un flux stub
- Collecte des alertes émises
- Attentes bornées dans le temps sur l'état
*/

use crate::feed_stub::{StubFeedController, StubReadingFeed};
use anyhow::Result;
use coldchain_kernel::feed::MonitorHandle;
use coldchain_kernel::models::{AlertEvent, MonitorState};
use coldchain_kernel::monitor::{AlertSubscription, TemperatureMonitor};
use coldchain_kernel::ports::{KeyValueStore, MemoryStore};
use coldchain_kernel::range_store::{KEY_MAX_CELSIUS, KEY_MIN_CELSIUS};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

const DEFAULT_WAIT: Duration = Duration::from_secs(2);

/// Harness de test complet ; à créer dans un runtime tokio
pub struct TestHarness {
    pub monitor: Arc<TemperatureMonitor>,
    pub store: Arc<MemoryStore>,
    pub feed: StubFeedController,
    pub handle: MonitorHandle,
    alerts: AlertSubscription,
}

impl TestHarness {
    pub fn new() -> Result<Self> {
        Self::with_store(MemoryStore::new())
    }

    /// Démarre avec une plage déjà persistée
    pub fn with_range(min_celsius: f64, max_celsius: f64) -> Result<Self> {
        Self::with_store(MemoryStore::with_values([
            (KEY_MIN_CELSIUS, min_celsius.to_string()),
            (KEY_MAX_CELSIUS, max_celsius.to_string()),
        ]))
    }

    pub fn with_store(store: MemoryStore) -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests

        let store = Arc::new(store);
        let monitor = Arc::new(TemperatureMonitor::new(store.clone() as Arc<dyn KeyValueStore>));
        let alerts = monitor.subscribe_alerts();
        let (feed, controller) = StubReadingFeed::new();
        let handle = MonitorHandle::attach(monitor.clone(), Box::new(feed))?;
        log::info!("🧪 test harness ready");

        Ok(Self { monitor, store, feed: controller, handle, alerts })
    }

    /// Attend que `count` lectures (valides ou non) aient été traitées
    pub async fn wait_for_processed(&self, count: u64) -> Result<()> {
        let monitor = self.monitor.clone();
        timeout(DEFAULT_WAIT, async move {
            loop {
                let stats = monitor.stats();
                if stats.readings_applied + stats.readings_dropped >= count {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .map_err(|_| anyhow::anyhow!("timeout waiting for {} processed readings", count))
    }

    /// Attend un état satisfaisant le prédicat
    pub async fn wait_for_state<F>(&self, predicate: F) -> Result<MonitorState>
    where
        F: Fn(&MonitorState) -> bool,
    {
        let mut states = self.monitor.subscribe_state();
        timeout(DEFAULT_WAIT, async move {
            while let Some(state) = states.recv().await {
                if predicate(&state) {
                    return Some(state);
                }
            }
            None
        })
        .await
        .ok()
        .flatten()
        .ok_or_else(|| anyhow::anyhow!("timeout waiting for monitor state"))
    }

    /// Prochaine alerte, en échec si rien n'arrive à temps
    pub async fn next_alert(&mut self) -> Result<AlertEvent> {
        timeout(DEFAULT_WAIT, self.alerts.recv())
            .await
            .ok()
            .flatten()
            .ok_or_else(|| anyhow::anyhow!("no alert received"))
    }

    /// Alertes déjà reçues, sans attendre
    pub fn drain_alerts(&mut self) -> Vec<AlertEvent> {
        std::iter::from_fn(|| self.alerts.try_recv()).collect()
    }

    /// Pousse une suite de lectures °F et attend leur traitement
    pub async fn feed_fahrenheit(&self, values: &[f64]) -> Result<()> {
        let already = {
            let stats = self.monitor.stats();
            stats.readings_applied + stats.readings_dropped
        };
        for value in values {
            if !self.feed.simulate_reading(*value) {
                anyhow::bail!("stub feed is not subscribed");
            }
        }
        self.wait_for_processed(already + values.len() as u64).await
    }
}
