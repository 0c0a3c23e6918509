/**
 * MONITEUR DE TEMPÉRATURE - Machine à états des alertes chaîne du froid
 *
 * RÔLE :
 * Consomme les lectures brutes (°F), les convertit en °C, les compare à la
 * plage configurée et émet des alertes déclenchées sur FRONT : une alerte par
 * transition dans-plage <-> hors-plage, jamais une par lecture.
 *
 * FONCTIONNEMENT :
 * - Tout l'état mutable vit derrière un seul mutex : lectures, changements de
 *   plage et détection de front sont appliqués atomiquement, dans l'ordre
 * - État observable via `tokio::sync::watch` (dernier état, au moins une fois)
 * - Alertes via `tokio::sync::broadcast` + rejeu de la dernière transition
 *   pour les abonnés tardifs
 * - Erreur de flux : conservée dans l'état jusqu'à acquittement, la dernière
 *   lecture valide reste affichée
 */

use crate::models::{AlertEvent, MonitorState, RawReading, TemperatureRange};
use crate::ports::{KeyValueStore, PortError};
use crate::range_store::TemperatureRangeStore;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

/// Capacité du canal d'alertes : les transitions sont rares, seules les plus récentes comptent
const ALERT_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("Invalid range: min {min} must be lower than max {max}")]
    InvalidRange { min: f64, max: f64 },
    #[error("Failed to persist range: {0}")]
    Storage(#[from] PortError),
}

/// Compteurs exposés par le health
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitorStats {
    pub readings_applied: u64,
    pub readings_dropped: u64,
    pub alerts_emitted: u64,
}

struct Inner {
    state: MonitorState,
    /// Dernier booléen émis ; None tant qu'aucune classification n'a été faite
    last_alert: Option<bool>,
    /// Dernière alerte émise, rejouée aux nouveaux abonnés
    last_event: Option<AlertEvent>,
}

#[derive(Default)]
struct Counters {
    readings_applied: AtomicU64,
    readings_dropped: AtomicU64,
    alerts_emitted: AtomicU64,
}

pub struct TemperatureMonitor {
    inner: Mutex<Inner>,
    range_store: TemperatureRangeStore<Arc<dyn KeyValueStore>>,
    state_tx: watch::Sender<MonitorState>,
    alert_tx: broadcast::Sender<AlertEvent>,
    counters: Counters,
}

impl TemperatureMonitor {
    /// Charge la plage persistée (ou la plage par défaut) et démarre en état "loading"
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let range_store = TemperatureRangeStore::new(store);
        let range = range_store.load();
        let state = MonitorState::initial(Some(range));
        let (state_tx, _) = watch::channel(state.clone());
        let (alert_tx, _) = broadcast::channel(ALERT_CHANNEL_CAPACITY);

        info!("temperature monitor ready, range [{}, {}] °C", range.min_celsius, range.max_celsius);

        Self {
            inner: Mutex::new(Inner { state, last_alert: None, last_event: None }),
            range_store,
            state_tx,
            alert_tx,
            counters: Counters::default(),
        }
    }

    /// Applique une lecture brute. Retourne false si la lecture est mal formée
    /// (ignorée, l'état précédent est conservé).
    pub fn apply_reading(&self, raw: &RawReading) -> bool {
        let Some(reading) = raw.parse() else {
            self.counters.readings_dropped.fetch_add(1, Ordering::Relaxed);
            debug!("dropping malformed reading {:?}", raw.value);
            return false;
        };

        let mut inner = self.inner.lock();
        let celsius = reading.celsius();
        let out_of_range = is_out_of_range(Some(celsius), inner.state.range.as_ref());

        let state = &mut inner.state;
        state.fahrenheit = Some(reading.value_fahrenheit);
        state.celsius = Some(celsius);
        state.last_updated_millis = Some(reading.observed_at_millis);
        state.is_out_of_range = out_of_range;
        state.loading = false;
        state.error = None;

        self.publish_state(&inner);
        self.dispatch_alert_if_needed(&mut inner);
        self.counters.readings_applied.fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Erreur du flux amont : non fatale, la dernière lecture reste affichée
    pub fn apply_feed_error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("reading feed error: {}", message);

        let mut inner = self.inner.lock();
        inner.state.loading = false;
        inner.state.error = Some(message);
        self.publish_state(&inner);
    }

    /// Efface l'erreur une fois présentée au consommateur
    pub fn acknowledge_error(&self) {
        let mut inner = self.inner.lock();
        if inner.state.error.take().is_some() {
            self.publish_state(&inner);
        }
    }

    /// Valide, persiste puis applique une nouvelle plage et réévalue la dernière lecture
    pub fn update_range(&self, min_celsius: f64, max_celsius: f64) -> Result<(), MonitorError> {
        let Some(range) = TemperatureRange::new(min_celsius, max_celsius) else {
            return Err(MonitorError::InvalidRange { min: min_celsius, max: max_celsius });
        };

        // persistance sous le verrou : le stockage et l'état ne divergent jamais
        let mut inner = self.inner.lock();
        self.range_store.save(&range)?;

        inner.state.range = Some(range);
        inner.state.is_out_of_range = is_out_of_range(inner.state.celsius, Some(&range));
        info!("temperature range updated to [{}, {}] °C", range.min_celsius, range.max_celsius);

        self.publish_state(&inner);
        self.dispatch_alert_if_needed(&mut inner);
        Ok(())
    }

    /// Snapshot synchrone de l'état courant
    pub fn state(&self) -> MonitorState {
        self.inner.lock().state.clone()
    }

    pub fn subscribe_state(&self) -> StateSubscription {
        let mut rx = self.state_tx.subscribe();
        // le premier recv() livre l'état courant
        rx.mark_changed();
        StateSubscription { rx }
    }

    pub fn subscribe_alerts(&self) -> AlertSubscription {
        // verrou pris : aucune transition ne peut passer entre le rejeu et l'abonnement
        let inner = self.inner.lock();
        AlertSubscription {
            replay: inner.last_event.clone(),
            rx: self.alert_tx.subscribe(),
        }
    }

    pub fn stats(&self) -> MonitorStats {
        MonitorStats {
            readings_applied: self.counters.readings_applied.load(Ordering::Relaxed),
            readings_dropped: self.counters.readings_dropped.load(Ordering::Relaxed),
            alerts_emitted: self.counters.alerts_emitted.load(Ordering::Relaxed),
        }
    }

    fn publish_state(&self, inner: &Inner) {
        self.state_tx.send_replace(inner.state.clone());
    }

    fn dispatch_alert_if_needed(&self, inner: &mut Inner) {
        // pas de classification tant qu'aucune lecture n'a été reçue ; l'app
        // d'origine émettait ici une alerte "dans la plage" dès le premier
        // changement de plage, sans lecture
        if inner.state.celsius.is_none() {
            return;
        }

        let current = inner.state.is_out_of_range;
        if inner.last_alert == Some(current) {
            return;
        }
        inner.last_alert = Some(current);

        let event = AlertEvent {
            is_out_of_range: current,
            celsius: inner.state.celsius,
            fahrenheit: inner.state.fahrenheit,
            range: inner.state.range,
        };
        if current {
            warn!("temperature out of range: {:?} °C (range {:?})", event.celsius, event.range);
        } else {
            info!("temperature back in range: {:?} °C", event.celsius);
        }

        inner.last_event = Some(event.clone());
        self.counters.alerts_emitted.fetch_add(1, Ordering::Relaxed);
        // SendError = aucun abonné pour l'instant, le rejeu couvre les abonnés tardifs
        let _ = self.alert_tx.send(event);
    }
}

fn is_out_of_range(celsius: Option<f64>, range: Option<&TemperatureRange>) -> bool {
    match (celsius, range) {
        (Some(c), Some(r)) => !r.contains(c),
        _ => false,
    }
}

/// Abonnement à l'état : livre au moins une fois le dernier état, les états
/// intermédiaires peuvent être fusionnés
pub struct StateSubscription {
    rx: watch::Receiver<MonitorState>,
}

impl StateSubscription {
    /// Attend le prochain état ; None quand le moniteur a été détruit
    pub async fn recv(&mut self) -> Option<MonitorState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn current(&self) -> MonitorState {
        self.rx.borrow().clone()
    }
}

/// Abonnement aux alertes : rejoue la dernière transition puis livre chaque
/// transition suivante une seule fois
pub struct AlertSubscription {
    replay: Option<AlertEvent>,
    rx: broadcast::Receiver<AlertEvent>,
}

impl AlertSubscription {
    /// Attend la prochaine alerte ; None quand le moniteur a été détruit
    pub async fn recv(&mut self) -> Option<AlertEvent> {
        if let Some(event) = self.replay.take() {
            return Some(event);
        }
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("alert subscriber lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Version non bloquante : None si aucune alerte en attente
    pub fn try_recv(&mut self) -> Option<AlertEvent> {
        if let Some(event) = self.replay.take() {
            return Some(event);
        }
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!("alert subscriber lagged, skipped {} events", skipped);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
