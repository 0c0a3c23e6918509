/**
 * FLUX DE LECTURES - Contrat entre la source de télémétrie et le moniteur
 *
 * RÔLE :
 * - ReadingFeed trait = onReading/onError/unsubscribe en version message-passing :
 *   la source pousse des FeedEvent dans un canal mpsc
 * - MonitorHandle = relie UN flux à UN moniteur ; une seule tâche écrivain
 *   applique les événements dans l'ordre d'arrivée
 *
 * ARRÊT : shutdown() est idempotent et désabonne le flux exactement une fois
 * (appelé aussi au Drop).
 */

use crate::models::RawReading;
use crate::monitor::TemperatureMonitor;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Reading(RawReading),
    Error(String),
}

pub type FeedSink = mpsc::UnboundedSender<FeedEvent>;

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("Feed already has a subscriber")]
    AlreadySubscribed,
    #[error("Transport error: {0}")]
    Transport(String),
}

/// Source externe de lectures (push)
pub trait ReadingFeed: Send {
    /// Commence à pousser lectures et erreurs dans `sink`
    fn subscribe(&mut self, sink: FeedSink) -> Result<(), FeedError>;

    /// Arrête la source ; plus aucun événement ne doit être poussé ensuite
    fn unsubscribe(&mut self);
}

/// Flux alimenté directement par l'application hôte (ex: SDK de télémétrie embarqué)
#[derive(Default)]
pub struct ChannelFeed {
    sink: Arc<Mutex<Option<FeedSink>>>,
}

/// Côté émetteur d'un ChannelFeed, clonable
#[derive(Clone)]
pub struct ChannelFeedPublisher {
    sink: Arc<Mutex<Option<FeedSink>>>,
}

impl ChannelFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publisher(&self) -> ChannelFeedPublisher {
        ChannelFeedPublisher { sink: self.sink.clone() }
    }
}

impl ChannelFeedPublisher {
    /// Retourne false si personne n'est abonné
    pub fn push(&self, event: FeedEvent) -> bool {
        match self.sink.lock().as_ref() {
            Some(sink) => sink.send(event).is_ok(),
            None => false,
        }
    }
}

impl ReadingFeed for ChannelFeed {
    fn subscribe(&mut self, sink: FeedSink) -> Result<(), FeedError> {
        let mut slot = self.sink.lock();
        if slot.is_some() {
            return Err(FeedError::AlreadySubscribed);
        }
        *slot = Some(sink);
        Ok(())
    }

    fn unsubscribe(&mut self) {
        self.sink.lock().take();
    }
}

/// Liaison flux → moniteur, propriétaire de l'abonnement
pub struct MonitorHandle {
    monitor: Arc<TemperatureMonitor>,
    feed: Mutex<Option<Box<dyn ReadingFeed>>>,
    writer: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorHandle {
    /// Abonne le flux et démarre la tâche écrivain (nécessite un runtime tokio)
    pub fn attach(monitor: Arc<TemperatureMonitor>, mut feed: Box<dyn ReadingFeed>) -> Result<Self, FeedError> {
        let (sink, mut events) = mpsc::unbounded_channel();
        feed.subscribe(sink)?;

        let target = monitor.clone();
        let writer = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    FeedEvent::Reading(raw) => {
                        target.apply_reading(&raw);
                    }
                    FeedEvent::Error(message) => target.apply_feed_error(message),
                }
            }
            debug!("reading feed closed");
        });

        info!("temperature monitor attached to reading feed");
        Ok(Self {
            monitor,
            feed: Mutex::new(Some(feed)),
            writer: Mutex::new(Some(writer)),
        })
    }

    pub fn monitor(&self) -> &Arc<TemperatureMonitor> {
        &self.monitor
    }

    pub fn is_attached(&self) -> bool {
        self.feed.lock().is_some()
    }

    pub fn shutdown(&self) {
        if let Some(mut feed) = self.feed.lock().take() {
            feed.unsubscribe();
            info!("reading feed unsubscribed");
        }
        if let Some(writer) = self.writer.lock().take() {
            writer.abort();
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
