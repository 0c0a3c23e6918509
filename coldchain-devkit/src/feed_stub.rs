/*!
Flux de lectures stub pour développement sans broker

Implémente `ReadingFeed` ; le contrôleur (clonable) pousse lectures et
erreurs à la main et compte les abonnements/désabonnements.
*/

use coldchain_kernel::feed::{FeedError, FeedEvent, FeedSink, ReadingFeed};
use coldchain_kernel::models::{RawReading, RawTemperature};
use coldchain_kernel::mqtt::parse_reading_payload;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Default)]
struct StubState {
    sink: Option<FeedSink>,
    subscribe_calls: usize,
    unsubscribe_calls: usize,
    fail_next_subscribe: Option<String>,
    clock_millis: i64,
}

/// Côté test du stub : simule ce que pousserait la télémétrie
#[derive(Clone, Default)]
pub struct StubFeedController {
    state: Arc<Mutex<StubState>>,
}

/// Flux à passer au `MonitorHandle`
pub struct StubReadingFeed {
    state: Arc<Mutex<StubState>>,
}

impl StubReadingFeed {
    pub fn new() -> (Self, StubFeedController) {
        let controller = StubFeedController::default();
        (Self { state: controller.state.clone() }, controller)
    }
}

impl ReadingFeed for StubReadingFeed {
    fn subscribe(&mut self, sink: FeedSink) -> Result<(), FeedError> {
        let mut state = self.state.lock();
        state.subscribe_calls += 1;
        if let Some(reason) = state.fail_next_subscribe.take() {
            return Err(FeedError::Transport(reason));
        }
        if state.sink.is_some() {
            return Err(FeedError::AlreadySubscribed);
        }
        state.sink = Some(sink);
        log::debug!("stub feed subscribed");
        Ok(())
    }

    fn unsubscribe(&mut self) {
        let mut state = self.state.lock();
        state.unsubscribe_calls += 1;
        state.sink = None;
        log::debug!("stub feed unsubscribed");
    }
}

impl StubFeedController {
    /// Le prochain subscribe() échouera avec une erreur de transport
    pub fn fail_next_subscribe(&self, reason: &str) {
        self.state.lock().fail_next_subscribe = Some(reason.to_string());
    }

    /// Horloge simulée : chaque lecture sans horodatage avance d'une seconde
    fn tick(&self) -> i64 {
        let mut state = self.state.lock();
        state.clock_millis += 1_000;
        state.clock_millis
    }

    fn push(&self, event: FeedEvent) -> bool {
        match self.state.lock().sink.as_ref() {
            Some(sink) => sink.send(event).is_ok(),
            None => {
                log::warn!("stub feed has no subscriber, event dropped");
                false
            }
        }
    }

    pub fn simulate_reading(&self, fahrenheit: f64) -> bool {
        let at = self.tick();
        self.simulate_reading_at(fahrenheit, at)
    }

    pub fn simulate_reading_at(&self, fahrenheit: f64, observed_at_millis: i64) -> bool {
        self.push(FeedEvent::Reading(RawReading {
            value: RawTemperature::Number(fahrenheit),
            observed_at_millis,
        }))
    }

    /// Lecture textuelle, telle que reçue d'un capteur (ex: "38,5" ou "offline")
    pub fn simulate_text(&self, text: &str) -> bool {
        let at = self.tick();
        self.push(FeedEvent::Reading(RawReading {
            value: RawTemperature::Text(text.to_string()),
            observed_at_millis: at,
        }))
    }

    /// Payload brut décodé comme le ferait le flux MQTT
    pub fn simulate_payload(&self, payload: &[u8]) -> bool {
        let at = self.tick();
        self.push(FeedEvent::Reading(parse_reading_payload(payload, at)))
    }

    pub fn simulate_error(&self, message: &str) -> bool {
        self.push(FeedEvent::Error(message.to_string()))
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.lock().sink.is_some()
    }

    pub fn subscribe_calls(&self) -> usize {
        self.state.lock().subscribe_calls
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.state.lock().unsubscribe_calls
    }
}
