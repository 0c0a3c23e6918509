/**
 * FLUX MQTT - Lectures de température poussées par la télémétrie
 *
 * RÔLE : Implémentation de ReadingFeed sur un broker MQTT (rumqttc).
 *
 * PAYLOADS ACCEPTÉS sur le topic configuré :
 * - nombre JSON nu            : 38.5
 * - chaîne JSON               : "38.5"
 * - objet                     : {"fahrenheit": 38.5, "observed_at": 1700000000000}
 * - texte brut                : 38.5
 * La conversion numérique finale est faite par le moniteur (les points mal
 * formés y sont ignorés).
 */

use crate::config::MqttConf;
use crate::feed::{FeedError, FeedEvent, FeedSink, ReadingFeed};
use crate::health::HealthTracker;
use crate::models::{now_millis, RawReading, RawTemperature};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use serde::Deserialize;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReadingPayload {
    Object {
        fahrenheit: RawTemperature,
        observed_at: Option<i64>,
    },
    Bare(RawTemperature),
}

/// Décode un payload MQTT ; `received_at_millis` sert quand la source n'horodate pas
pub fn parse_reading_payload(payload: &[u8], received_at_millis: i64) -> RawReading {
    match serde_json::from_slice::<ReadingPayload>(payload) {
        Ok(ReadingPayload::Object { fahrenheit, observed_at }) => RawReading {
            value: fahrenheit,
            observed_at_millis: observed_at.unwrap_or(received_at_millis),
        },
        Ok(ReadingPayload::Bare(value)) => RawReading { value, observed_at_millis: received_at_millis },
        Err(_) => RawReading {
            value: RawTemperature::Text(String::from_utf8_lossy(payload).into_owned()),
            observed_at_millis: received_at_millis,
        },
    }
}

pub struct MqttReadingFeed {
    conf: MqttConf,
    health: HealthTracker,
    listener: Option<JoinHandle<()>>,
}

impl MqttReadingFeed {
    pub fn new(conf: MqttConf, health: HealthTracker) -> Self {
        Self { conf, health, listener: None }
    }
}

impl ReadingFeed for MqttReadingFeed {
    fn subscribe(&mut self, sink: FeedSink) -> Result<(), FeedError> {
        if self.listener.is_some() {
            return Err(FeedError::AlreadySubscribed);
        }

        let mut opts = MqttOptions::new(&self.conf.client_id, &self.conf.host, self.conf.port);
        opts.set_keep_alive(Duration::from_secs(15));
        let (client, mut eventloop) = AsyncClient::new(opts, 10);
        let topic = self.conf.topic.clone();
        let health = self.health.clone();
        info!("subscribing to temperature readings on {}", topic);

        self.listener = Some(tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                        health.mark_feed_connected();
                        // clean session : l'abonnement est refait à chaque connexion
                        if let Err(e) = client.subscribe(topic.clone(), QoS::AtLeastOnce).await {
                            error!("MQTT subscribe failed: {:?}", e);
                        }
                    }
                    Ok(Event::Incoming(Incoming::Publish(p))) if p.topic == topic => {
                        let reading = parse_reading_payload(&p.payload, now_millis());
                        if sink.send(FeedEvent::Reading(reading)).is_err() {
                            debug!("reading sink closed, stopping MQTT listener");
                            return;
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("MQTT error: {:?}", e);
                        health.increment_reconnects();
                        if sink.send(FeedEvent::Error(e.to_string())).is_err() {
                            return;
                        }
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        }));
        Ok(())
    }

    fn unsubscribe(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
            self.health.mark_feed_disconnected();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_number_payload() {
        let r = parse_reading_payload(b"38.5", 42);
        assert_eq!(r.value, RawTemperature::Number(38.5));
        assert_eq!(r.observed_at_millis, 42);
    }

    #[test]
    fn test_string_payload() {
        let r = parse_reading_payload(br#""38.5""#, 42);
        assert_eq!(r.value, RawTemperature::Text("38.5".into()));
    }

    #[test]
    fn test_object_payload_with_timestamp() {
        let r = parse_reading_payload(br#"{"fahrenheit": 40, "observed_at": 1700000000000}"#, 42);
        assert_eq!(r.value, RawTemperature::Number(40.0));
        assert_eq!(r.observed_at_millis, 1_700_000_000_000);

        let r = parse_reading_payload(br#"{"fahrenheit": "40.2"}"#, 42);
        assert_eq!(r.value, RawTemperature::Text("40.2".into()));
        assert_eq!(r.observed_at_millis, 42);
    }

    #[test]
    fn test_plain_text_payload_is_kept_for_the_monitor() {
        let r = parse_reading_payload(b"  39,1 ", 7);
        assert_eq!(r.value, RawTemperature::Text("  39,1 ".into()));
        assert_eq!(r.value.fahrenheit(), Some(39.1));

        let garbage = parse_reading_payload(&[0xff, 0xfe], 7);
        assert_eq!(garbage.value.fahrenheit(), None);
    }
}
