/*!
Builders de payloads de télémétrie

Produit les formats acceptés sur le topic de lectures :
objet JSON horodaté, nombre nu, chaîne.
*/

use chrono::Utc;
use serde_json::{json, Value};

pub struct TelemetryMessageBuilder;

impl TelemetryMessageBuilder {
    /// Lecture horodatée maintenant
    pub fn reading(fahrenheit: f64) -> Value {
        Self::reading_at(fahrenheit, Utc::now().timestamp_millis())
    }

    pub fn reading_at(fahrenheit: f64, observed_at_millis: i64) -> Value {
        json!({
            "fahrenheit": fahrenheit,
            "observed_at": observed_at_millis
        })
    }

    /// Lecture sans horodatage : le récepteur utilise son heure de réception
    pub fn reading_without_timestamp(fahrenheit: f64) -> Value {
        json!({ "fahrenheit": fahrenheit })
    }

    pub fn text_reading(text: &str) -> Value {
        json!({ "fahrenheit": text })
    }

    pub fn to_bytes(payload: &Value) -> Vec<u8> {
        payload.to_string().into_bytes()
    }
}
