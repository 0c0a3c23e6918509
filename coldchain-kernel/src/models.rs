use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub const DEFAULT_MIN_CELSIUS: f64 = -10.0;
pub const DEFAULT_MAX_CELSIUS: f64 = 10.0;

/// Plage de température acceptable (°C), bornes incluses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureRange {
    pub min_celsius: f64,
    pub max_celsius: f64,
}

impl TemperatureRange {
    /// Retourne la plage seulement si min < max (et bornes finies)
    pub fn new(min_celsius: f64, max_celsius: f64) -> Option<Self> {
        let range = Self { min_celsius, max_celsius };
        range.is_valid().then_some(range)
    }

    pub fn is_valid(&self) -> bool {
        self.min_celsius.is_finite() && self.max_celsius.is_finite() && self.min_celsius < self.max_celsius
    }

    pub fn contains(&self, celsius: f64) -> bool {
        celsius >= self.min_celsius && celsius <= self.max_celsius
    }
}

impl Default for TemperatureRange {
    fn default() -> Self {
        Self { min_celsius: DEFAULT_MIN_CELSIUS, max_celsius: DEFAULT_MAX_CELSIUS }
    }
}

/// Valeur brute poussée par le flux : nombre ou texte
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTemperature {
    Number(f64),
    Text(String),
}

impl RawTemperature {
    /// Fahrenheit numérique, ou None si la valeur est inexploitable
    pub fn fahrenheit(&self) -> Option<f64> {
        let value = match self {
            RawTemperature::Number(v) => *v,
            RawTemperature::Text(txt) => txt.trim().replace(',', ".").parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    pub value: RawTemperature,
    pub observed_at_millis: i64,
}

/// Lecture validée, en Fahrenheit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub value_fahrenheit: f64,
    pub observed_at_millis: i64,
}

impl Reading {
    pub fn celsius(&self) -> f64 {
        fahrenheit_to_celsius(self.value_fahrenheit)
    }
}

impl RawReading {
    /// Lecture exploitable, ou None pour un point mal formé
    pub fn parse(&self) -> Option<Reading> {
        Some(Reading {
            value_fahrenheit: self.value.fahrenheit()?,
            observed_at_millis: self.observed_at_millis,
        })
    }
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Événement émis uniquement sur transition dans-plage <-> hors-plage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub is_out_of_range: bool,
    pub celsius: Option<f64>,
    pub fahrenheit: Option<f64>,
    pub range: Option<TemperatureRange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorStatus {
    Error,
    NoData,
    OutOfRange,
    InRange,
}

/// Modèle de lecture observé par les consommateurs (snapshot immuable)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitorState {
    pub fahrenheit: Option<f64>,
    pub celsius: Option<f64>,
    pub last_updated_millis: Option<i64>,
    pub range: Option<TemperatureRange>,
    pub is_out_of_range: bool,
    pub loading: bool,
    pub error: Option<String>,
}

impl MonitorState {
    pub fn initial(range: Option<TemperatureRange>) -> Self {
        Self {
            fahrenheit: None,
            celsius: None,
            last_updated_millis: None,
            range,
            is_out_of_range: false,
            loading: true,
            error: None,
        }
    }

    pub fn formatted_fahrenheit(&self) -> String {
        self.fahrenheit.map(|f| format!("{f:.2} °F")).unwrap_or_else(|| "--".to_string())
    }

    pub fn formatted_celsius(&self) -> String {
        self.celsius.map(|c| format!("{c:.2} °C")).unwrap_or_else(|| "--".to_string())
    }

    /// Ancienneté de la dernière lecture, recalculée à la demande
    pub fn staleness(&self, now_millis: i64) -> String {
        match self.last_updated_millis {
            Some(updated) => staleness_phrase(now_millis.saturating_sub(updated)),
            None => "no readings".to_string(),
        }
    }

    pub fn status(&self) -> MonitorStatus {
        if self.error.is_some() {
            MonitorStatus::Error
        } else if self.fahrenheit.is_none() {
            MonitorStatus::NoData
        } else if self.is_out_of_range {
            MonitorStatus::OutOfRange
        } else {
            MonitorStatus::InRange
        }
    }
}

/// Horloge murale en millisecondes epoch (horodatage des lectures)
pub fn now_millis() -> i64 {
    (OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000) as i64
}

pub fn staleness_phrase(age_millis: i64) -> String {
    let seconds = age_millis.max(0) / 1000;
    if seconds < 5 {
        "just now".to_string()
    } else if seconds < 60 {
        format!("{seconds} s ago")
    } else {
        format!("{} min ago", seconds / 60)
    }
}
