/**
 * COLDCHAIN KERNEL - Tarification des livraisons et surveillance chaîne du froid
 *
 * RÔLE :
 * - geo / shipping : distance boutique → client et frais d'envoi par paliers
 * - models / monitor : lectures de température, plage admise, alertes sur front
 * - range_store / ports : persistance clé/valeur de la plage
 * - feed / mqtt : sources de lectures poussées vers le moniteur
 * - config / health / http : surface de déploiement du binaire
 */

pub mod catalog;
pub mod config;
pub mod feed;
pub mod geo;
pub mod health;
pub mod http;
pub mod models;
pub mod monitor;
pub mod mqtt;
pub mod ports;
pub mod range_store;
pub mod shipping;

pub use feed::{ChannelFeed, FeedError, FeedEvent, FeedSink, MonitorHandle, ReadingFeed};
pub use geo::{distance_km, Coordinate, GeoError};
pub use models::{AlertEvent, MonitorState, MonitorStatus, RawReading, RawTemperature, TemperatureRange};
pub use monitor::{AlertSubscription, MonitorError, StateSubscription, TemperatureMonitor};
pub use shipping::{shipping_fee, ShippingQuote, ShippingRules, ShippingTier};
