/**
 * API REST COLDCHAIN - Surface HTTP du moteur
 *
 * RÔLE :
 * Expose le moniteur de température (lecture d'état, changement de plage,
 * acquittement d'erreur) et le calcul des frais d'envoi.
 *
 * FONCTIONNEMENT :
 * - Serveur Axum avec middleware auth API key
 * - Routes : /health, /system/health, /monitor/{state,range,error/ack}, /shipping/quote
 * - Les formats d'affichage (°F/°C, ancienneté, statut) sont calculés à la
 *   requête, l'ancienneté reste donc à jour sans nouvelle lecture
 *
 * SÉCURITÉ :
 * - Header x-api-key obligatoire sur toutes routes sauf /health
 * - Accès refusé si COLDCHAIN_API_KEY n'est pas défini
 */

use crate::catalog::{Cart, CartLine};
use crate::geo::Coordinate;
use crate::health::{HealthTracker, KernelHealth};
use crate::models::{now_millis, MonitorState, MonitorStatus, TemperatureRange};
use crate::monitor::{MonitorError, TemperatureMonitor};
use crate::shipping::{ShippingQuote, ShippingRules};
use axum::extract::{Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

type ApiError = (StatusCode, Json<serde_json::Value>);

fn api_error(code: StatusCode, msg: impl ToString) -> ApiError {
    (code, Json(serde_json::json!({ "error": msg.to_string() })))
}

#[derive(Debug, Serialize)]
struct MonitorView {
    fahrenheit: Option<f64>,
    celsius: Option<f64>,
    formatted_fahrenheit: String,
    formatted_celsius: String,
    last_updated_millis: Option<i64>,
    staleness: String,
    range: Option<TemperatureRange>,
    is_out_of_range: bool,
    loading: bool,
    error: Option<String>,
    status: MonitorStatus,
}

fn to_view(s: &MonitorState, now: i64) -> MonitorView {
    MonitorView {
        fahrenheit: s.fahrenheit,
        celsius: s.celsius,
        formatted_fahrenheit: s.formatted_fahrenheit(),
        formatted_celsius: s.formatted_celsius(),
        last_updated_millis: s.last_updated_millis,
        staleness: s.staleness(now),
        range: s.range,
        is_out_of_range: s.is_out_of_range,
        loading: s.loading,
        error: s.error.clone(),
        status: s.status(),
    }
}

fn api_key_matches(expected: &str, provided: Option<&str>) -> bool {
    !expected.is_empty() && provided == Some(expected)
}

async fn require_api_key(req: Request, next: Next) -> Result<Response, StatusCode> {
    // health check toujours accessible
    if req.uri().path() == "/health" {
        return Ok(next.run(req).await);
    }

    let expected = std::env::var("COLDCHAIN_API_KEY").unwrap_or_default();
    if expected.is_empty() {
        warn!("SECURITY: COLDCHAIN_API_KEY not set - API access denied");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let provided = req.headers().get("x-api-key").and_then(|v| v.to_str().ok());
    if !api_key_matches(&expected, provided) {
        warn!("rejected request to {} (bad api key)", req.uri().path());
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

#[derive(Clone)]
pub struct AppState {
    pub monitor: Arc<TemperatureMonitor>,
    pub rules: ShippingRules,
    pub health_tracker: HealthTracker,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/monitor/state", get(get_monitor_state))
        .route("/monitor/range", put(put_monitor_range))
        .route("/monitor/error/ack", post(ack_monitor_error))
        .route("/shipping/quote", get(get_shipping_quote).post(post_cart_quote))
        .with_state(app_state)
        .layer(middleware::from_fn(require_api_key))
}

// GET /system/health
async fn get_system_health(State(app): State<AppState>) -> Json<KernelHealth> {
    Json(app.health_tracker.get_health(&app.monitor))
}

// GET /monitor/state
async fn get_monitor_state(State(app): State<AppState>) -> Json<MonitorView> {
    Json(to_view(&app.monitor.state(), now_millis()))
}

#[derive(Debug, Deserialize)]
struct RangeBody {
    min_celsius: f64,
    max_celsius: f64,
}

// PUT /monitor/range
async fn put_monitor_range(
    State(app): State<AppState>,
    Json(body): Json<RangeBody>,
) -> Result<Json<MonitorView>, ApiError> {
    match app.monitor.update_range(body.min_celsius, body.max_celsius) {
        Ok(()) => Ok(Json(to_view(&app.monitor.state(), now_millis()))),
        Err(e @ MonitorError::InvalidRange { .. }) => Err(api_error(StatusCode::UNPROCESSABLE_ENTITY, e)),
        Err(e @ MonitorError::Storage(_)) => {
            error!("range update failed: {}", e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e))
        }
    }
}

// POST /monitor/error/ack
async fn ack_monitor_error(State(app): State<AppState>) -> StatusCode {
    app.monitor.acknowledge_error();
    StatusCode::NO_CONTENT
}

#[derive(Debug, Deserialize)]
struct QuoteParams {
    subtotal: f64,
    latitude: f64,
    longitude: f64,
}

// GET /shipping/quote?subtotal=&latitude=&longitude=
async fn get_shipping_quote(
    State(app): State<AppState>,
    Query(params): Query<QuoteParams>,
) -> Result<Json<ShippingQuote>, ApiError> {
    if !params.subtotal.is_finite() {
        return Err(api_error(StatusCode::BAD_REQUEST, "subtotal must be a finite number"));
    }
    let client = Coordinate::new(params.latitude, params.longitude)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    Ok(Json(app.rules.quote(params.subtotal, &client)))
}

#[derive(Debug, Deserialize)]
struct ClientLocation {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct CartQuoteBody {
    items: Vec<CartLine>,
    client: ClientLocation,
}

#[derive(Debug, Serialize)]
struct CartQuoteView {
    subtotal: f64,
    requires_cold_chain: bool,
    #[serde(flatten)]
    quote: ShippingQuote,
}

// POST /shipping/quote
async fn post_cart_quote(
    State(app): State<AppState>,
    Json(body): Json<CartQuoteBody>,
) -> Result<Json<CartQuoteView>, ApiError> {
    let client = Coordinate::new(body.client.latitude, body.client.longitude)
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, e))?;
    let cart = Cart { items: body.items };
    let subtotal = cart.subtotal();
    Ok(Json(CartQuoteView {
        subtotal,
        requires_cold_chain: cart.requires_cold_chain(),
        quote: app.rules.quote(subtotal, &client),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Product;
    use crate::models::{RawReading, RawTemperature};
    use crate::ports::{KeyValueStore, MemoryStore, PortError};
    use crate::shipping::ShippingTier;

    fn app_with_store(store: Arc<dyn KeyValueStore>) -> AppState {
        let store_location = Coordinate::new(-43.6167, -71.8000).unwrap();
        AppState {
            monitor: Arc::new(TemperatureMonitor::new(store)),
            rules: ShippingRules::new(store_location),
            health_tracker: HealthTracker::new(),
        }
    }

    fn app() -> AppState {
        app_with_store(Arc::new(MemoryStore::new()))
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, PortError> {
            Ok(None)
        }

        fn put_many(&self, _entries: &[(&str, &str)]) -> Result<(), PortError> {
            Err(PortError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full")))
        }
    }

    #[test]
    fn test_api_key_matching() {
        assert!(api_key_matches("secret", Some("secret")));
        assert!(!api_key_matches("secret", Some("other")));
        assert!(!api_key_matches("secret", None));
        assert!(!api_key_matches("", Some("")));
    }

    #[test]
    fn test_router_builds() {
        let _router = build_router(app());
    }

    #[tokio::test]
    async fn test_state_view_before_and_after_reading() {
        let app = app();
        let Json(view) = get_monitor_state(State(app.clone())).await;
        assert_eq!(view.status, MonitorStatus::NoData);
        assert_eq!(view.formatted_fahrenheit, "--");
        assert_eq!(view.staleness, "no readings");
        assert!(view.loading);

        app.monitor.apply_reading(&RawReading {
            value: RawTemperature::Number(71.6),
            observed_at_millis: now_millis(),
        });
        let Json(view) = get_monitor_state(State(app)).await;
        assert_eq!(view.status, MonitorStatus::OutOfRange);
        assert_eq!(view.formatted_fahrenheit, "71.60 °F");
        assert_eq!(view.formatted_celsius, "22.00 °C");
        assert_eq!(view.staleness, "just now");
    }

    #[tokio::test]
    async fn test_put_range_status_codes() {
        let app = app();
        let ok = put_monitor_range(
            State(app.clone()),
            Json(RangeBody { min_celsius: 0.0, max_celsius: 4.0 }),
        )
        .await
        .unwrap();
        assert_eq!(ok.0.range, TemperatureRange::new(0.0, 4.0));

        let (code, _) = put_monitor_range(
            State(app.clone()),
            Json(RangeBody { min_celsius: 8.0, max_celsius: 2.0 }),
        )
        .await
        .unwrap_err();
        assert_eq!(code, StatusCode::UNPROCESSABLE_ENTITY);

        let broken = app_with_store(Arc::new(BrokenStore));
        let (code, _) = put_monitor_range(
            State(broken.clone()),
            Json(RangeBody { min_celsius: 0.0, max_celsius: 4.0 }),
        )
        .await
        .unwrap_err();
        assert_eq!(code, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(broken.monitor.state().range, Some(TemperatureRange::default()));
    }

    #[tokio::test]
    async fn test_ack_clears_error() {
        let app = app();
        app.monitor.apply_feed_error("broker unreachable");
        assert_eq!(ack_monitor_error(State(app.clone())).await, StatusCode::NO_CONTENT);
        assert_eq!(app.monitor.state().error, None);
    }

    #[tokio::test]
    async fn test_quote_by_query() {
        let Json(quote) = get_shipping_quote(
            State(app()),
            Query(QuoteParams { subtotal: 60_000.0, latitude: -43.6167, longitude: -71.8000 }),
        )
        .await
        .unwrap();
        assert_eq!(quote.tier, ShippingTier::FreeLocal);
        assert_eq!(quote.fee, 0.0);

        let (code, _) = get_shipping_quote(
            State(app()),
            Query(QuoteParams { subtotal: 60_000.0, latitude: 91.0, longitude: 0.0 }),
        )
        .await
        .unwrap_err();
        assert_eq!(code, StatusCode::BAD_REQUEST);

        for subtotal in [f64::NAN, f64::INFINITY] {
            let (code, _) = get_shipping_quote(
                State(app()),
                Query(QuoteParams { subtotal, latitude: -43.6167, longitude: -71.8000 }),
            )
            .await
            .unwrap_err();
            assert_eq!(code, StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn test_nan_subtotal_query_is_parsed_then_rejected() {
        // "NaN" passe la désérialisation f64 : le handler doit le refuser lui-même
        let uri: axum::http::Uri = "/shipping/quote?subtotal=NaN&latitude=0&longitude=0".parse().unwrap();
        let Query(params) = Query::<QuoteParams>::try_from_uri(&uri).unwrap();
        assert!(params.subtotal.is_nan());
    }

    #[tokio::test]
    async fn test_quote_for_cart() {
        let salmon = Product { id: "salmon".into(), name: "Salmon".into(), price: 10_000.0, requires_cold_chain: true };
        let body = CartQuoteBody {
            items: vec![CartLine { product: salmon, quantity: 3 }],
            client: ClientLocation { latitude: -43.6167, longitude: -71.8000 },
        };
        let Json(view) = post_cart_quote(State(app()), Json(body)).await.unwrap();
        assert_eq!(view.subtotal, 30_000.0);
        assert!(view.requires_cold_chain);
        assert_eq!(view.quote.tier, ShippingTier::MidSubtotal);
        assert_eq!(view.quote.fee, 0.0);
    }
}
