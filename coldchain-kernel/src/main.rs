/**
 * COLDCHAIN KERNEL - Point d'entrée du serveur
 *
 * RÔLE : Orchestration des modules : config, stockage, moniteur, flux MQTT, HTTP.
 * ARRÊT : Ctrl-C désabonne le flux puis termine le serveur HTTP proprement.
 */

use anyhow::Context;
use coldchain_kernel::config::load_config;
use coldchain_kernel::health::HealthTracker;
use coldchain_kernel::http::{build_router, AppState};
use coldchain_kernel::mqtt::MqttReadingFeed;
use coldchain_kernel::ports::{JsonFileStore, KeyValueStore, MemoryStore};
use coldchain_kernel::{MonitorHandle, ShippingRules, TemperatureMonitor};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("coldchain_kernel=info")),
        )
        .init();

    let cfg = load_config().await;
    let store_location = cfg.store_coordinate().context("invalid store coordinate in config")?;

    // stockage de la plage : repli en mémoire si le fichier est inutilisable
    let store: Arc<dyn KeyValueStore> = match JsonFileStore::open(cfg.storage.path.clone()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!("settings file {:?} unavailable ({}), range will not survive restart", cfg.storage.path, e);
            Arc::new(MemoryStore::new())
        }
    };

    let health_tracker = HealthTracker::new();
    let monitor = Arc::new(TemperatureMonitor::new(store));

    let feed = MqttReadingFeed::new(cfg.mqtt.clone(), health_tracker.clone());
    let handle = MonitorHandle::attach(monitor.clone(), Box::new(feed)).context("failed to subscribe reading feed")?;

    let app_state = AppState {
        monitor,
        rules: ShippingRules::new(store_location),
        health_tracker,
    };
    let app = build_router(app_state);

    let listener = TcpListener::bind(&cfg.http.bind)
        .await
        .with_context(|| format!("failed to bind {}", cfg.http.bind))?;
    info!("listening on http://{}", cfg.http.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
            info!("shutting down");
            handle.shutdown();
        })
        .await
        .context("http server error")?;

    Ok(())
}
