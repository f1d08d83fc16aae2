//!
//! access_relay HTTP server
//! ------------------------
//! Axum router for the dashboard and lookup API, plus the startup sequence that wires the
//! relay state to either the broker poller (broker mode) or the document store (lookup
//! mode).
//!
//! Responsibilities:
//! - Load the authorization directory and log it on startup.
//! - Broker mode: spawn the single background poller.
//! - Lookup mode: connect to the document store once; a failed connection disables
//!   `/api/validar` for the life of the process.
//! - Serve every route with permissive CORS.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::broker::{BrokerClient, BrokerPoller};
use crate::config::{RelayConfig, RelayMode};
use crate::directory::Directory;
use crate::relay::RelayState;
use crate::store::{PgTagStore, TagStore};

pub mod handlers;
pub mod validate;

/// Shared server state injected into all handlers.
///
/// `store` is `None` when no document store is available; the lookup route then answers
/// every call with a server error.
#[derive(Clone)]
pub struct AppState {
    pub relay: RelayState,
    pub store: Option<Arc<TagStore>>,
}

impl AppState {
    pub fn new(relay: RelayState, store: Option<TagStore>) -> Self {
        Self { relay, store: store.map(Arc::new) }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/app.js", get(handlers::app_js))
        .route("/api/ultimo_acesso", get(handlers::ultimo_acesso))
        .route("/api/historico_recente", get(handlers::historico_recente))
        .route("/api/estatisticas", get(handlers::estatisticas))
        .route("/api/validar", get(validate::validar))
        .route("/listar_autorizados", get(handlers::listar_autorizados))
        .route("/historico", get(handlers::historico))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn load_directory(config: &RelayConfig) -> anyhow::Result<Directory> {
    match &config.directory_file {
        Some(path) => Directory::load_json_file(path),
        None => Ok(Directory::builtin()),
    }
}

fn log_startup(config: &RelayConfig, directory: &Directory) {
    info!(
        target: "startup",
        "access_relay starting: mode={}, listen=http://{}, broker_url={}, poll_interval_ms={}",
        config.mode.as_str(), config.bind_addr(), config.broker_url, config.poll_interval.as_millis()
    );
    info!(target: "startup", "Authorized IDs in directory: {}", directory.len());
    for (id, entry) in directory.iter() {
        info!(target: "startup", "- ID {}: {} ({})", id, entry.nome, entry.departamento);
    }
}

async fn open_store(config: &RelayConfig) -> Option<TagStore> {
    let Some(dsn) = config.database_url.as_deref() else {
        warn!(target: "store", "DATABASE_URL not set; /api/validar disabled");
        return None;
    };
    match PgTagStore::connect(dsn, &config.collection, config.http_timeout).await {
        Ok(pg) => Some(TagStore::Postgres(pg)),
        Err(e) => {
            error!(target: "store", error = %e, "document store unavailable; /api/validar disabled");
            None
        }
    }
}

/// Start the relay with the given configuration and serve until the listener fails.
pub async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let directory = load_directory(&config)?;
    log_startup(&config, &directory);
    let relay = RelayState::new(directory);

    let store = match config.mode {
        RelayMode::Broker => {
            let client = BrokerClient::new(config.broker_url.clone(), config.http_timeout)
                .context("While building broker HTTP client")?;
            let poller = BrokerPoller::new(client, relay.clone(), config.poll_interval);
            tokio::spawn(poller.run());
            None
        }
        RelayMode::Lookup => open_store(&config).await,
    };

    let app = router(AppState::new(relay, store));
    let addr: SocketAddr = config
        .bind_addr()
        .parse()
        .with_context(|| format!("Invalid bind address: {}", config.bind_addr()))?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
