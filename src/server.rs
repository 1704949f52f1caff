use anyhow::Result;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::{client::InfoClient, collector::Collector, config, config::Config, metrics};

#[derive(Clone)]
pub struct AppState {
    collector: Arc<Collector>,
    metrics_handle: Arc<PrometheusHandle>,
}

/// Start the exporter server.
///
/// Installs the Prometheus recorder, builds the info client from the
/// configuration and serves `/metrics` until ctrl-c.
pub async fn run(config: Config) -> Result<()> {
    let metrics_handle = Arc::new(metrics::init_metrics());

    let client = InfoClient::new(
        config.info_url(),
        config.username.clone(),
        config.password.clone(),
        config.auth_token(),
        config.timeout(),
        &config::user_agent(),
        config.tls_skip_verify,
    )?;

    let state = AppState {
        collector: Arc::new(Collector::new(client)),
        metrics_handle,
    };

    let app = create_router(state);

    let addr = config.listen_addr()?;
    info!("Nextcloud server: {} User: {}", config.server, config.username);
    info!("Listen on {}...", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped gracefully");
    Ok(())
}

fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_endpoint))
        .route("/", get(|| async { Redirect::temporary("/metrics") }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle a Prometheus pull: run one scrape, then render the registry.
async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    state.collector.scrape().await;
    (StatusCode::OK, state.metrics_handle.render())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {err}");
    }
    info!("Shutdown signal received, draining connections...");
}
