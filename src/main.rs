mod api;
mod config;
mod engine;
mod error;
mod geo;
mod models;
mod observability;
mod polyline;
mod services;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::services::directions::GoogleDirections;
use crate::services::fleet::HttpFleetBackend;
use crate::services::geocoding::GoogleGeocoder;
use crate::state::Providers;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()
        .map_err(|err| error::AppError::Internal(format!("failed to build http client: {err}")))?;

    let providers = Providers {
        directions: Arc::new(GoogleDirections::new(
            http.clone(),
            config.directions_base_url.clone(),
            config.maps_api_key.clone(),
        )),
        geocoder: Arc::new(GoogleGeocoder::new(
            http.clone(),
            config.geocoding_base_url.clone(),
            config.maps_api_key.clone(),
        )),
        fleet: Arc::new(HttpFleetBackend::new(
            http,
            config.fleet_api_base_url.clone(),
            config.fleet_api_token.clone(),
        )),
    };

    let shared_state = Arc::new(state::AppState::new(config.engine, providers));
    let app = api::rest::router(shared_state.clone());

    tokio::spawn(engine::reaper::run_draft_reaper(shared_state.clone()));

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
