//! Backend entry-point: loads settings, wires storage, and serves the REST API.

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use pramana::config::AppSettings;
use pramana::inbound::http::health::HealthState;
use pramana::server::{ServerConfig, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = AppSettings::load().map_err(|e| eyre!("failed to load settings: {e}"))?;
    let config = ServerConfig::from_settings(&settings).wrap_err("invalid server settings")?;
    info!(addr = %config.bind_addr(), limits = ?config.limits(), "starting server");

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config).wrap_err("failed to bind server")?;
    server.await.wrap_err("server terminated with an error")
}
