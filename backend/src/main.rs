//! Server entry-point: loads settings, wires the record store, and serves the
//! verification API with health probes and OpenAPI docs.

mod server;

use actix_web::web;
use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use certverify::inbound::http::health::HealthState;
use server::{AppSettings, ServerConfig, create_server};

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

    let settings = AppSettings::load_from_iter(std::env::args_os())
        .map_err(|err| eyre!("failed to load settings: {err}"))?;
    let config = ServerConfig::from_settings(&settings).wrap_err("invalid settings")?;
    info!(
        bind_addr = %config.bind_addr(),
        records = config.records().label(),
        "starting certificate verification server"
    );

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), &config)?;
    let result = server.await;
    health_state.mark_unhealthy();
    result.wrap_err("HTTP server stopped with an error")
}
