use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ebinterface_web::config::{AppConfig, ServerArgs};
use ebinterface_web::{bootstrap, server};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from(ServerArgs::parse());
    tracing::info!(?config, "starting ebinterface-web");

    let ctx = match bootstrap(&config) {
        Ok(ctx) => Arc::new(ctx),
        Err(e) => {
            tracing::error!(error = %e, "unable to proceed");
            return ExitCode::FAILURE;
        }
    };
    if !ctx.fully_available() {
        tracing::warn!(status = ?ctx.resource_status(), "starting in degraded mode");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(%addr, error = %e, "failed to bind listener");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("ebinterface-web listening on {addr}");

    if let Err(e) = axum::serve(listener, server::app(ctx)).await {
        tracing::error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
