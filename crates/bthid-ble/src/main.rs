//! JadeAI BLE HID service entry point.
//!
//! Loads the YAML configuration (path from `--config`, `JADEAI_HID_CONFIG`,
//! or the default), brings up the HID service, and serves the HTTP control
//! API until Ctrl-C/SIGTERM.
//!
//! The GATT application and LE advertisement this process expects the
//! hosting system to register are available from the service
//! (`gatt_application`/`advertisement`); registration against BlueZ is
//! deployment glue and stays outside this binary.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use bthid_ble::application::service::BleHidService;
use bthid_ble::domain::config;
use bthid_ble::infrastructure::http;

/// Bluetooth Low Energy HID keyboard/mouse service.
#[derive(Parser)]
#[command(name = "jadeai-blehid", version, about)]
struct Cli {
    /// Path to the YAML configuration file (overrides JADEAI_HID_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(config::config_path);
    let config = config::load_config(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;
    info!(
        device = %config.device.device_name,
        adapter = %config.device.adapter_path(),
        "configuration loaded"
    );

    let hid = Arc::new(BleHidService::new(config.clone()));
    hid.start();
    debug!(
        services = hid.gatt_application().len(),
        advertisement = %hid.advertisement().local_name,
        "GATT application prepared for registration"
    );

    let bind_addr = format!("{}:{}", config.http.bind, config.http.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding HTTP API to {bind_addr}"))?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, http::router(Arc::clone(&hid)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    hid.stop();
    info!("BLE HID service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
