use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use media_capture_core::UsbIdTable;
use media_capture_server::ServerConfig;

#[derive(Parser, Debug)]
#[command(name = "media-capture-server")]
#[command(about = "Synchronized camera + microphone capture over TCP", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address (default 127.0.0.1)
    #[arg(long)]
    address: Option<String>,

    /// Listen port (default 12345)
    #[arg(short, long)]
    port: Option<u16>,

    /// usb.ids file for vendor/product names
    #[arg(long)]
    usb_ids: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &cli.config {
        Some(path) => ServerConfig::load(path).context("Failed to load config")?,
        None => ServerConfig::default(),
    }
    .with_overrides(cli.address, cli.port, cli.usb_ids);
    config.validate().context("Invalid configuration")?;

    let usb_ids = load_usb_ids(&config);
    run(config, usb_ids).await
}

fn load_usb_ids(config: &ServerConfig) -> UsbIdTable {
    let Some(path) = &config.usb_ids_path else {
        return UsbIdTable::default();
    };
    match UsbIdTable::load(path) {
        Ok(table) => {
            log::info!("Loaded {} vendors from {}", table.vendor_count(), path.display());
            table
        }
        Err(e) => {
            log::error!("Failed to open {}: {}; vendor names will be unknown", path.display(), e);
            UsbIdTable::default()
        }
    }
}

#[cfg(target_os = "windows")]
async fn run(config: ServerConfig, usb_ids: UsbIdTable) -> Result<()> {
    use std::sync::Arc;

    use media_capture_server::{server, MediaController};
    use media_capture_windows::MediaFoundationProvider;

    let controller = Arc::new(MediaController::from_config(MediaFoundationProvider::new(), &config, usb_ids)?);
    let listener = server::bind(&config.bind_address()).await?;

    tokio::select! {
        result = server::serve(listener, controller) => result?,
        _ = tokio::signal::ctrl_c() => log::info!("The server has stopped."),
    }
    Ok(())
}

#[cfg(not(target_os = "windows"))]
async fn run(config: ServerConfig, _usb_ids: UsbIdTable) -> Result<()> {
    log::error!(
        "No capture backend for this platform; not listening on {}",
        config.bind_address()
    );
    anyhow::bail!("Media Foundation capture requires Windows")
}
