//! Image proxy binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request          ┌──────────────────────────────────────────────┐
//!     GET /?u=<url>  ────────▶│  http server ──▶ upstream client ──────────┼──▶ Upstream
//!                             │                        │                     │
//!                             │                   content-type?              │
//!                             │                  ┌─────┴──────┐              │
//!                             │                 html        other            │
//!                             │                  │            │              │
//!     Client Response         │              rewrite      passthrough        │
//!     ◀───────────────────────┼──────────────────┴────────────┘              │
//!                             └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use image_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use image_proxy::http::HttpServer;
use image_proxy::lifecycle::{wait_for_shutdown, Shutdown};
use image_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "image-proxy", version)]
#[command(about = "HTTP forwarding proxy that routes HTML image sources back through itself", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "IMAGE_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Public base URL of this proxy, overrides `proxy.base_url`.
    #[arg(long, env = "PROXY_URL")]
    proxy_url: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut ProxyConfig) {
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let Some(proxy_url) = self.proxy_url {
            config.proxy.base_url = proxy_url;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    let config_path = cli.config.clone();
    cli.apply(&mut config);

    logging::init_logging(&config.observability);
    tracing::info!("image-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            tracing::error!(error = %error, "Invalid configuration");
        }
        return Err(ConfigError::Validation(errors).into());
    }

    tracing::info!(
        config_path = ?config_path,
        bind_address = %config.listener.bind_address,
        base_url = %config.proxy.base_url,
        timeout_secs = ?config.upstream.timeout_secs,
        max_body_bytes = ?config.upstream.max_body_bytes,
        "Configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    if config.observability.metrics_enabled {
        // Validated above.
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        }
    }

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
