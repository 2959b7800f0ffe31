use std::path::Path;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tollgate::config::{Config, RuntimeConfig};
use tollgate::gate::AdmissionGate;
use tollgate::registry::ClientRegistry;
use tollgate::routes::Router;
use tollgate::server::{serve, shutdown_signal, spawn_sweeper};

const CONFIG_FILE_PATH: &str = "./Config.yml";

fn load_config() -> tollgate::Result<RuntimeConfig> {
    if Path::new(CONFIG_FILE_PATH).exists() {
        Config::load_from_file(CONFIG_FILE_PATH)?.into_runtime()
    } else {
        info!("no config file at {CONFIG_FILE_PATH}, using built-in defaults");
        Config::default().into_runtime()
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            error!(%e, "invalid configuration");
            return;
        }
    };

    let normal_registry = Arc::new(ClientRegistry::new(config.normal));
    let strict_registry = Arc::new(ClientRegistry::new(config.strict));

    let router = Arc::new(Router::new(
        AdmissionGate::new("/ping_normal", Arc::clone(&normal_registry)),
        AdmissionGate::new("/ping_strict", Arc::clone(&strict_registry)),
    ));

    let listener = match TcpListener::bind(config.listen).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%e, addr = %config.listen, "failed to bind listener");
            return;
        }
    };

    // One shutdown broadcast feeds the accept loop and both sweepers.
    let (shutdown_tx, shutdown_rx) = watch::channel(());

    for (route, registry) in [
        ("/ping_normal", Arc::clone(&normal_registry)),
        ("/ping_strict", Arc::clone(&strict_registry)),
    ] {
        let mut rx = shutdown_rx.clone();
        let _ = spawn_sweeper(
            route,
            registry,
            config.sweep_interval,
            config.idle_threshold,
            async move {
                let _ = rx.changed().await;
            },
        );
    }

    info!(addr = %config.listen, "listening");

    serve(listener, router, async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(());
    })
    .await;
}
