//! Server accept loop, the eviction sweeper, and graceful shutdown.
//!
//! Contains the runtime infrastructure that sits between the TCP listener
//! and the per-request pipeline. This module is intentionally decoupled
//! from `main()` so that the server logic remains testable and reusable
//! without pulling in process-level concerns like signal handling.

use std::sync::Arc;
use std::time::Duration;

use hyper::Request;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::registry::ClientRegistry;
use crate::routes::{ApiBody, Router};

/// Accepts connections on `listener` and dispatches each request through
/// `router`.
///
/// Runs until `shutdown` resolves, then stops accepting new connections and
/// returns. In-flight requests on already-spawned tasks continue to
/// completion independently.
pub async fn serve(
    listener: TcpListener,
    router: Arc<Router>,
    shutdown: impl Future<Output = ()>,
) {
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, client_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(%e, "failed to accept connection");
                        continue;
                    }
                };

                let router = Arc::clone(&router);
                tokio::spawn(async move {
                    let svc = service_fn(move |req: Request<Incoming>| {
                        let router = Arc::clone(&router);
                        async move {
                            let resp = router
                                .handle(&req, client_addr)
                                .unwrap_or_else(|e| e.into_response());
                            Ok::<hyper::Response<ApiBody>, std::convert::Infallible>(resp)
                        }
                    });

                    if let Err(e) = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), svc)
                        .await
                    {
                        warn!(%e, "connection error");
                    }
                });
            }
            () = &mut shutdown => {
                info!("shutting down, no longer accepting connections");
                break;
            }
        }
    }
}

/// Spawns the background eviction sweep for one registry.
///
/// Every `interval` tick, entries idle for longer than `idle_threshold` are
/// removed. The task holds no locks while sleeping and exits when
/// `shutdown` resolves.
pub fn spawn_sweeper(
    route: &'static str,
    registry: Arc<ClientRegistry>,
    interval: Duration,
    idle_threshold: Duration,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // A tokio interval's first tick completes immediately; skip it so
        // the first sweep happens one full interval after startup.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = registry.sweep(idle_threshold);
                    if evicted > 0 {
                        info!(route, evicted, tracked = registry.len(), "evicted idle clients");
                    } else {
                        debug!(route, tracked = registry.len(), "sweep found no idle clients");
                    }
                }
                () = &mut shutdown => {
                    debug!(route, "sweeper stopped");
                    break;
                }
            }
        }
    })
}

/// Awaits a shutdown signal (SIGINT or SIGTERM on Unix, Ctrl+C on all
/// platforms). Returns once the first signal is received.
pub async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to register SIGTERM handler");

        tokio::select! {
            _ = ctrl_c => info!("received SIGINT, initiating graceful shutdown"),
            _ = sigterm.recv() => info!("received SIGTERM, initiating graceful shutdown"),
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.expect("failed to listen for Ctrl+C");
        info!("received Ctrl+C, initiating graceful shutdown");
    }
}
