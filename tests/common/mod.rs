//! Shared test infrastructure for integration tests.
//!
//! Provides a throwaway in-process server on an ephemeral port, router
//! builders, a bare HTTP client helper, and utility functions used across
//! all integration test modules.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::{Request, Response};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tollgate::config::RateProfile;
use tollgate::gate::AdmissionGate;
use tollgate::registry::ClientRegistry;
use tollgate::routes::Router;
use tollgate::server::serve;

/// A synthetic client address used in direct router invocations.
pub const TEST_CLIENT_ADDR: &str = "192.168.1.100:54321";

/// Initializes a tracing subscriber for test output.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

pub fn test_addr() -> SocketAddr {
    TEST_CLIENT_ADDR.parse().unwrap()
}

pub fn profile(per_second: f64, burst: u32) -> RateProfile {
    RateProfile { per_second, burst }
}

/// Builds a router whose routes use the given profiles, returning the
/// router plus both registries for direct inspection.
pub fn test_router(
    normal: RateProfile,
    strict: RateProfile,
) -> (Arc<Router>, Arc<ClientRegistry>, Arc<ClientRegistry>) {
    let normal_registry = Arc::new(ClientRegistry::new(normal));
    let strict_registry = Arc::new(ClientRegistry::new(strict));
    let router = Arc::new(Router::new(
        AdmissionGate::new("/ping_normal", Arc::clone(&normal_registry)),
        AdmissionGate::new("/ping_strict", Arc::clone(&strict_registry)),
    ));
    (router, normal_registry, strict_registry)
}

/// Starts the service on an ephemeral port. Returns the bound address and a
/// handle that shuts the server down when signalled.
pub async fn start_app(router: Arc<Router>) -> (SocketAddr, oneshot::Sender<()>) {
    let (tx, rx) = oneshot::channel::<()>();

    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        serve(listener, router, async {
            let _ = rx.await;
        })
        .await;
    });

    (addr, tx)
}

/// Sends a GET to `path` on the test server, optionally with an
/// `X-Forwarded-For` header.
pub async fn send_get(
    addr: SocketAddr,
    path: &str,
    forwarded_for: Option<&str>,
) -> Response<hyper::body::Incoming> {
    let client: Client<HttpConnector, Empty<Bytes>> =
        Client::builder(TokioExecutor::new()).build_http();

    let mut builder = Request::builder().uri(format!("http://{addr}{path}"));
    if let Some(xff) = forwarded_for {
        builder = builder.header("x-forwarded-for", xff);
    }
    let req = builder.body(Empty::new()).expect("request must build");

    client.request(req).await.expect("request failed")
}

/// Collects a response body into bytes.
pub async fn collect_body(resp: Response<hyper::body::Incoming>) -> Bytes {
    resp.into_body()
        .collect()
        .await
        .expect("failed to collect response body")
        .to_bytes()
}

/// Collects a response body and parses it as JSON.
pub async fn json_body(resp: Response<hyper::body::Incoming>) -> serde_json::Value {
    let bytes = collect_body(resp).await;
    serde_json::from_slice(&bytes).expect("body must be valid JSON")
}
