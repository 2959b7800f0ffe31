//! The request-facing admission decision.
//!
//! Extracts a client identifier from the request and charges that client's
//! token bucket. Extraction prefers the leftmost `X-Forwarded-For` entry so
//! that deployments behind a proxy attribute requests to the originating
//! client rather than to the proxy; direct deployments fall back to the
//! peer socket address.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use hyper::header::HeaderMap;
use tracing::debug;

use crate::registry::ClientRegistry;
use crate::{GateError, Result};

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A token was available and consumed; forward the request.
    Admit,
    /// The client's budget is exhausted; reject with 429.
    Deny,
}

/// Per-route admission control over a shared client registry.
///
/// The registry handle is injected at construction and shared with the
/// eviction sweeper; the gate itself is stateless per call.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    route: &'static str,
    registry: Arc<ClientRegistry>,
}

impl AdmissionGate {
    /// Creates a gate for `route` backed by `registry`.
    pub fn new(route: &'static str, registry: Arc<ClientRegistry>) -> Self {
        Self { route, registry }
    }

    /// The registry backing this gate, for wiring up the sweeper.
    pub fn registry(&self) -> Arc<ClientRegistry> {
        Arc::clone(&self.registry)
    }

    /// Decides whether the request described by `headers` and `remote_addr`
    /// may proceed.
    ///
    /// The client's `last_seen` stamp is refreshed on every call that
    /// yields an identifier, admitted or denied. An unparseable forwarded
    /// address is an error rather than a denial: it never charges a bucket
    /// and never creates registry state.
    pub fn check(&self, headers: &HeaderMap, remote_addr: SocketAddr) -> Result<Verdict> {
        let identifier = client_identifier(headers, remote_addr)?;

        if self.registry.admit(&identifier) {
            Ok(Verdict::Admit)
        } else {
            debug!(route = self.route, client = %identifier, "rate limit exceeded");
            Ok(Verdict::Deny)
        }
    }
}

/// Resolves the client identifier for a request.
///
/// The leftmost `X-Forwarded-For` entry wins when present, in either bare-IP
/// or `host:port` form. A malformed entry is reported rather than silently
/// replaced with the peer address, since attributing proxied traffic to the
/// proxy would collapse all of its clients into one bucket.
fn client_identifier(headers: &HeaderMap, remote_addr: SocketAddr) -> Result<String> {
    let Some(forwarded) = headers.get("x-forwarded-for") else {
        return Ok(remote_addr.ip().to_string());
    };

    let first = forwarded
        .to_str()
        .map_err(|e| GateError::ClientAddr(e.to_string()))?
        .split(',')
        .next()
        .unwrap_or_default()
        .trim();

    if let Ok(ip) = first.parse::<IpAddr>() {
        return Ok(ip.to_string());
    }

    first
        .parse::<SocketAddr>()
        .map(|addr| addr.ip().to_string())
        .map_err(|e| GateError::ClientAddr(format!("{first:?}: {e}")))
}
