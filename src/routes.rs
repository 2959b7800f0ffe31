//! Request routing and endpoint handlers.
//!
//! The pipeline is deliberately small: one admission check per protected
//! route, then a canned JSON body. Verdicts are mapped to responses here;
//! the gates themselves never build HTTP.
//!
//! Every inbound request is assigned a monotonically increasing request ID
//! and handled inside a [`tracing::Span`] carrying structured fields for
//! observability.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Request, Response, StatusCode};
use tracing::info;

use crate::gate::{AdmissionGate, Verdict};
use crate::{GateError, Result};

/// Response body type used by every handler.
///
/// All bodies are locally constructed JSON, so the infallible fixed-buffer
/// body is enough; nothing in the service streams.
pub type ApiBody = Full<Bytes>;

/// Global monotonic counter for assigning unique request IDs.
static REQUEST_ID: AtomicU64 = AtomicU64::new(1);

/// The two protected endpoints and their admission gates.
#[derive(Debug, Clone)]
pub struct Router {
    normal: AdmissionGate,
    strict: AdmissionGate,
}

impl Router {
    /// Builds the route table from the two per-endpoint gates.
    pub fn new(normal: AdmissionGate, strict: AdmissionGate) -> Self {
        Self { normal, strict }
    }

    /// Processes a single inbound request.
    ///
    /// Protected routes run the admission check before anything else; a
    /// denied verdict is returned as [`GateError::RateLimited`] so the
    /// caller maps it to a response exactly like any other failure. The
    /// whole pipeline is synchronous in-memory work; nothing here blocks.
    pub fn handle<B>(&self, req: &Request<B>, client_addr: SocketAddr) -> Result<Response<ApiBody>> {
        let request_id = REQUEST_ID.fetch_add(1, Ordering::Relaxed);
        let span = tracing::info_span!(
            "request",
            id = request_id,
            method = %req.method(),
            path = req.uri().path(),
            client = %client_addr,
        );
        let _guard = span.enter();

        if req.method() != Method::GET {
            return Err(GateError::NotFound(req.uri().path().to_owned()));
        }

        let (gate, body) = match req.uri().path() {
            "/ping_normal" => (&self.normal, "You have accessed the normal endpoint!"),
            "/ping_strict" => (&self.strict, "You have accessed the strict endpoint!"),
            path => return Err(GateError::NotFound(path.to_owned())),
        };

        match gate.check(req.headers(), client_addr)? {
            Verdict::Admit => {
                info!("request admitted");
                Ok(success_response(body))
            }
            Verdict::Deny => Err(GateError::RateLimited),
        }
    }
}

/// Builds the 200 envelope shared by both endpoints.
fn success_response(body: &str) -> Response<ApiBody> {
    let payload = serde_json::json!({
        "status": "Successful",
        "body": body,
    });

    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", "application/json")
        .body(Full::new(Bytes::from(payload.to_string())))
        .unwrap_or_else(|_| {
            Response::builder()
                .status(StatusCode::INTERNAL_SERVER_ERROR)
                .body(Full::new(Bytes::new()))
                .expect("building fallback response must not fail")
        })
}
