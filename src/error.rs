//! Error types and HTTP status code mapping.

use std::fmt;

use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};

use crate::routes::ApiBody;

/// Every failure the service can produce, each mapping to a specific HTTP
/// status and JSON body.
#[derive(Debug)]
pub enum GateError {
    /// The configuration file could not be loaded or validated.
    Config(String),
    /// The client's network address could not be parsed into an IP.
    ClientAddr(String),
    /// The client exhausted its request budget.
    RateLimited,
    /// No route matches the requested method and path.
    NotFound(String),
    /// An internal error that does not fit other categories.
    Internal(String),
}

impl fmt::Display for GateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::ClientAddr(msg) => write!(f, "unable to parse client address: {msg}"),
            Self::RateLimited => write!(f, "rate limit exceeded"),
            Self::NotFound(path) => write!(f, "no route for {path}"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for GateError {}

impl GateError {
    /// Returns the HTTP status code corresponding to this error variant.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Config(_) | Self::ClientAddr(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Converts this error into an HTTP response with a JSON body.
    ///
    /// A rejected request gets the throttling envelope; everything else uses
    /// the generic error envelope. The address-parse message is fixed, since
    /// clients match on it.
    pub fn into_response(self) -> Response<ApiBody> {
        let status = self.status_code();
        let body = match &self {
            Self::RateLimited => serde_json::json!({
                "status": "Request Failed",
                "body": "The API is at capacity, try again later.",
            }),
            Self::ClientAddr(_) => serde_json::json!({
                "status": "error",
                "message": "Unable to parse IP address",
            }),
            Self::Config(_) | Self::NotFound(_) | Self::Internal(_) => serde_json::json!({
                "status": "error",
                "message": self.to_string(),
            }),
        };

        Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from(body.to_string())))
            .unwrap_or_else(|_| {
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Full::new(Bytes::new()))
                    .expect("building fallback response must not fail")
            })
    }
}
