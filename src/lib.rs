//!
//! A small HTTP service fronted by per-client token-bucket admission
//! control, built on [Hyper].
//!
//! Every inbound request is attributed to a client identifier (its IP
//! address), which indexes a lazily created token bucket. Buckets refill
//! continuously; a request that finds no token is rejected with 429 rather
//! than queued. A background sweep evicts clients that have gone idle, so
//! the registry stays bounded under churn of distinct clients. Each
//! protected route owns its own registry, giving a client fully
//! independent budgets per endpoint class.
//!
//! [Hyper]: https://hyper.rs/

pub mod bucket;
pub mod config;
pub mod error;
pub mod gate;
pub mod registry;
pub mod routes;
pub mod server;

pub use bucket::TokenBucket;
pub use config::{Config, ProfileConfig, RateProfile, RuntimeConfig, SweepConfig};
pub use error::GateError;
pub use gate::{AdmissionGate, Verdict};
pub use registry::{ClientEntry, ClientRegistry};
pub use routes::{ApiBody, Router};
pub use server::{serve, shutdown_signal, spawn_sweeper};

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GateError>;
