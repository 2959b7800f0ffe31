//! Configuration loading, validation, and runtime defaults.
//!
//! The service reads its YAML configuration at most once at startup; a
//! missing file falls back to built-in defaults. Validation happens in one
//! place (`Config::into_runtime`), so every other module works with values
//! that are already known to be sane.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{GateError, Result};

/// Default socket address the service binds to.
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// Default sustained rate for the normal endpoint, in tokens per second.
pub const DEFAULT_NORMAL_PER_SECOND: f64 = 5.0;

/// Default burst capacity for the normal endpoint.
pub const DEFAULT_NORMAL_BURST: u32 = 10;

/// Default sustained rate for the strict endpoint, in tokens per second.
pub const DEFAULT_STRICT_PER_SECOND: f64 = 1.0;

/// Default burst capacity for the strict endpoint.
pub const DEFAULT_STRICT_BURST: u32 = 2;

/// Default interval between eviction sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Default idle duration after which a client entry is evicted.
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(180);

/// Raw configuration as deserialized from the YAML file.
///
/// This struct maps directly to the on-disk schema. After loading, it is
/// transformed into a [`RuntimeConfig`] holding parsed addresses and
/// validated rate profiles.
#[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Socket address the service listens on (default `"127.0.0.1:8080"`).
    #[serde(default)]
    pub listen: Option<String>,
    /// Rate profile for `GET /ping_normal`.
    #[serde(default)]
    pub normal: Option<ProfileConfig>,
    /// Rate profile for `GET /ping_strict`.
    #[serde(default)]
    pub strict: Option<ProfileConfig>,
    /// Eviction sweep tuning.
    #[serde(default)]
    pub sweep: Option<SweepConfig>,
}

/// On-disk form of a single route's rate profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileConfig {
    /// Sustained tokens per second.
    pub per_second: f64,
    /// Maximum burst size.
    pub burst: u32,
}

/// Eviction sweep configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweepConfig {
    /// Interval between sweeps in milliseconds (default: 60000).
    #[serde(default = "default_sweep_interval_ms")]
    pub interval_ms: u64,
    /// Idle duration after which a client is evicted, in milliseconds
    /// (default: 180000).
    #[serde(default = "default_idle_threshold_ms")]
    pub idle_threshold_ms: u64,
}

fn default_sweep_interval_ms() -> u64 {
    DEFAULT_SWEEP_INTERVAL.as_millis() as u64
}

fn default_idle_threshold_ms() -> u64 {
    DEFAULT_IDLE_THRESHOLD.as_millis() as u64
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_sweep_interval_ms(),
            idle_threshold_ms: default_idle_threshold_ms(),
        }
    }
}

/// A validated `(rate, burst)` pair for one endpoint class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateProfile {
    /// Tokens added per second. Zero disables steady refill (burst-only).
    pub per_second: f64,
    /// Maximum burst size; also a new bucket's initial token count.
    pub burst: u32,
}

impl RateProfile {
    /// Validates a raw `(rate, burst)` pair.
    ///
    /// The rate must be finite and non-negative; the burst must be at least
    /// one, since a bucket that can never hold a whole token can never
    /// admit anything.
    pub fn validated(per_second: f64, burst: u32, route: &str) -> Result<Self> {
        if !per_second.is_finite() || per_second < 0.0 {
            return Err(GateError::Config(format!(
                "rate for {route} must be finite and non-negative, got {per_second}"
            )));
        }
        if burst == 0 {
            return Err(GateError::Config(format!(
                "burst for {route} must be at least 1"
            )));
        }
        Ok(Self { per_second, burst })
    }
}

/// Fully validated, ready-to-use configuration.
///
/// Created once at startup; every value the service needs at runtime is
/// parsed here, never on the request path.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Socket address the service binds to.
    pub listen: SocketAddr,
    /// Rate profile for the normal endpoint.
    pub normal: RateProfile,
    /// Rate profile for the strict endpoint.
    pub strict: RateProfile,
    /// Interval between eviction sweeps.
    pub sweep_interval: Duration,
    /// Idle duration after which a client entry is evicted.
    pub idle_threshold: Duration,
}

impl Config {
    /// Loads configuration from a YAML file at the given path.
    ///
    /// Returns a [`GateError::Config`] if the file cannot be opened or its
    /// contents fail YAML deserialization.
    pub fn load_from_file(file_path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let file = std::fs::File::open(file_path).map_err(|e| {
            GateError::Config(format!(
                "failed to open {}: {e}",
                file_path.as_ref().display()
            ))
        })?;

        serde_yaml::from_reader(file)
            .map_err(|e| GateError::Config(format!("failed to parse config: {e}")))
    }

    /// Validates all fields, producing a [`RuntimeConfig`].
    pub fn into_runtime(self) -> Result<RuntimeConfig> {
        let listen_str = self.listen.as_deref().unwrap_or(DEFAULT_LISTEN_ADDR);
        let listen = listen_str.parse::<SocketAddr>().map_err(|e| {
            GateError::Config(format!("invalid listen address \"{listen_str}\": {e}"))
        })?;

        let normal = match self.normal {
            Some(p) => RateProfile::validated(p.per_second, p.burst, "normal")?,
            None => RateProfile {
                per_second: DEFAULT_NORMAL_PER_SECOND,
                burst: DEFAULT_NORMAL_BURST,
            },
        };

        let strict = match self.strict {
            Some(p) => RateProfile::validated(p.per_second, p.burst, "strict")?,
            None => RateProfile {
                per_second: DEFAULT_STRICT_PER_SECOND,
                burst: DEFAULT_STRICT_BURST,
            },
        };

        let sweep = self.sweep.unwrap_or_default();
        if sweep.interval_ms == 0 {
            return Err(GateError::Config("sweep interval must be positive".into()));
        }

        Ok(RuntimeConfig {
            listen,
            normal,
            strict,
            sweep_interval: Duration::from_millis(sweep.interval_ms),
            idle_threshold: Duration::from_millis(sweep.idle_threshold_ms),
        })
    }
}
