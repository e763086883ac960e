//! # Mesh Telemetry
//!
//! Observability for mesh node processes.
//!
//! ## Components
//!
//! - **Logs**: `tracing-subscriber` with `EnvFilter`, JSON or pretty output
//! - **Metrics**: Prometheus default registry, exported as text
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mesh_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::for_node("node-1");
//! init_logging(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `MESH_SERVICE_NAME` | `mesh-node` | Service name in logs |
//! | `MESH_LOG_LEVEL` | `info` | Log level filter |
//! | `MESH_JSON_LOGS` | `false` | JSON log output |

mod config;
mod logging;
mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    gather_metrics, record_health, HealthGauges, ACTIVE_BANS, ACTIVE_MEMBERS, LIVE_PEERS,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to install tracing subscriber: {0}")]
    SubscriberInit(String),

    #[error("Failed to export Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
