//! Telemetry: logging setup and engine counters

pub mod logging;
pub mod metrics;

pub use logging::{init_logging, LogConfig};
pub use metrics::{Counter, EngineStats, MetricsRegistry};
