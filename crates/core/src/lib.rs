pub mod config;

pub use config::{Config, ServerConfig, TelemetryConfig, UpstreamConfig};
