use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

/// Read a profiled env var: tries {PROFILE}_{KEY} first, falls back to {KEY}.
fn profiled_env_opt(profile: &str, key: &str) -> Option<String> {
    if !profile.is_empty() {
        let prefixed = format!("{}_{}", profile, key);
        if let Some(v) = env_opt(&prefixed) {
            return Some(v);
        }
    }
    env_opt(key)
}

fn profiled_env_or(profile: &str, key: &str, default: &str) -> String {
    profiled_env_opt(profile, key).unwrap_or_else(|| default.to_string())
}

fn profiled_env_u16(profile: &str, key: &str, default: u16) -> u16 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(profile: &str, key: &str, default: u64) -> u64 {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_usize(profile: &str, key: &str, default: usize) -> usize {
    profiled_env_opt(profile, key)
        .and_then(|v| v.parse().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Active profile name (empty = default).
    pub profile: String,
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Build config from environment variables (call `load_dotenv()` first).
    /// Profile is read from `STRIDER_PROFILE` env var. When set (e.g. `DOCKER`),
    /// every key is first looked up as `{PROFILE}_{KEY}`, falling back to `{KEY}`.
    pub fn from_env() -> Self {
        let profile = env_or("STRIDER_PROFILE", "").to_uppercase();
        Self::for_profile(&profile)
    }

    /// Build config for a specific named profile (empty string = default).
    pub fn for_profile(profile: &str) -> Self {
        let p = profile.to_uppercase();
        let p = p.as_str();
        Self {
            profile: p.to_string(),
            server: ServerConfig::from_env_profiled(p),
            upstream: UpstreamConfig::from_env_profiled(p),
            telemetry: TelemetryConfig::from_env_profiled(p),
        }
    }

    pub fn profile_label(&self) -> &str {
        if self.profile.is_empty() { "default" } else { &self.profile }
    }

    /// Print a summary for startup logs.
    pub fn log_summary(&self) {
        tracing::info!("Config loaded (profile: {}):", self.profile_label());
        tracing::info!("  server:    {}:{} (cors={})", self.server.host, self.server.port, self.server.cors_origin);
        tracing::info!(
            "  upstream:  {} (retry={}ms, read_buffer={}B, write_timeout={}ms)",
            self.upstream.address(),
            self.upstream.retry_delay_ms,
            self.upstream.read_buffer_bytes,
            self.upstream.write_timeout_ms
        );
        tracing::info!("  telemetry: metrics_log_interval={}s", self.telemetry.metrics_log_interval_secs);
    }

    /// Return a view safe for API responses.
    pub fn redacted_summary(&self) -> serde_json::Value {
        serde_json::json!({
            "profile": self.profile_label(),
            "server": { "host": self.server.host, "port": self.server.port },
            "upstream": {
                "address": self.upstream.address(),
                "retry_delay_ms": self.upstream.retry_delay_ms,
                "write_timeout_ms": self.upstream.write_timeout_ms,
            },
        })
    }
}

// ── Server ────────────────────────────────────────────────────

/// Observer-facing listener (HTTP + WebSocket).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origin: String,
}

impl ServerConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "HOST", "0.0.0.0"),
            port: profiled_env_u16(p, "PORT", 3001),
            cors_origin: profiled_env_or(p, "CORS_ORIGIN", "*"),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ── Upstream (scheduler control socket) ───────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub host: String,
    pub port: u16,
    /// Fixed delay between a disconnect and the next connect attempt.
    pub retry_delay_ms: u64,
    /// Size of each read from the upstream socket.
    pub read_buffer_bytes: usize,
    /// Upper bound on one command write; a stalled peer is dropped after it.
    pub write_timeout_ms: u64,
}

impl UpstreamConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            host: profiled_env_or(p, "UPSTREAM_HOST", "127.0.0.1"),
            port: profiled_env_u16(p, "UPSTREAM_PORT", 8081),
            retry_delay_ms: profiled_env_u64(p, "UPSTREAM_RETRY_MS", 1000),
            read_buffer_bytes: profiled_env_usize(p, "UPSTREAM_READ_BUFFER", 8192),
            write_timeout_ms: profiled_env_opt(p, "UPSTREAM_WRITE_TIMEOUT_MS")
                .and_then(|v| v.parse().ok())
                .filter(|v: &u64| *v > 0)
                .unwrap_or(5000),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms.max(1))
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8081,
            retry_delay_ms: 1000,
            read_buffer_bytes: 8192,
            write_timeout_ms: 5000,
        }
    }
}

// ── Telemetry ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Seconds between relay metrics log lines (0 = disabled).
    pub metrics_log_interval_secs: u64,
}

impl TelemetryConfig {
    fn from_env_profiled(p: &str) -> Self {
        Self {
            metrics_log_interval_secs: profiled_env_u64(p, "METRICS_LOG_INTERVAL_SECS", 30),
        }
    }
}
