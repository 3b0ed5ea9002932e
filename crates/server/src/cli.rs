//! Command-line overrides layered on top of the environment config.

use clap::Parser;

use strider_core::Config;

/// Bridge between the scheduler's telemetry socket and browser observers.
#[derive(Parser, Debug)]
#[command(name = "strider", version, about)]
pub struct Cli {
    /// Config profile; keys are read as `{PROFILE}_{KEY}` before `{KEY}`.
    #[arg(long, env = "STRIDER_PROFILE")]
    pub profile: Option<String>,

    /// Observer listener host.
    #[arg(long)]
    pub host: Option<String>,

    /// Observer listener port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Scheduler host.
    #[arg(long)]
    pub upstream_host: Option<String>,

    /// Scheduler control port.
    #[arg(long)]
    pub upstream_port: Option<u16>,

    /// Delay in milliseconds between upstream reconnect attempts.
    #[arg(long)]
    pub retry_ms: Option<u64>,

    /// Seconds between metrics log lines (0 = disabled).
    #[arg(long)]
    pub metrics_interval: Option<u64>,
}

impl Cli {
    /// Load the environment config for the selected profile and apply flags.
    pub fn into_config(self) -> Config {
        let config = match self.profile.as_deref() {
            Some(profile) => Config::for_profile(profile),
            None => Config::from_env(),
        };
        self.apply(config)
    }

    fn apply(self, mut config: Config) -> Config {
        if let Some(host) = self.host {
            config.server.host = host;
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(host) = self.upstream_host {
            config.upstream.host = host;
        }
        if let Some(port) = self.upstream_port {
            config.upstream.port = port;
        }
        if let Some(ms) = self.retry_ms {
            config.upstream.retry_delay_ms = ms;
        }
        if let Some(secs) = self.metrics_interval {
            config.telemetry.metrics_log_interval_secs = secs;
        }
        config
    }
}
