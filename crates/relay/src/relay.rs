//! Top-level handle tying the upstream link, validator and subscriber set
//! together. Cheap to clone; every clone drives the same relay.

use std::sync::Arc;

use serde::Serialize;
use strider_core::UpstreamConfig;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::command::Command;
use crate::dispatch::Dispatcher;
use crate::error::RelayError;
use crate::fanout::{FrameSink, SubscriberRegistry, Subscription};
use crate::link::LinkState;
use crate::metrics::{MetricsSnapshot, RelayMetrics};
use crate::upstream::{Connector, FrameHandler, TcpConnector, UpstreamManager};

/// JSON body of `GET /api/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelayStatus {
    pub connected: bool,
    pub state: LinkState,
}

#[derive(Clone)]
pub struct Relay {
    upstream: Arc<UpstreamManager>,
    subscribers: Arc<SubscriberRegistry>,
    metrics: Arc<RelayMetrics>,
}

impl Relay {
    /// Relay dialing the configured TCP address.
    pub fn new(config: &UpstreamConfig) -> Self {
        Self::with_connector(Arc::new(TcpConnector::new(config.address())), config)
    }

    pub fn with_connector(connector: Arc<dyn Connector>, config: &UpstreamConfig) -> Self {
        let metrics = Arc::new(RelayMetrics::new());
        Self {
            upstream: Arc::new(UpstreamManager::new(connector, config, metrics.clone())),
            subscribers: Arc::new(SubscriberRegistry::new()),
            metrics,
        }
    }

    /// Start the upstream loop. It stops once `shutdown` turns true.
    pub fn spawn(&self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        let upstream = self.upstream.clone();
        let handler: Arc<dyn FrameHandler> =
            Arc::new(Dispatcher::new(self.subscribers.clone(), self.metrics.clone()));
        tokio::spawn(async move { upstream.run(handler, shutdown).await })
    }

    /// Register an observer. It receives every valid frame broadcast after
    /// this call until the returned guard is dropped.
    pub fn subscribe(&self, sink: impl FrameSink + 'static) -> Subscription {
        self.subscribers.subscribe(sink)
    }

    pub async fn send_command(&self, command: &Command) -> Result<(), RelayError> {
        self.upstream.send_command(command).await
    }

    pub fn status(&self) -> RelayStatus {
        let state = self.upstream.state();
        RelayStatus {
            connected: state.is_connected(),
            state,
        }
    }

    pub fn watch_state(&self) -> watch::Receiver<LinkState> {
        self.upstream.watch_state()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(self.subscribers.len())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn upstream_address(&self) -> String {
        self.upstream.describe()
    }

    /// One summary line for the periodic reporter.
    pub fn log_metrics(&self) {
        let snap = self.metrics();
        tracing::info!(
            state = %self.upstream.state(),
            subscribers = snap.subscribers,
            forwarded = snap.frames_forwarded,
            rejected = snap.frames_rejected,
            connects = snap.connects,
            connect_failures = snap.connect_failures,
            commands_sent = snap.commands_sent,
            "relay metrics"
        );
        for (kind, count) in &snap.frame_kinds {
            tracing::debug!(kind = %kind, count = count, "frame kind stats");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_relay_starts_disconnected() {
        let relay = Relay::new(&UpstreamConfig::default());
        assert_eq!(
            relay.status(),
            RelayStatus {
                connected: false,
                state: LinkState::Disconnected
            }
        );
        assert_eq!(relay.upstream_address(), "127.0.0.1:8081");
        assert_eq!(relay.subscriber_count(), 0);
    }

    #[test]
    fn status_serializes() {
        let status = RelayStatus {
            connected: true,
            state: LinkState::Connected,
        };
        assert_eq!(
            serde_json::to_value(status).unwrap(),
            serde_json::json!({"connected": true, "state": "connected"})
        );
    }

    #[test]
    fn clones_share_subscribers() {
        let relay = Relay::new(&UpstreamConfig::default());
        let other = relay.clone();
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let sub = relay.subscribe(tx);
        assert_eq!(other.subscriber_count(), 1);
        drop(sub);
        assert_eq!(other.subscriber_count(), 0);
    }
}
