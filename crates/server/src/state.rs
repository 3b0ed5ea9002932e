use tokio::sync::watch;

use strider_core::Config;
use strider_relay::Relay;

/// Shared handler state.
pub struct AppState {
    pub relay: Relay,
    pub config: Config,
    /// Flips to true once a shutdown signal arrives; WebSocket sessions
    /// watch it so the listener can drain.
    pub shutdown: watch::Receiver<bool>,
}
