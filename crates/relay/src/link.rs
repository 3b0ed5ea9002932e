//! Upstream link state machine.
//!
//! ```text
//! Disconnected --Dial--> Connecting --Established--> Connected
//!      ^                     |                           |
//!      +--------Lost---------+-----------Lost------------+
//! ```
//!
//! There is no terminal state; the manager cycles until shutdown.

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// A connect attempt starts (process start or retry delay elapsed).
    Dial,
    /// The connect attempt succeeded.
    Established,
    /// Connect failure, read/write error or peer close.
    Lost,
}

impl LinkState {
    /// Next state for `event`, or `None` if the event does not apply here.
    pub fn on(self, event: LinkEvent) -> Option<LinkState> {
        match (self, event) {
            (LinkState::Disconnected, LinkEvent::Dial) => Some(LinkState::Connecting),
            (LinkState::Connecting, LinkEvent::Established) => Some(LinkState::Connected),
            (LinkState::Connecting, LinkEvent::Lost) | (LinkState::Connected, LinkEvent::Lost) => {
                Some(LinkState::Disconnected)
            }
            _ => None,
        }
    }

    pub fn is_connected(self) -> bool {
        self == LinkState::Connected
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
        }
    }
}

impl fmt::Display for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
