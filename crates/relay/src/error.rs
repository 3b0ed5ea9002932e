use thiserror::Error;

use crate::command::CommandError;

/// Errors surfaced by the relay to its callers.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream not connected")]
    NoUpstream,

    #[error("invalid command: {0}")]
    InvalidCommand(#[from] CommandError),

    #[error("upstream write failed: {0}")]
    UpstreamWrite(#[source] std::io::Error),

    #[error("failed to connect to upstream {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
