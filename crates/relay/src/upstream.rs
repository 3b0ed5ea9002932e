//! The single upstream connection and its reconnect loop.
//!
//! [`UpstreamManager::run`] owns the read side of the connection: it dials,
//! pumps bytes through a fresh [`FrameDecoder`] into a [`FrameHandler`], and
//! after any close or error waits a fixed delay before dialing again. The
//! write side is parked in a session slot that [`UpstreamManager::send_command`]
//! borrows, so commands are only accepted while a connection is live.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use strider_core::UpstreamConfig;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{watch, Mutex, Notify};

use crate::command::Command;
use crate::error::RelayError;
use crate::frame::{Frame, FrameDecoder};
use crate::link::{LinkEvent, LinkState};
use crate::metrics::RelayMetrics;

pub type UpstreamReader = Box<dyn AsyncRead + Send + Unpin>;
pub type UpstreamWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Opens one upstream connection, split into independent halves.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<(UpstreamReader, UpstreamWriter), RelayError>;

    /// Human-readable target for log lines.
    fn describe(&self) -> String;
}

/// Plain TCP to `host:port`.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self) -> Result<(UpstreamReader, UpstreamWriter), RelayError> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| RelayError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        // Commands are tiny and latency-sensitive.
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok((Box::new(reader), Box::new(writer)))
    }

    fn describe(&self) -> String {
        self.addr.clone()
    }
}

/// Receives every complete frame, in arrival order, from the read loop.
///
/// Called inline on the read task; implementations must not block.
pub trait FrameHandler: Send + Sync {
    fn on_frame(&self, frame: Frame);
}

/// Write half of the live connection.
struct Session {
    writer: UpstreamWriter,
    /// Fired when a command write fails so the read loop tears down too.
    lost: Arc<Notify>,
}

/// Why a connection ended.
enum SessionEnd {
    Closed { discarded: usize },
    ReadFailed(io::Error),
    WriteFailed,
    Shutdown,
}

pub struct UpstreamManager {
    connector: Arc<dyn Connector>,
    retry_delay: Duration,
    read_buffer: usize,
    write_timeout: Duration,
    session: Mutex<Option<Session>>,
    state: watch::Sender<LinkState>,
    metrics: Arc<RelayMetrics>,
}

impl UpstreamManager {
    pub fn new(connector: Arc<dyn Connector>, config: &UpstreamConfig, metrics: Arc<RelayMetrics>) -> Self {
        let (state, _) = watch::channel(LinkState::default());
        Self {
            connector,
            retry_delay: config.retry_delay(),
            read_buffer: config.read_buffer_bytes.max(1),
            write_timeout: config.write_timeout(),
            session: Mutex::new(None),
            state,
            metrics,
        }
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Observe link transitions.
    pub fn watch_state(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    pub fn describe(&self) -> String {
        self.connector.describe()
    }

    fn advance(&self, event: LinkEvent) -> LinkState {
        let mut current = LinkState::default();
        self.state.send_if_modified(|state| match state.on(event) {
            Some(next) => {
                tracing::debug!(from = %state, to = %next, "upstream link state");
                *state = next;
                current = next;
                true
            }
            None => {
                current = *state;
                false
            }
        });
        current
    }

    /// Write `command` upstream as one line.
    ///
    /// Fails with [`RelayError::NoUpstream`] when no connection is live. A
    /// write that fails or does not finish within the write timeout tears
    /// the connection down and schedules a reconnect.
    pub async fn send_command(&self, command: &Command) -> Result<(), RelayError> {
        let mut slot = self.session.lock().await;
        let Some(session) = slot.as_mut() else {
            self.metrics.record_command(false);
            return Err(RelayError::NoUpstream);
        };

        match write_line(&mut session.writer, &command.to_line(), self.write_timeout).await {
            Ok(()) => {
                self.metrics.record_command(true);
                tracing::info!(command = %command, "command forwarded upstream");
                Ok(())
            }
            Err(e) => {
                self.metrics.record_command(false);
                tracing::warn!(error = %e, command = %command, "upstream write failed");
                if let Some(session) = slot.take() {
                    session.lost.notify_one();
                }
                Err(RelayError::UpstreamWrite(e))
            }
        }
    }

    /// Connect, read, reconnect, until `shutdown` turns true.
    pub async fn run(&self, handler: Arc<dyn FrameHandler>, mut shutdown: watch::Receiver<bool>) {
        let target = self.connector.describe();
        tracing::info!(upstream = %target, retry_ms = self.retry_delay.as_millis() as u64, "upstream manager started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.advance(LinkEvent::Dial);
            self.metrics.record_connect_attempt();

            let connected = tokio::select! {
                result = self.connector.connect() => result,
                _ = shutdown_requested(&mut shutdown) => break,
            };

            match connected {
                Ok((reader, writer)) => {
                    let lost = Arc::new(Notify::new());
                    *self.session.lock().await = Some(Session {
                        writer,
                        lost: lost.clone(),
                    });
                    self.advance(LinkEvent::Established);
                    self.metrics.record_connected();
                    tracing::info!(upstream = %target, "connected to upstream");

                    let end = tokio::select! {
                        end = self.pump(reader, handler.as_ref()) => end,
                        _ = lost.notified() => SessionEnd::WriteFailed,
                        _ = shutdown_requested(&mut shutdown) => SessionEnd::Shutdown,
                    };

                    self.session.lock().await.take();
                    self.advance(LinkEvent::Lost);

                    match end {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Closed { discarded } => {
                            tracing::warn!(upstream = %target, discarded_bytes = discarded, "upstream closed the connection");
                        }
                        SessionEnd::ReadFailed(e) => {
                            tracing::warn!(upstream = %target, error = %e, "upstream read failed");
                        }
                        SessionEnd::WriteFailed => {
                            tracing::warn!(upstream = %target, "upstream dropped after failed command write");
                        }
                    }
                    self.metrics.record_disconnect();
                }
                Err(e) => {
                    self.advance(LinkEvent::Lost);
                    self.metrics.record_connect_failure();
                    tracing::warn!(error = %e, "upstream connect failed");
                }
            }

            tracing::info!(delay_ms = self.retry_delay.as_millis() as u64, "reconnecting to upstream after delay");
            tokio::select! {
                _ = tokio::time::sleep(self.retry_delay) => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }

        self.session.lock().await.take();
        self.advance(LinkEvent::Lost);
        tracing::info!(upstream = %target, "upstream manager stopped");
    }

    /// Read until EOF or error, handing each completed frame to `handler`.
    async fn pump(&self, mut reader: UpstreamReader, handler: &dyn FrameHandler) -> SessionEnd {
        // Each connection starts with an empty pending buffer.
        let mut decoder = FrameDecoder::new();
        let mut chunk = vec![0u8; self.read_buffer];
        loop {
            match reader.read(&mut chunk).await {
                Ok(0) => {
                    return SessionEnd::Closed {
                        discarded: decoder.pending_len(),
                    }
                }
                Ok(n) => {
                    for frame in decoder.feed(&chunk[..n]) {
                        handler.on_frame(frame);
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return SessionEnd::ReadFailed(e),
            }
        }
    }
}

async fn write_line(writer: &mut UpstreamWriter, line: &[u8], limit: Duration) -> io::Result<()> {
    // One write_all per command: the scheduler reads a command per recv.
    let write = async {
        writer.write_all(line).await?;
        writer.flush().await
    };
    match tokio::time::timeout(limit, write).await {
        Ok(result) => result,
        Err(_) => Err(io::Error::new(io::ErrorKind::TimedOut, "upstream write timed out")),
    }
}

/// Resolves once the flag turns true. Never resolves if the sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    if shutdown.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
