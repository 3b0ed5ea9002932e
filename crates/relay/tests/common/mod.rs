//! Shared harness: an in-memory upstream the tests script connection by
//! connection.

#![allow(dead_code)]

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::DuplexStream;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use strider_core::UpstreamConfig;
use strider_relay::{
    Connector, Frame, LinkState, Relay, RelayError, Subscription, UpstreamReader, UpstreamWriter,
};

pub const TIMEOUT: Duration = Duration::from_secs(5);
pub const SETTLE: Duration = Duration::from_millis(100);
pub const WRITE_TIMEOUT_MS: u64 = 200;

/// Hands out queued in-memory streams; refuses when the queue is empty.
pub struct ScriptedConnector {
    queue: Mutex<mpsc::UnboundedReceiver<DuplexStream>>,
    attempts: AtomicUsize,
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(&self) -> Result<(UpstreamReader, UpstreamWriter), RelayError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.queue.lock().await.try_recv() {
            Ok(stream) => {
                let (reader, writer) = tokio::io::split(stream);
                Ok((Box::new(reader), Box::new(writer)))
            }
            Err(_) => Err(RelayError::Connect {
                addr: self.describe(),
                source: io::Error::from(io::ErrorKind::ConnectionRefused),
            }),
        }
    }

    fn describe(&self) -> String {
        "scripted".to_string()
    }
}

/// Test side of the scripted upstream.
pub struct Upstream {
    streams: mpsc::UnboundedSender<DuplexStream>,
    connector: Arc<ScriptedConnector>,
}

impl Upstream {
    /// Queue one connection and return the scheduler's end of it.
    pub fn accept_next(&self) -> DuplexStream {
        self.accept_next_with_capacity(64 * 1024)
    }

    /// Like [`Upstream::accept_next`], but each direction buffers at most
    /// `capacity` bytes before writes block.
    pub fn accept_next_with_capacity(&self, capacity: usize) -> DuplexStream {
        let (relay_end, scheduler_end) = tokio::io::duplex(capacity);
        self.streams.send(relay_end).unwrap();
        scheduler_end
    }

    pub fn attempts(&self) -> usize {
        self.connector.attempts.load(Ordering::SeqCst)
    }
}

pub struct Harness {
    pub relay: Relay,
    pub upstream: Upstream,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

pub fn config(retry_ms: u64) -> UpstreamConfig {
    UpstreamConfig {
        host: "scripted".to_string(),
        port: 0,
        retry_delay_ms: retry_ms,
        read_buffer_bytes: 8192,
        write_timeout_ms: WRITE_TIMEOUT_MS,
    }
}

impl Harness {
    /// Relay over the scripted upstream, not yet started.
    pub fn new(retry_ms: u64) -> Self {
        let (streams, queue) = mpsc::unbounded_channel();
        let connector = Arc::new(ScriptedConnector {
            queue: Mutex::new(queue),
            attempts: AtomicUsize::new(0),
        });
        let relay = Relay::with_connector(connector.clone(), &config(retry_ms));
        let (shutdown, _) = watch::channel(false);
        Self {
            relay,
            upstream: Upstream { streams, connector },
            shutdown,
            task: None,
        }
    }

    pub fn start(&mut self) {
        self.task = Some(self.relay.spawn(self.shutdown.subscribe()));
    }

    pub fn subscribe(&self) -> (Subscription, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.relay.subscribe(tx), rx)
    }

    pub async fn wait_for_state(&self, target: LinkState) {
        wait_for_state(&self.relay, target).await;
    }

    pub async fn stop(mut self) {
        self.shutdown.send_replace(true);
        if let Some(task) = self.task.take() {
            timeout(TIMEOUT, task)
                .await
                .expect("relay did not stop")
                .unwrap();
        }
    }
}

pub async fn wait_for_state(relay: &Relay, target: LinkState) {
    let mut rx = relay.watch_state();
    timeout(TIMEOUT, rx.wait_for(|s| *s == target))
        .await
        .expect("timed out waiting for link state")
        .unwrap();
}

pub async fn next_text(rx: &mut mpsc::UnboundedReceiver<Frame>) -> String {
    let frame = timeout(TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for frame")
        .expect("subscriber channel closed");
    frame.as_str().expect("frame is not UTF-8").to_string()
}

/// Assert nothing further arrives within the settle window.
pub async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<Frame>) {
    tokio::time::sleep(SETTLE).await;
    if let Ok(frame) = rx.try_recv() {
        panic!("unexpected frame: {frame:?}");
    }
}
