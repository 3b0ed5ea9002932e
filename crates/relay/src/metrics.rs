//! Relay counters.
//!
//! Plain atomics bumped from the hot path, plus a small per-`type` table.
//! Exposed as a serializable snapshot over HTTP and as a periodic log line.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use serde::Serialize;

/// Record kind used when a valid frame has no string `type` field.
const UNTYPED: &str = "untyped";

#[derive(Debug)]
pub struct RelayMetrics {
    started: Instant,
    /// Valid frames handed to the subscriber set.
    pub frames_forwarded: AtomicU64,
    /// Frames that failed validation.
    pub frames_rejected: AtomicU64,
    /// Empty or whitespace-only lines.
    pub frames_blank: AtomicU64,
    /// Payload bytes of forwarded frames (newline excluded).
    pub bytes_forwarded: AtomicU64,
    pub connect_attempts: AtomicU64,
    pub connects: AtomicU64,
    pub connect_failures: AtomicU64,
    pub disconnects: AtomicU64,
    pub commands_sent: AtomicU64,
    pub commands_failed: AtomicU64,
    /// Forwarded frames keyed by their `type` field.
    frame_kinds: Mutex<HashMap<String, u64>>,
}

impl Default for RelayMetrics {
    fn default() -> Self {
        Self {
            started: Instant::now(),
            frames_forwarded: AtomicU64::new(0),
            frames_rejected: AtomicU64::new(0),
            frames_blank: AtomicU64::new(0),
            bytes_forwarded: AtomicU64::new(0),
            connect_attempts: AtomicU64::new(0),
            connects: AtomicU64::new(0),
            connect_failures: AtomicU64::new(0),
            disconnects: AtomicU64::new(0),
            commands_sent: AtomicU64::new(0),
            commands_failed: AtomicU64::new(0),
            frame_kinds: Mutex::new(HashMap::new()),
        }
    }
}

impl RelayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_forwarded(&self, kind: Option<&str>, bytes: usize) {
        self.frames_forwarded.fetch_add(1, Ordering::Relaxed);
        self.bytes_forwarded.fetch_add(bytes as u64, Ordering::Relaxed);
        let mut kinds = self.frame_kinds.lock().unwrap_or_else(PoisonError::into_inner);
        *kinds.entry(kind.unwrap_or(UNTYPED).to_string()).or_insert(0) += 1;
    }

    pub fn record_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_blank(&self) {
        self.frames_blank.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connect_attempt(&self) {
        self.connect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connected(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command(&self, ok: bool) {
        let counter = if ok { &self.commands_sent } else { &self.commands_failed };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frames_forwarded(&self) -> u64 {
        self.frames_forwarded.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self, subscribers: usize) -> MetricsSnapshot {
        let frame_kinds = self
            .frame_kinds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        MetricsSnapshot {
            uptime_secs: self.started.elapsed().as_secs_f64(),
            subscribers,
            frames_forwarded: self.frames_forwarded.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            frames_blank: self.frames_blank.load(Ordering::Relaxed),
            bytes_forwarded: self.bytes_forwarded.load(Ordering::Relaxed),
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            commands_failed: self.commands_failed.load(Ordering::Relaxed),
            frame_kinds,
        }
    }
}

/// JSON body of `GET /api/metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: f64,
    pub subscribers: usize,
    pub frames_forwarded: u64,
    pub frames_rejected: u64,
    pub frames_blank: u64,
    pub bytes_forwarded: u64,
    pub connect_attempts: u64,
    pub connects: u64,
    pub connect_failures: u64,
    pub disconnects: u64,
    pub commands_sent: u64,
    pub commands_failed: u64,
    pub frame_kinds: HashMap<String, u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_frames_are_counted_by_kind() {
        let m = RelayMetrics::new();
        m.record_forwarded(Some("metrics"), 10);
        m.record_forwarded(Some("metrics"), 12);
        m.record_forwarded(None, 2);

        let snap = m.snapshot(3);
        assert_eq!(snap.frames_forwarded, 3);
        assert_eq!(snap.bytes_forwarded, 24);
        assert_eq!(snap.subscribers, 3);
        assert_eq!(snap.frame_kinds["metrics"], 2);
        assert_eq!(snap.frame_kinds[UNTYPED], 1);
    }

    #[test]
    fn command_outcomes_are_split() {
        let m = RelayMetrics::new();
        m.record_command(true);
        m.record_command(true);
        m.record_command(false);
        let snap = m.snapshot(0);
        assert_eq!(snap.commands_sent, 2);
        assert_eq!(snap.commands_failed, 1);
    }

    #[test]
    fn snapshot_serializes() {
        let m = RelayMetrics::new();
        m.record_connect_attempt();
        m.record_connect_failure();
        let json = serde_json::to_value(m.snapshot(0)).unwrap();
        assert_eq!(json["connect_attempts"], 1);
        assert_eq!(json["connect_failures"], 1);
        assert_eq!(json["frames_rejected"], 0);
    }
}
