//! Subscriber registry and broadcast.
//!
//! Every observer connection registers a [`FrameSink`]. A broadcast walks the
//! live set under one mutex and drops any member whose sink reports closed.
//! Sinks must not block: the upstream read loop is the caller, and a slow
//! observer must never stall the others.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::frame::Frame;

/// Process-local identity of one observer connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("subscriber connection closed")]
pub struct SinkClosed;

/// Non-blocking hand-off of a frame to one observer connection.
pub trait FrameSink: Send + Sync {
    fn deliver(&self, frame: &Frame) -> Result<(), SinkClosed>;
}

/// The usual sink: a channel drained by the connection's writer task.
impl FrameSink for mpsc::UnboundedSender<Frame> {
    fn deliver(&self, frame: &Frame) -> Result<(), SinkClosed> {
        self.send(frame.clone()).map_err(|_| SinkClosed)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub removed: usize,
}

#[derive(Default)]
pub struct SubscriberRegistry {
    members: Mutex<HashMap<SubscriberId, Box<dyn FrameSink>>>,
    next_id: AtomicU64,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn members(&self) -> MutexGuard<'_, HashMap<SubscriberId, Box<dyn FrameSink>>> {
        // A panicking sink cannot leave the map half-updated.
        self.members.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a sink to the live set. Dropping the returned guard removes it.
    pub fn subscribe(self: &Arc<Self>, sink: impl FrameSink + 'static) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.members().insert(id, Box::new(sink));
        tracing::debug!(subscriber = %id, "subscriber joined");
        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    /// Remove a member. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.members().remove(&id).is_some();
        if removed {
            tracing::debug!(subscriber = %id, "subscriber left");
        }
        removed
    }

    /// Deliver `frame` to every live member, dropping the ones that fail.
    pub fn broadcast(&self, frame: &Frame) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        self.members().retain(|id, sink| match sink.deliver(frame) {
            Ok(()) => {
                report.delivered += 1;
                true
            }
            Err(SinkClosed) => {
                tracing::debug!(subscriber = %id, "dropping closed subscriber");
                report.removed += 1;
                false
            }
        });
        report
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.members().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.members().len()
    }

    pub fn is_empty(&self) -> bool {
        self.members().is_empty()
    }
}

/// Membership guard for one observer connection.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unsubscribe(self.id);
        }
    }
}
