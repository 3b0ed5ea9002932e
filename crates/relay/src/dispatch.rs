//! Per-frame pipeline: validate, count, broadcast.

use std::sync::Arc;

use crate::fanout::SubscriberRegistry;
use crate::frame::Frame;
use crate::metrics::RelayMetrics;
use crate::upstream::FrameHandler;
use crate::validate::{validate, Verdict};

/// Longest frame excerpt written to a rejection log line.
const LOG_PREVIEW_BYTES: usize = 120;

/// Routes decoded upstream frames to the subscriber set.
///
/// Only frames that parse as JSON are broadcast, and they go out as the
/// exact bytes received. A rejected frame is logged and dropped; it has no
/// effect on the frames around it.
pub struct Dispatcher {
    subscribers: Arc<SubscriberRegistry>,
    metrics: Arc<RelayMetrics>,
}

impl Dispatcher {
    pub fn new(subscribers: Arc<SubscriberRegistry>, metrics: Arc<RelayMetrics>) -> Self {
        Self { subscribers, metrics }
    }
}

impl FrameHandler for Dispatcher {
    fn on_frame(&self, frame: Frame) {
        match validate(frame) {
            Verdict::Valid(telemetry) => {
                self.metrics
                    .record_forwarded(telemetry.kind(), telemetry.raw().len());
                let report = self.subscribers.broadcast(telemetry.raw());
                tracing::trace!(
                    delivered = report.delivered,
                    removed = report.removed,
                    "frame broadcast"
                );
            }
            Verdict::Blank => self.metrics.record_blank(),
            Verdict::Invalid { frame, error } => {
                self.metrics.record_rejected();
                tracing::warn!(
                    error = %error,
                    line = %frame.preview(LOG_PREVIEW_BYTES),
                    "dropping malformed telemetry frame"
                );
            }
        }
    }
}
