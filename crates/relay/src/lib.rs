pub mod command;
pub mod dispatch;
pub mod error;
pub mod fanout;
pub mod frame;
pub mod link;
pub mod metrics;
pub mod relay;
pub mod upstream;
pub mod validate;

pub use command::{Command, CommandError};
pub use dispatch::Dispatcher;
pub use error::RelayError;
pub use fanout::{BroadcastReport, FrameSink, SinkClosed, SubscriberId, SubscriberRegistry, Subscription};
pub use frame::{decode, Decoded, Frame, FrameDecoder};
pub use link::{LinkEvent, LinkState};
pub use metrics::{MetricsSnapshot, RelayMetrics};
pub use relay::{Relay, RelayStatus};
pub use upstream::{Connector, FrameHandler, TcpConnector, UpstreamManager, UpstreamReader, UpstreamWriter};
pub use validate::{validate, Telemetry, ValidationError, Verdict};
