//! Failure notifications.
//!
//! Each time a backend fails during a routed operation, the orchestrator
//! notifies its [`FailureSink`]. Sinks are for logging and metrics only: they
//! cannot influence routing, must not panic, and must return promptly.
//!
//! | Sink | Behaviour |
//! |------|-----------|
//! | [`TracingSink`] | Structured `warn!` record (default) |
//! | [`NullSink`] | Drops every event |
//! | [`ChannelSink`] | Owned [`FailureRecord`] pushed to an unbounded channel |

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::warn;

use crate::core::{Operation, OperationArgs};
use crate::error::GatewayError;

/// Whether a failure happened while reading or writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// A reading operation failed on one backend.
    Read,
    /// A writing operation failed on one backend.
    Write,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Read => write!(f, "read"),
            FailureKind::Write => write!(f, "write"),
        }
    }
}

/// A single backend failure, borrowed from the failing call.
#[derive(Debug, Clone, Copy)]
pub struct FailureEvent<'a> {
    /// Read or write.
    pub kind: FailureKind,
    /// Backend that failed.
    pub backend_id: &'a str,
    /// Operation being routed.
    pub operation: &'a Operation,
    /// Arguments of the call, as received.
    pub args: &'a OperationArgs<'a>,
    /// The error raised (or the soft failure signalled) by the backend.
    pub error: &'a GatewayError,
}

impl FailureEvent<'_> {
    /// Converts the event into an owned record.
    pub fn to_record(&self) -> FailureRecord {
        FailureRecord {
            kind: self.kind,
            backend_id: self.backend_id.to_string(),
            operation: self.operation.clone(),
            args: self.args.to_json(),
            error: self.error.to_string(),
            occurred_at: Utc::now(),
        }
    }
}

/// An owned snapshot of a [`FailureEvent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureRecord {
    /// Read or write.
    pub kind: FailureKind,
    /// Backend that failed.
    pub backend_id: String,
    /// Operation being routed.
    pub operation: Operation,
    /// JSON snapshot of the call arguments.
    pub args: Value,
    /// Rendered error message.
    pub error: String,
    /// When the failure was observed.
    pub occurred_at: DateTime<Utc>,
}

/// Receives backend failure notifications.
pub trait FailureSink: Send + Sync {
    /// Handles one failure. Must not block and must not panic.
    fn notify(&self, event: &FailureEvent<'_>);
}

/// A dynamically typed failure sink.
pub type DynFailureSink = Arc<dyn FailureSink>;

/// Logs every failure through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl FailureSink for TracingSink {
    fn notify(&self, event: &FailureEvent<'_>) {
        warn!(
            kind = %event.kind,
            backend_id = event.backend_id,
            operation = %event.operation,
            error = %event.error,
            "Backend failed during proxied operation"
        );
    }
}

/// Discards every failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl FailureSink for NullSink {
    fn notify(&self, _event: &FailureEvent<'_>) {}
}

/// Forwards owned failure records to an unbounded channel.
///
/// Sending never blocks. Once the receiver is dropped, records are silently
/// discarded.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<FailureRecord>,
}

impl ChannelSink {
    /// Creates a sink and the receiving end of its channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<FailureRecord>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl FailureSink for ChannelSink {
    fn notify(&self, event: &FailureEvent<'_>) {
        // closed receiver: nobody is listening anymore
        let _ = self.sender.send(event.to_record());
    }
}

impl<F> FailureSink for F
where
    F: Fn(&FailureEvent<'_>) + Send + Sync,
{
    fn notify(&self, event: &FailureEvent<'_>) {
        self(event)
    }
}
