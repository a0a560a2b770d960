//! State synchronization protocol between the widget and a front-end.
//!
//! The widget does not know what transport carries its state; it publishes
//! `SyncMessage`s into a `SyncSink` and applies inbound messages handed to
//! it. `ChannelSink` is the in-process transport (lock-free crossbeam
//! channel); embedders bridging to a live front-end implement `SyncSink`
//! over whatever comm layer they have, or wrap a closure in `FnSink`.
//!
//! Protocol rules:
//!
//! - One `Open` per sink attachment, carrying the complete state.
//! - Setters publish one `Update` containing exactly the changed field.
//! - Applying an inbound message never echoes it back out.

use crossbeam_channel::{Receiver, SendError, Sender};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One state patch: wire field name to new value.
pub type StatePatch = serde_json::Map<String, Value>;

// =============================================================================
// SYNC MESSAGE - the wire protocol
// =============================================================================

/// A message on the widget channel, tagged by `method`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum SyncMessage {
    /// Full state announcement when a widget binds to a channel.
    Open { state: StatePatch },
    /// Incremental change: only the fields that changed.
    Update { state: StatePatch },
    /// The front-end asks for the full state again.
    RequestState,
}

impl SyncMessage {
    /// An `Update` carrying a single field.
    pub fn single(field: impl Into<String>, value: Value) -> Self {
        let mut state = StatePatch::new();
        state.insert(field.into(), value);
        Self::Update { state }
    }

    /// The wire method name, for logs.
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Open { .. } => "open",
            Self::Update { .. } => "update",
            Self::RequestState => "request_state",
        }
    }

    /// The carried state patch, if the message has one.
    pub fn state(&self) -> Option<&StatePatch> {
        match self {
            Self::Open { state } | Self::Update { state } => Some(state),
            Self::RequestState => None,
        }
    }
}

// =============================================================================
// SYNC SINK - where published messages go
// =============================================================================

/// Outbound half of the protocol. `publish` must not fail: transports that
/// can lose messages log and count instead of erroring, so widget setters
/// stay infallible.
pub trait SyncSink: Send {
    fn publish(&mut self, message: SyncMessage);
}

/// Adapter making any `FnMut(SyncMessage)` a sink.
pub struct FnSink<F>(pub F);

impl<F> SyncSink for FnSink<F>
where
    F: FnMut(SyncMessage) + Send,
{
    fn publish(&mut self, message: SyncMessage) {
        (self.0)(message)
    }
}

/// In-process sink over an unbounded lock-free channel.
///
/// A disconnected receiver is tolerated: the message is dropped, the drop
/// counter incremented, and a warning logged. The widget never panics or
/// blocks because its front-end went away.
pub struct ChannelSink {
    sender: Sender<SyncMessage>,
    published: u64,
    dropped: u64,
}

impl ChannelSink {
    /// Create a sink and the receiver a front-end bridge drains.
    pub fn unbounded() -> (Self, Receiver<SyncMessage>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let sink = Self {
            sender,
            published: 0,
            dropped: 0,
        };
        (sink, receiver)
    }

    /// Messages delivered into the channel.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Messages dropped because the receiver was gone.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl SyncSink for ChannelSink {
    fn publish(&mut self, message: SyncMessage) {
        match self.sender.send(message) {
            Ok(()) => {
                self.published += 1;
                tracing::trace!(published = self.published, "sync message sent");
            }
            Err(SendError(message)) => {
                self.dropped += 1;
                tracing::warn!(
                    method = message.method_name(),
                    dropped = self.dropped,
                    "sync channel closed; message dropped"
                );
            }
        }
    }
}
