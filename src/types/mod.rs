//! Shared value types: socket identities, broadcast events, dispatch
//! reports and the crate's error enums.

use std::{borrow::Borrow, fmt::Display, sync::Arc};

use serde_json::Value;

/// Identifier of one live connection.
///
/// Unique per connection within a server instance. Cloning is cheap, the
/// underlying string is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SocketId(Arc<str>);

impl SocketId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(Arc::from(id.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SocketId {
    fn from(id: &str) -> Self {
        Self(Arc::from(id))
    }
}

impl From<String> for SocketId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl Borrow<str> for SocketId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl Display for SocketId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An application event destined for a room.
///
/// The arguments are opaque to this crate and are handed to each socket's
/// `emit` untouched.
///
/// ## Fields
///
/// - `name`: The event name, e.g. `"chat message"`.
/// - `args`: The event arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// The event name.
    pub name: String,
    /// The event arguments.
    pub args: Vec<Value>,
}

impl Event {
    pub fn new<S: Into<String>>(name: S, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event {{ name: {}, args: {} }}", self.name, self.args.len())
    }
}

/// Outcome of handing one event to a dispatcher.
///
/// For the chunked strategy `failed` lists sockets whose `emit` returned an
/// error. For the queued strategy it lists sockets whose item could not be
/// enqueued before the timeout; emission failures inside the worker pool are
/// only logged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Number of sockets in the snapshot.
    pub targets: usize,
    /// Number of concurrent tasks spawned for this call. Always zero for
    /// the queued strategy, whose workers outlive any single call.
    pub tasks: usize,
    /// Sockets that missed the event.
    pub failed: Vec<SocketId>,
}

impl DispatchReport {
    /// Number of targets that did not fail.
    pub fn succeeded(&self) -> usize {
        self.targets - self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Failure of a single best-effort write to a socket.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SocketError {
    /// The underlying transport is closed.
    #[error("socket closed")]
    Closed,

    /// The transport's outbound buffer is full.
    #[error("socket outbound buffer full")]
    Backpressure,

    /// Any other transport write error.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Errors surfaced by the broadcast engine.
///
/// Per-socket delivery failures never show up here; they are absorbed by
/// the dispatcher and logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BroadcastError {
    /// The dispatcher has been shut down and accepts no more work.
    #[error("dispatcher is shut down")]
    DispatcherClosed,

    /// The engine configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}
