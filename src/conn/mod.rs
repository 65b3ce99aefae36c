//! The socket capability consumed by the broadcast engine.
//!
//! The engine never owns a transport. It only sees connections through the
//! [`Socket`] trait: an identity, a one-shot `emit`, a room teardown hook and
//! a way to close the connection. [`ChannelSocket`] is a ready-made adapter
//! for transports that drain an outbound queue from a writer task.
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    Mutex,
};
use tracing::debug;

use crate::types::{Event, SocketError, SocketId};

/// One live duplex connection as seen by the broadcast engine.
///
/// Implementations must be cheap to call concurrently: the chunked
/// dispatcher emits from several tasks at once and the queued dispatcher
/// from a pool of workers.
#[async_trait]
pub trait Socket: Send + Sync {
    /// Stable identifier for the lifetime of the connection.
    fn id(&self) -> &SocketId;

    /// Attempts one best-effort write of an event to the transport.
    async fn emit(&self, event: &str, args: &[Value]) -> Result<(), SocketError>;

    /// Membership teardown hook, invoked once per socket when a room is
    /// disbanded. Must be idempotent.
    ///
    /// The registry lock is never held while this runs, so the hook may call
    /// back into the registry.
    async fn leave(&self, room: &str);

    /// Closes the underlying transport. Must be idempotent.
    async fn disconnect(&self);
}

/// Non-owning handle to a socket, as stored by the room registry.
pub type SharedSocket = Arc<dyn Socket>;

/// Lifecycle state of a [`ChannelSocket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    Open,
    Closed,
}

/// A [`Socket`] that pushes events into a bounded channel.
///
/// The receiving half is meant to be drained by the transport's writer
/// task, which performs framing and the actual I/O. `emit` never waits: a
/// full channel is reported as [`SocketError::Backpressure`].
#[derive(Debug)]
pub struct ChannelSocket {
    id: SocketId,
    writer: Mutex<Option<mpsc::Sender<Event>>>,
}

impl ChannelSocket {
    /// Creates a socket with an outbound buffer of `buffer` events and
    /// returns the receiving half.
    pub fn new<I: Into<SocketId>>(id: I, buffer: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(buffer);
        let socket = Self {
            id: id.into(),
            writer: Mutex::new(Some(tx)),
        };
        (socket, rx)
    }

    /// Same as [`ChannelSocket::new`] but already wrapped for the registry.
    pub fn shared<I: Into<SocketId>>(
        id: I,
        buffer: usize,
    ) -> (SharedSocket, mpsc::Receiver<Event>) {
        let (socket, rx) = Self::new(id, buffer);
        (Arc::new(socket), rx)
    }

    pub async fn state(&self) -> ConnState {
        let writer = self.writer.lock().await;
        match writer.as_ref() {
            Some(tx) if !tx.is_closed() => ConnState::Open,
            _ => ConnState::Closed,
        }
    }
}

#[async_trait]
impl Socket for ChannelSocket {
    fn id(&self) -> &SocketId {
        &self.id
    }

    async fn emit(&self, event: &str, args: &[Value]) -> Result<(), SocketError> {
        let writer = self.writer.lock().await;
        let tx = writer.as_ref().ok_or(SocketError::Closed)?;
        tx.try_send(Event::new(event, args.to_vec()))
            .map_err(|e| match e {
                TrySendError::Full(_) => SocketError::Backpressure,
                TrySendError::Closed(_) => SocketError::Closed,
            })
    }

    async fn leave(&self, room: &str) {
        debug!(socket_id = %self.id, room, "socket released from room");
    }

    async fn disconnect(&self) {
        let mut writer = self.writer.lock().await;
        if writer.take().is_some() {
            debug!(socket_id = %self.id, "socket disconnected");
        }
    }
}
