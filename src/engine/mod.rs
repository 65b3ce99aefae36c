//! The broadcast engine: room membership plus fan-out.
//!
//! `BroadcastEngine` is the only type the rest of a server needs. Transport
//! code calls `join`/`leave` when a socket enters or leaves a room and `send`
//! when an event should reach a room.
//!
//! ## Example
//!
//! ```rust
//! use roomcast::{config::BroadcastConfig, conn::ChannelSocket, engine::BroadcastEngine};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() {
//!     let engine = BroadcastEngine::new(BroadcastConfig::default()).unwrap();
//!
//!     let (alice, _alice_rx) = ChannelSocket::shared("alice", 16);
//!     let (bob, mut bob_rx) = ChannelSocket::shared("bob", 16);
//!     engine.join("lobby", &alice).await.unwrap();
//!     engine.join("lobby", &bob).await.unwrap();
//!
//!     // Alice talks, everyone else in the lobby hears it.
//!     engine
//!         .send(Some(alice.as_ref()), "lobby", "chat", vec![json!("hi")])
//!         .await
//!         .unwrap();
//!
//!     let event = bob_rx.recv().await.unwrap();
//!     assert_eq!(event.name, "chat");
//! }
//! ```
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    config::BroadcastConfig,
    conn::{SharedSocket, Socket},
    dispatch::Dispatcher,
    room::RoomRegistry,
    types::{BroadcastError, Event, SocketId},
};

/// Room registry composed with a delivery strategy.
///
/// No registry lock is held while events are delivered: `send` copies the
/// target list out of the registry first and hands the copy to the
/// dispatcher.
pub struct BroadcastEngine {
    registry: RoomRegistry,
    dispatcher: Box<dyn Dispatcher>,
}

impl BroadcastEngine {
    /// Builds an engine with the dispatcher described by `config`.
    ///
    /// Must be called inside a tokio runtime when the queued strategy is
    /// selected.
    pub fn new(config: BroadcastConfig) -> Result<Self, BroadcastError> {
        let dispatcher = config.build_dispatcher()?;
        debug!(strategy = ?config.strategy, "broadcast engine created");
        Ok(Self::with_dispatcher(dispatcher))
    }

    /// Builds an engine around an existing dispatcher.
    pub fn with_dispatcher(dispatcher: Box<dyn Dispatcher>) -> Self {
        Self {
            registry: RoomRegistry::new(),
            dispatcher,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Adds `socket` to `room`. Joining twice has no effect.
    pub async fn join(&self, room: &str, socket: &SharedSocket) -> Result<(), BroadcastError> {
        self.registry.join(room, socket).await
    }

    /// Removes `socket` from `room`. Leaving a room the socket is not in
    /// has no effect.
    pub async fn leave(&self, room: &str, socket: &dyn Socket) -> Result<(), BroadcastError> {
        self.registry.leave(room, socket).await
    }

    /// Removes `socket` from every room, e.g. when its connection closes.
    /// Returns the rooms it was removed from.
    pub async fn leave_all(&self, socket: &dyn Socket) -> Vec<String> {
        self.registry.leave_all(socket).await
    }

    /// Sends `event` with `args` to every member of `room` except `ignore`.
    ///
    /// Delivery is best-effort and at most once per socket. Sockets that
    /// fail or time out are logged and skipped; the call only fails when
    /// the dispatcher can no longer accept work.
    pub async fn send(
        &self,
        ignore: Option<&dyn Socket>,
        room: &str,
        event: &str,
        args: Vec<Value>,
    ) -> Result<(), BroadcastError> {
        let targets = self.registry.members(room, ignore.map(|socket| socket.id())).await;
        if targets.is_empty() {
            debug!(room, event, "no recipients for event");
            return Ok(());
        }

        let event = Arc::new(Event::new(event, args));
        let report = self.dispatcher.dispatch(targets, Arc::clone(&event)).await?;
        if report.is_complete() {
            debug!(room, event = %event.name, targets = report.targets, "event broadcast");
        } else {
            warn!(
                room,
                event = %event.name,
                targets = report.targets,
                failed = report.failed.len(),
                "event broadcast with missed recipients"
            );
        }
        Ok(())
    }

    /// Number of sockets in `room`; zero when the room does not exist.
    pub async fn len(&self, room: &str) -> usize {
        self.registry.len(room).await
    }

    /// Snapshot of the members of `room`, minus `excluding`.
    pub async fn members(&self, room: &str, excluding: Option<&SocketId>) -> Vec<SharedSocket> {
        self.registry.members(room, excluding).await
    }

    /// Names of every live room.
    pub async fn rooms(&self) -> Vec<String> {
        self.registry.rooms().await
    }

    /// Removes `room` and calls every former member's teardown hook.
    ///
    /// A `join` arriving while the room is being disbanded is accepted and
    /// creates a fresh room.
    pub async fn disband(&self, room: &str) -> Result<(), BroadcastError> {
        self.registry.disband(room).await;
        Ok(())
    }

    /// Stops the dispatcher's background work, if any.
    ///
    /// Already queued deliveries are still attempted. With the queued
    /// strategy, `send` fails with [`BroadcastError::DispatcherClosed`]
    /// afterwards.
    pub async fn shutdown(&self) {
        self.dispatcher.shutdown().await;
    }
}
