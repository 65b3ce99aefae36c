#![cfg(feature = "bench")]

//! Internal helpers for Criterion benchmarks.
//!
//! These helpers build engines whose rooms are filled with in-memory
//! sockets, so the benchmarks exercise the registry and both dispatchers
//! without a real transport.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::{
    config::BroadcastConfig,
    conn::{SharedSocket, Socket},
    engine::BroadcastEngine,
    types::{SocketError, SocketId},
};

/// Room every benchmark broadcasts into.
pub const BENCH_ROOM: &str = "bench-room";

/// A socket that accepts every event and drops it.
pub struct NullSocket {
    id: SocketId,
}

#[async_trait]
impl Socket for NullSocket {
    fn id(&self) -> &SocketId {
        &self.id
    }

    async fn emit(&self, _event: &str, _args: &[Value]) -> Result<(), SocketError> {
        Ok(())
    }

    async fn leave(&self, _room: &str) {}

    async fn disconnect(&self) {}
}

#[derive(Clone)]
/// Context wrapping an engine whose bench room holds `members` sockets.
pub struct EngineContext {
    /// Engine instance that benchmarks invoke.
    pub engine: Arc<BroadcastEngine>,
    /// The room's members, for join/leave benchmarks.
    pub members: Arc<Vec<SharedSocket>>,
}

impl EngineContext {
    /// Creates an engine with `config` and fills the bench room.
    ///
    /// Must run inside a tokio runtime.
    pub async fn with_members(config: BroadcastConfig, members: usize) -> Self {
        let engine = BroadcastEngine::new(config).expect("valid bench config");
        let sockets: Vec<SharedSocket> = (0..members)
            .map(|i| {
                Arc::new(NullSocket {
                    id: SocketId::new(format!("bench-{i}")),
                }) as SharedSocket
            })
            .collect();
        for socket in &sockets {
            engine
                .join(BENCH_ROOM, socket)
                .await
                .expect("join never fails");
        }

        Self {
            engine: Arc::new(engine),
            members: Arc::new(sockets),
        }
    }
}
