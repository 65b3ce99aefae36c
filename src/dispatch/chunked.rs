use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, error, warn};

use super::Dispatcher;
use crate::{
    conn::SharedSocket,
    types::{BroadcastError, DispatchReport, Event, SocketId},
};

/// Default number of sockets handled by one chunk task.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Parallel fan-out over fixed-size chunks of the target snapshot.
///
/// A broadcast to `n` sockets spawns `ceil(n / chunk_size)` tasks. Each task
/// emits to its sockets one after another in snapshot order, and `dispatch`
/// returns once every task has finished. A slow socket only delays the
/// chunk it belongs to.
#[derive(Debug, Clone)]
pub struct ChunkedDispatcher {
    chunk_size: usize,
}

impl ChunkedDispatcher {
    pub fn new(chunk_size: usize) -> Result<Self, BroadcastError> {
        if chunk_size == 0 {
            return Err(BroadcastError::Config(
                "chunk size must be greater than zero".into(),
            ));
        }
        Ok(Self { chunk_size })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl Default for ChunkedDispatcher {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Splits `targets` into contiguous chunks of at most `chunk_size` sockets.
pub(crate) fn partition(targets: &[SharedSocket], chunk_size: usize) -> Vec<Vec<SharedSocket>> {
    targets.chunks(chunk_size).map(<[SharedSocket]>::to_vec).collect()
}

async fn emit_chunk(chunk: Vec<SharedSocket>, event: Arc<Event>) -> Vec<SocketId> {
    let mut failed = Vec::new();
    for socket in chunk {
        if let Err(e) = socket.emit(&event.name, &event.args).await {
            warn!(
                socket_id = %socket.id(),
                event = %event.name,
                error = %e,
                "failed to emit event to socket"
            );
            failed.push(socket.id().clone());
        }
    }
    failed
}

#[async_trait]
impl Dispatcher for ChunkedDispatcher {
    async fn dispatch(
        &self,
        targets: Vec<SharedSocket>,
        event: Arc<Event>,
    ) -> Result<DispatchReport, BroadcastError> {
        if targets.is_empty() {
            return Ok(DispatchReport::default());
        }

        let chunks = partition(&targets, self.chunk_size);
        let mut chunk_ids = Vec::with_capacity(chunks.len());
        let mut tasks = Vec::with_capacity(chunks.len());
        for chunk in chunks {
            chunk_ids.push(chunk.iter().map(|s| s.id().clone()).collect::<Vec<_>>());
            tasks.push(tokio::spawn(emit_chunk(chunk, Arc::clone(&event))));
        }

        let mut report = DispatchReport {
            targets: targets.len(),
            tasks: tasks.len(),
            failed: Vec::new(),
        };
        for (result, ids) in join_all(tasks).await.into_iter().zip(chunk_ids) {
            match result {
                Ok(mut failed) => report.failed.append(&mut failed),
                Err(e) => {
                    // The chunk died midway; nothing tells us which of its
                    // sockets were reached.
                    error!(
                        event = %event.name,
                        sockets = ids.len(),
                        error = %e,
                        "chunk task aborted"
                    );
                    report.failed.extend(ids);
                }
            }
        }

        debug!(
            event = %event.name,
            targets = report.targets,
            chunks = report.tasks,
            failed = report.failed.len(),
            "chunked dispatch finished"
        );
        Ok(report)
    }
}
