//! Fan-out of one event to a snapshot of target sockets.
//!
//! Two strategies sit behind the [`Dispatcher`] trait and are picked when the
//! engine is built:
//!
//! - [`ChunkedDispatcher`] splits the snapshot into bounded chunks, emits to
//!   each chunk from its own task and waits for all of them.
//! - [`QueuedDispatcher`] pushes one delivery per target into a bounded queue
//!   drained by a fixed worker pool, giving up on a target when the queue
//!   stays full past a timeout.
//!
//! Neither strategy propagates per-socket failures as errors. They are
//! logged and listed in the returned [`DispatchReport`].
use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    conn::SharedSocket,
    types::{BroadcastError, DispatchReport, Event},
};

pub(crate) mod chunked;
mod queued;

pub use chunked::{ChunkedDispatcher, DEFAULT_CHUNK_SIZE};
pub use queued::{
    QueuedDispatcher, DEFAULT_ENQUEUE_TIMEOUT, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS,
};

/// A delivery strategy for one broadcast.
///
/// `targets` is already filtered: the sender, if any, has been excluded by
/// the caller.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Delivers `event` to every socket in `targets`.
    ///
    /// Returns an error only when the dispatcher itself can no longer accept
    /// work.
    async fn dispatch(
        &self,
        targets: Vec<SharedSocket>,
        event: Arc<Event>,
    ) -> Result<DispatchReport, BroadcastError>;

    /// Stops any background machinery. Later calls to `dispatch` may fail.
    async fn shutdown(&self) {}
}
