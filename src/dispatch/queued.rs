use std::{panic::AssertUnwindSafe, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures::{future::join_all, FutureExt};
use tokio::{
    sync::{
        mpsc::{self, error::SendTimeoutError},
        Mutex, RwLock,
    },
    task::JoinHandle,
};
use tracing::{debug, error, warn};

use super::Dispatcher;
use crate::{
    conn::SharedSocket,
    types::{BroadcastError, DispatchReport, Event},
};

/// Default capacity of the shared delivery queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 5000;

/// Default size of the worker pool draining the queue.
pub const DEFAULT_WORKERS: usize = 10;

/// Default time an enqueue waits for space before giving up on a target.
pub const DEFAULT_ENQUEUE_TIMEOUT: Duration = Duration::from_secs(2);

/// One pending emission.
struct Delivery {
    socket: SharedSocket,
    event: Arc<Event>,
}

type DeliveryQueue = Arc<Mutex<mpsc::Receiver<Delivery>>>;

/// Asynchronous fan-out through one bounded queue and a fixed worker pool.
///
/// The queue and workers are shared by every room using this dispatcher.
/// `dispatch` only enqueues; it returns once every target has been queued
/// or has timed out, so its latency is bounded by `targets × timeout` when
/// the queue stays saturated. Workers interleave deliveries from all rooms,
/// so no ordering holds, not even within one broadcast.
///
/// Workers are spawned on the current tokio runtime when the dispatcher is
/// created.
pub struct QueuedDispatcher {
    sender: RwLock<Option<mpsc::Sender<Delivery>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    capacity: usize,
    enqueue_timeout: Duration,
}

impl QueuedDispatcher {
    pub fn new(
        capacity: usize,
        workers: usize,
        enqueue_timeout: Duration,
    ) -> Result<Self, BroadcastError> {
        if capacity == 0 {
            return Err(BroadcastError::Config(
                "queue capacity must be greater than zero".into(),
            ));
        }
        if workers == 0 {
            return Err(BroadcastError::Config(
                "worker pool must have at least one worker".into(),
            ));
        }

        let (tx, rx) = mpsc::channel(capacity);
        let queue: DeliveryQueue = Arc::new(Mutex::new(rx));
        let handles = (0..workers)
            .map(|index| tokio::spawn(run_worker(index, Arc::clone(&queue))))
            .collect();

        debug!(capacity, workers, ?enqueue_timeout, "delivery workers started");
        Ok(Self {
            sender: RwLock::new(Some(tx)),
            workers: Mutex::new(handles),
            capacity,
            enqueue_timeout,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn enqueue_timeout(&self) -> Duration {
        self.enqueue_timeout
    }

    /// Number of deliveries waiting in the queue. Zero once shut down.
    pub async fn pending(&self) -> usize {
        let sender = self.sender.read().await;
        sender
            .as_ref()
            .map_or(0, |tx| tx.max_capacity() - tx.capacity())
    }
}

async fn run_worker(index: usize, queue: DeliveryQueue) {
    loop {
        let delivery = {
            let mut rx = queue.lock().await;
            rx.recv().await
        };
        let Some(Delivery { socket, event }) = delivery else {
            break;
        };
        match AssertUnwindSafe(socket.emit(&event.name, &event.args))
            .catch_unwind()
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(
                worker = index,
                socket_id = %socket.id(),
                event = %event.name,
                error = %e,
                "failed to emit queued event to socket"
            ),
            // A panicking socket must not take its worker down with it.
            Err(_) => error!(
                worker = index,
                socket_id = %socket.id(),
                event = %event.name,
                "socket panicked while emitting queued event"
            ),
        }
    }
    debug!(worker = index, "delivery worker stopped");
}

#[async_trait]
impl Dispatcher for QueuedDispatcher {
    async fn dispatch(
        &self,
        targets: Vec<SharedSocket>,
        event: Arc<Event>,
    ) -> Result<DispatchReport, BroadcastError> {
        let sender = self
            .sender
            .read()
            .await
            .clone()
            .ok_or(BroadcastError::DispatcherClosed)?;

        let mut report = DispatchReport {
            targets: targets.len(),
            tasks: 0,
            failed: Vec::new(),
        };
        for socket in targets {
            let socket_id = socket.id().clone();
            let delivery = Delivery {
                socket,
                event: Arc::clone(&event),
            };
            match sender.send_timeout(delivery, self.enqueue_timeout).await {
                Ok(()) => {}
                Err(SendTimeoutError::Timeout(_)) => {
                    warn!(
                        socket_id = %socket_id,
                        event = %event.name,
                        timeout_ms = self.enqueue_timeout.as_millis() as u64,
                        "delivery queue saturated, event dropped for socket"
                    );
                    report.failed.push(socket_id);
                }
                Err(SendTimeoutError::Closed(_)) => {
                    error!(event = %event.name, "delivery queue closed, no workers left");
                    return Err(BroadcastError::DispatcherClosed);
                }
            }
        }

        debug!(
            event = %event.name,
            targets = report.targets,
            dropped = report.failed.len(),
            "queued dispatch finished"
        );
        Ok(report)
    }

    async fn shutdown(&self) {
        // Dropping the last sender closes the queue; workers drain what is
        // left and exit.
        drop(self.sender.write().await.take());

        let workers = std::mem::take(&mut *self.workers.lock().await);
        for result in join_all(workers).await {
            if let Err(e) = result {
                error!(error = %e, "delivery worker aborted");
            }
        }
        debug!("delivery workers shut down");
    }
}
