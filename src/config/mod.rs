//! Engine configuration.
//!
//! `BroadcastConfig` deserializes from any serde format. Missing fields take
//! their defaults, so an empty document yields the chunked strategy with
//! chunks of 500 sockets.
//!
//! ```rust
//! use roomcast::config::{BroadcastConfig, DeliveryStrategy};
//!
//! let config: BroadcastConfig = serde_json::from_str(
//!     r#"{ "strategy": { "kind": "queued", "workers": 4 } }"#,
//! )
//! .unwrap();
//!
//! assert!(matches!(
//!     config.strategy,
//!     DeliveryStrategy::Queued { workers: 4, capacity: 5000, .. }
//! ));
//! ```
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::{
    dispatch::{
        ChunkedDispatcher, Dispatcher, QueuedDispatcher, DEFAULT_CHUNK_SIZE,
        DEFAULT_ENQUEUE_TIMEOUT, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS,
    },
    types::BroadcastError,
};

/// How a broadcast is fanned out to its targets.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeliveryStrategy {
    /// Parallel emission over chunks of at most `chunk_size` sockets;
    /// `send` waits for every chunk.
    Chunked {
        #[serde(default = "default_chunk_size")]
        chunk_size: usize,
    },

    /// One shared bounded queue drained by `workers` tasks; each enqueue
    /// waits at most `enqueue_timeout` for space.
    Queued {
        #[serde(default = "default_capacity")]
        capacity: usize,
        #[serde(default = "default_workers")]
        workers: usize,
        #[serde(
            rename = "enqueue_timeout_ms",
            default = "default_enqueue_timeout",
            deserialize_with = "millis"
        )]
        enqueue_timeout: Duration,
    },
}

impl Default for DeliveryStrategy {
    fn default() -> Self {
        DeliveryStrategy::Chunked {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Configuration of a [`BroadcastEngine`](crate::engine::BroadcastEngine).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BroadcastConfig {
    #[serde(default)]
    pub strategy: DeliveryStrategy,
}

impl BroadcastConfig {
    /// Chunked strategy with the given chunk size.
    pub fn chunked(chunk_size: usize) -> Self {
        Self {
            strategy: DeliveryStrategy::Chunked { chunk_size },
        }
    }

    /// Queued strategy with the given queue capacity, pool size and enqueue
    /// timeout.
    pub fn queued(capacity: usize, workers: usize, enqueue_timeout: Duration) -> Self {
        Self {
            strategy: DeliveryStrategy::Queued {
                capacity,
                workers,
                enqueue_timeout,
            },
        }
    }

    /// Queued strategy with default capacity, pool size and timeout.
    pub fn queued_default() -> Self {
        Self::queued(
            DEFAULT_QUEUE_CAPACITY,
            DEFAULT_WORKERS,
            DEFAULT_ENQUEUE_TIMEOUT,
        )
    }

    /// Rejects values no dispatcher can run with.
    pub fn validate(&self) -> Result<(), BroadcastError> {
        match self.strategy {
            DeliveryStrategy::Chunked { chunk_size: 0 } => Err(BroadcastError::Config(
                "chunk size must be greater than zero".into(),
            )),
            DeliveryStrategy::Queued { capacity: 0, .. } => Err(BroadcastError::Config(
                "queue capacity must be greater than zero".into(),
            )),
            DeliveryStrategy::Queued { workers: 0, .. } => Err(BroadcastError::Config(
                "worker pool must have at least one worker".into(),
            )),
            DeliveryStrategy::Queued {
                enqueue_timeout, ..
            } if enqueue_timeout.is_zero() => Err(BroadcastError::Config(
                "enqueue timeout must be greater than zero".into(),
            )),
            _ => Ok(()),
        }
    }

    /// Builds the dispatcher this configuration describes.
    ///
    /// The queued strategy spawns its workers here, so this must run inside
    /// a tokio runtime.
    pub fn build_dispatcher(&self) -> Result<Box<dyn Dispatcher>, BroadcastError> {
        self.validate()?;
        let dispatcher: Box<dyn Dispatcher> = match self.strategy {
            DeliveryStrategy::Chunked { chunk_size } => {
                Box::new(ChunkedDispatcher::new(chunk_size)?)
            }
            DeliveryStrategy::Queued {
                capacity,
                workers,
                enqueue_timeout,
            } => Box::new(QueuedDispatcher::new(capacity, workers, enqueue_timeout)?),
        };
        Ok(dispatcher)
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_enqueue_timeout() -> Duration {
    DEFAULT_ENQUEUE_TIMEOUT
}

fn millis<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}
