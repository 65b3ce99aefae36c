//! # roomcast
//!
//! Room-scoped broadcast for real-time socket servers.
//!
//! The crate tracks which live connections belong to which named rooms and
//! fans application events out to every member of a room, optionally
//! skipping the sender. Transports plug in through the [`conn::Socket`]
//! trait; everything else goes through [`engine::BroadcastEngine`].
//!
//! Two delivery strategies are available, see [`dispatch`]:
//!
//! - **chunked**: parallel emission over bounded chunks, `send` waits for
//!   every chunk to finish.
//! - **queued**: one bounded queue drained by a worker pool, `send` only
//!   waits for queue space and sheds load after a timeout.

pub mod config;
pub mod conn;
pub mod dispatch;
pub mod engine;
pub mod room;
pub mod types;

#[cfg(feature = "bench")]
pub mod bench_support;

#[cfg(test)]
mod tests;

pub use config::{BroadcastConfig, DeliveryStrategy};
pub use conn::{ChannelSocket, SharedSocket, Socket};
pub use engine::BroadcastEngine;
pub use types::{BroadcastError, DispatchReport, Event, SocketError, SocketId};
