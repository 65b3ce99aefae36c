mod conn_test;

pub(crate) mod support {
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
        time::Duration,
    };

    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::Semaphore;

    use crate::{
        conn::{SharedSocket, Socket},
        room::RoomRegistry,
        types::{SocketError, SocketId},
    };

    /// Lets a test hold a socket inside `emit` until it is released.
    #[derive(Debug)]
    pub(crate) struct Gate {
        started: Semaphore,
        release: Semaphore,
    }

    impl Gate {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self {
                started: Semaphore::new(0),
                release: Semaphore::new(0),
            })
        }

        pub(crate) async fn wait_started(&self) {
            self.started.acquire().await.unwrap().forget();
        }

        pub(crate) fn open(&self) {
            self.release.add_permits(Semaphore::MAX_PERMITS / 2);
        }
    }

    /// Order in which sockets sharing the log were emitted to.
    pub(crate) type EmitLog = Arc<Mutex<Vec<SocketId>>>;

    /// Socket double that records every call made on it.
    #[derive(Debug)]
    pub(crate) struct RecordingSocket {
        id: SocketId,
        emits: Mutex<Vec<(String, Vec<Value>)>>,
        leaves: Mutex<Vec<String>>,
        disconnects: AtomicUsize,
        delay: Option<Duration>,
        failing: bool,
        gate: Option<Arc<Gate>>,
        log: Option<EmitLog>,
    }

    impl RecordingSocket {
        pub(crate) fn new(id: &str) -> Arc<Self> {
            Arc::new(Self::build(id))
        }

        pub(crate) fn slow(id: &str, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                delay: Some(delay),
                ..Self::build(id)
            })
        }

        pub(crate) fn failing(id: &str) -> Arc<Self> {
            Arc::new(Self {
                failing: true,
                ..Self::build(id)
            })
        }

        pub(crate) fn gated(id: &str, gate: Arc<Gate>) -> Arc<Self> {
            Arc::new(Self {
                gate: Some(gate),
                ..Self::build(id)
            })
        }

        pub(crate) fn logged(id: &str, log: EmitLog) -> Arc<Self> {
            Arc::new(Self {
                log: Some(log),
                ..Self::build(id)
            })
        }

        fn build(id: &str) -> Self {
            Self {
                id: SocketId::from(id),
                emits: Mutex::new(Vec::new()),
                leaves: Mutex::new(Vec::new()),
                disconnects: AtomicUsize::new(0),
                delay: None,
                failing: false,
                gate: None,
                log: None,
            }
        }

        pub(crate) fn emits(&self) -> Vec<(String, Vec<Value>)> {
            self.emits.lock().unwrap().clone()
        }

        pub(crate) fn emit_count(&self) -> usize {
            self.emits.lock().unwrap().len()
        }

        pub(crate) fn leaves(&self) -> Vec<String> {
            self.leaves.lock().unwrap().clone()
        }

        pub(crate) fn disconnects(&self) -> usize {
            self.disconnects.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Socket for RecordingSocket {
        fn id(&self) -> &SocketId {
            &self.id
        }

        async fn emit(&self, event: &str, args: &[Value]) -> Result<(), SocketError> {
            if let Some(gate) = &self.gate {
                gate.started.add_permits(1);
                gate.release.acquire().await.unwrap().forget();
            }
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.failing {
                return Err(SocketError::Transport("write failed".into()));
            }
            if let Some(log) = &self.log {
                log.lock().unwrap().push(self.id.clone());
            }
            self.emits
                .lock()
                .unwrap()
                .push((event.to_owned(), args.to_vec()));
            Ok(())
        }

        async fn leave(&self, room: &str) {
            self.leaves.lock().unwrap().push(room.to_owned());
        }

        async fn disconnect(&self) {
            self.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Socket whose `emit` panics, standing in for a buggy transport.
    pub(crate) struct PanickingSocket {
        id: SocketId,
    }

    impl PanickingSocket {
        pub(crate) fn new(id: &str) -> Arc<Self> {
            Arc::new(Self {
                id: SocketId::from(id),
            })
        }
    }

    #[async_trait]
    impl Socket for PanickingSocket {
        fn id(&self) -> &SocketId {
            &self.id
        }

        async fn emit(&self, _event: &str, _args: &[Value]) -> Result<(), SocketError> {
            panic!("transport blew up");
        }

        async fn leave(&self, _room: &str) {}

        async fn disconnect(&self) {}
    }

    /// Socket whose teardown hook leaves every other room it is in, the
    /// way a transport cleans up a kicked connection.
    pub(crate) struct ReentrantSocket {
        id: SocketId,
        registry: Arc<RoomRegistry>,
    }

    impl ReentrantSocket {
        pub(crate) fn new(id: &str, registry: Arc<RoomRegistry>) -> Arc<Self> {
            Arc::new(Self {
                id: SocketId::from(id),
                registry,
            })
        }
    }

    #[async_trait]
    impl Socket for ReentrantSocket {
        fn id(&self) -> &SocketId {
            &self.id
        }

        async fn emit(&self, _event: &str, _args: &[Value]) -> Result<(), SocketError> {
            Ok(())
        }

        async fn leave(&self, _room: &str) {
            self.registry.leave_all(self).await;
        }

        async fn disconnect(&self) {}
    }

    pub(crate) fn shared<S: Socket + 'static>(socket: &Arc<S>) -> SharedSocket {
        Arc::clone(socket) as SharedSocket
    }

    pub(crate) fn recording_room(prefix: &str, n: usize) -> Vec<Arc<RecordingSocket>> {
        (0..n)
            .map(|i| RecordingSocket::new(&format!("{prefix}-{i}")))
            .collect()
    }
}
