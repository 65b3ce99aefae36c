#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use serde_json::json;
    use tokio::time::timeout;

    use crate::{
        conn::{ChannelSocket, ConnState, Socket},
        types::{Event, SocketError},
    };

    #[tokio::test]
    async fn test_channel_socket_creation() {
        let (socket, _rx) = ChannelSocket::new("conn-42", 8);

        assert_eq!(socket.id().as_str(), "conn-42");
        assert_eq!(socket.state().await, ConnState::Open);
    }

    #[tokio::test]
    async fn test_emit_reaches_receiver() {
        let (socket, mut rx) = ChannelSocket::new("conn-1", 8);

        socket
            .emit("greeting", &[json!("hello"), json!({"n": 1})])
            .await
            .expect("emit should succeed");

        let received = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("event should arrive")
            .expect("channel should be open");
        assert_eq!(
            received,
            Event::new("greeting", vec![json!("hello"), json!({"n": 1})])
        );
    }

    #[tokio::test]
    async fn test_emit_on_full_buffer_reports_backpressure() {
        let (socket, mut rx) = ChannelSocket::new("conn-1", 1);

        socket.emit("one", &[]).await.unwrap();
        assert_eq!(
            socket.emit("two", &[]).await,
            Err(SocketError::Backpressure)
        );

        // Draining frees the slot again.
        assert_eq!(rx.recv().await.unwrap().name, "one");
        socket.emit("three", &[]).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().name, "three");
    }

    #[tokio::test]
    async fn test_emit_after_disconnect_fails() {
        let (socket, mut rx) = ChannelSocket::new("conn-1", 4);

        socket.disconnect().await;
        socket.disconnect().await;

        assert_eq!(socket.state().await, ConnState::Closed);
        assert_eq!(socket.emit("late", &[]).await, Err(SocketError::Closed));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_emit_after_receiver_dropped_fails() {
        let (socket, rx) = ChannelSocket::new("conn-1", 4);
        drop(rx);

        assert_eq!(socket.state().await, ConnState::Closed);
        assert_eq!(socket.emit("late", &[]).await, Err(SocketError::Closed));
    }

    #[tokio::test]
    async fn test_leave_hook_is_idempotent() {
        let (socket, mut rx) = ChannelSocket::new("conn-1", 4);

        socket.leave("room").await;
        socket.leave("room").await;

        assert_eq!(socket.state().await, ConnState::Open);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_concurrent_emits() {
        let (socket, mut rx) = ChannelSocket::shared("conn-1", 64);

        let tasks: Vec<_> = (0..5)
            .map(|i| {
                let socket = Arc::clone(&socket);
                tokio::spawn(async move {
                    socket
                        .emit("message", &[json!(i)])
                        .await
                        .expect("emit should succeed");
                })
            })
            .collect();
        for task in tasks {
            task.await.expect("task should complete");
        }

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            seen.push(event.args[0].as_i64().unwrap());
        }
        seen.sort();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }
}
