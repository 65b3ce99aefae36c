use std::time::Duration;

use roomcast::{BroadcastConfig, BroadcastEngine, ChannelSocket, Socket};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MEMBERS: usize = 1200;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1).as_deref() {
        Some("queued") => BroadcastConfig::queued_default(),
        _ => BroadcastConfig::default(),
    };
    let engine = BroadcastEngine::new(config)?;

    let mut drains = Vec::with_capacity(MEMBERS);
    let mut sockets = Vec::with_capacity(MEMBERS);
    for i in 0..MEMBERS {
        let (socket, mut rx) = ChannelSocket::shared(format!("socket-{i}"), 8);
        engine.join("lobby", &socket).await?;
        sockets.push(socket);
        drains.push(tokio::spawn(async move {
            let mut received = 0usize;
            while rx.recv().await.is_some() {
                received += 1;
            }
            received
        }));
    }
    info!(room = "lobby", members = engine.len("lobby").await, "room ready");

    let sender = sockets[0].as_ref();
    engine
        .send(Some(sender), "lobby", "chat message", vec![json!("hello"), json!(1)])
        .await?;

    // Queued deliveries land asynchronously.
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.shutdown().await;

    for socket in &sockets {
        engine.leave("lobby", socket.as_ref()).await?;
        socket.disconnect().await;
    }

    let mut delivered = 0;
    for drain in drains {
        delivered += drain.await?;
    }
    info!(delivered, rooms = engine.rooms().await.len(), "done");
    Ok(())
}
