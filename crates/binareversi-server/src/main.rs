//! Binary Reversi game server.

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod protocol;
mod registry;
mod room;
mod server;
mod store;

use config::ServerConfig;
use server::ServerState;
use store::{MemoryRoomStore, RoomStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    info!("Starting Binary Reversi server...");

    let store: Arc<dyn RoomStore> = match &config.rooms_file {
        Some(path) => {
            let store = MemoryRoomStore::load(path)?;
            info!("Loaded {} rooms from {}", store.room_count(), path.display());
            Arc::new(store)
        }
        None => Arc::new(MemoryRoomStore::new()),
    };

    let state = Arc::new(ServerState::new(store, config));

    server::run_server(state).await
}
