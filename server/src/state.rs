use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::chat::Hub;
use crate::config::Config;
use crate::db::DbPool;
use crate::store::SqliteStore;
use crate::ws::actor::Heartbeat;
use crate::ws::ConnectionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Typed access to users, contacts and messages
    pub store: Arc<SqliteStore>,
    /// Presence and fan-out hub shared by the socket and REST handlers
    pub hub: Hub,
    /// Active WebSocket connection per user
    pub connections: ConnectionRegistry,
    /// JWT signing secret (256-bit random key)
    pub jwt_secret: Vec<u8>,
    pub jwt_expiry_minutes: i64,
    /// Root for persisted uploads
    pub data_dir: PathBuf,
    pub max_avatar_size_kb: usize,
    pub auth_rate_limit_burst: u32,
    /// Server ping cadence and pong deadline for every socket
    pub heartbeat: Heartbeat,
    pub cors_allowed_origins: Vec<String>,
}

impl AppState {
    pub fn new(db: DbPool, jwt_secret: Vec<u8>, config: &Config) -> Self {
        let store = Arc::new(SqliteStore::new(db));
        let connections = ConnectionRegistry::new();
        let hub = Hub::new(connections.clone(), store.clone(), store.clone())
            .with_conversation_window(config.conversation_window);

        Self {
            store,
            hub,
            connections,
            jwt_secret,
            jwt_expiry_minutes: config.jwt_expiry_minutes,
            data_dir: PathBuf::from(&config.data_dir),
            max_avatar_size_kb: config.max_avatar_size_kb,
            auth_rate_limit_burst: config.auth_rate_limit_burst,
            heartbeat: Heartbeat {
                interval: Duration::from_secs(config.ws_ping_interval_secs.max(1)),
                pong_timeout: Duration::from_secs(config.ws_pong_timeout_secs.max(1)),
            },
            cors_allowed_origins: config.cors_allowed_origins.clone(),
        }
    }
}
