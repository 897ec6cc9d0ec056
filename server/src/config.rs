use clap::Parser;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Command-line flags. Every setting is optional so that only flags the
/// user actually passed override the TOML file and environment.
#[derive(Parser, Serialize, Debug, Default)]
#[command(name = "messenger-server", version, about = "One-to-one messenger server")]
pub struct Cli {
    /// Port to listen on
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,

    /// Path to TOML config file
    #[arg(long, default_value = "./messenger.toml")]
    #[serde(skip)]
    pub config: String,

    /// Enable structured JSON logging (for Docker/production)
    #[arg(long)]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub json_logs: bool,

    /// Output a commented TOML config template and exit
    #[arg(long)]
    #[serde(skip)]
    pub generate_config: bool,

    /// Data directory for persistent state (DB, JWT key, uploads)
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<String>,

    /// Access token lifetime in minutes
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwt_expiry_minutes: Option<i64>,

    /// Scan only the N most recent messages when building the conversation
    /// list. Unset scans the full history.
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_window: Option<usize>,

    /// Maximum profile picture size in KiB
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_avatar_size_kb: Option<usize>,

    /// Burst size of the per-IP rate limit on register/login
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_rate_limit_burst: Option<u32>,

    /// Seconds between server pings on each WebSocket
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_ping_interval_secs: Option<u64>,

    /// Seconds to wait for a pong before dropping the connection
    #[arg(long)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ws_pong_timeout_secs: Option<u64>,

    /// Origins allowed to call the API from a browser (comma separated)
    #[arg(long, value_delimiter = ',')]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors_allowed_origins: Option<Vec<String>>,
}

/// Effective server settings after all layers are merged.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub json_logs: bool,
    pub data_dir: String,
    pub jwt_expiry_minutes: i64,
    pub conversation_window: Option<usize>,
    pub max_avatar_size_kb: usize,
    pub auth_rate_limit_burst: u32,
    pub ws_ping_interval_secs: u64,
    pub ws_pong_timeout_secs: u64,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            bind_address: "0.0.0.0".to_string(),
            json_logs: false,
            data_dir: "./data".to_string(),
            jwt_expiry_minutes: 1440,
            conversation_window: None,
            max_avatar_size_kb: 5120,
            auth_rate_limit_burst: 5,
            ws_ping_interval_secs: 30,
            ws_pong_timeout_secs: 10,
            cors_allowed_origins: vec!["http://localhost:3000".to_string()],
        }
    }
}

impl Config {
    /// Load config with layered precedence:
    /// built-in defaults < TOML file < env vars (MESSENGER_*) < CLI args
    pub fn load(cli: &Cli) -> Result<Self, figment::Error> {
        Self::figment(cli).extract()
    }

    fn figment(cli: &Cli) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&cli.config))
            .merge(Env::prefixed("MESSENGER_"))
            .merge(Serialized::defaults(cli))
    }
}

/// Generate a commented TOML config template
pub fn generate_config_template() -> String {
    r#"# Messenger Server Configuration
# Place this file at ./messenger.toml or specify with --config <path>
# All settings can be overridden via environment variables (MESSENGER_PORT, etc.)
# or CLI flags (--port, etc.)

# Server port (default: 5000)
# port = 5000

# Bind address (default: 0.0.0.0, all interfaces)
# bind_address = "0.0.0.0"

# Enable structured JSON logging for Docker/production
# json_logs = false

# Data directory for the SQLite database, JWT signing key and uploads
# data_dir = "./data"

# Access token lifetime in minutes (default: 1440 = 24 hours)
# jwt_expiry_minutes = 1440

# Number of recent messages scanned when building the conversation list.
# Leave unset to scan the whole history so no conversation is ever dropped.
# conversation_window = 20

# Maximum profile picture upload size in KiB (default: 5120)
# max_avatar_size_kb = 5120

# Per-IP burst allowance on /api/user/register and /api/user/login
# auth_rate_limit_burst = 5

# WebSocket heartbeat: ping every N seconds, drop the connection when no
# pong arrives within the timeout
# ws_ping_interval_secs = 30
# ws_pong_timeout_secs = 10

# Browser origins allowed to call the API (env: MESSENGER_CORS_ALLOWED_ORIGINS='["a","b"]')
# cors_allowed_origins = ["http://localhost:3000"]
"#
    .to_string()
}
