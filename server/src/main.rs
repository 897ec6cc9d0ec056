use std::net::SocketAddr;
use tokio::net::TcpListener;

use clap::Parser;

use messenger_server::config::{generate_config_template, Cli, Config};
use messenger_server::{auth, db, routes, state};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Handle --generate-config: print template and exit
    if cli.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load(&cli)?;

    let env_filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("messenger_server=info,tower_http=info")
            })
    };
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter())
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(env_filter())
            .init();
    }

    tracing::info!(
        "Messenger server v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    // Initialize SQLite database
    let db = db::init_db(&config.data_dir)?;

    // Load or generate JWT signing key (256-bit random, stored in data_dir)
    let jwt_secret = auth::jwt::load_or_generate_jwt_secret(&config.data_dir)?;

    match config.conversation_window {
        Some(window) => tracing::info!(window, "Conversation list scans recent messages only"),
        None => tracing::info!("Conversation list scans full history"),
    }

    let app_state = state::AppState::new(db, jwt_secret, &config);
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
