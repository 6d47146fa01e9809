mod auth;
mod config;
mod files;
mod routes;
mod state;
mod store;
mod tasks;
mod ws;

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use config::{generate_config_template, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "taskhub_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "taskhub_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("taskhub server v{} starting", env!("CARGO_PKG_VERSION"));

    // The data directory holds the signing key and uploaded attachments
    std::fs::create_dir_all(&config.data_dir)?;
    let upload_dir = std::path::Path::new(&config.data_dir).join("uploads");
    std::fs::create_dir_all(&upload_dir)?;

    // Load or generate the JWT signing key (256-bit random, stored in data_dir)
    let jwt_secret = auth::jwt::load_or_generate_jwt_secret(&config.data_dir)?;

    // Build application state
    let app_state = state::AppState {
        store: store::Store::new(),
        jwt_secret,
        connections: Arc::new(ws::ConnectionRegistry::new()),
        upload_dir: upload_dir.to_string_lossy().into_owned(),
        max_upload_size_mb: config.max_upload_size_mb,
    };

    // Build router
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
