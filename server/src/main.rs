mod admin;
mod audit;
mod auth;
mod config;
mod db;
mod error;
mod moderation;
mod roles;
mod routes;
mod state;
mod tags;
mod users;

use std::net::SocketAddr;

use tokio::net::TcpListener;

use audit::AuditSink;
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
                    .unwrap_or_else(|_| "lorekeep_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "lorekeep_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("LOREKEEP server v{} starting", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite database
    let db = db::init_db(&config.data_dir)?;

    // Load or generate JWT signing key (256-bit random, stored in data_dir)
    let jwt_secret = auth::jwt::load_or_generate_jwt_secret(&config.data_dir)?;

    // Check for first-boot setup token
    match admin::setup::maybe_generate_setup_token(&db)? {
        Some(token) => {
            tracing::info!("==========================================================");
            tracing::info!("  FIRST BOOT: No users registered yet.");
            tracing::info!("  Setup token: {}", token);
            tracing::info!("  The first account registered with this token becomes");
            tracing::info!("  the server OWNER.");
            tracing::info!("==========================================================");
        }
        None => {
            tracing::info!("Server has existing users, setup complete");
        }
    }

    // Build application state
    let audit_config = config.audit.clone().unwrap_or_default();
    let app_state = state::AppState {
        db,
        jwt_secret,
        registration_mode: config.registration_mode.clone(),
        audit: AuditSink::new(audit_config.tag_storage),
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
