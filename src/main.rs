//! Application entry point and server initialization
//!
//! This module contains the main function that:
//! - Loads environment configuration
//! - Initializes the database and the dashboard account
//! - Starts the HTTP server with graceful shutdown support

use dotenvy::dotenv;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use jewellery_catalogue::auth::ensure_admin;
use jewellery_catalogue::config::AppConfig;
use jewellery_catalogue::database::{init_db, AppState};
use jewellery_catalogue::route::create_app;

/// Application entry point
///
/// See [`AppConfig::from_env`] for the environment variables read at startup.
/// `RUST_LOG` overrides the default log filter.
#[tokio::main]
async fn main() {
    // Load environment variables from .env file if it exists
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("jewellery_catalogue=debug,tower_http=debug")),
        )
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");

    let db = init_db(&config.database_url).expect("Failed to initialize database");

    if let Some((username, password)) = config.admin_credentials() {
        ensure_admin(&db, username, password).expect("Failed to provision admin account");
        info!(username = %username, "admin account provisioned");
    }

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .expect("Failed to create upload directory");

    let addr = config.bind_addr();
    let db_name = config.database_url.clone();
    let state = AppState::new(db, config);

    let app = create_app(state).layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(&addr).await.expect("Failed to bind address");

    info!("Server running at http://{}", addr);
    info!("Using database: {}", db_name);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");
}

/// Resolves on SIGINT (Ctrl+C) or, on Unix, SIGTERM.
///
/// In-flight requests are allowed to finish so no redb write transaction is
/// cut off mid-commit.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server");
}
