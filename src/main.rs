use collab_session::clients::app_service_client::AppServiceClient;
use collab_session::config::Config;
use collab_session::db::dbdocs::DbDocs;
use collab_session::db::memory::{MemoryDocumentStore, MemoryUserDirectory};
use collab_session::services::auth_service::JwtIdentityGate;
use collab_session::services::doc_store_service::DocumentStore;
use collab_session::services::user_service::{CachedUserDirectory, UserDirectory};
use collab_session::{build_router, AppState};
use std::panic;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {

    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "collab_session=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    let Some(jwt_secret) = config.jwt_secret.clone() else {
        error!("JWT_SECRET is not configured, refusing to start");
        std::process::exit(1);
    };

    // Initialize database connection if URL is provided
    let db = match &config.db_url {
        Some(db_url) => match DbDocs::connect(db_url, config.db_max_connections).await {
            Ok(db) => {
                info!("Database initialized successfully");
                Some(Arc::new(db))
            }
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                std::process::exit(1);
            }
        },
        None => {
            warn!("No database URL configured - documents and users are kept in memory only");
            None
        }
    };

    let documents: Arc<dyn DocumentStore> = match &db {
        Some(db) => db.clone(),
        None => Arc::new(MemoryDocumentStore::new()),
    };

    let directory: Arc<dyn UserDirectory> = match (&config.app_service_url, &db) {
        (Some(url), _) => match AppServiceClient::new(url.clone(), jwt_secret.clone(), config.service_name.clone()) {
            Ok(client) => {
                info!("Resolving users through app service at {}", url);
                Arc::new(client)
            }
            Err(e) => {
                error!("Failed to build app service client: {}", e);
                std::process::exit(1);
            }
        },
        (None, Some(db)) => db.clone(),
        (None, None) => Arc::new(MemoryUserDirectory::new()),
    };
    let users = Arc::new(CachedUserDirectory::new(directory, config.user_cache_ttl()));

    let address = config.server_address();
    let app = Arc::new(AppState::new(
        config,
        Arc::new(JwtIdentityGate::new(&jwt_secret)),
        users,
        documents,
    ));
    let app_routes = build_router(app);

    // Start the HTTP/API server
    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", address, e);
            std::process::exit(1);
        }
    };

    info!("Server running on http://{}", address);
    info!("WebSocket available at ws://{}/ws", address);
    info!("Swagger UI available at http://{}/swagger", address);

    if let Err(e) = axum::serve(listener, app_routes)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    }
    info!("Server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, shutting down gracefully...");
}
