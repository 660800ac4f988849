use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use meetpoint_backend::api;
use meetpoint_backend::auth::AuthService;
use meetpoint_backend::cache::{create_pool, RoomCache};
use meetpoint_backend::config::Config;
use meetpoint_backend::media::TokenIssuer;
use meetpoint_backend::service::{AccountService, RoomService};
use meetpoint_backend::state::AppState;
use meetpoint_backend::store::{ensure_indexes, MongoRoomStore, MongoUserStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting MeetPoint Backend...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!(
        host = %config.server_host,
        port = %config.server_port,
        "Configuration loaded"
    );

    // Connect to MongoDB (source of truth)
    let mongo = mongodb::Client::with_uri_str(&config.mongo_url).await?;
    let db = mongo.database(&config.mongo_db);
    ensure_indexes(&db).await?;
    tracing::info!(database = %config.mongo_db, "MongoDB connection established");

    // Create Redis connection pool (advisory cache)
    let redis_pool = create_pool(&config)?;
    let cache = Arc::new(RoomCache::new(redis_pool, config.room_cache_ttl_seconds));

    match cache.health_check().await {
        Ok(true) => tracing::info!("Redis connection established"),
        Ok(false) => tracing::warn!("Redis health check returned false"),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to connect to Redis, cache disabled until it recovers");
            // Continue anyway: the cache is best-effort
        }
    }

    // Wire up services
    let auth = Arc::new(AuthService::new(&config));
    let tokens = Arc::new(TokenIssuer::new(&config));
    let accounts = AccountService::new(Arc::new(MongoUserStore::new(&db)), auth.clone());
    let rooms = RoomService::new(
        Arc::new(MongoRoomStore::new(&db)),
        Some(cache.clone()),
        tokens,
    );

    let state = AppState::new(config.clone(), auth, accounts, rooms, cache);

    // Build router
    let app = api::create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = config.server_addr().parse()?;
    let listener = TcpListener::bind(addr).await?;

    tracing::info!(address = %addr, "Server listening");

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Handle shutdown signals
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
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down...");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down...");
        },
    }
}
