use std::sync::Arc;

use archive_service::config::Config;
use archive_service::db::Database;
use archive_service::services::{
    EmailService, GoogleOAuth, MemorySessionStore, RedisSessionStore, SessionStore,
};
use archive_service::{build_router, AppState};
use media_store::{MediaStore, MemoryMediaStore, S3MediaStore};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::load()?;
    tracing::info!("Configuration loaded successfully");

    let db = Database::connect(&config).await?;
    db.run_migrations().await?;

    let sessions: Arc<dyn SessionStore> = if config.redis.url.trim().is_empty() {
        tracing::warn!("redis.url not set; using in-process session store");
        Arc::new(MemorySessionStore::new())
    } else {
        Arc::new(RedisSessionStore::connect(&config.redis.url).await?)
    };

    let media: Arc<dyn MediaStore> = if config.storage.bucket.trim().is_empty() {
        tracing::warn!("storage.bucket not set; media is kept in memory only");
        Arc::new(MemoryMediaStore::new(config.storage.base_url.clone()))
    } else {
        tracing::info!(bucket = %config.storage.bucket, "using S3 media store");
        Arc::new(S3MediaStore::new(config.storage.clone()).await)
    };

    let email = EmailService::new(&config.email)?;
    let oauth = GoogleOAuth::new(&config.google)?;

    let state = AppState {
        db,
        config: config.clone(),
        sessions,
        media,
        email,
        oauth,
    };

    let app = build_router(state)?;

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "archive_service=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
