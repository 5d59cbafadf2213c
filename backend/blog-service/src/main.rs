use actix_web::{web, HttpServer};
use anyhow::{Context, Result};
use blog_service::config::{PageCacheBackend, StorageBackend};
use blog_service::db::{BlogRepository, InMemoryBlogRepository, PgBlogRepository, MIGRATOR};
use blog_service::{build_app, AppState, Config};
use db_pool::{create_pool, DbConfig};
use page_cache::{MemoryPageStore, PageStore, RedisPageStore};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "info,actix_web=info,sqlx=warn";

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
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

async fn open_repository(config: &Config) -> Result<Arc<dyn BlogRepository>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-process storage; data is lost on restart");
            Ok(Arc::new(InMemoryBlogRepository::new()))
        }
        StorageBackend::Postgres => {
            let db_cfg = DbConfig::from_env("blog-service")
                .map_err(|e| anyhow::anyhow!("Failed to load database configuration: {}", e))?;
            db_cfg.log_config();

            let pool = create_pool(db_cfg)
                .await
                .context("Failed to create database pool")?;
            MIGRATOR
                .run(&pool)
                .await
                .context("Failed to run database migrations")?;
            tracing::info!("Database migrations applied");

            Ok(Arc::new(PgBlogRepository::new(pool)))
        }
    }
}

async fn open_page_store(config: &Config) -> Result<Arc<dyn PageStore>> {
    match config.cache.backend {
        PageCacheBackend::Redis => {
            let url = config
                .cache
                .redis_url
                .as_deref()
                .context("REDIS_URL is required for the redis page cache")?;
            let store = RedisPageStore::connect(url)
                .await
                .context("Failed to connect to Redis")?;
            store.ping().await.context("Redis ping failed")?;
            tracing::info!("Page cache backed by Redis");
            Ok(Arc::new(store))
        }
        PageCacheBackend::Memory => Ok(Arc::new(MemoryPageStore::new())),
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = terminate.recv() => {},
                }
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = Config::from_env()
        .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    tracing::info!("Starting blog-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.app.env);

    let repo = open_repository(&config).await?;
    let pages = open_page_store(&config).await?;
    let state = web::Data::new(AppState::new(&config, repo, pages));

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    tracing::info!("Starting HTTP server at {}", bind_address);

    let server = HttpServer::new(move || build_app(state.clone()))
        .bind(&bind_address)
        .context("Failed to bind HTTP server")?
        .run();
    let server_handle = server.handle();

    tokio::select! {
        result = server => {
            result.map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;
        }
        _ = shutdown_signal() => {
            tracing::info!("Shutdown signal received");
            server_handle.stop(true).await;
        }
    }

    tracing::info!("blog-service stopped");
    Ok(())
}
