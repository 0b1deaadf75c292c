//! Herald API server binary entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use herald_common::config::AppConfig;
use herald_common::db::{create_pool, run_migrations};
use herald_common::redis_pool::create_redis_pool;
use herald_digest::mailer::ResendMailer;
use herald_digest::scheduler::{DigestScheduler, DigestSettings};
use herald_gateway::HttpGateway;

use herald_api::routes::create_router;
use herald_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("herald_api=debug,herald_dispatch=debug,tower_http=debug")
        }))
        .init();

    tracing::info!("Starting Herald API server...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Create database connection pool
    let pool = create_pool(&config.database_url, config.db_max_connections).await?;
    tracing::info!("Database pool created");

    // Run migrations
    run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    // Create Redis connection
    let redis = create_redis_pool(&config.redis_url).await?;
    tracing::info!("Redis connection established");

    // Notification gateway client
    let gateway = Arc::new(HttpGateway::new(
        config.gateway_base_url.clone(),
        config.gateway_api_key.clone(),
        config.gateway_timeout_secs,
    )?);

    // Digest scheduler for manual force-runs, when mail is configured
    let digest = build_digest(&config, &pool, &redis)?;
    if digest.is_none() {
        tracing::warn!("Digest mail not configured, /api/digest/run is disabled");
    }

    // Build application state
    let state = AppState::new(pool, redis, config, gateway, digest);

    // Build router
    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("API server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Assemble the digest scheduler when all mail settings are present.
fn build_digest(
    config: &AppConfig,
    pool: &sqlx::PgPool,
    redis: &redis::aio::ConnectionManager,
) -> anyhow::Result<Option<Arc<DigestScheduler>>> {
    let (Some(api_key), Some(from), Some(recipient)) = (
        config.resend_api_key.clone(),
        config.email_from.clone(),
        config.digest_recipient.clone(),
    ) else {
        return Ok(None);
    };

    let zone: chrono_tz::Tz = config
        .digest_zone
        .parse()
        .map_err(|_| anyhow::anyhow!("DIGEST_ZONE is not a valid IANA time zone"))?;

    Ok(Some(Arc::new(DigestScheduler::new(
        pool.clone(),
        redis.clone(),
        ResendMailer::new(api_key, from),
        DigestSettings {
            recipient,
            alert_recipient: config.alert_recipient.clone(),
            zone,
            send_hour: config.digest_send_hour,
            check_interval_secs: config.digest_check_interval_secs,
        },
    ))))
}
