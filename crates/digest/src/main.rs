use herald_common::config::AppConfig;
use herald_common::{db, redis_pool};
use herald_digest::mailer::ResendMailer;
use herald_digest::scheduler::{DigestScheduler, DigestSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herald_digest=info".into()),
        )
        .json()
        .init();

    tracing::info!("Herald digest daemon starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    let api_key = config
        .resend_api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("RESEND_API_KEY is required for the digest daemon"))?;
    let from = config
        .email_from
        .clone()
        .ok_or_else(|| anyhow::anyhow!("EMAIL_FROM is required for the digest daemon"))?;
    let recipient = config
        .digest_recipient
        .clone()
        .ok_or_else(|| anyhow::anyhow!("DIGEST_RECIPIENT is required for the digest daemon"))?;
    let zone: chrono_tz::Tz = config
        .digest_zone
        .parse()
        .map_err(|_| anyhow::anyhow!("DIGEST_ZONE is not a valid IANA time zone"))?;

    // Connect to database
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    // Connect to Redis for the run-lock
    let redis = redis_pool::create_redis_pool(&config.redis_url).await?;

    let scheduler = DigestScheduler::new(
        pool,
        redis,
        ResendMailer::new(api_key, from),
        DigestSettings {
            recipient,
            alert_recipient: config.alert_recipient.clone(),
            zone,
            send_hour: config.digest_send_hour,
            check_interval_secs: config.digest_check_interval_secs,
        },
    );

    // Run with graceful shutdown on Ctrl+C
    tokio::select! {
        result = scheduler.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Digest scheduler exited with error");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping gracefully...");
        }
    }

    tracing::info!("Herald digest daemon stopped.");
    Ok(())
}
