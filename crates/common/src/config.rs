use serde::Deserialize;

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Redis connection string
    pub redis_url: String,

    /// Base URL of the external notification gateway
    pub gateway_base_url: String,

    /// API key for the notification gateway
    pub gateway_api_key: Option<String>,

    /// Per-call timeout for gateway requests in seconds (default: 15)
    pub gateway_timeout_secs: u64,

    /// Maximum recipients per dispatched batch (default: 100)
    pub batch_size: usize,

    /// JWT secret for API authentication
    pub jwt_secret: String,

    /// JWT token expiry in hours
    pub jwt_expiry_hours: u64,

    /// Resend API key for digest email delivery
    pub resend_api_key: Option<String>,

    /// Email sender address for digest mail
    pub email_from: Option<String>,

    /// Recipient address of the daily HR-question digest
    pub digest_recipient: Option<String>,

    /// Operator address for best-effort failure alerts
    pub alert_recipient: Option<String>,

    /// IANA time zone the digest day is computed in (default: Europe/Berlin)
    pub digest_zone: String,

    /// Local hour (0-23) after which the scheduled digest may fire (default: 18)
    pub digest_send_hour: u32,

    /// Digest scheduler cadence in seconds (default: 900)
    pub digest_check_interval_secs: u64,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            gateway_base_url: std::env::var("GATEWAY_BASE_URL").map_err(|_| {
                anyhow::anyhow!("GATEWAY_BASE_URL environment variable is required")
            })?,
            gateway_api_key: std::env::var("GATEWAY_API_KEY").ok(),
            gateway_timeout_secs: std::env::var("GATEWAY_TIMEOUT_SECS")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("GATEWAY_TIMEOUT_SECS must be a valid u64"))?,
            batch_size: std::env::var("DISPATCH_BATCH_SIZE")
                .unwrap_or_else(|_| "100".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DISPATCH_BATCH_SIZE must be a valid usize"))?,
            jwt_secret: std::env::var("JWT_SECRET")
                .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?,
            jwt_expiry_hours: std::env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("JWT_EXPIRY_HOURS must be a valid u64"))?,
            resend_api_key: std::env::var("RESEND_API_KEY").ok(),
            email_from: std::env::var("EMAIL_FROM").ok(),
            digest_recipient: std::env::var("DIGEST_RECIPIENT").ok(),
            alert_recipient: std::env::var("ALERT_RECIPIENT").ok(),
            digest_zone: std::env::var("DIGEST_ZONE")
                .unwrap_or_else(|_| "Europe/Berlin".to_string()),
            digest_send_hour: std::env::var("DIGEST_SEND_HOUR")
                .unwrap_or_else(|_| "18".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DIGEST_SEND_HOUR must be a valid hour (0-23)"))?,
            digest_check_interval_secs: std::env::var("DIGEST_CHECK_INTERVAL_SECS")
                .unwrap_or_else(|_| "900".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DIGEST_CHECK_INTERVAL_SECS must be a valid u64"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
        })
    }
}
