//! Shared application state for the Axum API server.

use std::sync::Arc;

use redis::aio::ConnectionManager;
use sqlx::PgPool;

use herald_common::config::AppConfig;
use herald_digest::scheduler::DigestScheduler;
use herald_dispatch::service::DispatchService;
use herald_gateway::NotificationGateway;

/// Application state shared across all route handlers via Axum `State`.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub redis: ConnectionManager,
    pub config: AppConfig,
    pub gateway: Arc<dyn NotificationGateway>,
    pub dispatch: Arc<DispatchService>,
    /// `None` when the digest mail settings are not configured; the
    /// force-run route then answers with a configuration error.
    pub digest: Option<Arc<DigestScheduler>>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        redis: ConnectionManager,
        config: AppConfig,
        gateway: Arc<dyn NotificationGateway>,
        digest: Option<Arc<DigestScheduler>>,
    ) -> Self {
        let dispatch = Arc::new(DispatchService::new(gateway.clone(), config.batch_size));
        Self {
            pool,
            redis,
            config,
            gateway,
            dispatch,
            digest,
        }
    }
}
