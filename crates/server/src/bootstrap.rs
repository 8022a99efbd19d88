use std::sync::Arc;

use axum::Router;
use basket_core::config::{AppConfig, ConfigError, LoadOptions};
use basket_db::{
    connect_with_config, migrations, DbPool, SqlTransactionRepository, TransactionRepository,
};
use thiserror::Error;
use tracing::info;

use crate::{api, health};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub repository: Arc<dyn TransactionRepository>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

impl Application {
    /// API routes plus `/health`, sharing the bootstrapped pool.
    pub fn router(&self) -> Router {
        let state = api::ApiState::new(Arc::clone(&self.repository), self.config.mining.clone());
        api::router(state)
            .merge(health::router(self.db_pool.clone(), Arc::clone(&self.repository)))
    }
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    config.validate()?;

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        max_connections = config.database.max_connections,
        "database connection pool ready"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let repository: Arc<dyn TransactionRepository> =
        Arc::new(SqlTransactionRepository::new(db_pool.clone()));

    info!(
        event_name = "system.bootstrap.complete",
        correlation_id = "bootstrap",
        cache_enabled = config.mining.cache_enabled,
        "application bootstrap complete"
    );

    Ok(Application { config, db_pool, repository })
}
