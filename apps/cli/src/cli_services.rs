use std::sync::Arc;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tessera_application::{AuthorizationService, SubtreeDeleteResolver};
use tessera_core::AppError;
use tessera_infrastructure::{
    InMemoryPermissionSetCache, PostgresAuditRepository, PostgresObjectLister,
    PostgresPermissionStore,
};

use crate::cli_config::{CliConfig, DecisionCacheMode};

pub async fn connect_and_migrate(config: &CliConfig) -> Result<PgPool, AppError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    Ok(pool)
}

pub struct CliServices {
    pub authorization_service: AuthorizationService,
    pub subtree_delete_resolver: SubtreeDeleteResolver,
}

impl CliServices {
    pub fn build(config: &CliConfig, pool: PgPool) -> Self {
        let mut authorization_service = AuthorizationService::new(
            Arc::new(PostgresPermissionStore::new(pool.clone())),
            Arc::new(PostgresAuditRepository::new(pool.clone())),
        )
        .with_config(config.evaluation);

        if config.decision_cache == DecisionCacheMode::Memory {
            authorization_service = authorization_service
                .with_permission_cache(Arc::new(InMemoryPermissionSetCache::new()));
        }

        let subtree_delete_resolver = SubtreeDeleteResolver::new(
            authorization_service.clone(),
            Arc::new(PostgresObjectLister::new(pool)),
        )
        .with_limits(config.subtree_limits);

        Self {
            authorization_service,
            subtree_delete_resolver,
        }
    }
}
