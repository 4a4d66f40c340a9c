use std::sync::Arc;
use std::time::Duration;

use tessera_core::{AccountId, AppError, AppResult};
use tessera_domain::EffectivePermissionSet;
use tracing::warn;

use crate::{AuditRepository, PermissionLookup, PermissionSetCache, PermissionStore};

mod bulk;
mod permissions;


/// Runtime bounds for permission evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationConfig {
    /// Upper bound for one permission store round trip.
    pub timeout: Duration,
    /// Maximum number of paths accepted by one bulk evaluation.
    pub max_bulk_paths: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_bulk_paths: 10_000,
        }
    }
}

impl EvaluationConfig {
    /// Validates configured bounds.
    pub fn validate(&self) -> AppResult<()> {
        if self.timeout.is_zero() {
            return Err(AppError::Validation(
                "evaluation timeout must be greater than zero".to_owned(),
            ));
        }

        if self.max_bulk_paths == 0 {
            return Err(AppError::Validation(
                "max bulk paths must be greater than zero".to_owned(),
            ));
        }

        Ok(())
    }
}

/// Application service answering "may this account perform this action on this target".
///
/// Every store failure, timeout or cancellation resolves to a denial at this boundary.
#[derive(Clone)]
pub struct AuthorizationService {
    store: Arc<dyn PermissionStore>,
    audit_repository: Arc<dyn AuditRepository>,
    permission_cache: Option<Arc<dyn PermissionSetCache>>,
    config: EvaluationConfig,
}

impl AuthorizationService {
    /// Creates a new authorization service from a store implementation.
    #[must_use]
    pub fn new(
        store: Arc<dyn PermissionStore>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            store,
            audit_repository,
            permission_cache: None,
            config: EvaluationConfig::default(),
        }
    }

    /// Replaces the default evaluation bounds.
    #[must_use]
    pub fn with_config(mut self, config: EvaluationConfig) -> Self {
        self.config = config;
        self
    }

    /// Adds optional effective permission set caching.
    #[must_use]
    pub fn with_permission_cache(mut self, permission_cache: Arc<dyn PermissionSetCache>) -> Self {
        self.permission_cache = Some(permission_cache);
        self
    }

    /// Returns the configured evaluation bounds.
    #[must_use]
    pub fn config(&self) -> EvaluationConfig {
        self.config
    }

    async fn load_permission_set(
        &self,
        account_id: AccountId,
        lookup: PermissionLookup,
    ) -> AppResult<EffectivePermissionSet> {
        let mut generation = None;

        if let Some(cache) = &self.permission_cache {
            match cache.get_permission_set(account_id, &lookup).await {
                Ok(Some(permissions)) => return Ok(permissions),
                Ok(None) => {}
                Err(error) => warn!(
                    account_id = %account_id,
                    error = %error,
                    "permission cache read failed"
                ),
            }

            generation = cache.generation().await.ok();
        }

        let permissions = tokio::time::timeout(
            self.config.timeout,
            self.store.load_effective_permissions(account_id, &lookup),
        )
        .await
        .map_err(|_| {
            AppError::QueryFailure(format!(
                "permission store did not answer within {} ms",
                self.config.timeout.as_millis()
            ))
        })??;

        if let Some(cache) = &self.permission_cache
            && let Some(generation) = generation
            && let Err(error) = cache
                .set_permission_set(account_id, lookup, permissions.clone(), generation)
                .await
        {
            warn!(
                account_id = %account_id,
                error = %error,
                "permission cache write failed"
            );
        }

        Ok(permissions)
    }
}

pub(crate) fn validate_bucket(bucket: &str) -> AppResult<()> {
    if bucket.trim().is_empty() {
        return Err(AppError::Validation(
            "bucket name must not be empty or whitespace".to_owned(),
        ));
    }

    if bucket.contains('/') || bucket == tessera_domain::NAME_WILDCARD {
        return Err(AppError::Validation(format!(
            "bucket name '{bucket}' must be a single concrete name"
        )));
    }

    Ok(())
}
