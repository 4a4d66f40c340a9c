use std::sync::Arc;

use tessera_core::{AccountId, AppError, AppResult};
use tessera_domain::{AccessRequest, AccessTarget, Action, RoleRank, SystemResource};
use tracing::warn;

use crate::{
    AuditEvent, AuditRepository, AuthorizationService, PermissionSetCache, SecurityAdminRepository,
};

mod assignments;
mod catalog;
mod roles;


/// Application service for role, permission catalog and assignment administration.
///
/// Every operation is itself authorized through the engine against system resources. Rank
/// bounded operations also pass the rank guard, and every mutation invalidates cached
/// permission sets before it is audited.
#[derive(Clone)]
pub struct SecurityAdminService {
    authorization_service: AuthorizationService,
    repository: Arc<dyn SecurityAdminRepository>,
    audit_repository: Arc<dyn AuditRepository>,
    permission_cache: Option<Arc<dyn PermissionSetCache>>,
}

impl SecurityAdminService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        repository: Arc<dyn SecurityAdminRepository>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            authorization_service,
            repository,
            audit_repository,
            permission_cache: None,
        }
    }

    /// Adds the permission set cache invalidated on every mutation.
    #[must_use]
    pub fn with_permission_cache(mut self, permission_cache: Arc<dyn PermissionSetCache>) -> Self {
        self.permission_cache = Some(permission_cache);
        self
    }

    async fn require(
        &self,
        actor: AccountId,
        resource: SystemResource,
        action: Action,
    ) -> AppResult<()> {
        self.authorization_service
            .validate_or_fail(
                actor,
                &AccessRequest::new(AccessTarget::System { resource }, action),
            )
            .await
    }

    async fn actor_rank(&self, actor: AccountId) -> AppResult<RoleRank> {
        self.repository
            .max_rank_for_account(actor)
            .await?
            .ok_or_else(|| {
                AppError::PermissionDenied(format!(
                    "account '{actor}' holds no role and cannot manage roles"
                ))
            })
    }

    async fn record_mutation(&self, event: AuditEvent) -> AppResult<()> {
        if let Some(cache) = &self.permission_cache {
            cache.invalidate_all().await.map_err(|error| {
                warn!(error = %error, "permission cache invalidation failed");
                error
            })?;
        }

        self.audit_repository.append_event(event).await
    }
}
