use tessera_domain::{AccessRequest, AccessTarget, AuditAction, StorageAction, StoragePath};
use tracing::{debug, info, warn};

use crate::AuditEvent;

use super::*;

impl AuthorizationService {
    /// Evaluates one request and surfaces load failures as `QueryFailure`.
    ///
    /// Callers must treat an error as a denial; [`Self::has_permission`] does this for them.
    pub async fn evaluate(&self, account_id: AccountId, request: &AccessRequest) -> AppResult<bool> {
        validate_request(request)?;

        let permissions = self
            .load_permission_set(account_id, PermissionLookup::for_target(&request.target))
            .await?;

        Ok(permissions.grants(request))
    }

    /// Returns whether the account may perform the request; failures resolve to `false`.
    pub async fn has_permission(&self, account_id: AccountId, request: &AccessRequest) -> bool {
        match self.evaluate(account_id, request).await {
            Ok(granted) => granted,
            Err(error) => {
                warn!(
                    account_id = %account_id,
                    namespace = %request.target.namespace(),
                    action = request.action.as_str(),
                    error = %error,
                    "permission evaluation failed, denying"
                );
                false
            }
        }
    }

    /// Ensures the account may perform the request.
    ///
    /// Malformed requests fail with `Validation`; every other negative outcome, including an
    /// unreachable store, fails with `PermissionDenied` and is appended to the audit log.
    pub async fn validate_or_fail(
        &self,
        account_id: AccountId,
        request: &AccessRequest,
    ) -> AppResult<()> {
        validate_request(request)?;

        if self.has_permission(account_id, request).await {
            return Ok(());
        }

        Err(self.deny(account_id, request).await)
    }

    /// Single-path storage check; failures resolve to `false`.
    pub async fn has_storage_permission(
        &self,
        account_id: AccountId,
        bucket: &str,
        action: StorageAction,
        path: &str,
    ) -> AppResult<bool> {
        let request = storage_request(bucket, action, path)?;
        Ok(self.has_permission(account_id, &request).await)
    }

    /// Single-path storage check failing with `PermissionDenied`.
    pub async fn validate_storage_or_fail(
        &self,
        account_id: AccountId,
        bucket: &str,
        action: StorageAction,
        path: &str,
    ) -> AppResult<()> {
        let request = storage_request(bucket, action, path)?;
        self.validate_or_fail(account_id, &request).await
    }

    /// Returns whether the account may perform `action` on `folder` and everything below it.
    ///
    /// Only grants whose pattern covers the whole subtree count; failures resolve to `false`.
    pub async fn has_subtree_permission(
        &self,
        account_id: AccountId,
        bucket: &str,
        action: StorageAction,
        folder: &StoragePath,
    ) -> AppResult<bool> {
        validate_bucket(bucket)?;

        let lookup = PermissionLookup::Storage {
            bucket: bucket.to_owned(),
        };
        match self.load_permission_set(account_id, lookup).await {
            Ok(permissions) => Ok(permissions.grants_subtree(bucket, folder, action.action())),
            Err(error) => {
                warn!(
                    account_id = %account_id,
                    namespace = %bucket,
                    action = action.action().as_str(),
                    error = %error,
                    "subtree permission evaluation failed, denying"
                );
                Ok(false)
            }
        }
    }

    pub(crate) async fn deny(&self, account_id: AccountId, request: &AccessRequest) -> AppError {
        let namespace = request.target.namespace().to_owned();
        let object_label = request.target.object_label();

        info!(
            account_id = %account_id,
            namespace = %namespace,
            action = request.action.as_str(),
            "access denied"
        );
        debug!(account_id = %account_id, object = %object_label, "denied object");

        let resource_type = match &request.target {
            AccessTarget::System { .. } => "system",
            AccessTarget::Table { .. } => "table",
            AccessTarget::Storage { .. } => "storage",
        };

        if let Err(error) = self
            .audit_repository
            .append_event(AuditEvent {
                actor: account_id,
                action: AuditAction::AccessDenied,
                resource_type: resource_type.to_owned(),
                resource_id: namespace.clone(),
                detail: Some(format!("action '{}' denied", request.action.as_str())),
            })
            .await
        {
            warn!(account_id = %account_id, error = %error, "failed to audit access denial");
        }

        AppError::PermissionDenied(format!(
            "action '{}' on '{object_label}' in '{namespace}' is not permitted",
            request.action.as_str()
        ))
    }
}

fn validate_request(request: &AccessRequest) -> AppResult<()> {
    match &request.target {
        AccessTarget::System { .. } => Ok(()),
        AccessTarget::Table { schema, table, .. } => {
            if schema.trim().is_empty() || table.trim().is_empty() {
                return Err(AppError::Validation(
                    "table requests must name a schema and a table".to_owned(),
                ));
            }
            Ok(())
        }
        AccessTarget::Storage { bucket, .. } => validate_bucket(bucket),
    }
}

fn storage_request(bucket: &str, action: StorageAction, path: &str) -> AppResult<AccessRequest> {
    validate_bucket(bucket)?;
    Ok(AccessRequest::storage(bucket, StoragePath::parse(path)?, action))
}
