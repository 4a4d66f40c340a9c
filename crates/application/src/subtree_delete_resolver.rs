use std::sync::Arc;

use tessera_core::{AccountId, AppError, AppResult};
use tessera_domain::{AccessRequest, StorageAction, StoragePath};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{AuthorizationService, ObjectLister};

mod enumeration;

#[cfg(test)]
mod tests;

pub use enumeration::SubtreeMembers;

/// Resource bounds for subtree enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtreeLimits {
    /// Maximum number of files collected before enumeration aborts.
    pub max_files: usize,
    /// Maximum number of folders traversed before enumeration aborts.
    pub max_folders: usize,
    /// Page size requested from the object lister.
    pub listing_batch_size: usize,
    /// Number of sibling folders listed concurrently.
    pub folder_concurrency: usize,
}

impl Default for SubtreeLimits {
    fn default() -> Self {
        Self {
            max_files: 10_000,
            max_folders: 1_000,
            listing_batch_size: 1_000,
            folder_concurrency: 10,
        }
    }
}

impl SubtreeLimits {
    /// Validates configured bounds.
    pub fn validate(&self) -> AppResult<()> {
        for (name, value) in [
            ("max files", self.max_files),
            ("max folders", self.max_folders),
            ("listing batch size", self.listing_batch_size),
            ("folder concurrency", self.folder_concurrency),
        ] {
            if value == 0 {
                return Err(AppError::Validation(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        Ok(())
    }
}

/// How a folder delete was authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubtreeDeleteAuthorization {
    /// A subtree grant on the folder covers every object below it.
    WholeSubtree,
    /// Every enumerated object was authorized individually.
    PerObject(Vec<StoragePath>),
}

/// Decides whether a recursive folder delete may proceed.
#[derive(Clone)]
pub struct SubtreeDeleteResolver {
    authorization_service: AuthorizationService,
    lister: Arc<dyn ObjectLister>,
    limits: SubtreeLimits,
}

impl SubtreeDeleteResolver {
    /// Creates a resolver with default limits.
    #[must_use]
    pub fn new(authorization_service: AuthorizationService, lister: Arc<dyn ObjectLister>) -> Self {
        Self {
            authorization_service,
            lister,
            limits: SubtreeLimits::default(),
        }
    }

    /// Replaces the default enumeration limits.
    #[must_use]
    pub fn with_limits(mut self, limits: SubtreeLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Authorizes deleting `folder` together with the given member paths.
    ///
    /// A delete grant covering the folder's whole subtree authorizes the operation without
    /// looking at the members. Otherwise every member must be deletable on its own; a single
    /// denied member denies the whole operation.
    pub async fn authorize_subtree_delete(
        &self,
        account_id: AccountId,
        bucket: &str,
        folder: &str,
        member_paths: &[String],
    ) -> AppResult<()> {
        let folder = parse_folder(folder)?;

        if self
            .authorization_service
            .has_subtree_permission(account_id, bucket, StorageAction::Delete, &folder)
            .await?
        {
            debug!(account_id = %account_id, namespace = %bucket, "subtree delete granted by folder");
            return Ok(());
        }

        self.authorize_members(account_id, bucket, &folder, member_paths, None)
            .await
    }

    /// Authorizes deleting `folder`, enumerating its subtree only when no folder grant applies.
    pub async fn authorize_folder_delete(
        &self,
        account_id: AccountId,
        bucket: &str,
        folder: &str,
        token: &CancellationToken,
    ) -> AppResult<SubtreeDeleteAuthorization> {
        let folder = parse_folder(folder)?;

        if self
            .authorization_service
            .has_subtree_permission(account_id, bucket, StorageAction::Delete, &folder)
            .await?
        {
            return Ok(SubtreeDeleteAuthorization::WholeSubtree);
        }

        let members = self.enumerate_subtree(bucket, &folder, token).await?;
        let member_paths: Vec<String> = members.files.iter().map(ToString::to_string).collect();

        self.authorize_members(account_id, bucket, &folder, &member_paths, Some(token))
            .await?;

        info!(
            account_id = %account_id,
            namespace = %bucket,
            file_count = members.files.len(),
            folder_count = members.folders.len(),
            "subtree delete authorized per object"
        );

        Ok(SubtreeDeleteAuthorization::PerObject(members.files))
    }

    async fn authorize_members(
        &self,
        account_id: AccountId,
        bucket: &str,
        folder: &StoragePath,
        member_paths: &[String],
        token: Option<&CancellationToken>,
    ) -> AppResult<()> {
        for member in member_paths {
            if !StoragePath::parse(member)?.is_within(folder) {
                return Err(AppError::Validation(format!(
                    "member path '{member}' is outside folder '{folder}'"
                )));
            }
        }

        let folder_request = AccessRequest::storage(bucket, folder.clone(), StorageAction::Delete);

        // Nothing below the folder grants it, so the folder entry itself stays protected.
        if member_paths.is_empty() {
            return Err(self
                .authorization_service
                .deny(account_id, &folder_request)
                .await);
        }

        let chunk_size = self.authorization_service.config().max_bulk_paths.max(1);
        let mut denied = 0;

        for chunk in member_paths.chunks(chunk_size) {
            let evaluation = self.authorization_service.bulk_evaluate(
                account_id,
                bucket,
                StorageAction::Delete,
                chunk,
                None,
            );
            let decisions = match token {
                Some(token) => tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        return Err(AppError::QueryFailure(format!(
                            "member evaluation for '{folder}' in bucket '{bucket}' was cancelled"
                        )));
                    }
                    decisions = evaluation => decisions?,
                },
                None => evaluation.await?,
            };

            denied = chunk
                .iter()
                .filter(|path| {
                    !decisions
                        .get(path.as_str())
                        .is_some_and(|decision| decision.can_delete)
                })
                .count();
            if denied > 0 {
                break;
            }
        }

        if denied > 0 {
            debug!(
                account_id = %account_id,
                namespace = %bucket,
                denied,
                "subtree delete refused by member decisions"
            );
            return Err(self
                .authorization_service
                .deny(account_id, &folder_request)
                .await);
        }

        Ok(())
    }
}

fn parse_folder(value: &str) -> AppResult<StoragePath> {
    if value.is_empty() || value.ends_with('/') {
        StoragePath::parse(value)
    } else {
        StoragePath::parse(&format!("{value}/"))
    }
}
