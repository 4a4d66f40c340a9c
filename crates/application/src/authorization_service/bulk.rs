use std::collections::HashMap;

use tessera_domain::{AccessRequest, StorageAction, StorageDecision, StoragePath};
use tracing::{debug, warn};

use super::*;

impl AuthorizationService {
    /// Evaluates all four storage actions for many paths in one bucket.
    ///
    /// The effective permission set is loaded once and every path is decided in memory against
    /// it. When `parent_path` is supplied and the account holds subtree grants for all four
    /// actions on that folder, paths inside the folder inherit the full decision directly.
    ///
    /// `action` is the operation that triggered the evaluation. Every path in the input appears
    /// in the result; a failed load resolves every path to a full denial.
    pub async fn bulk_evaluate(
        &self,
        account_id: AccountId,
        bucket: &str,
        action: StorageAction,
        paths: &[String],
        parent_path: Option<&str>,
    ) -> AppResult<HashMap<String, StorageDecision>> {
        validate_bucket(bucket)?;

        if paths.len() > self.config.max_bulk_paths {
            return Err(AppError::CapacityExceeded(format!(
                "bulk evaluation accepts at most {} paths, got {}",
                self.config.max_bulk_paths,
                paths.len()
            )));
        }

        let parsed_paths = paths
            .iter()
            .map(|path| StoragePath::parse(path).map(|parsed| (path.as_str(), parsed)))
            .collect::<AppResult<Vec<_>>>()?;
        let parent = parent_path.map(StoragePath::parse).transpose()?;

        let mut decisions: HashMap<String, StorageDecision> = paths
            .iter()
            .map(|path| (path.clone(), StorageDecision::deny_all()))
            .collect();

        if parsed_paths.is_empty() {
            return Ok(decisions);
        }

        let lookup = PermissionLookup::Storage {
            bucket: bucket.to_owned(),
        };
        let permissions = match self.load_permission_set(account_id, lookup).await {
            Ok(permissions) => permissions,
            Err(error) => {
                warn!(
                    account_id = %account_id,
                    namespace = %bucket,
                    action = action.action().as_str(),
                    path_count = paths.len(),
                    error = %error,
                    "bulk permission evaluation failed, denying all paths"
                );
                return Ok(decisions);
            }
        };

        let parent_grants_everything = parent.as_ref().is_some_and(|parent| {
            StorageAction::all()
                .iter()
                .all(|candidate| permissions.grants_subtree(bucket, parent, candidate.action()))
        });

        let mut inherited = 0_usize;
        for (raw, path) in parsed_paths {
            let inherits_parent = parent_grants_everything
                && parent.as_ref().is_some_and(|parent| path.is_within(parent));

            let decision = if inherits_parent {
                inherited += 1;
                StorageDecision::allow_all()
            } else {
                let mut decision = StorageDecision::deny_all();
                for candidate in StorageAction::all() {
                    let request = AccessRequest::storage(bucket, path.clone(), *candidate);
                    decision.set(*candidate, permissions.grants(&request));
                }
                decision
            };

            decisions.insert(raw.to_owned(), decision);
        }

        debug!(
            account_id = %account_id,
            namespace = %bucket,
            action = action.action().as_str(),
            path_count = decisions.len(),
            inherited,
            "bulk permission evaluation completed"
        );

        Ok(decisions)
    }
}
