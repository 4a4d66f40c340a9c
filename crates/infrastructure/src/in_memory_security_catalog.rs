use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tessera_application::{
    PermissionLookup, PermissionStore, RoleAssignment, RoleGrants, SecurityAdminRepository,
};
use tessera_core::{AccountId, AppError, AppResult, PermissionGroupId, PermissionId, RoleId};
use tessera_domain::{
    EffectivePermissionSet, Permission, PermissionGroup, PermissionScope, Role, RoleRank,
};
use tokio::sync::RwLock;

#[cfg(test)]
mod tests;

#[derive(Debug, Clone)]
struct StoredAssignment {
    role_id: RoleId,
    assigned_at: String,
}

#[derive(Debug, Default)]
struct CatalogState {
    roles: HashMap<RoleId, Role>,
    permissions: HashMap<PermissionId, Permission>,
    groups: HashMap<PermissionGroupId, PermissionGroup>,
    role_grants: HashMap<RoleId, RoleGrants>,
    assignments: HashMap<AccountId, StoredAssignment>,
}

impl CatalogState {
    fn effective_permissions(&self, account_id: AccountId) -> Vec<&Permission> {
        let Some(grants) = self
            .assignments
            .get(&account_id)
            .and_then(|assignment| self.role_grants.get(&assignment.role_id))
        else {
            return Vec::new();
        };

        let mut reachable: BTreeSet<PermissionId> = grants.permission_ids.iter().copied().collect();
        for group_id in &grants.group_ids {
            if let Some(group) = self.groups.get(group_id) {
                reachable.extend(group.permission_ids().iter().copied());
            }
        }

        reachable
            .iter()
            .filter_map(|permission_id| self.permissions.get(permission_id))
            .collect()
    }

    fn require_role(&self, role_id: RoleId) -> AppResult<&Role> {
        self.roles
            .get(&role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }

    fn require_permissions(&self, permission_ids: &[PermissionId]) -> AppResult<()> {
        match permission_ids
            .iter()
            .find(|permission_id| !self.permissions.contains_key(permission_id))
        {
            Some(missing) => Err(AppError::NotFound(format!(
                "permission '{missing}' does not exist"
            ))),
            None => Ok(()),
        }
    }
}

fn relevant_to(permission: &Permission, lookup: &PermissionLookup) -> bool {
    match (permission.scope(), lookup) {
        (PermissionScope::System { .. }, PermissionLookup::System) => true,
        (PermissionScope::Table { schema, .. }, PermissionLookup::Table { schema: requested }) => {
            schema.matches(requested)
        }
        (
            PermissionScope::Storage { bucket, .. },
            PermissionLookup::Storage { bucket: requested },
        ) => bucket.matches(requested),
        _ => false,
    }
}

/// In-memory permission catalog serving both evaluation and administration.
///
/// All state sits behind one lock, so every load observes a consistent snapshot.
#[derive(Debug, Default)]
pub struct InMemorySecurityCatalog {
    state: RwLock<CatalogState>,
}

impl InMemorySecurityCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PermissionStore for InMemorySecurityCatalog {
    async fn load_effective_permissions(
        &self,
        account_id: AccountId,
        lookup: &PermissionLookup,
    ) -> AppResult<EffectivePermissionSet> {
        let state = self.state.read().await;

        Ok(EffectivePermissionSet::from_permissions(
            state
                .effective_permissions(account_id)
                .into_iter()
                .filter(|permission| relevant_to(permission, lookup))
                .cloned(),
        ))
    }
}

#[async_trait]
impl SecurityAdminRepository for InMemorySecurityCatalog {
    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let state = self.state.read().await;
        let mut roles: Vec<Role> = state.roles.values().cloned().collect();
        roles.sort_by(|left, right| {
            right
                .rank()
                .cmp(&left.rank())
                .then_with(|| left.name().as_str().cmp(right.name().as_str()))
        });

        Ok(roles)
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.state.read().await.roles.get(&role_id).cloned())
    }

    async fn create_role(&self, role: Role) -> AppResult<Role> {
        let mut state = self.state.write().await;
        if state
            .roles
            .values()
            .any(|existing| existing.name() == role.name())
        {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name().as_str()
            )));
        }

        state.roles.insert(role.id(), role.clone());
        Ok(role)
    }

    async fn update_role(&self, role: Role) -> AppResult<Role> {
        let mut state = self.state.write().await;
        state.require_role(role.id())?;
        state.roles.insert(role.id(), role.clone());

        Ok(role)
    }

    async fn delete_role(&self, role_id: RoleId) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.require_role(role_id)?;

        let assigned = state
            .assignments
            .values()
            .filter(|assignment| assignment.role_id == role_id)
            .count();
        if assigned > 0 {
            return Err(AppError::Conflict(format!(
                "role '{role_id}' is still assigned to {assigned} accounts"
            )));
        }

        state.roles.remove(&role_id);
        state.role_grants.remove(&role_id);
        Ok(())
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let state = self.state.read().await;
        let mut permissions: Vec<Permission> = state.permissions.values().cloned().collect();
        permissions.sort_by(|left, right| left.name().as_str().cmp(right.name().as_str()));

        Ok(permissions)
    }

    async fn create_permission(&self, permission: Permission) -> AppResult<Permission> {
        let mut state = self.state.write().await;
        if state
            .permissions
            .values()
            .any(|existing| existing.name() == permission.name())
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.name().as_str()
            )));
        }

        state.permissions.insert(permission.id(), permission.clone());
        Ok(permission)
    }

    async fn delete_permission(&self, permission_id: PermissionId) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.permissions.remove(&permission_id).is_none() {
            return Err(AppError::NotFound(format!(
                "permission '{permission_id}' does not exist"
            )));
        }

        for grants in state.role_grants.values_mut() {
            grants.permission_ids.retain(|id| *id != permission_id);
        }

        let groups: Vec<PermissionGroup> = state.groups.values().cloned().collect();
        for group in groups {
            if group.permission_ids().contains(&permission_id) {
                let remaining = group
                    .permission_ids()
                    .iter()
                    .copied()
                    .filter(|id| *id != permission_id);
                let updated = PermissionGroup::new(
                    group.id(),
                    group.name().as_str(),
                    group.description().map(str::to_owned),
                    remaining,
                )?;
                state.groups.insert(updated.id(), updated);
            }
        }

        Ok(())
    }

    async fn list_permission_groups(&self) -> AppResult<Vec<PermissionGroup>> {
        let state = self.state.read().await;
        let mut groups: Vec<PermissionGroup> = state.groups.values().cloned().collect();
        groups.sort_by(|left, right| left.name().as_str().cmp(right.name().as_str()));

        Ok(groups)
    }

    async fn create_permission_group(&self, group: PermissionGroup) -> AppResult<PermissionGroup> {
        let mut state = self.state.write().await;
        if state
            .groups
            .values()
            .any(|existing| existing.name() == group.name())
        {
            return Err(AppError::Conflict(format!(
                "permission group '{}' already exists",
                group.name().as_str()
            )));
        }

        let members: Vec<PermissionId> = group.permission_ids().iter().copied().collect();
        state.require_permissions(&members)?;
        state.groups.insert(group.id(), group.clone());

        Ok(group)
    }

    async fn set_permission_group_members(
        &self,
        group_id: PermissionGroupId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        let Some(group) = state.groups.get(&group_id).cloned() else {
            return Err(AppError::NotFound(format!(
                "permission group '{group_id}' does not exist"
            )));
        };
        state.require_permissions(permission_ids)?;

        let updated = PermissionGroup::new(
            group.id(),
            group.name().as_str(),
            group.description().map(str::to_owned),
            permission_ids.iter().copied(),
        )?;
        state.groups.insert(group_id, updated);

        Ok(())
    }

    async fn set_role_grants(&self, role_id: RoleId, grants: RoleGrants) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.require_role(role_id)?;
        state.require_permissions(&grants.permission_ids)?;
        if let Some(missing) = grants
            .group_ids
            .iter()
            .find(|group_id| !state.groups.contains_key(group_id))
        {
            return Err(AppError::NotFound(format!(
                "permission group '{missing}' does not exist"
            )));
        }

        state.role_grants.insert(role_id, grants);
        Ok(())
    }

    async fn assign_role_to_account(
        &self,
        account_id: AccountId,
        role_id: RoleId,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.require_role(role_id)?;
        state.assignments.insert(
            account_id,
            StoredAssignment {
                role_id,
                assigned_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            },
        );

        Ok(())
    }

    async fn remove_role_from_account(
        &self,
        account_id: AccountId,
        role_id: RoleId,
    ) -> AppResult<()> {
        let mut state = self.state.write().await;
        match state.assignments.get(&account_id) {
            Some(assignment) if assignment.role_id == role_id => {
                state.assignments.remove(&account_id);
                Ok(())
            }
            _ => Err(AppError::NotFound(format!(
                "role assignment '{account_id}:{role_id}' was not found"
            ))),
        }
    }

    async fn list_role_assignments(&self) -> AppResult<Vec<RoleAssignment>> {
        let state = self.state.read().await;
        let mut assignments = state
            .assignments
            .iter()
            .map(|(account_id, assignment)| {
                let role = state.require_role(assignment.role_id)?;
                Ok(RoleAssignment {
                    account_id: *account_id,
                    role_id: role.id(),
                    role_name: role.name().as_str().to_owned(),
                    role_rank: role.rank(),
                    assigned_at: assignment.assigned_at.clone(),
                })
            })
            .collect::<AppResult<Vec<_>>>()?;
        assignments.sort_by(|left, right| {
            right
                .role_rank
                .cmp(&left.role_rank)
                .then_with(|| left.account_id.cmp(&right.account_id))
        });

        Ok(assignments)
    }

    async fn max_rank_for_account(&self, account_id: AccountId) -> AppResult<Option<RoleRank>> {
        let state = self.state.read().await;
        Ok(state
            .assignments
            .get(&account_id)
            .and_then(|assignment| state.roles.get(&assignment.role_id))
            .map(Role::rank))
    }
}
