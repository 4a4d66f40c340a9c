use tessera_core::RoleId;
use tessera_domain::{AuditAction, Role, rank_guard};

use crate::security_admin_ports::{CreateRoleInput, RoleGrants, UpdateRoleInput};

use super::*;

impl SecurityAdminService {
    /// Returns all roles.
    pub async fn list_roles(&self, actor: AccountId) -> AppResult<Vec<Role>> {
        self.require(actor, SystemResource::Role, Action::Select)
            .await?;
        self.repository.list_roles().await
    }

    /// Creates a role at or below the actor's own rank.
    pub async fn create_role(&self, actor: AccountId, input: CreateRoleInput) -> AppResult<Role> {
        self.require(actor, SystemResource::Role, Action::Insert)
            .await?;

        let rank = RoleRank::new(input.rank)?;
        rank_guard::assess(self.actor_rank(actor).await?, rank)?;

        let role = self
            .repository
            .create_role(Role::new(
                RoleId::new(),
                input.name,
                input.description,
                rank,
            )?)
            .await?;

        self.record_mutation(AuditEvent {
            actor,
            action: AuditAction::SecurityRoleCreated,
            resource_type: "role".to_owned(),
            resource_id: role.id().to_string(),
            detail: Some(format!(
                "created role '{}' at rank {}",
                role.name().as_str(),
                role.rank()
            )),
        })
        .await?;

        Ok(role)
    }

    /// Changes a role's description or rank.
    ///
    /// The actor must outrank or equal both the role's current rank and the requested one.
    pub async fn update_role(
        &self,
        actor: AccountId,
        role_id: RoleId,
        input: UpdateRoleInput,
    ) -> AppResult<Role> {
        self.require(actor, SystemResource::Role, Action::Update)
            .await?;

        let existing = self.find_role(role_id).await?;
        let actor_rank = self.actor_rank(actor).await?;
        rank_guard::assess(actor_rank, existing.rank())?;

        let rank = match input.rank {
            Some(value) => {
                let rank = RoleRank::new(value)?;
                rank_guard::assess(actor_rank, rank)?;
                rank
            }
            None => existing.rank(),
        };
        let description = input
            .description
            .or_else(|| existing.description().map(str::to_owned));

        let role = self
            .repository
            .update_role(Role::new(
                existing.id(),
                existing.name().as_str(),
                description,
                rank,
            )?)
            .await?;

        self.record_mutation(AuditEvent {
            actor,
            action: AuditAction::SecurityRoleUpdated,
            resource_type: "role".to_owned(),
            resource_id: role.id().to_string(),
            detail: Some(format!(
                "updated role '{}' from rank {} to rank {}",
                role.name().as_str(),
                existing.rank(),
                role.rank()
            )),
        })
        .await?;

        Ok(role)
    }

    /// Deletes an unassigned role at or below the actor's rank.
    pub async fn delete_role(&self, actor: AccountId, role_id: RoleId) -> AppResult<()> {
        self.require(actor, SystemResource::Role, Action::Delete)
            .await?;

        let existing = self.find_role(role_id).await?;
        rank_guard::assess(self.actor_rank(actor).await?, existing.rank())?;

        self.repository.delete_role(role_id).await?;

        self.record_mutation(AuditEvent {
            actor,
            action: AuditAction::SecurityRoleDeleted,
            resource_type: "role".to_owned(),
            resource_id: role_id.to_string(),
            detail: Some(format!("deleted role '{}'", existing.name().as_str())),
        })
        .await
    }

    /// Replaces the permissions and permission groups attached to a role.
    pub async fn set_role_grants(
        &self,
        actor: AccountId,
        role_id: RoleId,
        grants: RoleGrants,
    ) -> AppResult<()> {
        self.require(actor, SystemResource::Role, Action::Update)
            .await?;

        let existing = self.find_role(role_id).await?;
        rank_guard::assess(self.actor_rank(actor).await?, existing.rank())?;

        let detail = format!(
            "role '{}' now holds {} permissions and {} groups",
            existing.name().as_str(),
            grants.permission_ids.len(),
            grants.group_ids.len()
        );
        self.repository.set_role_grants(role_id, grants).await?;

        self.record_mutation(AuditEvent {
            actor,
            action: AuditAction::SecurityRoleGrantsChanged,
            resource_type: "role".to_owned(),
            resource_id: role_id.to_string(),
            detail: Some(detail),
        })
        .await
    }

    pub(super) async fn find_role(&self, role_id: RoleId) -> AppResult<Role> {
        self.repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' does not exist")))
    }
}
