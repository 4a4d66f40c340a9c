use tessera_core::{PermissionGroupId, PermissionId};
use tessera_domain::{AuditAction, Permission, PermissionDefinitionInput, PermissionGroup};

use crate::security_admin_ports::CreatePermissionGroupInput;

use super::*;

impl SecurityAdminService {
    /// Returns the permission catalog.
    pub async fn list_permissions(&self, actor: AccountId) -> AppResult<Vec<Permission>> {
        self.require(actor, SystemResource::Permission, Action::Select)
            .await?;
        self.repository.list_permissions().await
    }

    /// Validates and defines a permission.
    pub async fn create_permission(
        &self,
        actor: AccountId,
        input: PermissionDefinitionInput,
    ) -> AppResult<Permission> {
        self.require(actor, SystemResource::Permission, Action::Insert)
            .await?;

        let permission = Permission::from_input(PermissionId::new(), input)?;
        let permission = self.repository.create_permission(permission).await?;

        self.record_mutation(AuditEvent {
            actor,
            action: AuditAction::SecurityPermissionCreated,
            resource_type: "permission".to_owned(),
            resource_id: permission.id().to_string(),
            detail: Some(format!(
                "defined permission '{}' for action '{}'",
                permission.name().as_str(),
                permission.action().as_str()
            )),
        })
        .await?;

        Ok(permission)
    }

    /// Deletes a permission and detaches it from every role and group.
    pub async fn delete_permission(
        &self,
        actor: AccountId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.require(actor, SystemResource::Permission, Action::Delete)
            .await?;

        self.repository.delete_permission(permission_id).await?;

        self.record_mutation(AuditEvent {
            actor,
            action: AuditAction::SecurityPermissionDeleted,
            resource_type: "permission".to_owned(),
            resource_id: permission_id.to_string(),
            detail: None,
        })
        .await
    }

    /// Returns all permission groups.
    pub async fn list_permission_groups(&self, actor: AccountId) -> AppResult<Vec<PermissionGroup>> {
        self.require(actor, SystemResource::PermissionGroup, Action::Select)
            .await?;
        self.repository.list_permission_groups().await
    }

    /// Creates a permission group bundling existing permissions.
    pub async fn create_permission_group(
        &self,
        actor: AccountId,
        input: CreatePermissionGroupInput,
    ) -> AppResult<PermissionGroup> {
        self.require(actor, SystemResource::PermissionGroup, Action::Insert)
            .await?;

        let group = PermissionGroup::new(
            PermissionGroupId::new(),
            input.name,
            input.description,
            input.permission_ids,
        )?;
        let group = self.repository.create_permission_group(group).await?;

        self.record_mutation(AuditEvent {
            actor,
            action: AuditAction::SecurityPermissionGroupCreated,
            resource_type: "permission_group".to_owned(),
            resource_id: group.id().to_string(),
            detail: Some(format!(
                "created group '{}' with {} permissions",
                group.name().as_str(),
                group.permission_ids().len()
            )),
        })
        .await?;

        Ok(group)
    }

    /// Replaces the permissions bundled by a group.
    pub async fn set_permission_group_members(
        &self,
        actor: AccountId,
        group_id: PermissionGroupId,
        permission_ids: Vec<PermissionId>,
    ) -> AppResult<()> {
        self.require(actor, SystemResource::PermissionGroup, Action::Update)
            .await?;

        self.repository
            .set_permission_group_members(group_id, &permission_ids)
            .await?;

        self.record_mutation(AuditEvent {
            actor,
            action: AuditAction::SecurityPermissionGroupUpdated,
            resource_type: "permission_group".to_owned(),
            resource_id: group_id.to_string(),
            detail: Some(format!("group now holds {} permissions", permission_ids.len())),
        })
        .await
    }
}
