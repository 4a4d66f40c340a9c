use tessera_domain::PermissionDefinitionInput;

use crate::permission_rows::PermissionRow;

use super::*;

impl PostgresSecurityAdminRepository {
    pub(super) async fn list_permissions_impl(&self) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT
                permissions.id,
                permissions.name,
                permissions.description,
                permissions.permission_type,
                permissions.action,
                permissions.system_resource,
                permissions.scope,
                permissions.schema_name,
                permissions.table_name,
                permissions.column_name,
                permissions.metadata
            FROM rbac_permissions AS permissions
            ORDER BY permissions.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| query_failure("failed to list permissions", error))?;

        rows.into_iter().map(PermissionRow::into_permission).collect()
    }

    pub(super) async fn create_permission_impl(
        &self,
        permission: Permission,
    ) -> AppResult<Permission> {
        let definition = PermissionDefinitionInput::from(&permission);
        let scope = definition.scope.map(|scope| scope.as_str());

        sqlx::query(
            r#"
            INSERT INTO rbac_permissions (
                id,
                name,
                description,
                permission_type,
                action,
                system_resource,
                scope,
                schema_name,
                table_name,
                column_name,
                metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(permission.id().as_uuid())
        .bind(definition.name.as_str())
        .bind(definition.description.as_deref())
        .bind(definition.permission_type.as_str())
        .bind(definition.action.as_str())
        .bind(definition.system_resource.as_deref())
        .bind(scope)
        .bind(definition.schema_name.as_deref())
        .bind(definition.table_name.as_deref())
        .bind(definition.column_name.as_deref())
        .bind(definition.metadata.clone())
        .execute(&self.pool)
        .await
        .map_err(|error| map_unique_conflict(error, "permission", definition.name.as_str()))?;

        Ok(permission)
    }

    pub(super) async fn delete_permission_impl(&self, permission_id: PermissionId) -> AppResult<()> {
        let rows_affected = sqlx::query("DELETE FROM rbac_permissions WHERE id = $1")
            .bind(permission_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|error| query_failure("failed to delete permission", error))?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "permission '{permission_id}' does not exist"
            )));
        }

        Ok(())
    }

    pub(super) async fn list_permission_groups_impl(&self) -> AppResult<Vec<PermissionGroup>> {
        let rows = sqlx::query_as::<_, PermissionGroupRow>(
            r#"
            SELECT
                groups.id,
                groups.name,
                groups.description,
                COALESCE(
                    ARRAY_AGG(members.permission_id) FILTER (WHERE members.permission_id IS NOT NULL),
                    ARRAY[]::uuid[]
                ) AS permission_ids
            FROM rbac_permission_groups AS groups
            LEFT JOIN rbac_permission_group_members AS members
                ON members.group_id = groups.id
            GROUP BY groups.id, groups.name, groups.description
            ORDER BY groups.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| query_failure("failed to list permission groups", error))?;

        rows.into_iter()
            .map(|row| {
                PermissionGroup::new(
                    PermissionGroupId::from_uuid(row.id),
                    row.name,
                    row.description,
                    row.permission_ids.into_iter().map(PermissionId::from_uuid),
                )
            })
            .collect()
    }

    pub(super) async fn create_permission_group_impl(
        &self,
        group: PermissionGroup,
    ) -> AppResult<PermissionGroup> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            query_failure("failed to begin transaction", error)
        })?;

        sqlx::query(
            r#"
            INSERT INTO rbac_permission_groups (id, name, description)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(group.id().as_uuid())
        .bind(group.name().as_str().trim())
        .bind(group.description())
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_unique_conflict(error, "permission group", group.name().as_str()))?;

        insert_group_members(
            &mut transaction,
            group.id(),
            &group.permission_ids().iter().copied().collect::<Vec<_>>(),
        )
        .await?;

        transaction
            .commit()
            .await
            .map_err(|error| query_failure("failed to commit transaction", error))?;

        Ok(group)
    }

    pub(super) async fn set_permission_group_members_impl(
        &self,
        group_id: PermissionGroupId,
        permission_ids: &[PermissionId],
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            query_failure("failed to begin transaction", error)
        })?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM rbac_permission_groups WHERE id = $1)",
        )
        .bind(group_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| query_failure("failed to resolve permission group", error))?;

        if !exists {
            return Err(AppError::NotFound(format!(
                "permission group '{group_id}' does not exist"
            )));
        }

        sqlx::query("DELETE FROM rbac_permission_group_members WHERE group_id = $1")
            .bind(group_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| query_failure("failed to clear group members", error))?;

        insert_group_members(&mut transaction, group_id, permission_ids).await?;

        transaction
            .commit()
            .await
            .map_err(|error| query_failure("failed to commit transaction", error))
    }
}

async fn insert_group_members(
    transaction: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    group_id: PermissionGroupId,
    permission_ids: &[PermissionId],
) -> AppResult<()> {
    let permission_ids: Vec<uuid::Uuid> = permission_ids.iter().map(PermissionId::as_uuid).collect();

    sqlx::query(
        r#"
        INSERT INTO rbac_permission_group_members (group_id, permission_id)
        SELECT $1, permission_id
        FROM UNNEST($2::uuid[]) AS permission_id
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(group_id.as_uuid())
    .bind(permission_ids)
    .execute(&mut **transaction)
    .await
    .map_err(|error| map_missing_reference(error, "failed to attach group members"))?;

    Ok(())
}
