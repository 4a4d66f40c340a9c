use super::*;

impl PostgresSecurityAdminRepository {
    pub(super) async fn list_roles_impl(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, description, rank
            FROM rbac_roles
            ORDER BY rank DESC, name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| query_failure("failed to list roles", error))?;

        rows.into_iter().map(RoleRow::into_role).collect()
    }

    pub(super) async fn find_role_impl(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, description, rank
            FROM rbac_roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| query_failure("failed to find role", error))?
        .map(RoleRow::into_role)
        .transpose()
    }

    pub(super) async fn create_role_impl(&self, role: Role) -> AppResult<Role> {
        sqlx::query(
            r#"
            INSERT INTO rbac_roles (id, name, description, rank)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(role.id().as_uuid())
        .bind(role.name().as_str().trim())
        .bind(role.description())
        .bind(rank_column(role.rank())?)
        .execute(&self.pool)
        .await
        .map_err(|error| map_unique_conflict(error, "role", role.name().as_str()))?;

        Ok(role)
    }

    pub(super) async fn update_role_impl(&self, role: Role) -> AppResult<Role> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE rbac_roles
            SET description = $2, rank = $3
            WHERE id = $1
            "#,
        )
        .bind(role.id().as_uuid())
        .bind(role.description())
        .bind(rank_column(role.rank())?)
        .execute(&self.pool)
        .await
        .map_err(|error| query_failure("failed to update role", error))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "role '{}' does not exist",
                role.id()
            )));
        }

        Ok(role)
    }

    pub(super) async fn delete_role_impl(&self, role_id: RoleId) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            query_failure("failed to begin transaction", error)
        })?;

        let assigned = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM rbac_account_roles
            WHERE role_id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| query_failure("failed to count role assignments", error))?;

        if assigned > 0 {
            return Err(AppError::Conflict(format!(
                "role '{role_id}' is still assigned to {assigned} accounts"
            )));
        }

        let rows_affected = sqlx::query("DELETE FROM rbac_roles WHERE id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| query_failure("failed to delete role", error))?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!("role '{role_id}' does not exist")));
        }

        transaction
            .commit()
            .await
            .map_err(|error| query_failure("failed to commit transaction", error))
    }

    pub(super) async fn set_role_grants_impl(
        &self,
        role_id: RoleId,
        grants: RoleGrants,
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            query_failure("failed to begin transaction", error)
        })?;

        sqlx::query("DELETE FROM rbac_role_permissions WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| query_failure("failed to clear role permissions", error))?;

        sqlx::query("DELETE FROM rbac_role_permission_groups WHERE role_id = $1")
            .bind(role_id.as_uuid())
            .execute(&mut *transaction)
            .await
            .map_err(|error| query_failure("failed to clear role groups", error))?;

        let permission_ids: Vec<uuid::Uuid> = grants
            .permission_ids
            .iter()
            .map(PermissionId::as_uuid)
            .collect();
        sqlx::query(
            r#"
            INSERT INTO rbac_role_permissions (role_id, permission_id)
            SELECT $1, permission_id
            FROM UNNEST($2::uuid[]) AS permission_id
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission_ids)
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_missing_reference(error, "failed to attach role permissions"))?;

        let group_ids: Vec<uuid::Uuid> = grants
            .group_ids
            .iter()
            .map(PermissionGroupId::as_uuid)
            .collect();
        sqlx::query(
            r#"
            INSERT INTO rbac_role_permission_groups (role_id, group_id)
            SELECT $1, group_id
            FROM UNNEST($2::uuid[]) AS group_id
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(group_ids)
        .execute(&mut *transaction)
        .await
        .map_err(|error| map_missing_reference(error, "failed to attach role groups"))?;

        transaction
            .commit()
            .await
            .map_err(|error| query_failure("failed to commit transaction", error))
    }
}
