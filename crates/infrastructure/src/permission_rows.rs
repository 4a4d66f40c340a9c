use std::str::FromStr;

use serde_json::Value;
use sqlx::FromRow;

use tessera_core::{AppError, AppResult, PermissionId};
use tessera_domain::{
    Action, DataScopeKind, Permission, PermissionDefinitionInput, PermissionType,
};

#[derive(Debug, FromRow)]
pub(crate) struct PermissionRow {
    id: uuid::Uuid,
    name: String,
    description: Option<String>,
    permission_type: String,
    action: String,
    system_resource: Option<String>,
    scope: Option<String>,
    schema_name: Option<String>,
    table_name: Option<String>,
    column_name: Option<String>,
    metadata: Option<Value>,
}

impl PermissionRow {
    /// Decodes a stored row through the same validation used on definition.
    pub(crate) fn into_permission(self) -> AppResult<Permission> {
        let id = self.id;
        let decode_error = |error: AppError| {
            AppError::Internal(format!("failed to decode permission '{id}': {error}"))
        };

        let input = PermissionDefinitionInput {
            name: self.name,
            description: self.description,
            permission_type: PermissionType::from_str(self.permission_type.as_str())
                .map_err(decode_error)?,
            action: Action::from_str(self.action.as_str()).map_err(decode_error)?,
            system_resource: self.system_resource,
            scope: self
                .scope
                .as_deref()
                .map(DataScopeKind::from_str)
                .transpose()
                .map_err(decode_error)?,
            schema_name: self.schema_name,
            table_name: self.table_name,
            column_name: self.column_name,
            metadata: self.metadata,
        };

        Permission::from_input(PermissionId::from_uuid(id), input).map_err(decode_error)
    }
}
