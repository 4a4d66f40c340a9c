use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tessera_core::{AppError, AppResult, NonEmptyString, PermissionId};

use crate::action::Action;
use crate::scope_matcher;
use crate::storage_path::{PathPattern, StoragePath};
use crate::target::AccessRequest;

/// Wildcard token accepted for schema, table and bucket names.
pub const NAME_WILDCARD: &str = "*";

/// Infrastructure-owned schemas restricted to `select` access.
pub const PROTECTED_SCHEMAS: &[&str] = &[
    "auth",
    "cron",
    "extensions",
    "graphql",
    "graphql_public",
    "information_schema",
    "net",
    "pg_catalog",
    "pg_toast",
    "pgbouncer",
    "pgsodium",
    "pgsodium_masks",
    "realtime",
    "storage",
    "supabase_functions",
    "vault",
];

/// Returns whether a schema name belongs to the protected set.
#[must_use]
pub fn is_protected_schema(schema_name: &str) -> bool {
    PROTECTED_SCHEMAS.contains(&schema_name)
}

/// Kinds of system objects governed by system permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemResource {
    /// Accounts and their role assignments.
    Account,
    /// Role definitions and ranks.
    Role,
    /// Permission definitions.
    Permission,
    /// Permission group definitions.
    PermissionGroup,
    /// Audit and activity logs.
    Log,
    /// Managed table definitions.
    Table,
    /// Authentication users.
    AuthUser,
}

impl SystemResource {
    /// Returns a stable storage value for this resource.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Account => "account",
            Self::Role => "role",
            Self::Permission => "permission",
            Self::PermissionGroup => "permission_group",
            Self::Log => "log",
            Self::Table => "table",
            Self::AuthUser => "auth_user",
        }
    }
}

impl FromStr for SystemResource {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "account" => Ok(Self::Account),
            "role" => Ok(Self::Role),
            "permission" => Ok(Self::Permission),
            "permission_group" => Ok(Self::PermissionGroup),
            "log" => Ok(Self::Log),
            "table" => Ok(Self::Table),
            "auth_user" => Ok(Self::AuthUser),
            NAME_WILDCARD => Err(AppError::Validation(
                "system permissions must name a concrete resource".to_owned(),
            )),
            _ => Err(AppError::Validation(format!(
                "unknown system resource '{value}'"
            ))),
        }
    }
}

/// A schema, table or bucket name that may be the `*` wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamePattern {
    /// Matches every name.
    Any,
    /// Matches exactly one name.
    Exact(String),
}

impl NamePattern {
    /// Parses a name or the wildcard token.
    pub fn parse(value: &str) -> AppResult<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(AppError::Validation(
                "name must not be empty or whitespace".to_owned(),
            ));
        }

        if value == NAME_WILDCARD {
            return Ok(Self::Any);
        }

        if value.contains('*') {
            return Err(AppError::Validation(format!(
                "name '{value}' may only be '*' or a literal"
            )));
        }

        Ok(Self::Exact(value.to_owned()))
    }

    /// Returns whether the pattern accepts a concrete name.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(name) => name == candidate,
        }
    }

    /// Returns the storage value, `*` for the wildcard.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Any => NAME_WILDCARD,
            Self::Exact(name) => name.as_str(),
        }
    }
}

/// Top-level permission classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    /// Governs system objects such as roles and accounts.
    System,
    /// Governs table data or storage objects.
    Data,
}

impl PermissionType {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Data => "data",
        }
    }
}

impl FromStr for PermissionType {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "system" => Ok(Self::System),
            "data" => Ok(Self::Data),
            _ => Err(AppError::Validation(format!(
                "unknown permission type '{value}'"
            ))),
        }
    }
}

/// Dimension a data permission applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataScopeKind {
    /// Whole table or single column.
    Table,
    /// Storage objects under a path pattern.
    Storage,
}

impl DataScopeKind {
    /// Returns a stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Table => "table",
            Self::Storage => "storage",
        }
    }
}

impl FromStr for DataScopeKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "table" => Ok(Self::Table),
            "storage" => Ok(Self::Storage),
            _ => Err(AppError::Validation(format!(
                "unknown permission scope '{value}'"
            ))),
        }
    }
}

/// Validated scope carried by a permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PermissionScope {
    /// System object scope.
    System {
        /// Governed resource kind.
        resource: SystemResource,
    },
    /// Table scope, optionally narrowed to one column.
    Table {
        /// Schema name or wildcard.
        schema: NamePattern,
        /// Table name or wildcard.
        table: NamePattern,
        /// Column name; absent for whole-table scope.
        column: Option<String>,
    },
    /// Storage scope.
    Storage {
        /// Bucket name or wildcard.
        bucket: NamePattern,
        /// Covered paths inside the bucket.
        path_pattern: PathPattern,
    },
}

impl PermissionScope {
    /// Returns the permission type implied by this scope.
    #[must_use]
    pub fn permission_type(&self) -> PermissionType {
        match self {
            Self::System { .. } => PermissionType::System,
            Self::Table { .. } | Self::Storage { .. } => PermissionType::Data,
        }
    }

    /// Returns the data scope kind, if this is a data scope.
    #[must_use]
    pub fn data_scope(&self) -> Option<DataScopeKind> {
        match self {
            Self::System { .. } => None,
            Self::Table { .. } => Some(DataScopeKind::Table),
            Self::Storage { .. } => Some(DataScopeKind::Storage),
        }
    }
}

/// Flat permission shape used by transports and persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionDefinitionInput {
    /// Unique permission name.
    pub name: String,
    /// Optional description.
    pub description: Option<String>,
    /// System or data permission.
    pub permission_type: PermissionType,
    /// Granted action or `*`.
    pub action: Action,
    /// System resource for system permissions.
    pub system_resource: Option<String>,
    /// Data scope for data permissions.
    pub scope: Option<DataScopeKind>,
    /// Schema name for table scope.
    pub schema_name: Option<String>,
    /// Table name for table scope.
    pub table_name: Option<String>,
    /// Column name for column scope.
    pub column_name: Option<String>,
    /// Storage metadata: `bucket_name` and `path_pattern`.
    pub metadata: Option<Value>,
}

/// Permission definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    id: PermissionId,
    name: NonEmptyString,
    description: Option<String>,
    action: Action,
    scope: PermissionScope,
}

impl Permission {
    /// Creates a validated permission.
    pub fn new(
        id: PermissionId,
        name: impl Into<String>,
        description: Option<String>,
        action: Action,
        scope: PermissionScope,
    ) -> AppResult<Self> {
        if let PermissionScope::Table { schema, table, column } = &scope {
            if let NamePattern::Exact(schema_name) = schema {
                if is_protected_schema(schema_name) && action != Action::Select {
                    return Err(AppError::Validation(format!(
                        "schema '{schema_name}' is protected and only accepts 'select' permissions"
                    )));
                }
            }

            if let Some(column_name) = column {
                if column_name.trim().is_empty() {
                    return Err(AppError::Validation(
                        "column name must not be empty or whitespace".to_owned(),
                    ));
                }
                if table == &NamePattern::Any {
                    return Err(AppError::Validation(
                        "column permissions must name a concrete table".to_owned(),
                    ));
                }
            }
        }

        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            description: description.filter(|value| !value.trim().is_empty()),
            action,
            scope,
        })
    }

    /// Builds a validated permission from its flat transport shape.
    pub fn from_input(id: PermissionId, input: PermissionDefinitionInput) -> AppResult<Self> {
        let scope = match input.permission_type {
            PermissionType::System => {
                if input.scope.is_some() || input.schema_name.is_some() || input.table_name.is_some()
                {
                    return Err(AppError::Validation(
                        "system permissions must not carry data scope fields".to_owned(),
                    ));
                }
                let resource = required_field(input.system_resource.as_deref(), "system_resource")?;
                PermissionScope::System {
                    resource: SystemResource::from_str(resource)?,
                }
            }
            PermissionType::Data => {
                if input.system_resource.is_some() {
                    return Err(AppError::Validation(
                        "data permissions must not carry a system resource".to_owned(),
                    ));
                }
                match input.scope {
                    Some(DataScopeKind::Table) => PermissionScope::Table {
                        schema: NamePattern::parse(required_field(
                            input.schema_name.as_deref(),
                            "schema_name",
                        )?)?,
                        table: NamePattern::parse(required_field(
                            input.table_name.as_deref(),
                            "table_name",
                        )?)?,
                        column: input.column_name.clone(),
                    },
                    Some(DataScopeKind::Storage) => {
                        let metadata = input.metadata.as_ref().and_then(Value::as_object);
                        let bucket_name = metadata_field(metadata, "bucket_name")?;
                        let path_pattern = metadata_field(metadata, "path_pattern")?;
                        PermissionScope::Storage {
                            bucket: NamePattern::parse(bucket_name)?,
                            path_pattern: PathPattern::parse(path_pattern)?,
                        }
                    }
                    None => {
                        return Err(AppError::Validation(
                            "data permissions require a 'table' or 'storage' scope".to_owned(),
                        ));
                    }
                }
            }
        };

        Self::new(id, input.name, input.description, input.action, scope)
    }

    /// Returns the stable permission identifier.
    #[must_use]
    pub fn id(&self) -> PermissionId {
        self.id
    }

    /// Returns the permission name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the granted action.
    #[must_use]
    pub fn action(&self) -> Action {
        self.action
    }

    /// Returns the validated scope.
    #[must_use]
    pub fn scope(&self) -> &PermissionScope {
        &self.scope
    }

    /// Returns the permission type.
    #[must_use]
    pub fn permission_type(&self) -> PermissionType {
        self.scope.permission_type()
    }
}

impl From<&Permission> for PermissionDefinitionInput {
    fn from(permission: &Permission) -> Self {
        let mut input = Self {
            name: permission.name.as_str().to_owned(),
            description: permission.description.clone(),
            permission_type: permission.permission_type(),
            action: permission.action,
            system_resource: None,
            scope: permission.scope.data_scope(),
            schema_name: None,
            table_name: None,
            column_name: None,
            metadata: None,
        };

        match &permission.scope {
            PermissionScope::System { resource } => {
                input.system_resource = Some(resource.as_str().to_owned());
            }
            PermissionScope::Table {
                schema,
                table,
                column,
            } => {
                input.schema_name = Some(schema.as_str().to_owned());
                input.table_name = Some(table.as_str().to_owned());
                input.column_name = column.clone();
            }
            PermissionScope::Storage {
                bucket,
                path_pattern,
            } => {
                let mut metadata = Map::new();
                metadata.insert(
                    "bucket_name".to_owned(),
                    Value::String(bucket.as_str().to_owned()),
                );
                metadata.insert(
                    "path_pattern".to_owned(),
                    Value::String(path_pattern.as_str().to_owned()),
                );
                input.metadata = Some(Value::Object(metadata));
            }
        }

        input
    }
}

fn required_field<'a>(value: Option<&'a str>, field: &str) -> AppResult<&'a str> {
    value
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Validation(format!("field '{field}' is required")))
}

fn metadata_field<'a>(metadata: Option<&'a Map<String, Value>>, field: &str) -> AppResult<&'a str> {
    metadata
        .and_then(|metadata| metadata.get(field))
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::Validation(format!("storage metadata '{field}' is required")))
}

/// Union of an account's direct role permissions and its role's group permissions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectivePermissionSet {
    permissions: BTreeMap<PermissionId, Permission>,
}

impl EffectivePermissionSet {
    /// Builds a set, collapsing permissions reachable through more than one path.
    #[must_use]
    pub fn from_permissions(permissions: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            permissions: permissions
                .into_iter()
                .map(|permission| (permission.id(), permission))
                .collect(),
        }
    }

    /// Returns whether any permission in the set matches the request.
    #[must_use]
    pub fn grants(&self, request: &AccessRequest) -> bool {
        self.permissions
            .values()
            .any(|permission| scope_matcher::matches(permission, request))
    }

    /// Returns whether any permission grants `action` on `folder` and its whole subtree.
    #[must_use]
    pub fn grants_subtree(&self, bucket: &str, folder: &StoragePath, action: Action) -> bool {
        self.permissions
            .values()
            .any(|permission| scope_matcher::covers_subtree(permission, bucket, folder, action))
    }

    /// Iterates over the permissions in the set.
    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.permissions.values()
    }

    /// Returns the number of distinct permissions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.permissions.len()
    }

    /// Returns whether the set grants nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty()
    }
}
