use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use tessera_core::{AppError, AppResult, NonEmptyString, PermissionGroupId, PermissionId, RoleId};

/// Authority level carried by a role; higher ranks hold more authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RoleRank(u32);

impl RoleRank {
    /// Lowest rank; the tier a non-privileged actor may assign.
    pub const LOWEST: Self = Self(0);

    /// Highest rank that fits the persisted integer column.
    pub const MAX: Self = Self(i32::MAX as u32);

    /// Creates a validated rank from an untrusted integer.
    pub fn new(value: i64) -> AppResult<Self> {
        if value < 0 {
            return Err(AppError::Validation(format!(
                "role rank must be zero or greater, got {value}"
            )));
        }

        if value > i64::from(Self::MAX.0) {
            return Err(AppError::Validation(format!(
                "role rank must not exceed {}, got {value}",
                Self::MAX.0
            )));
        }

        u32::try_from(value)
            .map(Self)
            .map_err(|error| AppError::Validation(format!("invalid role rank {value}: {error}")))
    }

    /// Returns the numeric rank.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl Display for RoleRank {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Role definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    id: RoleId,
    name: NonEmptyString,
    description: Option<String>,
    rank: RoleRank,
}

impl Role {
    /// Creates a validated role.
    pub fn new(
        id: RoleId,
        name: impl Into<String>,
        description: Option<String>,
        rank: RoleRank,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            description: description.filter(|value| !value.trim().is_empty()),
            rank,
        })
    }

    /// Returns the stable role identifier.
    #[must_use]
    pub fn id(&self) -> RoleId {
        self.id
    }

    /// Returns the role name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the role rank.
    #[must_use]
    pub fn rank(&self) -> RoleRank {
        self.rank
    }

    /// Returns a copy of this role carrying a different rank.
    #[must_use]
    pub fn with_rank(&self, rank: RoleRank) -> Self {
        Self {
            rank,
            ..self.clone()
        }
    }
}

/// Reusable bundle of permissions attachable to roles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionGroup {
    id: PermissionGroupId,
    name: NonEmptyString,
    description: Option<String>,
    permission_ids: BTreeSet<PermissionId>,
}

impl PermissionGroup {
    /// Creates a validated permission group.
    pub fn new(
        id: PermissionGroupId,
        name: impl Into<String>,
        description: Option<String>,
        permission_ids: impl IntoIterator<Item = PermissionId>,
    ) -> AppResult<Self> {
        Ok(Self {
            id,
            name: NonEmptyString::new(name)?,
            description: description.filter(|value| !value.trim().is_empty()),
            permission_ids: permission_ids.into_iter().collect(),
        })
    }

    /// Returns the stable group identifier.
    #[must_use]
    pub fn id(&self) -> PermissionGroupId {
        self.id
    }

    /// Returns the group name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the bundled permission identifiers.
    #[must_use]
    pub fn permission_ids(&self) -> &BTreeSet<PermissionId> {
        &self.permission_ids
    }
}
