use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tessera_core::AppError;

/// Action vocabulary carried by permissions and requested by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Read rows or objects.
    #[serde(rename = "select")]
    Select,
    /// Create rows or upload objects.
    #[serde(rename = "insert")]
    Insert,
    /// Modify rows or objects.
    #[serde(rename = "update")]
    Update,
    /// Remove rows or objects.
    #[serde(rename = "delete")]
    Delete,
    /// Wildcard satisfying every concrete action.
    #[serde(rename = "*")]
    All,
}

impl Action {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::All => "*",
        }
    }

    /// Returns the concrete (non-wildcard) actions.
    #[must_use]
    pub fn concrete() -> &'static [Self] {
        const CONCRETE: &[Action] = &[Action::Select, Action::Insert, Action::Update, Action::Delete];

        CONCRETE
    }

    /// Returns whether a grant carrying this action covers the requested action.
    #[must_use]
    pub fn satisfies(self, requested: Self) -> bool {
        self == Self::All || self == requested
    }
}

impl FromStr for Action {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "select" => Ok(Self::Select),
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "*" => Ok(Self::All),
            _ => Err(AppError::Validation(format!("unknown action value '{value}'"))),
        }
    }
}

/// The four storage operations reported per path by bulk evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageAction {
    /// Download or list an object.
    Read,
    /// Create a new object.
    Upload,
    /// Overwrite or move an object.
    Update,
    /// Remove an object.
    Delete,
}

impl StorageAction {
    /// Returns all storage actions in decision order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[StorageAction] = &[
            StorageAction::Read,
            StorageAction::Update,
            StorageAction::Delete,
            StorageAction::Upload,
        ];

        ALL
    }

    /// Returns the permission action a storage operation is checked against.
    #[must_use]
    pub fn action(self) -> Action {
        match self {
            Self::Read => Action::Select,
            Self::Upload => Action::Insert,
            Self::Update => Action::Update,
            Self::Delete => Action::Delete,
        }
    }

    /// Maps a concrete permission action to its storage operation.
    pub fn from_action(action: Action) -> Result<Self, AppError> {
        match action {
            Action::Select => Ok(Self::Read),
            Action::Insert => Ok(Self::Upload),
            Action::Update => Ok(Self::Update),
            Action::Delete => Ok(Self::Delete),
            Action::All => Err(AppError::Validation(
                "storage requests must name a concrete action".to_owned(),
            )),
        }
    }
}
