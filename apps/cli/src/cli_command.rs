use std::str::FromStr;

use tessera_core::{AccountId, AppError};
use tessera_domain::{Action, StorageAction};


pub const USAGE: &str = "usage:
  tessera-cli migrate
  tessera-cli check <account-uuid> <bucket> <select|insert|update|delete> [--parent <folder>] <path>...
  tessera-cli delete-folder <account-uuid> <bucket> <folder>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    Migrate,
    Check {
        account_id: AccountId,
        bucket: String,
        action: StorageAction,
        parent_path: Option<String>,
        paths: Vec<String>,
    },
    DeleteFolder {
        account_id: AccountId,
        bucket: String,
        folder: String,
    },
}

impl CliCommand {
    /// Parses the arguments following the program name.
    pub fn parse(arguments: &[String]) -> Result<Self, AppError> {
        let Some((command, rest)) = arguments.split_first() else {
            return Err(usage_error("missing command"));
        };

        match command.as_str() {
            "migrate" if rest.is_empty() => Ok(Self::Migrate),
            "migrate" => Err(usage_error("migrate takes no arguments")),
            "check" => parse_check(rest),
            "delete-folder" => match rest {
                [account_id, bucket, folder] => Ok(Self::DeleteFolder {
                    account_id: AccountId::from_str(account_id)?,
                    bucket: bucket.clone(),
                    folder: folder.clone(),
                }),
                _ => Err(usage_error("delete-folder takes exactly three arguments")),
            },
            other => Err(usage_error(&format!("unknown command '{other}'"))),
        }
    }
}

fn parse_check(arguments: &[String]) -> Result<CliCommand, AppError> {
    let [account_id, bucket, action, rest @ ..] = arguments else {
        return Err(usage_error("check needs an account, a bucket and an action"));
    };

    let action = StorageAction::from_action(Action::from_str(action)?)?;

    let (parent_path, paths) = match rest {
        [flag, parent, paths @ ..] if flag == "--parent" => (Some(parent.clone()), paths),
        [flag] if flag == "--parent" => return Err(usage_error("--parent needs a folder")),
        paths => (None, paths),
    };

    if paths.is_empty() {
        return Err(usage_error("check needs at least one path"));
    }

    Ok(CliCommand::Check {
        account_id: AccountId::from_str(account_id)?,
        bucket: bucket.clone(),
        action,
        parent_path,
        paths: paths.to_vec(),
    })
}

fn usage_error(reason: &str) -> AppError {
    AppError::Validation(format!("{reason}\n{USAGE}"))
}
