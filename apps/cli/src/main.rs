//! Tessera command-line composition root.

#![forbid(unsafe_code)]

mod cli_command;
mod cli_config;
mod cli_services;

use std::collections::BTreeMap;
use std::env;
use std::process::ExitCode;

use serde::Serialize;
use tessera_application::SubtreeDeleteAuthorization;
use tessera_core::AppError;
use tessera_domain::StorageDecision;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli_command::CliCommand;
use crate::cli_config::{CliConfig, init_tracing};
use crate::cli_services::{CliServices, connect_and_migrate};

#[derive(Debug, Serialize)]
struct FolderDeleteReport {
    folder: String,
    authorized_by: &'static str,
    objects: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            error!(error = %failure, "command failed");
            if failure.is_caller_correctable() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run() -> Result<(), AppError> {
    let arguments: Vec<String> = env::args().skip(1).collect();
    let command = CliCommand::parse(&arguments)?;
    let config = CliConfig::load()?;
    let pool = connect_and_migrate(&config).await?;

    let services = CliServices::build(&config, pool);

    match command {
        CliCommand::Migrate => {
            info!("database migrations applied successfully");
            Ok(())
        }
        CliCommand::Check {
            account_id,
            bucket,
            action,
            parent_path,
            paths,
        } => {
            let decisions = services
                .authorization_service
                .bulk_evaluate(
                    account_id,
                    bucket.as_str(),
                    action,
                    &paths,
                    parent_path.as_deref(),
                )
                .await?;
            let ordered: BTreeMap<String, StorageDecision> = decisions.into_iter().collect();
            print_json(&ordered)
        }
        CliCommand::DeleteFolder {
            account_id,
            bucket,
            folder,
        } => {
            let token = CancellationToken::new();
            let interrupt = token.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, cancelling subtree enumeration");
                    interrupt.cancel();
                }
            });

            let authorization = services
                .subtree_delete_resolver
                .authorize_folder_delete(account_id, bucket.as_str(), folder.as_str(), &token)
                .await?;

            let report = match authorization {
                SubtreeDeleteAuthorization::WholeSubtree => FolderDeleteReport {
                    folder,
                    authorized_by: "folder_grant",
                    objects: Vec::new(),
                },
                SubtreeDeleteAuthorization::PerObject(paths) => FolderDeleteReport {
                    folder,
                    authorized_by: "per_object",
                    objects: paths.iter().map(ToString::to_string).collect(),
                },
            };
            print_json(&report)
        }
    }
}

fn print_json(value: &impl Serialize) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|error| AppError::Internal(format!("failed to render output: {error}")))?;
    println!("{rendered}");
    Ok(())
}
