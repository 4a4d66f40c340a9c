use std::env;
use std::str::FromStr;
use std::time::Duration;

use tessera_application::{EvaluationConfig, SubtreeLimits};
use tessera_core::AppError;
use tracing_subscriber::EnvFilter;


/// Whether effective permission sets are cached between evaluations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionCacheMode {
    Off,
    Memory,
}

impl FromStr for DecisionCacheMode {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "off" => Ok(Self::Off),
            "memory" => Ok(Self::Memory),
            other => Err(AppError::Validation(format!(
                "TESSERA_DECISION_CACHE must be either 'off' or 'memory', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub evaluation: EvaluationConfig,
    pub subtree_limits: SubtreeLimits,
    pub decision_cache: DecisionCacheMode,
}

impl CliConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = required_non_empty(&lookup, "DATABASE_URL")?;
        let database_max_connections = parsed_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5_u32)?;

        let evaluation_defaults = EvaluationConfig::default();
        let timeout_ms = parsed_or(
            &lookup,
            "TESSERA_EVALUATION_TIMEOUT_MS",
            u64::try_from(evaluation_defaults.timeout.as_millis()).unwrap_or(u64::MAX),
        )?;
        let evaluation = EvaluationConfig {
            timeout: Duration::from_millis(timeout_ms),
            ..evaluation_defaults
        };
        evaluation.validate()?;

        let limit_defaults = SubtreeLimits::default();
        let subtree_limits = SubtreeLimits {
            max_files: parsed_or(&lookup, "TESSERA_SUBTREE_MAX_FILES", limit_defaults.max_files)?,
            max_folders: parsed_or(
                &lookup,
                "TESSERA_SUBTREE_MAX_FOLDERS",
                limit_defaults.max_folders,
            )?,
            listing_batch_size: parsed_or(
                &lookup,
                "TESSERA_SUBTREE_LISTING_BATCH_SIZE",
                limit_defaults.listing_batch_size,
            )?,
            folder_concurrency: parsed_or(
                &lookup,
                "TESSERA_SUBTREE_FOLDER_CONCURRENCY",
                limit_defaults.folder_concurrency,
            )?,
        };
        subtree_limits.validate()?;

        let decision_cache = match lookup("TESSERA_DECISION_CACHE") {
            Some(value) if !value.trim().is_empty() => DecisionCacheMode::from_str(&value)?,
            _ => DecisionCacheMode::Off,
        };

        if database_max_connections == 0 {
            return Err(AppError::Validation(
                "DATABASE_MAX_CONNECTIONS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            database_max_connections,
            evaluation,
            subtree_limits,
            decision_cache,
        })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn required_non_empty(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<String, AppError> {
    let value = lookup(name).ok_or_else(|| AppError::Validation(format!("{name} is required")))?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

fn parsed_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map_err(|error| AppError::Validation(format!("invalid {name}: {error}"))),
        _ => Ok(default),
    }
}
