pub mod config;
pub mod doctor;
pub mod migrate;
pub mod recommend;
pub mod rules;
pub mod seed;

use std::fs;
use std::path::{Path, PathBuf};

use basket_core::config::{AppConfig, LoadOptions};
use basket_core::domain::rule::RuleMetric;
use basket_core::domain::transaction::TransactionRecord;
use basket_core::errors::{ApplicationError, DomainError, InterfaceError};
use basket_core::mining::MiningParams;
use basket_db::repositories::{
    InMemoryTransactionRepository, SqlTransactionRepository, TransactionRepository,
};
use basket_db::{connect_with_config, migrations};
use serde::Serialize;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Successful run whose output is a domain payload rather than a status line.
    pub fn payload<T: Serialize>(command: &str, payload: &T) -> Self {
        match serde_json::to_string_pretty(payload) {
            Ok(output) => Self { exit_code: 0, output },
            Err(error) => Self::failure(command, "serialization", error.to_string(), 7),
        }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Flags shared by the mining commands. Unset values fall back to `[mining]` config.
#[derive(Debug, Clone, Default)]
pub struct MiningArgs {
    pub min_support: Option<f64>,
    pub min_threshold: Option<f64>,
    pub metric: Option<RuleMetric>,
    pub top_k: Option<usize>,
    pub input: Option<PathBuf>,
}

impl MiningArgs {
    pub(crate) fn params(&self, config: &AppConfig) -> MiningParams {
        let mut params = config.mining.to_params();
        if let Some(min_support) = self.min_support {
            params.min_support = min_support;
        }
        if let Some(min_threshold) = self.min_threshold {
            params.min_threshold = min_threshold;
        }
        if let Some(metric) = self.metric {
            params.metric = metric;
        }
        if let Some(top_k) = self.top_k {
            params.top_k = top_k;
        }
        params
    }
}

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(command, "config_validation", format!("configuration issue: {error}"), 2)
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            3,
        )
    })
}

/// Reads transaction records from `--input` when given, otherwise from the
/// configured database (migrating it first so a fresh file reads as empty).
pub(crate) fn load_records(
    command: &str,
    config: &AppConfig,
    input: Option<&Path>,
) -> Result<Vec<TransactionRecord>, CommandResult> {
    let runtime = build_runtime(command)?;
    runtime.block_on(fetch_records(command, config, input))
}

async fn fetch_records(
    command: &str,
    config: &AppConfig,
    input: Option<&Path>,
) -> Result<Vec<TransactionRecord>, CommandResult> {
    match input {
        Some(path) => {
            let records = read_input(command, path)?;
            InMemoryTransactionRepository::from_records(records)
                .list_records()
                .await
                .map_err(|error| CommandResult::failure(command, "storage", error.to_string(), 4))
        }
        None => {
            let pool = connect_with_config(&config.database).await.map_err(|error| {
                CommandResult::failure(command, "db_connectivity", error.to_string(), 4)
            })?;
            migrations::run_pending(&pool)
                .await
                .map_err(|error| CommandResult::failure(command, "migration", error.to_string(), 5))?;

            let records = SqlTransactionRepository::new(pool.clone())
                .list_records()
                .await
                .map_err(|error| CommandResult::failure(command, "storage", error.to_string(), 4));
            pool.close().await;
            records
        }
    }
}

fn read_input(command: &str, path: &Path) -> Result<Vec<TransactionRecord>, CommandResult> {
    let raw = fs::read_to_string(path).map_err(|error| {
        CommandResult::failure(
            command,
            "input",
            format!("could not read input file `{}`: {error}", path.display()),
            2,
        )
    })?;

    serde_json::from_str(&raw).map_err(|error| {
        CommandResult::failure(
            command,
            "input",
            format!("input file `{}` is not a JSON array of records: {error}", path.display()),
            2,
        )
    })
}

/// Maps a mining fault to the same error classes the HTTP API reports.
pub(crate) fn mining_failure(command: &str, error: DomainError) -> CommandResult {
    let interface = ApplicationError::from(error).into_interface(format!("cli-{command}"));
    let exit_code = match interface {
        InterfaceError::BadRequest { .. } => 2,
        InterfaceError::ServiceUnavailable { .. } => 6,
        InterfaceError::Internal { .. } => 7,
    };
    CommandResult::failure(command, interface.error_class(), interface.message(), exit_code)
}
