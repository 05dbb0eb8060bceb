use std::path::Path;

use serde_json::{Value, json};
use thiserror::Error;

pub(crate) const REFERENCE_HELP_COMMAND: &str = "precato reference check --help";

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ClientError {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
    pub data: Option<Value>,
}

impl ClientError {
    pub fn new(code: &str, message: &str, recovery_steps: Vec<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            recovery_steps,
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::invalid_argument_for_command(message, None)
    }

    pub fn invalid_argument_for_command(message: &str, command: Option<&str>) -> Self {
        let help_hint = match command {
            Some(cmd) => format!("Run `precato {cmd} --help` for usage."),
            None => "Run `precato --help` for usage.".to_string(),
        };
        let error = Self::new("invalid_argument", message, vec![help_hint]);
        if let Some(cmd) = command {
            return error.with_data(json!({
                "command_hint": cmd,
            }));
        }
        error
    }

    pub fn invalid_argument_with_recovery(message: &str, recovery_steps: Vec<String>) -> Self {
        Self::new("invalid_argument", message, recovery_steps)
    }

    pub fn invalid_config_value(variable: &str, value: &str, expected: &str) -> Self {
        Self::invalid_argument_with_recovery(
            &format!("Environment variable `{variable}` has invalid value `{value}`."),
            vec![
                format!("Set `{variable}` to {expected}, or unset it to use the default."),
            ],
        )
        .with_data(json!({
            "variable": variable,
            "value": value,
        }))
    }

    pub fn reference_unavailable(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "reference_unavailable",
            &format!("Reference table at `{location}` could not be read: {detail}"),
            vec![
                format!("Check that `{location}` exists and is readable."),
                "Pass --reference <path> or set `PRECATO_REFERENCE_PATH`.".to_string(),
            ],
        )
        .with_data(json!({
            "reference_path": location,
            "help_command": REFERENCE_HELP_COMMAND,
        }))
    }

    pub fn reference_header_missing(path: &Path, column: &str, fragments: &[&str]) -> Self {
        let location = path.display().to_string();
        Self::new(
            "reference_header_missing",
            &format!("Reference table at `{location}` has no {column} column."),
            vec![
                format!(
                    "Make sure the header row contains one of: {}.",
                    fragments.join(", ")
                ),
                "Rerun `precato reference check` after fixing the header.".to_string(),
            ],
        )
        .with_data(json!({
            "reference_path": location,
            "column": column,
            "searched_fragments": fragments,
            "help_command": REFERENCE_HELP_COMMAND,
        }))
    }

    pub fn reference_empty(path: &Path, rows_read: usize) -> Self {
        let location = path.display().to_string();
        Self::new(
            "reference_empty",
            &format!(
                "Reference table at `{location}` produced no usable ceilings from {rows_read} rows."
            ),
            vec![
                "Check that ceiling values are positive currency amounts (e.g. `R$ 1.200.000,00`)."
                    .to_string(),
                "Rerun `precato reference check` to see skipped-row counts.".to_string(),
            ],
        )
        .with_data(json!({
            "reference_path": location,
            "rows_read": rows_read,
        }))
    }

    pub fn internal_serialization(message: &str) -> Self {
        Self::new("internal_serialization_error", message, Vec::new())
    }

    pub fn store_init_permission_denied(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_permission_denied",
            &format!("Cannot open claims store at `{location}`: {detail}"),
            vec![format!(
                "Grant access to `{location}` or set `PRECATO_HOME` to a writable directory."
            )],
        )
    }

    pub fn store_locked(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_locked",
            &format!("Claims store is locked at `{location}`."),
            vec![format!(
                "Close other processes using `{location}` so the lock is released."
            )],
        )
    }

    pub fn store_corrupt(path: &Path) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_corrupt",
            &format!("Claims store appears corrupt at `{location}`."),
            vec![format!(
                "Replace `{location}` with a valid SQLite claims store or restore from backup."
            )],
        )
    }

    pub fn migration_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "migration_failed",
            &format!("Claims store migration failed at `{location}`: {detail}"),
            vec!["Resolve conflicting schema objects referenced in the error details.".to_string()],
        )
    }

    pub fn store_init_failed(path: &Path, detail: &str) -> Self {
        let location = path.display().to_string();
        Self::new(
            "store_init_failed",
            &format!("Claims store operation failed at `{location}`: {detail}"),
            Vec::new(),
        )
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
