mod cli;
mod dispatch;
mod output;
mod stdout_io;

use std::process::ExitCode;

use clap::{Parser, error::ErrorKind};
use precato_client::ClientError;
use stdout_io::write_stdout_text;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "PRECATO_LOG";
const DEFAULT_LOG_FILTER: &str = "warn";

const ROOT_HELP: &str = "Precato - ceiling-based accumulation and maturity bands for payment claims

Usage:
  precato <command>

Start here:
  precato reference check
  precato claims list
";

const TOP_LEVEL_HELP: &str = "Precato - ceiling-based accumulation and maturity bands for payment claims

USAGE: precato <command>

Check your ceiling table:
  precato reference check                                 Load the table and report kept and skipped rows
  precato reference resolve \"<entity>\"                    Show how one entity name finds its ceiling

Browse claims:
  precato claims list                                     First page with cumulative totals, months, and bands
  precato claims list --filter organizacao=<text>         Narrow by a field (repeatable)
  precato claims list --sort valor --order desc           Sort by any listed field
  precato claims list --page 2 --per-page 100             Move through pages

Every command accepts --json for machine-readable output.

Where things live:
  PRECATO_HOME             Store directory (default ~/.precato, holds claims.db)
  PRECATO_REFERENCE_PATH   Ceiling table (default <home>/teto_repasse.csv)
  PRECATO_LOG              Log filter for stderr (default warn)

Run `precato <command> --help` for command usage.
";

fn main() -> ExitCode {
    init_tracing();
    match run() {
        Ok(code) => code,
        Err(code) => code,
    }
}

/// Logs go to stderr so stdout stays parseable under `--json`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn run() -> Result<ExitCode, ExitCode> {
    let raw_args = std::env::args().collect::<Vec<String>>();
    if raw_args.len() == 1 {
        if write_stdout_text(ROOT_HELP).is_err() {
            return Err(ExitCode::from(2));
        }
        return Ok(ExitCode::SUCCESS);
    }
    let parsed = cli::Cli::try_parse();
    let cli = match parsed {
        Ok(value) => value,
        Err(err) => return report_parse_error(&err, &raw_args),
    };
    let mode = output::mode_for_command(&cli.command);

    tracing::debug!(command = ?cli.command, "dispatching");
    let dispatched = dispatch::dispatch(&cli);
    match dispatched {
        Ok(success) => {
            if output::print_success(&success, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(error) => {
            if is_internal_error(&error) {
                tracing::error!(code = %error.code, message = %error.message, "command failed");
            }
            if output::print_failure(&error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Err(exit_code_for_error(&error))
        }
    }
}

/// Help and version requests succeed; everything else clap rejects becomes an
/// `invalid_argument` failure in the requested output mode.
fn report_parse_error(
    err: &clap::Error,
    raw_args: &[String],
) -> Result<ExitCode, ExitCode> {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            let text = if is_top_level_help_request(raw_args) {
                TOP_LEVEL_HELP.to_string()
            } else {
                err.to_string()
            };
            if write_stdout_text(&text).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        ErrorKind::DisplayVersion => {
            if write_stdout_text(&err.to_string()).is_err() {
                return Err(ExitCode::from(2));
            }
            Ok(ExitCode::SUCCESS)
        }
        kind => {
            let command_hint = if matches!(
                kind,
                ErrorKind::MissingRequiredArgument
                    | ErrorKind::InvalidValue
                    | ErrorKind::ValueValidation
                    | ErrorKind::WrongNumberOfValues
                    | ErrorKind::UnknownArgument
                    | ErrorKind::InvalidSubcommand
            ) {
                command_path_from_args(raw_args)
            } else {
                None
            };
            let clean_message = strip_clap_boilerplate(&err.to_string());
            let parse_error =
                ClientError::invalid_argument_for_command(&clean_message, command_hint.as_deref());
            let mode = infer_requested_output_mode(raw_args);
            if output::print_failure(&parse_error, mode).is_err() {
                return Err(ExitCode::from(2));
            }
            Err(ExitCode::from(1))
        }
    }
}

fn is_top_level_help_request(raw_args: &[String]) -> bool {
    raw_args.len() == 2 && matches!(raw_args[1].as_str(), "--help" | "-h")
}

/// Drops clap's trailing usage line and "For more information" hint so the
/// "What to do next" section carries the guidance.
fn strip_clap_boilerplate(message: &str) -> String {
    let trimmed = if let Some(pos) = message.find("\n\nUsage:") {
        &message[..pos]
    } else if let Some(pos) = message.find("\nFor more information") {
        &message[..pos]
    } else {
        message
    };
    trimmed.trim_end().to_string()
}

/// Subcommand path (e.g. "claims list") recovered from raw args for help hints.
fn command_path_from_args(raw_args: &[String]) -> Option<String> {
    let words: Vec<&str> = raw_args
        .iter()
        .skip(1)
        .filter(|value| !value.starts_with('-'))
        .map(String::as_str)
        .collect();

    let hint = match words.as_slice() {
        ["claims", "list", ..] => Some("claims list"),
        ["claims", ..] => Some("claims"),
        ["reference", "check", ..] => Some("reference check"),
        ["reference", "resolve", ..] => Some("reference resolve"),
        ["reference", ..] => Some("reference"),
        _ => None,
    };
    hint.map(str::to_string)
}

fn exit_code_for_error(error: &ClientError) -> ExitCode {
    if is_internal_error(error) {
        ExitCode::from(2)
    } else {
        ExitCode::from(1)
    }
}

fn infer_requested_output_mode(raw_args: &[String]) -> output::OutputMode {
    if raw_args.iter().skip(1).any(|value| value == "--json") {
        return output::OutputMode::Json;
    }
    output::OutputMode::Text
}

fn is_internal_error(error: &ClientError) -> bool {
    error.code.starts_with("internal_")
        || matches!(
            error.code.as_str(),
            "store_permission_denied"
                | "store_locked"
                | "store_corrupt"
                | "migration_failed"
                | "store_init_failed"
        )
}
