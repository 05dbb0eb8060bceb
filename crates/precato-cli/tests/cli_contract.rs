use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use rusqlite::{Connection, params};
use serde_json::Value;
use tempfile::{TempDir, tempdir};

const EXPECTED_ROOT_HELP: &str = "Precato - ceiling-based accumulation and maturity bands for payment claims

Usage:
  precato <command>

Start here:
  precato reference check
  precato claims list
";

struct CliOutput {
    code: Option<i32>,
    stdout: String,
}

fn test_home() -> (TempDir, PathBuf) {
    let temp = tempdir();
    assert!(temp.is_ok());
    match temp {
        Ok(dir) => {
            let home = dir.path().join("precato-home");
            (dir, home)
        }
        Err(_) => panic!("temporary directory unavailable"),
    }
}

fn run_cli(home: &Path, args: &[&str]) -> CliOutput {
    let mut command = Command::new(env!("CARGO_BIN_EXE_precato"));
    command.args(args);
    command.env("PRECATO_HOME", home);
    command.env_remove("PRECATO_REFERENCE_PATH");
    command.env_remove("PRECATO_LOG");
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    let output = command.output();
    assert!(output.is_ok());
    if let Ok(result) = output {
        let stdout = String::from_utf8(result.stdout);
        assert!(stdout.is_ok());
        if let Ok(text) = stdout {
            return CliOutput {
                code: result.status.code(),
                stdout: text,
            };
        }
    }
    CliOutput {
        code: None,
        stdout: String::new(),
    }
}

fn parse_json(body: &str) -> Value {
    let parsed = serde_json::from_str::<Value>(body);
    assert!(parsed.is_ok(), "not JSON: {body}");
    parsed.unwrap_or(Value::Null)
}

fn write_reference(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("teto_repasse.csv");
    assert!(fs::write(&path, body).is_ok());
    path
}

/// Initializes the store through the binary, then inserts claims directly.
fn seed_store(home: &Path, rows: &[(&str, i64, &str, f64)]) {
    let init = run_cli(home, &["claims", "list", "--json"]);
    assert_eq!(init.code, Some(0));

    let connection = Connection::open(home.join("claims.db"));
    assert!(connection.is_ok());
    if let Ok(conn) = connection {
        for (precatorio, ordem, organizacao, valor) in rows {
            let inserted = conn.execute(
                "INSERT INTO precatorios (precatorio, ordem, organizacao, regime, ano_orc, situacao, valor, esta_na_ordem)
                 VALUES (?1, ?2, ?3, 'ESPECIAL', '2026', 'PENDENTE', ?4, 1)",
                params![precatorio, ordem, organizacao, valor],
            );
            assert!(inserted.is_ok());
        }
    }
}

fn assert_text_error_contract(body: &str, code: &str) {
    assert!(body.contains("Something went wrong, but it's easy to fix."));
    assert!(body.contains(&format!("  Error:    {code}")));
    assert!(body.contains("  Details:"));
    assert!(body.contains("What to do next:"));
}

#[test]
fn root_command_uses_short_plaintext_help() {
    let (_dir, home) = test_home();
    let output = run_cli(&home, &[]);
    assert_eq!(output.code, Some(0));
    assert_eq!(output.stdout, EXPECTED_ROOT_HELP);
}

#[test]
fn help_and_version_return_success_output() {
    let (_dir, home) = test_home();
    let help = run_cli(&home, &["--help"]);
    assert_eq!(help.code, Some(0));
    assert!(help.stdout.starts_with("Precato - ceiling-based accumulation"));
    assert!(help.stdout.contains("precato reference resolve"));
    assert!(help.stdout.contains("PRECATO_REFERENCE_PATH"));

    let version = run_cli(&home, &["--version"]);
    assert_eq!(version.code, Some(0));
    assert_eq!(version.stdout.trim(), "precato 0.1.0");
}

#[test]
fn bare_group_command_shows_its_subcommands() {
    let (_dir, home) = test_home();
    let output = run_cli(&home, &["reference"]);
    assert_eq!(output.code, Some(0));
    assert!(output.stdout.contains("check"));
    assert!(output.stdout.contains("resolve"));
}

#[test]
fn claims_list_on_a_new_store_degrades_without_reference() {
    let (_dir, home) = test_home();
    let output = run_cli(&home, &["claims", "list", "--json"]);
    assert_eq!(output.code, Some(0));

    let payload = parse_json(&output.stdout);
    assert_eq!(payload["ok"], Value::Bool(true));
    assert_eq!(payload["version"], Value::String("v1".to_string()));
    assert_eq!(
        payload["data"]["reference_status"],
        Value::String("unavailable".to_string())
    );
    assert_eq!(
        payload["data"]["reference_issue"]["code"],
        Value::String("reference_unavailable".to_string())
    );
    assert_eq!(payload["data"]["rows"], Value::Array(Vec::new()));
    assert!(home.join("claims.db").exists());
}

#[test]
fn claims_list_json_and_text_show_derived_fields() {
    let (dir, home) = test_home();
    seed_store(
        &home,
        &[
            ("0001/2024", 1, "Itu - SP", 50_000.0),
            ("0002/2024", 2, "Itu - SP", 70_000.0),
        ],
    );
    let reference = write_reference(
        dir.path(),
        "Estado;Ente Devedor;Teto Repasse PEC 66\nSP;Itu;R$ 480.000,00\n",
    );
    let reference_arg = reference.display().to_string();

    let json = run_cli(
        &home,
        &[
            "claims",
            "list",
            "--sort",
            "ordem",
            "--reference",
            &reference_arg,
            "--json",
        ],
    );
    assert_eq!(json.code, Some(0));
    let payload = parse_json(&json.stdout);
    let rows = payload["data"]["rows"].as_array().cloned().unwrap_or_default();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[1]["cumulative_total"], Value::from(120_000.0));
    assert_eq!(rows[1]["months"], Value::from(3));
    assert_eq!(rows[1]["band"], Value::String("A+".to_string()));
    assert_eq!(rows[1]["status"], Value::String("classified".to_string()));

    let text = run_cli(
        &home,
        &["claims", "list", "--sort", "ordem", "--reference", &reference_arg],
    );
    assert_eq!(text.code, Some(0));
    assert!(text.stdout.starts_with("Claims (page 1 of 1, 2 total)"));
    assert!(text.stdout.contains("R$ 120.000,00"));
    assert!(text.stdout.contains("A+"));
}

#[test]
fn claims_list_filter_narrows_rows() {
    let (dir, home) = test_home();
    seed_store(
        &home,
        &[
            ("0001/2024", 1, "Itu - SP", 50_000.0),
            ("0001/2025", 1, "Salto - SP", 10_000.0),
        ],
    );
    let reference = write_reference(
        dir.path(),
        "Estado;Ente Devedor;Teto Repasse PEC 66\nSP;Salto;R$ 120.000,00\n",
    );
    let reference_arg = reference.display().to_string();

    let output = run_cli(
        &home,
        &[
            "claims",
            "list",
            "--filter",
            "organizacao=salto",
            "--filter",
            "cor=azul",
            "--reference",
            &reference_arg,
            "--json",
        ],
    );
    assert_eq!(output.code, Some(0));
    let payload = parse_json(&output.stdout);
    assert_eq!(payload["data"]["pagination"]["total"], Value::from(1));
    assert_eq!(
        payload["data"]["query"]["ignored_filters"][0],
        Value::String("cor".to_string())
    );
    assert_eq!(payload["data"]["rows"][0]["months"], Value::from(1));
}

#[test]
fn reference_check_reports_missing_file_as_json_error() {
    let (dir, home) = test_home();
    let missing = dir.path().join("absent.csv").display().to_string();
    let output = run_cli(&home, &["reference", "check", "--reference", &missing, "--json"]);
    assert_eq!(output.code, Some(1));

    let payload = parse_json(&output.stdout);
    assert_eq!(payload["ok"], Value::Bool(false));
    assert_eq!(
        payload["error"]["code"],
        Value::String("reference_unavailable".to_string())
    );
    assert!(payload["error"]["recovery_steps"].is_array());
}

#[test]
fn reference_check_text_summarizes_the_table() {
    let (dir, home) = test_home();
    let reference = write_reference(
        dir.path(),
        "Estado;Ente Devedor;Teto Repasse PEC 66\nSP;Itu;R$ 480.000,00\nSP;Salto;sem teto\n",
    );
    let reference_arg = reference.display().to_string();
    let output = run_cli(&home, &["reference", "check", "--reference", &reference_arg]);
    assert_eq!(output.code, Some(0));
    assert!(output.stdout.starts_with("Reference table loaded."));
    assert!(output.stdout.contains("Unparseable:   1"));
    assert!(output.stdout.contains("R$ 40.000,00"));
}

#[test]
fn reference_resolve_text_lists_candidates_and_ceiling() {
    let (dir, home) = test_home();
    let reference = write_reference(
        dir.path(),
        "Estado;Ente Devedor;Teto Repasse PEC 66\nSP;Campinas;R$ 1.200.000,00\n",
    );
    let reference_arg = reference.display().to_string();
    let output = run_cli(
        &home,
        &["reference", "resolve", "Campinas/SP", "--reference", &reference_arg],
    );
    assert_eq!(output.code, Some(0));
    assert!(output.stdout.starts_with("Entity matched a reference ceiling."));
    assert!(output.stdout.contains("entity_slash_region"));
    assert!(output.stdout.contains("R$ 100.000,00"));
}

#[test]
fn unknown_flag_uses_plaintext_error_contract() {
    let (_dir, home) = test_home();
    let output = run_cli(&home, &["claims", "list", "--nope"]);
    assert_eq!(output.code, Some(1));
    assert_text_error_contract(&output.stdout, "invalid_argument");
    assert!(output.stdout.contains("precato claims list --help"));
}

#[test]
fn invalid_filter_uses_json_error_contract_when_requested() {
    let (_dir, home) = test_home();
    let output = run_cli(&home, &["claims", "list", "--filter", "itu", "--json"]);
    assert_eq!(output.code, Some(1));
    let payload = parse_json(&output.stdout);
    assert_eq!(
        payload["error"]["code"],
        Value::String("invalid_argument".to_string())
    );
}
