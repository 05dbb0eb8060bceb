use std::io;

use serde_json::Value;

use super::format::{self, Align, Column};

pub fn render_reference_check(data: &Value) -> io::Result<String> {
    let report = data
        .get("report")
        .ok_or_else(|| io::Error::other("reference check output requires report"))?;

    let mut lines = vec![
        "Reference table loaded.".to_string(),
        String::new(),
        "Columns:".to_string(),
    ];
    lines.extend(format::key_value_rows(
        &[
            ("File:", format::scalar_cell(data.get("reference_path"))),
            ("Delimiter:", delimiter_label(report.get("delimiter"))),
            ("Entity:", format::scalar_cell(report.get("entity_header"))),
            ("Region:", format::scalar_cell(report.get("region_header"))),
            ("Ceiling:", format::scalar_cell(report.get("ceiling_header"))),
        ],
        2,
    ));

    lines.push(String::new());
    lines.push("Rows:".to_string());
    lines.extend(format::key_value_rows(
        &[
            ("Read:", count(report, "rows_read")),
            ("Registered:", count(report, "rows_registered")),
            ("Keys:", count(report, "keys_registered")),
            ("Too short:", count(report, "skipped_short")),
            ("Blank:", count(report, "skipped_blank")),
            ("Unparseable:", count(report, "skipped_unparseable")),
            ("Not positive:", count(report, "skipped_non_positive")),
            ("Malformed:", count(report, "skipped_malformed")),
        ],
        2,
    ));

    let preview = data
        .get("keys_preview")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if !preview.is_empty() {
        lines.push(String::new());
        lines.push("First keys:".to_string());
        let columns = [
            Column {
                name: "Key",
                align: Align::Left,
            },
            Column {
                name: "Monthly ceiling",
                align: Align::Right,
            },
        ];
        let rows = preview
            .iter()
            .map(|entry| {
                vec![
                    format::scalar_cell(entry.get("key")),
                    format::money_cell(entry.get("monthly_ceiling")),
                ]
            })
            .collect::<Vec<Vec<String>>>();
        lines.extend(format::render_table_or_blocks(
            &columns,
            &rows,
            format::terminal_width(),
            "Key",
        ));
    }

    Ok(lines.join("\n"))
}

pub fn render_reference_resolve(data: &Value) -> io::Result<String> {
    let resolution = data
        .get("resolution")
        .ok_or_else(|| io::Error::other("reference resolve output requires resolution"))?;
    let outcome = resolution.get("outcome").and_then(Value::as_str);

    let mut lines = vec![
        match outcome {
            Some("matched") => "Entity matched a reference ceiling.".to_string(),
            _ => "Entity did not match any reference ceiling.".to_string(),
        },
        String::new(),
    ];
    lines.extend(format::key_value_rows(
        &[
            ("Name:", format::scalar_cell(data.get("name"))),
            ("Entity:", format::scalar_cell(data.get("entity"))),
            ("Region:", format::scalar_cell(data.get("region"))),
            ("File:", format::scalar_cell(data.get("reference_path"))),
        ],
        2,
    ));

    let candidates = data
        .get("candidates")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    lines.push(String::new());
    lines.push("Candidate keys (in lookup order):".to_string());
    let columns = [
        Column {
            name: "Strategy",
            align: Align::Left,
        },
        Column {
            name: "Key",
            align: Align::Left,
        },
        Column {
            name: "Present",
            align: Align::Left,
        },
    ];
    let rows = candidates
        .iter()
        .map(|candidate| {
            let present = candidate.get("present").and_then(Value::as_bool) == Some(true);
            vec![
                format::scalar_cell(candidate.get("strategy")),
                format::scalar_cell(candidate.get("key")),
                if present { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect::<Vec<Vec<String>>>();
    lines.extend(format::render_table_or_blocks(
        &columns,
        &rows,
        format::terminal_width(),
        "Candidate",
    ));

    lines.push(String::new());
    lines.push("Result:".to_string());
    let result_rows = if outcome == Some("matched") {
        vec![
            ("Strategy:", format::scalar_cell(resolution.get("strategy"))),
            ("Key:", format::scalar_cell(resolution.get("key"))),
            (
                "Monthly ceiling:",
                format::money_cell(resolution.get("ceiling")),
            ),
        ]
    } else {
        vec![
            (
                "Candidates tried:",
                format::scalar_cell(resolution.get("candidates_tried")),
            ),
            (
                "Keys scanned:",
                format!(
                    "{} (limit {})",
                    format::scalar_cell(resolution.get("keys_scanned")),
                    format::scalar_cell(data.get("scan_limit"))
                ),
            ),
        ]
    };
    lines.extend(format::key_value_rows(&result_rows, 2));

    Ok(lines.join("\n"))
}

fn count(report: &Value, key: &str) -> String {
    report
        .get(key)
        .and_then(Value::as_u64)
        .unwrap_or(0)
        .to_string()
}

fn delimiter_label(value: Option<&Value>) -> String {
    match value.and_then(Value::as_str) {
        Some("\t") => "tab".to_string(),
        Some(other) => format!("`{other}`"),
        None => "-".to_string(),
    }
}
