use std::io;

use serde_json::Value;

use super::format::{self, Align, Column};

const TABLE_COLUMNS: [Column<'static>; 8] = [
    Column {
        name: "Ordem",
        align: Align::Right,
    },
    Column {
        name: "Precatorio",
        align: Align::Left,
    },
    Column {
        name: "Entity",
        align: Align::Left,
    },
    Column {
        name: "Value",
        align: Align::Right,
    },
    Column {
        name: "Cumulative",
        align: Align::Right,
    },
    Column {
        name: "Months",
        align: Align::Right,
    },
    Column {
        name: "Band",
        align: Align::Left,
    },
    Column {
        name: "Status",
        align: Align::Left,
    },
];

pub fn render_claims_list(data: &Value) -> io::Result<String> {
    let rows = data
        .get("rows")
        .and_then(Value::as_array)
        .ok_or_else(|| io::Error::other("claims list output requires rows"))?;
    let pagination = data.get("pagination").unwrap_or(&Value::Null);
    let enrichment = data.get("enrichment").unwrap_or(&Value::Null);

    let page = int_field(pagination, "page");
    let total_pages = int_field(pagination, "total_pages");
    let total = int_field(pagination, "total");

    let mut lines = vec![
        format!("Claims (page {page} of {}, {total} total)", total_pages.max(1)),
        String::new(),
        "Summary:".to_string(),
    ];
    lines.extend(format::key_value_rows(
        &[
            ("Sorted by:", sort_label(data.get("query"))),
            ("Filters:", filters_label(data.get("query"))),
            ("Reference:", reference_label(data)),
            (
                "Classified:",
                format!(
                    "{} of {} rows ({} entities, cap {})",
                    int_field(enrichment, "classified"),
                    int_field(enrichment, "records"),
                    int_field(enrichment, "entities"),
                    int_field(enrichment, "entity_cap"),
                ),
            ),
        ],
        2,
    ));

    if let Some(issue) = data.get("reference_issue").filter(|value| !value.is_null()) {
        lines.push(String::new());
        lines.push("Reference table problem (derived fields left empty):".to_string());
        lines.push(format!(
            "  {}: {}",
            format::scalar_cell(issue.get("code")),
            format::scalar_cell(issue.get("message"))
        ));
        if let Some(steps) = issue.get("recovery_steps").and_then(Value::as_array) {
            for step in steps.iter().filter_map(Value::as_str) {
                lines.push(format!("  - {step}"));
            }
        }
    }

    lines.push(String::new());
    if rows.is_empty() {
        lines.push("No claims match this page.".to_string());
        return Ok(lines.join("\n"));
    }

    let table_rows = rows.iter().map(claim_cells).collect::<Vec<Vec<String>>>();
    lines.extend(format::render_table_or_blocks(
        &TABLE_COLUMNS,
        &table_rows,
        format::terminal_width(),
        "Claim",
    ));

    if pagination.get("has_next").and_then(Value::as_bool) == Some(true) {
        lines.push(String::new());
        lines.push(format!("Next page: precato claims list --page {}", page + 1));
    }

    Ok(lines.join("\n"))
}

fn claim_cells(row: &Value) -> Vec<String> {
    vec![
        format::scalar_cell(row.get("ordem")),
        format::scalar_cell(row.get("precatorio")),
        format::scalar_cell(row.get("organizacao")),
        format::money_cell(row.get("valor")),
        format::money_cell(row.get("cumulative_total")),
        format::scalar_cell(row.get("months")),
        format::scalar_cell(row.get("band")),
        format::scalar_cell(row.get("status")),
    ]
}

fn int_field(value: &Value, key: &str) -> i64 {
    value.get(key).and_then(Value::as_i64).unwrap_or(0)
}

fn sort_label(query: Option<&Value>) -> String {
    let sort = query.and_then(|value| value.get("sort"));
    let order = query.and_then(|value| value.get("order"));
    format!(
        "{} {}",
        format::scalar_cell(sort),
        format::scalar_cell(order)
    )
}

fn filters_label(query: Option<&Value>) -> String {
    let applied = query
        .and_then(|value| value.get("filters"))
        .and_then(Value::as_array)
        .map(|filters| {
            filters
                .iter()
                .map(|filter| {
                    format!(
                        "{}~{}",
                        format::scalar_cell(filter.get("field")),
                        format::scalar_cell(filter.get("value"))
                    )
                })
                .collect::<Vec<String>>()
        })
        .unwrap_or_default();
    let ignored = query
        .and_then(|value| value.get("ignored_filters"))
        .and_then(Value::as_array)
        .map(|fields| {
            fields
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect::<Vec<String>>()
        })
        .unwrap_or_default();

    let mut label = if applied.is_empty() {
        "none".to_string()
    } else {
        applied.join(", ")
    };
    if !ignored.is_empty() {
        label.push_str(&format!(" (ignored: {})", ignored.join(", ")));
    }
    label
}

fn reference_label(data: &Value) -> String {
    format!(
        "{} ({})",
        format::scalar_cell(data.get("reference_status")),
        format::scalar_cell(data.get("reference_path"))
    )
}
