use std::cmp;

use serde_json::Value;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
pub struct Column<'a> {
    pub name: &'a str,
    pub align: Align,
}

const INDENT: usize = 2;
const COLUMN_GAP: usize = 2;
const EMPTY_CELL: &str = "-";

pub fn terminal_width() -> usize {
    let from_env = std::env::var("COLUMNS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(120);
    cmp::max(from_env, 40)
}

pub fn key_value_rows(entries: &[(&str, String)], indent: usize) -> Vec<String> {
    let label_width = entries
        .iter()
        .map(|(label, _)| label.chars().count())
        .max()
        .unwrap_or(0);
    let padding = " ".repeat(indent);

    entries
        .iter()
        .map(|(label, value)| format!("{padding}{label:<label_width$}  {value}"))
        .collect()
}

/// Renders an aligned table when the natural widths fit in `max_width`, and
/// one labelled block per row otherwise. Cells are never truncated.
pub fn render_table_or_blocks(
    columns: &[Column<'_>],
    rows: &[Vec<String>],
    max_width: usize,
    block_label: &str,
) -> Vec<String> {
    if columns.is_empty() {
        return Vec::new();
    }

    let widths = column_widths(columns, rows);
    let total = INDENT
        + widths.iter().sum::<usize>()
        + COLUMN_GAP * columns.len().saturating_sub(1);
    if total > max_width {
        return render_blocks(columns, rows, block_label);
    }

    let header = columns
        .iter()
        .map(|column| column.name.to_string())
        .collect::<Vec<String>>();
    let mut output = vec![format_row(columns, &header, &widths)];
    output.extend(rows.iter().map(|row| format_row(columns, row, &widths)));
    output
}

fn column_widths(columns: &[Column<'_>], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths = columns
        .iter()
        .map(|column| column.name.chars().count())
        .collect::<Vec<usize>>();
    for row in rows {
        for (slot, value) in widths.iter_mut().zip(row) {
            *slot = cmp::max(*slot, value.chars().count());
        }
    }
    widths
}

fn format_row(columns: &[Column<'_>], cells: &[String], widths: &[usize]) -> String {
    let pieces = columns
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(index, (column, width))| {
            let value = cells.get(index).map(String::as_str).unwrap_or_default();
            match column.align {
                Align::Left => format!("{value:<width$}"),
                Align::Right => format!("{value:>width$}"),
            }
        })
        .collect::<Vec<String>>();
    format!("{}{}", " ".repeat(INDENT), pieces.join(&" ".repeat(COLUMN_GAP)))
        .trim_end()
        .to_string()
}

fn render_blocks(columns: &[Column<'_>], rows: &[Vec<String>], block_label: &str) -> Vec<String> {
    let labels = columns
        .iter()
        .map(|column| format!("{}:", column.name))
        .collect::<Vec<String>>();
    let label_width = labels.iter().map(String::len).max().unwrap_or(0);

    let mut output = Vec::new();
    for (row_index, row) in rows.iter().enumerate() {
        if row_index > 0 {
            output.push(String::new());
        }
        output.push(format!("  {block_label} {}:", row_index + 1));
        for (column_index, label) in labels.iter().enumerate() {
            let value = row.get(column_index).map(String::as_str).unwrap_or_default();
            output.push(format!("    {label:<label_width$}  {value}"));
        }
    }
    output
}

/// Brazilian currency layout: `R$ 1.234.567,89`.
pub fn format_brl(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round();
    let whole = (cents / 100.0).trunc();
    let fraction = cents - whole * 100.0;

    let digits = format!("{whole:.0}");
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0.0 { "-" } else { "" };
    format!("{sign}R$ {grouped},{fraction:02.0}")
}

pub fn money_cell(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_f64)
        .map(format_brl)
        .unwrap_or_else(|| EMPTY_CELL.to_string())
}

/// Strings as-is, numbers in their JSON form, null and missing as `-`.
pub fn scalar_cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => EMPTY_CELL.to_string(),
        Some(Value::String(text)) if text.trim().is_empty() => EMPTY_CELL.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::{
        Align, Column, format_brl, key_value_rows, money_cell, render_table_or_blocks, scalar_cell,
    };

    fn columns() -> [Column<'static>; 2] {
        [
            Column {
                name: "Entity",
                align: Align::Left,
            },
            Column {
                name: "Value",
                align: Align::Right,
            },
        ]
    }

    #[test]
    fn key_value_rows_align_labels() {
        let rows = key_value_rows(
            &[
                ("Rows read:", "100".to_string()),
                ("Rows skipped:", "0".to_string()),
            ],
            2,
        );

        assert_eq!(rows[0], "  Rows read:     100");
        assert_eq!(rows[1], "  Rows skipped:  0");
    }

    #[test]
    fn table_aligns_columns_when_it_fits() {
        let rows = vec![
            vec!["Itu - SP".to_string(), "R$ 50,00".to_string()],
            vec!["Campinas - SP".to_string(), "R$ 1.000,00".to_string()],
        ];

        let rendered = render_table_or_blocks(&columns(), &rows, 80, "Claim");
        assert_eq!(rendered[0], "  Entity               Value");
        assert_eq!(rendered[1], "  Itu - SP          R$ 50,00");
        assert_eq!(rendered[2], "  Campinas - SP  R$ 1.000,00");
    }

    #[test]
    fn narrow_width_falls_back_to_blocks() {
        let rows = vec![
            vec!["Itu - SP".to_string(), "R$ 50,00".to_string()],
            vec!["Salto - SP".to_string(), "R$ 9,00".to_string()],
        ];

        let rendered = render_table_or_blocks(&columns(), &rows, 12, "Claim");
        assert_eq!(rendered[0], "  Claim 1:");
        assert_eq!(rendered[1], "    Entity:  Itu - SP");
        assert_eq!(rendered[2], "    Value:   R$ 50,00");
        assert_eq!(rendered[3], "");
        assert_eq!(rendered[4], "  Claim 2:");
    }

    #[test]
    fn brl_groups_thousands_and_uses_decimal_comma() {
        assert_eq!(format_brl(0.0), "R$ 0,00");
        assert_eq!(format_brl(9.5), "R$ 9,50");
        assert_eq!(format_brl(1_234_567.891), "R$ 1.234.567,89");
        assert_eq!(format_brl(100_000.0), "R$ 100.000,00");
        assert_eq!(format_brl(-42.15), "-R$ 42,15");
    }

    #[test]
    fn missing_values_render_as_dash() {
        assert_eq!(money_cell(None), "-");
        assert_eq!(money_cell(Some(&Value::Null)), "-");
        assert_eq!(scalar_cell(Some(&json!("  "))), "-");
        assert_eq!(scalar_cell(Some(&json!(12))), "12");
        assert_eq!(scalar_cell(Some(&json!("A+"))), "A+");
    }
}
