use precato_client::ClientError;
use serde_json::Value;

pub fn render_error(error: &ClientError) -> String {
    let mut lines = vec![
        "Something went wrong, but it's easy to fix.".to_string(),
        String::new(),
        format!("  Error:    {}", error.code),
        format!("  Details:  {}", error.message),
    ];
    if let Some(data) = error.data.as_ref() {
        lines.extend(context_lines(data));
    }
    lines.push(String::new());
    lines.push("What to do next:".to_string());

    if error.recovery_steps.is_empty() {
        lines.push("  1. Retry the command.".to_string());
    } else {
        for (index, step) in error.recovery_steps.iter().enumerate() {
            lines.push(format!("  {}. {step}", index + 1));
        }
    }

    lines.join("\n")
}

/// Where the failure happened, taken from the error's structured data.
fn context_lines(data: &Value) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(path) = data.get("reference_path").and_then(Value::as_str) {
        lines.push(format!("  File:     {path}"));
    }
    if let Some(column) = data.get("column").and_then(Value::as_str) {
        let searched = data
            .get("searched_fragments")
            .and_then(Value::as_array)
            .map(|fragments| {
                fragments
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<&str>>()
                    .join(", ")
            })
            .filter(|joined| !joined.is_empty());
        match searched {
            Some(joined) => lines.push(format!("  Column:   {column} (looked for {joined})")),
            None => lines.push(format!("  Column:   {column}")),
        }
    }
    lines
}
