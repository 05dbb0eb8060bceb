use std::io;

use precato_client::contracts::envelope::failure_from_error;
use precato_client::{ClientError, SuccessEnvelope};
use serde::Serialize;

pub fn render_success_json(success: &SuccessEnvelope) -> io::Result<String> {
    match success.command.as_str() {
        "claims list" | "reference check" | "reference resolve" => {
            serialize_json_pretty(&success.wire())
        }
        _ => Err(io::Error::other(format!(
            "JSON output is not supported for command `{}`",
            success.command
        ))),
    }
}

pub fn render_error_json(error: &ClientError) -> io::Result<String> {
    serialize_json_pretty(&failure_from_error(error))
}

fn serialize_json_pretty<T>(value: &T) -> io::Result<String>
where
    T: Serialize,
{
    serde_json::to_string_pretty(value).map_err(io::Error::other)
}
