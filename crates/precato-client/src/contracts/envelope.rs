use serde::Serialize;
use serde_json::Value;

use crate::API_VERSION;
use crate::error::{ClientError, ClientResult};

/// Version tag of the `--json` wire shape. Bumped only when field meaning
/// changes, independent of the crate version.
pub const WIRE_VERSION: &str = "v1";

/// Result of one command before rendering. `command` selects the text
/// renderer; `version` is the crate version that produced `data`.
#[derive(Debug, Clone, Serialize)]
pub struct SuccessEnvelope {
    pub ok: bool,
    pub command: String,
    pub version: String,
    pub data: Value,
}

impl SuccessEnvelope {
    /// The body printed for `--json`.
    pub fn wire(&self) -> WireSuccess<'_> {
        WireSuccess {
            ok: true,
            version: WIRE_VERSION,
            data: &self.data,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WireSuccess<'a> {
    pub ok: bool,
    pub version: &'static str,
    pub data: &'a Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureEnvelope {
    pub ok: bool,
    pub error: ErrorContract,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Code, message and recovery steps of a failure. Also embedded in
/// `claims list` output when a broken reference table degraded the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorContract {
    pub code: String,
    pub message: String,
    pub recovery_steps: Vec<String>,
}

impl From<&ClientError> for ErrorContract {
    fn from(error: &ClientError) -> Self {
        Self {
            code: error.code.clone(),
            message: error.message.clone(),
            recovery_steps: error.recovery_steps.clone(),
        }
    }
}

pub fn success<T>(command: &str, data: T) -> ClientResult<SuccessEnvelope>
where
    T: Serialize,
{
    let json_data = serde_json::to_value(data)
        .map_err(|err| ClientError::internal_serialization(&err.to_string()))?;
    Ok(SuccessEnvelope {
        ok: true,
        command: command.to_string(),
        version: API_VERSION.to_string(),
        data: json_data,
    })
}

pub fn failure_from_error(error: &ClientError) -> FailureEnvelope {
    FailureEnvelope {
        ok: false,
        error: ErrorContract::from(error),
        data: error.data.clone(),
    }
}
