use std::path::{Path, PathBuf};

use chrono::{DateTime, FixedOffset, SecondsFormat, Utc};

use crate::ClientResult;
use crate::setup::{SetupContext, load_setup};
use crate::state::{resolve_reference_path, resolve_store_home};

/// Brasília standard time; the claims are administered in UTC-3.
const BRASILIA_UTC_OFFSET_SECONDS: i32 = -3 * 60 * 60;

pub(crate) fn generated_at() -> String {
    format_brasilia(Utc::now())
}

pub(crate) fn format_brasilia(instant: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(BRASILIA_UTC_OFFSET_SECONDS) {
        Some(offset) => instant
            .with_timezone(&offset)
            .to_rfc3339_opts(SecondsFormat::Secs, false),
        None => instant.to_rfc3339_opts(SecondsFormat::Secs, true),
    }
}

/// Initialized store plus the reference path that goes with it.
pub(crate) fn load_store_and_reference(
    home_override: Option<&Path>,
    reference_override: Option<&Path>,
) -> ClientResult<(SetupContext, PathBuf)> {
    let setup = load_setup(home_override)?;
    let reference_path = resolve_reference_path(reference_override, &setup.home);
    Ok((setup, reference_path))
}

/// Reference path for commands that never touch the claims store.
pub(crate) fn reference_path_only(
    home_override: Option<&Path>,
    reference_override: Option<&Path>,
) -> ClientResult<PathBuf> {
    if let Some(path) = reference_override {
        return Ok(path.to_path_buf());
    }
    let home = resolve_store_home(home_override)?;
    Ok(resolve_reference_path(None, &home))
}
