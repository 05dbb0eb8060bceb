use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::functions::FunctionFlags;
use rusqlite::hooks::{AuthAction, AuthContext, Authorization};
use rusqlite::{Connection, Error as SqliteError, OpenFlags, ffi::ErrorCode};

use crate::{ClientError, ClientResult};

pub const HOME_ENV: &str = "PRECATO_HOME";
pub const REFERENCE_PATH_ENV: &str = "PRECATO_REFERENCE_PATH";
const DEFAULT_REFERENCE_FILE: &str = "teto_repasse.csv";

/// SQL name of the Unicode lower-casing function installed on read-only
/// connections. SQLite's built-in `LOWER` only folds ASCII.
pub const FOLD_CASE_FN: &str = "fold_case";

pub fn resolve_store_home(home_override: Option<&Path>) -> ClientResult<PathBuf> {
    let candidate = match home_override {
        Some(path) => path.to_path_buf(),
        None => {
            if let Some(override_path) = std::env::var_os(HOME_ENV) {
                PathBuf::from(override_path)
            } else if let Some(home_path) = home::home_dir() {
                home_path.join(".precato")
            } else {
                return Err(ClientError::store_init_failed(
                    Path::new("."),
                    "Could not resolve a home directory for the claims store.",
                ));
            }
        }
    };

    absolutize(&candidate)
}

/// Picks the reference table path: explicit flag, then environment, then the
/// default file inside the store home.
pub fn resolve_reference_path(explicit: Option<&Path>, home: &Path) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Some(from_env) = std::env::var_os(REFERENCE_PATH_ENV) {
        return PathBuf::from(from_env);
    }
    home.join(DEFAULT_REFERENCE_FILE)
}

pub fn ensure_store_directory(path: &Path) -> ClientResult<()> {
    fs::create_dir_all(path).map_err(|error| map_io_error(path, &error))?;
    set_private_permissions_best_effort(path);
    Ok(())
}

pub fn store_db_path(home: &Path) -> PathBuf {
    home.join("claims.db")
}

pub fn open_connection(db_path: &Path) -> ClientResult<Connection> {
    let connection =
        Connection::open(db_path).map_err(|error| map_sqlite_error(db_path, &error))?;
    connection
        .busy_timeout(Duration::from_millis(250))
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(connection)
}

/// Opens the store for reads only. Beyond the read-only open flag, an
/// authorizer rejects anything other than SELECT, reads of user tables, and
/// function calls.
pub fn open_readonly_connection(db_path: &Path) -> ClientResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI;
    let connection = Connection::open_with_flags(db_path, flags)
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    connection
        .busy_timeout(Duration::from_millis(250))
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    install_readonly_authorizer(&connection)
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    install_fold_case(&connection).map_err(|error| map_sqlite_error(db_path, &error))?;
    Ok(connection)
}

fn install_fold_case(connection: &Connection) -> rusqlite::Result<()> {
    connection.create_scalar_function(
        FOLD_CASE_FN,
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let value = ctx.get::<Option<String>>(0)?;
            Ok(value.map(|text| text.to_lowercase()))
        },
    )
}

fn install_readonly_authorizer(connection: &Connection) -> rusqlite::Result<()> {
    connection.authorizer(Some(|context: AuthContext<'_>| {
        if authorize_action(context) {
            Authorization::Allow
        } else {
            Authorization::Deny
        }
    }))
}

fn authorize_action(context: AuthContext<'_>) -> bool {
    match context.action {
        AuthAction::Select | AuthAction::Function { .. } => true,
        AuthAction::Read { table_name, .. } => !table_name.to_lowercase().starts_with("sqlite_"),
        _ => false,
    }
}

pub fn map_io_error(path: &Path, error: &std::io::Error) -> ClientError {
    if error.kind() == std::io::ErrorKind::PermissionDenied {
        return ClientError::store_init_permission_denied(path, &error.to_string());
    }

    ClientError::store_init_failed(path, &error.to_string())
}

pub fn map_sqlite_error(path: &Path, error: &SqliteError) -> ClientError {
    let error_code = error.sqlite_error_code();

    if matches!(
        error_code,
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    ) {
        return ClientError::store_locked(path);
    }

    if matches!(error_code, Some(ErrorCode::NotADatabase)) {
        return ClientError::store_corrupt(path);
    }

    if matches!(
        error_code,
        Some(ErrorCode::CannotOpen | ErrorCode::ReadOnly)
    ) {
        return ClientError::store_init_permission_denied(path, &error.to_string());
    }

    ClientError::store_init_failed(path, &error.to_string())
}

fn absolutize(path: &Path) -> ClientResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .map_err(|error| ClientError::store_init_failed(path, &error.to_string()))
}

#[cfg(unix)]
fn set_private_permissions_best_effort(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o700));
}

#[cfg(not(unix))]
fn set_private_permissions_best_effort(_path: &Path) {}
