#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use precato_client::setup::ensure_initialized_at;
use precato_client::state::store_db_path;
use rusqlite::{Connection, params};
use tempfile::{TempDir, tempdir};

pub const REFERENCE_HEADER: &str = "Estado;Ente Devedor;Teto Repasse PEC 66";

/// One claim row as inserted into the store.
#[derive(Debug, Clone)]
pub struct SeedClaim {
    pub precatorio: &'static str,
    pub ordem: Option<i64>,
    pub organizacao: Option<&'static str>,
    pub valor: Option<f64>,
    pub esta_na_ordem: bool,
}

pub fn claim(precatorio: &'static str, organizacao: &'static str, ordem: i64, valor: f64) -> SeedClaim {
    SeedClaim {
        precatorio,
        ordem: Some(ordem),
        organizacao: Some(organizacao),
        valor: Some(valor),
        esta_na_ordem: true,
    }
}

pub fn temp_home() -> std::io::Result<(TempDir, PathBuf)> {
    let dir = tempdir()?;
    let home = dir.path().join("precato-home");
    Ok((dir, home))
}

/// Initializes the store under `home` and inserts `claims` in order.
pub fn seed_claims(home: &Path, claims: &[SeedClaim]) {
    let setup = ensure_initialized_at(home);
    assert!(setup.is_ok());

    let connection = Connection::open(store_db_path(home));
    assert!(connection.is_ok());
    if let Ok(conn) = connection {
        for seed in claims {
            let inserted = conn.execute(
                "INSERT INTO precatorios (precatorio, ordem, organizacao, regime, ano_orc, situacao, valor, esta_na_ordem)
                 VALUES (?1, ?2, ?3, 'ESPECIAL', '2026', 'PENDENTE', ?4, ?5)",
                params![
                    seed.precatorio,
                    seed.ordem,
                    seed.organizacao,
                    seed.valor,
                    i64::from(seed.esta_na_ordem)
                ],
            );
            assert!(inserted.is_ok());
        }
    }
}

/// Writes a `;`-delimited reference file with `(region, entity, annual)` rows.
pub fn write_reference(dir: &Path, rows: &[(&str, &str, &str)]) -> PathBuf {
    let create = fs::create_dir_all(dir);
    assert!(create.is_ok());

    let mut body = String::from(REFERENCE_HEADER);
    body.push('\n');
    for (region, entity, annual) in rows {
        body.push_str(&format!("{region};{entity};{annual}\n"));
    }

    let path = dir.join("teto_repasse.csv");
    let write = fs::write(&path, body);
    assert!(write.is_ok());
    path
}
