use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::ClientError;
use crate::engine::normalize::{normalize_header, normalize_key, parse_currency};

const MONTHS_PER_YEAR: f64 = 12.0;
const CANDIDATE_DELIMITERS: [u8; 3] = [b';', b'\t', b','];

/// How one logical column is recognized in a header row that drifts between
/// file versions. `contains` fragments match anywhere in the normalized header,
/// `exact` fragments must equal it (short labels like `UF` would otherwise
/// match unrelated headers). Fragments are tried in order.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub label: &'static str,
    pub contains: &'static [&'static str],
    pub exact: &'static [&'static str],
}

impl ColumnSpec {
    pub fn fragments(&self) -> Vec<&'static str> {
        self.contains.iter().chain(self.exact.iter()).copied().collect()
    }

    fn locate(&self, headers: &[String]) -> Option<usize> {
        for fragment in self.contains {
            if let Some(index) = headers.iter().position(|header| header.contains(fragment)) {
                return Some(index);
            }
        }
        for fragment in self.exact {
            if let Some(index) = headers.iter().position(|header| header == fragment) {
                return Some(index);
            }
        }
        None
    }
}

pub const ENTITY_COLUMN: ColumnSpec = ColumnSpec {
    label: "entity",
    contains: &["ENTE DEVEDOR", "DEVEDOR"],
    exact: &["ENTE"],
};

pub const REGION_COLUMN: ColumnSpec = ColumnSpec {
    label: "region",
    contains: &["ESTADO"],
    exact: &["UF"],
};

pub const CEILING_COLUMN: ColumnSpec = ColumnSpec {
    label: "ceiling",
    contains: &["TETO REPASSE", "TETO"],
    exact: &[],
};

/// Key variant → monthly ceiling lookup.
///
/// Keys iterate in first-insertion order. When two rows produce the same key
/// the later row's ceiling replaces the earlier one (last write wins) but the
/// key keeps its original position. This can let a less specific row override
/// a more specific one depending on file order; it is preserved as observed.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    ceilings: HashMap<String, f64>,
    keys: Vec<String>,
}

impl ReferenceTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.ceilings.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn insert(&mut self, key: String, monthly_ceiling: f64) {
        if self.ceilings.insert(key.clone(), monthly_ceiling).is_none() {
            self.keys.push(key);
        }
    }
}

impl FromIterator<(String, f64)> for ReferenceTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut table = Self::empty();
        for (key, ceiling) in iter {
            table.insert(key, ceiling);
        }
        table
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub source: String,
    pub delimiter: String,
    pub entity_header: String,
    pub region_header: Option<String>,
    pub ceiling_header: String,
    pub rows_read: usize,
    pub rows_registered: usize,
    pub skipped_short: usize,
    pub skipped_blank: usize,
    pub skipped_unparseable: usize,
    pub skipped_non_positive: usize,
    pub skipped_malformed: usize,
    pub keys_registered: usize,
}

#[derive(Debug, Clone)]
pub struct LoadedReference {
    pub table: ReferenceTable,
    pub report: LoadReport,
}

#[derive(Debug, Clone, Error)]
pub enum ReferenceError {
    #[error("reference table `{}` is unreadable: {detail}", path.display())]
    Unreadable { path: PathBuf, detail: String },
    #[error("reference table `{}` has no {} column", path.display(), column.label)]
    HeaderMissing { path: PathBuf, column: ColumnSpec },
    #[error("reference table `{}` has no valid rows out of {rows_read}", path.display())]
    NoValidRows { path: PathBuf, rows_read: usize },
}

impl From<ReferenceError> for ClientError {
    fn from(error: ReferenceError) -> Self {
        match error {
            ReferenceError::Unreadable { path, detail } => {
                ClientError::reference_unavailable(&path, &detail)
            }
            ReferenceError::HeaderMissing { path, column } => {
                ClientError::reference_header_missing(&path, column.label, &column.fragments())
            }
            ReferenceError::NoValidRows { path, rows_read } => {
                ClientError::reference_empty(&path, rows_read)
            }
        }
    }
}

/// Source of reference tables for the cache.
pub trait ReferenceLoader: Send + Sync {
    fn load(&self) -> Result<LoadedReference, ReferenceError>;
}

/// Reads the reference table from a delimited file on disk.
#[derive(Debug, Clone)]
pub struct FileReferenceLoader {
    path: PathBuf,
}

impl FileReferenceLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReferenceLoader for FileReferenceLoader {
    fn load(&self) -> Result<LoadedReference, ReferenceError> {
        load_reference_file(&self.path)
    }
}

pub fn load_reference_file(path: &Path) -> Result<LoadedReference, ReferenceError> {
    let bytes = fs::read(path).map_err(|error| ReferenceError::Unreadable {
        path: path.to_path_buf(),
        detail: error.to_string(),
    })?;
    parse_reference(&decode_text(&bytes), path)
}

pub fn parse_reference(content: &str, path: &Path) -> Result<LoadedReference, ReferenceError> {
    let delimiter = sniff_delimiter(content);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let raw_headers = reader
        .headers()
        .map_err(|error| ReferenceError::Unreadable {
            path: path.to_path_buf(),
            detail: format!("header row is missing or unreadable: {error}"),
        })?
        .iter()
        .map(|value| value.trim().to_string())
        .collect::<Vec<String>>();
    let headers = raw_headers
        .iter()
        .map(|value| normalize_header(value))
        .collect::<Vec<String>>();

    let entity_index = locate_required(&ENTITY_COLUMN, &headers, path)?;
    let ceiling_index = locate_required(&CEILING_COLUMN, &headers, path)?;
    let region_index = REGION_COLUMN.locate(&headers);
    let min_columns = entity_index.max(ceiling_index) + 1;

    let mut report = LoadReport {
        source: path.display().to_string(),
        delimiter: (delimiter as char).to_string(),
        entity_header: raw_headers[entity_index].clone(),
        region_header: region_index.map(|index| raw_headers[index].clone()),
        ceiling_header: raw_headers[ceiling_index].clone(),
        ..LoadReport::default()
    };
    let mut table = ReferenceTable::empty();

    for result_row in reader.records() {
        report.rows_read += 1;
        let Ok(record) = result_row else {
            report.skipped_malformed += 1;
            continue;
        };
        if record.len() < min_columns {
            report.skipped_short += 1;
            continue;
        }

        let entity = record.get(entity_index).unwrap_or_default().trim();
        let raw_ceiling = record.get(ceiling_index).unwrap_or_default().trim();
        if entity.is_empty() || raw_ceiling.is_empty() {
            report.skipped_blank += 1;
            continue;
        }

        let Some(annual) = parse_currency(raw_ceiling) else {
            report.skipped_unparseable += 1;
            continue;
        };
        let monthly = annual / MONTHS_PER_YEAR;
        if !monthly.is_finite() || monthly <= 0.0 {
            report.skipped_non_positive += 1;
            continue;
        }

        let region = region_index
            .and_then(|index| record.get(index))
            .map(str::trim)
            .filter(|value| !value.is_empty());
        for key in key_variants(entity, region) {
            table.insert(key, monthly);
        }
        report.rows_registered += 1;
    }

    report.keys_registered = table.len();
    if table.is_empty() {
        tracing::warn!(
            source = %report.source,
            rows_read = report.rows_read,
            "reference table produced no usable ceilings"
        );
        return Err(ReferenceError::NoValidRows {
            path: path.to_path_buf(),
            rows_read: report.rows_read,
        });
    }

    tracing::info!(
        source = %report.source,
        rows_read = report.rows_read,
        rows_registered = report.rows_registered,
        keys = report.keys_registered,
        "reference table loaded"
    );
    Ok(LoadedReference { table, report })
}

/// Every lookup key one reference row is registered under, most specific
/// first: `entity - region`, `entity/region`, the bare entity, then the
/// normalized form of each.
pub fn key_variants(entity: &str, region: Option<&str>) -> Vec<String> {
    let mut exact = Vec::with_capacity(3);
    if let Some(region) = region {
        exact.push(format!("{entity} - {region}"));
        exact.push(format!("{entity}/{region}"));
    }
    exact.push(entity.to_string());

    let normalized = exact
        .iter()
        .map(|key| normalize_key(key))
        .filter(|key| !key.is_empty())
        .collect::<Vec<String>>();

    let mut variants = exact;
    for key in normalized {
        if !variants.contains(&key) {
            variants.push(key);
        }
    }
    variants
}

fn locate_required(
    column: &ColumnSpec,
    headers: &[String],
    path: &Path,
) -> Result<usize, ReferenceError> {
    column.locate(headers).ok_or_else(|| {
        tracing::warn!(
            source = %path.display(),
            column = column.label,
            fragments = ?column.fragments(),
            headers = ?headers,
            "reference header fragment search failed"
        );
        ReferenceError::HeaderMissing {
            path: path.to_path_buf(),
            column: *column,
        }
    })
}

fn sniff_delimiter(content: &str) -> u8 {
    let header_line = content.lines().next().unwrap_or_default();
    let mut best = b',';
    let mut best_count = 0;
    for candidate in CANDIDATE_DELIMITERS {
        let count = header_line
            .bytes()
            .filter(|byte| *byte == candidate)
            .count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

/// Spreadsheet exports arrive as UTF-8 (sometimes with a BOM) or as
/// Windows-1252, which Excel uses for CSV on Portuguese locales.
fn decode_text(bytes: &[u8]) -> String {
    let without_bom = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    match std::str::from_utf8(without_bom) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(without_bom);
            decoded.into_owned()
        }
    }
}
