use std::path::Path;

use rusqlite::{Row, params_from_iter};
use serde::Serialize;

use crate::ClientResult;
use crate::engine::enrich::{ClaimRecord, Classification};
use crate::state::{FOLD_CASE_FN, map_sqlite_error, open_readonly_connection};

pub const DEFAULT_PER_PAGE: i64 = 50;
pub const MAX_PER_PAGE: i64 = 1000;

/// Columns a page can be sorted by, in display order.
pub const SORTABLE_FIELDS: [&str; 8] = [
    "id",
    "precatorio",
    "ordem",
    "organizacao",
    "regime",
    "ano_orc",
    "situacao",
    "valor",
];

/// Columns that accept substring filters.
pub const FILTERABLE_FIELDS: [&str; 7] = [
    "precatorio",
    "ordem",
    "organizacao",
    "regime",
    "ano_orc",
    "situacao",
    "valor",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Unknown orders fall back to ascending.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldFilter {
    pub field: &'static str,
    pub value: String,
}

/// Page request as typed by a caller, before clamping.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub filters: Vec<(String, String)>,
}

/// Page request after clamping and whitelisting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageQuery {
    pub page: i64,
    pub per_page: i64,
    pub sort: &'static str,
    pub order: SortOrder,
    pub filters: Vec<FieldFilter>,
    pub ignored_filters: Vec<String>,
}

impl PageQuery {
    /// Page below 1 becomes 1, a page size outside `1..=1000` becomes 50, an
    /// unknown sort field becomes `id`. Filters on unknown fields and blank
    /// filter values are dropped.
    pub fn from_request(request: &PageRequest) -> Self {
        let page = request.page.filter(|value| *value >= 1).unwrap_or(1);
        let per_page = request
            .per_page
            .filter(|value| (1..=MAX_PER_PAGE).contains(value))
            .unwrap_or(DEFAULT_PER_PAGE);
        let sort = request
            .sort
            .as_deref()
            .and_then(|raw| whitelisted(&SORTABLE_FIELDS, raw))
            .unwrap_or("id");
        let order = request
            .order
            .as_deref()
            .map(SortOrder::parse)
            .unwrap_or(SortOrder::Asc);

        let mut filters = Vec::new();
        let mut ignored_filters = Vec::new();
        for (field, value) in &request.filters {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match whitelisted(&FILTERABLE_FIELDS, field) {
                Some(field) => filters.push(FieldFilter {
                    field,
                    value: value.to_string(),
                }),
                None => ignored_filters.push(field.trim().to_string()),
            }
        }

        Self {
            page,
            per_page,
            sort,
            order,
            filters,
            ignored_filters,
        }
    }

    fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
    pub has_prev: bool,
    pub has_next: bool,
}

impl Pagination {
    fn new(page: i64, per_page: i64, total: i64) -> Self {
        let total_pages = (total + per_page - 1) / per_page;
        Self {
            page,
            per_page,
            total,
            total_pages,
            has_prev: page > 1,
            has_next: page < total_pages,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClaimsPage {
    pub records: Vec<ClaimRecord>,
    pub pagination: Pagination,
}

/// Reads one page of claims. Derived fields come back unset; enrichment is a
/// separate step.
pub fn load_page(db_path: &Path, query: &PageQuery) -> ClientResult<ClaimsPage> {
    let connection = open_readonly_connection(db_path)?;

    let (where_clause, filter_params) = where_clause(&query.filters);
    let count_sql = format!("SELECT COUNT(*) FROM precatorios{where_clause}");
    let total = connection
        .query_row(&count_sql, params_from_iter(filter_params.iter()), |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let page_sql = format!(
        "SELECT id, precatorio, ordem, organizacao, regime, ano_orc, situacao, valor,
                esta_na_ordem, data_atualizacao
         FROM precatorios{where_clause}
         ORDER BY {sort} {order}, id ASC
         LIMIT {limit} OFFSET {offset}",
        sort = query.sort,
        order = query.order.as_sql(),
        limit = query.per_page,
        offset = query.offset(),
    );
    let mut statement = connection
        .prepare(&page_sql)
        .map_err(|error| map_sqlite_error(db_path, &error))?;
    let rows_iter = statement
        .query_map(params_from_iter(filter_params.iter()), claim_from_row)
        .map_err(|error| map_sqlite_error(db_path, &error))?;

    let mut records = Vec::new();
    for row in rows_iter {
        records.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
    }

    Ok(ClaimsPage {
        records,
        pagination: Pagination::new(query.page, query.per_page, total),
    })
}

fn claim_from_row(row: &Row<'_>) -> rusqlite::Result<ClaimRecord> {
    Ok(ClaimRecord {
        id: row.get(0)?,
        precatorio: row.get(1)?,
        ordem: row.get(2)?,
        organizacao: row.get(3)?,
        regime: row.get(4)?,
        ano_orc: row.get(5)?,
        situacao: row.get(6)?,
        valor: row.get(7)?,
        esta_na_ordem: row.get::<_, i64>(8)? != 0,
        data_atualizacao: row.get(9)?,
        classification: Classification::default(),
    })
}

fn where_clause(filters: &[FieldFilter]) -> (String, Vec<String>) {
    if filters.is_empty() {
        return (String::new(), Vec::new());
    }

    let mut conditions = Vec::with_capacity(filters.len());
    let mut params = Vec::with_capacity(filters.len());
    for (index, filter) in filters.iter().enumerate() {
        conditions.push(format!(
            "{FOLD_CASE_FN}(CAST({} AS TEXT)) LIKE ?{} ESCAPE '\\'",
            filter.field,
            index + 1
        ));
        params.push(format!("%{}%", escape_like(&filter.value.to_lowercase())));
    }
    (format!(" WHERE {}", conditions.join(" AND ")), params)
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for character in value.chars() {
        if matches!(character, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(character);
    }
    escaped
}

fn whitelisted(fields: &[&'static str], raw: &str) -> Option<&'static str> {
    let wanted = raw.trim().to_ascii_lowercase();
    fields.iter().copied().find(|field| *field == wanted)
}
