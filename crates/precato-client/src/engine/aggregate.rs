use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use rusqlite::{params, params_from_iter};
use serde::Serialize;

use crate::ClientResult;
use crate::state::{map_sqlite_error, open_readonly_connection};

/// Running total of one entity's claim values at a given sequence number.
#[derive(Debug, Clone, PartialEq)]
pub struct CumulativeRow {
    pub entity: String,
    pub sequence: i64,
    pub cumulative: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClaimValue {
    pub sequence: i64,
    pub value: f64,
}

/// Read access to the claims the aggregator sums over. Only claims with a
/// value, a sequence number and the in-sequence flag set take part.
pub trait ClaimStore: Send + Sync {
    /// Cumulative totals for every eligible claim of `entities`, in one query.
    fn cumulative_totals(&self, entities: &[String]) -> ClientResult<Vec<CumulativeRow>>;

    /// Up to `limit` eligible claims of one entity, ordered by sequence.
    fn entity_claims(&self, entity: &str, limit: usize) -> ClientResult<Vec<ClaimValue>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPath {
    Bulk,
    PerEntity,
}

/// `entity -> {sequence -> cumulative}` plus the entities whose totals could
/// not be read at all.
#[derive(Debug, Clone)]
pub struct Aggregation {
    pub totals: HashMap<String, BTreeMap<i64, f64>>,
    pub failed_entities: BTreeSet<String>,
    pub path: AggregationPath,
}

impl Aggregation {
    pub fn cumulative(&self, entity: &str, sequence: i64) -> Option<f64> {
        self.totals
            .get(entity)
            .and_then(|by_sequence| by_sequence.get(&sequence))
            .copied()
    }

    pub fn is_failed(&self, entity: &str) -> bool {
        self.failed_entities.contains(entity)
    }
}

/// Computes per-entity running totals with one bulk query, falling back to a
/// bounded per-entity read when the bulk query fails.
pub fn aggregate(
    store: &dyn ClaimStore,
    entities: &[String],
    fallback_row_limit: usize,
) -> Aggregation {
    match store.cumulative_totals(entities) {
        Ok(rows) => {
            let mut totals: HashMap<String, BTreeMap<i64, f64>> = HashMap::new();
            for row in rows {
                totals
                    .entry(row.entity)
                    .or_default()
                    .insert(row.sequence, row.cumulative);
            }
            Aggregation {
                totals,
                failed_entities: BTreeSet::new(),
                path: AggregationPath::Bulk,
            }
        }
        Err(error) => {
            tracing::warn!(
                code = %error.code,
                error = %error,
                entities = entities.len(),
                "bulk cumulative query failed; reading entities one by one"
            );
            aggregate_per_entity(store, entities, fallback_row_limit)
        }
    }
}

fn aggregate_per_entity(
    store: &dyn ClaimStore,
    entities: &[String],
    row_limit: usize,
) -> Aggregation {
    let mut totals: HashMap<String, BTreeMap<i64, f64>> = HashMap::new();
    let mut failed_entities = BTreeSet::new();

    for entity in entities {
        match store.entity_claims(entity, row_limit.saturating_add(1)) {
            Ok(mut claims) => {
                if claims.len() > row_limit {
                    tracing::debug!(
                        entity = %entity,
                        row_limit,
                        "per-entity read hit the row limit; later sequences stay unset"
                    );
                    truncate_at_complete_sequence(&mut claims, row_limit);
                }
                totals.insert(entity.clone(), running_totals(&claims));
            }
            Err(error) => {
                tracing::warn!(entity = %entity, error = %error, "per-entity cumulative read failed");
                failed_entities.insert(entity.clone());
            }
        }
    }

    Aggregation {
        totals,
        failed_entities,
        path: AggregationPath::PerEntity,
    }
}

/// Keeps the first `row_limit` claims (sorted by sequence) and drops the
/// trailing sequence when the cut falls between claims that share it, so no
/// sequence carries a partial total.
fn truncate_at_complete_sequence(claims: &mut Vec<ClaimValue>, row_limit: usize) {
    let Some(first_dropped) = claims.get(row_limit).map(|claim| claim.sequence) else {
        return;
    };
    claims.truncate(row_limit);
    while claims
        .last()
        .is_some_and(|claim| claim.sequence == first_dropped)
    {
        claims.pop();
    }
}

/// Running sum over claims sorted by sequence. Claims sharing a sequence
/// number all see the total that includes every one of them, matching the
/// default window frame of `SUM(..) OVER (ORDER BY ..)`.
///
/// Values are summed as stored. A negative value lowers the total, so the
/// result is only non-decreasing when every value is non-negative.
pub fn running_totals(claims: &[ClaimValue]) -> BTreeMap<i64, f64> {
    let mut ordered = claims.to_vec();
    ordered.sort_by_key(|claim| claim.sequence);

    let mut totals = BTreeMap::new();
    let mut running = 0.0;
    for claim in ordered {
        running += claim.value;
        totals.insert(claim.sequence, running);
    }
    totals
}

/// [`ClaimStore`] over the SQLite claims table, opened read-only per call.
#[derive(Debug, Clone)]
pub struct SqliteClaimStore {
    db_path: PathBuf,
}

impl SqliteClaimStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

impl ClaimStore for SqliteClaimStore {
    fn cumulative_totals(&self, entities: &[String]) -> ClientResult<Vec<CumulativeRow>> {
        if entities.is_empty() {
            return Ok(Vec::new());
        }

        let db_path = self.db_path.as_path();
        let connection = open_readonly_connection(db_path)?;
        let placeholders = (1..=entities.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<String>>()
            .join(", ");
        // Negative `valor` rows are summed as stored, like `running_totals`.
        let sql = format!(
            "SELECT
                organizacao,
                ordem,
                SUM(valor) OVER (PARTITION BY organizacao ORDER BY ordem) AS acumulado
             FROM precatorios
             WHERE organizacao IN ({placeholders})
               AND valor IS NOT NULL
               AND ordem IS NOT NULL
               AND esta_na_ordem = 1
             ORDER BY organizacao ASC, ordem ASC"
        );

        let mut statement = connection
            .prepare(&sql)
            .map_err(|error| map_sqlite_error(db_path, &error))?;
        let rows_iter = statement
            .query_map(params_from_iter(entities.iter()), |row| {
                Ok(CumulativeRow {
                    entity: row.get(0)?,
                    sequence: row.get(1)?,
                    cumulative: row.get(2)?,
                })
            })
            .map_err(|error| map_sqlite_error(db_path, &error))?;

        let mut rows = Vec::new();
        for row in rows_iter {
            rows.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
        }
        Ok(rows)
    }

    fn entity_claims(&self, entity: &str, limit: usize) -> ClientResult<Vec<ClaimValue>> {
        let db_path = self.db_path.as_path();
        let connection = open_readonly_connection(db_path)?;
        let mut statement = connection
            .prepare(
                "SELECT ordem, valor
                 FROM precatorios
                 WHERE organizacao = ?1
                   AND valor IS NOT NULL
                   AND ordem IS NOT NULL
                   AND esta_na_ordem = 1
                 ORDER BY ordem ASC, id ASC
                 LIMIT ?2",
            )
            .map_err(|error| map_sqlite_error(db_path, &error))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows_iter = statement
            .query_map(params![entity, limit], |row| {
                Ok(ClaimValue {
                    sequence: row.get(0)?,
                    value: row.get(1)?,
                })
            })
            .map_err(|error| map_sqlite_error(db_path, &error))?;

        let mut claims = Vec::new();
        for row in rows_iter {
            claims.push(row.map_err(|error| map_sqlite_error(db_path, &error))?);
        }
        Ok(claims)
    }
}
