use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::engine::aggregate::{Aggregation, AggregationPath, ClaimStore, aggregate};
use crate::engine::cache::{CacheStatus, ReferenceCache};
use crate::engine::classify::{MaturityBand, band, months};
use crate::engine::reference::ReferenceTable;
use crate::engine::resolver::{EntityKeyResolver, Resolution};

/// Why a record ended up with (or without) derived fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationStatus {
    Classified,
    EntityCapExceeded,
    MissingEntity,
    MissingSequence,
    NoCumulative,
    NoSource,
    Unmatched,
    UnparseableCeiling,
    StoreError,
}

impl ClassificationStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Classified => "classified",
            Self::EntityCapExceeded => "entity_cap_exceeded",
            Self::MissingEntity => "missing_entity",
            Self::MissingSequence => "missing_sequence",
            Self::NoCumulative => "no_cumulative",
            Self::NoSource => "no_source",
            Self::Unmatched => "unmatched",
            Self::UnparseableCeiling => "unparseable_ceiling",
            Self::StoreError => "store_error",
        }
    }
}

/// Fields the engine derives for one record. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub cumulative_total: Option<f64>,
    pub months: Option<i64>,
    pub band: Option<MaturityBand>,
    pub status: ClassificationStatus,
}

impl Classification {
    pub fn unset(status: ClassificationStatus) -> Self {
        Self {
            cumulative_total: None,
            months: None,
            band: None,
            status,
        }
    }
}

impl Default for Classification {
    fn default() -> Self {
        Self::unset(ClassificationStatus::NoCumulative)
    }
}

/// One claim as read from the store, plus the derived fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClaimRecord {
    pub id: i64,
    pub precatorio: Option<String>,
    pub ordem: Option<i64>,
    pub organizacao: Option<String>,
    pub regime: Option<String>,
    pub ano_orc: Option<String>,
    pub situacao: Option<String>,
    pub valor: Option<f64>,
    pub esta_na_ordem: bool,
    pub data_atualizacao: Option<String>,
    #[serde(flatten)]
    pub classification: Classification,
}

impl ClaimRecord {
    /// Entity name used for grouping; blank names count as absent.
    pub fn entity(&self) -> Option<&str> {
        self.organizacao
            .as_deref()
            .filter(|value| !value.trim().is_empty())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EnrichmentReport {
    pub records: usize,
    pub entities: usize,
    pub entity_cap: usize,
    pub classified: usize,
    pub reference_status: Option<CacheStatus>,
    pub aggregation: Option<AggregationPath>,
    pub status_counts: BTreeMap<String, usize>,
}

/// Decorates pages of claim records with cumulative totals, required months
/// and maturity bands. Never fails: every problem degrades to unset fields
/// with a [`ClassificationStatus`] saying why.
pub struct EnrichmentEngine {
    store: Arc<dyn ClaimStore>,
    cache: Arc<ReferenceCache>,
    resolver: EntityKeyResolver,
    config: EngineConfig,
}

impl EnrichmentEngine {
    pub fn new(store: Arc<dyn ClaimStore>, cache: Arc<ReferenceCache>, config: EngineConfig) -> Self {
        Self {
            store,
            cache,
            resolver: EntityKeyResolver::new(config.scan_limit),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn enrich(&self, mut records: Vec<ClaimRecord>) -> Vec<ClaimRecord> {
        let _ = self.enrich_in_place(&mut records);
        records
    }

    pub fn enrich_in_place(&self, records: &mut [ClaimRecord]) -> EnrichmentReport {
        for record in records.iter_mut() {
            record.classification = Classification::default();
        }

        let entities = distinct_entities(records);
        let mut report = EnrichmentReport {
            records: records.len(),
            entities: entities.len(),
            entity_cap: self.config.entity_cap,
            classified: 0,
            reference_status: None,
            aggregation: None,
            status_counts: BTreeMap::new(),
        };

        if entities.len() > self.config.entity_cap {
            tracing::debug!(
                entities = entities.len(),
                cap = self.config.entity_cap,
                "entity cap exceeded; skipping aggregation"
            );
            mark_all(records, ClassificationStatus::EntityCapExceeded);
            return finish(records, report);
        }

        let lookup = self.cache.get_reference_table();
        report.reference_status = Some(lookup.status);
        if !lookup.status.has_source() {
            mark_all(records, ClassificationStatus::NoSource);
            return finish(records, report);
        }

        let aggregation = aggregate(
            self.store.as_ref(),
            &entities,
            self.config.fallback_row_limit,
        );
        report.aggregation = Some(aggregation.path);

        let mut resolutions: HashMap<String, Resolution> = HashMap::new();
        for record in records.iter_mut() {
            record.classification =
                self.classify_record(record, &aggregation, &lookup.table, &mut resolutions);
        }

        finish(records, report)
    }

    fn classify_record(
        &self,
        record: &ClaimRecord,
        aggregation: &Aggregation,
        table: &ReferenceTable,
        resolutions: &mut HashMap<String, Resolution>,
    ) -> Classification {
        let Some(entity) = record.entity() else {
            return Classification::unset(ClassificationStatus::MissingEntity);
        };
        if aggregation.is_failed(entity) {
            return Classification::unset(ClassificationStatus::StoreError);
        }
        let Some(sequence) = record.ordem else {
            return Classification::unset(ClassificationStatus::MissingSequence);
        };
        let Some(cumulative) = aggregation.cumulative(entity, sequence) else {
            return Classification::unset(ClassificationStatus::NoCumulative);
        };

        let resolution = resolutions
            .entry(entity.to_string())
            .or_insert_with(|| {
                let resolution = self.resolver.resolve(entity, table);
                if let Resolution::Unmatched { keys_scanned, .. } = &resolution {
                    tracing::debug!(entity = %entity, keys_scanned, "no ceiling for entity");
                }
                resolution
            });

        let mut classification = Classification {
            cumulative_total: Some(cumulative),
            months: None,
            band: None,
            status: ClassificationStatus::Unmatched,
        };
        let Some(ceiling) = resolution.ceiling() else {
            return classification;
        };
        if ceiling <= 0.0 {
            classification.status = ClassificationStatus::UnparseableCeiling;
            return classification;
        }
        let Some(required) = months(Some(cumulative), Some(ceiling)) else {
            classification.status = ClassificationStatus::UnparseableCeiling;
            return classification;
        };

        classification.months = Some(required);
        classification.band = band(Some(required));
        classification.status = ClassificationStatus::Classified;
        classification
    }
}

/// Distinct non-blank entity names in first-seen order.
fn distinct_entities(records: &[ClaimRecord]) -> Vec<String> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut ordered: Vec<String> = Vec::new();
    for record in records {
        if let Some(entity) = record.entity()
            && seen.insert(entity)
        {
            ordered.push(entity.to_string());
        }
    }
    ordered
}

fn mark_all(records: &mut [ClaimRecord], status: ClassificationStatus) {
    for record in records.iter_mut() {
        let status = if record.entity().is_some() {
            status
        } else {
            ClassificationStatus::MissingEntity
        };
        record.classification = Classification::unset(status);
    }
}

fn finish(records: &[ClaimRecord], mut report: EnrichmentReport) -> EnrichmentReport {
    for record in records {
        *report
            .status_counts
            .entry(record.classification.status.as_str().to_string())
            .or_default() += 1;
    }
    report.classified = records
        .iter()
        .filter(|record| record.classification.status == ClassificationStatus::Classified)
        .count();
    report
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{
        Classification, ClaimRecord, ClassificationStatus, EnrichmentEngine, distinct_entities,
    };
    use crate::config::EngineConfig;
    use crate::engine::aggregate::testing::MemoryClaimStore;
    use crate::engine::cache::ReferenceCache;
    use crate::engine::cache::testing::{MockClock, ScriptedLoader};
    use crate::engine::classify::MaturityBand;

    fn record(id: i64, entity: Option<&str>, sequence: Option<i64>, value: Option<f64>) -> ClaimRecord {
        ClaimRecord {
            id,
            precatorio: Some(format!("P-{id:04}")),
            ordem: sequence,
            organizacao: entity.map(str::to_string),
            regime: None,
            ano_orc: None,
            situacao: None,
            valor: value,
            esta_na_ordem: true,
            data_atualizacao: None,
            classification: Classification::default(),
        }
    }

    fn engine_with(
        store: MemoryClaimStore,
        script: Vec<Option<Vec<(&'static str, f64)>>>,
        config: EngineConfig,
    ) -> EnrichmentEngine {
        let cache = ReferenceCache::with_clock(
            Arc::new(ScriptedLoader::new(script)),
            Duration::from_secs(3600),
            Arc::new(MockClock::new()),
        );
        EnrichmentEngine::new(Arc::new(store), Arc::new(cache), config)
    }

    fn itu_store() -> MemoryClaimStore {
        MemoryClaimStore::new(&[("Itu - SP", 1, 50_000.0), ("Itu - SP", 2, 70_000.0)])
    }

    #[test]
    fn distinct_entities_keep_first_seen_order_on_a_full_page() {
        let records = (0..1000)
            .map(|id| {
                let entity = match id % 3 {
                    0 => Some("Salto - SP"),
                    1 => Some("Itu - SP"),
                    _ => Some("  "),
                };
                record(id, entity, Some(id), Some(1.0))
            })
            .collect::<Vec<ClaimRecord>>();
        assert_eq!(
            distinct_entities(&records),
            vec!["Salto - SP".to_string(), "Itu - SP".to_string()]
        );
    }

    #[test]
    fn accumulates_and_classifies_one_entity() {
        let engine = engine_with(
            itu_store(),
            vec![Some(vec![("Itu - SP", 40_000.0)])],
            EngineConfig::default(),
        );
        let enriched = engine.enrich(vec![
            record(1, Some("Itu - SP"), Some(1), Some(50_000.0)),
            record(2, Some("Itu - SP"), Some(2), Some(70_000.0)),
        ]);

        assert_eq!(enriched[0].classification.cumulative_total, Some(50_000.0));
        assert_eq!(enriched[0].classification.months, Some(2));
        assert_eq!(enriched[0].classification.band, Some(MaturityBand::APlus));
        assert_eq!(enriched[1].classification.cumulative_total, Some(120_000.0));
        assert_eq!(enriched[1].classification.months, Some(3));
        assert_eq!(enriched[1].classification.band, Some(MaturityBand::APlus));
        assert_eq!(
            enriched[1].classification.status,
            ClassificationStatus::Classified
        );
    }

    #[test]
    fn one_entity_over_the_cap_leaves_every_record_unset() {
        let config = EngineConfig {
            entity_cap: 2,
            ..EngineConfig::default()
        };
        let store = MemoryClaimStore::new(&[("A", 1, 1.0), ("B", 1, 1.0), ("C", 1, 1.0)]);
        let engine = engine_with(
            store,
            vec![Some(vec![("A", 1.0), ("B", 1.0), ("C", 1.0)])],
            config,
        );

        let mut records = vec![
            record(1, Some("A"), Some(1), Some(1.0)),
            record(2, Some("B"), Some(1), Some(1.0)),
            record(3, Some("C"), Some(1), Some(1.0)),
        ];
        let report = engine.enrich_in_place(&mut records);

        assert_eq!(report.entities, 3);
        assert_eq!(report.classified, 0);
        for enriched in &records {
            assert_eq!(
                enriched.classification,
                Classification::unset(ClassificationStatus::EntityCapExceeded)
            );
        }
    }

    #[test]
    fn cap_exceeded_skips_the_store_entirely() {
        let config = EngineConfig {
            entity_cap: 1,
            ..EngineConfig::default()
        };
        let store = Arc::new(MemoryClaimStore::new(&[("A", 1, 1.0), ("B", 1, 1.0)]));
        let cache = ReferenceCache::with_clock(
            Arc::new(ScriptedLoader::new(vec![Some(vec![("A", 1.0)])])),
            Duration::from_secs(3600),
            Arc::new(MockClock::new()),
        );
        let engine = EnrichmentEngine::new(store.clone(), Arc::new(cache), config);

        let _ = engine.enrich(vec![
            record(1, Some("A"), Some(1), Some(1.0)),
            record(2, Some("B"), Some(1), Some(1.0)),
        ]);
        assert_eq!(store.bulk_calls(), 0);
    }

    #[test]
    fn missing_reference_source_leaves_everything_unset() {
        let engine = engine_with(itu_store(), vec![None], EngineConfig::default());
        let mut records = vec![
            record(1, Some("Itu - SP"), Some(1), Some(50_000.0)),
            record(2, Some("Itu - SP"), Some(2), Some(70_000.0)),
        ];
        let report = engine.enrich_in_place(&mut records);

        assert_eq!(report.status_counts.get("no_source"), Some(&2));
        for enriched in &records {
            assert_eq!(enriched.classification.cumulative_total, None);
            assert_eq!(enriched.classification.months, None);
            assert_eq!(enriched.classification.band, None);
        }
    }

    #[test]
    fn unmatched_entity_keeps_cumulative_but_no_band() {
        let engine = engine_with(
            itu_store(),
            vec![Some(vec![("Sorocaba - SP", 1_000.0)])],
            EngineConfig::default(),
        );
        let enriched = engine.enrich(vec![record(1, Some("Itu - SP"), Some(1), Some(50_000.0))]);

        assert_eq!(enriched[0].classification.cumulative_total, Some(50_000.0));
        assert_eq!(enriched[0].classification.months, None);
        assert_eq!(
            enriched[0].classification.status,
            ClassificationStatus::Unmatched
        );
    }

    #[test]
    fn store_failure_only_nulls_the_failing_entity() {
        let store = MemoryClaimStore::new(&[("Itu - SP", 1, 80_000.0), ("Salto - SP", 1, 1.0)])
            .failing_bulk()
            .failing_entity("Salto - SP");
        let engine = engine_with(
            store,
            vec![Some(vec![("Itu - SP", 40_000.0), ("Salto - SP", 1.0)])],
            EngineConfig::default(),
        );
        let enriched = engine.enrich(vec![
            record(1, Some("Itu - SP"), Some(1), Some(80_000.0)),
            record(2, Some("Salto - SP"), Some(1), Some(1.0)),
        ]);

        assert_eq!(enriched[0].classification.months, Some(2));
        assert_eq!(
            enriched[1].classification,
            Classification::unset(ClassificationStatus::StoreError)
        );
    }

    #[test]
    fn records_without_entity_or_sequence_are_reported() {
        let engine = engine_with(
            itu_store(),
            vec![Some(vec![("Itu - SP", 40_000.0)])],
            EngineConfig::default(),
        );
        let enriched = engine.enrich(vec![
            record(1, None, Some(1), Some(1.0)),
            record(2, Some("  "), Some(1), Some(1.0)),
            record(3, Some("Itu - SP"), None, Some(1.0)),
            record(4, Some("Itu - SP"), Some(9), Some(1.0)),
        ]);

        assert_eq!(
            enriched[0].classification.status,
            ClassificationStatus::MissingEntity
        );
        assert_eq!(
            enriched[1].classification.status,
            ClassificationStatus::MissingEntity
        );
        assert_eq!(
            enriched[2].classification.status,
            ClassificationStatus::MissingSequence
        );
        assert_eq!(
            enriched[3].classification.status,
            ClassificationStatus::NoCumulative
        );
    }

    #[test]
    fn stale_derived_fields_are_reset_before_enrichment() {
        let engine = engine_with(itu_store(), vec![None], EngineConfig::default());
        let mut stale = record(1, Some("Itu - SP"), Some(1), Some(50_000.0));
        stale.classification = Classification {
            cumulative_total: Some(1.0),
            months: Some(1),
            band: Some(MaturityBand::APlus),
            status: ClassificationStatus::Classified,
        };

        let enriched = engine.enrich(vec![stale]);
        assert_eq!(enriched[0].classification.cumulative_total, None);
        assert_eq!(enriched[0].classification.band, None);
    }
}
