use serde::Serialize;

use crate::engine::normalize::normalize_key;
use crate::engine::reference::ReferenceTable;

const REGION_SEPARATORS: [&str; 2] = [" - ", "/"];

/// One way of turning an entity name into a reference-table key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    EntityDashRegion,
    EntitySlashRegion,
    EntityOnly,
    NormalizedDashRegion,
    NormalizedSlashRegion,
    NormalizedEntity,
    NormalizedRaw,
    FallbackScan,
}

/// Exact-lookup strategies in priority order, most specific first.
pub const CANDIDATE_STRATEGIES: [MatchStrategy; 7] = [
    MatchStrategy::EntityDashRegion,
    MatchStrategy::EntitySlashRegion,
    MatchStrategy::EntityOnly,
    MatchStrategy::NormalizedDashRegion,
    MatchStrategy::NormalizedSlashRegion,
    MatchStrategy::NormalizedEntity,
    MatchStrategy::NormalizedRaw,
];

impl MatchStrategy {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EntityDashRegion => "entity_dash_region",
            Self::EntitySlashRegion => "entity_slash_region",
            Self::EntityOnly => "entity_only",
            Self::NormalizedDashRegion => "normalized_dash_region",
            Self::NormalizedSlashRegion => "normalized_slash_region",
            Self::NormalizedEntity => "normalized_entity",
            Self::NormalizedRaw => "normalized_raw",
            Self::FallbackScan => "fallback_scan",
        }
    }

    /// The key this strategy would look up for `name`, if it yields one.
    pub fn candidate(self, name: &EntityName<'_>) -> Option<String> {
        let key = match self {
            Self::EntityDashRegion => name.region.map(|region| format!("{} - {region}", name.entity)),
            Self::EntitySlashRegion => name.region.map(|region| format!("{}/{region}", name.entity)),
            Self::EntityOnly => Some(name.entity.to_string()),
            Self::NormalizedDashRegion => Self::EntityDashRegion
                .candidate(name)
                .map(|key| normalize_key(&key)),
            Self::NormalizedSlashRegion => Self::EntitySlashRegion
                .candidate(name)
                .map(|key| normalize_key(&key)),
            Self::NormalizedEntity => Some(normalize_key(name.entity)),
            Self::NormalizedRaw => Some(normalize_key(name.raw)),
            Self::FallbackScan => None,
        };
        key.filter(|value| !value.is_empty())
    }
}

/// A raw entity name split into its entity and optional region parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityName<'a> {
    pub raw: &'a str,
    pub entity: &'a str,
    pub region: Option<&'a str>,
}

/// Splits `"Name - Region"` or `"Name/Region"` on the first separator found,
/// trying `" - "` before `"/"`.
pub fn split_entity_name(raw: &str) -> EntityName<'_> {
    let trimmed = raw.trim();
    for separator in REGION_SEPARATORS {
        if let Some((entity, region)) = trimmed.split_once(separator) {
            let region = region.trim();
            return EntityName {
                raw: trimmed,
                entity: entity.trim(),
                region: (!region.is_empty()).then_some(region),
            };
        }
    }

    EntityName {
        raw: trimmed,
        entity: trimmed,
        region: None,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Resolution {
    Matched {
        ceiling: f64,
        key: String,
        strategy: MatchStrategy,
    },
    Unmatched {
        candidates_tried: usize,
        keys_scanned: usize,
    },
}

impl Resolution {
    pub fn ceiling(&self) -> Option<f64> {
        match self {
            Self::Matched { ceiling, .. } => Some(*ceiling),
            Self::Unmatched { .. } => None,
        }
    }
}

/// Maps free-text entity names to monthly ceilings: exact candidate keys
/// first, then a substring scan capped at `scan_limit` table keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityKeyResolver {
    scan_limit: usize,
}

impl EntityKeyResolver {
    pub fn new(scan_limit: usize) -> Self {
        Self { scan_limit }
    }

    pub fn scan_limit(&self) -> usize {
        self.scan_limit
    }

    /// Candidate keys in lookup order, without duplicates.
    pub fn candidate_keys(&self, raw: &str) -> Vec<(MatchStrategy, String)> {
        let name = split_entity_name(raw);
        let mut candidates: Vec<(MatchStrategy, String)> = Vec::new();
        for strategy in CANDIDATE_STRATEGIES {
            let Some(key) = strategy.candidate(&name) else {
                continue;
            };
            if candidates.iter().any(|(_, existing)| existing == &key) {
                continue;
            }
            candidates.push((strategy, key));
        }
        candidates
    }

    pub fn resolve(&self, raw: &str, table: &ReferenceTable) -> Resolution {
        let candidates = self.candidate_keys(raw);
        for (strategy, key) in &candidates {
            if let Some(ceiling) = table.get(key) {
                return Resolution::Matched {
                    ceiling,
                    key: key.clone(),
                    strategy: *strategy,
                };
            }
        }

        let name = split_entity_name(raw);
        let (matched, keys_scanned) = self.scan(&name, table);
        if let Some((key, ceiling)) = matched {
            return Resolution::Matched {
                ceiling,
                key,
                strategy: MatchStrategy::FallbackScan,
            };
        }

        Resolution::Unmatched {
            candidates_tried: candidates.len(),
            keys_scanned,
        }
    }

    fn scan(&self, name: &EntityName<'_>, table: &ReferenceTable) -> (Option<(String, f64)>, usize) {
        let entity = name.entity.to_lowercase();
        if entity.is_empty() {
            return (None, 0);
        }
        let region = name.region.map(str::to_lowercase);

        let mut scanned = 0;
        for key in table.keys().take(self.scan_limit) {
            scanned += 1;
            let candidate = key.to_lowercase();
            if candidate.is_empty() {
                continue;
            }
            let overlaps = candidate.contains(&entity) || entity.contains(&candidate);
            let region_ok = region
                .as_deref()
                .is_none_or(|value| candidate.contains(value));
            if overlaps && region_ok {
                let ceiling = table.get(key).unwrap_or_default();
                return (Some((key.to_string(), ceiling)), scanned);
            }
        }
        (None, scanned)
    }
}
