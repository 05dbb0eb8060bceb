use std::time::Duration;

use crate::{ClientError, ClientResult};

pub const ENTITY_CAP_ENV: &str = "PRECATO_ENTITY_CAP";
pub const SCAN_LIMIT_ENV: &str = "PRECATO_SCAN_LIMIT";
pub const FALLBACK_ROW_LIMIT_ENV: &str = "PRECATO_FALLBACK_ROW_LIMIT";
pub const CACHE_TTL_ENV: &str = "PRECATO_CACHE_TTL_SECS";

/// Tuning knobs for the enrichment engine.
///
/// The entity cap and the scan limit are performance heuristics: the cap
/// bounds how many entities one page may aggregate, the scan limit bounds how
/// many reference keys an unmatched name may be compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Maximum distinct entities per page before aggregation is skipped.
    pub entity_cap: usize,
    /// Maximum reference keys inspected by the resolver's fallback scan.
    pub scan_limit: usize,
    /// Maximum rows read per entity when the bulk query fails.
    pub fallback_row_limit: usize,
    /// Age after which the cached reference table is reloaded.
    pub cache_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            entity_cap: 15,
            scan_limit: 100,
            fallback_row_limit: 1000,
            cache_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> ClientResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> ClientResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let entity_cap = read_positive(&lookup, ENTITY_CAP_ENV)?.unwrap_or(defaults.entity_cap);
        let scan_limit = read_positive(&lookup, SCAN_LIMIT_ENV)?.unwrap_or(defaults.scan_limit);
        let fallback_row_limit = read_positive(&lookup, FALLBACK_ROW_LIMIT_ENV)?
            .unwrap_or(defaults.fallback_row_limit);
        let cache_ttl = read_positive(&lookup, CACHE_TTL_ENV)?
            .map(|seconds| Duration::from_secs(seconds as u64))
            .unwrap_or(defaults.cache_ttl);

        Ok(Self {
            entity_cap,
            scan_limit,
            fallback_row_limit,
            cache_ttl,
        })
    }
}

fn read_positive<F>(lookup: &F, variable: &str) -> ClientResult<Option<usize>>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(variable) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match trimmed.parse::<usize>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(ClientError::invalid_config_value(
            variable,
            trimmed,
            "a positive integer",
        )),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::{CACHE_TTL_ENV, ENTITY_CAP_ENV, EngineConfig, SCAN_LIMIT_ENV};

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let values = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<String, String>>();
        move |name| values.get(name).cloned()
    }

    #[test]
    fn defaults_match_tuned_heuristics() {
        let config = EngineConfig::default();
        assert_eq!(config.entity_cap, 15);
        assert_eq!(config.scan_limit, 100);
        assert_eq!(config.fallback_row_limit, 1000);
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
    }

    #[test]
    fn environment_overrides_are_applied() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            (ENTITY_CAP_ENV, "3"),
            (SCAN_LIMIT_ENV, " 25 "),
            (CACHE_TTL_ENV, "60"),
        ]));
        assert!(config.is_ok());
        if let Ok(value) = config {
            assert_eq!(value.entity_cap, 3);
            assert_eq!(value.scan_limit, 25);
            assert_eq!(value.fallback_row_limit, 1000);
            assert_eq!(value.cache_ttl, Duration::from_secs(60));
        }
    }

    #[test]
    fn zero_and_garbage_values_are_rejected() {
        for raw in ["0", "-1", "abc"] {
            let config = EngineConfig::from_lookup(lookup_from(&[(ENTITY_CAP_ENV, raw)]));
            assert!(config.is_err());
            if let Err(error) = config {
                assert_eq!(error.code, "invalid_argument");
                assert!(error.message.contains(ENTITY_CAP_ENV));
            }
        }
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = EngineConfig::from_lookup(lookup_from(&[(SCAN_LIMIT_ENV, "  ")]));
        assert!(config.is_ok());
        if let Ok(value) = config {
            assert_eq!(value.scan_limit, 100);
        }
    }
}
