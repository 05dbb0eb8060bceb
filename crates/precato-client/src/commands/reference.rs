use std::path::Path;

use crate::commands::common::{generated_at, reference_path_only};
use crate::config::EngineConfig;
use crate::contracts::envelope::{SuccessEnvelope, success};
use crate::contracts::types::{
    CandidateKey, ReferenceCheckData, ReferenceKeyPreview, ReferenceResolveData,
};
use crate::engine::reference::load_reference_file;
use crate::engine::resolver::{EntityKeyResolver, split_entity_name};
use crate::{ClientError, ClientResult};

const KEYS_PREVIEW_LIMIT: usize = 10;

#[derive(Debug, Default, Clone, Copy)]
pub struct ReferenceOptions<'a> {
    pub reference_path: Option<&'a Path>,
    pub home_override: Option<&'a Path>,
}

pub fn check(reference_path: Option<&Path>) -> ClientResult<SuccessEnvelope> {
    check_with_options(ReferenceOptions {
        reference_path,
        home_override: None,
    })
}

/// Loads the reference table once and reports what was kept and skipped.
/// Unlike `claims list`, an unusable table is an error here.
#[doc(hidden)]
pub fn check_with_options(options: ReferenceOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let path = reference_path_only(options.home_override, options.reference_path)?;
    let loaded = load_reference_file(&path)?;

    let keys_preview = loaded
        .table
        .keys()
        .take(KEYS_PREVIEW_LIMIT)
        .filter_map(|key| {
            loaded.table.get(key).map(|ceiling| ReferenceKeyPreview {
                key: key.to_string(),
                monthly_ceiling: ceiling,
            })
        })
        .collect::<Vec<ReferenceKeyPreview>>();

    let data = ReferenceCheckData {
        generated_at: generated_at(),
        reference_path: path.display().to_string(),
        report: loaded.report,
        keys_preview,
    };
    success("reference check", data)
}

pub fn resolve(name: &str, reference_path: Option<&Path>) -> ClientResult<SuccessEnvelope> {
    resolve_with_options(
        name,
        ReferenceOptions {
            reference_path,
            home_override: None,
        },
    )
}

/// Shows every candidate key tried for `name` and which one, if any, matched.
#[doc(hidden)]
pub fn resolve_with_options(name: &str, options: ReferenceOptions<'_>) -> ClientResult<SuccessEnvelope> {
    if name.trim().is_empty() {
        return Err(ClientError::invalid_argument_for_command(
            "Entity name must not be empty.",
            Some("reference resolve"),
        ));
    }

    let config = EngineConfig::from_env()?;
    let path = reference_path_only(options.home_override, options.reference_path)?;
    let loaded = load_reference_file(&path)?;
    let resolver = EntityKeyResolver::new(config.scan_limit);

    let candidates = resolver
        .candidate_keys(name)
        .into_iter()
        .map(|(strategy, key)| CandidateKey {
            present: loaded.table.get(&key).is_some(),
            strategy,
            key,
        })
        .collect::<Vec<CandidateKey>>();
    let resolution = resolver.resolve(name, &loaded.table);
    let split = split_entity_name(name);

    let data = ReferenceResolveData {
        generated_at: generated_at(),
        reference_path: path.display().to_string(),
        name: split.raw.to_string(),
        entity: split.entity.to_string(),
        region: split.region.map(str::to_string),
        scan_limit: resolver.scan_limit(),
        candidates,
        resolution,
    };
    success("reference resolve", data)
}
