use std::path::Path;
use std::sync::Arc;

use crate::browse::{PageQuery, PageRequest, load_page};
use crate::commands::common::{generated_at, load_store_and_reference};
use crate::config::EngineConfig;
use crate::contracts::envelope::{ErrorContract, SuccessEnvelope, success};
use crate::contracts::types::ClaimsListData;
use crate::engine::aggregate::SqliteClaimStore;
use crate::engine::cache::ReferenceCache;
use crate::engine::enrich::EnrichmentEngine;
use crate::engine::reference::FileReferenceLoader;
use crate::{ClientError, ClientResult};

#[derive(Debug, Default)]
pub struct ClaimsListOptions<'a> {
    pub request: PageRequest,
    pub reference_path: Option<&'a Path>,
    pub home_override: Option<&'a Path>,
}

pub fn list(request: PageRequest, reference_path: Option<&Path>) -> ClientResult<SuccessEnvelope> {
    list_with_options(ClaimsListOptions {
        request,
        reference_path,
        home_override: None,
    })
}

/// One page of claims, decorated with cumulative totals, months and bands.
/// A missing or broken reference table degrades the derived fields instead of
/// failing the command.
#[doc(hidden)]
pub fn list_with_options(options: ClaimsListOptions<'_>) -> ClientResult<SuccessEnvelope> {
    let config = EngineConfig::from_env()?;
    let (setup, reference_path) =
        load_store_and_reference(options.home_override, options.reference_path)?;
    let query = PageQuery::from_request(&options.request);
    let mut page = load_page(&setup.db_path, &query)?;

    let loader = Arc::new(FileReferenceLoader::new(&reference_path));
    let cache = Arc::new(ReferenceCache::new(loader, config.cache_ttl));
    let warmed = cache.get_reference_table();
    let reference_issue = warmed
        .reload_error
        .map(|error| ErrorContract::from(&ClientError::from(error)));

    let store = Arc::new(SqliteClaimStore::new(&setup.db_path));
    let engine = EnrichmentEngine::new(store, cache, config);
    let enrichment = engine.enrich_in_place(&mut page.records);

    let data = ClaimsListData {
        generated_at: generated_at(),
        db_path: setup.db_path.display().to_string(),
        reference_path: reference_path.display().to_string(),
        reference_status: warmed.status,
        reference_issue,
        query,
        pagination: page.pagination,
        enrichment,
        rows: page.records,
    };

    success("claims list", data)
}
