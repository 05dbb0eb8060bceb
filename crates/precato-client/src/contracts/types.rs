use serde::Serialize;

use crate::browse::{PageQuery, Pagination};
use crate::contracts::envelope::ErrorContract;
use crate::engine::cache::CacheStatus;
use crate::engine::enrich::{ClaimRecord, EnrichmentReport};
use crate::engine::reference::LoadReport;
use crate::engine::resolver::{MatchStrategy, Resolution};

#[derive(Debug, Clone, Serialize)]
pub struct ClaimsListData {
    pub generated_at: String,
    pub db_path: String,
    pub reference_path: String,
    pub reference_status: CacheStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_issue: Option<ErrorContract>,
    pub query: PageQuery,
    pub pagination: Pagination,
    pub enrichment: EnrichmentReport,
    pub rows: Vec<ClaimRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceKeyPreview {
    pub key: String,
    pub monthly_ceiling: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceCheckData {
    pub generated_at: String,
    pub reference_path: String,
    pub report: LoadReport,
    pub keys_preview: Vec<ReferenceKeyPreview>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CandidateKey {
    pub strategy: MatchStrategy,
    pub key: String,
    pub present: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferenceResolveData {
    pub generated_at: String,
    pub reference_path: String,
    pub name: String,
    pub entity: String,
    pub region: Option<String>,
    pub scan_limit: usize,
    pub candidates: Vec<CandidateKey>,
    pub resolution: Resolution,
}
