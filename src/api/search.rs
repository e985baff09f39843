//! Search API endpoints.

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::{success, ApiResult};
use crate::models::EvidenceRecord;
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub evidence: EvidenceRecord,
    pub score: f32,
}

const MAX_SEARCH_LIMIT: usize = 100;

/// GET /api/search - Full-text search over evidence.
pub async fn search_evidence(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let limit = params.limit.min(MAX_SEARCH_LIMIT);
    let hits = state.search.search(&params.q, limit, params.offset)?;

    // Hits for records removed since indexing are skipped.
    let records = state.store.load().await.into_records();
    let results: Vec<SearchResultItem> = hits
        .into_iter()
        .filter_map(|hit| {
            records
                .iter()
                .find(|r| r.id == hit.evidence_id)
                .map(|r| SearchResultItem {
                    evidence: r.clone(),
                    score: hit.score,
                })
        })
        .collect();

    success(SearchResponse {
        total: results.len(),
        results,
        limit,
        offset: params.offset,
    })
}
