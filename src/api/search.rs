//! Search API endpoints.

use axum::extract::{Query, State};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{current_tenders, error, success, ApiResult};
use crate::models::Tender;
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    pub q: String,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

/// Search result with tenders and metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// Single search result item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    pub tender: Tender,
    pub score: f32,
}

/// Maximum number of search results allowed.
const MAX_SEARCH_LIMIT: usize = 100;

/// GET /api/search - Full-text search over the current tenders.
pub async fn search_tenders(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    // Limit the maximum number of results
    let limit = params.limit.clamp(1, MAX_SEARCH_LIMIT);

    // Load automatic tenders on first use
    if !state.search.has_automatic() {
        let today = Utc::now().date_naive();
        if let Err(e) = current_tenders(&state, None, false, today).await {
            return error(e);
        }
    }

    let page = match state.search.search(&params.q, limit, params.offset) {
        Ok(page) => page,
        Err(e) => return error(e),
    };

    let results = page
        .results
        .into_iter()
        .map(|hit| SearchResultItem {
            tender: hit.tender,
            score: hit.score,
        })
        .collect();

    success(SearchResponse {
        results,
        total: page.total,
        limit,
        offset: params.offset,
    })
}
