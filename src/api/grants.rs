//! Grant endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::{error, success_with_meta, ApiResult};
use crate::errors::AppError;
use crate::models::{Grant, GrantQuery, GrantSource};
use crate::AppState;

/// Query parameters for `GET /api/sam-grants`.
#[derive(Debug, Default, Deserialize)]
pub struct SamGrantsQuery {
    /// `sam`, `grants-gov`, `eu` or `all` (default `sam`).
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub refresh: Option<bool>,
}

/// Resolve a `source` filter; absent or `all` selects every source.
fn resolve_sources(source: Option<&str>) -> Result<Vec<GrantSource>, AppError> {
    match source.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(GrantSource::ALL.to_vec()),
        Some(s) if s.eq_ignore_ascii_case("all") => Ok(GrantSource::ALL.to_vec()),
        Some(s) => GrantSource::parse(s)
            .map(|source| vec![source])
            .ok_or_else(|| AppError::Validation(format!("Unknown grant source: {}", s))),
    }
}

async fn grants_response(
    state: &AppState,
    sources: Vec<GrantSource>,
    query: GrantQuery,
) -> ApiResult<Vec<Grant>> {
    let today = Utc::now().date_naive();
    let batch = state.procurement.fetch_grants(&sources, &query, today).await;

    let meta = json!({
        "count": batch.grants.len(),
        "sources": batch.sources,
        "filters": {
            "keyword": query.keyword,
            "agency": query.agency,
            "status": query.status,
        },
        "lastUpdated": Utc::now().to_rfc3339(),
    });
    success_with_meta(batch.grants, meta)
}

/// GET /api/grants - Aggregated grants filtered by query string.
pub async fn list_grants(
    State(state): State<AppState>,
    Query(query): Query<GrantQuery>,
) -> ApiResult<Vec<Grant>> {
    match resolve_sources(query.source.as_deref()) {
        Ok(sources) => grants_response(&state, sources, query).await,
        Err(e) => error(e),
    }
}

/// POST /api/grants - Aggregated grants filtered by JSON body.
pub async fn search_grants(
    State(state): State<AppState>,
    Json(query): Json<GrantQuery>,
) -> ApiResult<Vec<Grant>> {
    match resolve_sources(query.source.as_deref()) {
        Ok(sources) => grants_response(&state, sources, query).await,
        Err(e) => error(e),
    }
}

/// GET /api/sam-grants - Grants from one source, SAM.gov by default.
pub async fn list_sam_grants(
    State(state): State<AppState>,
    Query(params): Query<SamGrantsQuery>,
) -> ApiResult<Vec<Grant>> {
    let source = params.source.as_deref().unwrap_or("sam");
    let sources = match resolve_sources(Some(source)) {
        Ok(sources) => sources,
        Err(e) => return error(e),
    };

    let query = GrantQuery {
        keyword: params.keyword,
        agency: params.agency,
        status: params.status,
        source: params.source,
        refresh: params.refresh,
    };
    grants_response(&state, sources, query).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_sources() {
        assert_eq!(resolve_sources(None).unwrap().len(), 3);
        assert_eq!(resolve_sources(Some("ALL")).unwrap().len(), 3);
        assert_eq!(
            resolve_sources(Some("eu")).unwrap(),
            vec![GrantSource::EuFunding]
        );
        assert!(resolve_sources(Some("nasa")).is_err());
    }
}
