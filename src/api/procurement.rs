//! Tender aggregation endpoint.

use axum::extract::{Query, State};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{error, success_with_meta, ApiResult};
use crate::errors::AppError;
use crate::models::{Tender, TenderOrigin};
use crate::procurement::{open_unique, unique, SourceReport};
use crate::sources::country_matches;
use crate::AppState;

/// Query parameters for `GET /api/procurement`.
#[derive(Debug, Default, Deserialize)]
pub struct ProcurementQuery {
    #[serde(default)]
    pub country: Option<String>,
    /// Bypass the response cache.
    #[serde(default)]
    pub refresh: Option<bool>,
}

/// Manual tenders merged with the automatic ones, open on `today`.
///
/// Manual records come first and win on id collisions. The search index is refreshed
/// when the full set (no country filter) was fetched.
pub async fn current_tenders(
    state: &AppState,
    country: Option<&str>,
    refresh: bool,
    today: NaiveDate,
) -> Result<(Vec<Tender>, Vec<SourceReport>), AppError> {
    let country = country.map(str::trim).filter(|c| !c.is_empty());

    let batch = state.procurement.fetch_tenders(country, refresh, today).await;
    if country.is_none() {
        if let Err(e) = state.search.replace_automatic(&batch.tenders).await {
            tracing::warn!("Failed to reindex automatic tenders: {}", e);
        }
    }

    let manual = state
        .repo
        .list_manual_tenders()
        .await?
        .into_iter()
        .map(|m| m.tender)
        .filter(|t| country.map_or(true, |c| country_matches(&t.country, c)));

    let merged = open_unique(manual.chain(batch.tenders).collect(), today);
    Ok((merged, batch.sources))
}

/// Every known tender, closed and expired ones included. Manual records win on id.
pub async fn all_tenders(state: &AppState, today: NaiveDate) -> Result<Vec<Tender>, AppError> {
    let batch = state.procurement.fetch_all_tenders(None, false, today).await;
    let manual = state
        .repo
        .list_manual_tenders()
        .await?
        .into_iter()
        .map(|m| m.tender);

    Ok(unique(manual.chain(batch.tenders).collect()))
}

/// GET /api/procurement - Aggregated open tenders.
pub async fn get_procurement(
    State(state): State<AppState>,
    Query(params): Query<ProcurementQuery>,
) -> ApiResult<Vec<Tender>> {
    let today = Utc::now().date_naive();
    let refresh = params.refresh.unwrap_or(false);

    match current_tenders(&state, params.country.as_deref(), refresh, today).await {
        Ok((tenders, sources)) => {
            let manual = tenders
                .iter()
                .filter(|t| t.origin == TenderOrigin::Manual)
                .count();
            let meta = json!({
                "count": tenders.len(),
                "manualCount": manual,
                "automaticCount": tenders.len() - manual,
                "sources": sources,
                "lastUpdated": Utc::now().to_rfc3339(),
            });
            success_with_meta(tenders, meta)
        }
        Err(e) => error(e),
    }
}
