//! Single-tender endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use super::{current_tenders, error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{ManualTender, Tender, TenderOrigin, UpdateTenderRequest};
use crate::AppState;

fn validate_update(request: &UpdateTenderRequest) -> Result<(), AppError> {
    for (field, value) in [
        ("Title", &request.title),
        ("Organization", &request.organization),
        ("Country", &request.country),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(AppError::Validation(format!("{} cannot be empty", field)));
        }
    }
    if request.amount.is_some_and(|a| a < 0.0 || !a.is_finite()) {
        return Err(AppError::Validation(
            "Amount must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

/// Find an open automatic tender.
///
/// Served from the search index once it holds the automatic set; before that, from a
/// cache-backed aggregation.
async fn find_automatic(state: &AppState, id: &str) -> Result<Option<Tender>, AppError> {
    let today = Utc::now().date_naive();
    if state.search.has_automatic() {
        let indexed = state.search.get_tender(id)?;
        return Ok(indexed
            .filter(|t| t.origin == TenderOrigin::Automatic && t.is_open_on(today)));
    }

    let (tenders, _) = current_tenders(state, None, false, today).await?;
    Ok(tenders
        .into_iter()
        .find(|t| t.id == id && t.origin == TenderOrigin::Automatic))
}

/// GET /api/tenders/:id - Get a manual or automatic tender.
pub async fn get_tender(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Tender> {
    match state.repo.get_manual_tender(&id).await {
        Ok(Some(manual)) => return success(manual.tender),
        Ok(None) => {}
        Err(e) => return error(e),
    }

    match find_automatic(&state, &id).await {
        Ok(Some(tender)) => success(tender),
        Ok(None) => error(AppError::NotFound(format!("Tender {} not found", id))),
        Err(e) => error(e),
    }
}

/// PUT /api/tenders/:id - Update a manual tender.
///
/// Automatic tenders are read-only.
pub async fn update_tender(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTenderRequest>,
) -> ApiResult<ManualTender> {
    if let Err(e) = validate_update(&request) {
        return error(e);
    }

    match state.repo.update_manual_tender(&id, &request).await {
        Ok(manual) => {
            if let Err(e) = state.search.index_tender(&manual.tender).await {
                tracing::warn!("Failed to re-index tender: {}", e);
            }
            success(manual)
        }
        Err(AppError::NotFound(message)) => match find_automatic(&state, &id).await {
            Ok(Some(_)) => error(AppError::BadRequest(format!(
                "Tender {} comes from an automatic source and cannot be edited",
                id
            ))),
            Ok(None) => error(AppError::NotFound(message)),
            Err(e) => error(e),
        },
        Err(e) => error(e),
    }
}
