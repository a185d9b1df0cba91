//! Admin tender store endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use serde_json::json;

use super::{error, success, success_with_meta, ApiResult};
use crate::errors::AppError;
use crate::models::{CreateTenderRequest, ManualTender};
use crate::AppState;

/// Confirmation body for deletes.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: String,
    pub deleted: bool,
}

/// Reject blank required fields and negative amounts.
pub fn validate_create(request: &CreateTenderRequest) -> Result<(), AppError> {
    if request.title.trim().is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    if request.organization.trim().is_empty() {
        return Err(AppError::Validation("Organization is required".to_string()));
    }
    if request.country.trim().is_empty() {
        return Err(AppError::Validation("Country is required".to_string()));
    }
    if request.amount.is_some_and(|a| a < 0.0 || !a.is_finite()) {
        return Err(AppError::Validation(
            "Amount must be a non-negative number".to_string(),
        ));
    }
    Ok(())
}

/// GET /api/admin/tenders - List manual tenders.
pub async fn list_admin_tenders(State(state): State<AppState>) -> ApiResult<Vec<ManualTender>> {
    match state.repo.list_manual_tenders().await {
        Ok(tenders) => {
            let count = tenders.len();
            success_with_meta(tenders, json!({ "count": count }))
        }
        Err(e) => error(e),
    }
}

/// POST /api/admin/tenders - Create a manual tender.
pub async fn create_admin_tender(
    State(state): State<AppState>,
    Json(request): Json<CreateTenderRequest>,
) -> ApiResult<ManualTender> {
    if let Err(e) = validate_create(&request) {
        return error(e);
    }

    match state.repo.create_manual_tender(&request).await {
        Ok(tender) => {
            if let Err(e) = state.search.index_tender(&tender.tender).await {
                tracing::warn!("Failed to index tender: {}", e);
            }
            tracing::info!(id = %tender.tender.id, by = %tender.created_by, "Manual tender created");
            success(tender)
        }
        Err(e) => error(e),
    }
}

/// DELETE /api/admin/tenders/:id - Delete a manual tender.
pub async fn delete_admin_tender(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Deleted> {
    match state.repo.delete_manual_tender(&id).await {
        Ok(()) => {
            if let Err(e) = state.search.remove_tender(&id).await {
                tracing::warn!("Failed to remove tender from index: {}", e);
            }
            success(Deleted { id, deleted: true })
        }
        Err(e) => error(e),
    }
}
