//! Alert subscription and email endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{all_tenders, current_tenders, error, success, success_with_meta, ApiResult};
use crate::errors::AppError;
use crate::models::{
    AlertFilters, RegisterAlertRequest, SendAlertRequest, SendEmailJsRequest, SendEmailRequest,
    Tender, UserAlert,
};
use crate::notify::{is_valid_email, render_digest, Delivery, EmailMessage};
use crate::AppState;

/// Query parameters for `GET /api/alerts`.
#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    #[serde(default)]
    pub email: Option<String>,
}

/// Outcome of `POST /api/send-alert`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertSent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<String>,
    pub matched: usize,
    pub tenders: Vec<Tender>,
    pub delivery: Delivery,
}

/// Outcome of `POST /api/send-emailjs`.
#[derive(Debug, Serialize)]
pub struct EmailJsSent {
    pub status: String,
}

fn require_email(email: Option<&str>) -> Result<String, AppError> {
    let email = email.map(str::trim).unwrap_or_default();
    if email.is_empty() {
        return Err(AppError::Validation("Email is required".to_string()));
    }
    if !is_valid_email(email) {
        return Err(AppError::Validation(format!("Invalid email address: {}", email)));
    }
    Ok(email.to_string())
}

/// POST /api/register-notification - Store an alert subscription.
pub async fn register_notification(
    State(state): State<AppState>,
    Json(request): Json<RegisterAlertRequest>,
) -> ApiResult<UserAlert> {
    if let Err(e) = require_email(Some(&request.email)) {
        return error(e);
    }

    match state.repo.create_alert(&request).await {
        Ok(alert) => {
            tracing::info!(id = %alert.id, frequency = alert.frequency.as_str(), "Alert registered");
            success(alert)
        }
        Err(e) => error(e),
    }
}

/// GET /api/alerts?email= - List a subscriber's alerts.
pub async fn list_alerts(
    State(state): State<AppState>,
    Query(params): Query<AlertsQuery>,
) -> ApiResult<Vec<UserAlert>> {
    let email = match require_email(params.email.as_deref()) {
        Ok(email) => email,
        Err(e) => return error(e),
    };

    match state.repo.list_alerts_by_email(&email).await {
        Ok(alerts) => {
            let count = alerts.len();
            success_with_meta(alerts, serde_json::json!({ "count": count }))
        }
        Err(e) => error(e),
    }
}

/// Resolve the recipient, name and filters of a send-alert request.
async fn resolve_alert(
    state: &AppState,
    request: &SendAlertRequest,
) -> Result<(String, String, AlertFilters), AppError> {
    if let Some(alert_id) = &request.alert_id {
        let alert = state
            .repo
            .get_alert(alert_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Alert {} not found", alert_id)))?;
        if !alert.active {
            return Err(AppError::BadRequest(format!("Alert {} is inactive", alert_id)));
        }
        return Ok((alert.email, alert.name, alert.filters));
    }

    let email = require_email(request.email.as_deref())?;
    let name = request
        .alert_name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| "Tender alert".to_string());
    Ok((email, name, request.filters.clone().unwrap_or_default()))
}

/// POST /api/send-alert - Match current tenders against an alert and email the digest.
pub async fn send_alert(
    State(state): State<AppState>,
    Json(request): Json<SendAlertRequest>,
) -> ApiResult<AlertSent> {
    let (email, name, filters) = match resolve_alert(&state, &request).await {
        Ok(resolved) => resolved,
        Err(e) => return error(e),
    };

    let today = Utc::now().date_naive();
    let tenders = if filters.only_open {
        current_tenders(&state, None, false, today)
            .await
            .map(|(tenders, _)| tenders)
    } else {
        all_tenders(&state, today).await
    };
    let matched: Vec<Tender> = match tenders {
        Ok(tenders) => tenders.into_iter().filter(|t| filters.matches(t)).collect(),
        Err(e) => return error(e),
    };

    let digest = render_digest(&name, &matched);
    let message = EmailMessage {
        to: email,
        subject: digest.subject,
        text: digest.text,
        html: Some(digest.html),
    };

    let delivery = match state.email.send(&message).await {
        Ok(delivery) => delivery,
        Err(e) => return error(e),
    };

    if let Some(alert_id) = &request.alert_id {
        if let Err(e) = state
            .repo
            .mark_alert_sent(alert_id, &Utc::now().to_rfc3339())
            .await
        {
            tracing::warn!("Failed to record alert delivery: {}", e);
        }
    }

    success(AlertSent {
        alert_id: request.alert_id,
        matched: matched.len(),
        tenders: matched,
        delivery,
    })
}

/// POST /api/send-email - Send an arbitrary message.
pub async fn send_email(
    State(state): State<AppState>,
    Json(request): Json<SendEmailRequest>,
) -> ApiResult<Delivery> {
    let to = match require_email(Some(&request.to)) {
        Ok(to) => to,
        Err(e) => return error(e),
    };
    if request.subject.trim().is_empty() {
        return error(AppError::Validation("Subject is required".to_string()));
    }
    if request.text.is_none() && request.html.is_none() {
        return error(AppError::Validation(
            "Either text or html body is required".to_string(),
        ));
    }

    let message = EmailMessage {
        to,
        subject: request.subject,
        text: request.text.unwrap_or_default(),
        html: request.html,
    };

    match state.email.send(&message).await {
        Ok(delivery) => success(delivery),
        Err(e) => error(e),
    }
}

/// POST /api/send-emailjs - Forward a template send to EmailJS.
pub async fn send_emailjs(
    State(state): State<AppState>,
    Json(request): Json<SendEmailJsRequest>,
) -> ApiResult<EmailJsSent> {
    for (field, value) in [
        ("serviceId", &request.service_id),
        ("templateId", &request.template_id),
        ("userId", &request.user_id),
    ] {
        if value.trim().is_empty() {
            return error(AppError::Validation(format!("{} is required", field)));
        }
    }
    if !matches!(request.template_params, Value::Object(_) | Value::Null) {
        return error(AppError::Validation(
            "templateParams must be an object".to_string(),
        ));
    }

    match state.email.send_emailjs(&request).await {
        Ok(status) => success(EmailJsSent { status }),
        Err(e) => error(e),
    }
}
