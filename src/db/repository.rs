//! Database repository for CRUD operations.
//!
//! Uses prepared statements and conditional updates for data integrity.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    AlertFilters, AlertFrequency, CreateTenderRequest, ManualTender, RegisterAlertRequest,
    Tender, TenderOrigin, TenderStatus, UpdateTenderRequest, UserAlert,
};
use crate::sources::defense_keywords_in;

const TENDER_COLUMNS: &str = "id, title, organization, country, category, amount, currency, publish_date, deadline, description, source_url, status, reference, cpv_codes, created_by, created_at, last_modified, version";

const ALERT_COLUMNS: &str =
    "id, email, name, filters, frequency, active, created_at, last_sent_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== MANUAL TENDER OPERATIONS ====================

    /// List all manual tenders, newest first.
    pub async fn list_manual_tenders(&self) -> Result<Vec<ManualTender>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {TENDER_COLUMNS} FROM manual_tenders ORDER BY created_at DESC, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(manual_tender_from_row).collect())
    }

    /// Get a manual tender by ID.
    pub async fn get_manual_tender(&self, id: &str) -> Result<Option<ManualTender>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {TENDER_COLUMNS} FROM manual_tenders WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(manual_tender_from_row))
    }

    /// Create a new manual tender.
    pub async fn create_manual_tender(
        &self,
        request: &CreateTenderRequest,
    ) -> Result<ManualTender, AppError> {
        let id = format!("manual-{}", uuid::Uuid::new_v4());
        let now = Utc::now().to_rfc3339();
        let category = request
            .category
            .clone()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| "Defense".to_string());
        let status = request.status.unwrap_or_default();
        let cpv_codes = request.cpv_codes.clone().unwrap_or_default();
        let cpv_json = serde_json::to_string(&cpv_codes).unwrap_or_default();

        sqlx::query(&format!(
            "INSERT INTO manual_tenders ({TENDER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1)"
        ))
        .bind(&id)
        .bind(request.title.trim())
        .bind(request.organization.trim())
        .bind(request.country.trim())
        .bind(&category)
        .bind(request.amount)
        .bind(&request.currency)
        .bind(request.publish_date)
        .bind(request.deadline)
        .bind(request.description.clone().unwrap_or_default())
        .bind(&request.source_url)
        .bind(status.as_str())
        .bind(&request.reference)
        .bind(&cpv_json)
        .bind(&request.created_by)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.get_manual_tender(&id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Tender {} vanished after insert", id)))
    }

    /// Update a manual tender with optimistic concurrency control.
    pub async fn update_manual_tender(
        &self,
        id: &str,
        request: &UpdateTenderRequest,
    ) -> Result<ManualTender, AppError> {
        let existing = self
            .get_manual_tender(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tender {} not found", id)))?;

        // Check version for optimistic concurrency
        if let Some(expected) = request.expected_version {
            if existing.version != expected {
                return Err(AppError::Conflict {
                    message: format!(
                        "Version mismatch: expected {}, current {}",
                        expected, existing.version
                    ),
                    current_version: existing.version,
                });
            }
        }

        let now = Utc::now().to_rfc3339();
        let new_version = existing.version + 1;
        let current = existing.tender;

        let title = request.title.clone().unwrap_or(current.title);
        let organization = request.organization.clone().unwrap_or(current.organization);
        let country = request.country.clone().unwrap_or(current.country);
        let category = request.category.clone().unwrap_or(current.category);
        let amount = request.amount.or(current.amount);
        let currency = request.currency.clone().or(current.currency);
        let publish_date = request.publish_date.or(current.publish_date);
        let deadline = request.deadline.or(current.deadline);
        let description = request.description.clone().unwrap_or(current.description);
        let source_url = request.source_url.clone().or(current.source_url);
        let status = request.status.unwrap_or(current.status);
        let reference = request.reference.clone().or(current.reference);
        let cpv_codes = request.cpv_codes.clone().unwrap_or(current.cpv_codes);
        let cpv_json = serde_json::to_string(&cpv_codes).unwrap_or_default();

        // Conditional UPDATE with version check to prevent race conditions
        let result = sqlx::query(
            "UPDATE manual_tenders SET title = ?, organization = ?, country = ?, category = ?, amount = ?, currency = ?, publish_date = ?, deadline = ?, description = ?, source_url = ?, status = ?, reference = ?, cpv_codes = ?, last_modified = ?, version = ? WHERE id = ? AND version = ?"
        )
        .bind(&title)
        .bind(&organization)
        .bind(&country)
        .bind(&category)
        .bind(amount)
        .bind(&currency)
        .bind(publish_date)
        .bind(deadline)
        .bind(&description)
        .bind(&source_url)
        .bind(status.as_str())
        .bind(&reference)
        .bind(&cpv_json)
        .bind(&now)
        .bind(new_version)
        .bind(id)
        .bind(existing.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Version changed between read and write
            let current = self.get_manual_tender(id).await?;
            return Err(AppError::Conflict {
                message: "Concurrent modification detected".to_string(),
                current_version: current.map(|t| t.version).unwrap_or(0),
            });
        }

        self.get_manual_tender(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tender {} not found", id)))
    }

    /// Delete a manual tender.
    pub async fn delete_manual_tender(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM manual_tenders WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Tender {} not found", id)));
        }

        Ok(())
    }

    // ==================== ALERT OPERATIONS ====================

    /// Store a new alert subscription.
    pub async fn create_alert(&self, request: &RegisterAlertRequest) -> Result<UserAlert, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let email = request.email.trim().to_lowercase();
        let name = request
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| "Tender alert".to_string());
        let filters_json = serde_json::to_string(&request.filters)?;

        sqlx::query(&format!(
            "INSERT INTO alerts ({ALERT_COLUMNS}) VALUES (?, ?, ?, ?, ?, 1, ?, NULL)"
        ))
        .bind(&id)
        .bind(&email)
        .bind(&name)
        .bind(&filters_json)
        .bind(request.frequency.as_str())
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(UserAlert {
            id,
            email,
            name,
            filters: request.filters.clone(),
            frequency: request.frequency,
            active: true,
            created_at: now,
            last_sent_at: None,
        })
    }

    /// List alerts registered for an email address.
    pub async fn list_alerts_by_email(&self, email: &str) -> Result<Vec<UserAlert>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts WHERE email = ? ORDER BY created_at, id"
        ))
        .bind(email.trim().to_lowercase())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(alert_from_row).collect())
    }

    /// Get an alert by ID.
    pub async fn get_alert(&self, id: &str) -> Result<Option<UserAlert>, AppError> {
        let row = sqlx::query(&format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(alert_from_row))
    }

    /// Record that an alert digest went out.
    pub async fn mark_alert_sent(&self, id: &str, sent_at: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE alerts SET last_sent_at = ? WHERE id = ?")
            .bind(sent_at)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Alert {} not found", id)));
        }

        Ok(())
    }
}

// Helper functions for row conversion

fn manual_tender_from_row(row: &sqlx::sqlite::SqliteRow) -> ManualTender {
    let status: String = row.get("status");
    let cpv_str: Option<String> = row.get("cpv_codes");
    let title: String = row.get("title");
    let description: String = row.get("description");
    let matched_keywords = defense_keywords_in(&format!("{} {}", title, description));

    ManualTender {
        tender: Tender {
            id: row.get("id"),
            title,
            organization: row.get("organization"),
            country: row.get("country"),
            category: row.get("category"),
            amount: row.get("amount"),
            currency: row.get("currency"),
            publish_date: row.get("publish_date"),
            deadline: row.get("deadline"),
            description,
            source_url: row.get("source_url"),
            status: TenderStatus::parse(&status).unwrap_or_default(),
            origin: TenderOrigin::Manual,
            source: "Manual".to_string(),
            reference: row.get("reference"),
            cpv_codes: cpv_str.map(|s| parse_json_array(&s)).unwrap_or_default(),
            matched_keywords,
        },
        created_by: row.get("created_by"),
        created_at: row.get("created_at"),
        last_modified: row.get("last_modified"),
        version: row.get("version"),
    }
}

fn alert_from_row(row: &sqlx::sqlite::SqliteRow) -> UserAlert {
    let active: i32 = row.get("active");
    let filters_str: String = row.get("filters");
    let frequency: String = row.get("frequency");
    UserAlert {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        filters: serde_json::from_str::<AlertFilters>(&filters_str).unwrap_or_default(),
        frequency: AlertFrequency::parse(&frequency).unwrap_or_default(),
        active: active != 0,
        created_at: row.get("created_at"),
        last_sent_at: row.get("last_sent_at"),
    }
}

fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
