//! Tender model shared by automatic sources and the admin store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a tender.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TenderStatus {
    #[default]
    Active,
    Closed,
    Pending,
}

impl TenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenderStatus::Active => "active",
            TenderStatus::Closed => "closed",
            TenderStatus::Pending => "pending",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" | "open" => Some(TenderStatus::Active),
            "closed" => Some(TenderStatus::Closed),
            "pending" => Some(TenderStatus::Pending),
            _ => None,
        }
    }
}

/// Where a tender record came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TenderOrigin {
    Manual,
    #[default]
    Automatic,
}

/// A public procurement opportunity in normalized form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Tender {
    pub id: String,
    pub title: String,
    pub organization: String,
    pub country: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<NaiveDate>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub status: TenderStatus,
    pub origin: TenderOrigin,
    /// Human-readable source name, e.g. "PLACSP" or "Contracts Finder".
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cpv_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_keywords: Vec<String>,
}

impl Tender {
    /// Open and not yet past its deadline. A missing deadline counts as open-ended.
    pub fn is_open_on(&self, today: NaiveDate) -> bool {
        if self.status == TenderStatus::Closed {
            return false;
        }
        match self.deadline {
            Some(deadline) => deadline >= today,
            None => true,
        }
    }
}

/// An admin-authored tender with audit fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualTender {
    #[serde(flatten)]
    pub tender: Tender,
    pub created_by: String,
    pub created_at: String,
    pub last_modified: String,
    /// Internal version for optimistic concurrency control
    #[serde(default)]
    pub version: i64,
}

/// Request body for creating a manual tender.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenderRequest {
    pub title: String,
    pub organization: String,
    pub country: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub publish_date: Option<NaiveDate>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub status: Option<TenderStatus>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub cpv_codes: Option<Vec<String>>,
    #[serde(default = "default_created_by")]
    pub created_by: String,
}

fn default_created_by() -> String {
    "admin".to_string()
}

/// Request body for updating a manual tender.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenderRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub publish_date: Option<NaiveDate>,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub status: Option<TenderStatus>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub cpv_codes: Option<Vec<String>>,
    /// Expected version for optimistic concurrency control
    #[serde(default)]
    pub expected_version: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tender(status: TenderStatus, deadline: Option<NaiveDate>) -> Tender {
        Tender {
            id: "t-1".into(),
            title: "Radar upgrade".into(),
            organization: "MoD".into(),
            country: "UK".into(),
            category: "Defense".into(),
            amount: None,
            currency: None,
            publish_date: None,
            deadline,
            description: String::new(),
            source_url: None,
            status,
            origin: TenderOrigin::Automatic,
            source: "test".into(),
            reference: None,
            cpv_codes: Vec::new(),
            matched_keywords: Vec::new(),
        }
    }

    #[test]
    fn test_past_deadline_is_not_open_even_when_active() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let yesterday = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();
        assert!(!tender(TenderStatus::Active, Some(yesterday)).is_open_on(today));
        assert!(tender(TenderStatus::Active, Some(today)).is_open_on(today));
        assert!(tender(TenderStatus::Pending, None).is_open_on(today));
        assert!(!tender(TenderStatus::Closed, None).is_open_on(today));
    }

    #[test]
    fn test_manual_tender_serializes_flat() {
        let manual = ManualTender {
            tender: tender(TenderStatus::Active, None),
            created_by: "admin".into(),
            created_at: "2025-01-01T00:00:00Z".into(),
            last_modified: "2025-01-01T00:00:00Z".into(),
            version: 1,
        };
        let value = serde_json::to_value(&manual).unwrap();
        assert_eq!(value["title"], "Radar upgrade");
        assert_eq!(value["createdBy"], "admin");
        assert_eq!(value["status"], "active");
        assert_eq!(value["origin"], "automatic");
    }
}
