//! Alert subscription models.

use serde::{Deserialize, Serialize};

use super::Tender;
use crate::sources::country_matches;

/// How often an alert digest should go out.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum AlertFrequency {
    Immediate,
    #[default]
    Daily,
    Weekly,
}

impl AlertFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertFrequency::Immediate => "immediate",
            AlertFrequency::Daily => "daily",
            AlertFrequency::Weekly => "weekly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "immediate" => Some(AlertFrequency::Immediate),
            "daily" => Some(AlertFrequency::Daily),
            "weekly" => Some(AlertFrequency::Weekly),
            _ => None,
        }
    }
}

/// Saved search filters an alert is evaluated against.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AlertFilters {
    #[serde(default)]
    pub countries: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_amount: Option<f64>,
    #[serde(default = "default_only_open")]
    pub only_open: bool,
}

fn default_only_open() -> bool {
    true
}

impl AlertFilters {
    /// Every non-empty criterion must hold. Within a list, any entry may match.
    pub fn matches(&self, tender: &Tender) -> bool {
        if !self.countries.is_empty()
            && !self
                .countries
                .iter()
                .any(|c| country_matches(&tender.country, c))
        {
            return false;
        }

        if !self.categories.is_empty()
            && !self
                .categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&tender.category))
        {
            return false;
        }

        if !self.keywords.is_empty() {
            let haystack = format!("{} {}", tender.title, tender.description).to_lowercase();
            if !self
                .keywords
                .iter()
                .any(|k| haystack.contains(&k.to_lowercase()))
            {
                return false;
            }
        }

        // Amount bounds only exclude tenders that carry an amount.
        if let Some(amount) = tender.amount {
            if self.min_amount.is_some_and(|min| amount < min) {
                return false;
            }
            if self.max_amount.is_some_and(|max| amount > max) {
                return false;
            }
        }

        true
    }
}

/// A saved alert subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAlert {
    pub id: String,
    pub email: String,
    pub name: String,
    pub filters: AlertFilters,
    pub frequency: AlertFrequency,
    pub active: bool,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sent_at: Option<String>,
}

/// Request body for `POST /api/register-notification`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAlertRequest {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub filters: AlertFilters,
    #[serde(default)]
    pub frequency: AlertFrequency,
}

/// Request body for `POST /api/send-alert`.
///
/// Either `alertId` names a stored subscription, or `email` plus `filters`
/// describe an ad-hoc one.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendAlertRequest {
    #[serde(default)]
    pub alert_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub alert_name: Option<String>,
    #[serde(default)]
    pub filters: Option<AlertFilters>,
}

/// Request body for `POST /api/send-email`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub to: String,
    pub subject: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

/// Request body for `POST /api/send-emailjs`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailJsRequest {
    pub service_id: String,
    pub template_id: String,
    pub user_id: String,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub template_params: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TenderOrigin, TenderStatus};

    fn tender(country: &str, title: &str, amount: Option<f64>) -> Tender {
        Tender {
            id: "x".into(),
            title: title.into(),
            organization: "Org".into(),
            country: country.into(),
            category: "Defense".into(),
            amount,
            currency: Some("EUR".into()),
            publish_date: None,
            deadline: None,
            description: String::new(),
            source_url: None,
            status: TenderStatus::Active,
            origin: TenderOrigin::Automatic,
            source: "test".into(),
            reference: None,
            cpv_codes: Vec::new(),
            matched_keywords: Vec::new(),
        }
    }

    #[test]
    fn test_empty_filters_match_everything() {
        assert!(AlertFilters::default().matches(&tender("Spain", "Radar", None)));
    }

    #[test]
    fn test_country_and_keyword_filters() {
        let filters = AlertFilters {
            countries: vec!["spain".into()],
            keywords: vec!["radar".into()],
            ..Default::default()
        };
        assert!(filters.matches(&tender("Spain", "Coastal RADAR network", None)));
        assert!(!filters.matches(&tender("France", "Coastal radar network", None)));
        assert!(!filters.matches(&tender("Spain", "Office furniture", None)));
    }

    #[test]
    fn test_country_filter_accepts_iso_codes() {
        let filters = AlertFilters {
            countries: vec!["ES".into(), "gb".into()],
            ..Default::default()
        };
        assert!(filters.matches(&tender("Spain", "Radar", None)));
        assert!(filters.matches(&tender("UK", "Radar", None)));
        assert!(!filters.matches(&tender("France", "Radar", None)));
    }

    #[test]
    fn test_amount_bounds() {
        let filters = AlertFilters {
            min_amount: Some(1000.0),
            max_amount: Some(5000.0),
            ..Default::default()
        };
        assert!(filters.matches(&tender("UK", "a", Some(2000.0))));
        assert!(!filters.matches(&tender("UK", "a", Some(500.0))));
        assert!(!filters.matches(&tender("UK", "a", Some(9000.0))));
        assert!(filters.matches(&tender("UK", "a", None)));
    }
}
