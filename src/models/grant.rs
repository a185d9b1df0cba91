//! Grant model for USA and EU funding opportunities.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Publication state of a funding opportunity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    Posted,
    Forecasted,
    Closed,
    Archived,
}

impl GrantStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "posted" | "open" | "active" | "yes" | "31094502" => Some(GrantStatus::Posted),
            "forecasted" | "forthcoming" | "31094501" => Some(GrantStatus::Forecasted),
            "closed" | "no" | "31094503" => Some(GrantStatus::Closed),
            "archived" => Some(GrantStatus::Archived),
            _ => None,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, GrantStatus::Posted | GrantStatus::Forecasted)
    }
}

/// Upstream a grant was collected from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum GrantSource {
    GrantsGov,
    SamGov,
    EuFunding,
}

impl GrantSource {
    pub const ALL: [GrantSource; 3] = [
        GrantSource::GrantsGov,
        GrantSource::SamGov,
        GrantSource::EuFunding,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GrantSource::GrantsGov => "grants-gov",
            GrantSource::SamGov => "sam-gov",
            GrantSource::EuFunding => "eu-funding",
        }
    }

    /// Accepts the short query aliases used by the dashboard (`sam`, `eu`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "grants-gov" | "grantsgov" | "grants" => Some(GrantSource::GrantsGov),
            "sam-gov" | "samgov" | "sam" => Some(GrantSource::SamGov),
            "eu-funding" | "eu" | "eufunding" => Some(GrantSource::EuFunding),
            _ => None,
        }
    }
}

/// A funding opportunity in normalized form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub id: String,
    pub title: String,
    pub agency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opportunity_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub funding_instrument: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eligibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub award_ceiling: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub award_floor: Option<f64>,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_date: Option<NaiveDate>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub status: GrantStatus,
    pub source: GrantSource,
    pub country: String,
}

impl Grant {
    /// Posted or forecasted and not past its close date.
    pub fn is_open_on(&self, today: NaiveDate) -> bool {
        self.status.is_open() && self.close_date.map_or(true, |close| close >= today)
    }
}

/// Filters accepted by the grant endpoints, as query string or JSON body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantQuery {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub agency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub refresh: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_aliases() {
        assert_eq!(GrantSource::parse("sam"), Some(GrantSource::SamGov));
        assert_eq!(GrantSource::parse("EU"), Some(GrantSource::EuFunding));
        assert_eq!(GrantSource::parse("grants-gov"), Some(GrantSource::GrantsGov));
        assert_eq!(GrantSource::parse("all"), None);
    }

    #[test]
    fn test_status_parse_eu_codes() {
        assert_eq!(GrantStatus::parse("31094502"), Some(GrantStatus::Posted));
        assert_eq!(GrantStatus::parse("31094501"), Some(GrantStatus::Forecasted));
        assert_eq!(GrantStatus::parse("31094503"), Some(GrantStatus::Closed));
    }
}
