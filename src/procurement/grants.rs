//! Grant aggregation over Grants.gov, SAM.gov and the EU Funding & Tenders portal.

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use super::{BodyOrigin, ProcurementService, SourceOutcome, SourceReport};
use crate::models::{Grant, GrantQuery, GrantSource, GrantStatus};
use crate::sources::{
    fallback_grants, grant_request, parse_eu_funding, parse_grants_gov, parse_sam_gov,
    SourceError,
};

/// Result of [`ProcurementService::fetch_grants`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantBatch {
    pub grants: Vec<Grant>,
    pub sources: Vec<SourceReport>,
}

impl ProcurementService {
    /// Collect grants from `sources` and apply the query's filters.
    ///
    /// Closed and archived grants are only returned when `status` asks for them.
    pub async fn fetch_grants(
        &self,
        sources: &[GrantSource],
        query: &GrantQuery,
        today: NaiveDate,
    ) -> GrantBatch {
        let refresh = query.refresh.unwrap_or(false);
        let mut grants = Vec::new();
        let mut reports = Vec::new();

        for &source in sources {
            let (records, report) = self.collect_grant_source(source, query, refresh, today).await;
            grants.extend(records);
            reports.push(report);
        }

        let mut seen = HashSet::new();
        let grants = grants
            .into_iter()
            .filter(|grant| matches_query(grant, query, today))
            .filter(|grant| seen.insert(grant.id.clone()))
            .collect();

        GrantBatch {
            grants,
            sources: reports,
        }
    }

    async fn collect_grant_source(
        &self,
        source: GrantSource,
        query: &GrantQuery,
        refresh: bool,
        today: NaiveDate,
    ) -> (Vec<Grant>, SourceReport) {
        let mut report = SourceReport {
            source: source.as_str().to_string(),
            country: match source {
                GrantSource::EuFunding => "EU".to_string(),
                _ => "USA".to_string(),
            },
            outcome: SourceOutcome::Fallback,
            rate_limited: false,
            attempts: 0,
            count: 0,
            error: None,
        };

        let parsed = match grant_request(
            source,
            &self.grant_urls,
            self.sam_api_key.as_deref(),
            query,
            today,
        ) {
            None => Err(SourceError::Shape("SAM_GOV_API_KEY is not configured".to_string())),
            Some(request) => match self.upstream.fetch(&request, refresh).await {
                Ok(fetched) => {
                    report.attempts = fetched.attempts;
                    report.outcome = match fetched.origin {
                        BodyOrigin::Network => SourceOutcome::Fetched,
                        BodyOrigin::Cache => SourceOutcome::Cached,
                        BodyOrigin::StaleCache => {
                            report.rate_limited = true;
                            SourceOutcome::StaleCache
                        }
                    };
                    parse_grant_body(source, &fetched.body)
                }
                Err(failure) => {
                    report.attempts = failure.attempts;
                    report.rate_limited = matches!(failure.error, SourceError::RateLimited(_));
                    Err(failure.error)
                }
            },
        };

        let records = match parsed {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(
                    source = source.as_str(),
                    error = %err,
                    "grant source unavailable, serving sample data"
                );
                report.outcome = SourceOutcome::Fallback;
                report.error = Some(err.to_string());
                fallback_grants(source, today)
            }
        };

        report.count = records.len();
        (records, report)
    }
}

fn parse_grant_body(source: GrantSource, body: &str) -> Result<Vec<Grant>, SourceError> {
    match source {
        GrantSource::GrantsGov => parse_grants_gov(body),
        GrantSource::SamGov => parse_sam_gov(body),
        GrantSource::EuFunding => parse_eu_funding(body),
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Apply keyword, agency and status filters from a grant query.
pub fn matches_query(grant: &Grant, query: &GrantQuery, today: NaiveDate) -> bool {
    if let Some(keyword) = query.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        let haystack = format!("{} {} {}", grant.title, grant.description, grant.agency);
        if !contains_ci(&haystack, keyword) {
            return false;
        }
    }

    if let Some(agency) = query.agency.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
        if !contains_ci(&grant.agency, agency) {
            return false;
        }
    }

    let status = query.status.as_deref().map(|s| s.trim().to_ascii_lowercase());
    match status.as_deref() {
        Some("all") => true,
        Some("closed") => grant.status == GrantStatus::Closed
            || grant.close_date.is_some_and(|close| close < today),
        Some(other) if !other.is_empty() => match GrantStatus::parse(other) {
            Some(status) => grant.status == status && grant.is_open_on(today),
            None => grant.is_open_on(today),
        },
        _ => grant.is_open_on(today),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(title: &str, status: GrantStatus, close: Option<NaiveDate>) -> Grant {
        Grant {
            id: title.to_string(),
            title: title.to_string(),
            agency: "Department of Defense".into(),
            opportunity_number: None,
            funding_instrument: None,
            eligibility: None,
            category: None,
            award_ceiling: None,
            award_floor: None,
            currency: "USD".into(),
            posted_date: None,
            close_date: close,
            description: String::new(),
            url: None,
            status,
            source: GrantSource::GrantsGov,
            country: "USA".into(),
        }
    }

    #[test]
    fn test_closed_grants_only_on_request() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let open = grant("Radar research", GrantStatus::Posted, None);
        let closed = grant("Old radar", GrantStatus::Closed, None);
        let expired = grant("Expired radar", GrantStatus::Posted, NaiveDate::from_ymd_opt(2025, 1, 1));

        let default_query = GrantQuery::default();
        assert!(matches_query(&open, &default_query, today));
        assert!(!matches_query(&closed, &default_query, today));
        assert!(!matches_query(&expired, &default_query, today));

        let closed_query = GrantQuery {
            status: Some("closed".into()),
            ..Default::default()
        };
        assert!(!matches_query(&open, &closed_query, today));
        assert!(matches_query(&closed, &closed_query, today));
        assert!(matches_query(&expired, &closed_query, today));
    }

    #[test]
    fn test_status_filter_ignores_case() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let open = grant("Radar research", GrantStatus::Posted, None);
        let closed = grant("Old radar", GrantStatus::Closed, None);

        for status in ["Closed", "CLOSED", " closed "] {
            let query = GrantQuery {
                status: Some(status.into()),
                ..Default::default()
            };
            assert!(matches_query(&closed, &query, today), "{status}");
            assert!(!matches_query(&open, &query, today), "{status}");
        }

        let all = GrantQuery {
            status: Some("ALL".into()),
            ..Default::default()
        };
        assert!(matches_query(&open, &all, today));
        assert!(matches_query(&closed, &all, today));
    }

    #[test]
    fn test_keyword_and_agency_filters() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let g = grant("Hypersonic materials", GrantStatus::Posted, None);

        let query = GrantQuery {
            keyword: Some("HYPERSONIC".into()),
            agency: Some("defense".into()),
            ..Default::default()
        };
        assert!(matches_query(&g, &query, today));

        let query = GrantQuery {
            agency: Some("energy".into()),
            ..Default::default()
        };
        assert!(!matches_query(&g, &query, today));
    }
}
