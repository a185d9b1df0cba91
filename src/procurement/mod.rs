//! Tender and grant aggregation over the configured upstream sources.
//!
//! Endpoints are visited in order, one at a time. Each one is fetched through the
//! cached, rate-limited [`UpstreamClient`] and parsed by its format. An endpoint that
//! cannot be fetched or parsed contributes its country's sample records instead.

mod cache;
mod grants;
mod rate_limit;
mod refresh;
mod upstream;

pub use cache::{Cached, ResponseCache};
pub use grants::GrantBatch;
pub use rate_limit::RateLimiter;
pub use refresh::spawn_refresh_task;
pub use upstream::{BodyOrigin, FetchFailure, Fetched, UpstreamClient};

use std::collections::HashSet;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::{Config, ProcurementSettings};
use crate::models::Tender;
use crate::sources::{
    country_matches, default_endpoints, fallback_tenders, EndpointConfig, GrantUrls, SourceError,
};

/// How an endpoint's records were obtained.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SourceOutcome {
    Fetched,
    Cached,
    StaleCache,
    Fallback,
}

/// Per-endpoint outcome of one aggregation run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub source: String,
    pub country: String,
    pub outcome: SourceOutcome,
    pub rate_limited: bool,
    pub attempts: u32,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of [`ProcurementService::fetch_tenders`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderBatch {
    pub tenders: Vec<Tender>,
    pub sources: Vec<SourceReport>,
}

/// Aggregates tenders and grants from the upstream registry.
pub struct ProcurementService {
    upstream: UpstreamClient,
    endpoints: Vec<EndpointConfig>,
    grant_urls: GrantUrls,
    sam_api_key: Option<String>,
}

impl ProcurementService {
    pub fn new(
        settings: ProcurementSettings,
        endpoints: Vec<EndpointConfig>,
        grant_urls: GrantUrls,
        sam_api_key: Option<String>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            upstream: UpstreamClient::new(settings)?,
            endpoints,
            grant_urls,
            sam_api_key,
        })
    }

    /// Service over the production endpoints.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        Self::new(
            config.procurement.clone(),
            default_endpoints(),
            GrantUrls::default(),
            config.sam_api_key.clone(),
        )
    }

    pub fn endpoints(&self) -> &[EndpointConfig] {
        &self.endpoints
    }

    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }

    /// Collect open tenders from every endpoint matching `country`.
    ///
    /// `refresh` skips the cache read; fresh responses are still cached. The result is
    /// deduplicated by id and holds only tenders open on `today`.
    pub async fn fetch_tenders(
        &self,
        country: Option<&str>,
        refresh: bool,
        today: NaiveDate,
    ) -> TenderBatch {
        let (collected, sources) = self.collect(country, refresh, today).await;
        let total = collected.len();
        let tenders = open_unique(collected, today);
        tracing::info!(
            endpoints = sources.len(),
            collected = total,
            open = tenders.len(),
            "tender aggregation finished"
        );
        TenderBatch { tenders, sources }
    }

    /// Like [`fetch_tenders`](Self::fetch_tenders), keeping closed and expired records.
    pub async fn fetch_all_tenders(
        &self,
        country: Option<&str>,
        refresh: bool,
        today: NaiveDate,
    ) -> TenderBatch {
        let (collected, sources) = self.collect(country, refresh, today).await;
        TenderBatch {
            tenders: unique(collected),
            sources,
        }
    }

    async fn collect(
        &self,
        country: Option<&str>,
        refresh: bool,
        today: NaiveDate,
    ) -> (Vec<Tender>, Vec<SourceReport>) {
        let mut tenders = Vec::new();
        let mut sources = Vec::new();

        for endpoint in self
            .endpoints
            .iter()
            .filter(|e| country.map_or(true, |c| country_matches(&e.country, c)))
        {
            let (records, report) = self.collect_endpoint(endpoint, refresh, today).await;
            tenders.extend(records);
            sources.push(report);
        }

        (tenders, sources)
    }

    async fn collect_endpoint(
        &self,
        endpoint: &EndpointConfig,
        refresh: bool,
        today: NaiveDate,
    ) -> (Vec<Tender>, SourceReport) {
        let mut report = SourceReport {
            source: endpoint.name.clone(),
            country: endpoint.country.clone(),
            outcome: SourceOutcome::Fallback,
            rate_limited: false,
            attempts: 0,
            count: 0,
            error: None,
        };

        let parsed = match self.upstream.fetch(&endpoint.request_for(today), refresh).await {
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
                endpoint.format.parse(&fetched.body, &endpoint.context)
            }
            Err(failure) => {
                report.attempts = failure.attempts;
                report.rate_limited = matches!(failure.error, SourceError::RateLimited(_));
                Err(failure.error)
            }
        };

        let records = match parsed {
            Ok(records) => records,
            Err(err) => {
                tracing::warn!(
                    source = %endpoint.name,
                    country = %endpoint.country,
                    error = %err,
                    "source unavailable, serving sample data"
                );
                report.outcome = SourceOutcome::Fallback;
                report.error = Some(err.to_string());
                fallback_tenders(&endpoint.country, today)
            }
        };

        report.count = records.len();
        (records, report)
    }
}

/// Keep the first record per id.
pub fn unique(tenders: Vec<Tender>) -> Vec<Tender> {
    let mut seen = HashSet::new();
    tenders
        .into_iter()
        .filter(|tender| seen.insert(tender.id.clone()))
        .collect()
}

/// Keep the first record per id, dropping closed and expired ones.
pub fn open_unique(tenders: Vec<Tender>, today: NaiveDate) -> Vec<Tender> {
    unique(
        tenders
            .into_iter()
            .filter(|tender| tender.is_open_on(today))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TenderOrigin, TenderStatus};

    fn tender(id: &str, status: TenderStatus, deadline: Option<NaiveDate>) -> Tender {
        Tender {
            id: id.into(),
            title: "Radar".into(),
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
    fn test_open_unique_filters_and_dedups() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 10).unwrap();
        let past = NaiveDate::from_ymd_opt(2025, 6, 1);
        let future = NaiveDate::from_ymd_opt(2025, 7, 1);

        let result = open_unique(
            vec![
                tender("a", TenderStatus::Active, future),
                tender("a", TenderStatus::Active, future),
                tender("b", TenderStatus::Active, past),
                tender("c", TenderStatus::Closed, future),
                tender("d", TenderStatus::Pending, None),
            ],
            today,
        );

        let ids: Vec<&str> = result.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
    }

    #[test]
    fn test_unique_keeps_closed_records() {
        let past = NaiveDate::from_ymd_opt(2025, 6, 1);

        let result = unique(vec![
            tender("a", TenderStatus::Closed, past),
            tender("a", TenderStatus::Active, past),
            tender("b", TenderStatus::Active, past),
        ]);

        let ids: Vec<&str> = result.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(result[0].status, TenderStatus::Closed);
    }
}
