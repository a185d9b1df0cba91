//! Endpoint registry: where each source lives and how to read it.

use chrono::{Days, NaiveDate};
use reqwest::Method;
use serde_json::{json, Value};

use super::{
    CsvParser, FeedParser, FieldMap, JsonApiParser, OcdsParser, SourceContext, SourceFormat,
};
use crate::models::{GrantQuery, GrantSource};

/// An HTTP request against an upstream, also used as the cache key.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl UpstreamRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            body: Some(body),
            ..Self::get(url)
        }
    }

    pub fn with_query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_string(), value.into()));
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    /// Method, URL with query, and body. Headers are not part of the key.
    pub fn cache_key(&self) -> String {
        let mut key = format!("{} {}", self.method, self.url);
        for (index, (name, value)) in self.query.iter().enumerate() {
            key.push(if index == 0 && !self.url.contains('?') { '?' } else { '&' });
            key.push_str(name);
            key.push('=');
            key.push_str(value);
        }
        if let Some(body) = &self.body {
            key.push(' ');
            key.push_str(&body.to_string());
        }
        key
    }

    /// `host:port` of the target, the rate limiter's bucket.
    pub fn host(&self) -> String {
        match reqwest::Url::parse(&self.url) {
            Ok(url) => format!(
                "{}:{}",
                url.host_str().unwrap_or_default(),
                url.port_or_known_default().unwrap_or_default()
            ),
            Err(_) => self.url.clone(),
        }
    }
}

/// How an endpoint's request is produced.
#[derive(Debug, Clone)]
pub enum EndpointRequest {
    Fixed(UpstreamRequest),
    /// Rebuilt on every fetch from the current date.
    Dated(fn(NaiveDate) -> UpstreamRequest),
}

/// One tender source.
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub name: String,
    /// Country label; also selects the fallback samples.
    pub country: String,
    pub request: EndpointRequest,
    pub format: SourceFormat,
    pub context: SourceContext,
}

impl EndpointConfig {
    pub fn new(request: UpstreamRequest, format: SourceFormat, context: SourceContext) -> Self {
        Self::with_request(EndpointRequest::Fixed(request), format, context)
    }

    pub fn dated(
        build: fn(NaiveDate) -> UpstreamRequest,
        format: SourceFormat,
        context: SourceContext,
    ) -> Self {
        Self::with_request(EndpointRequest::Dated(build), format, context)
    }

    fn with_request(request: EndpointRequest, format: SourceFormat, context: SourceContext) -> Self {
        Self {
            name: context.source.clone(),
            country: context.country.clone(),
            request,
            format,
            context,
        }
    }

    /// The request to send for a fetch running on `today`.
    pub fn request_for(&self, today: NaiveDate) -> UpstreamRequest {
        match &self.request {
            EndpointRequest::Fixed(request) => request.clone(),
            EndpointRequest::Dated(build) => build(today),
        }
    }
}

const COUNTRY_ALIASES: &[(&str, &[&str])] = &[
    ("Spain", &["es", "esp", "españa"]),
    ("UK", &["gb", "gbr", "united kingdom", "great britain"]),
    ("France", &["fr", "fra"]),
    ("Canada", &["ca", "can"]),
    ("Australia", &["au", "aus"]),
    ("New Zealand", &["nz", "nzl"]),
    ("Singapore", &["sg", "sgp"]),
    ("USA", &["us", "united states"]),
];

/// Case-insensitive country match that also accepts ISO codes.
pub fn country_matches(label: &str, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() || query == "all" || label.to_lowercase() == query {
        return true;
    }
    COUNTRY_ALIASES
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(label))
        .is_some_and(|(_, aliases)| aliases.contains(&query.as_str()))
}

/// AusTender notices published in the 30 days up to `today`.
fn austender_request(today: NaiveDate) -> UpstreamRequest {
    let window_start = today.checked_sub_days(Days::new(30)).unwrap_or(today);
    UpstreamRequest::get(format!(
        "https://api.tenders.gov.au/ocds/findByDates/contractPublished/{}T00:00:00Z/{}T23:59:59Z",
        window_start, today
    ))
}

/// The production tender endpoints, in aggregation order.
pub fn default_endpoints() -> Vec<EndpointConfig> {
    vec![
        EndpointConfig::new(
            UpstreamRequest::get(
                "https://contrataciondelsectorpublico.gob.es/sindicacion/sindicacion_643/licitacionesPerfilesContratanteCompleto3.atom",
            ),
            SourceFormat::Feed(FeedParser::new()),
            SourceContext::new("PLACSP", "Spain", "ES").with_currency("EUR"),
        ),
        EndpointConfig::new(
            UpstreamRequest::get(
                "https://www.contractsfinder.service.gov.uk/Published/Notices/OCDS/Search",
            )
            .with_query("stages", "tender")
            .with_query("limit", "100"),
            SourceFormat::Ocds(OcdsParser::new()),
            SourceContext::new("Contracts Finder", "UK", "UK").with_currency("GBP"),
        ),
        EndpointConfig::new(
            UpstreamRequest::get("https://www.find-tender.service.gov.uk/api/1.0/ocdsReleasePackages")
                .with_query("stages", "tender")
                .with_query("limit", "100"),
            SourceFormat::Ocds(OcdsParser::new()),
            SourceContext::new("Find a Tender", "UK", "FTS").with_currency("GBP"),
        ),
        EndpointConfig::new(
            UpstreamRequest::get(
                "https://boamp-datadila.opendatasoft.com/api/explore/v2.1/catalog/datasets/boamp/records",
            )
            .with_query("order_by", "dateparution desc")
            .with_query("limit", "100"),
            SourceFormat::JsonApi(JsonApiParser::new(
                "results",
                FieldMap {
                    id: "idweb",
                    title: "objet",
                    organization: Some("nomacheteur"),
                    description: Some("descripteur_libelle"),
                    category: Some("type_marche"),
                    publish_date: Some("dateparution"),
                    deadline: Some("datelimitereponse"),
                    url: Some("url_avis"),
                    ..Default::default()
                },
            )),
            SourceContext::new("BOAMP", "France", "FR")
                .with_currency("EUR")
                .with_link_template("https://www.boamp.fr/pages/avis/?q=idweb:{id}"),
        ),
        EndpointConfig::new(
            UpstreamRequest::get(
                "https://canadabuys.canada.ca/opendata/pub/openTenderNotice-ouvertAvisAppelOffres.csv",
            ),
            SourceFormat::Csv(CsvParser::new(FieldMap {
                id: "referenceNumber-numeroReference",
                title: "title-titre-eng",
                organization: Some("contractingEntityName-nomEntitContractante-eng"),
                description: Some("tenderDescription-descriptionAppelOffres-eng"),
                category: Some("procurementCategory-categorieApprovisionnement"),
                publish_date: Some("publicationDate-datePublication"),
                deadline: Some("tenderClosingDate-appelOffresDateCloture"),
                url: Some("noticeURL-URLavis-eng"),
                status: Some("tenderStatus-appelOffresStatut-eng"),
                ..Default::default()
            })),
            SourceContext::new("CanadaBuys", "Canada", "CA").with_currency("CAD"),
        ),
        EndpointConfig::dated(
            austender_request,
            SourceFormat::Ocds(OcdsParser::new()),
            SourceContext::new("AusTender", "Australia", "AU").with_currency("AUD"),
        ),
        EndpointConfig::new(
            UpstreamRequest::get("https://www.gets.govt.nz/ExternalTenderRss.htm"),
            SourceFormat::Feed(FeedParser::new()),
            SourceContext::new("GETS", "New Zealand", "NZ").with_currency("NZD"),
        ),
        EndpointConfig::new(
            UpstreamRequest::get("https://data.gov.sg/api/action/datastore_search")
                .with_query("resource_id", "d_acde1106003906a75c3fa052592f2fcb")
                .with_query("limit", "100"),
            SourceFormat::JsonApi(JsonApiParser::new(
                "result.records",
                FieldMap {
                    id: "tender_no",
                    title: "tender_description",
                    organization: Some("agency"),
                    amount: Some("awarded_amt"),
                    publish_date: Some("award_date"),
                    status: Some("tender_detail_status"),
                    ..Default::default()
                },
            )),
            SourceContext::new("GeBIZ", "Singapore", "SG").with_currency("SGD"),
        ),
    ]
}

/// Base URLs of the grant APIs.
#[derive(Debug, Clone)]
pub struct GrantUrls {
    pub grants_gov: String,
    pub sam_gov: String,
    pub eu_funding: String,
}

impl Default for GrantUrls {
    fn default() -> Self {
        Self {
            grants_gov: "https://api.grants.gov/v1/api/search2".to_string(),
            sam_gov: "https://api.sam.gov/opportunities/v2/search".to_string(),
            eu_funding: "https://api.tech.ec.europa.eu/search-api/prod/rest/search".to_string(),
        }
    }
}

const DEFAULT_GRANT_KEYWORD: &str = "defense";

/// Build the search request for one grant source.
///
/// Returns `None` for SAM.gov when no API key is configured.
pub fn grant_request(
    source: GrantSource,
    urls: &GrantUrls,
    sam_api_key: Option<&str>,
    query: &GrantQuery,
    today: NaiveDate,
) -> Option<UpstreamRequest> {
    let keyword = query
        .keyword
        .as_deref()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .unwrap_or(DEFAULT_GRANT_KEYWORD);

    match source {
        GrantSource::GrantsGov => {
            let status = match query.status.as_deref().map(|s| s.trim().to_ascii_lowercase()) {
                Some(s) if s == "closed" => "closed",
                Some(s) if s == "archived" => "archived",
                _ => "forecasted|posted",
            };
            let mut body = json!({
                "keyword": keyword,
                "oppStatuses": status,
                "rows": 100,
            });
            if let Some(agency) = query.agency.as_deref().filter(|a| !a.is_empty()) {
                body["agencies"] = json!(agency);
            }
            Some(UpstreamRequest::post_json(&urls.grants_gov, body))
        }
        GrantSource::SamGov => {
            let key = sam_api_key?;
            let from = today.checked_sub_days(Days::new(90)).unwrap_or(today);
            Some(
                UpstreamRequest::get(&urls.sam_gov)
                    .with_query("api_key", key)
                    .with_query("title", keyword)
                    .with_query("postedFrom", from.format("%m/%d/%Y").to_string())
                    .with_query("postedTo", today.format("%m/%d/%Y").to_string())
                    .with_query("limit", "100"),
            )
        }
        GrantSource::EuFunding => Some(
            UpstreamRequest::post_json(
                &urls.eu_funding,
                json!({
                    "bool": {
                        "must": [
                            {"terms": {"type": ["1", "2"]}},
                            {"terms": {"status": ["31094501", "31094502"]}}
                        ]
                    }
                }),
            )
            .with_query("apiKey", "SEDIA")
            .with_query("text", keyword)
            .with_query("pageSize", "100")
            .with_query("pageNumber", "1"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_includes_query_and_body() {
        let get = UpstreamRequest::get("http://example.test/search").with_query("q", "radar");
        assert_eq!(get.cache_key(), "GET http://example.test/search?q=radar");

        let post = UpstreamRequest::post_json("http://example.test/search", json!({"k": 1}));
        assert_eq!(post.cache_key(), "POST http://example.test/search {\"k\":1}");
    }

    #[test]
    fn test_host_includes_port() {
        assert_eq!(
            UpstreamRequest::get("http://127.0.0.1:4000/feed").host(),
            "127.0.0.1:4000"
        );
        assert_eq!(
            UpstreamRequest::get("https://www.boamp.fr/x").host(),
            "www.boamp.fr:443"
        );
    }

    #[test]
    fn test_country_matches_aliases() {
        assert!(country_matches("Spain", "spain"));
        assert!(country_matches("Spain", "ES"));
        assert!(country_matches("UK", "gb"));
        assert!(country_matches("France", "all"));
        assert!(!country_matches("France", "es"));
    }

    #[test]
    fn test_default_endpoints_cover_every_country() {
        let endpoints = default_endpoints();
        for country in ["Spain", "UK", "France", "Canada", "Australia", "New Zealand", "Singapore"] {
            assert!(endpoints.iter().any(|e| e.country == country), "{country}");
        }
    }

    #[test]
    fn test_sam_requires_api_key() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let urls = GrantUrls::default();
        let query = GrantQuery::default();
        assert!(grant_request(GrantSource::SamGov, &urls, None, &query, today).is_none());

        let request = grant_request(GrantSource::SamGov, &urls, Some("k"), &query, today).unwrap();
        assert!(request.query.contains(&("postedTo".to_string(), "06/01/2025".to_string())));
    }

    #[test]
    fn test_dated_request_follows_fetch_date() {
        let endpoints = default_endpoints();
        let austender = endpoints.iter().find(|e| e.name == "AusTender").unwrap();

        let june = austender.request_for(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
        assert!(june.url.ends_with("/2025-05-02T00:00:00Z/2025-06-01T23:59:59Z"), "{}", june.url);

        let july = austender.request_for(NaiveDate::from_ymd_opt(2025, 7, 15).unwrap());
        assert!(july.url.ends_with("/2025-06-15T00:00:00Z/2025-07-15T23:59:59Z"), "{}", july.url);
    }

    #[test]
    fn test_grants_gov_status_ignores_case() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let urls = GrantUrls::default();
        for status in ["closed", "Closed", "CLOSED "] {
            let query = GrantQuery {
                status: Some(status.to_string()),
                ..Default::default()
            };
            let request = grant_request(GrantSource::GrantsGov, &urls, None, &query, today).unwrap();
            assert_eq!(request.body.unwrap()["oppStatuses"], "closed", "{status}");
        }
    }
}
