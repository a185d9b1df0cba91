//! Source parsers.
//!
//! Each parser turns one upstream's native format into normalized [`Tender`] or
//! [`Grant`](crate::models::Grant) records. Parsers are pure: the same body and context
//! always produce the same output.

mod csv;
mod dates;
mod eu_funding;
mod fallback;
mod feed;
mod grants_gov;
mod json_api;
mod keywords;
mod ocds;
mod registry;
mod sam_gov;
mod text;

pub use csv::CsvParser;
pub use dates::{parse_date, parse_us_date};
pub use eu_funding::parse_eu_funding;
pub use fallback::{fallback_grants, fallback_tenders};
pub use feed::FeedParser;
pub use grants_gov::parse_grants_gov;
pub use json_api::JsonApiParser;
pub use keywords::{defense_keywords_in, is_defense_related, DEFENSE_KEYWORDS};
pub use ocds::OcdsParser;
pub use registry::{
    country_matches, default_endpoints, grant_request, EndpointConfig, GrantUrls, UpstreamRequest,
};
pub use sam_gov::parse_sam_gov;

use serde_json::Value;

use crate::models::{Tender, TenderOrigin, TenderStatus};

/// Errors raised while fetching or decoding a source.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("http error: {0}")]
    Http(String),
    #[error("upstream returned status {0}")]
    Status(u16),
    #[error("rate limited for host {0}")]
    RateLimited(String),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected document shape: {0}")]
    Shape(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => SourceError::Status(status.as_u16()),
            None => SourceError::Http(err.to_string()),
        }
    }
}

/// Per-endpoint labels applied to every parsed record.
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// Source name shown to users, e.g. "PLACSP".
    pub source: String,
    pub country: String,
    /// Category assigned when the record carries none.
    pub category: String,
    /// Default currency when the record carries none.
    pub currency: Option<String>,
    /// Prefix for record ids, keeps ids unique across sources.
    pub id_prefix: String,
    /// Notice URL pattern with an `{id}` placeholder.
    pub link_template: Option<String>,
    /// Drop records that do not match the defense keyword list.
    pub defense_only: bool,
}

impl SourceContext {
    pub fn new(source: &str, country: &str, id_prefix: &str) -> Self {
        Self {
            source: source.to_string(),
            country: country.to_string(),
            category: "Defense".to_string(),
            currency: None,
            id_prefix: id_prefix.to_string(),
            link_template: None,
            defense_only: true,
        }
    }

    pub fn with_currency(mut self, currency: &str) -> Self {
        self.currency = Some(currency.to_string());
        self
    }

    pub fn with_link_template(mut self, template: &str) -> Self {
        self.link_template = Some(template.to_string());
        self
    }

    pub fn without_keyword_filter(mut self) -> Self {
        self.defense_only = false;
        self
    }

    pub fn record_id(&self, raw: &str) -> String {
        format!("{}-{}", self.id_prefix, text::stable_id(raw))
    }

    pub fn link_for(&self, raw_id: &str) -> Option<String> {
        self.link_template
            .as_ref()
            .map(|template| template.replace("{id}", raw_id))
    }

    /// Classify a parsed record, dropping it when it is not defense-related.
    pub fn accept(&self, mut tender: Tender) -> Option<Tender> {
        let haystack = format!("{} {}", tender.title, tender.description);
        let matched = defense_keywords_in(&haystack);
        if self.defense_only && matched.is_empty() {
            return None;
        }
        tender.matched_keywords = matched;
        Some(tender)
    }

    /// A tender skeleton carrying this context's labels.
    pub fn blank_tender(&self, id: String, title: String) -> Tender {
        Tender {
            id,
            title,
            organization: String::new(),
            country: self.country.clone(),
            category: self.category.clone(),
            amount: None,
            currency: self.currency.clone(),
            publish_date: None,
            deadline: None,
            description: String::new(),
            source_url: None,
            status: TenderStatus::Active,
            origin: TenderOrigin::Automatic,
            source: self.source.clone(),
            reference: None,
            cpv_codes: Vec::new(),
            matched_keywords: Vec::new(),
        }
    }
}

/// The wire format of an endpoint, selecting its parser.
#[derive(Debug, Clone)]
pub enum SourceFormat {
    Feed(FeedParser),
    Ocds(OcdsParser),
    JsonApi(JsonApiParser),
    Csv(CsvParser),
}

impl SourceFormat {
    pub fn parse(&self, body: &str, ctx: &SourceContext) -> Result<Vec<Tender>, SourceError> {
        match self {
            SourceFormat::Feed(parser) => parser.parse(body, ctx),
            SourceFormat::Ocds(parser) => parser.parse(body, ctx),
            SourceFormat::JsonApi(parser) => parser.parse(body, ctx),
            SourceFormat::Csv(parser) => parser.parse(body, ctx),
        }
    }
}

/// Declarative mapping from source field names to tender fields.
///
/// Used by the JSON and CSV parsers. For JSON the names are dotted paths; for CSV they
/// are header names.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    pub id: &'static str,
    pub title: &'static str,
    pub organization: Option<&'static str>,
    pub description: Option<&'static str>,
    pub category: Option<&'static str>,
    pub amount: Option<&'static str>,
    pub currency: Option<&'static str>,
    pub publish_date: Option<&'static str>,
    pub deadline: Option<&'static str>,
    pub url: Option<&'static str>,
    pub status: Option<&'static str>,
    pub reference: Option<&'static str>,
}

impl FieldMap {
    /// Build a tender from a field lookup. Returns `None` when id or title is missing.
    pub fn build<F>(&self, lookup: F, ctx: &SourceContext) -> Option<Tender>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |field: Option<&'static str>| field.and_then(&lookup);

        let raw_id = lookup(self.id)?;
        let title = lookup(self.title)?;

        let mut tender = ctx.blank_tender(ctx.record_id(&raw_id), title);
        if let Some(organization) = get(self.organization) {
            tender.organization = organization;
        }
        if let Some(description) = get(self.description) {
            tender.description = description;
        }
        if let Some(category) = get(self.category) {
            tender.category = category;
        }
        tender.amount = get(self.amount).and_then(|raw| text::parse_amount(&raw));
        if let Some(currency) = get(self.currency) {
            tender.currency = Some(currency);
        }
        tender.publish_date = get(self.publish_date).and_then(|raw| parse_date(&raw));
        tender.deadline = get(self.deadline).and_then(|raw| parse_date(&raw));
        tender.source_url = get(self.url).or_else(|| ctx.link_for(&raw_id));
        if let Some(status) = get(self.status) {
            tender.status = status_from_label(&status);
        }
        tender.reference = get(self.reference).or(Some(raw_id));

        ctx.accept(tender)
    }
}

/// Map a free-form status label onto [`TenderStatus`].
pub fn status_from_label(label: &str) -> TenderStatus {
    let label = label.to_lowercase();
    if ["award", "closed", "cancel", "complete", "expired", "withdrawn", "unsuccessful"]
        .iter()
        .any(|word| label.contains(word))
    {
        TenderStatus::Closed
    } else if ["pending", "evaluat", "planned", "planning", "forecast"]
        .iter()
        .any(|word| label.contains(word))
    {
        TenderStatus::Pending
    } else {
        TenderStatus::Active
    }
}

/// Resolve a dotted path such as `tender.value.amount`.
///
/// Numeric segments index arrays. A non-numeric segment applied to an array descends
/// into its first element.
pub fn json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| {
        match (current, segment.parse::<usize>()) {
            (Value::Array(items), Ok(index)) => items.get(index),
            (Value::Array(items), Err(_)) => items.first()?.get(segment),
            (Value::Object(map), _) => map.get(segment),
            _ => None,
        }
    })
}

/// Render a scalar (or an array of scalars) as trimmed text.
pub fn json_text(value: &Value) -> Option<String> {
    let rendered = match value {
        Value::String(s) => text::clean(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => items
            .iter()
            .filter_map(json_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Null | Value::Object(_) => return None,
    };
    if rendered.is_empty() {
        None
    } else {
        Some(rendered)
    }
}

/// Text at a dotted path.
pub fn json_str(value: &Value, path: &str) -> Option<String> {
    json_path(value, path).and_then(json_text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_path_descends_arrays() {
        let doc = json!({"a": {"b": [{"c": 1}, {"c": 2}]}});
        assert_eq!(json_path(&doc, "a.b.1.c"), Some(&json!(2)));
        assert_eq!(json_path(&doc, "a.b.c"), Some(&json!(1)));
        assert_eq!(json_path(&doc, "a.x"), None);
        assert_eq!(json_path(&doc, ""), Some(&doc));
    }

    #[test]
    fn test_json_text_joins_scalar_arrays() {
        assert_eq!(
            json_text(&json!(["Radar", "Défense"])),
            Some("Radar, Défense".to_string())
        );
        assert_eq!(json_text(&json!("  ")), None);
        assert_eq!(json_text(&json!(12.5)), Some("12.5".to_string()));
    }

    #[test]
    fn test_status_from_label() {
        assert_eq!(status_from_label("Awarded to Suppliers"), TenderStatus::Closed);
        assert_eq!(status_from_label("Under evaluation"), TenderStatus::Pending);
        assert_eq!(status_from_label("Open"), TenderStatus::Active);
    }

    #[test]
    fn test_accept_records_matched_keywords() {
        let ctx = SourceContext::new("Test", "Spain", "ES");
        let tender = ctx.blank_tender("ES-1".into(), "Ciberseguridad y radar".into());
        let accepted = ctx.accept(tender).unwrap();
        assert!(accepted.matched_keywords.contains(&"radar".to_string()));

        let tender = ctx.blank_tender("ES-2".into(), "Office chairs".into());
        assert!(ctx.accept(tender).is_none());
    }
}
