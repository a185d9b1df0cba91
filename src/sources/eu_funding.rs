//! EU Funding & Tenders portal (SEDIA search API) response parser.

use serde_json::Value;

use super::{dates::parse_date, json_str, text, SourceError};
use crate::models::{Grant, GrantSource, GrantStatus};

const TOPIC_URL: &str =
    "https://ec.europa.eu/info/funding-tenders/opportunities/portal/screen/opportunities/topic-details/";

pub fn parse_eu_funding(body: &str) -> Result<Vec<Grant>, SourceError> {
    let doc: Value = serde_json::from_str(body)?;
    let results = doc
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::Shape("missing results".to_string()))?;

    Ok(results.iter().filter_map(parse_result).collect())
}

fn parse_result(result: &Value) -> Option<Grant> {
    // Metadata values are single-element arrays.
    let meta = |key: &str| json_str(result, &format!("metadata.{key}.0"));

    let identifier = meta("identifier").or_else(|| json_str(result, "reference"))?;
    let title = meta("title")
        .or_else(|| json_str(result, "title"))
        .or_else(|| meta("callTitle"))?;

    let agency = if identifier.starts_with("EDF") {
        "European Defence Fund"
    } else {
        "European Commission"
    };

    Some(Grant {
        id: format!("EU-{}", text::stable_id(&identifier)),
        title,
        agency: agency.to_string(),
        opportunity_number: Some(identifier.clone()),
        funding_instrument: meta("typesOfAction"),
        eligibility: None,
        category: meta("callTitle"),
        award_ceiling: None,
        award_floor: None,
        currency: "EUR".to_string(),
        posted_date: meta("startDate").and_then(|raw| parse_date(&raw)),
        close_date: meta("deadlineDate").and_then(|raw| parse_date(&raw)),
        description: json_str(result, "summary")
            .or_else(|| json_str(result, "content"))
            .or_else(|| meta("descriptionByte"))
            .unwrap_or_default(),
        url: json_str(result, "url")
            .filter(|url| url.starts_with("http"))
            .or_else(|| Some(format!("{TOPIC_URL}{}", identifier.to_lowercase()))),
        status: meta("status")
            .and_then(|status| GrantStatus::parse(&status))
            .unwrap_or(GrantStatus::Posted),
        source: GrantSource::EuFunding,
        country: "EU".to_string(),
    })
}
