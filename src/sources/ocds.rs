//! Open Contracting Data Standard (OCDS) parser.

use serde_json::Value;

use super::{dates::parse_date, json_path, json_str, SourceContext, SourceError};
use crate::models::{Tender, TenderStatus};

/// Parser for OCDS release packages, record packages and bare releases.
#[derive(Debug, Clone, Default)]
pub struct OcdsParser;

impl OcdsParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, body: &str, ctx: &SourceContext) -> Result<Vec<Tender>, SourceError> {
        let doc: Value = serde_json::from_str(body)?;
        let releases = releases_of(&doc)?;

        Ok(releases
            .into_iter()
            .filter_map(|release| self.parse_release(release, ctx))
            .collect())
    }

    fn parse_release(&self, release: &Value, ctx: &SourceContext) -> Option<Tender> {
        let tender_node = release.get("tender").unwrap_or(&Value::Null);

        let title = json_str(tender_node, "title").or_else(|| json_str(release, "title"))?;
        let raw_id = json_str(release, "ocid").or_else(|| json_str(release, "id"))?;

        let mut tender = ctx.blank_tender(ctx.record_id(&raw_id), title);
        tender.description = json_str(tender_node, "description")
            .or_else(|| json_str(release, "description"))
            .unwrap_or_default();
        tender.organization = buyer_name(release).unwrap_or_else(|| ctx.source.clone());

        let value = json_path(tender_node, "value")
            .filter(|v| v.is_object())
            .or_else(|| json_path(tender_node, "minValue"));
        if let Some(value) = value {
            tender.amount = value.get("amount").and_then(Value::as_f64);
            if let Some(currency) = json_str(value, "currency") {
                tender.currency = Some(currency);
            }
        }

        tender.publish_date = json_str(release, "date")
            .or_else(|| json_str(release, "publishedDate"))
            .or_else(|| json_str(tender_node, "datePublished"))
            .and_then(|raw| parse_date(&raw));
        tender.deadline = json_str(tender_node, "tenderPeriod.endDate").and_then(|raw| parse_date(&raw));

        if let Some(status) = json_str(tender_node, "status") {
            tender.status = ocds_status(&status);
        }

        if let Some(category) = json_str(tender_node, "mainProcurementCategory") {
            tender.category = category;
        }

        tender.cpv_codes = tender_node
            .get("items")
            .and_then(Value::as_array)
            .map(|items| {
                let mut codes: Vec<String> = items
                    .iter()
                    .filter_map(|item| json_str(item, "classification.id"))
                    .collect();
                codes.dedup();
                codes
            })
            .unwrap_or_default();

        tender.reference = json_str(tender_node, "id").or_else(|| Some(raw_id.clone()));
        tender.source_url = ctx
            .link_for(&raw_id)
            .or_else(|| json_str(tender_node, "documents.url"));

        ctx.accept(tender)
    }
}

fn releases_of(doc: &Value) -> Result<Vec<&Value>, SourceError> {
    if let Some(releases) = doc.get("releases").and_then(Value::as_array) {
        return Ok(releases.iter().collect());
    }

    if let Some(records) = doc.get("records").and_then(Value::as_array) {
        return Ok(records
            .iter()
            .filter_map(|record| {
                record
                    .get("compiledRelease")
                    .or_else(|| record.get("releases").and_then(|r| r.as_array()?.last()))
            })
            .collect());
    }

    if doc.get("tender").is_some() {
        return Ok(vec![doc]);
    }

    Err(SourceError::Shape(
        "expected an OCDS release package, record package or release".to_string(),
    ))
}

fn buyer_name(release: &Value) -> Option<String> {
    json_str(release, "buyer.name").or_else(|| {
        release
            .get("parties")?
            .as_array()?
            .iter()
            .find(|party| {
                party
                    .get("roles")
                    .and_then(Value::as_array)
                    .is_some_and(|roles| roles.iter().any(|r| r == "buyer" || r == "procuringEntity"))
            })
            .and_then(|party| json_str(party, "name"))
    })
}

fn ocds_status(status: &str) -> TenderStatus {
    match status {
        "active" => TenderStatus::Active,
        "planning" | "planned" => TenderStatus::Pending,
        "complete" | "cancelled" | "unsuccessful" | "withdrawn" => TenderStatus::Closed,
        _ => TenderStatus::Active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn package() -> String {
        json!({
            "uri": "https://www.contractsfinder.service.gov.uk/Published/Notices/OCDS/Search",
            "releases": [
                {
                    "ocid": "ocds-b5fd17-0a1b2c",
                    "id": "rel-1",
                    "date": "2025-04-10T09:00:00Z",
                    "buyer": {"name": "Defence Equipment and Support"},
                    "tender": {
                        "id": "DES-2025-0042",
                        "title": "Maritime radar maintenance",
                        "description": "Through-life support for naval radar systems",
                        "status": "active",
                        "value": {"amount": 2500000.0, "currency": "GBP"},
                        "tenderPeriod": {"endDate": "2025-07-01T12:00:00Z"},
                        "items": [
                            {"classification": {"scheme": "CPV", "id": "50660000"}},
                            {"classification": {"scheme": "CPV", "id": "50660000"}}
                        ]
                    }
                },
                {
                    "ocid": "ocds-b5fd17-0a1b2d",
                    "tender": {"title": "Grounds maintenance", "status": "active"}
                },
                {
                    "ocid": "ocds-b5fd17-0a1b2e",
                    "parties": [{"name": "Home Office", "roles": ["buyer"]}],
                    "tender": {
                        "title": "Cyber threat intelligence platform",
                        "status": "complete"
                    }
                }
            ]
        })
        .to_string()
    }

    fn ctx() -> SourceContext {
        SourceContext::new("Contracts Finder", "UK", "UK")
            .with_currency("GBP")
            .with_link_template("https://www.contractsfinder.service.gov.uk/Notice/{id}")
    }

    #[test]
    fn test_parses_release_package() {
        let tenders = OcdsParser::new().parse(&package(), &ctx()).unwrap();
        assert_eq!(tenders.len(), 2);

        let radar = &tenders[0];
        assert_eq!(radar.id, "UK-ocds-b5fd17-0a1b2c");
        assert_eq!(radar.organization, "Defence Equipment and Support");
        assert_eq!(radar.amount, Some(2_500_000.0));
        assert_eq!(radar.currency.as_deref(), Some("GBP"));
        assert_eq!(radar.deadline, NaiveDate::from_ymd_opt(2025, 7, 1));
        assert_eq!(radar.publish_date, NaiveDate::from_ymd_opt(2025, 4, 10));
        assert_eq!(radar.cpv_codes, vec!["50660000".to_string()]);
        assert_eq!(radar.reference.as_deref(), Some("DES-2025-0042"));
        assert_eq!(
            radar.source_url.as_deref(),
            Some("https://www.contractsfinder.service.gov.uk/Notice/ocds-b5fd17-0a1b2c")
        );

        let cyber = &tenders[1];
        assert_eq!(cyber.organization, "Home Office");
        assert_eq!(cyber.status, TenderStatus::Closed);
    }

    #[test]
    fn test_parses_record_package() {
        let body = json!({
            "records": [{
                "ocid": "ocds-abc-1",
                "compiledRelease": {
                    "ocid": "ocds-abc-1",
                    "tender": {"title": "Defence logistics support", "status": "planning"}
                }
            }]
        })
        .to_string();
        let tenders = OcdsParser::new().parse(&body, &ctx()).unwrap();
        assert_eq!(tenders.len(), 1);
        assert_eq!(tenders[0].status, TenderStatus::Pending);
    }

    #[test]
    fn test_rejects_unknown_shape_and_bad_json() {
        assert!(OcdsParser::new().parse("{\"foo\": 1}", &ctx()).is_err());
        assert!(OcdsParser::new().parse("<xml/>", &ctx()).is_err());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let body = package();
        let parser = OcdsParser::new();
        assert_eq!(
            parser.parse(&body, &ctx()).unwrap(),
            parser.parse(&body, &ctx()).unwrap()
        );
    }
}
