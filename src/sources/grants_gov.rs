//! Grants.gov `search2` response parser.

use serde_json::Value;

use super::{dates::parse_us_date, json_path, json_str, text, SourceError};
use crate::models::{Grant, GrantSource, GrantStatus};

const DETAIL_URL: &str = "https://www.grants.gov/search-results-detail/";

pub fn parse_grants_gov(body: &str) -> Result<Vec<Grant>, SourceError> {
    let doc: Value = serde_json::from_str(body)?;

    if let Some(code) = doc.get("errorcode").and_then(Value::as_i64) {
        if code != 0 {
            let msg = json_str(&doc, "msg").unwrap_or_default();
            return Err(SourceError::Shape(format!("grants.gov error {code}: {msg}")));
        }
    }

    let hits = json_path(&doc, "data.oppHits")
        .or_else(|| json_path(&doc, "oppHits"))
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::Shape("missing data.oppHits".to_string()))?;

    Ok(hits.iter().filter_map(parse_hit).collect())
}

fn parse_hit(hit: &Value) -> Option<Grant> {
    let raw_id = json_str(hit, "id")?;
    let title = json_str(hit, "title")?;

    Some(Grant {
        id: format!("GG-{}", text::stable_id(&raw_id)),
        title,
        agency: json_str(hit, "agencyName")
            .or_else(|| json_str(hit, "agency"))
            .or_else(|| json_str(hit, "agencyCode"))
            .unwrap_or_else(|| "Grants.gov".to_string()),
        opportunity_number: json_str(hit, "number"),
        funding_instrument: json_str(hit, "docType"),
        eligibility: None,
        category: json_str(hit, "cfdaList").map(|cfda| format!("CFDA {cfda}")),
        award_ceiling: None,
        award_floor: None,
        currency: "USD".to_string(),
        posted_date: json_str(hit, "openDate").and_then(|raw| parse_us_date(&raw)),
        close_date: json_str(hit, "closeDate").and_then(|raw| parse_us_date(&raw)),
        description: String::new(),
        url: Some(format!("{DETAIL_URL}{raw_id}")),
        status: json_str(hit, "oppStatus")
            .and_then(|status| GrantStatus::parse(&status))
            .unwrap_or(GrantStatus::Posted),
        source: GrantSource::GrantsGov,
        country: "USA".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_parses_opp_hits() {
        let body = json!({
            "errorcode": 0,
            "msg": "Webservice Succeeds",
            "data": {
                "hitCount": 2,
                "oppHits": [
                    {
                        "id": "358112",
                        "number": "W911NF-25-S-0003",
                        "title": "Army Research Office Broad Agency Announcement",
                        "agencyCode": "DOD-AMC-ACCAPGN",
                        "agency": "Dept. of the Army -- Materiel Command",
                        "openDate": "01/15/2025",
                        "closeDate": "09/30/2025",
                        "oppStatus": "posted",
                        "docType": "synopsis",
                        "cfdaList": ["12.431"]
                    },
                    {"id": "358113"}
                ]
            }
        })
        .to_string();

        let grants = parse_grants_gov(&body).unwrap();
        assert_eq!(grants.len(), 1);

        let grant = &grants[0];
        assert_eq!(grant.id, "GG-358112");
        assert_eq!(grant.agency, "Dept. of the Army -- Materiel Command");
        assert_eq!(grant.opportunity_number.as_deref(), Some("W911NF-25-S-0003"));
        assert_eq!(grant.category.as_deref(), Some("CFDA 12.431"));
        assert_eq!(grant.posted_date, NaiveDate::from_ymd_opt(2025, 1, 15));
        assert_eq!(grant.close_date, NaiveDate::from_ymd_opt(2025, 9, 30));
        assert_eq!(grant.status, GrantStatus::Posted);
        assert_eq!(
            grant.url.as_deref(),
            Some("https://www.grants.gov/search-results-detail/358112")
        );
    }

    #[test]
    fn test_error_code_is_reported() {
        let body = json!({"errorcode": 7, "msg": "bad request"}).to_string();
        assert!(parse_grants_gov(&body).is_err());
    }
}
