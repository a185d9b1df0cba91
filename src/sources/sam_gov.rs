//! SAM.gov opportunities (v2 search) response parser.

use serde_json::Value;

use super::{dates::parse_us_date, json_str, text, SourceError};
use crate::models::{Grant, GrantSource, GrantStatus};

pub fn parse_sam_gov(body: &str) -> Result<Vec<Grant>, SourceError> {
    let doc: Value = serde_json::from_str(body)?;

    let opportunities = doc
        .get("opportunitiesData")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            let detail = json_str(&doc, "error.message")
                .or_else(|| json_str(&doc, "message"))
                .unwrap_or_else(|| "missing opportunitiesData".to_string());
            SourceError::Shape(detail)
        })?;

    Ok(opportunities.iter().filter_map(parse_opportunity).collect())
}

fn parse_opportunity(opp: &Value) -> Option<Grant> {
    let notice_id = json_str(opp, "noticeId")?;
    let title = json_str(opp, "title")?;

    // "DEPT OF DEFENSE.DEPT OF THE ARMY.AMC" -> department first
    let agency = json_str(opp, "fullParentPathName")
        .or_else(|| json_str(opp, "department"))
        .map(|path| path.split('.').next().unwrap_or_default().trim().to_string())
        .filter(|agency| !agency.is_empty())
        .unwrap_or_else(|| "SAM.gov".to_string());

    let notice_type = json_str(opp, "type");
    let naics = json_str(opp, "naicsCode");
    let description = match (&notice_type, &naics) {
        (Some(kind), Some(code)) => format!("{kind} notice, NAICS {code}"),
        (Some(kind), None) => format!("{kind} notice"),
        (None, Some(code)) => format!("NAICS {code}"),
        (None, None) => String::new(),
    };

    let status = match json_str(opp, "active").as_deref() {
        Some("No") => GrantStatus::Closed,
        _ => GrantStatus::Posted,
    };

    Some(Grant {
        id: format!("SAM-{}", text::stable_id(&notice_id)),
        title,
        agency,
        opportunity_number: json_str(opp, "solicitationNumber"),
        funding_instrument: notice_type,
        eligibility: json_str(opp, "typeOfSetAsideDescription"),
        category: naics.map(|code| format!("NAICS {code}")),
        award_ceiling: json_str(opp, "award.amount").and_then(|raw| text::parse_amount(&raw)),
        award_floor: None,
        currency: "USD".to_string(),
        posted_date: json_str(opp, "postedDate").and_then(|raw| parse_us_date(&raw)),
        close_date: json_str(opp, "responseDeadLine").and_then(|raw| parse_us_date(&raw)),
        description,
        url: json_str(opp, "uiLink")
            .or_else(|| Some(format!("https://sam.gov/opp/{notice_id}/view"))),
        status,
        source: GrantSource::SamGov,
        country: "USA".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn test_parses_opportunities() {
        let body = json!({
            "totalRecords": 1,
            "opportunitiesData": [{
                "noticeId": "a1b2c3",
                "title": "Counter-UAS Prototype Development",
                "solicitationNumber": "HQ0034-25-R-0101",
                "fullParentPathName": "DEPT OF DEFENSE.DEFENSE INNOVATION UNIT",
                "postedDate": "2025-05-01",
                "type": "Solicitation",
                "responseDeadLine": "2025-06-15T17:00:00-04:00",
                "naicsCode": "541715",
                "active": "Yes",
                "typeOfSetAsideDescription": "Total Small Business Set-Aside",
                "uiLink": "https://sam.gov/opp/a1b2c3/view"
            }]
        })
        .to_string();

        let grants = parse_sam_gov(&body).unwrap();
        assert_eq!(grants.len(), 1);

        let grant = &grants[0];
        assert_eq!(grant.id, "SAM-a1b2c3");
        assert_eq!(grant.agency, "DEPT OF DEFENSE");
        assert_eq!(grant.description, "Solicitation notice, NAICS 541715");
        assert_eq!(grant.posted_date, NaiveDate::from_ymd_opt(2025, 5, 1));
        assert_eq!(grant.close_date, NaiveDate::from_ymd_opt(2025, 6, 15));
        assert_eq!(grant.status, GrantStatus::Posted);
        assert_eq!(grant.source, GrantSource::SamGov);
    }

    #[test]
    fn test_api_error_is_reported() {
        let body = json!({"error": {"code": "API_KEY_INVALID", "message": "An invalid api_key was supplied"}}).to_string();
        let err = parse_sam_gov(&body).unwrap_err();
        assert!(err.to_string().contains("invalid api_key"));
    }
}
