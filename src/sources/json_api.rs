//! Parser for ad-hoc JSON APIs described by a [`FieldMap`].

use serde_json::Value;

use super::{json_path, json_str, FieldMap, SourceContext, SourceError};
use crate::models::Tender;

/// Maps each element of a JSON array to a tender through dotted paths.
#[derive(Debug, Clone)]
pub struct JsonApiParser {
    /// Dotted path to the record array; empty when the body is the array itself.
    pub records_path: &'static str,
    pub fields: FieldMap,
}

impl JsonApiParser {
    pub fn new(records_path: &'static str, fields: FieldMap) -> Self {
        Self {
            records_path,
            fields,
        }
    }

    pub fn parse(&self, body: &str, ctx: &SourceContext) -> Result<Vec<Tender>, SourceError> {
        let doc: Value = serde_json::from_str(body)?;
        let records = json_path(&doc, self.records_path)
            .and_then(Value::as_array)
            .ok_or_else(|| {
                SourceError::Shape(format!("no record array at '{}'", self.records_path))
            })?;

        Ok(records
            .iter()
            .filter_map(|record| self.fields.build(|path| json_str(record, path), ctx))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn boamp_parser() -> JsonApiParser {
        JsonApiParser::new(
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
        )
    }

    fn ctx() -> SourceContext {
        SourceContext::new("BOAMP", "France", "FR").with_currency("EUR")
    }

    #[test]
    fn test_maps_boamp_records() {
        let body = json!({
            "total_count": 2,
            "results": [
                {
                    "idweb": "25-41234",
                    "objet": "Maintien en condition opérationnelle de drones tactiques",
                    "nomacheteur": "Direction générale de l'armement",
                    "descripteur_libelle": ["Défense", "Matériel aéronautique"],
                    "type_marche": ["FOURNITURES"],
                    "dateparution": "2025-05-01",
                    "datelimitereponse": "2025-06-15T12:00:00+02:00",
                    "url_avis": "https://www.boamp.fr/pages/avis/?q=idweb:25-41234"
                },
                {
                    "idweb": "25-41235",
                    "objet": "Restauration scolaire",
                    "nomacheteur": "Commune de Lyon"
                },
                {"idweb": "25-41236"}
            ]
        })
        .to_string();

        let tenders = boamp_parser().parse(&body, &ctx()).unwrap();
        assert_eq!(tenders.len(), 1);

        let tender = &tenders[0];
        assert_eq!(tender.id, "FR-25-41234");
        assert_eq!(tender.organization, "Direction générale de l'armement");
        assert_eq!(tender.description, "Défense, Matériel aéronautique");
        assert_eq!(tender.category, "FOURNITURES");
        assert_eq!(tender.deadline, NaiveDate::from_ymd_opt(2025, 6, 15));
        assert_eq!(tender.reference.as_deref(), Some("25-41234"));
        assert_eq!(tender.currency.as_deref(), Some("EUR"));
    }

    #[test]
    fn test_missing_record_array_is_an_error() {
        let err = boamp_parser().parse("{\"records\": []}", &ctx()).unwrap_err();
        assert!(matches!(err, SourceError::Shape(_)));
    }
}
