//! Delimited-text parser for open-data tender exports.

use std::collections::HashMap;
use std::mem::take;

use super::{text, FieldMap, SourceContext, SourceError};
use crate::models::Tender;

/// Maps CSV rows to tenders by header name.
#[derive(Debug, Clone)]
pub struct CsvParser {
    pub delimiter: char,
    pub fields: FieldMap,
}

impl CsvParser {
    pub fn new(fields: FieldMap) -> Self {
        Self {
            delimiter: ',',
            fields,
        }
    }

    pub fn parse(&self, body: &str, ctx: &SourceContext) -> Result<Vec<Tender>, SourceError> {
        let body = body.trim_start_matches('\u{feff}');
        let mut rows = parse_rows(body, self.delimiter).into_iter();

        let header = rows
            .next()
            .ok_or_else(|| SourceError::Shape("empty CSV document".to_string()))?;
        let columns: HashMap<String, usize> = header
            .iter()
            .enumerate()
            .map(|(index, name)| (name.trim().to_string(), index))
            .collect();

        for required in [self.fields.id, self.fields.title] {
            if !columns.contains_key(required) {
                return Err(SourceError::Shape(format!("missing CSV column '{required}'")));
            }
        }

        Ok(rows
            .filter_map(|row| {
                let lookup = |name: &str| {
                    columns
                        .get(name)
                        .and_then(|&index| row.get(index))
                        .map(|cell| text::clean(cell))
                        .filter(|cell| !cell.is_empty())
                };
                self.fields.build(lookup, ctx)
            })
            .collect())
    }
}

/// Split delimited text into rows, honouring quotes, doubled-quote escapes and CRLF.
fn parse_rows(text: &str, sep: char) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut field = String::new();
    let mut row = Vec::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes => {
                if matches!(chars.peek(), Some('"')) {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            c if c == sep && !in_quotes => row.push(take(&mut field)),
            '\n' | '\r' if !in_quotes => {
                if ch == '\r' && matches!(chars.peek(), Some('\n')) {
                    chars.next();
                }
                row.push(take(&mut field));
                if !(row.len() == 1 && row[0].is_empty()) {
                    rows.push(take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => field.push(ch),
        }
    }

    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const CANADA_CSV: &str = "\u{feff}title-titre-eng,referenceNumber-numeroReference,contractingEntityName-nomEntitContractante-eng,tenderClosingDate-appelOffresDateCloture,noticeURL-URLavis-eng\r\n\
\"Radar Systems, Sustainment\",PW-25-001,Department of National Defence,2025-08-01T14:00:00,https://canadabuys.canada.ca/en/tender-opportunities/tender-notice/pw-25-001\r\n\
Janitorial services,PW-25-002,Public Services and Procurement Canada,2025-08-02T14:00:00,\r\n\
\"Cyber \"\"red team\"\" assessment\",PW-25-003,Communications Security Establishment,,\r\n";

    fn parser() -> CsvParser {
        CsvParser::new(FieldMap {
            id: "referenceNumber-numeroReference",
            title: "title-titre-eng",
            organization: Some("contractingEntityName-nomEntitContractante-eng"),
            deadline: Some("tenderClosingDate-appelOffresDateCloture"),
            url: Some("noticeURL-URLavis-eng"),
            ..Default::default()
        })
    }

    #[test]
    fn test_parse_rows_handles_quotes() {
        let rows = parse_rows("a,\"b,c\",\"d \"\"e\"\"\"\n1,2,3", ',');
        assert_eq!(rows, vec![vec!["a", "b,c", "d \"e\""], vec!["1", "2", "3"]]);
    }

    #[test]
    fn test_maps_canadabuys_rows() {
        let ctx = SourceContext::new("CanadaBuys", "Canada", "CA").with_currency("CAD");
        let tenders = parser().parse(CANADA_CSV, &ctx).unwrap();
        assert_eq!(tenders.len(), 2);

        assert_eq!(tenders[0].id, "CA-PW-25-001");
        assert_eq!(tenders[0].title, "Radar Systems, Sustainment");
        assert_eq!(tenders[0].organization, "Department of National Defence");
        assert_eq!(tenders[0].deadline, NaiveDate::from_ymd_opt(2025, 8, 1));

        assert_eq!(tenders[1].title, "Cyber \"red team\" assessment");
        assert_eq!(tenders[1].deadline, None);
        assert_eq!(tenders[1].source_url, None);
    }

    #[test]
    fn test_missing_columns_is_an_error() {
        let ctx = SourceContext::new("CanadaBuys", "Canada", "CA");
        assert!(parser().parse("foo,bar\n1,2\n", &ctx).is_err());
        assert!(parser().parse("", &ctx).is_err());
    }
}
