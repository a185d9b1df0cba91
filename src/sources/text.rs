//! Text cleanup shared by the parsers.

use std::sync::LazyLock;

use regex::Regex;

static CDATA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex"));

/// Unwrap CDATA, strip markup, decode entities and collapse whitespace.
pub fn clean(raw: &str) -> String {
    let unwrapped = CDATA_RE.replace_all(raw, "$1");
    // Entity-encoded HTML (common in RSS descriptions) must be decoded before stripping.
    let decoded = decode_entities(&unwrapped);
    let stripped = TAG_RE.replace_all(&decoded, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the predefined XML entities plus numeric character references.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }
    let numeric = NUMERIC_ENTITY_RE.replace_all(raw, |caps: &regex::Captures| {
        let code = &caps[1];
        let parsed = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse().ok(),
        };
        parsed
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Reduce an upstream identifier to a short id-safe token.
///
/// URLs keep their last path segment or query value. Other characters outside
/// `[A-Za-z0-9._-]` become `-`.
pub fn stable_id(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    let tail = if trimmed.contains("://") {
        trimmed
            .rsplit(&['/', '=', '?'][..])
            .find(|segment| !segment.is_empty())
            .unwrap_or(trimmed)
    } else {
        trimmed
    };
    tail.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Parse a money amount in either `1,234.56` or `1.234,56` notation.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let digits: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    if digits.is_empty() {
        return None;
    }

    let normalized = match (digits.rfind('.'), digits.rfind(',')) {
        // Both present: whichever comes last is the decimal separator.
        (Some(dot), Some(comma)) if comma > dot => digits.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => digits.replace(',', ""),
        // Comma alone with exactly two trailing digits reads as a decimal comma.
        (None, Some(comma)) if digits.len() - comma == 3 => digits.replace(',', "."),
        (None, Some(_)) => digits.replace(',', ""),
        _ => digits,
    };

    normalized.parse().ok().filter(|v: &f64| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_unwraps_cdata_and_markup() {
        assert_eq!(
            clean("<![CDATA[<p>Suministro de  <b>radar</b></p>]]>"),
            "Suministro de radar"
        );
        assert_eq!(clean("Caf&#233; &amp; t&#xE9;"), "Café & té");
        assert_eq!(clean("&lt;p&gt;Hello&lt;/p&gt;"), "Hello");
    }

    #[test]
    fn test_stable_id() {
        assert_eq!(
            stable_id("https://contrataciondelestado.es/wps/poc?uri=deeplink:detalle_licitacion&idEvl=AbC123"),
            "AbC123"
        );
        assert_eq!(stable_id("ocds-b5fd17-1234"), "ocds-b5fd17-1234");
        assert_eq!(stable_id("tender 42/2025"), "tender-42-2025");
    }

    #[test]
    fn test_parse_amount_notations() {
        assert_eq!(parse_amount("1,234.50"), Some(1234.5));
        assert_eq!(parse_amount("1.234,50 EUR"), Some(1234.5));
        assert_eq!(parse_amount("250000"), Some(250000.0));
        assert_eq!(parse_amount("$1,500,000"), Some(1_500_000.0));
        assert_eq!(parse_amount("n/a"), None);
    }
}
