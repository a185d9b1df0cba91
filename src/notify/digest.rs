//! Plain-text and HTML rendering of alert digests.

use std::fmt::Write;

use crate::models::Tender;

/// Tenders listed in one digest; the rest are summarized by count.
const MAX_DIGEST_ITEMS: usize = 50;

#[derive(Debug, Clone)]
pub struct Digest {
    pub subject: String,
    pub text: String,
    pub html: String,
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn amount_label(tender: &Tender) -> Option<String> {
    let amount = tender.amount?;
    Some(match &tender.currency {
        Some(currency) => format!("{:.0} {}", amount, currency),
        None => format!("{:.0}", amount),
    })
}

fn deadline_label(tender: &Tender) -> String {
    tender
        .deadline
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "open-ended".to_string())
}

/// Render a digest of `tenders` for the alert named `alert_name`.
pub fn render_digest(alert_name: &str, tenders: &[Tender]) -> Digest {
    let subject = match tenders.len() {
        0 => format!("ArquiAlert: no new tenders for \"{}\"", alert_name),
        1 => format!("ArquiAlert: 1 tender matches \"{}\"", alert_name),
        n => format!("ArquiAlert: {} tenders match \"{}\"", n, alert_name),
    };

    let shown = &tenders[..tenders.len().min(MAX_DIGEST_ITEMS)];
    let hidden = tenders.len() - shown.len();

    let mut text = format!("{}\n\n", subject);
    let mut html = format!(
        "<html><body><h2>{}</h2>",
        escape_html(&subject)
    );

    if tenders.is_empty() {
        text.push_str("No open tenders currently match this alert.\n");
        html.push_str("<p>No open tenders currently match this alert.</p>");
    } else {
        html.push_str("<ul>");
    }

    for tender in shown {
        let _ = writeln!(text, "- {} ({}, {})", tender.title, tender.organization, tender.country);
        let _ = writeln!(text, "  Deadline: {}", deadline_label(tender));
        if let Some(amount) = amount_label(tender) {
            let _ = writeln!(text, "  Amount: {}", amount);
        }
        if let Some(url) = &tender.source_url {
            let _ = writeln!(text, "  {}", url);
        }
        text.push('\n');

        let title = match &tender.source_url {
            Some(url) => format!(
                "<a href=\"{}\">{}</a>",
                escape_html(url),
                escape_html(&tender.title)
            ),
            None => escape_html(&tender.title),
        };
        let _ = write!(
            html,
            "<li><strong>{}</strong><br>{} &middot; {} &middot; deadline {}",
            title,
            escape_html(&tender.organization),
            escape_html(&tender.country),
            deadline_label(tender)
        );
        if let Some(amount) = amount_label(tender) {
            let _ = write!(html, " &middot; {}", escape_html(&amount));
        }
        html.push_str("</li>");
    }

    if !tenders.is_empty() {
        html.push_str("</ul>");
    }
    if hidden > 0 {
        let _ = writeln!(text, "...and {} more on the dashboard.", hidden);
        let _ = write!(html, "<p>...and {} more on the dashboard.</p>", hidden);
    }
    html.push_str("</body></html>");

    Digest {
        subject,
        text,
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TenderOrigin, TenderStatus};
    use chrono::NaiveDate;

    fn tender(title: &str) -> Tender {
        Tender {
            id: title.into(),
            title: title.into(),
            organization: "Ministerio de Defensa".into(),
            country: "Spain".into(),
            category: "Defense".into(),
            amount: Some(1_250_000.0),
            currency: Some("EUR".into()),
            publish_date: None,
            deadline: NaiveDate::from_ymd_opt(2025, 6, 30),
            description: String::new(),
            source_url: Some("https://contrataciondelestado.es/x?a=1&b=2".into()),
            status: TenderStatus::Active,
            origin: TenderOrigin::Automatic,
            source: "PLACSP".into(),
            reference: None,
            cpv_codes: Vec::new(),
            matched_keywords: Vec::new(),
        }
    }

    #[test]
    fn test_digest_lists_tenders() {
        let digest = render_digest("Radar ES", &[tender("Radar <costero>")]);
        assert_eq!(digest.subject, "ArquiAlert: 1 tender matches \"Radar ES\"");
        assert!(digest.text.contains("- Radar <costero> (Ministerio de Defensa, Spain)"));
        assert!(digest.text.contains("Deadline: 2025-06-30"));
        assert!(digest.text.contains("Amount: 1250000 EUR"));
        assert!(digest.html.contains("Radar &lt;costero&gt;"));
        assert!(digest.html.contains("a=1&amp;b=2"));
    }

    #[test]
    fn test_empty_digest() {
        let digest = render_digest("Nothing", &[]);
        assert!(digest.subject.contains("no new tenders"));
        assert!(digest.text.contains("No open tenders"));
        assert!(!digest.html.contains("<ul>"));
    }

    #[test]
    fn test_long_digest_is_truncated() {
        let tenders: Vec<Tender> = (0..60).map(|i| tender(&format!("Radar {i}"))).collect();
        let digest = render_digest("Many", &tenders);
        assert!(digest.text.contains("...and 10 more"));
        assert!(!digest.text.contains("Radar 55"));
    }
}
