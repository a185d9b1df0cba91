//! Atom and RSS feed parser.
//!
//! Government portals publish feeds with namespaced extensions (PLACSP's CODICE
//! `cbc:`/`cac:` elements, for instance). Elements are matched by local name so the
//! prefix does not matter.

use std::sync::LazyLock;

use regex::Regex;

use super::{dates::parse_date, text, SourceContext, SourceError};
use crate::models::{Tender, TenderStatus};

fn element(name: &str) -> Regex {
    Regex::new(&format!(
        r"(?s)<(?:[A-Za-z0-9_-]+:)?{name}(?:\s[^>]*)?>(.*?)</(?:[A-Za-z0-9_-]+:)?{name}\s*>"
    ))
    .expect("valid element regex")
}

struct Patterns {
    entry: Regex,
    title: Regex,
    id: Regex,
    guid: Regex,
    link_href: Regex,
    link_text: Regex,
    summary: Regex,
    description: Regex,
    content: Regex,
    updated: Regex,
    published: Regex,
    pub_date: Regex,
    category_term: Regex,
    category_text: Regex,
    party_name: Regex,
    name: Regex,
    amount: Regex,
    currency_attr: Regex,
    end_date: Regex,
    folder_status: Regex,
    folder_id: Regex,
    classification: Regex,
}

static PATTERNS: LazyLock<Patterns> = LazyLock::new(|| Patterns {
    entry: Regex::new(r"(?s)<(?:entry|item)(?:\s[^>]*)?>(.*?)</(?:entry|item)\s*>")
        .expect("valid entry regex"),
    title: element("title"),
    id: element("id"),
    guid: element("guid"),
    link_href: Regex::new(r#"<(?:[A-Za-z0-9_-]+:)?link\b[^>]*\bhref\s*=\s*"([^"]*)""#)
        .expect("valid link regex"),
    link_text: element("link"),
    summary: element("summary"),
    description: element("description"),
    content: element("content"),
    updated: element("updated"),
    published: element("published"),
    pub_date: element("pubDate"),
    category_term: Regex::new(r#"<category\b[^>]*\bterm\s*=\s*"([^"]*)""#)
        .expect("valid category regex"),
    category_text: element("category"),
    party_name: element("PartyName"),
    name: element("Name"),
    amount: Regex::new(
        r"(?s)<(?:[A-Za-z0-9_-]+:)?(?:EstimatedOverallContractAmount|TotalAmount|TaxExclusiveAmount)(\s[^>]*)?>([^<]*)<",
    )
    .expect("valid amount regex"),
    currency_attr: Regex::new(r#"currencyID\s*=\s*"([^"]+)""#).expect("valid currency regex"),
    end_date: element("EndDate"),
    folder_status: element("ContractFolderStatusCode"),
    folder_id: element("ContractFolderID"),
    classification: element("ItemClassificationCode"),
});

fn first<'a>(re: &Regex, block: &'a str) -> Option<&'a str> {
    re.captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn first_clean(re: &Regex, block: &str) -> Option<String> {
    first(re, block)
        .map(text::clean)
        .filter(|value| !value.is_empty())
}

/// Parser for Atom (`<entry>`) and RSS 2.0 (`<item>`) feeds.
#[derive(Debug, Clone, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, body: &str, ctx: &SourceContext) -> Result<Vec<Tender>, SourceError> {
        let trimmed = body.trim_start_matches('\u{feff}').trim_start();
        if !trimmed.starts_with('<') {
            return Err(SourceError::Shape("feed body is not XML".to_string()));
        }

        let tenders = PATTERNS
            .entry
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .filter_map(|block| self.parse_entry(block.as_str(), ctx))
            .collect();

        Ok(tenders)
    }

    fn parse_entry(&self, block: &str, ctx: &SourceContext) -> Option<Tender> {
        let p = &*PATTERNS;

        let title = first_clean(&p.title, block)?;
        let link = first(&p.link_href, block)
            .map(text::decode_entities)
            .or_else(|| first_clean(&p.link_text, block));
        let raw_id = first_clean(&p.id, block)
            .or_else(|| first_clean(&p.guid, block))
            .or_else(|| link.clone())?;

        let mut tender = ctx.blank_tender(ctx.record_id(&raw_id), title);

        tender.description = first_clean(&p.summary, block)
            .or_else(|| first_clean(&p.description, block))
            .or_else(|| first_clean(&p.content, block))
            .unwrap_or_default();

        if let Some(party) = first(&p.party_name, block) {
            if let Some(name) = first_clean(&p.name, party) {
                tender.organization = name;
            }
        }
        if tender.organization.is_empty() {
            tender.organization = ctx.source.clone();
        }

        if let Some(category) = first(&p.category_term, block)
            .map(text::clean)
            .or_else(|| first_clean(&p.category_text, block))
            .filter(|c| !c.is_empty())
        {
            tender.category = category;
        }

        if let Some(caps) = p.amount.captures(block) {
            tender.amount = caps.get(2).and_then(|m| text::parse_amount(m.as_str()));
            if let Some(currency) = caps
                .get(1)
                .and_then(|attrs| first(&p.currency_attr, attrs.as_str()))
            {
                tender.currency = Some(currency.to_string());
            }
        }

        tender.publish_date = first(&p.published, block)
            .or_else(|| first(&p.pub_date, block))
            .or_else(|| first(&p.updated, block))
            .and_then(parse_date);
        tender.deadline = first(&p.end_date, block).and_then(parse_date);

        if let Some(code) = first_clean(&p.folder_status, block) {
            tender.status = placsp_status(&code);
        }

        tender.reference = first_clean(&p.folder_id, block).or_else(|| Some(raw_id.clone()));
        tender.cpv_codes = p
            .classification
            .captures_iter(block)
            .filter_map(|caps| caps.get(1))
            .map(|m| text::clean(m.as_str()))
            .filter(|code| !code.is_empty())
            .collect();
        tender.source_url = link.or_else(|| ctx.link_for(&raw_id));

        ctx.accept(tender)
    }
}

/// CODICE `ContractFolderStatusCode` values.
fn placsp_status(code: &str) -> TenderStatus {
    match code.trim().to_ascii_uppercase().as_str() {
        "PUB" => TenderStatus::Active,
        "PRE" | "EV" => TenderStatus::Pending,
        "ADJ" | "RES" | "ANUL" => TenderStatus::Closed,
        _ => TenderStatus::Active,
    }
}
