//! Static sample records served when an upstream stays unavailable.
//!
//! Deadlines are offsets from `today` so the samples survive the open-tender filter.

use chrono::{Days, NaiveDate};

use crate::models::{Grant, GrantSource, GrantStatus, Tender, TenderOrigin, TenderStatus};

struct SampleTender {
    id: &'static str,
    title: &'static str,
    organization: &'static str,
    category: &'static str,
    amount: f64,
    currency: &'static str,
    days_open: u64,
    description: &'static str,
    url: &'static str,
}

struct SampleGrant {
    id: &'static str,
    title: &'static str,
    agency: &'static str,
    number: &'static str,
    instrument: &'static str,
    ceiling: Option<f64>,
    days_open: u64,
    description: &'static str,
    url: &'static str,
}

const SPAIN: &[SampleTender] = &[
    SampleTender {
        id: "ES-SAMPLE-001",
        title: "Suministro de sistemas de radar de vigilancia costera",
        organization: "Ministerio de Defensa",
        category: "Defense",
        amount: 4_500_000.0,
        currency: "EUR",
        days_open: 30,
        description: "Adquisición y mantenimiento de radares para vigilancia marítima.",
        url: "https://contrataciondelestado.es",
    },
    SampleTender {
        id: "ES-SAMPLE-002",
        title: "Servicios de ciberseguridad para infraestructuras críticas",
        organization: "Centro Criptológico Nacional",
        category: "Cybersecurity",
        amount: 1_200_000.0,
        currency: "EUR",
        days_open: 45,
        description: "Auditoría y respuesta a incidentes de ciberseguridad.",
        url: "https://contrataciondelestado.es",
    },
];

const UK: &[SampleTender] = &[
    SampleTender {
        id: "UK-SAMPLE-001",
        title: "Defence Digital secure communications framework",
        organization: "Ministry of Defence",
        category: "Defense",
        amount: 12_000_000.0,
        currency: "GBP",
        days_open: 40,
        description: "Framework for tactical secure communications equipment.",
        url: "https://www.contractsfinder.service.gov.uk",
    },
    SampleTender {
        id: "UK-SAMPLE-002",
        title: "Cyber security operations centre support",
        organization: "Defence Equipment and Support",
        category: "Cybersecurity",
        amount: 2_750_000.0,
        currency: "GBP",
        days_open: 25,
        description: "Managed security monitoring for defence networks.",
        url: "https://www.find-tender.service.gov.uk",
    },
];

const FRANCE: &[SampleTender] = &[SampleTender {
    id: "FR-SAMPLE-001",
    title: "Maintien en condition opérationnelle de drones de surveillance",
    organization: "Direction générale de l'armement",
    category: "Defense",
    amount: 3_800_000.0,
    currency: "EUR",
    days_open: 35,
    description: "Soutien logistique et pièces détachées pour drones militaires.",
    url: "https://www.boamp.fr",
}];

const CANADA: &[SampleTender] = &[SampleTender {
    id: "CA-SAMPLE-001",
    title: "Arctic surveillance radar sustainment",
    organization: "Department of National Defence",
    category: "Defense",
    amount: 8_200_000.0,
    currency: "CAD",
    days_open: 50,
    description: "In-service support for northern radar installations.",
    url: "https://canadabuys.canada.ca",
}];

const AUSTRALIA: &[SampleTender] = &[SampleTender {
    id: "AU-SAMPLE-001",
    title: "Electronic warfare test range services",
    organization: "Department of Defence",
    category: "Defense",
    amount: 6_400_000.0,
    currency: "AUD",
    days_open: 28,
    description: "Operation of an electronic warfare and sensor test range.",
    url: "https://www.tenders.gov.au",
}];

const NEW_ZEALAND: &[SampleTender] = &[SampleTender {
    id: "NZ-SAMPLE-001",
    title: "Naval communications security upgrade",
    organization: "New Zealand Defence Force",
    category: "Defense",
    amount: 950_000.0,
    currency: "NZD",
    days_open: 21,
    description: "Encryption equipment refresh for naval vessels.",
    url: "https://www.gets.govt.nz",
}];

const SINGAPORE: &[SampleTender] = &[SampleTender {
    id: "SG-SAMPLE-001",
    title: "Cybersecurity monitoring for defence networks",
    organization: "Defence Science and Technology Agency",
    category: "Cybersecurity",
    amount: 2_100_000.0,
    currency: "SGD",
    days_open: 30,
    description: "Round-the-clock monitoring and threat hunting services.",
    url: "https://www.gebiz.gov.sg",
}];

const GRANTS_GOV: &[SampleGrant] = &[
    SampleGrant {
        id: "GG-SAMPLE-001",
        title: "Defense University Research Instrumentation Program",
        agency: "Department of Defense",
        number: "W911NF-SAMPLE-DURIP",
        instrument: "Grant",
        ceiling: Some(1_500_000.0),
        days_open: 60,
        description: "Equipment grants supporting defense-relevant university research.",
        url: "https://www.grants.gov",
    },
    SampleGrant {
        id: "GG-SAMPLE-002",
        title: "Cybersecurity Workforce Development Grants",
        agency: "Department of Homeland Security",
        number: "DHS-SAMPLE-CYBER",
        instrument: "Cooperative Agreement",
        ceiling: Some(750_000.0),
        days_open: 45,
        description: "Training programs for critical infrastructure cyber defense.",
        url: "https://www.grants.gov",
    },
];

const SAM_GOV: &[SampleGrant] = &[SampleGrant {
    id: "SAM-SAMPLE-001",
    title: "Counter-UAS Rapid Prototyping",
    agency: "DEPT OF DEFENSE",
    number: "HQ0034-SAMPLE-CUAS",
    instrument: "Solicitation",
    ceiling: None,
    days_open: 30,
    description: "Prototype counter unmanned aircraft systems for base defense.",
    url: "https://sam.gov",
}];

const EU_FUNDING: &[SampleGrant] = &[SampleGrant {
    id: "EU-SAMPLE-EDF-001",
    title: "European Defence Fund: space-based early warning",
    agency: "European Defence Fund",
    number: "EDF-SAMPLE-SPACE",
    instrument: "EDF Development Actions",
    ceiling: Some(25_000_000.0),
    days_open: 90,
    description: "Collaborative development of space-based missile early warning.",
    url: "https://ec.europa.eu/info/funding-tenders/opportunities/portal",
}];

fn samples_for(country: &str) -> &'static [SampleTender] {
    match country {
        "Spain" => SPAIN,
        "UK" => UK,
        "France" => FRANCE,
        "Canada" => CANADA,
        "Australia" => AUSTRALIA,
        "New Zealand" => NEW_ZEALAND,
        "Singapore" => SINGAPORE,
        _ => &[],
    }
}

fn offset(today: NaiveDate, days: u64) -> Option<NaiveDate> {
    today.checked_add_days(Days::new(days))
}

/// Sample tenders for a country label as used by the endpoint registry.
pub fn fallback_tenders(country: &str, today: NaiveDate) -> Vec<Tender> {
    samples_for(country)
        .iter()
        .map(|sample| Tender {
            id: sample.id.to_string(),
            title: sample.title.to_string(),
            organization: sample.organization.to_string(),
            country: country.to_string(),
            category: sample.category.to_string(),
            amount: Some(sample.amount),
            currency: Some(sample.currency.to_string()),
            publish_date: Some(today),
            deadline: offset(today, sample.days_open),
            description: sample.description.to_string(),
            source_url: Some(sample.url.to_string()),
            status: TenderStatus::Active,
            origin: TenderOrigin::Automatic,
            source: "Sample data".to_string(),
            reference: None,
            cpv_codes: Vec::new(),
            matched_keywords: Vec::new(),
        })
        .collect()
}

/// Sample grants for one grant source.
pub fn fallback_grants(source: GrantSource, today: NaiveDate) -> Vec<Grant> {
    let (samples, currency, country) = match source {
        GrantSource::GrantsGov => (GRANTS_GOV, "USD", "USA"),
        GrantSource::SamGov => (SAM_GOV, "USD", "USA"),
        GrantSource::EuFunding => (EU_FUNDING, "EUR", "EU"),
    };

    samples
        .iter()
        .map(|sample| Grant {
            id: sample.id.to_string(),
            title: sample.title.to_string(),
            agency: sample.agency.to_string(),
            opportunity_number: Some(sample.number.to_string()),
            funding_instrument: Some(sample.instrument.to_string()),
            eligibility: None,
            category: None,
            award_ceiling: sample.ceiling,
            award_floor: None,
            currency: currency.to_string(),
            posted_date: Some(today),
            close_date: offset(today, sample.days_open),
            description: sample.description.to_string(),
            url: Some(sample.url.to_string()),
            status: GrantStatus::Posted,
            source,
            country: country.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_samples_stay_open() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let tenders = fallback_tenders("Spain", today);
        assert_eq!(tenders.len(), 2);
        assert!(tenders.iter().all(|t| t.is_open_on(today)));
        assert!(tenders.iter().all(|t| t.country == "Spain"));

        let grants = fallback_grants(GrantSource::EuFunding, today);
        assert!(grants.iter().all(|g| g.is_open_on(today)));
    }

    #[test]
    fn test_unknown_country_has_no_samples() {
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assert!(fallback_tenders("Atlantis", today).is_empty());
    }
}
