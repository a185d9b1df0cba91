//! Defense-relevance heuristics.

/// Lowercase substrings that mark a record as defense-related.
///
/// Spanish and French variants are included because PLACSP and BOAMP publish in
/// their national languages.
pub const DEFENSE_KEYWORDS: &[&str] = &[
    "defense",
    "defence",
    "defensa",
    "défense",
    "militar",
    "militaire",
    "army",
    "navy",
    "air force",
    "armed forces",
    "fuerzas armadas",
    "ejército",
    "armada",
    "armée",
    "cyber",
    "ciber",
    "radar",
    "sonar",
    "missile",
    "misil",
    "ammunition",
    "munición",
    "munition",
    "weapon",
    "armament",
    "armamento",
    "surveillance",
    "vigilancia",
    "drone",
    "uav",
    "unmanned",
    "aerospace",
    "aeroespacial",
    "satellite",
    "satélite",
    "c4isr",
    "electronic warfare",
    "guerra electrónica",
    "ballistic",
    "tactical",
    "táctico",
    "security",
    "seguridad",
    "sécurité",
    "homeland",
    "border protection",
];

/// Keywords found in `text`, in list order.
pub fn defense_keywords_in(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    DEFENSE_KEYWORDS
        .iter()
        .filter(|keyword| lowered.contains(*keyword))
        .map(|keyword| keyword.to_string())
        .collect()
}

pub fn is_defense_related(text: &str) -> bool {
    let lowered = text.to_lowercase();
    DEFENSE_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cybersecurity_title_is_retained() {
        assert!(is_defense_related("Cybersecurity operations centre support"));
        assert!(defense_keywords_in("Cybersecurity operations").contains(&"cyber".to_string()));
    }

    #[test]
    fn test_unrelated_title_is_dropped() {
        assert!(!is_defense_related("Catering services for primary schools"));
        assert!(defense_keywords_in("Catering services").is_empty());
    }

    #[test]
    fn test_matching_is_case_and_accent_aware() {
        assert!(is_defense_related("SUMINISTRO PARA EL EJÉRCITO DE TIERRA"));
        assert!(is_defense_related("Maintenance des systèmes de DÉFENSE"));
    }
}
