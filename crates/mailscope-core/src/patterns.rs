//! Email local-part candidates from a name pair.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// One candidate address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPattern {
    pub label: String,
    pub local_part: String,
    /// `local_part@domain`, or just the local part when no domain was given.
    pub email: String,
}

impl EmailPattern {
    fn new(label: &str, local_part: String, domain: Option<&str>) -> Self {
        let email = match domain {
            Some(domain) if !domain.is_empty() => format!("{local_part}@{domain}"),
            _ => local_part.clone(),
        };
        Self {
            label: label.to_string(),
            local_part,
            email,
        }
    }

    /// Whether `email` is a full address rather than a bare local part.
    pub fn is_address(&self) -> bool {
        self.email.contains('@')
    }
}

/// Lowercase and keep ASCII letters only.
pub fn sanitize_name(value: &str) -> String {
    value
        .chars()
        .flat_map(char::to_lowercase)
        .filter(char::is_ascii_lowercase)
        .collect()
}

/// Generate candidate addresses for `first`/`last` at `domain`.
///
/// Pure and deterministic. Output is deduplicated by local part, first
/// occurrence wins.
pub fn generate(first_name: &str, last_name: &str, domain: Option<&str>) -> Vec<EmailPattern> {
    let first = sanitize_name(first_name);
    let last = sanitize_name(last_name);

    let candidates: Vec<(&str, String)> = match (first.is_empty(), last.is_empty()) {
        (true, true) => return Vec::new(),
        (false, true) => vec![("name", first.clone())],
        (true, false) => vec![("name", last.clone())],
        (false, false) => {
            let f = &first[..1];
            let l = &last[..1];
            vec![
                ("first.last", format!("{first}.{last}")),
                ("first_last", format!("{first}_{last}")),
                ("first-last", format!("{first}-{last}")),
                ("f.last", format!("{f}.{last}")),
                ("f_last", format!("{f}_{last}")),
                ("f-last", format!("{f}-{last}")),
                ("first.l", format!("{first}.{l}")),
                ("first_l", format!("{first}_{l}")),
                ("first-l", format!("{first}-{l}")),
                ("firstlast", format!("{first}{last}")),
                ("flast", format!("{f}{last}")),
                ("firstl", format!("{first}{l}")),
                ("first", first.clone()),
                ("last", last.clone()),
            ]
        }
    };

    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|(_, local)| seen.insert(local.clone()))
        .map(|(label, local)| EmailPattern::new(label, local, domain))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locals(patterns: &[EmailPattern]) -> Vec<&str> {
        patterns.iter().map(|p| p.local_part.as_str()).collect()
    }

    #[test]
    fn test_ada_lovelace_contains_first_dot_last() {
        let patterns = generate("Ada", "Lovelace", Some("example.com"));
        let hit = patterns
            .iter()
            .find(|p| p.local_part == "ada.lovelace")
            .expect("first.last pattern");
        assert_eq!(hit.email, "ada.lovelace@example.com");
        assert_eq!(hit.label, "first.last");
    }

    #[test]
    fn test_full_order() {
        let patterns = generate("Ada", "Lovelace", None);
        assert_eq!(
            locals(&patterns),
            vec![
                "ada.lovelace",
                "ada_lovelace",
                "ada-lovelace",
                "a.lovelace",
                "a_lovelace",
                "a-lovelace",
                "ada.l",
                "ada_l",
                "ada-l",
                "adalovelace",
                "alovelace",
                "adal",
                "ada",
                "lovelace",
            ]
        );
        assert!(patterns.iter().all(|p| !p.is_address()));
    }

    #[test]
    fn test_no_duplicate_local_parts() {
        // Single-letter names collapse several patterns onto the same local part.
        let patterns = generate("A", "B", Some("example.com"));
        let mut seen = HashSet::new();
        for p in &patterns {
            assert!(seen.insert(p.local_part.clone()), "duplicate {}", p.local_part);
        }
        assert_eq!(
            locals(&patterns),
            vec!["a.b", "a_b", "a-b", "ab", "a", "b"]
        );
        assert_eq!(patterns[0].label, "first.last");
    }

    #[test]
    fn test_deterministic() {
        let a = generate("Grace", "Hopper", Some("navy.mil"));
        let b = generate("Grace", "Hopper", Some("navy.mil"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_single_name() {
        let patterns = generate("", "O'Brien", Some("example.ie"));
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].label, "name");
        assert_eq!(patterns[0].email, "obrien@example.ie");
    }

    #[test]
    fn test_names_without_letters_yield_nothing() {
        assert!(generate("  ", "123 !", Some("example.com")).is_empty());
        assert!(generate("", "", None).is_empty());
    }

    #[test]
    fn test_sanitize_strips_non_letters() {
        assert_eq!(sanitize_name("Jean-Luc Picard"), "jeanlucpicard");
        assert_eq!(sanitize_name("Zoë"), "zo");
    }
}
