//! Text cleaning shared by the organizational resolver and the importer

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Normalize free text for matching
///
/// Trims, collapses inner whitespace, strips diacritics and lower-cases.
/// Empty or whitespace-only input yields an empty string.
pub fn normalize(text: &str) -> String {
    collapse_whitespace(text)
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Title-case a name field: "  jean   DUPONT " -> "Jean Dupont"
///
/// Accents are preserved; only casing and whitespace change.
pub fn title_case(text: &str) -> String {
    collapse_whitespace(text)
        .split(' ')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_accents_and_case() {
        assert_eq!(
            normalize("  Equipe   Contrôle Commande et Télécom  "),
            "equipe controle commande et telecom"
        );
        assert_eq!(normalize("ÉQUIPE"), "equipe");
    }

    #[test]
    fn test_normalize_is_total() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \t \n "), "");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("  jean   DUPONT "), "Jean Dupont");
        assert_eq!(title_case("élodie"), "Élodie");
        assert_eq!(title_case(""), "");
    }
}
