//! Switzerland.

use std::sync::LazyLock;

use regex::Regex;

use crate::{NormalizeError, Normalizer, replace_all_literal, split_phrases};

static STREET_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;0-9\n\r]"#).expect("valid regex")
});

static POSTAL_CODE_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_a-z":;\n\r]"#).expect("valid regex")
});

static CITY_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§$%&=?*#€¿_",:;0-9\n\r]"#).expect("valid regex")
});

/// German, French and Italian accents found in Swiss place names.
const LETTERS: &[(&str, &str)] = &[
    ("í", "i"),
    ("é", "e"),
    ("è", "e"),
    ("ê", "e"),
    ("ë", "e"),
    ("à", "a"),
    ("â", "a"),
    ("ä", "ae"),
    ("ù", "u"),
    ("û", "u"),
    ("ü", "ue"),
    ("ô", "o"),
    ("ö", "oe"),
    ("ç", "c"),
    ("œ", "oe"),
];

/// Swiss normalization rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ch;

impl Normalizer for Ch {
    fn country_code(&self) -> &'static str {
        "ch"
    }

    fn city(&self, city: &str) -> Result<String, NormalizeError> {
        let city = city.to_lowercase();
        let city = CITY_SPECIAL_RE.replace_all(&city, "");
        Ok(replace_all_literal(&city, LETTERS).trim().to_string())
    }

    fn postal_code(&self, postal_code: &str) -> Result<String, NormalizeError> {
        let postal_code = postal_code.to_lowercase().replace(' ', "");
        Ok(POSTAL_CODE_SPECIAL_RE
            .replace_all(&postal_code, "")
            .into_owned())
    }

    fn street(&self, street: &str) -> Result<Vec<String>, NormalizeError> {
        let street = street
            .to_lowercase()
            .replace(',', "|")
            .replace('\n', "|")
            .replace("str.", "straße")
            .replace("strasse", "straße");
        let street = STREET_SPECIAL_RE.replace_all(&street, "");
        let street = replace_all_literal(&street, LETTERS);
        Ok(split_phrases(&street, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_replaces_accents() {
        assert_eq!(
            Ch.city("City íéèêëàâäùûüôöçœ").unwrap(),
            "city ieeeeaaaeuuueooecoe"
        );
        assert_eq!(Ch.city("City 2").unwrap(), "city");
    }

    #[test]
    fn postal_code_drops_letters() {
        assert_eq!(Ch.postal_code("3241 ML").unwrap(), "3241");
    }

    #[test]
    fn street_expands_strasse() {
        assert_eq!(
            Ch.street("Wonderful str. strasse").unwrap(),
            vec!["wonderful straße straße".to_string()]
        );
    }

    #[test]
    fn street_splits_on_commas() {
        assert_eq!(
            Ch.street("Bahnhofstrasse 1, Zürich").unwrap(),
            vec!["bahnhofstraße".to_string(), "zuerich".to_string()]
        );
    }
}
