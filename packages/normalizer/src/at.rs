//! Austria.

use std::sync::LazyLock;

use regex::Regex;

use crate::{NormalizeError, Normalizer, replace_all_literal, split_phrases};

static POSTAL_CODE_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§$%&=?*#€¿_",:;a-zA-Z\- ]"#).expect("valid regex")
});

static STREET_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;0-9]"#).expect("valid regex")
});

static CITY_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§$%&=?*#€¿_",:;0-9\n\r]"#).expect("valid regex")
});

/// Building, door and floor designators that never identify a street.
static STREET_STOP_WORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?-u:\b)(gnr|eg|top|tuer|stock|stg|og|objekt|strases|gasse|stiege|road)(?-u:\b)",
    )
    .expect("valid regex")
});

static CITY_STOP_WORDS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u:\b)(sankt|im|am|ober|unter)(?-u:\b)").expect("valid regex")
});

const STREET_ABBREVIATIONS: &[(&str, &str)] = &[
    ("\n", "|"),
    (",", "|"),
    ("str.", "strasse"),
    ("strasze", "strasse"),
    ("chau.", "chaussee"),
    ("rd.", "road"),
];

const LETTERS: &[(&str, &str)] = &[("ü", "ue"), ("ä", "ae"), ("ö", "oe"), ("ß", "ss")];

/// Austrian normalization rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct At;

impl Normalizer for At {
    fn country_code(&self) -> &'static str {
        "at"
    }

    fn city(&self, city: &str) -> Result<String, NormalizeError> {
        let city = city.to_lowercase();
        let city = CITY_SPECIAL_RE.replace_all(city.trim(), "");
        let city = CITY_STOP_WORDS_RE.replace_all(&city, "");
        Ok(replace_all_literal(&city, LETTERS))
    }

    fn postal_code(&self, postal_code: &str) -> Result<String, NormalizeError> {
        let postal_code = POSTAL_CODE_SPECIAL_RE.replace_all(postal_code, "");

        if postal_code.len() != 4 {
            return Err(NormalizeError::invalid_postal_code(
                postal_code,
                "postal code does not contain 4 characters",
            ));
        }

        Ok(postal_code
            .strip_prefix('0')
            .unwrap_or(&postal_code)
            .to_string())
    }

    fn street(&self, street: &str) -> Result<Vec<String>, NormalizeError> {
        let street = replace_all_literal(&street.to_lowercase(), STREET_ABBREVIATIONS);
        let street = STREET_SPECIAL_RE.replace_all(&street, " ");
        let street = replace_all_literal(&street, LETTERS);
        let street = STREET_STOP_WORDS_RE.replace_all(&street, "");
        Ok(split_phrases(&street, 1))
    }
}
