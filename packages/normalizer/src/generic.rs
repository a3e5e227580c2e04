//! Fallback rules for countries without dedicated normalization.

use std::sync::LazyLock;

use regex::Regex;

use crate::{GENERIC_COUNTRY_CODE, NormalizeError, Normalizer, split_phrases};

static CITY_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§$%&=?*#€¿_",:;0-9\n\r]"#).expect("valid regex")
});

static POSTAL_CODE_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;\n\r]"#).expect("valid regex")
});

static STREET_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;0-9\-\n\r]"#).expect("valid regex")
});

/// Minimal cleanup that is safe for any country.
#[derive(Debug, Clone, Copy, Default)]
pub struct Generic;

impl Normalizer for Generic {
    fn country_code(&self) -> &'static str {
        GENERIC_COUNTRY_CODE
    }

    fn city(&self, city: &str) -> Result<String, NormalizeError> {
        let city = city.to_lowercase();
        Ok(CITY_SPECIAL_RE.replace_all(&city, "").trim().to_string())
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
            .replace('\n', "|");
        let street = STREET_SPECIAL_RE.replace_all(&street, "");
        Ok(split_phrases(&street, 1))
    }
}
