//! Spain.

use std::sync::LazyLock;

use regex::Regex;

use crate::{NormalizeError, Normalizer, replace_all_literal, split_phrases, truncate_bytes};

static POSTAL_CODE_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§$%&=?*#€¿_",:;a-zA-Z\- ]"#).expect("valid regex")
});

static STREET_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;0-9]"#).expect("valid regex")
});

static CITY_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§$%&=?*#€¿_",:;0-9\n\r]"#).expect("valid regex")
});

/// Spanish street type words.
static STREET_TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?-u:\b)(autopista|autoviac|avenida|bulevar|calle( de)?( la)?|calle peatonal|carrer( de)?( la)?|callejon|camino|canada real|carretera|carretera de circunvalacion|carril|ciclovia|corredera|costanilla|parque|pasadizo elevado|pasaje|paseo maritimo|plaza|pretil|puente|ronda|sendero|travesia|tunel|via pecuaria|via rapida|via verde|urbanizacion)(?-u:\b)",
    )
    .expect("valid regex")
});

/// Abbreviated street types and "no number" markers.
static STREET_SHORT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?-u:\b)(c[/|.]|av[/|.]|avda[/|.]|pl[/|.]|s/n|sin numero|n[º|.]|numero)",
    )
    .expect("valid regex")
});

/// House numbers like `3º` or `3-b`.
static HOUSE_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u:\b)([0-9][º|\-][0-9A-Za-z_])(?-u:\b)").expect("valid regex")
});

const LETTERS: &[(&str, &str)] = &[
    ("í", "i"),
    ("ç", "c"),
    ("ó", "o"),
    ("ñ", "n"),
    ("ú", "u"),
    ("á", "a"),
];

/// Replaces accented Spanish letters with their plain counterparts.
#[must_use]
pub fn replace_spanish_letters(s: &str) -> String {
    replace_all_literal(s, LETTERS)
}

/// Spanish normalization rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Es;

impl Normalizer for Es {
    fn country_code(&self) -> &'static str {
        "es"
    }

    fn city(&self, city: &str) -> Result<String, NormalizeError> {
        let city = city.to_lowercase();
        let city = CITY_SPECIAL_RE.replace_all(city.trim(), "");
        Ok(replace_spanish_letters(&city))
    }

    fn postal_code(&self, postal_code: &str) -> Result<String, NormalizeError> {
        let postal_code = POSTAL_CODE_SPECIAL_RE.replace_all(postal_code, "");

        match postal_code.len() {
            5 => Ok(postal_code.into_owned()),
            len if len > 5 => Err(NormalizeError::invalid_postal_code(
                truncate_bytes(&postal_code, 5),
                "postal code is longer than 5 characters",
            )),
            _ => Err(NormalizeError::invalid_postal_code(
                postal_code,
                "postal code is shorter than 5 characters",
            )),
        }
    }

    fn street(&self, street: &str) -> Result<Vec<String>, NormalizeError> {
        let street = street.to_lowercase().replace('\n', "|").replace(',', "|");
        let street = replace_spanish_letters(&street);
        let street = STREET_SHORT_NAME_RE.replace_all(&street, " ");
        let street = STREET_TYPE_RE.replace_all(&street, " ");
        let street = HOUSE_NUMBER_RE.replace_all(&street, " ");
        let street = STREET_SPECIAL_RE.replace_all(&street, " ");
        Ok(split_phrases(&street, 1))
    }
}
