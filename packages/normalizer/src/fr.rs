//! France.
//!
//! Besides the usual cleanup, a street line that contains a `rue`,
//! `allee`, `avenue` or `boulevard` phrase gets that phrase emitted on its
//! own as well, so company names or building names in front of it do not
//! drag the score down.

use std::sync::LazyLock;

use regex::Regex;

use crate::{NormalizeError, Normalizer, dedup_phrases, replace_all_literal, split_phrases};

static STREET_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§$%&=?*#€¿_":;0-9\n\r]"#).expect("valid regex")
});

static POSTAL_CODE_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;\n\ra-zA-Z]"#).expect("valid regex")
});

static CITY_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§$%&=?*#€¿_",:;0-9\n\r]"#).expect("valid regex")
});

static BOULEVARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u:\b)(bd|bld)(?-u:\b)[.]?").expect("valid regex"));

static AVENUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u:\b)ave(?-u:\b)").expect("valid regex"));

/// `bis` marks a duplicated house number and carries no street information.
static BIS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u:\b)bis(?-u:\b)").expect("valid regex"));

static ZAC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u:\b)zac(?-u:\b)").expect("valid regex"));

static FOUND_STREET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u:\b)(rue|allee|avenue|boulevard)( [a-z]*[.|']?[a-z]*)*").expect("valid regex")
});

const LETTERS: &[(&str, &str)] = &[
    ("í", "i"),
    ("é", "e"),
    ("è", "e"),
    ("ê", "e"),
    ("ë", "e"),
    ("à", "a"),
    ("â", "a"),
    ("ä", "a"),
    ("ù", "u"),
    ("û", "u"),
    ("ü", "u"),
    ("ô", "o"),
    ("ö", "o"),
    ("ç", "c"),
    ("œ", "oe"),
];

/// French normalization rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fr;

impl Normalizer for Fr {
    fn country_code(&self) -> &'static str {
        "fr"
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
            .replace(" - ", "|");
        let street = STREET_SPECIAL_RE
            .replace_all(&street, "")
            .replace("- ", "")
            .replace(" -", "");
        let street = replace_all_literal(&street, LETTERS);
        let street = BOULEVARD_RE.replace_all(&street, "boulevard");
        let street = AVENUE_RE.replace_all(&street, "avenue");
        let street = BIS_RE.replace_all(&street, "");
        let street = ZAC_RE.replace_all(&street, "|zac");
        let mut street = street.trim().to_string();

        if let Some(found) = FOUND_STREET_RE.find(&street) {
            let found = found.as_str().to_string();
            street.push('|');
            street.push_str(&found);
        }

        let trimmed = street.split('|').map(str::trim).collect::<Vec<_>>().join("|");

        Ok(dedup_phrases(split_phrases(&trimmed, 1)))
    }
}
