//! Great Britain.
//!
//! Only the outward part of a postcode (`AA1B` of `AA1B 6CD`) is kept,
//! since that is what geocoders resolve reliably. Postcodes embedded in the
//! street line are removed.

use std::sync::LazyLock;

use regex::Regex;

use crate::{NormalizeError, Normalizer, split_phrases, truncate_bytes};

static POSTAL_CODE_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;\n\r\-]"#).expect("valid regex")
});

static POSTAL_CODE_WITH_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?-u:\b)([0-9A-Za-z_]{1,2}(([0-9][0-9A-Za-z_])|[0-9]{1,2})) ([0-9][0-9A-Za-z_]{2})(?-u:\b)",
    )
    .expect("valid regex")
});

static POSTAL_CODE_WITHOUT_SPACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?-u:\b)([0-9A-Za-z_]{1,2}(([0-9][0-9A-Za-z_])|[0-9]{1,2}))([0-9][0-9A-Za-z_]{2})(?-u:\b)",
    )
    .expect("valid regex")
});

static CITY_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§$%&=?*#€¿_",:;0-9\n\r]"#).expect("valid regex")
});

static STREET_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+./(){}\[\]<>!§'$%&=?*#€¿_":;0-9\-\r]"#).expect("valid regex")
});

/// Up to three words in front of a street type, optionally led by a house
/// number.
static STREET_PHRASE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([0-9]*[\-|/]?[0-9]*) ([\t\n\f\r ]*|[0-9A-Za-z_]*){1,3} (street|drive|road|avenue|boulevard|highway|parkway)",
    )
    .expect("valid regex")
});

static STREET_TYPES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?-u:\b)st$", "street"),
        (r"(?-u:\b)dr(?-u:\b)", "drive"),
        (r"(?-u:\b)rd(?-u:\b)", "road"),
        (r"(?-u:\b)ave(?-u:\b)", "avenue"),
        (r"(?-u:\b)blvd(?-u:\b)", "boulevard"),
        (r"(?-u:\b)hwy(?-u:\b)", "highway"),
        (r"(?-u:\b)pkwy(?-u:\b)", "parkway"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid regex"), replacement))
    .collect()
});

/// British normalization rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Gb;

impl Normalizer for Gb {
    fn country_code(&self) -> &'static str {
        "gb"
    }

    fn city(&self, city: &str) -> Result<String, NormalizeError> {
        let city = city.to_lowercase();
        Ok(CITY_SPECIAL_RE.replace_all(&city, "").trim().to_string())
    }

    fn postal_code(&self, postal_code: &str) -> Result<String, NormalizeError> {
        let postal_code = postal_code.to_lowercase().replace(' ', "");
        let postal_code = POSTAL_CODE_SPECIAL_RE.replace_all(&postal_code, "");

        if !POSTAL_CODE_WITHOUT_SPACE_RE.is_match(&postal_code) {
            return Err(NormalizeError::invalid_postal_code(
                "",
                "postal code does not look like a british postcode",
            ));
        }

        // Drop the inward code.
        Ok(truncate_bytes(&postal_code, postal_code.len() - 3).to_string())
    }

    fn street(&self, street: &str) -> Result<Vec<String>, NormalizeError> {
        let street = street.to_lowercase().replace(',', "|").replace('\n', "|");
        let street = POSTAL_CODE_WITHOUT_SPACE_RE.replace_all(&street, "");
        let mut street = POSTAL_CODE_WITH_SPACE_RE
            .replace_all(&street, "")
            .into_owned();

        for (re, replacement) in STREET_TYPES.iter() {
            street = re.replace_all(&street, *replacement).into_owned();
        }

        let mut parts = Vec::new();
        for part in street.split('|') {
            if let Some(found) = STREET_PHRASE_RE.find(part) {
                parts.push(
                    STREET_SPECIAL_RE
                        .replace_all(found.as_str(), "")
                        .trim()
                        .to_string(),
                );
            }
            parts.push(STREET_SPECIAL_RE.replace_all(part, "").trim().to_string());
        }

        Ok(split_phrases(&parts.join("|"), 1))
    }
}
