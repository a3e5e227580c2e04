//! Germany.
//!
//! Street input is expanded to the `straße` spelling and umlauts are
//! transliterated. Mannheim's grid addresses ("Quadrate" like `G 3 4`)
//! are detected up front and emitted as an extra phrase (`g3`).

use std::sync::LazyLock;

use regex::Regex;

use crate::{NormalizeError, Normalizer, dedup_phrases, replace_all_literal, split_phrases};

static CITY_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§$%&=?*#€¿_",:;0-9]"#).expect("valid regex")
});

static POSTAL_CODE_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§$%&=?*#€¿_",:;a-zA-Z\- ]"#).expect("valid regex")
});

static STREET_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;0-9]"#).expect("valid regex")
});

/// A word ending in `straße`. Uses a Unicode word boundary so a trailing
/// `ß` still terminates the word.
static FOUND_STREET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z]+straße)\b").expect("valid regex"));

const STREET_ABBREVIATIONS: &[(&str, &str)] = &[
    ("/", " "),
    ("-", " "),
    ("\n", "|"),
    (",", "|"),
    ("str.", "straße"),
    ("strasse", "straße"),
    ("strasze", "straße"),
    ("chau.", "chaussee"),
    ("rd.", "road"),
];

const UMLAUTS: &[(&str, &str)] = &[("ü", "ue"), ("ä", "ae"), ("ö", "oe"), ("st.", "sankt")];

/// German normalization rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct De;

impl Normalizer for De {
    fn country_code(&self) -> &'static str {
        "de"
    }

    fn city(&self, city: &str) -> Result<String, NormalizeError> {
        let city = city
            .to_lowercase()
            .replace('/', " ")
            .replace('-', " ")
            .replace('\n', " ");
        let city = CITY_SPECIAL_RE.replace_all(&city, " ");
        let city = replace_all_literal(&city, UMLAUTS).replace('ß', "sz");

        Ok(city
            .split(' ')
            .filter(|part| part.len() > 1)
            .collect::<Vec<_>>()
            .join(" "))
    }

    fn postal_code(&self, postal_code: &str) -> Result<String, NormalizeError> {
        let mut postal_code = POSTAL_CODE_SPECIAL_RE
            .replace_all(postal_code, "")
            .into_owned();

        if postal_code.len() == 4 {
            postal_code.insert(0, '0');
        } else if postal_code.len() != 5 {
            return Err(NormalizeError::invalid_postal_code(
                "",
                "postal code does not contain 5 characters",
            ));
        }

        if postal_code == "00000" {
            return Err(NormalizeError::invalid_postal_code("", "postal code is 00000"));
        }

        if !postal_code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(NormalizeError::invalid_postal_code(
                "",
                "postal code is not numeric",
            ));
        }

        Ok(postal_code)
    }

    fn street(&self, street: &str) -> Result<Vec<String>, NormalizeError> {
        let quadrat = detect_quadrat_address(street);

        let street = replace_all_literal(&street.to_lowercase(), STREET_ABBREVIATIONS);
        let street = STREET_SPECIAL_RE.replace_all(&street, " ");
        let mut street = replace_all_literal(&street, UMLAUTS);

        if let Some(found) = FOUND_STREET_RE.find(&street) {
            let found = found.as_str().to_string();
            street.push('|');
            street.push_str(&found);
        }

        let mut phrases = split_phrases(&street, 1);
        if let Some(quadrat) = quadrat {
            phrases.insert(0, quadrat);
        }

        Ok(dedup_phrases(phrases))
    }
}

/// Finds a Mannheim grid address such as `G 3 4`, `G3 4` or `G3` among the
/// comma or newline separated parts of `address` and returns its block
/// (`g3`).
fn detect_quadrat_address(address: &str) -> Option<String> {
    let address = address.to_lowercase().replace(',', "\n");

    for item in address.split('\n') {
        let item = item.trim_start_matches(' ');
        if item.len() >= 8 {
            continue;
        }

        let bytes = item.as_bytes();
        let letter_at = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_alphabetic);
        let digit_at = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);
        let space_at = |i: usize| bytes.get(i) == Some(&b' ');

        if bytes.len() > 2 && letter_at(0) && digit_at(1) && space_at(2) {
            return Some(item[0..2].to_string());
        } else if bytes.len() == 3 && letter_at(0) && space_at(1) && digit_at(2) {
            return Some(item.replace(' ', ""));
        } else if bytes.len() == 2 && letter_at(0) && digit_at(1) {
            return Some(item.to_string());
        } else if bytes.len() > 3 && letter_at(0) && space_at(1) && digit_at(2) && space_at(3) {
            return Some(item.replace(' ', "")[0..2].to_string());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn postal_code_strips_country_prefix() {
        assert_eq!(De.postal_code("D-12345").unwrap(), "12345");
        assert_eq!(De.postal_code("DE12345").unwrap(), "12345");
        assert_eq!(De.postal_code("DE12Blub345").unwrap(), "12345");
    }

    #[test]
    fn postal_code_pads_four_digits() {
        assert_eq!(De.postal_code("1067").unwrap(), "01067");
    }

    #[test]
    fn postal_code_rejects_invalid_values() {
        assert!(De.postal_code("D-124").is_err());
        assert!(De.postal_code("D-00000").is_err());
        assert!(De.postal_code("00000").is_err());

        let err = De.postal_code("D-124").unwrap_err();
        assert_eq!(err.best_effort(), "");
    }

    #[test]
    fn city_transliterates_umlauts() {
        assert_eq!(De.city("Köln").unwrap(), "koeln");
        assert_eq!(De.city("Gießen").unwrap(), "gieszen");
        assert_eq!(De.city("Rüsselsheim").unwrap(), "ruesselsheim");
    }

    #[test]
    fn city_splits_hyphenated_names() {
        assert_eq!(De.city("Eine-Stadt").unwrap(), "eine stadt");
    }

    #[test]
    fn detects_quadrat_addresses() {
        assert_eq!(detect_quadrat_address("G 3 4").as_deref(), Some("g3"));
        assert_eq!(detect_quadrat_address("G3 4").as_deref(), Some("g3"));
        assert_eq!(detect_quadrat_address("G3").as_deref(), Some("g3"));
        assert_eq!(detect_quadrat_address("N26"), None);
        assert_eq!(
            detect_quadrat_address("kommt alle nach mannheim , G3 4, Am Arsch GmbH").as_deref(),
            Some("g3")
        );
    }

    #[test]
    fn street_prepends_quadrat() {
        assert_eq!(
            De.street("XyZ GmbH, Mannheim, G 3 4").unwrap(),
            strings(&["g3", "xyz gmbh", "mannheim"])
        );
    }

    #[test]
    fn street_expands_abbreviations() {
        assert_eq!(
            De.street("Eine GmbH \n Fürstenstr. 17 A").unwrap(),
            strings(&["eine gmbh", "fuerstenstraße"])
        );
        assert_eq!(
            De.street("Fürstenstr. 17 A").unwrap(),
            strings(&["fuerstenstraße"])
        );
        assert_eq!(
            De.street("St.  Johan-Str. 111B").unwrap(),
            strings(&["sankt johan straße"])
        );
        assert_eq!(
            De.street("Mönch-Strasze").unwrap(),
            strings(&["moench straße"])
        );
    }

    #[test]
    fn street_keeps_multiple_parts() {
        assert_eq!(
            De.street("Somestrasse 41  |  Im Tal der 100 Tränen").unwrap(),
            strings(&["somestraße", "im tal der traenen"])
        );
    }

    #[test]
    fn street_extracts_embedded_street_name() {
        assert_eq!(
            De.street("Firma Hauptstraße 5").unwrap(),
            strings(&["firma hauptstraße", "hauptstraße"])
        );
    }
}
