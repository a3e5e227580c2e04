//! Slovenia.

use std::sync::LazyLock;

use regex::Regex;

use crate::{NormalizeError, Normalizer, replace_all_literal, split_phrases};

static STREET_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;0-9\-\n\r]"#).expect("valid regex")
});

static POSTAL_CODE_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;\n\rA-Za-z]"#).expect("valid regex")
});

static CITY_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_",:;0-9\n\r]"#).expect("valid regex")
});

const LETTERS: &[(&str, &str)] = &[
    ("č", "c"),
    ("š", "s"),
    ("ž", "z"),
    ("Č", "c"),
    ("Š", "s"),
    ("Ž", "z"),
];

const STREET_ABBREVIATIONS: &[(&str, &str)] = &[
    (",", "|"),
    ("\n", "|"),
    ("ul.", "ulica"),
    ("u. ", "ulica"),
    ("c.", "cesta"),
    ("trg.", "trg"),
    ("nas.", "naselje"),
    ("kol.", "kolonija"),
    ("pot.", "pot"),
    ("steza.", "steza"),
];

/// Slovenian normalization rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Si;

impl Normalizer for Si {
    fn country_code(&self) -> &'static str {
        "si"
    }

    fn city(&self, city: &str) -> Result<String, NormalizeError> {
        let city = city.to_lowercase();
        let city = CITY_SPECIAL_RE.replace_all(city.trim(), "");
        Ok(replace_all_literal(&city, LETTERS).trim().to_string())
    }

    fn postal_code(&self, postal_code: &str) -> Result<String, NormalizeError> {
        let postal_code = postal_code.to_lowercase().replace([' ', '-'], "");
        let postal_code = POSTAL_CODE_SPECIAL_RE.replace_all(&postal_code, "");

        let digits: String = postal_code.chars().filter(char::is_ascii_digit).collect();

        if digits.len() < 4 {
            return Err(NormalizeError::invalid_postal_code(
                digits,
                "postal code is shorter than 4 digits",
            ));
        }

        Ok(digits[..4].to_string())
    }

    fn street(&self, street: &str) -> Result<Vec<String>, NormalizeError> {
        let street = replace_all_literal(&street.to_lowercase(), STREET_ABBREVIATIONS);
        let street = STREET_SPECIAL_RE.replace_all(&street, "");
        let street = replace_all_literal(&street, LETTERS);
        Ok(split_phrases(&street, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn postal_code_keeps_four_digits() {
        for (input, expected) in [
            ("1000", "1000"),
            ("1000Ljubljana", "1000"),
            ("1000-123", "1000"),
            ("1000 123", "1000"),
            ("0100", "0100"),
            ("SI-1000", "1000"),
            ("1000.123", "1000"),
            ("(1000)", "1000"),
            ("10000", "1000"),
        ] {
            assert_eq!(Si.postal_code(input).unwrap(), expected, "input {input:?}");
        }
    }

    #[test]
    fn postal_code_rejects_short_values() {
        let err = Si.postal_code("100").unwrap_err();
        assert_eq!(err.best_effort(), "100");
        let err = Si.postal_code("").unwrap_err();
        assert_eq!(err.best_effort(), "");
    }

    #[test]
    fn city_folds_diacritics() {
        for (input, expected) in [
            ("Ljubljana", "ljubljana"),
            ("   Ljubljana   ", "ljubljana"),
            ("Ljubljana+/(){}[]<>!§'$%&=?*#€¿_\":;12345", "ljubljana"),
            ("Črnomelj", "crnomelj"),
            ("Škofja Loka", "skofja loka"),
            ("Ljubljana 1000", "ljubljana"),
            ("Koper-Portorož", "koper-portoroz"),
            ("Celje ob Savinji", "celje ob savinji"),
        ] {
            assert_eq!(Si.city(input).unwrap(), expected, "input {input:?}");
        }
    }

    #[test]
    fn street_expands_abbreviations() {
        assert_eq!(
            Si.street("Slovenska ul. 15").unwrap(),
            strings(&["slovenska ulica"])
        );
        assert_eq!(
            Si.street("Slovenska c. 15").unwrap(),
            strings(&["slovenska cesta"])
        );
        assert_eq!(
            Si.street("Trg republike 1").unwrap(),
            strings(&["trg republike"])
        );
    }

    #[test]
    fn street_splits_parts() {
        assert_eq!(
            Si.street("Slovenska cesta\nLjubljana").unwrap(),
            strings(&["slovenska cesta", "ljubljana"])
        );
        assert_eq!(
            Si.street("Slovenska cesta 1, Ljubljana, 1000").unwrap(),
            strings(&["slovenska cesta", "ljubljana"])
        );
        assert_eq!(
            Si.street("Slovenska cesta 1, stavba A").unwrap(),
            strings(&["slovenska cesta", "stavba"])
        );
        assert_eq!(
            Si.street("Slovenska cesta 1, 2. nadstropje").unwrap(),
            strings(&["slovenska cesta", "nadstropje"])
        );
    }

    #[test]
    fn street_folds_diacritics() {
        assert_eq!(
            Si.street("Čopova ulica").unwrap(),
            strings(&["copova ulica"])
        );
    }
}
