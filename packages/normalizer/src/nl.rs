//! The Netherlands.

use std::sync::LazyLock;

use regex::Regex;

use crate::{NormalizeError, Normalizer, replace_all_literal, split_phrases};

static POSTAL_CODE_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;,\-]"#).expect("valid regex")
});

/// Four digits followed by two letters, e.g. `9865 MD`.
static POSTAL_CODE_VALID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u:\b)([0-9]){4}[\t\n\f\r ]*([A-Z]){2}(?-u:\b)").expect("valid regex")
});

static STREET_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;0-9]"#).expect("valid regex")
});

static CITY_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§$%&=?*#€¿_",:;0-9\n\r]"#).expect("valid regex")
});

const STREET_ABBREVIATIONS: &[(&str, &str)] = &[
    ("\n", "|"),
    (",", "|"),
    ("str.", "straat"),
    ("ln.", "laan"),
    ("wg.", "weg"),
    ("pl.", "plein"),
    ("gr.", "gracht"),
    ("sgl.", "singel"),
    ("kd.", "kade"),
    ("hf.", "hof"),
];

/// Dutch normalization rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nl;

impl Normalizer for Nl {
    fn country_code(&self) -> &'static str {
        "nl"
    }

    fn city(&self, city: &str) -> Result<String, NormalizeError> {
        let city = city.to_lowercase();
        Ok(CITY_SPECIAL_RE.replace_all(city.trim(), "").into_owned())
    }

    fn postal_code(&self, postal_code: &str) -> Result<String, NormalizeError> {
        let postal_code = postal_code.to_uppercase();
        let postal_code = POSTAL_CODE_SPECIAL_RE.replace_all(&postal_code, "");

        if !POSTAL_CODE_VALID_RE.is_match(&postal_code) {
            return Err(NormalizeError::invalid_postal_code(
                postal_code,
                "postal code is not four digits and two letters",
            ));
        }

        if postal_code.len() == 6 {
            return Ok(format!("{} {}", &postal_code[..4], &postal_code[4..]));
        }

        Ok(postal_code.into_owned())
    }

    fn street(&self, street: &str) -> Result<Vec<String>, NormalizeError> {
        let street = street.to_lowercase();
        let street = STREET_SPECIAL_RE.replace_all(&street, "");
        let street = replace_all_literal(&street, STREET_ABBREVIATIONS);
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
    fn city_is_lowercased() {
        assert_eq!(
            Nl.city("ACityWithCapitalLetters").unwrap(),
            "acitywithcapitalletters"
        );
    }

    #[test]
    fn postal_code_gets_a_space_before_the_letters() {
        assert_eq!(Nl.postal_code("9865 MD").unwrap(), "9865 MD");
        assert_eq!(Nl.postal_code("9865MD").unwrap(), "9865 MD");
        assert_eq!(
            Nl.postal_code("9865MD+/(){}[]<>!§$%&=?*#€¿_\",:;-").unwrap(),
            "9865 MD"
        );
    }

    #[test]
    fn postal_code_rejects_invalid_values() {
        for (input, best_effort) in [
            ("6825mdd", "6825MDD"),
            ("6825 MDD", "6825 MDD"),
            ("825MD", "825MD"),
        ] {
            let err = Nl.postal_code(input).unwrap_err();
            assert_eq!(err.best_effort(), best_effort, "input {input:?}");
        }
    }

    #[test]
    fn street_splits_parts() {
        assert_eq!(Nl.street("JustAStreet").unwrap(), strings(&["justastreet"]));
        assert_eq!(Nl.street("Just A Street").unwrap(), strings(&["just street"]));
        assert_eq!(
            Nl.street("Just , Street").unwrap(),
            strings(&["just", "street"])
        );
        assert_eq!(
            Nl.street("Just \n Street").unwrap(),
            strings(&["just", "street"])
        );
        assert_eq!(
            Nl.street("Just Street +/(){}[]<>!§'$%&=?*#€¿_\":;0123456789").unwrap(),
            strings(&["just street"])
        );
    }

    #[test]
    fn street_expands_abbreviations() {
        for (input, expected) in [
            ("Just Street str.", "just street straat"),
            ("Just Street ln.", "just street laan"),
            ("Just Street wg.", "just street weg"),
            ("Just Street pl.", "just street plein"),
            ("Just Street gr.", "just street gracht"),
            ("Just Street sgl.", "just street singel"),
            ("Just Street kd.", "just street kade"),
            ("Just Street hf.", "just street hof"),
        ] {
            assert_eq!(Nl.street(input).unwrap(), strings(&[expected]), "input {input:?}");
        }
    }
}
