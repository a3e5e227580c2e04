//! Denmark.
//!
//! Danish street lines often carry floor and door designators after the
//! house number (`2. tv`, `st. th`, `1. mf`) plus care-of suffixes; all of
//! those are cut before the line is split into phrases.

use std::sync::LazyLock;

use regex::Regex;

use crate::{NormalizeError, Normalizer, split_phrases, truncate_bytes};

/// Care-of and attention suffixes.
static COMPANY_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\t\n\f\r ]*( v/| c/o| att)").expect("valid regex"));

/// Entrance, building and floor words following a house number.
static BUILDING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[^0-9A-Za-z_](sal|etage|floor|kl|kld|kælder|st|stuen|parterre|dør|port|opg|opgang|indgang|bygning|tv|th|bygn|mf)(?-u:\b)",
    )
    .expect("valid regex")
});

static FLOOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([^0-9A-Za-z_])(?-u:\b)(kld|kl|kælder[0-9A-Za-z_]*|st|stuen|parterren)(?-u:\b)",
    )
    .expect("valid regex")
});

/// House number followed by a door designator (`tv`, `th`, `mf`, ...).
static DOOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"([0-9].*)(?:(?-u:\b)tv|(?-u:\b)t[^0-9A-Za-z_]+v|v\.|(?-u:\b)v|(?-u:\b)th|(?-u:\b)t[^0-9A-Za-z_]+h|h\.|(?-u:\b)h|mf)(?-u:\b)",
    )
    .expect("valid regex")
});

/// Compass suffixes of larger cities, e.g. `København NV`.
static CITY_DISTRICT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^0-9A-Za-z_](sv|nv|sø|nø|s|n|v|ø)").expect("valid regex"));

static POSTAL_CODE_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§$%&=?*#€¿_",:;a-zA-Z\- ]"#).expect("valid regex")
});

static STREET_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;0-9]"#).expect("valid regex")
});

fn replace_danish_letters(s: &str) -> String {
    s.replace("oe", "ø").replace("ae", "æ")
}

/// Danish normalization rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dk;

impl Normalizer for Dk {
    fn country_code(&self) -> &'static str {
        "dk"
    }

    fn city(&self, city: &str) -> Result<String, NormalizeError> {
        let city = replace_danish_letters(&city.to_lowercase());
        Ok(CITY_DISTRICT_RE.replace_all(&city, "").trim().to_string())
    }

    fn postal_code(&self, postal_code: &str) -> Result<String, NormalizeError> {
        let postal_code = POSTAL_CODE_SPECIAL_RE.replace_all(postal_code, "");

        match postal_code.len() {
            4 => Ok(postal_code.into_owned()),
            len if len > 4 => Err(NormalizeError::invalid_postal_code(
                truncate_bytes(&postal_code, 4),
                "postal code is longer than 4 characters",
            )),
            _ => Err(NormalizeError::invalid_postal_code(
                postal_code,
                "postal code is shorter than 4 characters",
            )),
        }
    }

    fn street(&self, street: &str) -> Result<Vec<String>, NormalizeError> {
        let street = street.to_lowercase().replace('\n', "|").replace(',', "|");
        let street = replace_danish_letters(&street);

        let street = DOOR_RE.replace_all(&street, " ");
        let street = COMPANY_SUFFIX_RE.replace_all(&street, " ");
        let street = BUILDING_RE.replace_all(&street, " ");
        let street = FLOOR_RE.replace_all(&street, " ");
        let street = STREET_SPECIAL_RE.replace_all(&street, " ");

        Ok(split_phrases(&street, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn street(input: &str) -> Vec<String> {
        Dk.street(input).unwrap()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn city_replaces_digraphs() {
        assert_eq!(Dk.city("ACityWithOeWithin").unwrap(), "acitywithøwithin");
        assert_eq!(Dk.city("ACityWithAeWithin").unwrap(), "acitywithæwithin");
    }

    #[test]
    fn city_drops_district_suffix() {
        for input in [
            "City SV", "City sø", "City nø", "City S", "City N", "City V", "City ø",
        ] {
            assert_eq!(Dk.city(input).unwrap(), "city", "input {input:?}");
        }
        assert_eq!(Dk.city("SV City").unwrap(), "sv city");
        assert_eq!(Dk.city("SVCity").unwrap(), "svcity");
    }

    #[test]
    fn postal_code_must_have_four_digits() {
        let err = Dk.postal_code("12345").unwrap_err();
        assert_eq!(err.best_effort(), "1234");
        assert!(Dk.postal_code("123").is_err());
        assert_eq!(
            Dk.postal_code("1234abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ")
                .unwrap(),
            "1234"
        );
    }

    #[test]
    fn street_replaces_digraphs() {
        assert_eq!(street("Just Streetoe"), strings(&["just streetø"]));
    }

    #[test]
    fn street_drops_care_of_suffixes() {
        assert_eq!(street("Just Street v"), strings(&["just street"]));
        assert_eq!(street("Just Streetv"), strings(&["just streetv"]));
        assert_eq!(street("Just Street c/o"), strings(&["just street"]));
        assert_eq!(street("Just Street att"), strings(&["just street"]));
        assert_eq!(street("Just Streetatt"), strings(&["just streetatt"]));
    }

    #[test]
    fn street_drops_building_words() {
        assert_eq!(
            street(
                "Just Street sal etage floor kl kld kælder st stuen parterre dør port opg opgang indgang bygning bygn tv th mf"
            ),
            strings(&["just street"])
        );
    }

    #[test]
    fn street_drops_door_designators() {
        assert_eq!(
            street("Test Vænge 9, opgang 4, 2. tv blub"),
            strings(&["test vænge blub"])
        );
        assert_eq!(
            street("lurchschlumpf 2. tv asdf"),
            strings(&["lurchschlumpf asdf"])
        );
        for input in [
            "lurchschlumpf 1.tv.",
            "lurchschlumpf 1.t.v.",
            "lurchschlumpf 1.v.",
            "lurchschlumpf 1. v.",
            "lurchschlumpf 1. th",
            "lurchschlumpf 1. h",
            "lurchschlumpf 1 h",
            "lurchschlumpf 1 v",
            "lurchschlumpf 1. mf",
        ] {
            assert_eq!(street(input), strings(&["lurchschlumpf"]), "input {input:?}");
        }
    }

    #[test]
    fn street_drops_floor_words() {
        assert_eq!(
            street("lurchschlumpf kld kl kælder st stuen parterren"),
            strings(&["lurchschlumpf"])
        );
        assert_eq!(street("lurchschlumpfkld"), strings(&["lurchschlumpfkld"]));
    }
}
