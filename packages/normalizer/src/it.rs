//! Italy.
//!
//! Italian street names are often written with abbreviated first names
//! (`via g. verdi`). Every known expansion of such an abbreviation is
//! emitted as an extra phrase so the matcher can pick the right one.

use std::sync::LazyLock;

use regex::Regex;

use crate::{NormalizeError, Normalizer, dedup_phrases, split_phrases};

static STREET_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;0-9\n\r]"#).expect("valid regex")
});

static FOUND_STREET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u:\b)(via|piazza|viale)( [a-z]*[.]?[a-z]*)*").expect("valid regex")
});

static POSTAL_CODE_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;\n\ra-z]"#).expect("valid regex")
});

static POSTAL_CODE_VALID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u:\b)[0-9]{5}(?-u:\b)").expect("valid regex"));

static CITY_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§$%&=?*#€¿_",:;0-9\n\r]"#).expect("valid regex")
});

/// Street type abbreviations. `v.lo` has to run before the bare `v.`.
static STREET_TYPES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"(?-u:\b)c\.so(?-u:\b)", "corso"),
        (r"(?-u:\b)p\.za(?-u:\b)", "piazza"),
        (r"(?-u:\b)v\.le(?-u:\b)", "viale"),
        (r"(?-u:\b)v\.lo(?-u:\b)", "vicolo"),
        (r"(?-u:\b)v\.", "via"),
        (r"(?-u:\b)l\.go(?-u:\b)", "largo"),
        (r"(?-u:\b)trav\.", "traversa"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).expect("valid regex"), replacement))
    .collect()
});

/// Abbreviated name parts and every expansion tried for them.
const SHORTCUTS: &[(&str, &[&str])] = &[
    (
        " g.",
        &[" giovanni", " giuseppe", " giacomo", " gabriele", " giorgio"],
    ),
    ("str.", &["strada", "strasse"]),
    (" st.", &[" strada", " santo", " santa"]),
    (" f.", &[" francesco", " filippo", " ferdinando"]),
    (" s.", &[" santo", " santa"]),
    (" v.", &[" vittorio"]),
    (" m.", &[" marco", " maria", " michele"]),
    (" d.", &[" don"]),
];

fn expand_shortcuts(s: &str) -> String {
    let mut result = s.to_string();

    for (shortcut, expansions) in SHORTCUTS {
        if !s.contains(shortcut) {
            continue;
        }
        for expansion in *expansions {
            result.push('|');
            result.push_str(&s.replace(shortcut, expansion));
        }
    }

    result
}

/// Italian normalization rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct It;

impl Normalizer for It {
    fn country_code(&self) -> &'static str {
        "it"
    }

    fn city(&self, city: &str) -> Result<String, NormalizeError> {
        let city = city.to_lowercase();
        Ok(CITY_SPECIAL_RE.replace_all(&city, "").trim().to_string())
    }

    fn postal_code(&self, postal_code: &str) -> Result<String, NormalizeError> {
        let postal_code = postal_code.to_lowercase().replace(' ', "");
        let postal_code = POSTAL_CODE_SPECIAL_RE.replace_all(&postal_code, "");

        if !POSTAL_CODE_VALID_RE.is_match(&postal_code) {
            return Err(NormalizeError::invalid_postal_code(
                postal_code,
                "postal code does not contain 5 digits",
            ));
        }

        Ok(postal_code.into_owned())
    }

    fn street(&self, street: &str) -> Result<Vec<String>, NormalizeError> {
        let mut street = street.to_lowercase().replace(',', "|").replace('\n', "|");

        for (re, replacement) in STREET_TYPES.iter() {
            street = re.replace_all(&street, *replacement).into_owned();
        }

        let mut street = STREET_SPECIAL_RE.replace_all(&street, "").into_owned();

        if let Some(found) = FOUND_STREET_RE.find(&street) {
            let found = found.as_str().to_string();
            street.push('|');
            street.push_str(&found);
        }

        let street = expand_shortcuts(&street);

        Ok(dedup_phrases(split_phrases(&street, 1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn city_drops_digits() {
        assert_eq!(
            It.city("Theodor-Stern-Kai 2").unwrap(),
            "theodor-stern-kai"
        );
    }

    #[test]
    fn postal_code_extracts_five_digits() {
        assert_eq!(It.postal_code("some messy text 12345 ML").unwrap(), "12345");
        let err = It.postal_code("some messy text 1234 ML").unwrap_err();
        assert_eq!(err.best_effort(), "1234");
    }

    #[test]
    fn street_splits_on_newlines() {
        assert_eq!(
            It.street("the new \n road 23").unwrap(),
            strings(&["the new", "road"])
        );
    }

    #[test]
    fn street_expands_street_types() {
        assert_eq!(
            It.street("the new \n c.so 23").unwrap(),
            strings(&["the new", "corso"])
        );
        assert_eq!(
            It.street("the new \n l.go 23").unwrap(),
            strings(&["the new", "largo"])
        );
        assert_eq!(
            It.street("the new trav. 23").unwrap(),
            strings(&["the new traversa"])
        );
        assert_eq!(
            It.street("p.za del torro  23").unwrap(),
            strings(&["piazza del torro"])
        );
        assert_eq!(
            It.street("v.lo stretto 4").unwrap(),
            strings(&["vicolo stretto"])
        );
    }

    #[test]
    fn street_emits_found_street_phrase() {
        assert_eq!(
            It.street("bullshit piazza del torro 123").unwrap(),
            strings(&["bullshit piazza del torro", "piazza del torro"])
        );
        assert_eq!(
            It.street("bullshit via del torro 123").unwrap(),
            strings(&["bullshit via del torro", "via del torro"])
        );
    }

    #[test]
    fn street_expands_abbreviated_names() {
        assert_eq!(
            It.street("via g. torro 123").unwrap(),
            strings(&[
                "via g. torro",
                "via giovanni torro",
                "via giuseppe torro",
                "via giacomo torro",
                "via gabriele torro",
                "via giorgio torro",
            ])
        );
    }
}
