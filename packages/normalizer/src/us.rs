//! United States.
//!
//! House numbers are dropped from street lines, except numbered streets
//! such as `23rd avenue` which keep their number.

use std::sync::LazyLock;

use regex::Regex;

use crate::{NormalizeError, Normalizer, split_phrases};

static POSTAL_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-.*|[a-zA-Z]|[^0-9]").expect("valid regex"));

static SPECIAL_CHARACTERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_".:;]"#).expect("valid regex")
});

static NUMBERS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([0-9]+)").expect("valid regex"));

static NON_NUMBERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([^0-9]+)").expect("valid regex"));

/// Unit designators that never identify a street.
static STREET_FILTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?-u:\b)(floor|suite|fl|ste)(?-u:\b)").expect("valid regex")
});

/// Numbered streets like `23rd avenue` whose number has to stay.
static NUMBERED_STREET_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([0-9]+[^0-9A-Za-z_]?)(st|nd|rd|th)[^0-9A-Za-z_]?(avenue|road|street)")
        .expect("valid regex")
});

/// Whole-word replacements, applied in order.
static WORD_REPLACEMENTS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        ("n", "north"),
        ("s", "south"),
        ("w", "west"),
        ("e", "east"),
        ("ne", "northeast"),
        ("nw", "northwest"),
        ("se", "southeast"),
        ("sw", "southwest"),
    ]
    .into_iter()
    .map(|(word, replacement)| (word_re(word), replacement))
    .collect()
});

static STREET_TYPES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        ("st", "street"),
        ("dr", "drive"),
        ("rd", "road"),
        ("ave", "avenue"),
        ("blvd", "boulevard"),
        ("hwy", "highway"),
        ("pkwy", "parkway"),
    ]
    .into_iter()
    .map(|(word, replacement)| (word_re(word), replacement))
    .collect()
});

fn word_re(word: &str) -> Regex {
    Regex::new(&format!(r"(?-u:\b){word}(?-u:\b)")).expect("valid regex")
}

fn replace_words(s: String, replacements: &[(Regex, &'static str)]) -> String {
    replacements.iter().fold(s, |acc, (re, replacement)| {
        re.replace_all(&acc, *replacement).into_owned()
    })
}

/// Removes every number from `street` unless it starts a numbered street.
fn drop_house_numbers(street: &str) -> String {
    let numbered_streets: Vec<usize> = NUMBERED_STREET_RE
        .find_iter(street)
        .map(|m| m.start())
        .collect();
    let numbers: Vec<_> = NUMBERS_RE.find_iter(street).collect();

    if numbers.is_empty() {
        return street.to_string();
    }

    let mut result = String::with_capacity(street.len());
    let mut keep_start = 0;

    for number in &numbers {
        if number.start() > keep_start {
            result.push_str(&street[keep_start..number.start()]);
        }

        keep_start = if numbered_streets.contains(&number.start()) {
            number.start()
        } else {
            number.end()
        };
    }

    result.push_str(&street[keep_start..]);
    result
}

/// US normalization rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Us;

impl Normalizer for Us {
    fn country_code(&self) -> &'static str {
        "us"
    }

    fn city(&self, city: &str) -> Result<String, NormalizeError> {
        let city = city.to_lowercase();
        let city = SPECIAL_CHARACTERS_RE.replace_all(city.trim(), "");
        Ok(NUMBERS_RE.replace_all(&city, "").into_owned())
    }

    fn postal_code(&self, postal_code: &str) -> Result<String, NormalizeError> {
        let postal_code = POSTAL_CODE_RE.replace_all(postal_code, "");
        Ok(NON_NUMBERS_RE.replace_all(&postal_code, "").into_owned())
    }

    fn street(&self, street: &str) -> Result<Vec<String>, NormalizeError> {
        let street = street
            .to_lowercase()
            .trim()
            .replace('\n', "|")
            .replace(',', "|");
        let street = SPECIAL_CHARACTERS_RE.replace_all(&street, "").into_owned();

        let street = replace_words(street, &WORD_REPLACEMENTS);
        let street = STREET_FILTER_RE.replace_all(&street, "").into_owned();
        let street = replace_words(street, &STREET_TYPES);

        Ok(split_phrases(&drop_house_numbers(&street), 2))
    }
}
