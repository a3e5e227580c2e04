//! Poland.
//!
//! Polish input sometimes arrives with backslash escapes such as
//! `\u0144` instead of the letter itself. Those are decoded after the
//! diacritics are folded.

use std::sync::LazyLock;

use regex::Regex;

use crate::{NormalizeError, Normalizer, replace_all_literal, split_phrases};

static STREET_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;0-9\-\n\r]"#).expect("valid regex")
});

/// `ulica`, `aleja`, `plac` and `osiedle` abbreviations.
static STREET_TYPE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u:\b)(ul|al|pl|os)(?-u:\b)").expect("valid regex"));

static WORD_ENDING_WITH_DOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?-u:\b)[0-9A-Za-z_]*\.").expect("valid regex"));

static POSTAL_CODE_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§'$%&=?*#€¿_":;\n\rA-Za-z]"#).expect("valid regex")
});

static POSTAL_CODE_NUMERIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}$").expect("valid regex"));

static CITY_SPECIAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"[+/(){}\[\]<>!§$%&=?*#€'¿_",:;\n\r0-9]"#).expect("valid regex")
});

const LETTERS: &[(&str, &str)] = &[
    ("ę", "e"),
    ("ó", "o"),
    ("ą", "a"),
    ("ł", "l"),
    ("ż", "z"),
    ("ź", "z"),
    ("ś", "s"),
    ("ć", "c"),
];

/// Polish normalization rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pl;

impl Normalizer for Pl {
    fn country_code(&self) -> &'static str {
        "pl"
    }

    fn city(&self, city: &str) -> Result<String, NormalizeError> {
        let city = city.to_lowercase();
        let city = CITY_SPECIAL_RE.replace_all(&city, "");
        let city = replace_all_literal(&city, LETTERS);
        decode_escapes(city.trim())
    }

    fn postal_code(&self, postal_code: &str) -> Result<String, NormalizeError> {
        let postal_code = postal_code.to_lowercase().replace(' ', "");
        let postal_code = POSTAL_CODE_SPECIAL_RE.replace_all(&postal_code, "");

        if POSTAL_CODE_NUMERIC_RE.is_match(&postal_code) {
            return Ok(format!("{}-{}", &postal_code[0..2], &postal_code[2..5]));
        }

        Ok(postal_code.into_owned())
    }

    fn street(&self, street: &str) -> Result<Vec<String>, NormalizeError> {
        let street = street.to_lowercase().replace('\n', "|").replace(',', "|");
        let street = decode_escapes(&replace_all_literal(&street, LETTERS))?;

        let street = STREET_TYPE_RE.replace_all(&street, "");
        let street = STREET_SPECIAL_RE.replace_all(&street, "");
        let street = WORD_ENDING_WITH_DOT_RE.replace_all(&street, "");

        Ok(split_phrases(&street, 1))
    }
}

/// Drops tabs, newlines and double quotes, then decodes backslash escapes
/// (`\n`, `\xHH`, `\uHHHH`, `\UHHHHHHHH`, three-digit octal, ...).
fn decode_escapes(s: &str) -> Result<String, NormalizeError> {
    let s = s.replace(['\t', '\n', '"'], "");
    if !s.contains('\\') {
        return Ok(s);
    }

    let invalid = || NormalizeError::InvalidEscape { value: s.clone() };

    let mut decoded: Vec<u8> = Vec::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0_u8; 4];
            decoded.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        let escape = chars.next().ok_or_else(invalid)?;
        match escape {
            'a' => decoded.push(0x07),
            'b' => decoded.push(0x08),
            'f' => decoded.push(0x0c),
            'n' => decoded.push(b'\n'),
            'r' => decoded.push(b'\r'),
            't' => decoded.push(b'\t'),
            'v' => decoded.push(0x0b),
            '\\' => decoded.push(b'\\'),
            'x' => {
                let value = read_digits(&mut chars, 2, 16).ok_or_else(invalid)?;
                decoded.push(u8::try_from(value).map_err(|_| invalid())?);
            }
            'u' | 'U' => {
                let len = if escape == 'u' { 4 } else { 8 };
                let value = read_digits(&mut chars, len, 16).ok_or_else(invalid)?;
                let c = char::from_u32(value).ok_or_else(invalid)?;
                let mut buf = [0_u8; 4];
                decoded.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            '0'..='7' => {
                let rest = read_digits(&mut chars, 2, 8).ok_or_else(invalid)?;
                let value = escape.to_digit(8).ok_or_else(invalid)? * 64 + rest;
                decoded.push(u8::try_from(value).map_err(|_| invalid())?);
            }
            _ => return Err(invalid()),
        }
    }

    // Byte escapes may spell invalid UTF-8; those bytes become U+FFFD.
    Ok(String::from_utf8_lossy(&decoded).into_owned())
}

fn read_digits(chars: &mut std::str::Chars<'_>, len: usize, radix: u32) -> Option<u32> {
    (0..len).try_fold(0_u32, |acc, _| {
        let digit = chars.next()?.to_digit(radix)?;
        Some(acc * radix + digit)
    })
}
