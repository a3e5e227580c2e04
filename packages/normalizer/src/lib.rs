#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Per-country normalization of raw address input.
//!
//! Every supported country implements [`Normalizer`]: it turns a raw city,
//! postal code or street line into the canonical form the matchers compare
//! against. Countries without dedicated rules fall back to [`Generic`].
//!
//! Each country's rules are an ordered chain of substitutions; the order
//! matters (abbreviations are expanded before special characters are
//! stripped, for example), so every chain is kept self-contained in its
//! own module.

pub mod at;
pub mod ch;
pub mod de;
pub mod dk;
pub mod es;
pub mod fr;
pub mod gb;
pub mod generic;
pub mod it;
pub mod nl;
pub mod pl;
pub mod si;
pub mod us;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use at::At;
pub use ch::Ch;
pub use de::De;
pub use dk::Dk;
pub use es::Es;
pub use fr::Fr;
pub use gb::Gb;
pub use generic::Generic;
pub use it::It;
pub use nl::Nl;
pub use pl::Pl;
pub use si::Si;
pub use us::Us;

/// Country code of the fallback normalizer.
pub const GENERIC_COUNTRY_CODE: &str = "generic";

/// Errors raised while normalizing a single field.
///
/// Normalization errors are never fatal: callers record them and keep
/// going with [`NormalizeError::best_effort`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// The cleaned postal code does not have the expected shape.
    #[error("invalid postal code {value:?}: {reason}")]
    InvalidPostalCode {
        /// Best-effort cleaned value.
        value: String,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// The input contains a backslash escape that cannot be decoded.
    #[error("invalid escape sequence in {value:?}")]
    InvalidEscape {
        /// The offending input.
        value: String,
    },
}

impl NormalizeError {
    pub(crate) fn invalid_postal_code(value: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidPostalCode {
            value: value.into(),
            reason,
        }
    }

    /// The value to continue with when the error is ignored.
    #[must_use]
    pub fn best_effort(&self) -> &str {
        match self {
            Self::InvalidPostalCode { value, .. } => value,
            Self::InvalidEscape { .. } => "",
        }
    }
}

/// Country-specific canonicalization of address fields.
pub trait Normalizer: Send + Sync {
    /// Lowercase ISO country code this normalizer handles, or
    /// [`GENERIC_COUNTRY_CODE`].
    fn country_code(&self) -> &'static str;

    /// Normalizes a city name.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] if the city cannot be decoded.
    fn city(&self, city: &str) -> Result<String, NormalizeError>;

    /// Normalizes a postal code.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError::InvalidPostalCode`] if the cleaned value
    /// does not have the country's postal code shape.
    fn postal_code(&self, postal_code: &str) -> Result<String, NormalizeError>;

    /// Normalizes a raw street line into one or more comparable phrases.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] if the street cannot be decoded.
    fn street(&self, street: &str) -> Result<Vec<String>, NormalizeError>;
}

/// Looks up the [`Normalizer`] for a country code.
#[derive(Clone)]
pub struct NormalizerRegistry {
    normalizers: BTreeMap<&'static str, Arc<dyn Normalizer>>,
    fallback: Arc<dyn Normalizer>,
}

impl std::fmt::Debug for NormalizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NormalizerRegistry")
            .field("countries", &self.normalizers.keys().collect::<Vec<_>>())
            .field("fallback", &self.fallback.country_code())
            .finish()
    }
}

impl Default for NormalizerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl NormalizerRegistry {
    /// Registry with every built-in country and [`Generic`] as fallback.
    #[must_use]
    pub fn new() -> Self {
        Self::with_fallback(GENERIC_COUNTRY_CODE)
    }

    /// Registry with every built-in country, falling back to the normalizer
    /// registered for `fallback` (or [`Generic`] if there is none).
    #[must_use]
    pub fn with_fallback(fallback: &str) -> Self {
        let all: [Arc<dyn Normalizer>; 13] = [
            Arc::new(Generic),
            Arc::new(De),
            Arc::new(Dk),
            Arc::new(Us),
            Arc::new(Es),
            Arc::new(Pl),
            Arc::new(At),
            Arc::new(Gb),
            Arc::new(Nl),
            Arc::new(It),
            Arc::new(Fr),
            Arc::new(Ch),
            Arc::new(Si),
        ];

        let mut normalizers = BTreeMap::new();
        for normalizer in all {
            normalizers
                .entry(normalizer.country_code())
                .or_insert(normalizer);
        }

        let fallback = normalizers
            .get(fallback)
            .cloned()
            .unwrap_or_else(|| Arc::new(Generic) as Arc<dyn Normalizer>);

        Self {
            normalizers,
            fallback,
        }
    }

    /// Returns the normalizer for `country_code`, or the fallback.
    #[must_use]
    pub fn get(&self, country_code: &str) -> Arc<dyn Normalizer> {
        self.normalizers.get(country_code).map_or_else(
            || {
                log::trace!(
                    "No normalizer for country {country_code:?}, using {}",
                    self.fallback.country_code()
                );
                self.fallback.clone()
            },
            Arc::clone,
        )
    }

    /// Country codes with a registered normalizer.
    pub fn country_codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.normalizers.keys().copied()
    }
}

/// Splits on `|` into phrases, drops tokens of `min_token_len` bytes or
/// fewer, and drops phrases that end up shorter than two bytes.
pub(crate) fn split_phrases(address: &str, min_token_len: usize) -> Vec<String> {
    address
        .split('|')
        .filter_map(|part| {
            let phrase = part
                .split(' ')
                .filter(|token| token.len() > min_token_len)
                .collect::<Vec<_>>()
                .join(" ");
            (phrase.len() > 1).then_some(phrase)
        })
        .collect()
}

/// Removes empty and repeated phrases, keeping first occurrences in order.
pub(crate) fn dedup_phrases(phrases: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(phrases.len());
    for phrase in phrases {
        if !phrase.is_empty() && !result.contains(&phrase) {
            result.push(phrase);
        }
    }
    result
}

/// The first `len` bytes of `s`, shortened to the nearest char boundary.
pub(crate) fn truncate_bytes(s: &str, len: usize) -> &str {
    if s.len() <= len {
        return s;
    }
    let mut end = len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Applies `(from, to)` literal replacements in order.
pub(crate) fn replace_all_literal(s: &str, replacements: &[(&str, &str)]) -> String {
    replacements
        .iter()
        .fold(s.to_string(), |acc, (from, to)| acc.replace(from, to))
}
