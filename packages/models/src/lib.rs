#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Shared address types.
//!
//! An [`Input`] is normalized once per request into a [`NormalizedInput`].
//! Each matcher answers the three pairwise checks with a [`PairMatching`],
//! and the merged evidence is condensed into a [`SourceOfTruth`].

pub mod recorder;
pub mod source;

use openpaq_matching_models::MatchSeverityConfig;
use openpaq_normalizer::Normalizer;
use serde::{Deserialize, Serialize};

pub use recorder::{CountingErrorRecorder, ErrorRecorder, LogErrorRecorder, log_recorder};
pub use source::{
    PairMatcher, SpawnedMatcher, merge_until, receive, spawn_blocking_check, spawn_handle,
};

/// Raw, untrusted address as supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Input {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country_code: String,
}

/// Address after country-specific canonicalization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedInput {
    /// Every comparable phrase the street line produced, in order.
    pub streets: Vec<String>,
    pub city: String,
    pub postal_code: String,
    pub country_code: String,
}

fn normalize_country_code(country_code: &str) -> String {
    country_code.to_lowercase().replace(' ', "")
}

impl Input {
    /// Normalizes every field with `normalizer`.
    ///
    /// Failures never abort: an invalid postal code keeps its best-effort
    /// value, and an empty city or street list is still returned. Each
    /// failure is reported to `recorder`.
    #[must_use]
    pub fn normalize(
        &self,
        normalizer: &dyn Normalizer,
        recorder: &dyn ErrorRecorder,
    ) -> NormalizedInput {
        let country_code = normalize_country_code(&self.country_code);

        let postal_code = match normalizer.postal_code(&self.postal_code) {
            Ok(postal_code) => postal_code,
            Err(e) => {
                log::debug!("Postal code {:?} for {country_code}: {e}", self.postal_code);
                recorder.record_error("postal_code", &country_code);
                e.best_effort().to_string()
            }
        };

        let city = match normalizer.city(&self.city) {
            Ok(city) => city.to_lowercase(),
            Err(e) => {
                log::debug!("City {:?} for {country_code}: {e}", self.city);
                String::new()
            }
        };
        if city.is_empty() {
            recorder.record_error("city", &city);
        }

        let streets = match normalizer.street(&self.street.to_lowercase()) {
            Ok(streets) => streets,
            Err(e) => {
                log::debug!("Street {:?} for {country_code}: {e}", self.street);
                Vec::new()
            }
        };
        if streets.is_empty() {
            recorder.record_error("street", &self.street);
        }

        NormalizedInput {
            streets,
            city,
            postal_code,
            country_code,
        }
    }
}

/// The verdict: which address parts were corroborated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct SourceOfTruth {
    pub street_matched: bool,
    pub city_matched: bool,
    pub postal_code_matched: bool,
    pub city_to_postal_code_matched: bool,
    pub country_code_matched: bool,
}

impl SourceOfTruth {
    /// Whether every part was corroborated.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.street_matched
            && self.city_matched
            && self.postal_code_matched
            && self.city_to_postal_code_matched
            && self.country_code_matched
    }
}

/// A city that was found together with a postal code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityPostalCode {
    pub city: String,
    pub postal_code: String,
    pub country_code: String,
    pub city_similarity: f32,
    pub was_partial_city_match: bool,
    pub was_list_match: bool,
}

/// A street that was found in a city.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityStreetPostalCode {
    pub city: String,
    pub street: String,
    pub postal_code: String,
    pub country_code: String,
    pub street_similarity: f32,
    pub was_partial_street_match: bool,
    pub city_similarity: f32,
    pub was_partial_city_match: bool,
    pub was_list_match: bool,
}

/// A street that was found within a postal code area.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostalCodeStreet {
    pub postal_code: String,
    pub street: String,
    pub country_code: String,
    pub street_similarity: f32,
    pub was_partial_street_match: bool,
    pub was_list_match: bool,
}

/// Evidence collected by the three pairwise checks.
///
/// A single check fills only its own pair of fields; the orchestrator
/// merges the partial results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairMatching {
    pub postal_code_street_match: bool,
    pub postal_code_street_matches: Vec<PostalCodeStreet>,
    pub street_city_match: bool,
    pub street_city_matches: Vec<CityStreetPostalCode>,
    pub city_postal_code_match: bool,
    pub city_postal_code_matches: Vec<CityPostalCode>,
}

impl PairMatching {
    /// Folds `other` into `self`: flags are OR-ed, records appended.
    pub fn merge(&mut self, other: Self) {
        self.postal_code_street_match |= other.postal_code_street_match;
        self.postal_code_street_matches
            .extend(other.postal_code_street_matches);
        self.street_city_match |= other.street_city_match;
        self.street_city_matches.extend(other.street_city_matches);
        self.city_postal_code_match |= other.city_postal_code_match;
        self.city_postal_code_matches
            .extend(other.city_postal_code_matches);
    }

    /// Whether no check found anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.postal_code_street_match
            && !self.street_city_match
            && !self.city_postal_code_match
            && self.postal_code_street_matches.is_empty()
            && self.street_city_matches.is_empty()
            && self.city_postal_code_matches.is_empty()
    }
}

/// Verdict returned to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    #[serde(flatten)]
    pub input: Input,
    #[serde(flatten)]
    pub source_of_truth: SourceOfTruth,
    pub version: String,
}

/// Evidence behind a verdict.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugDetails {
    /// Matching parameters the matchers ran with.
    pub parameters: MatchSeverityConfig,
    pub city_street_matches: Vec<CityStreetPostalCode>,
    pub postal_code_street_matches: Vec<PostalCodeStreet>,
    pub city_postal_code_matches: Vec<CityPostalCode>,
}

impl DebugDetails {
    /// Copies the match records out of `matching`, each distinct record
    /// once.
    #[must_use]
    pub fn new(parameters: MatchSeverityConfig, matching: &PairMatching) -> Self {
        Self {
            parameters,
            city_street_matches: remove_duplicates(&matching.street_city_matches),
            postal_code_street_matches: remove_duplicates(&matching.postal_code_street_matches),
            city_postal_code_matches: remove_duplicates(&matching.city_postal_code_matches),
        }
    }
}

/// Verdict plus the evidence trail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugResult {
    #[serde(flatten)]
    pub result: CheckResult,
    pub details: DebugDetails,
}

/// Removes repeated items, keeping the first occurrence of each.
#[must_use]
pub fn remove_duplicates<T: PartialEq + Clone>(items: &[T]) -> Vec<T> {
    let mut result: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !result.contains(item) {
            result.push(item.clone());
        }
    }
    result
}

/// Whether any record in `matching` belongs to `country_code`.
#[must_use]
pub fn country_code_check(country_code: &str, matching: &PairMatching) -> bool {
    let country_code = country_code.to_lowercase();

    matching
        .city_postal_code_matches
        .iter()
        .any(|m| m.country_code == country_code)
        || matching
            .postal_code_street_matches
            .iter()
            .any(|m| m.country_code == country_code)
        || matching
            .street_city_matches
            .iter()
            .any(|m| m.country_code == country_code)
}
