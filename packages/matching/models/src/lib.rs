#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Similarity algorithm and match severity types.
//!
//! A [`MatchSeverityConfig`] describes how strict a fuzzy comparison is:
//! which algorithm scores a full comparison, which one scores a partial
//! (token-level) comparison, and the thresholds each score has to reach.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// String similarity algorithm used to score a candidate.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Algorithm {
    /// Classic insert/delete/substitute edit distance.
    #[default]
    Levenshtein,
    /// Edit distance that also counts adjacent transpositions.
    DamerauLevenshtein,
    /// Optimal string alignment (restricted Damerau-Levenshtein).
    OsaDamerauLevenshtein,
    /// Longest common subsequence edit distance.
    Lcs,
    /// Positional mismatch count; only defined for equal lengths.
    Hamming,
    /// Jaro similarity.
    Jaro,
    /// Jaro similarity with a common-prefix bonus.
    JaroWinkler,
}

/// How strict a fuzzy comparison is.
///
/// Thresholds are inclusive and expected in `[0, 1]`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchSeverityConfig {
    /// Algorithm used for the full-string comparison.
    #[serde(rename = "matching_algorithm")]
    pub algorithm: Algorithm,
    /// Minimum similarity of a full-string match.
    #[serde(rename = "matching_threshold")]
    pub algorithm_threshold: f32,
    /// Split the query into sub-phrases and match those as well.
    pub allow_partial_match: bool,
    /// Split candidates into sub-phrases and match query pieces against them.
    pub allow_partial_compare_list_match: bool,
    /// Algorithm used for partial comparisons.
    #[serde(rename = "partial_matching_algorithm")]
    pub partial_algorithm: Algorithm,
    /// Minimum similarity of a partial match.
    #[serde(rename = "partial_matching_threshold")]
    pub partial_algorithm_threshold: f32,
    /// Separators used to split the query (defaults to a single space).
    pub partial_input_separators: Vec<String>,
    /// Words dropped from both query pieces and candidates.
    pub partial_exclude_words: Vec<String>,
    /// Separators used to split candidates (defaults to a single space).
    pub partial_compare_list_separators: Vec<String>,
    /// Use every forward-contiguous token run instead of single tokens.
    pub allow_combine_all_forward_combinations: bool,
    /// Carried for reporting; not used by the engine.
    pub allowed_amount_of_changed_chars: i32,
}

impl MatchSeverityConfig {
    /// Builds a config with the same algorithm and threshold for full and
    /// partial comparisons and every optional mode switched off.
    #[must_use]
    pub fn new(algorithm: Algorithm, threshold: f32) -> Self {
        Self {
            algorithm,
            algorithm_threshold: threshold,
            partial_algorithm: algorithm,
            partial_algorithm_threshold: threshold,
            ..Self::default()
        }
    }
}

/// One candidate that cleared the threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// The candidate value as it appeared in the compare list.
    pub value: String,
    /// Similarity between the query and `value`, usually in `[0, 1]`.
    pub similarity: f32,
    /// Whether the match was found through sub-phrase comparison.
    pub was_partial: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_algorithm_is_levenshtein() {
        assert_eq!(Algorithm::default(), Algorithm::Levenshtein);
    }

    #[test]
    fn algorithm_parses_from_snake_case() {
        let algorithm: Algorithm = "damerau_levenshtein".parse().unwrap();
        assert_eq!(algorithm, Algorithm::DamerauLevenshtein);
        assert_eq!(Algorithm::JaroWinkler.to_string(), "jaro_winkler");
    }

    #[test]
    fn config_uses_wire_names() {
        let config = MatchSeverityConfig::new(Algorithm::Lcs, 0.8);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["matching_algorithm"], "lcs");
        assert_eq!(json["partial_matching_algorithm"], "lcs");
        assert!(json.get("matching_threshold").is_some());
        assert!(json.get("allowed_amount_of_changed_chars").is_some());
    }

    #[test]
    fn config_fills_missing_fields_with_defaults() {
        let config: MatchSeverityConfig =
            serde_json::from_str(r#"{"matching_threshold": 0.9}"#).unwrap();
        assert!((config.algorithm_threshold - 0.9).abs() < f32::EPSILON);
        assert!(!config.allow_partial_match);
        assert!(config.partial_input_separators.is_empty());
    }
}
