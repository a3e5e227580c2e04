#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fuzzy matching of a query string against a list of candidates.
//!
//! [`get_matches`] runs a full-string search and, when enabled, a partial
//! search that compares sub-phrases of the query (and optionally of the
//! candidates). Every hit is reported once, with the best similarity it
//! reached, ordered from most to least similar.

pub mod similarity;

use std::collections::BTreeMap;

use openpaq_matching_models::{Algorithm, MatchResult, MatchSeverityConfig};

pub use similarity::similarity;

/// How many of the most similar candidates a fuzzy search considers.
const FUZZY_SEARCH_QUANTITY: usize = 10;

/// Errors produced by the similarity engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    /// Nothing cleared the configured threshold.
    #[error("no matches found")]
    NoMatches,

    /// The algorithm cannot compare strings of different lengths.
    #[error("cannot compare {left:?} and {right:?}: lengths differ")]
    UnequalLength {
        /// Left-hand string.
        left: String,
        /// Right-hand string.
        right: String,
    },
}

/// Returns every candidate in `compare_to` that matches `input` under
/// `config`, deduplicated by value and sorted by descending similarity.
///
/// # Errors
///
/// Returns [`MatchError::NoMatches`] if neither the full nor the partial
/// search produced a result.
pub fn get_matches(
    input: &str,
    compare_to: &[String],
    config: &MatchSeverityConfig,
) -> Result<Vec<MatchResult>, MatchError> {
    let mut result = Vec::new();

    if let Ok(matches) = calculate_similarity(
        input,
        compare_to,
        config.algorithm,
        config.algorithm_threshold,
    ) {
        result.extend(matches);
    }

    if config.allow_partial_match {
        result.extend(partial_matches(input, compare_to, config));
    }

    if result.is_empty() {
        return Err(MatchError::NoMatches);
    }

    Ok(clean_match_results(result))
}

fn partial_matches(
    input: &str,
    compare_to: &[String],
    config: &MatchSeverityConfig,
) -> Vec<MatchResult> {
    let input_separators = separators_or_space(&config.partial_input_separators);

    let split_inputs = if config.allow_combine_all_forward_combinations {
        combine_all_forward_combinations(input, &input_separators)
    } else {
        split_string(input, &input_separators)
    };

    let split_inputs = filter_list(split_inputs, &config.partial_exclude_words);
    let compare_to = filter_list(compare_to.to_vec(), &config.partial_exclude_words);

    let mut result = Vec::new();

    for split_input in &split_inputs {
        let Ok(matches) = calculate_similarity(
            split_input,
            &compare_to,
            config.partial_algorithm,
            config.partial_algorithm_threshold,
        ) else {
            continue;
        };

        for item in matches {
            match similarity(input, &item.value, config.partial_algorithm) {
                Ok(score) => result.push(MatchResult {
                    value: item.value,
                    similarity: score,
                    was_partial: true,
                }),
                Err(e) => log::trace!("Skipping partial match {:?}: {e}", item.value),
            }
        }
    }

    if config.allow_partial_compare_list_match {
        let compare_separators = separators_or_space(&config.partial_compare_list_separators);

        for split_input in &split_inputs {
            for compare_item in &compare_to {
                let pieces = filter_list(
                    split_string(compare_item, &compare_separators),
                    &config.partial_exclude_words,
                );

                let Ok(matches) = calculate_similarity(
                    split_input,
                    &pieces,
                    config.partial_algorithm,
                    config.partial_algorithm_threshold,
                ) else {
                    continue;
                };

                for _ in matches {
                    match similarity(input, compare_item, config.partial_algorithm) {
                        Ok(score) => result.push(MatchResult {
                            value: compare_item.clone(),
                            similarity: score,
                            was_partial: true,
                        }),
                        Err(e) => log::trace!("Skipping compare list match {compare_item:?}: {e}"),
                    }
                }
            }
        }
    }

    result
}

fn separators_or_space(separators: &[String]) -> Vec<String> {
    if separators.is_empty() {
        vec![" ".to_string()]
    } else {
        separators.to_vec()
    }
}

/// Keeps the most similar distinct candidates and drops those below
/// `threshold`.
fn calculate_similarity(
    value: &str,
    allowed_values: &[String],
    algorithm: Algorithm,
    threshold: f32,
) -> Result<Vec<MatchResult>, MatchError> {
    let mut scored: Vec<(&str, f32)> = Vec::with_capacity(allowed_values.len());

    for candidate in allowed_values {
        if scored.iter().any(|(known, _)| *known == candidate.as_str()) {
            continue;
        }
        scored.push((candidate, similarity(value, candidate, algorithm)?));
    }

    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    Ok(scored
        .into_iter()
        .take(FUZZY_SEARCH_QUANTITY)
        .filter(|(candidate, score)| !candidate.is_empty() && *score >= threshold)
        .map(|(candidate, score)| MatchResult {
            value: candidate.to_string(),
            similarity: score,
            was_partial: false,
        })
        .collect())
}

/// Keeps the best result per value and sorts by descending similarity.
///
/// Ties keep the order in which values were first seen.
fn clean_match_results(input: Vec<MatchResult>) -> Vec<MatchResult> {
    let mut order: Vec<String> = Vec::new();
    let mut best: BTreeMap<String, MatchResult> = BTreeMap::new();

    for res in input {
        match best.get(&res.value) {
            Some(known) if known.similarity >= res.similarity => {}
            Some(_) => {
                best.insert(res.value.clone(), res);
            }
            None => {
                order.push(res.value.clone());
                best.insert(res.value.clone(), res);
            }
        }
    }

    let mut cleaned: Vec<MatchResult> = order
        .iter()
        .filter_map(|value| best.remove(value))
        .collect();

    cleaned.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    cleaned
}

fn filter_list(input: Vec<String>, exclude: &[String]) -> Vec<String> {
    input
        .into_iter()
        .filter(|candidate| !exclude.contains(candidate))
        .collect()
}

fn split_string(input: &str, separators: &[String]) -> Vec<String> {
    separators
        .iter()
        .flat_map(|sep| input.split(sep.as_str()).map(str::to_string))
        .collect()
}

/// Every forward-contiguous run of tokens, joined with a space.
///
/// `"a b c"` becomes `a`, `a b`, `a b c`, `b`, `b c`, `c`.
#[must_use]
pub fn combine_all_forward_combinations(input: &str, separators: &[String]) -> Vec<String> {
    let words = split_string(input, separators);
    let mut result = Vec::new();

    for start in 0..words.len() {
        for end in start..words.len() {
            result.push(words[start..=end].join(" "));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(value: &str, similarity: f32, was_partial: bool) -> MatchResult {
        MatchResult {
            value: value.to_string(),
            similarity,
            was_partial,
        }
    }

    fn list(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn assert_results(actual: &[MatchResult], expected: &[MatchResult]) {
        assert_eq!(
            actual.len(),
            expected.len(),
            "got {actual:?}, expected {expected:?}"
        );
        for (a, e) in actual.iter().zip(expected) {
            assert_eq!(a.value, e.value);
            assert_eq!(a.was_partial, e.was_partial, "partial flag of {}", a.value);
            assert!(
                (a.similarity - e.similarity).abs() < 1e-6,
                "similarity of {}: got {}, expected {}",
                a.value,
                a.similarity,
                e.similarity
            );
        }
    }

    fn lcs_config(threshold: f32) -> MatchSeverityConfig {
        MatchSeverityConfig {
            algorithm: Algorithm::Lcs,
            algorithm_threshold: threshold,
            ..MatchSeverityConfig::default()
        }
    }

    #[test]
    fn simple_match() {
        let res = get_matches("word", &list(&["word"]), &lcs_config(1.0)).unwrap();
        assert_results(&res, &[result("word", 1.0, false)]);
    }

    #[test]
    fn no_match_is_an_error() {
        assert_eq!(
            get_matches("stuff", &list(&["word"]), &lcs_config(1.0)),
            Err(MatchError::NoMatches)
        );
    }

    #[test]
    fn threshold_too_high() {
        assert!(get_matches("wordz", &list(&["word"]), &lcs_config(1.0)).is_err());
    }

    #[test]
    fn threshold_is_inclusive() {
        let res = get_matches("wordz", &list(&["word"]), &lcs_config(0.8)).unwrap();
        assert_results(&res, &[result("word", 0.8, false)]);
    }

    #[test]
    fn multiple_results_sorted_descending() {
        let res = get_matches(
            "word",
            &list(&["word", "word2", "word33"]),
            &lcs_config(0.6),
        )
        .unwrap();
        assert_results(
            &res,
            &[
                result("word", 1.0, false),
                result("word2", 0.8, false),
                result("word33", 0.666_666_7, false),
            ],
        );
    }

    #[test]
    fn empty_candidate_list_has_no_matches() {
        assert!(get_matches("word", &[], &lcs_config(0.0)).is_err());
    }

    #[test]
    fn empty_candidates_are_ignored() {
        let res = get_matches("word", &list(&["", "word"]), &lcs_config(0.0)).unwrap();
        assert_results(&res, &[result("word", 1.0, false)]);
    }

    #[test]
    fn partial_match_keeps_full_match_unflagged() {
        let config = MatchSeverityConfig {
            allow_partial_match: true,
            ..lcs_config(1.0)
        };
        let res = get_matches("word", &list(&["word"]), &config).unwrap();
        assert_results(&res, &[result("word", 1.0, false)]);
    }

    #[test]
    fn partial_match_rescored_against_full_input() {
        let config = MatchSeverityConfig {
            partial_algorithm_threshold: 1.0,
            allow_partial_match: true,
            ..lcs_config(1.0)
        };
        let res = get_matches("word asdf", &list(&["word", "word asdfg"]), &config).unwrap();
        assert_results(&res, &[result("word", 0.444_444_45, true)]);
    }

    #[test]
    fn full_and_partial_results_are_merged() {
        let config = MatchSeverityConfig {
            allow_partial_match: true,
            ..lcs_config(1.0)
        };
        let res = get_matches("word asdf", &list(&["word", "word asdf"]), &config).unwrap();
        assert_results(
            &res,
            &[
                result("word asdf", 1.0, false),
                result("word", 0.444_444_45, true),
            ],
        );
    }

    #[test]
    fn partial_match_with_lcs() {
        let config = MatchSeverityConfig {
            allow_partial_match: true,
            partial_algorithm: Algorithm::Lcs,
            partial_algorithm_threshold: 0.5,
            ..lcs_config(1.0)
        };
        let res = get_matches("word asdf", &list(&["word1"]), &config).unwrap();
        assert_results(&res, &[result("word1", 0.333_333_34, true)]);
    }

    fn compare_list_config(partial_threshold: f32) -> MatchSeverityConfig {
        MatchSeverityConfig {
            partial_algorithm: Algorithm::Lcs,
            partial_algorithm_threshold: partial_threshold,
            allow_partial_match: true,
            allow_partial_compare_list_match: true,
            ..lcs_config(0.9)
        }
    }

    #[test]
    fn compare_list_match_records_whole_candidate() {
        let res = get_matches(
            "word",
            &list(&["stuff before word1", "word two"]),
            &compare_list_config(0.8),
        )
        .unwrap();
        assert_results(
            &res,
            &[
                result("word two", 0.5, true),
                result("stuff before word1", 0.222_222_22, true),
            ],
        );
    }

    #[test]
    fn compare_list_match_respects_partial_threshold() {
        let res = get_matches(
            "word",
            &list(&["stuff before word1", "word two"]),
            &compare_list_config(1.0),
        )
        .unwrap();
        assert_results(&res, &[result("word two", 0.5, true)]);
    }

    #[test]
    fn compare_list_match_can_score_zero() {
        let res = get_matches(
            "stuff word",
            &list(&["stuff before word1", "word two"]),
            &compare_list_config(0.8),
        )
        .unwrap();
        assert_results(
            &res,
            &[
                result("stuff before word1", 0.555_555_6, true),
                result("word two", 0.0, true),
            ],
        );
    }

    #[test]
    fn compare_list_match_exact_pieces_only() {
        let res = get_matches(
            "stuff word",
            &list(&["stuff before word1", "word1 two"]),
            &compare_list_config(1.0),
        )
        .unwrap();
        assert_results(&res, &[result("stuff before word1", 0.555_555_6, true)]);
    }

    #[test]
    fn exclude_words_are_ignored() {
        let config = MatchSeverityConfig {
            partial_exclude_words: list(&["stuff"]),
            ..compare_list_config(1.0)
        };
        let res = get_matches(
            "stuff word",
            &list(&["stuff before word1", "word two"]),
            &config,
        )
        .unwrap();
        assert_results(&res, &[result("word two", 0.0, true)]);
    }

    #[test]
    fn forward_combinations_find_multi_word_candidates() {
        let config = MatchSeverityConfig {
            partial_algorithm: Algorithm::Lcs,
            partial_algorithm_threshold: 1.0,
            allow_partial_match: true,
            allow_combine_all_forward_combinations: true,
            ..lcs_config(0.9)
        };
        let res = get_matches(
            "stuff before word stuff behind",
            &list(&["word stuff"]),
            &config,
        )
        .unwrap();
        assert_results(&res, &[result("word stuff", 0.333_333_34, true)]);
    }

    #[test]
    fn forward_combinations_of_three_tokens() {
        assert_eq!(
            combine_all_forward_combinations("a b c", &list(&[" "])),
            list(&["a", "a b", "a b c", "b", "b c", "c"])
        );
    }

    #[test]
    fn results_are_unique_and_above_threshold() {
        let config = MatchSeverityConfig {
            allow_partial_match: true,
            allow_partial_compare_list_match: true,
            partial_algorithm: Algorithm::Levenshtein,
            partial_algorithm_threshold: 0.5,
            ..MatchSeverityConfig::new(Algorithm::Levenshtein, 0.5)
        };
        let candidates = list(&["main street", "main", "street", "main street", "mian"]);
        let res = get_matches("main street", &candidates, &config).unwrap();

        for (i, a) in res.iter().enumerate() {
            assert!(res[i + 1..].iter().all(|b| b.value != a.value));
        }
        assert!(res.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        assert!(res.iter().filter(|r| !r.was_partial).all(|r| r.similarity >= 0.5));
    }

    #[test]
    fn hamming_search_fails_on_unequal_candidate() {
        let config = MatchSeverityConfig::new(Algorithm::Hamming, 0.5);
        assert!(get_matches("abc", &list(&["abd", "ab"]), &config).is_err());
        let res = get_matches("abc", &list(&["abd"]), &config).unwrap();
        assert_results(&res, &[result("abd", 0.666_666_7, false)]);
    }
}
