//! Pairwise string similarity scores.
//!
//! Edit-distance algorithms are turned into a similarity with
//! `(longest - distance) / longest`, measured in chars.

use openpaq_matching_models::Algorithm;

use crate::MatchError;

/// Scores how similar `a` and `b` are under `algorithm`.
///
/// # Errors
///
/// Returns [`MatchError::UnequalLength`] for [`Algorithm::Hamming`] when the
/// strings differ in length.
#[allow(clippy::cast_possible_truncation)]
pub fn similarity(a: &str, b: &str, algorithm: Algorithm) -> Result<f32, MatchError> {
    Ok(match algorithm {
        Algorithm::Levenshtein => matching_index(a, b, strsim::levenshtein(a, b)),
        Algorithm::DamerauLevenshtein => matching_index(a, b, strsim::damerau_levenshtein(a, b)),
        Algorithm::OsaDamerauLevenshtein => matching_index(a, b, strsim::osa_distance(a, b)),
        Algorithm::Lcs => matching_index(a, b, lcs_edit_distance(a, b)),
        Algorithm::Hamming => {
            let distance = strsim::hamming(a, b).map_err(|_| MatchError::UnequalLength {
                left: a.to_string(),
                right: b.to_string(),
            })?;
            matching_index(a, b, distance)
        }
        Algorithm::Jaro => strsim::jaro(a, b) as f32,
        Algorithm::JaroWinkler => strsim::jaro_winkler(a, b) as f32,
    })
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
fn matching_index(a: &str, b: &str, distance: usize) -> f32 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }

    (longest as i64 - distance as i64) as f32 / longest as f32
}

/// Length of the longest common subsequence of `a` and `b`, in chars.
#[must_use]
pub fn lcs(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let mut previous = vec![0_usize; b.len() + 1];
    let mut current = vec![0_usize; b.len() + 1];

    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            current[j + 1] = if ca == cb {
                previous[j] + 1
            } else {
                current[j].max(previous[j + 1])
            };
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Number of insertions and deletions needed to turn `a` into `b`.
#[must_use]
pub fn lcs_edit_distance(a: &str, b: &str) -> usize {
    a.chars().count() + b.chars().count() - 2 * lcs(a, b)
}
