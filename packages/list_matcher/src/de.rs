//! German address list.
//!
//! Cities are looked up among the cities sharing the input's first letter,
//! then their postal codes lead to the streets.

use openpaq_matching::get_matches;
use openpaq_matching_models::{MatchResult, MatchSeverityConfig};
use openpaq_models::{
    CityPostalCode, CityStreetPostalCode, NormalizedInput, PairMatching, PostalCodeStreet,
};

use crate::index::{
    CityPostalCodeIndex, FirstLetterIndex, ListDataSource, PostalCodeStreetIndex,
    first_letter_cities,
};
use crate::{CountryMatcher, ListMatcherError};

const COUNTRY_CODE: &str = "de";

const CITY_THRESHOLD: f32 = 0.9;

/// List matcher backed by the German address list.
#[derive(Debug)]
pub struct De {
    config: MatchSeverityConfig,
    postal_code_street: PostalCodeStreetIndex,
    city_postal_code: CityPostalCodeIndex,
    first_letter_cities: FirstLetterIndex,
}

impl De {
    /// Loads the complete address list from `source` and indexes it.
    ///
    /// # Errors
    ///
    /// Returns [`ListMatcherError`] if `source` cannot deliver the list.
    pub fn new(
        source: &dyn ListDataSource,
        config: MatchSeverityConfig,
    ) -> Result<Self, ListMatcherError> {
        let normalizer = openpaq_normalizer::De;

        log::info!("Building postal code/street index for {COUNTRY_CODE}");
        let postal_code_street = source.postal_code_street_index(&normalizer)?;

        log::info!("Building city/postal code index for {COUNTRY_CODE}");
        let city_postal_code = source.city_postal_code_index(&normalizer)?;

        let first_letter_cities = first_letter_cities(&city_postal_code);

        log::info!(
            "Built {COUNTRY_CODE} indices: {} postal codes, {} cities",
            postal_code_street.len(),
            city_postal_code.len()
        );

        Ok(Self {
            config,
            postal_code_street,
            city_postal_code,
            first_letter_cities,
        })
    }

    fn city_config(&self) -> MatchSeverityConfig {
        MatchSeverityConfig {
            algorithm_threshold: CITY_THRESHOLD,
            allow_partial_match: true,
            allow_partial_compare_list_match: true,
            partial_input_separators: vec![" ".to_string(), "/".to_string(), "-".to_string()],
            ..self.config.clone()
        }
    }

    fn street_config(&self) -> MatchSeverityConfig {
        MatchSeverityConfig {
            allow_partial_match: true,
            allow_combine_all_forward_combinations: true,
            partial_exclude_words: vec!["straße".to_string()],
            ..self.config.clone()
        }
    }

    /// Known cities similar to `city`.
    fn city_candidates(&self, city: &str) -> Vec<MatchResult> {
        let Some(first) = city.chars().next() else {
            return Vec::new();
        };
        let Some(cities) = self.first_letter_cities.get(&first) else {
            return Vec::new();
        };

        get_matches(city, cities, &self.city_config()).unwrap_or_default()
    }

    /// Streets of `postal_code` matching any of `streets`.
    fn street_matches(&self, streets: &[String], postal_code: &str) -> Vec<PostalCodeStreet> {
        let Some(item) = self.postal_code_street.get(postal_code) else {
            return Vec::new();
        };

        let normalized: Vec<String> = item
            .streets
            .iter()
            .map(|street| street.normalized.clone())
            .collect();
        let config = self.street_config();

        let mut matches = Vec::new();

        for input_street in streets {
            let Ok(candidates) = get_matches(input_street, &normalized, &config) else {
                continue;
            };

            for candidate in &candidates {
                for street in item
                    .streets
                    .iter()
                    .filter(|street| street.normalized == candidate.value)
                {
                    matches.push(PostalCodeStreet {
                        postal_code: item.postal_code.clone(),
                        street: street.raw.clone(),
                        country_code: COUNTRY_CODE.to_string(),
                        street_similarity: candidate.similarity,
                        was_partial_street_match: candidate.was_partial,
                        was_list_match: true,
                    });
                }
            }
        }

        matches
    }
}

impl CountryMatcher for De {
    fn country_code(&self) -> &'static str {
        COUNTRY_CODE
    }

    fn city_street_check(&self, input: &NormalizedInput) -> PairMatching {
        if input.city.is_empty() {
            return PairMatching::default();
        }

        let mut matches = Vec::new();

        for city in self.city_candidates(&input.city) {
            let Some(item) = self.city_postal_code.get(&city.value) else {
                continue;
            };

            for postal_code in &item.postal_codes {
                for street in self.street_matches(&input.streets, &postal_code.normalized) {
                    matches.push(CityStreetPostalCode {
                        city: item.city.clone(),
                        street: street.street,
                        postal_code: street.postal_code,
                        country_code: COUNTRY_CODE.to_string(),
                        street_similarity: street.street_similarity,
                        was_partial_street_match: street.was_partial_street_match,
                        city_similarity: city.similarity,
                        was_partial_city_match: city.was_partial,
                        was_list_match: true,
                    });
                }
            }
        }

        PairMatching {
            street_city_match: !matches.is_empty(),
            street_city_matches: matches,
            ..PairMatching::default()
        }
    }

    fn postal_code_street_check(&self, input: &NormalizedInput) -> PairMatching {
        let matches = self.street_matches(&input.streets, &input.postal_code);

        PairMatching {
            postal_code_street_match: !matches.is_empty(),
            postal_code_street_matches: matches,
            ..PairMatching::default()
        }
    }

    fn postal_code_city_check(&self, input: &NormalizedInput) -> PairMatching {
        if input.city.is_empty() {
            return PairMatching::default();
        }

        let mut matches = Vec::new();

        for city in self.city_candidates(&input.city) {
            let Some(item) = self.city_postal_code.get(&city.value) else {
                continue;
            };

            // Postal codes have to match exactly.
            for postal_code in item
                .postal_codes
                .iter()
                .filter(|postal_code| postal_code.normalized == input.postal_code)
            {
                matches.push(CityPostalCode {
                    city: item.city.clone(),
                    postal_code: postal_code.raw.clone(),
                    country_code: COUNTRY_CODE.to_string(),
                    city_similarity: city.similarity,
                    was_partial_city_match: city.was_partial,
                    was_list_match: true,
                });
            }
        }

        PairMatching {
            city_postal_code_match: !matches.is_empty(),
            city_postal_code_matches: matches,
            ..PairMatching::default()
        }
    }
}
