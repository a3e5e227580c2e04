#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pairwise checks answered by a Nominatim geocoder.
//!
//! Every lookup is sent in each configured language plus the languages
//! spoken in the input's country, both as a free-form and as a structured
//! search. The returned addresses are normalized with their own country's
//! rules and fuzzy-matched against the input with a looser policy than the
//! list matchers use, since geocoder results are noisier.
//!
//! Postal codes are compared by containment in either direction, so a
//! partial postal code on either side still counts.

pub mod address;
pub mod api;
pub mod languages;

use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use openpaq_matching::get_matches;
use openpaq_matching_models::MatchSeverityConfig;
use openpaq_models::{
    CityPostalCode, CityStreetPostalCode, NormalizedInput, PairMatcher, PairMatching,
    PostalCodeStreet, merge_until, remove_duplicates,
};
use openpaq_normalizer::NormalizerRegistry;
use thiserror::Error;
use tokio::time::Instant;

pub use address::{AddressComponents, ParsedResult, remove_duplicate_results};
pub use api::{HttpNominatimApi, NominatimApi, StructuredQuery};

/// Countries whose street names are matched with partial matching enabled.
const PARTIAL_STREET_COUNTRIES: &[&str] = &["pl", "es", "it", "de", "gb"];

/// Errors from Nominatim requests.
#[derive(Debug, Error)]
pub enum NominatimError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with something other than 200.
    #[error("HTTP status code not 200, instead: {0}")]
    Status(u16),

    /// The response body is not a search result list.
    #[error("Invalid response body: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default)]
struct RequestParameters {
    city: String,
    street: String,
    postal_code: String,
    country_code: String,
}

/// Whether two postal codes are both present and one contains the other.
fn postal_codes_overlap(input: &str, found: &str) -> bool {
    !input.is_empty() && !found.is_empty() && (input.contains(found) || found.contains(input))
}

/// [`PairMatcher`] backed by a Nominatim instance.
pub struct Nominatim {
    api: Arc<dyn NominatimApi>,
    languages: Vec<String>,
    config: MatchSeverityConfig,
    normalizers: NormalizerRegistry,
}

impl std::fmt::Debug for Nominatim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Nominatim")
            .field("languages", &self.languages)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Nominatim {
    #[must_use]
    pub fn new(
        api: Arc<dyn NominatimApi>,
        languages: Vec<String>,
        config: MatchSeverityConfig,
        normalizers: NormalizerRegistry,
    ) -> Self {
        Self {
            api,
            languages,
            config,
            normalizers,
        }
    }

    /// Creates a matcher talking HTTP to the instance at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`NominatimError`] if the HTTP client cannot be built.
    pub fn connect(
        base_url: &str,
        languages: Vec<String>,
        config: MatchSeverityConfig,
        normalizers: NormalizerRegistry,
    ) -> Result<Self, NominatimError> {
        let api = HttpNominatimApi::new(base_url)?;
        log::info!("Using Nominatim at {}", api.endpoint());

        Ok(Self::new(Arc::new(api), languages, config, normalizers))
    }

    fn street_config(&self, country_code: &str) -> MatchSeverityConfig {
        let mut config = self.config.clone();
        if PARTIAL_STREET_COUNTRIES.contains(&country_code) {
            config.allow_partial_match = true;
            config.allow_partial_compare_list_match = true;
        }
        config
    }

    fn city_config(&self) -> MatchSeverityConfig {
        MatchSeverityConfig {
            allow_partial_match: true,
            allow_partial_compare_list_match: true,
            ..self.config.clone()
        }
    }

    /// Searches in every language concurrently and returns the normalized
    /// results. Results that fail to normalize are dropped.
    async fn request(&self, params: &RequestParameters) -> Vec<ParsedResult> {
        let languages = languages::request_languages(&self.languages, &params.country_code);

        let search_text = [
            params.postal_code.as_str(),
            params.street.as_str(),
            params.city.as_str(),
        ]
        .join(",");
        let query = StructuredQuery {
            street: params.street.clone(),
            city: params.city.clone(),
            postal_code: params.postal_code.clone(),
        };

        let parsed = Mutex::new(Vec::new());

        {
            let parsed = &parsed;
            let search_text = &search_text;
            let query = &query;

            futures::future::join_all(languages.iter().map(|language| async move {
                let (free_text, structured) = futures::future::join(
                    self.api.search_by_free_text(search_text, Some(1), language),
                    self.api.search_by_structured_params(query, None, language),
                )
                .await;

                let mut found = Vec::new();
                match (free_text, structured) {
                    (Err(free_text_error), Err(structured_error)) => {
                        log::warn!(
                            "Nominatim search in {language:?} failed: {free_text_error}; {structured_error}"
                        );
                        return;
                    }
                    (free_text, structured) => {
                        for response in [free_text, structured] {
                            match response {
                                Ok(results) => found.extend(results),
                                Err(e) => {
                                    log::debug!("Nominatim search in {language:?} failed: {e}");
                                }
                            }
                        }
                    }
                }

                for components in found {
                    let normalizer = self
                        .normalizers
                        .get(&components.country_code.to_lowercase());

                    match components.parse().normalize(normalizer.as_ref()) {
                        Ok(result) => parsed
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(result),
                        Err(e) => log::debug!("Dropping Nominatim result: {e}"),
                    }
                }
            }))
            .await;
        }

        parsed.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks every input street up together with the city.
    pub async fn city_street_check(&self, input: &NormalizedInput) -> PairMatching {
        let street_config = self.street_config(&input.country_code);
        let city_config = self.city_config();

        let mut matches = Vec::new();

        for street in &input.streets {
            let results = remove_duplicate_results(
                self.request(&RequestParameters {
                    city: input.city.clone(),
                    street: street.clone(),
                    country_code: input.country_code.clone(),
                    ..RequestParameters::default()
                })
                .await,
            );

            for result in &results {
                let Ok(street_matches) = get_matches(street, &result.streets, &street_config)
                else {
                    continue;
                };
                let Ok(city_matches) = get_matches(&input.city, &result.cities, &city_config)
                else {
                    continue;
                };

                for street_match in &street_matches {
                    for city_match in &city_matches {
                        if city_match.similarity > 0.0 && street_match.similarity > 0.0 {
                            matches.push(CityStreetPostalCode {
                                city: city_match.value.clone(),
                                street: street_match.value.clone(),
                                postal_code: result.postal_code.clone(),
                                country_code: result.country_code.clone(),
                                street_similarity: street_match.similarity,
                                was_partial_street_match: street_match.was_partial,
                                city_similarity: city_match.similarity,
                                was_partial_city_match: city_match.was_partial,
                                was_list_match: false,
                            });
                        }
                    }
                }
            }
        }

        let matches = remove_duplicates(&matches);

        PairMatching {
            street_city_match: !matches.is_empty(),
            street_city_matches: matches,
            ..PairMatching::default()
        }
    }

    /// Reuses `city_street` records carrying the input's postal code, and
    /// only searches when there are none.
    pub async fn postal_code_street_check(
        &self,
        input: &NormalizedInput,
        city_street: &[CityStreetPostalCode],
    ) -> PairMatching {
        let known: Vec<PostalCodeStreet> = city_street
            .iter()
            .filter(|record| postal_codes_overlap(&input.postal_code, &record.postal_code))
            .map(|record| PostalCodeStreet {
                postal_code: record.postal_code.clone(),
                street: record.street.clone(),
                country_code: record.country_code.clone(),
                street_similarity: record.street_similarity,
                was_partial_street_match: record.was_partial_street_match,
                was_list_match: record.was_list_match,
            })
            .collect();

        if !known.is_empty() {
            return PairMatching {
                postal_code_street_match: true,
                postal_code_street_matches: known,
                ..PairMatching::default()
            };
        }

        let street_config = self.street_config(&input.country_code);
        let mut matches = Vec::new();

        for street in &input.streets {
            // British postcodes narrow structured searches too much.
            let postal_code = if input.country_code == "gb" {
                String::new()
            } else {
                input.postal_code.clone()
            };

            let results = remove_duplicate_results(
                self.request(&RequestParameters {
                    street: street.clone(),
                    postal_code,
                    country_code: input.country_code.clone(),
                    ..RequestParameters::default()
                })
                .await,
            );

            for result in &results {
                let Ok(street_matches) = get_matches(street, &result.streets, &street_config)
                else {
                    continue;
                };

                if !postal_codes_overlap(&input.postal_code, &result.postal_code) {
                    continue;
                }

                for street_match in street_matches {
                    matches.push(PostalCodeStreet {
                        postal_code: result.postal_code.clone(),
                        street: street_match.value,
                        country_code: result.country_code.clone(),
                        street_similarity: street_match.similarity,
                        was_partial_street_match: street_match.was_partial,
                        was_list_match: false,
                    });
                }
            }
        }

        let matches = remove_duplicates(&matches);

        PairMatching {
            postal_code_street_match: !matches.is_empty(),
            postal_code_street_matches: matches,
            ..PairMatching::default()
        }
    }

    /// Reuses `city_street` records carrying the input's postal code, and
    /// only searches when there are none.
    pub async fn postal_code_city_check(
        &self,
        input: &NormalizedInput,
        city_street: &[CityStreetPostalCode],
    ) -> PairMatching {
        let known: Vec<CityPostalCode> = city_street
            .iter()
            .filter(|record| postal_codes_overlap(&input.postal_code, &record.postal_code))
            .map(|record| CityPostalCode {
                city: record.city.clone(),
                postal_code: record.postal_code.clone(),
                country_code: record.country_code.clone(),
                city_similarity: record.city_similarity,
                was_partial_city_match: record.was_partial_city_match,
                was_list_match: record.was_list_match,
            })
            .collect();

        if !known.is_empty() {
            return PairMatching {
                city_postal_code_match: true,
                city_postal_code_matches: known,
                ..PairMatching::default()
            };
        }

        let by_postal_code = RequestParameters {
            postal_code: input.postal_code.clone(),
            country_code: input.country_code.clone(),
            ..RequestParameters::default()
        };
        let by_postal_code_and_city = RequestParameters {
            city: input.city.clone(),
            ..by_postal_code.clone()
        };

        let (mut results, more_results) = futures::future::join(
            self.request(&by_postal_code),
            self.request(&by_postal_code_and_city),
        )
        .await;
        results.extend(more_results);
        let results = remove_duplicate_results(results);

        let city_config = self.city_config();
        let mut matches = Vec::new();

        for result in &results {
            let Ok(city_matches) = get_matches(&input.city, &result.cities, &city_config) else {
                continue;
            };

            if !postal_codes_overlap(&input.postal_code, &result.postal_code) {
                continue;
            }

            for city_match in city_matches {
                matches.push(CityPostalCode {
                    city: city_match.value,
                    postal_code: result.postal_code.clone(),
                    country_code: result.country_code.clone(),
                    city_similarity: city_match.similarity,
                    was_partial_city_match: city_match.was_partial,
                    was_list_match: false,
                });
            }
        }

        let matches = remove_duplicates(&matches);

        PairMatching {
            city_postal_code_match: !matches.is_empty(),
            city_postal_code_matches: matches,
            ..PairMatching::default()
        }
    }
}

#[async_trait::async_trait]
impl PairMatcher for Nominatim {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn handle(&self, input: &NormalizedInput, deadline: Instant) -> PairMatching {
        let Ok(mut result) = tokio::time::timeout_at(deadline, self.city_street_check(input)).await
        else {
            log::warn!(
                "Nominatim city/street check for {:?} hit the deadline",
                input.country_code
            );
            return PairMatching::default();
        };

        let city_street = result.street_city_matches.clone();

        let rest = merge_until(
            deadline,
            [
                self.postal_code_city_check(input, &city_street).boxed(),
                self.postal_code_street_check(input, &city_street).boxed(),
            ],
        )
        .await;

        result.merge(rest);
        result
    }
}
