#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pairwise checks answered from authoritative address lists.
//!
//! Each supported country loads its list once at startup into in-memory
//! indices (see [`index`]). At request time the three checks run on the
//! blocking pool, since fuzzy matching against thousands of candidates is
//! CPU-bound.

pub mod de;
pub mod duckdb_source;
pub mod index;

use std::collections::BTreeMap;
use std::sync::Arc;

use openpaq_matching_models::MatchSeverityConfig;
use openpaq_models::{
    NormalizedInput, PairMatcher, PairMatching, merge_until, receive, spawn_blocking_check,
};
use tokio::time::Instant;

pub use de::De;
pub use duckdb_source::DuckDbListSource;
pub use index::ListDataSource;

/// Errors raised while loading an address list.
#[derive(Debug, thiserror::Error)]
pub enum ListMatcherError {
    /// The backing database failed.
    #[error("address list database error: {0}")]
    Database(#[from] duckdb::Error),

    /// The list source is misconfigured.
    #[error("invalid address list configuration: {0}")]
    Config(String),

    /// No list matcher exists for the country.
    #[error("no address list matcher for country {0:?}")]
    UnsupportedCountry(String),
}

/// The three pairwise checks for one country's address list.
pub trait CountryMatcher: Send + Sync {
    /// Lowercase ISO code of the country this list covers.
    fn country_code(&self) -> &'static str;

    fn city_street_check(&self, input: &NormalizedInput) -> PairMatching;

    fn postal_code_street_check(&self, input: &NormalizedInput) -> PairMatching;

    fn postal_code_city_check(&self, input: &NormalizedInput) -> PairMatching;
}

/// Dispatches to the [`CountryMatcher`] of the input's country.
pub struct ListMatcher {
    config: MatchSeverityConfig,
    matchers: BTreeMap<&'static str, Arc<dyn CountryMatcher>>,
}

impl std::fmt::Debug for ListMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListMatcher")
            .field("config", &self.config)
            .field("countries", &self.matchers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ListMatcher {
    /// Creates a matcher without any country.
    #[must_use]
    pub const fn new(config: MatchSeverityConfig) -> Self {
        Self {
            config,
            matchers: BTreeMap::new(),
        }
    }

    /// Adds `matcher`, replacing any earlier one for the same country.
    pub fn register(&mut self, matcher: Arc<dyn CountryMatcher>) {
        log::info!("Registered address list for {}", matcher.country_code());
        self.matchers.insert(matcher.country_code(), matcher);
    }

    /// Builds the built-in matcher for `country_code` from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ListMatcherError::UnsupportedCountry`] for countries
    /// without a list matcher, or the source's error if the list cannot be
    /// loaded.
    pub fn register_country(
        &mut self,
        country_code: &str,
        source: &dyn ListDataSource,
    ) -> Result<(), ListMatcherError> {
        let matcher: Arc<dyn CountryMatcher> = match country_code.to_lowercase().as_str() {
            "de" => Arc::new(De::new(source, self.config.clone())?),
            other => return Err(ListMatcherError::UnsupportedCountry(other.to_string())),
        };

        self.register(matcher);

        Ok(())
    }

    /// Matching parameters the country matchers were built with.
    #[must_use]
    pub const fn config(&self) -> &MatchSeverityConfig {
        &self.config
    }

    /// Whether an address list is loaded for `country_code`.
    #[must_use]
    pub fn possible(&self, country_code: &str) -> bool {
        self.matchers.contains_key(country_code)
    }

    /// Countries with a loaded address list.
    pub fn country_codes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.matchers.keys().copied()
    }
}

#[async_trait::async_trait]
impl PairMatcher for ListMatcher {
    fn name(&self) -> &'static str {
        "list"
    }

    async fn handle(&self, input: &NormalizedInput, deadline: Instant) -> PairMatching {
        let Some(matcher) = self.matchers.get(input.country_code.as_str()) else {
            log::error!(
                "List matcher called for unsupported country {:?}",
                input.country_code
            );
            return PairMatching::default();
        };

        let checks = [
            {
                let matcher = matcher.clone();
                let input = input.clone();
                spawn_blocking_check(move || matcher.city_street_check(&input))
            },
            {
                let matcher = matcher.clone();
                let input = input.clone();
                spawn_blocking_check(move || matcher.postal_code_street_check(&input))
            },
            {
                let matcher = matcher.clone();
                let input = input.clone();
                spawn_blocking_check(move || matcher.postal_code_city_check(&input))
            },
        ];

        merge_until(deadline, checks.into_iter().map(receive)).await
    }
}
