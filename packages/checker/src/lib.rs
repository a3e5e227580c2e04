#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request orchestration.
//!
//! A [`Checker`] normalizes an [`Input`], consults the matchers that cover
//! its country and condenses their evidence into a [`SourceOfTruth`].
//!
//! When an address list is loaded for the country, the list matcher and
//! the external matcher race: the first one to corroborate every part of
//! the address wins outright, otherwise the evidence of both is combined.
//! Other countries are answered by the external matcher alone. Everything
//! is bounded by a per-request deadline.

pub mod config;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use openpaq_database::ResultCache;
use openpaq_database::cache::{load_result, store_result};
use openpaq_list_matcher::ListMatcher;
use openpaq_matching_models::MatchSeverityConfig;
use openpaq_models::{
    CheckResult, DebugDetails, DebugResult, ErrorRecorder, Input, NormalizedInput, PairMatcher,
    PairMatching, SourceOfTruth, country_code_check, log_recorder, spawn_handle,
};
use openpaq_normalizer::NormalizerRegistry;
use sha2::{Digest, Sha256};
use tokio::time::Instant;

pub use config::MatcherConfig;

/// How long a single request may spend in the matchers.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3 * 60);

/// Country answered by the local address database when one is configured.
const LOCAL_DB_COUNTRY: &str = "si";

/// Errors raised while setting up a [`Checker`].
#[derive(Debug, thiserror::Error)]
pub enum CheckerError {
    /// The matcher configuration could not be parsed.
    #[error("Invalid matcher configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Condenses `matching` into a verdict for an address in `country_code`.
///
/// The flag is `true` when every part of the address was corroborated.
#[must_use]
pub fn eval(matching: &PairMatching, country_code: &str) -> (SourceOfTruth, bool) {
    let source = SourceOfTruth {
        street_matched: matching.street_city_match || matching.postal_code_street_match,
        city_matched: matching.city_postal_code_match || matching.street_city_match,
        postal_code_matched: matching.postal_code_street_match || matching.city_postal_code_match,
        city_to_postal_code_matched: matching.city_postal_code_match,
        country_code_matched: country_code_check(country_code, matching),
    };

    (source, source.is_complete())
}

const fn combine(left: SourceOfTruth, right: SourceOfTruth) -> SourceOfTruth {
    SourceOfTruth {
        street_matched: left.street_matched || right.street_matched,
        city_matched: left.city_matched || right.city_matched,
        postal_code_matched: left.postal_code_matched || right.postal_code_matched,
        city_to_postal_code_matched: left.city_to_postal_code_matched
            || right.city_to_postal_code_matched,
        country_code_matched: left.country_code_matched || right.country_code_matched,
    }
}

/// Cache key of a normalized address for a service version.
#[must_use]
pub fn cache_key(input: &NormalizedInput, version: &str) -> String {
    let digest = Sha256::digest(format!(
        "{:?}{}{}{}{version}",
        input.streets, input.city, input.postal_code, input.country_code
    ));
    hex::encode(digest)
}

/// Runs the matchers for a request.
pub struct Checker {
    normalizers: NormalizerRegistry,
    recorder: Arc<dyn ErrorRecorder>,
    list_matcher: Option<Arc<ListMatcher>>,
    external: Arc<dyn PairMatcher>,
    local_db: Option<Arc<dyn PairMatcher>>,
    cache: Option<Arc<dyn ResultCache>>,
    version: String,
    timeout: Duration,
}

impl std::fmt::Debug for Checker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checker")
            .field("list_matcher", &self.list_matcher)
            .field("external", &self.external.name())
            .field("local_db", &self.local_db.as_ref().map(|db| db.name()))
            .field("cache", &self.cache.is_some())
            .field("version", &self.version)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Checker {
    /// Creates a checker that answers every country with `external`.
    #[must_use]
    pub fn new(external: Arc<dyn PairMatcher>, version: impl Into<String>) -> Self {
        Self {
            normalizers: NormalizerRegistry::new(),
            recorder: log_recorder(),
            list_matcher: None,
            external,
            local_db: None,
            cache: None,
            version: version.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Races `list_matcher` against the external matcher for the countries
    /// it covers.
    #[must_use]
    pub fn with_list_matcher(mut self, list_matcher: Arc<ListMatcher>) -> Self {
        self.list_matcher = Some(list_matcher);
        self
    }

    /// Answers Slovenian addresses with `local_db` instead of the external
    /// matcher.
    #[must_use]
    pub fn with_local_db(mut self, local_db: Arc<dyn PairMatcher>) -> Self {
        self.local_db = Some(local_db);
        self
    }

    /// Serves repeated addresses from `cache`.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Reports normalization failures to `recorder`.
    #[must_use]
    pub fn with_recorder(mut self, recorder: Arc<dyn ErrorRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    /// Overrides [`DEFAULT_TIMEOUT`].
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Service version stamped on every result.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Matching parameters reported with debug details.
    #[must_use]
    pub fn parameters(&self) -> MatchSeverityConfig {
        self.list_matcher
            .as_ref()
            .map(|list_matcher| list_matcher.config().clone())
            .unwrap_or_default()
    }

    /// Checks `input` and returns the verdict with its evidence.
    ///
    /// Never fails: collaborator errors only reduce the evidence.
    pub async fn check(&self, input: &Input) -> DebugResult {
        let start = std::time::Instant::now();

        let input_lower = Input {
            country_code: input.country_code.to_lowercase(),
            ..input.clone()
        };
        let normalizer = self.normalizers.get(&input_lower.country_code);
        let normalized = input_lower.normalize(normalizer.as_ref(), self.recorder.as_ref());
        let key = cache_key(&normalized, &self.version);

        if let Some(cached) = self.cached(&key, input).await {
            return cached;
        }

        let deadline = Instant::now() + self.timeout;
        let (source_of_truth, matching) = self.run_matchers(&normalized, deadline).await;

        let result = DebugResult {
            result: CheckResult {
                input: input_lower,
                source_of_truth,
                version: self.version.clone(),
            },
            details: DebugDetails::new(self.parameters(), &matching),
        };

        if let Some(cache) = &self.cache
            && let Err(e) = store_result(cache.as_ref(), &key, &result).await
        {
            log::error!("Failed to store result in cache: {e}");
        }

        log::debug!(
            "Checked {:?} address in {}ms",
            normalized.country_code,
            start.elapsed().as_millis()
        );

        result
    }

    /// Cached result for `key`, carrying the caller's `input` as given.
    async fn cached(&self, key: &str, input: &Input) -> Option<DebugResult> {
        let cache = self.cache.as_ref()?;

        match load_result(cache.as_ref(), key).await {
            Ok(Some(mut cached)) => {
                log::debug!("Got result from cache");
                cached.result.input = input.clone();
                cached.details.parameters = self.parameters();
                Some(cached)
            }
            Ok(None) => None,
            Err(e) => {
                log::error!("Failed to read result cache: {e}");
                None
            }
        }
    }

    fn external_for(&self, country_code: &str) -> Arc<dyn PairMatcher> {
        match &self.local_db {
            Some(local_db) if country_code == LOCAL_DB_COUNTRY => local_db.clone(),
            _ => self.external.clone(),
        }
    }

    async fn run_matchers(
        &self,
        input: &NormalizedInput,
        deadline: Instant,
    ) -> (SourceOfTruth, PairMatching) {
        let external = self.external_for(&input.country_code);

        match &self.list_matcher {
            Some(list_matcher) if list_matcher.possible(&input.country_code) => {
                let list_matcher: Arc<dyn PairMatcher> = list_matcher.clone();
                let sources = [
                    spawn_handle(list_matcher, input.clone(), deadline),
                    spawn_handle(external, input.clone(), deadline),
                ];
                race(&input.country_code, deadline, sources).await
            }
            _ => {
                let matching =
                    match tokio::time::timeout_at(deadline, external.handle(input, deadline)).await
                    {
                        Ok(matching) => matching,
                        Err(_) => {
                            log::warn!("{} did not answer before the deadline", external.name());
                            PairMatching::default()
                        }
                    };
                let (source, _) = eval(&matching, &input.country_code);
                (source, matching)
            }
        }
    }
}

/// Takes the first source whose evidence is complete, or combines the
/// evidence of every source that answers before `deadline`.
///
/// Sources still pending when this returns are dropped, which cancels
/// spawned matchers.
async fn race<I>(country_code: &str, deadline: Instant, sources: I) -> (SourceOfTruth, PairMatching)
where
    I: IntoIterator,
    I::Item: Future<Output = PairMatching>,
{
    let mut pending: FuturesUnordered<I::Item> = sources.into_iter().collect();
    let mut source = SourceOfTruth::default();
    let mut matching = PairMatching::default();

    loop {
        match tokio::time::timeout_at(deadline, pending.next()).await {
            Ok(Some(partial)) => {
                let (partial_source, complete) = eval(&partial, country_code);
                if complete {
                    return (partial_source, partial);
                }
                source = combine(source, partial_source);
                matching.merge(partial);
            }
            Ok(None) => break,
            Err(_) => {
                log::warn!(
                    "Deadline reached with {} matchers outstanding",
                    pending.len()
                );
                break;
            }
        }
    }

    (source, matching)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use openpaq_database::DuckDbResultCache;
    use openpaq_list_matcher::CountryMatcher;
    use openpaq_matching_models::Algorithm;
    use openpaq_models::{
        CityPostalCode, CityStreetPostalCode, CountingErrorRecorder, PostalCodeStreet,
    };

    use super::*;

    fn street_city(country_code: &str) -> PairMatching {
        PairMatching {
            street_city_match: true,
            street_city_matches: vec![CityStreetPostalCode {
                city: "astadt".to_string(),
                street: "eins straße".to_string(),
                postal_code: "12345".to_string(),
                country_code: country_code.to_string(),
                street_similarity: 1.0,
                was_partial_street_match: false,
                city_similarity: 1.0,
                was_partial_city_match: false,
                was_list_match: false,
            }],
            ..PairMatching::default()
        }
    }

    fn postal_code_street(country_code: &str) -> PairMatching {
        PairMatching {
            postal_code_street_match: true,
            postal_code_street_matches: vec![PostalCodeStreet {
                postal_code: "12345".to_string(),
                street: "eins straße".to_string(),
                country_code: country_code.to_string(),
                street_similarity: 1.0,
                was_partial_street_match: false,
                was_list_match: false,
            }],
            ..PairMatching::default()
        }
    }

    fn city_postal_code(country_code: &str) -> PairMatching {
        PairMatching {
            city_postal_code_match: true,
            city_postal_code_matches: vec![CityPostalCode {
                city: "astadt".to_string(),
                postal_code: "12345".to_string(),
                country_code: country_code.to_string(),
                city_similarity: 1.0,
                was_partial_city_match: false,
                was_list_match: false,
            }],
            ..PairMatching::default()
        }
    }

    fn complete(country_code: &str) -> PairMatching {
        let mut matching = street_city(country_code);
        matching.merge(postal_code_street(country_code));
        matching.merge(city_postal_code(country_code));
        matching
    }

    struct MockMatcher {
        result: PairMatching,
        delay: Duration,
        calls: AtomicUsize,
        finished: AtomicBool,
    }

    impl MockMatcher {
        fn new(result: PairMatching) -> Arc<Self> {
            Self::slow(result, Duration::ZERO)
        }

        fn slow(result: PairMatching, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                result,
                delay,
                calls: AtomicUsize::new(0),
                finished: AtomicBool::new(false),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn finished(&self) -> bool {
            self.finished.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl PairMatcher for MockMatcher {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn handle(&self, _input: &NormalizedInput, _deadline: Instant) -> PairMatching {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.finished.store(true, Ordering::SeqCst);
            self.result.clone()
        }
    }

    /// Address list answering each check with a fixed result.
    #[derive(Default)]
    struct MockCountry {
        city_street: PairMatching,
        postal_code_street: PairMatching,
        postal_code_city: PairMatching,
    }

    impl CountryMatcher for MockCountry {
        fn country_code(&self) -> &'static str {
            "de"
        }

        fn city_street_check(&self, _input: &NormalizedInput) -> PairMatching {
            self.city_street.clone()
        }

        fn postal_code_street_check(&self, _input: &NormalizedInput) -> PairMatching {
            self.postal_code_street.clone()
        }

        fn postal_code_city_check(&self, _input: &NormalizedInput) -> PairMatching {
            self.postal_code_city.clone()
        }
    }

    fn list_config() -> MatchSeverityConfig {
        MatchSeverityConfig::new(Algorithm::Lcs, 0.9)
    }

    fn list_matcher(country: MockCountry) -> Arc<ListMatcher> {
        let mut list_matcher = ListMatcher::new(list_config());
        list_matcher.register(Arc::new(country));
        Arc::new(list_matcher)
    }

    fn input(country_code: &str) -> Input {
        Input {
            street: "Eins-Straße 1".to_string(),
            city: "AStadt".to_string(),
            postal_code: "12345".to_string(),
            country_code: country_code.to_string(),
        }
    }

    #[test]
    fn eval_complete_evidence() {
        let (source, complete) = eval(&complete("de"), "DE");

        assert!(complete);
        assert!(source.is_complete());
    }

    #[test]
    fn eval_wrong_country_is_incomplete() {
        let (source, complete) = eval(&complete("at"), "de");

        assert!(!complete);
        assert_eq!(
            source,
            SourceOfTruth {
                street_matched: true,
                city_matched: true,
                postal_code_matched: true,
                city_to_postal_code_matched: true,
                country_code_matched: false,
            }
        );
    }

    #[test]
    fn eval_street_city_only() {
        let (source, complete) = eval(&street_city("de"), "de");

        assert!(!complete);
        assert_eq!(
            source,
            SourceOfTruth {
                street_matched: true,
                city_matched: true,
                postal_code_matched: false,
                city_to_postal_code_matched: false,
                country_code_matched: true,
            }
        );
    }

    #[test]
    fn eval_nothing() {
        assert_eq!(
            eval(&PairMatching::default(), "de"),
            (SourceOfTruth::default(), false)
        );
    }

    #[test]
    fn cache_key_depends_on_version() {
        let input = NormalizedInput {
            streets: vec!["eins straße".to_string()],
            city: "astadt".to_string(),
            postal_code: "12345".to_string(),
            country_code: "de".to_string(),
        };

        let key = cache_key(&input, "1.0.0");
        assert_eq!(key.len(), 64);
        assert_eq!(key, cache_key(&input, "1.0.0"));
        assert_ne!(key, cache_key(&input, "1.0.1"));
    }

    #[tokio::test]
    async fn external_only_for_countries_without_list() {
        let external = MockMatcher::new(street_city("fr"));
        let list_country = MockCountry {
            city_street: complete("de"),
            ..MockCountry::default()
        };
        let checker = Checker::new(external.clone(), "1.0.0")
            .with_list_matcher(list_matcher(list_country));

        let result = checker.check(&input("FR")).await;

        assert_eq!(external.calls(), 1);
        assert_eq!(result.result.input.country_code, "fr");
        assert_eq!(result.result.version, "1.0.0");
        assert_eq!(
            result.result.source_of_truth,
            SourceOfTruth {
                street_matched: true,
                city_matched: true,
                postal_code_matched: false,
                city_to_postal_code_matched: false,
                country_code_matched: true,
            }
        );
        assert_eq!(result.details.city_street_matches.len(), 1);
        assert_eq!(result.details.parameters, list_config());
    }

    #[tokio::test]
    async fn parameters_are_default_without_list() {
        let checker = Checker::new(MockMatcher::new(PairMatching::default()), "1.0.0");

        let result = checker.check(&input("de")).await;

        assert_eq!(result.details.parameters, MatchSeverityConfig::default());
        assert_eq!(result.result.source_of_truth, SourceOfTruth::default());
    }

    #[tokio::test]
    async fn complete_list_evidence_wins_the_race() {
        let external = MockMatcher::slow(PairMatching::default(), Duration::from_secs(30));
        let checker = Checker::new(external.clone(), "1.0.0").with_list_matcher(list_matcher(
            MockCountry {
                city_street: street_city("de"),
                postal_code_street: postal_code_street("de"),
                postal_code_city: city_postal_code("de"),
            },
        ));

        let result = tokio::time::timeout(Duration::from_secs(5), checker.check(&input("de")))
            .await
            .unwrap();

        assert!(result.result.source_of_truth.is_complete());
        assert_eq!(result.details.city_postal_code_matches.len(), 1);
    }

    #[tokio::test]
    async fn losing_matcher_is_cancelled() {
        let external = MockMatcher::slow(postal_code_street("de"), Duration::from_millis(300));
        let checker = Checker::new(external.clone(), "1.0.0")
            .with_list_matcher(list_matcher(MockCountry {
                city_street: street_city("de"),
                postal_code_street: postal_code_street("de"),
                postal_code_city: city_postal_code("de"),
            }));

        let result = checker.check(&input("de")).await;
        assert!(result.result.source_of_truth.is_complete());

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(!external.finished());
    }

    #[tokio::test]
    async fn matchers_are_cancelled_at_the_deadline() {
        let external = MockMatcher::slow(postal_code_street("de"), Duration::from_millis(500));
        let checker = Checker::new(external.clone(), "1.0.0")
            .with_list_matcher(list_matcher(MockCountry::default()))
            .with_timeout(Duration::from_millis(100));

        checker.check(&input("de")).await;

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(!external.finished());
    }

    #[tokio::test]
    async fn partial_evidence_is_combined() {
        let external = MockMatcher::new(postal_code_street("de"));
        let checker = Checker::new(external.clone(), "1.0.0").with_list_matcher(list_matcher(
            MockCountry {
                city_street: street_city("de"),
                ..MockCountry::default()
            },
        ));

        let result = checker.check(&input("de")).await;

        assert_eq!(external.calls(), 1);
        assert_eq!(
            result.result.source_of_truth,
            SourceOfTruth {
                street_matched: true,
                city_matched: true,
                postal_code_matched: true,
                city_to_postal_code_matched: false,
                country_code_matched: true,
            }
        );
        assert_eq!(result.details.city_street_matches.len(), 1);
        assert_eq!(result.details.postal_code_street_matches.len(), 1);
        assert!(result.details.city_postal_code_matches.is_empty());
    }

    #[tokio::test]
    async fn duplicate_records_are_reported_once() {
        let external = MockMatcher::new(street_city("de"));
        let checker = Checker::new(external, "1.0.0").with_list_matcher(list_matcher(
            MockCountry {
                city_street: street_city("de"),
                ..MockCountry::default()
            },
        ));

        let result = checker.check(&input("de")).await;

        assert_eq!(result.details.city_street_matches.len(), 1);
    }

    #[tokio::test]
    async fn deadline_keeps_evidence_that_arrived() {
        let external = MockMatcher::slow(postal_code_street("de"), Duration::from_secs(30));
        let checker = Checker::new(external, "1.0.0")
            .with_list_matcher(list_matcher(MockCountry {
                city_street: street_city("de"),
                ..MockCountry::default()
            }))
            .with_timeout(Duration::from_millis(200));

        let result = tokio::time::timeout(Duration::from_secs(5), checker.check(&input("de")))
            .await
            .unwrap();

        assert!(result.result.source_of_truth.street_matched);
        assert!(!result.result.source_of_truth.postal_code_matched);
        assert!(result.details.postal_code_street_matches.is_empty());
    }

    #[tokio::test]
    async fn slow_external_matcher_yields_empty_verdict() {
        let external = MockMatcher::slow(complete("fr"), Duration::from_secs(30));
        let checker =
            Checker::new(external, "1.0.0").with_timeout(Duration::from_millis(100));

        let result = tokio::time::timeout(Duration::from_secs(5), checker.check(&input("fr")))
            .await
            .unwrap();

        assert_eq!(result.result.source_of_truth, SourceOfTruth::default());
        assert!(result.details.city_street_matches.is_empty());
    }

    #[tokio::test]
    async fn slovenian_addresses_use_local_db() {
        let external = MockMatcher::new(complete("si"));
        let local_db = MockMatcher::new(street_city("si"));
        let checker = Checker::new(external.clone(), "1.0.0").with_local_db(local_db.clone());

        let result = checker.check(&input("SI")).await;

        assert_eq!(external.calls(), 0);
        assert_eq!(local_db.calls(), 1);
        assert!(result.result.source_of_truth.street_matched);
        assert!(!result.result.source_of_truth.postal_code_matched);

        checker.check(&input("at")).await;
        assert_eq!(external.calls(), 1);
        assert_eq!(local_db.calls(), 1);
    }

    #[tokio::test]
    async fn cached_results_are_replayed_with_raw_input() {
        let external = MockMatcher::new(street_city("de"));
        let cache = Arc::new(DuckDbResultCache::open_in_memory().unwrap());
        let checker = Checker::new(external.clone(), "1.0.0").with_cache(cache);

        let first = checker.check(&input("de")).await;
        let second = checker.check(&input("DE")).await;

        assert_eq!(external.calls(), 1);
        assert_eq!(second.result.input, input("DE"));
        assert_eq!(second.result.source_of_truth, first.result.source_of_truth);
        assert_eq!(second.details, first.details);
    }

    #[tokio::test]
    async fn normalization_failures_are_recorded() {
        let recorder = Arc::new(CountingErrorRecorder::new());
        let checker = Checker::new(MockMatcher::new(PairMatching::default()), "1.0.0")
            .with_recorder(recorder.clone());

        checker
            .check(&Input {
                city: String::new(),
                ..input("de")
            })
            .await;

        assert_eq!(recorder.count("city", ""), 1);
    }
}
