//! Matcher tuning shipped with the service.

use std::sync::LazyLock;

use openpaq_matching_models::MatchSeverityConfig;
use serde::{Deserialize, Serialize};

use crate::CheckerError;

static EMBEDDED: LazyLock<MatcherConfig> = LazyLock::new(|| {
    MatcherConfig::from_toml(include_str!("../config/matcher.toml"))
        .unwrap_or_else(|e| panic!("Failed to parse matcher.toml: {e}"))
});

/// Matching parameters and Nominatim search languages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    pub severity: MatchSeverityConfig,
    pub languages: Vec<String>,
}

impl MatcherConfig {
    /// The configuration compiled into the binary.
    #[must_use]
    pub fn embedded() -> Self {
        EMBEDDED.clone()
    }

    /// Parses a configuration in the `matcher.toml` format.
    ///
    /// # Errors
    ///
    /// Returns [`CheckerError::Config`] if `source` is not valid.
    pub fn from_toml(source: &str) -> Result<Self, CheckerError> {
        Ok(toml::from_str(source)?)
    }
}
