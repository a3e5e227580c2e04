//! Languages a country's addresses are searched in.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
struct LanguageTable {
    #[serde(default)]
    countries: BTreeMap<String, Vec<String>>,
}

static EXTRA_LANGUAGES: LazyLock<LanguageTable> = LazyLock::new(|| {
    toml::from_str(include_str!("../config/languages.toml"))
        .unwrap_or_else(|e| panic!("Failed to parse languages.toml: {e}"))
});

/// Extra languages spoken in `country_code`, if any are configured.
#[must_use]
pub fn extra_languages(country_code: &str) -> &'static [String] {
    EXTRA_LANGUAGES
        .countries
        .get(&country_code.to_lowercase())
        .map(Vec::as_slice)
        .unwrap_or_default()
}

/// `configured` followed by the country's extra languages, each once.
#[must_use]
pub fn request_languages(configured: &[String], country_code: &str) -> Vec<String> {
    let mut languages: Vec<String> = Vec::with_capacity(configured.len() + 2);

    for language in configured.iter().chain(extra_languages(country_code)) {
        if !languages.contains(language) {
            languages.push(language.clone());
        }
    }

    languages
}
