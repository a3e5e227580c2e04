//! Server settings read from the environment.

use std::path::PathBuf;

use openpaq_database::paths;

use crate::ServerError;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0";
const DEFAULT_PORT: &str = "8080";
const DEFAULT_LIST_TABLE: &str = "addresses";

/// Where the German address list is loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListMatcherConfig {
    pub db_path: PathBuf,
    pub table: String,
}

/// Everything the server needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `host:port` to listen on.
    pub listen_address: String,
    /// Version reported by `/version` and stamped on every result.
    pub version: String,
    /// Base URL of the Nominatim instance.
    pub nominatim_address: String,
    pub list_matcher: Option<ListMatcherConfig>,
    /// Slovenian address database, if enabled.
    pub si_db_path: Option<PathBuf>,
    /// Result cache database, if caching is enabled.
    pub cache_path: Option<PathBuf>,
}

/// `true` and `1` enable a switch; anything else disables it.
fn is_enabled(value: Option<String>) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

impl ServerConfig {
    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::MissingEnv`] if a required variable is unset.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::MissingEnv`] if a required variable is unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServerError> {
        let required = |key: &'static str| lookup(key).ok_or(ServerError::MissingEnv(key));

        let listen_address = lookup("WEBSERVER_LISTEN_ADDRESS").unwrap_or_else(|| {
            let bind_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
            let port = lookup("PORT").unwrap_or_else(|| DEFAULT_PORT.to_string());
            format!("{bind_addr}:{port}")
        });

        let list_matcher = if is_enabled(lookup("LIST_MATCHER_ENABLED")) {
            Some(ListMatcherConfig {
                db_path: PathBuf::from(required("LIST_MATCHER_DB_PATH")?),
                table: lookup("LIST_MATCHER_TABLE")
                    .unwrap_or_else(|| DEFAULT_LIST_TABLE.to_string()),
            })
        } else {
            None
        };

        let si_db_path = if is_enabled(lookup("SI_DB_ENABLED")) {
            Some(lookup("SI_DB_PATH").map_or_else(paths::si_addresses_db_path, PathBuf::from))
        } else {
            None
        };

        let cache_path = if is_enabled(lookup("CACHE_ENABLED")) {
            Some(lookup("CACHE_PATH").map_or_else(paths::result_cache_db_path, PathBuf::from))
        } else {
            None
        };

        Ok(Self {
            listen_address,
            version: lookup("VERSION").unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string()),
            nominatim_address: required("NOMINATIM_ADDRESS")?,
            list_matcher,
            si_db_path,
            cache_path,
        })
    }
}
