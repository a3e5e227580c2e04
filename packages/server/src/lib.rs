#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the openPAQ address checker.
//!
//! Every address is checked against a Nominatim instance. A German address
//! list loaded from `DuckDB`, a Slovenian address database and a result
//! cache can be switched on through the environment (see
//! [`config::ServerConfig`]).

pub mod config;
mod handlers;

use std::sync::Arc;

use actix_web::{App, HttpServer, middleware, web};
use openpaq_checker::{Checker, MatcherConfig};
use openpaq_database::{DbError, DuckDbResultCache, SiAddressDb};
use openpaq_list_matcher::{DuckDbListSource, ListMatcher, ListMatcherError};
use openpaq_nominatim::{Nominatim, NominatimError};
use openpaq_normalizer::NormalizerRegistry;

use crate::config::ServerConfig;

/// Errors that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// A required environment variable is not set.
    #[error("Environment variable {0} is not set")]
    MissingEnv(&'static str),

    /// The address list could not be loaded.
    #[error(transparent)]
    ListMatcher(#[from] ListMatcherError),

    /// The Nominatim client could not be created.
    #[error(transparent)]
    Nominatim(#[from] NominatimError),

    /// The address database or the cache could not be opened.
    #[error(transparent)]
    Database(#[from] DbError),

    /// The HTTP server failed to bind or run.
    #[error("Server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    pub checker: Arc<Checker>,
}

/// Builds the checker described by `config`.
///
/// # Errors
///
/// Returns [`ServerError`] if a configured data source cannot be opened.
pub fn build_checker(
    config: &ServerConfig,
    matcher_config: &MatcherConfig,
) -> Result<Checker, ServerError> {
    let nominatim = Nominatim::connect(
        &config.nominatim_address,
        matcher_config.languages.clone(),
        matcher_config.severity.clone(),
        NormalizerRegistry::new(),
    )?;
    let mut checker = Checker::new(Arc::new(nominatim), config.version.clone());

    if let Some(list) = &config.list_matcher {
        log::info!("Loading address list from {}...", list.db_path.display());
        let source = DuckDbListSource::open(&list.db_path, &list.table)?;

        let mut list_matcher = ListMatcher::new(matcher_config.severity.clone());
        list_matcher.register_country("de", &source)?;
        checker = checker.with_list_matcher(Arc::new(list_matcher));
    }

    if let Some(path) = &config.si_db_path {
        let db = SiAddressDb::open(path, matcher_config.severity.clone())?;
        checker = checker.with_local_db(Arc::new(db));
    }

    if let Some(path) = &config.cache_path {
        log::info!("Caching results in {}", path.display());
        checker = checker.with_cache(Arc::new(DuckDbResultCache::open(path)?));
    }

    Ok(checker)
}

/// Registers the API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index))
        .route("/version", web::get().to(handlers::version))
        .service(web::scope("/api/v1").route("/check", web::get().to(handlers::check)));
}

/// Starts the openPAQ API server.
///
/// Reads the configuration from the environment, opens the configured data
/// sources and serves until the HTTP server stops. The caller provides the
/// async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if the configuration is incomplete, a data
/// source cannot be opened, or the HTTP server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> Result<(), ServerError> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env()?;
    let checker = build_checker(&config, &MatcherConfig::embedded())?;
    log::debug!("{checker:?}");

    let state = web::Data::new(AppState {
        checker: Arc::new(checker),
    });

    log::info!("Starting server on {}", config.listen_address);

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(config.listen_address.as_str())?
    .run()
    .await?;

    Ok(())
}
