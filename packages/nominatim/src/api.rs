//! Nominatim search API client.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::Duration;

use crate::NominatimError;
use crate::address::{AddressComponents, SearchResult};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Structured search parameters. Empty fields are left out of the query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredQuery {
    pub street: String,
    pub city: String,
    pub postal_code: String,
}

/// Address search against a Nominatim instance.
#[async_trait::async_trait]
pub trait NominatimApi: Send + Sync {
    /// Free-form search (`q=`).
    ///
    /// # Errors
    ///
    /// Returns [`NominatimError`] if the request or the response fails.
    async fn search_by_free_text(
        &self,
        query: &str,
        limit: Option<u32>,
        language: &str,
    ) -> Result<Vec<AddressComponents>, NominatimError>;

    /// Structured search (`street=`, `city=`, `postalcode=`).
    ///
    /// # Errors
    ///
    /// Returns [`NominatimError`] if the request or the response fails.
    async fn search_by_structured_params(
        &self,
        params: &StructuredQuery,
        limit: Option<u32>,
        language: &str,
    ) -> Result<Vec<AddressComponents>, NominatimError>;
}

/// [`NominatimApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpNominatimApi {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpNominatimApi {
    /// Creates a client for the instance at `base_url`.
    ///
    /// `/search` is appended unless `base_url` already points at it.
    ///
    /// # Errors
    ///
    /// Returns [`NominatimError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, NominatimError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: search_endpoint(base_url),
        })
    }

    /// The full search URL requests go to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute(
        &self,
        query: &[(&'static str, String)],
    ) -> Result<Vec<AddressComponents>, NominatimError> {
        let resp = self.client.get(&self.endpoint).query(query).send().await?;

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(NominatimError::Status(status.as_u16()));
        }

        let body = resp.text().await?;
        let results: Vec<SearchResult> = serde_json::from_str(&body)?;

        Ok(results.into_iter().map(|result| result.address).collect())
    }
}

#[async_trait::async_trait]
impl NominatimApi for HttpNominatimApi {
    async fn search_by_free_text(
        &self,
        query: &str,
        limit: Option<u32>,
        language: &str,
    ) -> Result<Vec<AddressComponents>, NominatimError> {
        self.execute(&free_text_query(query, limit, language)).await
    }

    async fn search_by_structured_params(
        &self,
        params: &StructuredQuery,
        limit: Option<u32>,
        language: &str,
    ) -> Result<Vec<AddressComponents>, NominatimError> {
        self.execute(&structured_query(params, limit, language))
            .await
    }
}

fn search_endpoint(base_url: &str) -> String {
    let base_url = base_url.trim_end_matches('/');

    if base_url.ends_with("/search") {
        base_url.to_string()
    } else {
        format!("{base_url}/search")
    }
}

fn common_query(limit: Option<u32>, language: &str) -> Vec<(&'static str, String)> {
    let mut query = Vec::with_capacity(6);

    if let Some(limit) = limit {
        query.push(("limit", limit.to_string()));
    }
    query.push(("accept-language", language.to_string()));
    query.push(("addressdetails", "1".to_string()));
    query.push(("format", "json".to_string()));

    query
}

fn free_text_query(text: &str, limit: Option<u32>, language: &str) -> Vec<(&'static str, String)> {
    let mut query = common_query(limit, language);
    query.push(("q", text.to_string()));
    query
}

fn structured_query(
    params: &StructuredQuery,
    limit: Option<u32>,
    language: &str,
) -> Vec<(&'static str, String)> {
    let mut query = common_query(limit, language);

    for (key, value) in [
        ("street", &params.street),
        ("city", &params.city),
        ("postalcode", &params.postal_code),
    ] {
        if !value.is_empty() {
            query.push((key, value.clone()));
        }
    }

    query
}
