#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! HTTP request and response types for the openPAQ server.
//!
//! The verdict bodies themselves are the shared address models; this crate
//! only holds what is specific to the HTTP surface.

use serde::{Deserialize, Serialize};

/// Longest accepted street, in bytes.
pub const MAX_STREET_LEN: usize = 500;
/// Longest accepted city, in bytes.
pub const MAX_CITY_LEN: usize = 100;
/// Longest accepted postal code, in bytes.
pub const MAX_POSTAL_CODE_LEN: usize = 50;
/// Longest accepted country code, in bytes.
pub const MAX_COUNTRY_CODE_LEN: usize = 2;

/// Query parameters of `GET /api/v1/check`.
///
/// Missing parameters are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CheckQueryParams {
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country_code: String,
    /// `"true"` to include the evidence trail.
    pub debug_details: String,
}

impl CheckQueryParams {
    /// Whether the evidence trail was requested.
    #[must_use]
    pub fn wants_debug_details(&self) -> bool {
        self.debug_details == "true"
    }

    /// Checks the field length limits.
    ///
    /// # Errors
    ///
    /// Returns the message for the first field over its limit.
    pub fn validate(&self) -> Result<(), String> {
        let limits = [
            ("street field", self.street.len(), MAX_STREET_LEN),
            ("city field", self.city.len(), MAX_CITY_LEN),
            ("postal code field", self.postal_code.len(), MAX_POSTAL_CODE_LEN),
            ("country code field", self.country_code.len(), MAX_COUNTRY_CODE_LEN),
        ];

        for (field, len, max) in limits {
            if len > max {
                return Err(format!("{field} exceed length limit of {max} elements"));
            }
        }

        Ok(())
    }
}

/// Body of `GET /version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiVersion {
    pub version: String,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}
