//! Folding of Nominatim address details into comparable lists.
//!
//! Nominatim reports an address through many locale-specific fields. Every
//! settlement-like field becomes a city candidate and every way-like field a
//! street candidate.

use std::collections::BTreeSet;

use openpaq_normalizer::{NormalizeError, Normalizer};
use serde::Deserialize;

/// One entry of a Nominatim `format=json` search response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub address: AddressComponents,
}

/// The `address` object of a search result (`addressdetails=1`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AddressComponents {
    pub state: String,
    pub state_district: String,
    pub municipality: String,
    pub city: String,
    pub town: String,
    pub village: String,
    pub city_district: String,
    pub district: String,
    pub borough: String,
    pub suburb: String,
    pub subdivision: String,
    pub hamlet: String,
    pub croft: String,
    pub isolated_dwelling: String,
    pub neighbourhood: String,
    pub allotments: String,
    pub quarter: String,
    pub residential: String,
    pub farm: String,
    pub farmyard: String,
    pub industrial: String,
    pub commercial: String,
    pub retail: String,
    pub road: String,
    pub building: String,
    pub city_block: String,
    pub postcode: String,
    pub country_code: String,
    pub county: String,
}

/// A search result reduced to what the pairwise checks compare.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedResult {
    pub streets: Vec<String>,
    pub postal_code: String,
    pub cities: Vec<String>,
    pub country_code: String,
}

fn push_non_empty(list: &mut Vec<String>, value: &str) {
    if !value.is_empty() {
        list.push(value.to_lowercase());
    }
}

impl AddressComponents {
    /// Folds the address fields into lowercase city and street lists.
    ///
    /// A hamlet counts as both: rural addresses often name the hamlet
    /// instead of a road.
    #[must_use]
    pub fn parse(&self) -> ParsedResult {
        let mut cities = Vec::new();
        let mut streets = Vec::new();

        for city in [
            &self.state,
            &self.state_district,
            &self.municipality,
            &self.city,
            &self.town,
            &self.village,
            &self.city_district,
            &self.district,
            &self.borough,
            &self.suburb,
            &self.subdivision,
        ] {
            push_non_empty(&mut cities, city);
        }

        push_non_empty(&mut cities, &self.hamlet);
        push_non_empty(&mut streets, &self.hamlet);

        for city in [
            &self.croft,
            &self.isolated_dwelling,
            &self.neighbourhood,
            &self.allotments,
            &self.quarter,
            &self.residential,
            &self.farm,
            &self.farmyard,
            &self.industrial,
            &self.commercial,
            &self.retail,
            &self.county,
        ] {
            push_non_empty(&mut cities, city);
        }

        for street in [&self.road, &self.city_block, &self.building] {
            push_non_empty(&mut streets, street);
        }

        ParsedResult {
            streets,
            postal_code: self.postcode.to_lowercase().replace(' ', ""),
            cities,
            country_code: self.country_code.to_lowercase(),
        }
    }
}

impl ParsedResult {
    /// Normalizes every field with `normalizer`.
    ///
    /// # Errors
    ///
    /// Returns the first [`NormalizeError`]; such a result cannot be
    /// compared and should be dropped.
    pub fn normalize(&self, normalizer: &dyn Normalizer) -> Result<Self, NormalizeError> {
        let postal_code = normalizer.postal_code(&self.postal_code)?;

        let cities = self
            .cities
            .iter()
            .map(|city| normalizer.city(city))
            .collect::<Result<Vec<_>, _>>()?;

        let mut streets = Vec::new();
        for street in &self.streets {
            streets.extend(normalizer.street(street)?);
        }

        Ok(Self {
            streets,
            postal_code,
            cities,
            country_code: self.country_code.clone(),
        })
    }

    /// Hex MD5 of the concatenated content.
    #[must_use]
    pub fn hash(&self) -> String {
        let content = format!(
            "{}{}{}{}",
            self.country_code,
            self.postal_code,
            self.cities.concat(),
            self.streets.concat()
        );

        format!("{:x}", md5::compute(content.as_bytes()))
    }
}

/// Drops results whose content hash was already seen, keeping the first.
#[must_use]
pub fn remove_duplicate_results(results: Vec<ParsedResult>) -> Vec<ParsedResult> {
    let mut seen = BTreeSet::new();

    results
        .into_iter()
        .filter(|result| seen.insert(result.hash()))
        .collect()
}
