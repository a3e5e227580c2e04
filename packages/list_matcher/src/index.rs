//! In-memory lookup tables built from a bulk address list.

use std::collections::BTreeMap;

use openpaq_normalizer::Normalizer;

use crate::ListMatcherError;

/// A value as stored in the address list, next to its normalized form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub raw: String,
    pub normalized: String,
}

impl Normalized {
    #[must_use]
    pub fn new(raw: impl Into<String>, normalized: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            normalized: normalized.into(),
        }
    }
}

/// Streets within one postal code area.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostalCodeStreets {
    /// Postal code as written in the list.
    pub postal_code: String,
    pub streets: Vec<Normalized>,
}

/// Postal codes of one city (or municipality).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CityPostalCodes {
    /// City name as written in the list.
    pub city: String,
    pub postal_codes: Vec<Normalized>,
}

/// Normalized postal code to its streets.
pub type PostalCodeStreetIndex = BTreeMap<String, PostalCodeStreets>;

/// Normalized city name to its postal codes.
pub type CityPostalCodeIndex = BTreeMap<String, CityPostalCodes>;

/// First character of a normalized city name to every city starting with
/// it, sorted.
pub type FirstLetterIndex = BTreeMap<char, Vec<String>>;

/// Bulk provider of an authoritative address list.
///
/// Both calls happen once at startup; a failure means the country cannot
/// be served from the list.
pub trait ListDataSource: Send + Sync {
    /// Every street of every postal code.
    ///
    /// # Errors
    ///
    /// Returns [`ListMatcherError`] if the list cannot be read.
    fn postal_code_street_index(
        &self,
        normalizer: &dyn Normalizer,
    ) -> Result<PostalCodeStreetIndex, ListMatcherError>;

    /// Every postal code of every city and municipality.
    ///
    /// # Errors
    ///
    /// Returns [`ListMatcherError`] if the list cannot be read.
    fn city_postal_code_index(
        &self,
        normalizer: &dyn Normalizer,
    ) -> Result<CityPostalCodeIndex, ListMatcherError>;
}

/// Builds the postal code index from `(postal_code, street)` rows.
///
/// Rows whose postal code or street does not normalize are skipped.
pub fn build_postal_code_street_index<I>(rows: I, normalizer: &dyn Normalizer) -> PostalCodeStreetIndex
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut index = PostalCodeStreetIndex::new();

    for (postal_code, street) in rows {
        let Ok(normalized_postal_code) = normalizer.postal_code(&postal_code) else {
            continue;
        };
        let Ok(normalized_streets) = normalizer.street(&street) else {
            continue;
        };

        let entry = index
            .entry(normalized_postal_code)
            .or_insert_with(|| PostalCodeStreets {
                postal_code: postal_code.clone(),
                streets: Vec::new(),
            });

        entry.streets.extend(
            normalized_streets
                .into_iter()
                .map(|normalized| Normalized::new(street.as_str(), normalized)),
        );
    }

    index
}

/// Builds the city index from `(municipality, locality, postal_code)` rows.
///
/// Both the locality and its municipality are indexed, so a postal code
/// can be found through either name.
pub fn build_city_postal_code_index<I>(rows: I, normalizer: &dyn Normalizer) -> CityPostalCodeIndex
where
    I: IntoIterator<Item = (String, String, String)>,
{
    let mut index = CityPostalCodeIndex::new();

    for (municipality, locality, postal_code) in rows {
        let normalized_postal_code = match normalizer.postal_code(&postal_code) {
            Ok(normalized) if !normalized.is_empty() => normalized,
            _ => continue,
        };
        let postal_code = Normalized::new(postal_code, normalized_postal_code);

        for name in [locality, municipality] {
            let Ok(normalized_name) = normalizer.city(&name) else {
                continue;
            };
            if normalized_name.is_empty() {
                continue;
            }

            let entry = index
                .entry(normalized_name)
                .or_insert_with(|| CityPostalCodes {
                    city: name,
                    postal_codes: Vec::new(),
                });

            if !entry
                .postal_codes
                .iter()
                .any(|known| known.normalized == postal_code.normalized)
            {
                entry.postal_codes.push(postal_code.clone());
            }
        }
    }

    index
}

/// Groups the normalized city names by their first character.
#[must_use]
pub fn first_letter_cities(index: &CityPostalCodeIndex) -> FirstLetterIndex {
    let mut cities = FirstLetterIndex::new();

    // BTreeMap keys are already sorted and distinct.
    for city in index.keys() {
        if let Some(first) = city.chars().next() {
            cities.entry(first).or_default().push(city.clone());
        }
    }

    cities
}

#[cfg(test)]
mod tests {
    use super::*;
    use openpaq_normalizer::De;

    fn rows2(values: &[(&str, &str)]) -> Vec<(String, String)> {
        values
            .iter()
            .map(|(a, b)| ((*a).to_string(), (*b).to_string()))
            .collect()
    }

    fn rows3(values: &[(&str, &str, &str)]) -> Vec<(String, String, String)> {
        values
            .iter()
            .map(|(a, b, c)| ((*a).to_string(), (*b).to_string(), (*c).to_string()))
            .collect()
    }

    #[test]
    fn postal_code_index_groups_streets() {
        let index = build_postal_code_street_index(
            rows2(&[
                ("12345", "Eins-Straße"),
                ("12345", "Zwei-Straße"),
                ("1234", "Drei-Straße"),
                ("D-00000", "Vier-Straße"),
            ]),
            &De,
        );

        assert_eq!(index.len(), 2);

        let item = &index["12345"];
        assert_eq!(item.postal_code, "12345");
        assert_eq!(
            item.streets,
            vec![
                Normalized::new("Eins-Straße", "eins straße"),
                Normalized::new("Zwei-Straße", "zwei straße"),
            ]
        );

        let item = &index["01234"];
        assert_eq!(item.postal_code, "1234");
        assert_eq!(item.streets, vec![Normalized::new("Drei-Straße", "drei straße")]);
    }

    #[test]
    fn city_index_contains_locality_and_municipality() {
        let index = build_city_postal_code_index(
            rows3(&[
                ("Kreisstadt", "AStadt", "12345"),
                ("Kreisstadt", "BStadt", "12346"),
                ("Kreisstadt", "AStadt", "12345"),
                ("Kreisstadt", "AStadt", "00000"),
            ]),
            &De,
        );

        assert_eq!(index.len(), 3);

        let astadt = &index["astadt"];
        assert_eq!(astadt.city, "AStadt");
        assert_eq!(astadt.postal_codes, vec![Normalized::new("12345", "12345")]);

        let region = &index["kreisstadt"];
        assert_eq!(region.city, "Kreisstadt");
        assert_eq!(
            region.postal_codes,
            vec![
                Normalized::new("12345", "12345"),
                Normalized::new("12346", "12346"),
            ]
        );
    }

    #[test]
    fn first_letter_cities_are_grouped_and_sorted() {
        let index: CityPostalCodeIndex = ["bcity", "acity", "bcity2", "ccity1", "ccity3", "ccity2"]
            .into_iter()
            .map(|city| (city.to_string(), CityPostalCodes::default()))
            .collect();

        let cities = first_letter_cities(&index);

        let expected: FirstLetterIndex = [
            ('a', vec!["acity".to_string()]),
            ('b', vec!["bcity".to_string(), "bcity2".to_string()]),
            (
                'c',
                vec![
                    "ccity1".to_string(),
                    "ccity2".to_string(),
                    "ccity3".to_string(),
                ],
            ),
        ]
        .into_iter()
        .collect();

        assert_eq!(cities, expected);
    }

    #[test]
    fn first_letter_handles_multibyte_initials() {
        let index: CityPostalCodeIndex = [("überlingen".to_string(), CityPostalCodes::default())]
            .into_iter()
            .collect();
        assert_eq!(first_letter_cities(&index)[&'ü'], vec!["überlingen".to_string()]);
    }
}
