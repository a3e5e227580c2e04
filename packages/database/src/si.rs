//! Slovenian address matcher over a local `DuckDB` copy of the national
//! address register.
//!
//! The table `slovenian_addresses` needs the columns `naselje_naziv`
//! (settlement), `ulica_naziv` (street) and `postni_okolis_sifra`
//! (postal code).

use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

use duckdb::Connection;
use openpaq_matching::get_matches;
use openpaq_matching_models::MatchSeverityConfig;
use openpaq_models::{
    CityPostalCode, CityStreetPostalCode, NormalizedInput, PairMatcher, PairMatching,
    PostalCodeStreet, merge_until, receive, remove_duplicates, spawn_blocking_check,
};
use tokio::time::Instant;

use crate::DbError;

const COUNTRY_CODE: &str = "si";

/// `(settlement, street, postal code)`, lowercased.
type AddressRow = (String, String, String);

/// Whether two postal codes are both present and one contains the other.
fn postal_codes_overlap(input: &str, found: &str) -> bool {
    !input.is_empty() && !found.is_empty() && (input.contains(found) || found.contains(input))
}

fn like(value: &str) -> String {
    format!("%{}%", value.to_lowercase())
}

/// [`PairMatcher`] for Slovenian addresses.
///
/// Cloning is cheap; clones share the connection.
#[derive(Clone)]
pub struct SiAddressDb {
    conn: Arc<Mutex<Connection>>,
    config: MatchSeverityConfig,
}

impl std::fmt::Debug for SiAddressDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiAddressDb")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SiAddressDb {
    /// Opens the address database at `path` read-only.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the file cannot be opened.
    pub fn open(path: &Path, config: MatchSeverityConfig) -> Result<Self, DbError> {
        let conn = Connection::open_with_flags(
            path,
            duckdb::Config::default().access_mode(duckdb::AccessMode::ReadOnly)?,
        )?;
        log::info!("Opened Slovenian address database {}", path.display());

        Ok(Self::new(conn, config))
    }

    /// Wraps an open connection.
    #[must_use]
    pub fn new(conn: Connection, config: MatchSeverityConfig) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        }
    }

    fn partial_config(&self) -> MatchSeverityConfig {
        MatchSeverityConfig {
            allow_partial_match: true,
            allow_partial_compare_list_match: true,
            ..self.config.clone()
        }
    }

    fn query_addresses(
        &self,
        sql: &str,
        params: &[&dyn duckdb::ToSql],
    ) -> Result<Vec<AddressRow>, DbError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;

        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push((row.get(0)?, row.get(1)?, row.get(2)?));
        }

        Ok(result)
    }

    fn city_street_rows(&self, city: &str, street: &str) -> Result<Vec<AddressRow>, DbError> {
        self.query_addresses(
            "SELECT LOWER(naselje_naziv), LOWER(ulica_naziv), CAST(postni_okolis_sifra AS VARCHAR)
             FROM slovenian_addresses
             WHERE LOWER(naselje_naziv) = ? AND LOWER(ulica_naziv) = ?
             GROUP BY naselje_naziv, ulica_naziv, postni_okolis_sifra
             ORDER BY 1, 2, 3",
            &[&city.to_lowercase(), &street.to_lowercase()],
        )
    }

    fn similar_city_street_rows(
        &self,
        city: &str,
        street: &str,
    ) -> Result<Vec<AddressRow>, DbError> {
        self.query_addresses(
            "SELECT LOWER(naselje_naziv), LOWER(ulica_naziv), CAST(postni_okolis_sifra AS VARCHAR)
             FROM slovenian_addresses
             WHERE LOWER(naselje_naziv) LIKE ? AND LOWER(ulica_naziv) LIKE ?
             GROUP BY naselje_naziv, ulica_naziv, postni_okolis_sifra
             ORDER BY 1, 2, 3",
            &[&like(city), &like(street)],
        )
    }

    fn postal_code_street_rows(
        &self,
        postal_code: &str,
        street: &str,
    ) -> Result<Vec<AddressRow>, DbError> {
        self.query_addresses(
            "SELECT '', LOWER(ulica_naziv), CAST(postni_okolis_sifra AS VARCHAR)
             FROM slovenian_addresses
             WHERE CAST(postni_okolis_sifra AS VARCHAR) = ? AND LOWER(ulica_naziv) LIKE ?
             GROUP BY ulica_naziv, postni_okolis_sifra
             ORDER BY 2, 3",
            &[&postal_code, &like(street)],
        )
    }

    fn postal_code_city_rows(&self, postal_code: &str) -> Result<Vec<AddressRow>, DbError> {
        self.query_addresses(
            "SELECT LOWER(naselje_naziv), '', CAST(postni_okolis_sifra AS VARCHAR)
             FROM slovenian_addresses
             WHERE CAST(postni_okolis_sifra AS VARCHAR) = ?
             GROUP BY naselje_naziv, postni_okolis_sifra
             ORDER BY 1, 3",
            &[&postal_code],
        )
    }

    fn city_street_matches(
        &self,
        input: &NormalizedInput,
        street: &str,
        rows: &[AddressRow],
    ) -> Vec<CityStreetPostalCode> {
        let config = self.partial_config();
        let mut matches = Vec::new();

        for (city, db_street, postal_code) in rows {
            let Ok(street_matches) = get_matches(street, std::slice::from_ref(db_street), &config)
            else {
                continue;
            };
            let Ok(city_matches) = get_matches(&input.city, std::slice::from_ref(city), &config)
            else {
                continue;
            };

            for street_match in &street_matches {
                for city_match in &city_matches {
                    if street_match.similarity > 0.0 && city_match.similarity > 0.0 {
                        matches.push(CityStreetPostalCode {
                            city: city_match.value.clone(),
                            street: street_match.value.clone(),
                            postal_code: postal_code.clone(),
                            country_code: COUNTRY_CODE.to_string(),
                            street_similarity: street_match.similarity,
                            was_partial_street_match: street_match.was_partial,
                            city_similarity: city_match.similarity,
                            was_partial_city_match: city_match.was_partial,
                            was_list_match: false,
                        });
                    }
                }
            }
        }

        matches
    }

    /// Looks every input street up in the input's settlement, first by
    /// exact name and then by substring.
    #[must_use]
    pub fn city_street_check(&self, input: &NormalizedInput) -> PairMatching {
        let mut matches = Vec::new();

        for street in &input.streets {
            let exact = self
                .city_street_rows(&input.city, street)
                .unwrap_or_else(|e| {
                    log::error!("Slovenian city/street lookup failed: {e}");
                    Vec::new()
                });
            let mut found = self.city_street_matches(input, street, &exact);

            if found.is_empty() {
                let similar = self
                    .similar_city_street_rows(&input.city, street)
                    .unwrap_or_else(|e| {
                        log::error!("Slovenian city/street lookup failed: {e}");
                        Vec::new()
                    });
                found = self.city_street_matches(input, street, &similar);
            }

            matches.extend(found);
        }

        let matches = remove_duplicates(&matches);

        PairMatching {
            street_city_match: !matches.is_empty(),
            street_city_matches: matches,
            ..PairMatching::default()
        }
    }

    /// Reuses `city_street` records carrying the input's postal code, and
    /// only queries when there are none.
    #[must_use]
    pub fn postal_code_street_check(
        &self,
        input: &NormalizedInput,
        city_street: &[CityStreetPostalCode],
    ) -> PairMatching {
        let known: Vec<PostalCodeStreet> = city_street
            .iter()
            .filter(|record| postal_codes_overlap(&input.postal_code, &record.postal_code))
            .map(|record| PostalCodeStreet {
                postal_code: record.postal_code.clone(),
                street: record.street.clone(),
                country_code: COUNTRY_CODE.to_string(),
                street_similarity: record.street_similarity,
                was_partial_street_match: record.was_partial_street_match,
                was_list_match: false,
            })
            .collect();

        if !known.is_empty() {
            return PairMatching {
                postal_code_street_match: true,
                postal_code_street_matches: known,
                ..PairMatching::default()
            };
        }

        let config = self.partial_config();
        let mut matches = Vec::new();

        for street in &input.streets {
            let rows = self
                .postal_code_street_rows(&input.postal_code, street)
                .unwrap_or_else(|e| {
                    log::error!("Slovenian postal code/street lookup failed: {e}");
                    Vec::new()
                });

            for (_, db_street, postal_code) in &rows {
                let Ok(street_matches) =
                    get_matches(street, std::slice::from_ref(db_street), &config)
                else {
                    continue;
                };

                for street_match in street_matches {
                    matches.push(PostalCodeStreet {
                        postal_code: postal_code.clone(),
                        street: street_match.value,
                        country_code: COUNTRY_CODE.to_string(),
                        street_similarity: street_match.similarity,
                        was_partial_street_match: street_match.was_partial,
                        was_list_match: false,
                    });
                }
            }
        }

        PairMatching {
            postal_code_street_match: !matches.is_empty(),
            postal_code_street_matches: matches,
            ..PairMatching::default()
        }
    }

    /// Reuses `city_street` records carrying the input's postal code, and
    /// only queries when there are none.
    #[must_use]
    pub fn postal_code_city_check(
        &self,
        input: &NormalizedInput,
        city_street: &[CityStreetPostalCode],
    ) -> PairMatching {
        let known: Vec<CityPostalCode> = city_street
            .iter()
            .filter(|record| postal_codes_overlap(&input.postal_code, &record.postal_code))
            .map(|record| CityPostalCode {
                city: record.city.clone(),
                postal_code: record.postal_code.clone(),
                country_code: COUNTRY_CODE.to_string(),
                city_similarity: record.city_similarity,
                was_partial_city_match: record.was_partial_city_match,
                was_list_match: false,
            })
            .collect();

        if !known.is_empty() {
            return PairMatching {
                city_postal_code_match: true,
                city_postal_code_matches: known,
                ..PairMatching::default()
            };
        }

        let rows = self
            .postal_code_city_rows(&input.postal_code)
            .unwrap_or_else(|e| {
                log::error!("Slovenian postal code/city lookup failed: {e}");
                Vec::new()
            });

        let config = self.partial_config();
        let mut matches = Vec::new();

        for (city, _, postal_code) in &rows {
            let Ok(city_matches) = get_matches(&input.city, std::slice::from_ref(city), &config)
            else {
                continue;
            };

            for city_match in city_matches {
                matches.push(CityPostalCode {
                    city: city_match.value,
                    postal_code: postal_code.clone(),
                    country_code: COUNTRY_CODE.to_string(),
                    city_similarity: city_match.similarity,
                    was_partial_city_match: city_match.was_partial,
                    was_list_match: false,
                });
            }
        }

        PairMatching {
            city_postal_code_match: !matches.is_empty(),
            city_postal_code_matches: matches,
            ..PairMatching::default()
        }
    }
}

#[async_trait::async_trait]
impl PairMatcher for SiAddressDb {
    fn name(&self) -> &'static str {
        "si_db"
    }

    async fn handle(&self, input: &NormalizedInput, deadline: Instant) -> PairMatching {
        let city_street = {
            let db = self.clone();
            let input = input.clone();
            spawn_blocking_check(move || db.city_street_check(&input))
        };

        let Ok(mut result) = tokio::time::timeout_at(deadline, receive(city_street)).await else {
            log::warn!("Slovenian city/street check hit the deadline");
            return PairMatching::default();
        };

        let records = Arc::new(result.street_city_matches.clone());

        let checks = [
            {
                let db = self.clone();
                let input = input.clone();
                let records = records.clone();
                spawn_blocking_check(move || db.postal_code_city_check(&input, &records))
            },
            {
                let db = self.clone();
                let input = input.clone();
                spawn_blocking_check(move || db.postal_code_street_check(&input, &records))
            },
        ];

        result.merge(merge_until(deadline, checks.into_iter().map(receive)).await);
        result
    }
}
