//! Address list stored in a `DuckDB` table.
//!
//! The table needs the columns `postal_code`, `street`, `municipality`
//! and `locality`.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use duckdb::Connection;
use openpaq_normalizer::Normalizer;

use crate::ListMatcherError;
use crate::index::{
    CityPostalCodeIndex, ListDataSource, PostalCodeStreetIndex, build_city_postal_code_index,
    build_postal_code_street_index,
};

/// Reads the bulk address list from `DuckDB`.
///
/// `duckdb::Connection` is `Send` but not `Sync`, so it sits behind a
/// `Mutex`.
pub struct DuckDbListSource {
    conn: Mutex<Connection>,
    table: String,
}

impl std::fmt::Debug for DuckDbListSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbListSource")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl DuckDbListSource {
    /// Opens the database file at `path` read-only.
    ///
    /// # Errors
    ///
    /// Returns [`ListMatcherError`] if the file cannot be opened or
    /// `table` is not a plain identifier.
    pub fn open(path: &Path, table: &str) -> Result<Self, ListMatcherError> {
        let conn = Connection::open_with_flags(
            path,
            duckdb::Config::default().access_mode(duckdb::AccessMode::ReadOnly)?,
        )?;
        Self::new(conn, table)
    }

    /// Wraps an open connection.
    ///
    /// # Errors
    ///
    /// Returns [`ListMatcherError::Config`] if `table` is not a plain
    /// identifier.
    pub fn new(conn: Connection, table: &str) -> Result<Self, ListMatcherError> {
        if table.is_empty()
            || !table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
        {
            return Err(ListMatcherError::Config(format!(
                "invalid table name {table:?}"
            )));
        }

        Ok(Self {
            conn: Mutex::new(conn),
            table: table.to_string(),
        })
    }
}

impl ListDataSource for DuckDbListSource {
    fn postal_code_street_index(
        &self,
        normalizer: &dyn Normalizer,
    ) -> Result<PostalCodeStreetIndex, ListMatcherError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT postal_code, street
             FROM {}
             ORDER BY postal_code, street",
            self.table
        ))?;

        let mut rows = stmt.query(duckdb::params![])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let postal_code: Option<String> = row.get(0)?;
            let street: Option<String> = row.get(1)?;
            if let (Some(postal_code), Some(street)) = (postal_code, street) {
                entries.push((postal_code, street));
            }
        }

        log::debug!("Read {} postal code/street rows from {}", entries.len(), self.table);

        Ok(build_postal_code_street_index(entries, normalizer))
    }

    fn city_postal_code_index(
        &self,
        normalizer: &dyn Normalizer,
    ) -> Result<CityPostalCodeIndex, ListMatcherError> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT municipality, locality, postal_code
             FROM {}
             ORDER BY municipality, locality",
            self.table
        ))?;

        let mut rows = stmt.query(duckdb::params![])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let municipality: Option<String> = row.get(0)?;
            let locality: Option<String> = row.get(1)?;
            let postal_code: Option<String> = row.get(2)?;
            if let (Some(municipality), Some(locality), Some(postal_code)) =
                (municipality, locality, postal_code)
            {
                entries.push((municipality, locality, postal_code));
            }
        }

        log::debug!("Read {} city/postal code rows from {}", entries.len(), self.table);

        Ok(build_city_postal_code_index(entries, normalizer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openpaq_normalizer::De;

    fn source() -> DuckDbListSource {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE addresses (
                postal_code TEXT,
                street TEXT,
                municipality TEXT,
                locality TEXT
            );
            INSERT INTO addresses VALUES
                ('12345', 'Eins-Straße', 'Kreisstadt', 'AStadt'),
                ('12345', 'Zwei-Straße', 'Kreisstadt', 'AStadt'),
                ('12345', 'Zwei-Straße', 'Kreisstadt', 'AStadt'),
                ('52385', 'Eins-Straße', 'Dueren', 'Nideggen'),
                (NULL, 'Drei-Straße', 'Dueren', 'Nideggen');",
        )
        .unwrap();
        DuckDbListSource::new(conn, "addresses").unwrap()
    }

    #[test]
    fn reads_postal_code_street_index() {
        let index = source().postal_code_street_index(&De).unwrap();

        assert_eq!(index.len(), 2);
        let streets: Vec<_> = index["12345"]
            .streets
            .iter()
            .map(|s| s.normalized.as_str())
            .collect();
        assert_eq!(streets, vec!["eins straße", "zwei straße"]);
    }

    #[test]
    fn reads_city_postal_code_index() {
        let index = source().city_postal_code_index(&De).unwrap();

        assert_eq!(index["astadt"].city, "AStadt");
        assert_eq!(index["kreisstadt"].postal_codes[0].normalized, "12345");
        assert_eq!(index["nideggen"].postal_codes[0].raw, "52385");
        assert_eq!(index["dueren"].city, "Dueren");
    }

    #[test]
    fn rejects_unsafe_table_names() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(matches!(
            DuckDbListSource::new(conn, "addresses; DROP TABLE x"),
            Err(ListMatcherError::Config(_))
        ));
    }
}
