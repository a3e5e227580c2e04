//! Loads the Slovenian address register (`RN_SLO_NASLOVI`) CSV export into
//! the `slovenian_addresses` table read by [`crate::SiAddressDb`].
//!
//! Every column is kept as trimmed text. Rows with the wrong number of
//! fields are skipped, and each `feature_id` is stored once. An import
//! replaces the previous contents of the table.

use std::path::Path;

use duckdb::Connection;

use crate::{DbError, paths};

/// Register columns in file order.
pub const COLUMNS: [&str; 39] = [
    "feature_id",
    "eid_naslov",
    "obcina_sifra",
    "obcina_naziv",
    "obcina_naziv_dj",
    "naselje_sifra",
    "naselje_naziv",
    "naselje_naziv_dj",
    "ulica_sifra",
    "ulica_naziv",
    "ulica_naziv_dj",
    "postni_okolis_sifra",
    "postni_okolis_naziv",
    "postni_okolis_naziv_dj",
    "hs_stevilka",
    "hs_dodatek",
    "st_stanovanja",
    "e",
    "n",
    "eid_obcina",
    "eid_naselje",
    "eid_ulica",
    "eid_postni_okolis",
    "eid_hisna_stevilka",
    "eid_stanovanje",
    "eid_stavba",
    "eid_cetrtna_skupnost",
    "eid_dz_volisce",
    "eid_krajevna_skupnost",
    "eid_lokalno_volisce",
    "eid_lokalna_volilna_enota",
    "eid_solski_okolis",
    "eid_statisticna_regija",
    "eid_upravna_enota",
    "eid_vaska_skupnost",
    "eid_volilna_enota_dz",
    "eid_volilni_okraj",
    "eid_kohezijska_regija",
    "datum_sys",
];

/// Row counts after an import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub addresses: i64,
    pub cities: i64,
    pub streets: i64,
    pub postal_codes: i64,
}

fn sql_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn import_sql(csv: &Path) -> String {
    let names = COLUMNS
        .iter()
        .map(|column| sql_string(column))
        .collect::<Vec<_>>()
        .join(", ");
    let select = COLUMNS
        .iter()
        .map(|column| format!("COALESCE(TRIM({column}), '') AS {column}"))
        .collect::<Vec<_>>()
        .join(",\n    ");

    format!(
        "CREATE OR REPLACE TABLE slovenian_addresses AS
         SELECT DISTINCT ON (feature_id)
             {select}
         FROM read_csv(
             {path},
             header = true,
             delim = ',',
             quote = '\"',
             all_varchar = true,
             ignore_errors = true,
             names = [{names}]
         )",
        path = sql_string(&csv.to_string_lossy()),
    )
}

fn count(conn: &Connection, column: &str) -> Result<i64, DbError> {
    let sql = format!(
        "SELECT COUNT(DISTINCT {column}) FROM slovenian_addresses WHERE {column} != ''"
    );
    Ok(conn.query_row(&sql, [], |row| row.get(0))?)
}

/// Imports the register CSV at `csv` into `conn`.
///
/// # Errors
///
/// Returns [`DbError`] if the file cannot be read or the table cannot be
/// written.
pub fn import_into(conn: &Connection, csv: &Path) -> Result<ImportStats, DbError> {
    log::info!("Importing Slovenian addresses from {}...", csv.display());
    conn.execute_batch(&import_sql(csv))?;

    let stats = ImportStats {
        addresses: conn.query_row("SELECT COUNT(*) FROM slovenian_addresses", [], |row| {
            row.get(0)
        })?,
        cities: count(conn, "naselje_naziv")?,
        streets: count(conn, "ulica_naziv")?,
        postal_codes: count(conn, "postni_okolis_sifra")?,
    };

    log::info!(
        "Imported {} addresses ({} cities, {} streets, {} postal codes)",
        stats.addresses,
        stats.cities,
        stats.streets,
        stats.postal_codes
    );

    Ok(stats)
}

/// Imports the register CSV at `csv` into the database file at `db`,
/// creating the file and its directory if needed.
///
/// # Errors
///
/// Returns [`DbError`] if the directory cannot be created, the database
/// cannot be opened or the import fails.
pub fn import_si_addresses(csv: &Path, db: &Path) -> Result<ImportStats, DbError> {
    if let Some(parent) = db.parent() {
        paths::ensure_dir(parent)?;
    }

    let conn = Connection::open(db)?;
    import_into(&conn, csv)
}
