//! Default file locations for the `DuckDB` data directory.
//!
//! All paths are relative to the working directory's `data/` directory.

use std::path::{Path, PathBuf};

/// Returns the `data/` directory path.
#[must_use]
pub fn data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Returns the default path of the verdict cache.
#[must_use]
pub fn result_cache_db_path() -> PathBuf {
    data_dir().join("result_cache.duckdb")
}

/// Returns the default path of the Slovenian address database.
#[must_use]
pub fn si_addresses_db_path() -> PathBuf {
    data_dir().join("si_addresses.duckdb")
}

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.as_os_str().is_empty() && !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_live_in_data_dir() {
        assert!(result_cache_db_path().starts_with(data_dir()));
        assert!(si_addresses_db_path().starts_with(data_dir()));
    }

    #[test]
    fn empty_parent_is_fine() {
        ensure_dir(Path::new("")).unwrap();
    }
}
