//! Database connection utilities.

use std::path::PathBuf;

use duckdb::Connection;

use crate::DbError;

/// Environment variable naming the database file.
pub const DB_PATH_ENV_VAR: &str = "HOUSING_MARKET_DB";

/// Fallback environment variable, accepted as a plain path or a
/// `duckdb://` URL.
pub const DATABASE_URL_ENV_VAR: &str = "DATABASE_URL";

/// Resolves the database file from an explicit path setting and a
/// `DATABASE_URL`-style setting, in that order of preference.
///
/// URLs for other database engines are ignored, falling back to
/// [`crate::paths::default_db_path`].
#[must_use]
pub fn resolve_database_path(path: Option<&str>, url: Option<&str>) -> PathBuf {
    if let Some(path) = path.map(str::trim).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }

    if let Some(url) = url.map(str::trim).filter(|u| !u.is_empty()) {
        if let Some(path) = url.strip_prefix("duckdb://") {
            return PathBuf::from(path);
        }
        if url.contains("://") {
            log::warn!(
                "Ignoring {DATABASE_URL_ENV_VAR}: only DuckDB file paths are supported"
            );
        } else {
            return PathBuf::from(url);
        }
    }

    crate::paths::default_db_path()
}

/// Resolves the database file from [`DB_PATH_ENV_VAR`], then
/// [`DATABASE_URL_ENV_VAR`], then the default data directory.
#[must_use]
pub fn database_path_from_env() -> PathBuf {
    let path = std::env::var(DB_PATH_ENV_VAR).ok();
    let url = std::env::var(DATABASE_URL_ENV_VAR).ok();
    resolve_database_path(path.as_deref(), url.as_deref())
}

/// Opens the database named by the environment and ensures the schema.
///
/// # Errors
///
/// Returns [`DbError`] if the connection or schema creation fails.
pub fn connect_from_env() -> Result<Connection, DbError> {
    let path = database_path_from_env();
    log::info!("Opening database at {}", path.display());
    crate::open(&path)
}

/// Runs a trivial query to confirm the connection is usable.
///
/// # Errors
///
/// Returns [`DbError`] if the query fails.
pub fn ping(conn: &Connection) -> Result<(), DbError> {
    let one: i32 = conn.query_row("SELECT 1", [], |row| row.get(0))?;
    if one == 1 {
        Ok(())
    } else {
        Err(DbError::Conversion {
            message: format!("SELECT 1 returned {one}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let path = resolve_database_path(Some("/tmp/a.duckdb"), Some("duckdb:///tmp/b.duckdb"));
        assert_eq!(path, PathBuf::from("/tmp/a.duckdb"));
    }

    #[test]
    fn duckdb_url_is_accepted() {
        let path = resolve_database_path(None, Some("duckdb:///tmp/b.duckdb"));
        assert_eq!(path, PathBuf::from("/tmp/b.duckdb"));
    }

    #[test]
    fn plain_url_value_is_a_path() {
        let path = resolve_database_path(Some("  "), Some("market.duckdb"));
        assert_eq!(path, PathBuf::from("market.duckdb"));
    }

    #[test]
    fn foreign_url_falls_back_to_default() {
        let path = resolve_database_path(None, Some("postgres://user@localhost/db"));
        assert_eq!(path, crate::paths::default_db_path());
        assert_eq!(resolve_database_path(None, None), crate::paths::default_db_path());
    }

    #[test]
    fn ping_succeeds_on_open_connection() {
        let conn = crate::open_in_memory().unwrap();
        ping(&conn).unwrap();
    }
}
