use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, ErrorCode, Row};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::constants::storage::MIGRATIONS_TABLE;
use crate::storage::StoreError;
use crate::storage::migrations::{SqliteMigration, current_schema_version, migration, migrations};

pub type StoreResult<T> = Result<T, StoreError>;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed persistence for every adscope table.
///
/// One connection is shared behind a mutex; clones share it as well.
#[derive(Clone)]
pub struct Store {
    connection: Arc<Mutex<Connection>>,
    database_path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) the database file, creating parent directories
    pub fn open(database_path: impl Into<PathBuf>) -> StoreResult<Self> {
        let database_path = database_path.into();
        let connection = open_connection(&database_path)
            .map_err(|error| StoreError::sqlite("open", error))?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            database_path: Some(database_path),
        })
    }

    /// Private in-memory database, mostly for tests and dry runs
    pub fn open_in_memory() -> StoreResult<Self> {
        let connection = Connection::open_in_memory()
            .and_then(|connection| {
                configure_connection(&connection)?;
                Ok(connection)
            })
            .map_err(|error| StoreError::sqlite("open_in_memory", error))?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
            database_path: None,
        })
    }

    pub fn database_path(&self) -> Option<&Path> {
        self.database_path.as_deref()
    }

    pub fn planned_migrations(&self, from_version: i64) -> Vec<&'static SqliteMigration> {
        migrations()
            .iter()
            .filter(|entry| entry.version > from_version)
            .collect()
    }

    pub fn migrate_to_latest(&self) -> StoreResult<()> {
        self.apply_migration(current_schema_version())
    }

    pub fn current_version(&self) -> StoreResult<i64> {
        self.with_connection("current_version", |connection| {
            ensure_migrations_table(connection)?;
            read_current_version(connection)
        })
    }

    /// Move the schema up or down to `target_version`
    pub fn apply_migration(&self, target_version: i64) -> StoreResult<()> {
        if target_version < 0 || target_version > current_schema_version() {
            return Err(StoreError::Migration(format!(
                "invalid migration target version '{target_version}'"
            )));
        }

        self.with_connection("apply_migration", |connection| {
            ensure_migrations_table(connection)?;
            let current_version = read_current_version(connection)?;

            if target_version == current_version {
                // DDL is all IF NOT EXISTS, so re-running repairs missing tables.
                for version in 1..=target_version {
                    execute_batch_tolerant(connection, defined_migration(version)?.up_sql)?;
                }
                return Ok(());
            }

            if target_version > current_version {
                for version in (current_version + 1)..=target_version {
                    let migration = defined_migration(version)?;
                    info!(version, name = migration.name, "applying migration");
                    apply_up_migration(connection, migration)?;
                }
            } else {
                for version in ((target_version + 1)..=current_version).rev() {
                    let migration = defined_migration(version)?;
                    info!(version, name = migration.name, "reverting migration");
                    apply_down_migration(connection, migration)?;
                }
            }

            Ok(())
        })
    }

    /// Cheap liveness probe used by the health endpoint
    pub fn check_connection(&self) -> bool {
        self.with_connection("check_connection", |connection| {
            connection.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))
        })
        .is_ok()
    }

    /// Names of the indexes present in the database
    pub fn index_names(&self) -> StoreResult<Vec<String>> {
        self.with_connection("index_names", |connection| {
            let mut statement = connection.prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'index' AND name NOT LIKE 'sqlite_autoindex_%'
                 ORDER BY name",
            )?;
            let rows = statement.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect()
        })
    }

    pub(crate) fn with_connection<T>(
        &self,
        operation_name: &'static str,
        operation: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> StoreResult<T> {
        let mut connection = self.connection.lock();
        debug!(operation = operation_name, "sqlite operation");
        operation(&mut connection).map_err(|error| StoreError::sqlite(operation_name, error))
    }
}

fn open_connection(database_path: &Path) -> rusqlite::Result<Connection> {
    if let Some(parent) = database_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))?;
    }
    let connection = Connection::open(database_path)?;
    configure_connection(&connection)?;
    Ok(connection)
}

fn configure_connection(connection: &Connection) -> rusqlite::Result<()> {
    connection.busy_timeout(BUSY_TIMEOUT)?;
    connection.execute_batch("PRAGMA foreign_keys = ON;")
}

fn ensure_migrations_table(connection: &Connection) -> rusqlite::Result<()> {
    connection.execute_batch(&format!(
        "
CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"
    ))
}

fn read_current_version(connection: &Connection) -> rusqlite::Result<i64> {
    connection.query_row(
        &format!("SELECT COALESCE(MAX(version), 0) FROM {MIGRATIONS_TABLE}"),
        [],
        |row| row.get(0),
    )
}

fn defined_migration(version: i64) -> rusqlite::Result<&'static SqliteMigration> {
    migration(version).ok_or_else(|| {
        invalid_value(&format!("migration version '{version}' is not defined"))
    })
}

fn apply_up_migration(
    connection: &mut Connection,
    migration: &SqliteMigration,
) -> rusqlite::Result<()> {
    let transaction = connection.transaction()?;
    execute_batch_tolerant(&transaction, migration.up_sql)?;
    transaction.execute(
        &format!("INSERT INTO {MIGRATIONS_TABLE} (version, name, applied_at) VALUES (?1, ?2, ?3)"),
        (migration.version, migration.name, now_text()),
    )?;
    transaction.commit()
}

/// Run a batch, tolerating "duplicate column name" from re-applied `ALTER TABLE ADD COLUMN`
fn execute_batch_tolerant(connection: &Connection, sql: &str) -> rusqlite::Result<()> {
    match connection.execute_batch(sql) {
        Ok(()) => Ok(()),
        Err(e) if e.to_string().contains("duplicate column name") => Ok(()),
        Err(e) => Err(e),
    }
}

fn apply_down_migration(
    connection: &mut Connection,
    migration: &SqliteMigration,
) -> rusqlite::Result<()> {
    let transaction = connection.transaction()?;
    transaction.execute_batch(migration.down_sql)?;
    transaction.execute(
        &format!("DELETE FROM {MIGRATIONS_TABLE} WHERE version = ?1"),
        [migration.version],
    )?;
    transaction.commit()
}

pub(crate) fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
    )
}

pub(crate) fn invalid_value(message: &str) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::other(message.to_string())))
}

fn column_error(index: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        index,
        rusqlite::types::Type::Text,
        Box::new(std::io::Error::other(message)),
    )
}

/// Timestamps are stored as fixed-width RFC 3339 UTC text so they sort lexicographically
pub(crate) fn timestamp_text(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn now_text() -> String {
    timestamp_text(Utc::now())
}

pub(crate) fn date_text(value: NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub(crate) fn timestamp_column(row: &Row<'_>, index: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(index)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| column_error(index, format!("invalid timestamp '{raw}': {error}")))
}

pub(crate) fn date_column(row: &Row<'_>, index: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(index)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|error| column_error(index, format!("invalid date '{raw}': {error}")))
}

pub(crate) fn json_column(row: &Row<'_>, index: usize) -> rusqlite::Result<Option<Value>> {
    let raw: Option<String> = row.get(index)?;
    raw.map(|text| {
        serde_json::from_str(&text)
            .map_err(|error| column_error(index, format!("invalid json: {error}")))
    })
    .transpose()
}

pub(crate) fn json_text(value: Option<&Value>) -> Option<String> {
    value.map(Value::to_string)
}

pub(crate) fn bool_to_sqlite(value: bool) -> i64 {
    if value { 1 } else { 0 }
}

pub(crate) fn sqlite_to_bool(value: i64) -> bool {
    value != 0
}
