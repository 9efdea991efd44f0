use std::fs;
use std::path::Path;

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, ToSql, TransactionBehavior};
use seed_core::{ErrorInfo, SeedError};

use crate::record::{ExecutionRecord, ExecutionStatus, RecordDraft, RecordFilter};
use crate::store::TrackingStore;

pub const SCHEMA_VERSION: i64 = 1;

const COLUMNS: &str = "id, seeder_name, environment, batch_number, started_at, finished_at, \
                       records_affected, status, error_message, content_hash";

/// Tracking store persisted in a SQLite database.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (creating if needed) the database at `path` and ensures the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SeedError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| {
                    SeedError::Tracking(
                        ErrorInfo::new("tracking-create", "failed to create tracking directory")
                            .with_context("path", parent.display().to_string())
                            .with_hint(err.to_string()),
                    )
                })?;
            }
        }
        let conn = Connection::open(path).map_err(|err| {
            SeedError::Tracking(
                ErrorInfo::new("tracking-sqlite-open", "failed to open tracking database")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, SeedError> {
        let conn = Connection::open_in_memory().map_err(wrap("tracking-sqlite-open"))?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self, SeedError> {
        init_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn init_schema(conn: &Connection) -> Result<(), SeedError> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS seeder_meta(version INTEGER NOT NULL);
        CREATE TABLE IF NOT EXISTS seeder_executions(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            seeder_name TEXT NOT NULL,
            environment TEXT NOT NULL,
            batch_number INTEGER NOT NULL,
            started_at TEXT NOT NULL,
            finished_at TEXT,
            records_affected INTEGER NOT NULL DEFAULT 0 CHECK (records_affected >= 0),
            status TEXT NOT NULL,
            error_message TEXT,
            content_hash TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_seeder_executions_lookup
            ON seeder_executions(seeder_name, environment);
        CREATE INDEX IF NOT EXISTS idx_seeder_executions_batch
            ON seeder_executions(batch_number);
        CREATE TABLE IF NOT EXISTS seeder_batch_counter(
            id INTEGER PRIMARY KEY CHECK (id = 1),
            value INTEGER NOT NULL
        );
        INSERT OR IGNORE INTO seeder_batch_counter(id, value) VALUES (1, 0);
        COMMIT;",
    )
    .map_err(wrap("tracking-schema"))?;
    set_version(conn, SCHEMA_VERSION)
}

fn set_version(conn: &Connection, version: i64) -> Result<(), SeedError> {
    let existing: Option<i64> = conn
        .query_row("SELECT version FROM seeder_meta LIMIT 1", [], |row| row.get(0))
        .optional()
        .map_err(wrap("tracking-schema"))?;
    match existing {
        Some(current) if current == version => Ok(()),
        Some(current) => Err(SeedError::Tracking(ErrorInfo::new(
            "tracking-schema-version",
            format!("tracking schema {current} incompatible with expected {version}"),
        ))),
        None => {
            conn.execute(
                "INSERT INTO seeder_meta(version) VALUES (?1)",
                params![version],
            )
            .map_err(wrap("tracking-schema"))?;
            Ok(())
        }
    }
}

impl TrackingStore for SqliteStore {
    fn insert(&mut self, draft: &RecordDraft) -> Result<i64, SeedError> {
        self.conn
            .execute(
                "INSERT INTO seeder_executions(seeder_name, environment, batch_number, started_at,
                    finished_at, records_affected, status, error_message, content_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    draft.seeder_name,
                    draft.environment,
                    to_sql_int(draft.batch_number)?,
                    draft.started_at,
                    draft.finished_at,
                    to_sql_int(draft.records_affected)?,
                    draft.status.as_str(),
                    draft.error_message,
                    draft.content_hash,
                ],
            )
            .map_err(wrap("tracking-insert"))?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update(&mut self, record: &ExecutionRecord) -> Result<(), SeedError> {
        let changed = self
            .conn
            .execute(
                "UPDATE seeder_executions SET seeder_name = ?2, environment = ?3,
                    batch_number = ?4, started_at = ?5, finished_at = ?6, records_affected = ?7,
                    status = ?8, error_message = ?9, content_hash = ?10
                 WHERE id = ?1",
                params![
                    record.id,
                    record.seeder_name,
                    record.environment,
                    to_sql_int(record.batch_number)?,
                    record.started_at,
                    record.finished_at,
                    to_sql_int(record.records_affected)?,
                    record.status.as_str(),
                    record.error_message,
                    record.content_hash,
                ],
            )
            .map_err(wrap("tracking-update"))?;
        if changed == 0 {
            return Err(SeedError::Tracking(
                ErrorInfo::new("tracking-missing-record", "tracking row does not exist")
                    .with_context("id", record.id.to_string()),
            ));
        }
        Ok(())
    }

    fn query(&self, filter: &RecordFilter) -> Result<Vec<ExecutionRecord>, SeedError> {
        let (clause, values) = where_clause(filter)?;
        let sql = format!("SELECT {COLUMNS} FROM seeder_executions{clause} ORDER BY id");
        let mut stmt = self.conn.prepare(&sql).map_err(wrap("tracking-query"))?;
        let bound: Vec<&dyn ToSql> = values.iter().map(|value| value.as_ref()).collect();
        let rows = stmt
            .query_map(bound.as_slice(), row_to_record)
            .map_err(wrap("tracking-query"))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(wrap("tracking-query"))
    }

    fn delete(&mut self, filter: &RecordFilter) -> Result<usize, SeedError> {
        let (clause, values) = where_clause(filter)?;
        let sql = format!("DELETE FROM seeder_executions{clause}");
        let bound: Vec<&dyn ToSql> = values.iter().map(|value| value.as_ref()).collect();
        self.conn
            .execute(&sql, bound.as_slice())
            .map_err(wrap("tracking-delete"))
    }

    fn next_batch(&mut self) -> Result<u64, SeedError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(wrap("tracking-batch"))?;
        tx.execute(
            "UPDATE seeder_batch_counter
             SET value = MAX(value, (SELECT COALESCE(MAX(batch_number), 0) FROM seeder_executions)) + 1
             WHERE id = 1",
            [],
        )
        .map_err(wrap("tracking-batch"))?;
        let value: i64 = tx
            .query_row(
                "SELECT value FROM seeder_batch_counter WHERE id = 1",
                [],
                |row| row.get(0),
            )
            .map_err(wrap("tracking-batch"))?;
        tx.commit().map_err(wrap("tracking-batch"))?;
        u64::try_from(value).map_err(|_| {
            SeedError::Tracking(
                ErrorInfo::new("tracking-batch", "batch counter out of range")
                    .with_context("value", value.to_string()),
            )
        })
    }
}

fn where_clause(filter: &RecordFilter) -> Result<(String, Vec<Box<dyn ToSql>>), SeedError> {
    let mut clauses = Vec::new();
    let mut values: Vec<Box<dyn ToSql>> = Vec::new();
    if let Some(name) = &filter.seeder_name {
        values.push(Box::new(name.clone()));
        clauses.push(format!("seeder_name = ?{}", values.len()));
    }
    if let Some(environment) = &filter.environment {
        values.push(Box::new(environment.clone()));
        clauses.push(format!("environment = ?{}", values.len()));
    }
    if let Some(batch) = filter.batch_number {
        values.push(Box::new(to_sql_int(batch)?));
        clauses.push(format!("batch_number = ?{}", values.len()));
    }
    if let Some(status) = filter.status {
        values.push(Box::new(status.as_str()));
        clauses.push(format!("status = ?{}", values.len()));
    }
    if clauses.is_empty() {
        return Ok((String::new(), values));
    }
    Ok((format!(" WHERE {}", clauses.join(" AND ")), values))
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<ExecutionRecord> {
    let status: String = row.get(7)?;
    let status: ExecutionStatus = status
        .parse()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(7, Type::Text, Box::new(err)))?;
    Ok(ExecutionRecord {
        id: row.get(0)?,
        seeder_name: row.get(1)?,
        environment: row.get(2)?,
        batch_number: from_sql_int(row.get(3)?, 3)?,
        started_at: row.get(4)?,
        finished_at: row.get(5)?,
        records_affected: from_sql_int(row.get(6)?, 6)?,
        status,
        error_message: row.get(8)?,
        content_hash: row.get(9)?,
    })
}

fn to_sql_int(value: u64) -> Result<i64, SeedError> {
    i64::try_from(value).map_err(|_| {
        SeedError::Tracking(
            ErrorInfo::new("tracking-range", "value exceeds sqlite integer range")
                .with_context("value", value.to_string()),
        )
    })
}

fn from_sql_int(value: i64, column: usize) -> rusqlite::Result<u64> {
    u64::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(column, value))
}

fn wrap(code: &'static str) -> impl Fn(rusqlite::Error) -> SeedError {
    move |err| SeedError::Tracking(ErrorInfo::new(code, err.to_string()))
}
