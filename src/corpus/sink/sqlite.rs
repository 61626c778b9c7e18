//! SQLite sink
//!
//! Tables are created outside the run's transaction, so a rollback removes
//! rows but keeps the schema. Existence is checked against `sqlite_master`
//! before creating; any other creation failure is surfaced, not swallowed.

use super::{Sink, SinkError, TableStatus};
use crate::corpus::schema::{TableSpec, Value};
use rusqlite::{params_from_iter, Connection, ErrorCode, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const STATEMENT_CACHE_CAPACITY: usize = 64;

pub struct SqliteSink {
    conn: Connection,
    insert_sql: HashMap<String, String>,
    in_transaction: bool,
}

impl SqliteSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let conn = Connection::open(path.as_ref()).map_err(unusable)?;
        Ok(Self::with_connection(conn))
    }

    pub fn in_memory() -> Result<Self, SinkError> {
        let conn = Connection::open_in_memory().map_err(unusable)?;
        Ok(Self::with_connection(conn))
    }

    pub fn with_connection(conn: Connection) -> Self {
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
        Self {
            conn,
            insert_sql: HashMap::new(),
            in_transaction: false,
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    pub fn table_exists(&self, name: &str) -> Result<bool, SinkError> {
        self.conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                [name],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
            .map_err(unusable)
    }

    fn execute_control(&self, statement: &str) -> Result<(), SinkError> {
        self.conn.execute_batch(statement).map_err(unusable)
    }
}

impl Sink for SqliteSink {
    fn create_table(&mut self, table: &TableSpec) -> Result<TableStatus, SinkError> {
        if self.table_exists(&table.name)? {
            return Ok(TableStatus::AlreadyExists);
        }
        let sql = table.create_sql();
        debug!(%sql, "creating table");
        self.conn.execute_batch(&sql).map_err(unusable)?;
        Ok(TableStatus::Created)
    }

    fn begin(&mut self) -> Result<(), SinkError> {
        self.execute_control("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }

    fn insert_row(&mut self, table: &TableSpec, values: &[Value]) -> Result<(), SinkError> {
        let sql = self
            .insert_sql
            .entry(table.name.clone())
            .or_insert_with(|| table.insert_sql());
        let mut statement = self
            .conn
            .prepare_cached(sql.as_str())
            .map_err(|error| classify(&table.name, error))?;
        statement
            .execute(params_from_iter(values.iter()))
            .map(|_| ())
            .map_err(|error| classify(&table.name, error))
    }

    fn commit(&mut self) -> Result<(), SinkError> {
        self.execute_control("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SinkError> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.execute_control("ROLLBACK")
    }
}

fn unusable(error: rusqlite::Error) -> SinkError {
    SinkError::Unusable {
        reason: error.to_string(),
    }
}

/// Split insert failures into per-row rejections and dead-store conditions.
fn classify(table: &str, error: rusqlite::Error) -> SinkError {
    let fatal = match &error {
        rusqlite::Error::SqliteFailure(failure, _) => matches!(
            failure.code,
            ErrorCode::DatabaseCorrupt
                | ErrorCode::NotADatabase
                | ErrorCode::CannotOpen
                | ErrorCode::DiskFull
                | ErrorCode::SystemIoFailure
                | ErrorCode::ReadOnly
                | ErrorCode::OutOfMemory
                | ErrorCode::DatabaseBusy
                | ErrorCode::DatabaseLocked
                | ErrorCode::PermissionDenied
                | ErrorCode::InternalMalfunction
        ),
        _ => false,
    };
    if fatal {
        unusable(error)
    } else {
        SinkError::Rejected {
            table: table.to_string(),
            reason: error.to_string(),
        }
    }
}
