//! Sink
//!
//! The relational store a run writes into. The pipeline drives it in a fixed
//! order: every `create_table` first, then `begin`, any number of
//! `insert_row`, and exactly one of `commit` or `rollback`.
//!
//! Table creation is "create if absent": an existing table is reported as
//! [`TableStatus::AlreadyExists`] and left untouched, so reruns append.

pub mod sqlite;

pub use sqlite::SqliteSink;

use crate::corpus::schema::{TableSpec, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStatus {
    Created,
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// This one row was refused (constraint, type); the store is still fine.
    #[error("insert into {table} rejected: {reason}")]
    Rejected { table: String, reason: String },
    /// The store cannot be used any more (I/O, corruption, locking, open failure).
    #[error("store unusable: {reason}")]
    Unusable { reason: String },
}

impl SinkError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, SinkError::Unusable { .. })
    }
}

pub trait Sink {
    fn create_table(&mut self, table: &TableSpec) -> Result<TableStatus, SinkError>;
    fn begin(&mut self) -> Result<(), SinkError>;
    fn insert_row(&mut self, table: &TableSpec, values: &[Value]) -> Result<(), SinkError>;
    fn commit(&mut self) -> Result<(), SinkError>;
    fn rollback(&mut self) -> Result<(), SinkError>;
}
