//! Ingestion Pipeline
//!
//! Drives Block Reader → Relational Mapper → Sink for one input stream and
//! decides the fate of the run's single transaction.
//!
//! Phases:
//!
//!     Initializing → Streaming → Committing → Done
//!                        │            │
//!                        └──→ RollingBack ──→ Done
//!
//! - Initializing: every table of the format is created unless it already
//!   exists (logged, not an error), then the transaction begins.
//! - Streaming: each item the reader yields is one [`step`](Ingestion::step).
//!   A step's failure is either [`Failure::Recoverable`] (bad field, rejected
//!   insert: logged with the block ordinal, run continues, rows the block
//!   already wrote stay) or [`Failure::Fatal`] (the reader lost its place, or
//!   the store is unusable).
//! - Committing: only after the stream ended without a fatal failure.
//! - RollingBack: on any fatal failure. Every row of the run is discarded,
//!   including rows of blocks that loaded fine.

use crate::corpus::block::Block;
use crate::corpus::formats::Format;
use crate::corpus::mapping::{map_block, MappingError};
use crate::corpus::reading::ReadError;
use crate::corpus::sink::{Sink, SinkError, TableStatus};
use crate::corpus::source::InputSpec;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOptions {
    /// Blocks between progress checkpoints; 0 disables them.
    pub checkpoint_interval: usize,
    /// Keep only blocks whose timestamp sorts strictly after this string.
    pub min_date: Option<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            checkpoint_interval: 100_000,
            min_date: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Initializing,
    Streaming,
    Committing,
    RollingBack,
    Done,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Initializing => "initializing",
            Phase::Streaming => "streaming",
            Phase::Committing => "committing",
            Phase::RollingBack => "rolling back",
            Phase::Done => "done",
        };
        write!(f, "{name}")
    }
}

/// A failure confined to one block.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BlockError {
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error("block {ordinal}: {source}")]
    Insert {
        ordinal: usize,
        #[source]
        source: SinkError,
    },
}

/// A failure that ends the run.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error("cannot create table {table}: {source}")]
    Schema {
        table: String,
        #[source]
        source: SinkError,
    },
    #[error("block {ordinal}: {source}")]
    Store {
        ordinal: usize,
        #[source]
        source: SinkError,
    },
    #[error("{action} failed: {source}")]
    Transaction {
        action: &'static str,
        #[source]
        source: SinkError,
    },
}

/// Outcome of one pipeline step that did not succeed.
#[derive(Debug)]
pub enum Failure {
    Recoverable { ordinal: usize, error: BlockError },
    Fatal(FatalError),
}

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Blocks the reader produced.
    pub blocks_read: usize,
    /// Blocks whose rows were all inserted.
    pub blocks_loaded: usize,
    /// Blocks dropped by the date filter.
    pub blocks_filtered: usize,
    /// Blocks skipped after a recoverable failure.
    pub blocks_failed: usize,
    pub rows_inserted: usize,
    pub tables_created: usize,
    pub tables_existing: usize,
    /// Progress checkpoints logged while streaming.
    pub checkpoints: usize,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("run rolled back after {} blocks: {cause}", report.blocks_read)]
    Aborted {
        cause: FatalError,
        report: IngestReport,
        /// Set when the rollback itself failed as well.
        rollback: Option<SinkError>,
    },
}

/// One run of one format against one sink.
pub struct Ingestion<'a, S: Sink> {
    format: &'a Format,
    sink: &'a mut S,
    options: &'a IngestOptions,
    phase: Phase,
    report: IngestReport,
}

impl<'a, S: Sink> Ingestion<'a, S> {
    pub fn new(format: &'a Format, sink: &'a mut S, options: &'a IngestOptions) -> Self {
        Self {
            format,
            sink,
            options,
            phase: Phase::Initializing,
            report: IngestReport::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn report(&self) -> &IngestReport {
        &self.report
    }

    /// Run all phases to completion.
    pub fn run<I>(mut self, blocks: I) -> Result<IngestReport, IngestError>
    where
        I: IntoIterator<Item = Result<Block, ReadError>>,
    {
        match self.drive(blocks) {
            Ok(()) => {
                self.enter(Phase::Done);
                info!(
                    format = self.format.name,
                    blocks = self.report.blocks_read,
                    loaded = self.report.blocks_loaded,
                    filtered = self.report.blocks_filtered,
                    failed = self.report.blocks_failed,
                    rows = self.report.rows_inserted,
                    "finished"
                );
                Ok(self.report)
            }
            Err(cause) => {
                error!(error = %cause, "fatal failure");
                self.enter(Phase::RollingBack);
                let rollback = self.sink.rollback().err();
                if let Some(failed) = &rollback {
                    error!(error = %failed, "rollback failed");
                }
                self.enter(Phase::Done);
                Err(IngestError::Aborted {
                    cause,
                    report: self.report,
                    rollback,
                })
            }
        }
    }

    fn drive<I>(&mut self, blocks: I) -> Result<(), FatalError>
    where
        I: IntoIterator<Item = Result<Block, ReadError>>,
    {
        self.initialize()?;
        self.stream(blocks)?;
        self.commit()
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "phase change");
        self.phase = phase;
        match phase {
            Phase::Streaming => info!(format = self.format.name, "streaming blocks"),
            Phase::Committing => info!(rows = self.report.rows_inserted, "committing"),
            Phase::RollingBack => warn!(rows = self.report.rows_inserted, "rolling back"),
            Phase::Initializing | Phase::Done => {}
        }
    }

    fn initialize(&mut self) -> Result<(), FatalError> {
        info!(format = self.format.name, tables = self.format.schema.tables.len(), "setting up schema");
        for table in &self.format.schema.tables {
            let status = self
                .sink
                .create_table(table)
                .map_err(|source| FatalError::Schema {
                    table: table.name.clone(),
                    source,
                })?;
            match status {
                TableStatus::Created => {
                    self.report.tables_created += 1;
                    info!(table = %table.name, "created table");
                }
                TableStatus::AlreadyExists => {
                    self.report.tables_existing += 1;
                    info!(table = %table.name, "skipping creation of existing table");
                }
            }
        }
        self.sink
            .begin()
            .map_err(|source| FatalError::Transaction {
                action: "begin",
                source,
            })
    }

    fn stream<I>(&mut self, blocks: I) -> Result<(), FatalError>
    where
        I: IntoIterator<Item = Result<Block, ReadError>>,
    {
        self.enter(Phase::Streaming);
        for item in blocks {
            match self.step(item) {
                Ok(()) => {}
                Err(Failure::Recoverable { ordinal, error }) => {
                    self.report.blocks_failed += 1;
                    warn!(block = ordinal, error = %error, "skipping block");
                }
                Err(Failure::Fatal(cause)) => return Err(cause),
            }
            if self.at_checkpoint() {
                self.report.checkpoints += 1;
                info!(
                    blocks = self.report.blocks_read,
                    rows = self.report.rows_inserted,
                    "checkpoint"
                );
            }
        }
        Ok(())
    }

    /// True right after every `checkpoint_interval`-th block read.
    fn at_checkpoint(&self) -> bool {
        let interval = self.options.checkpoint_interval;
        interval > 0 && self.report.blocks_read > 0 && self.report.blocks_read % interval == 0
    }

    /// Process one reader item: filter, map, insert.
    pub fn step(&mut self, item: Result<Block, ReadError>) -> Result<(), Failure> {
        let block = item.map_err(|error| Failure::Fatal(error.into()))?;
        self.report.blocks_read += 1;
        if !self.admits(&block) {
            self.report.blocks_filtered += 1;
            return Ok(());
        }

        let ordinal = block.ordinal;
        let rows = map_block(&block, &self.format.schema).map_err(|error| Failure::Recoverable {
            ordinal,
            error: error.into(),
        })?;
        for row in &rows {
            let table = self.format.schema.table(row.table);
            match self.sink.insert_row(table, &row.values) {
                Ok(()) => self.report.rows_inserted += 1,
                Err(source) if source.is_fatal() => {
                    return Err(Failure::Fatal(FatalError::Store { ordinal, source }))
                }
                Err(source) => {
                    return Err(Failure::Recoverable {
                        ordinal,
                        error: BlockError::Insert { ordinal, source },
                    })
                }
            }
        }
        self.report.blocks_loaded += 1;
        Ok(())
    }

    /// The date filter compares text, not calendar dates. A missing
    /// timestamp sorts as the empty string.
    fn admits(&self, block: &Block) -> bool {
        let (Some(field), Some(min_date)) = (&self.format.timestamp_field, &self.options.min_date)
        else {
            return true;
        };
        let stamp = block
            .root
            .field(field)
            .and_then(|value| value.render())
            .unwrap_or_default();
        stamp.as_str() > min_date.as_str()
    }

    fn commit(&mut self) -> Result<(), FatalError> {
        self.enter(Phase::Committing);
        self.sink
            .commit()
            .map_err(|source| FatalError::Transaction {
                action: "commit",
                source,
            })
    }
}

/// Load a stream of blocks in one transaction.
pub fn ingest<S, I>(
    format: &Format,
    sink: &mut S,
    blocks: I,
    options: &IngestOptions,
) -> Result<IngestReport, IngestError>
where
    S: Sink,
    I: IntoIterator<Item = Result<Block, ReadError>>,
{
    Ingestion::new(format, sink, options).run(blocks)
}

/// Open `input` and load every block it holds.
pub fn ingest_file<S: Sink>(
    format: &Format,
    sink: &mut S,
    input: &InputSpec,
    options: &IngestOptions,
) -> Result<IngestReport, IngestError> {
    let reader = input.open().map_err(|source| IngestError::Open {
        path: input.path.clone(),
        source,
    })?;
    ingest(format, sink, format.reader(reader), options)
}
