//! Block Reader
//!
//! Consumes a [`LineCursor`] according to a [`Grammar`] and yields one
//! [`Block`] per logical record, lazily. Each call to `next` advances the
//! cursor past exactly one block's worth of lines.
//!
//! Outcomes per call:
//!
//! - `Some(Ok(block))`: a complete block; partial blocks are never produced.
//! - `Some(Err(ReadError))`: the lines at the expected position do not match
//!   the grammar (or the input failed). The error carries the block ordinal
//!   and the offending line. The reader then skips to the next recognizable
//!   block boundary where the grammar has one (blank-line terminated and
//!   record-per-line grammars) and stops otherwise (count-driven grammars).
//! - `None`: the stream ended cleanly at a block boundary.
//!
//! The per-shape algorithms live in [`tagged`], [`counted`] and [`records`].

pub mod counted;
pub mod records;
pub mod tagged;

use crate::corpus::block::{Block, Record};
use crate::corpus::grammar::Grammar;
use crate::corpus::source::{is_blank, LineCursor};
use std::io::{self, BufRead};
use thiserror::Error;

/// Why a block failed to match its grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Corruption {
    /// A line opened with a different tag than the one required here.
    #[error("expected tag '{expected}', found '{found}'")]
    UnexpectedTag { expected: String, found: String },
    /// A line appeared where the block terminator was expected.
    #[error("expected end of block")]
    UnexpectedLine,
    /// A blank line appeared where content was required.
    #[error("unexpected blank line")]
    UnexpectedBlank,
    /// The stream ended after part of the block had been read.
    #[error("unexpected end of stream")]
    UnexpectedEnd,
    /// A required blank separator line was not blank.
    #[error("expected blank separator line")]
    MissingSeparator,
    /// A line split into the wrong number of fields.
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    /// A child-count field is not a non-negative integer.
    #[error("count field '{field}' is not a count")]
    BadCount { field: String },
    /// A record line could not be decoded or has the wrong shape.
    #[error("malformed record: {0}")]
    Malformed(String),
}

/// Failure to produce a block.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("block {ordinal}: {kind} at line {line_number}: {line:?}")]
    Corrupt {
        ordinal: usize,
        line_number: usize,
        /// Offending line; empty at end of stream.
        line: String,
        kind: Corruption,
    },
    #[error("block {ordinal}: failed to read input: {source}")]
    Io {
        ordinal: usize,
        #[source]
        source: io::Error,
    },
}

impl ReadError {
    /// 1-based position of the failed block in the stream.
    pub fn ordinal(&self) -> usize {
        match self {
            ReadError::Corrupt { ordinal, .. } | ReadError::Io { ordinal, .. } => *ordinal,
        }
    }

    /// The line the block failed on, if it failed on one.
    pub fn offending_line(&self) -> Option<&str> {
        match self {
            ReadError::Corrupt { line, .. } => Some(line.as_str()),
            ReadError::Io { .. } => None,
        }
    }

    pub fn corruption(&self) -> Option<&Corruption> {
        match self {
            ReadError::Corrupt { kind, .. } => Some(kind),
            ReadError::Io { .. } => None,
        }
    }
}

pub(crate) fn io_error(ordinal: usize) -> impl Fn(io::Error) -> ReadError {
    move |source| ReadError::Io { ordinal, source }
}

pub(crate) fn corrupt(ordinal: usize, line_number: usize, line: &str, kind: Corruption) -> ReadError {
    ReadError::Corrupt {
        ordinal,
        line_number,
        line: line.to_string(),
        kind,
    }
}

/// Skip blank lines sitting between blocks.
pub(crate) fn skip_blank_lines<R: BufRead>(
    cursor: &mut LineCursor<R>,
    ordinal: usize,
) -> Result<(), ReadError> {
    while let Some(line) = cursor.peek_line().map_err(io_error(ordinal))? {
        if !is_blank(line) {
            break;
        }
        cursor.next_line().map_err(io_error(ordinal))?;
    }
    Ok(())
}

/// Consume the next line, which must exist and carry content.
pub(crate) fn next_content_line<R: BufRead>(
    cursor: &mut LineCursor<R>,
    ordinal: usize,
) -> Result<String, ReadError> {
    match cursor.next_line().map_err(io_error(ordinal))? {
        None => Err(corrupt(
            ordinal,
            cursor.line_number() + 1,
            "",
            Corruption::UnexpectedEnd,
        )),
        Some(line) if is_blank(&line) => Err(corrupt(
            ordinal,
            cursor.line_number(),
            &line,
            Corruption::UnexpectedBlank,
        )),
        Some(line) => Ok(line),
    }
}

/// Lazy sequence of blocks over one input stream.
pub struct BlockReader<R> {
    cursor: LineCursor<R>,
    grammar: Grammar,
    attempted: usize,
    started: bool,
    finished: bool,
}

impl<R: BufRead> BlockReader<R> {
    pub fn new(reader: R, grammar: Grammar) -> Self {
        Self::from_cursor(LineCursor::new(reader), grammar)
    }

    pub fn from_cursor(cursor: LineCursor<R>, grammar: Grammar) -> Self {
        Self {
            cursor,
            grammar,
            attempted: 0,
            started: false,
            finished: false,
        }
    }

    /// Lines consumed so far, header included.
    pub fn line_number(&self) -> usize {
        self.cursor.line_number()
    }

    fn read_root(&mut self, ordinal: usize) -> Result<Option<Record>, ReadError> {
        if !self.started {
            self.started = true;
            self.cursor
                .skip_lines(self.grammar.header_lines())
                .map_err(io_error(ordinal))?;
        }
        match &self.grammar {
            Grammar::Tagged(grammar) => tagged::read_block(&mut self.cursor, grammar, ordinal),
            Grammar::Counted(grammar) => counted::read_block(&mut self.cursor, grammar, ordinal),
            Grammar::Records(grammar) => records::read_block(&mut self.cursor, grammar, ordinal),
        }
    }

    /// Move to the next block boundary after a failure, or give up.
    fn recover(&mut self, error: &ReadError) {
        if matches!(error, ReadError::Io { .. }) {
            self.finished = true;
            return;
        }
        match &self.grammar {
            // The blank line that broke the block was its boundary.
            Grammar::Tagged(_) if error.offending_line().is_some_and(is_blank) => {}
            Grammar::Tagged(_) => loop {
                match self.cursor.next_line() {
                    Ok(Some(line)) if is_blank(&line) => break,
                    Ok(Some(_)) => continue,
                    Ok(None) | Err(_) => {
                        self.finished = true;
                        break;
                    }
                }
            },
            // The offending line was consumed; the next line starts the next record.
            Grammar::Records(_) => {}
            // Without a trustworthy count there is no boundary to resume from.
            Grammar::Counted(_) => self.finished = true,
        }
    }
}

impl<R: BufRead> Iterator for BlockReader<R> {
    type Item = Result<Block, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let ordinal = self.attempted + 1;
        match self.read_root(ordinal) {
            Ok(Some(root)) => {
                self.attempted = ordinal;
                Some(Ok(Block::new(ordinal, root)))
            }
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(error) => {
                self.attempted = ordinal;
                self.recover(&error);
                Some(Err(error))
            }
        }
    }
}
