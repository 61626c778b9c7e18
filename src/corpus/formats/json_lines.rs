//! Generic JSON lines
//!
//! One JSON object per line, loaded into a single table named by the user.
//! The table's columns are not known up front:
//!
//! 1. Column names come from a headers file (one per line) or, failing that,
//!    from the keys of the first record. Either way they are sorted.
//! 2. Column types are guessed by [`guess_columns`], a pre-pass over the
//!    input that samples non-empty values per column and counts which of
//!    text, real and integer each value parses as. The type with the most
//!    hits wins, ties going to integer, then real, then text.
//! 3. The input is re-opened and loaded for real. Missing keys and empty
//!    strings load as NULL; real columns accept thousands separators.

use super::Format;
use crate::corpus::block::Scalar;
use crate::corpus::grammar::{FieldSelection, Grammar, RecordGrammar, Syntax};
use crate::corpus::schema::{ColumnSpec, ColumnType, RowPlan, Schema, TableSpec};
use crate::corpus::source::InputSpec;
use serde_json::Value;
use std::fs;
use std::io::{self, BufRead};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum GuessError {
    #[error("cannot read input: {0}")]
    Io(#[from] io::Error),
    #[error("line {line_number}: {source}")]
    Decode {
        line_number: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line_number}: record is not an object")]
    NotAnObject { line_number: usize },
    #[error("no columns: the input has no records and no headers were given")]
    NoColumns,
}

/// Per-column tally of successful casts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Tally {
    text: usize,
    real: usize,
    integer: usize,
    sampled: usize,
}

impl Tally {
    fn observe(&mut self, cell: &str) {
        let cell = cell.trim();
        if cell.is_empty() {
            return;
        }
        let cell = if cell.contains(',') {
            let mut digits = cell.replace(',', "");
            if !digits.contains('E') {
                digits.push_str("E0");
            }
            digits
        } else {
            cell.to_string()
        };
        self.sampled += 1;
        self.text += 1;
        if cell.parse::<f64>().is_ok() {
            self.real += 1;
        }
        if cell.parse::<i64>().is_ok() {
            self.integer += 1;
        }
    }

    /// Later entries win ties.
    fn column_type(&self) -> ColumnType {
        let mut best = (ColumnType::Text, self.text);
        for candidate in [(ColumnType::Real, self.real), (ColumnType::Integer, self.integer)] {
            if candidate.1 > 0 && candidate.1 >= best.1 {
                best = candidate;
            }
        }
        best.0
    }
}

/// Read a headers file: one column name per line, blank lines ignored.
pub fn read_headers(path: impl AsRef<Path>) -> io::Result<Vec<String>> {
    let text = fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// Sample `reader` and decide each column's name and type.
pub fn guess_columns<R: BufRead>(
    reader: R,
    headers: Option<Vec<String>>,
    sample_size: usize,
) -> Result<Vec<(String, ColumnType)>, GuessError> {
    let mut names = headers.map(|mut names| {
        names.sort();
        names
    });
    let mut tallies: Vec<Tally> = names
        .as_ref()
        .map(|names| vec![Tally::default(); names.len()])
        .unwrap_or_default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_number = index + 1;
        let record: Value = serde_json::from_str(line)
            .map_err(|source| GuessError::Decode { line_number, source })?;
        let object = record
            .as_object()
            .ok_or(GuessError::NotAnObject { line_number })?;

        let columns = names.get_or_insert_with(|| {
            let mut keys: Vec<String> = object.keys().cloned().collect();
            keys.sort();
            keys
        });
        tallies.resize(columns.len(), Tally::default());

        for (name, tally) in columns.iter().zip(tallies.iter_mut()) {
            if let Some(cell) = object.get(name).and_then(|v| Scalar::from_json(v).render()) {
                tally.observe(&cell);
            }
        }
        if tallies.iter().all(|t| t.sampled >= sample_size) {
            break;
        }
    }

    let names = names.filter(|n| !n.is_empty()).ok_or(GuessError::NoColumns)?;
    Ok(names
        .into_iter()
        .zip(tallies)
        .map(|(name, tally)| (name, tally.column_type()))
        .collect())
}

pub fn grammar(columns: &[(String, ColumnType)]) -> Grammar {
    Grammar::Records(RecordGrammar {
        syntax: Syntax::Json,
        fields: FieldSelection::Named(columns.iter().map(|(name, _)| name.clone()).collect()),
        required: Vec::new(),
        groups: Vec::new(),
    })
}

pub fn schema(table: &str, columns: &[(String, ColumnType)]) -> Schema {
    Schema {
        tables: vec![TableSpec::new(
            table,
            columns
                .iter()
                .map(|(name, ty)| ColumnSpec::own(name, *ty, name).loose())
                .collect(),
        )],
        plan: RowPlan::new(0),
    }
}

pub fn format(table: &str, columns: &[(String, ColumnType)]) -> Format {
    Format {
        name: "json",
        grammar: grammar(columns),
        schema: schema(table, columns),
        timestamp_field: None,
    }
}

/// Run the guessing pre-pass over `input` and build the format for `table`.
/// The input is opened here and again by the loader.
pub fn prepare(
    input: &InputSpec,
    table: &str,
    headers: Option<Vec<String>>,
    sample_size: usize,
) -> Result<Format, GuessError> {
    let columns = guess_columns(input.open()?, headers, sample_size)?;
    info!(
        table,
        columns = %columns
            .iter()
            .map(|(name, ty)| format!("{name}:{ty}"))
            .collect::<Vec<_>>()
            .join(","),
        "guessed column types"
    );
    Ok(format(table, &columns))
}
