//! Count-driven blocks
//!
//! A level's line declares, in its count field, how many lines of the next
//! level follow. Reading recurses level by level with the cursor passed
//! explicitly, so every nested call sees exactly the lines its parent
//! declared.

use super::{corrupt, io_error, next_content_line, skip_blank_lines, Corruption, ReadError};
use crate::corpus::block::{Record, Scalar};
use crate::corpus::grammar::{CountedGrammar, FinalSeparator};
use crate::corpus::source::{is_blank, LineCursor};
use std::io::BufRead;

/// Read one count-driven block. `Ok(None)` when the stream is exhausted.
pub fn read_block<R: BufRead>(
    cursor: &mut LineCursor<R>,
    grammar: &CountedGrammar,
    ordinal: usize,
) -> Result<Option<Record>, ReadError> {
    skip_blank_lines(cursor, ordinal)?;
    let line = match cursor.next_line().map_err(io_error(ordinal))? {
        Some(line) => line,
        None => return Ok(None),
    };
    read_level(cursor, grammar, 0, &line, ordinal).map(Some)
}

fn read_level<R: BufRead>(
    cursor: &mut LineCursor<R>,
    grammar: &CountedGrammar,
    depth: usize,
    line: &str,
    ordinal: usize,
) -> Result<Record, ReadError> {
    let line_number = cursor.line_number();
    let fail = |kind| corrupt(ordinal, line_number, line, kind);

    let level = grammar
        .levels
        .get(depth)
        .ok_or_else(|| fail(Corruption::Malformed(format!("no level at depth {depth}"))))?;
    let values: Vec<&str> = line.trim().split(grammar.delimiter).collect();
    if values.len() != level.fields.len() {
        return Err(fail(Corruption::FieldCount {
            expected: level.fields.len(),
            found: values.len(),
        }));
    }

    let mut record = Record::new();
    for (name, value) in level.fields.iter().zip(&values) {
        record.set(name, Scalar::text(*value));
    }

    let Some(count_field) = &level.count_field else {
        return Ok(record);
    };
    let count = values
        .iter()
        .zip(&level.fields)
        .find(|(_, name)| *name == count_field)
        .and_then(|(value, _)| value.trim().parse::<usize>().ok())
        .ok_or_else(|| {
            fail(Corruption::BadCount {
                field: count_field.clone(),
            })
        })?;

    let child_level = grammar.levels.get(depth + 1).ok_or_else(|| {
        fail(Corruption::Malformed(format!(
            "'{count_field}' counts lines of a level the grammar does not define"
        )))
    })?;
    record.group_mut(&child_level.group);
    for _ in 0..count {
        let child_line = next_content_line(cursor, ordinal)?;
        let child = read_level(cursor, grammar, depth + 1, &child_line, ordinal)?;
        record.push_child(&child_level.group, child);
        if child_level.separated {
            expect_separator(cursor, grammar.final_separator, ordinal)?;
        }
    }
    Ok(record)
}

fn expect_separator<R: BufRead>(
    cursor: &mut LineCursor<R>,
    final_separator: FinalSeparator,
    ordinal: usize,
) -> Result<(), ReadError> {
    match cursor.next_line().map_err(io_error(ordinal))? {
        Some(line) if is_blank(&line) => Ok(()),
        Some(line) => Err(corrupt(
            ordinal,
            cursor.line_number(),
            &line,
            Corruption::MissingSeparator,
        )),
        None if final_separator == FinalSeparator::OptionalAtEnd => Ok(()),
        None => Err(corrupt(
            ordinal,
            cursor.line_number() + 1,
            "",
            Corruption::UnexpectedEnd,
        )),
    }
}
