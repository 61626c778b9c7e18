//! Record-per-line blocks
//!
//! Each non-blank line is one literal map. Root fields are projected by
//! name; child groups are pulled out of nested lists and maps by key path.

use super::{corrupt, io_error, skip_blank_lines, Corruption, ReadError};
use crate::corpus::block::{Record, Scalar};
use crate::corpus::grammar::{FieldSelection, GroupShape, RecordGrammar, RecordGroup, Syntax};
use crate::corpus::literal;
use crate::corpus::source::LineCursor;
use serde_json::Value;
use std::io::BufRead;

/// Read one record line. `Ok(None)` when the stream is exhausted.
pub fn read_block<R: BufRead>(
    cursor: &mut LineCursor<R>,
    grammar: &RecordGrammar,
    ordinal: usize,
) -> Result<Option<Record>, ReadError> {
    skip_blank_lines(cursor, ordinal)?;
    let line = match cursor.next_line().map_err(io_error(ordinal))? {
        Some(line) => line,
        None => return Ok(None),
    };
    let line_number = cursor.line_number();
    decode_record(&line, grammar)
        .map(Some)
        .map_err(|reason| corrupt(ordinal, line_number, &line, Corruption::Malformed(reason)))
}

/// Decode one line into a record tree.
pub fn decode_record(line: &str, grammar: &RecordGrammar) -> Result<Record, String> {
    let value = match grammar.syntax {
        Syntax::Json => serde_json::from_str::<Value>(line).map_err(|e| e.to_string())?,
        Syntax::Literal => literal::parse(line).map_err(|e| e.to_string())?,
    };
    let object = value
        .as_object()
        .ok_or_else(|| "record is not a map".to_string())?;

    if let Some(missing) = grammar.required.iter().find(|key| !object.contains_key(*key)) {
        return Err(format!("missing required key '{missing}'"));
    }

    let mut record = Record::new();
    match &grammar.fields {
        FieldSelection::Named(names) => {
            for name in names {
                let value = object.get(name).map_or(Scalar::Null, Scalar::from_json);
                record.set(name, value);
            }
        }
        FieldSelection::All => {
            let mut names: Vec<&String> = object.keys().collect();
            names.sort();
            for name in names {
                record.set(name, Scalar::from_json(&object[name.as_str()]));
            }
        }
    }

    for group in &grammar.groups {
        record.group_mut(&group.group);
        if let Some(value) = lookup(&value, &group.path) {
            extract(&mut record, group, value)?;
        }
    }
    Ok(record)
}

/// Follow a key path; null counts as absent.
fn lookup<'v>(value: &'v Value, path: &[String]) -> Option<&'v Value> {
    path.iter()
        .try_fold(value, |current, key| current.get(key))
        .filter(|found| !found.is_null())
}

fn extract(record: &mut Record, group: &RecordGroup, value: &Value) -> Result<(), String> {
    let path = group.path.join(".");
    match &group.shape {
        GroupShape::Items { field } => {
            let items = value
                .as_array()
                .ok_or_else(|| format!("'{path}' is not a list"))?;
            push_items(record, &group.group, field, items);
        }
        GroupShape::FirstItems { field } => {
            let lists = value
                .as_array()
                .ok_or_else(|| format!("'{path}' is not a list"))?;
            if let Some(first) = lists.first() {
                let items = first
                    .as_array()
                    .ok_or_else(|| format!("'{path}[0]' is not a list"))?;
                push_items(record, &group.group, field, items);
            }
        }
        GroupShape::Entries { key, value: value_field } => {
            let entries = value
                .as_object()
                .ok_or_else(|| format!("'{path}' is not a map"))?;
            for (name, entry) in entries {
                let child = Record::new()
                    .with(key, Scalar::text(name.as_str()))
                    .with(value_field, Scalar::from_json(entry));
                record.push_child(&group.group, child);
            }
        }
    }
    Ok(())
}

fn push_items(record: &mut Record, group: &str, field: &str, items: &[Value]) {
    for item in items {
        record.push_child(group, Record::new().with(field, Scalar::from_json(item)));
    }
}
