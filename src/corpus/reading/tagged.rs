//! Tagged-line blocks
//!
//! Lines are read in strict rule order. Each line is split into its leading
//! tag token and the payload after it; a required tag that does not match is
//! a corruption, an optional or repeated tag that does not match is simply
//! absent and the next rule gets to look at the same line.

use super::{corrupt, io_error, skip_blank_lines, Corruption, ReadError};
use crate::corpus::block::{Record, Scalar};
use crate::corpus::grammar::{Occurs, Payload, Placement, TagRule, TaggedGrammar, Terminator};
use crate::corpus::source::{is_blank, LineCursor};
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::BufRead;

static TAG_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?P<tag>\S+)(?:[ \t]+(?P<payload>.*?))?\s*$").unwrap());

/// Split a line into `(tag, payload)`. Blank lines have no tag.
pub fn split_tag(line: &str) -> Option<(&str, &str)> {
    let captures = TAG_LINE.captures(line)?;
    let tag = captures.name("tag")?.as_str();
    let payload = captures.name("payload").map_or("", |m| m.as_str());
    Some((tag, payload))
}

/// Read one tagged block. `Ok(None)` when the stream is exhausted.
pub fn read_block<R: BufRead>(
    cursor: &mut LineCursor<R>,
    grammar: &TaggedGrammar,
    ordinal: usize,
) -> Result<Option<Record>, ReadError> {
    skip_blank_lines(cursor, ordinal)?;
    if cursor.at_end().map_err(io_error(ordinal))? {
        return Ok(None);
    }

    let mut record = Record::new();
    for rule in &grammar.rules {
        if let Placement::Group(group) = &rule.placement {
            record.group_mut(group);
        }
        match rule.occurs {
            Occurs::One => {
                let line = match cursor.next_line().map_err(io_error(ordinal))? {
                    Some(line) => line,
                    None => {
                        return Err(corrupt(
                            ordinal,
                            cursor.line_number() + 1,
                            "",
                            Corruption::UnexpectedEnd,
                        ))
                    }
                };
                let payload = match split_tag(&line) {
                    Some((tag, payload)) if tag == rule.tag => payload,
                    other => {
                        let found = other.map_or("", |(tag, _)| tag).to_string();
                        return Err(corrupt(
                            ordinal,
                            cursor.line_number(),
                            &line,
                            Corruption::UnexpectedTag {
                                expected: rule.tag.clone(),
                                found,
                            },
                        ));
                    }
                };
                place(&mut record, rule, payload)
                    .map_err(|kind| corrupt(ordinal, cursor.line_number(), &line, kind))?;
            }
            Occurs::Optional => match take_tagged(cursor, &rule.tag, ordinal)? {
                Some(line) => place_line(&mut record, rule, &line, cursor, ordinal)?,
                None => mark_absent(&mut record, rule),
            },
            Occurs::Many => {
                while let Some(line) = take_tagged(cursor, &rule.tag, ordinal)? {
                    place_line(&mut record, rule, &line, cursor, ordinal)?;
                }
            }
        }
    }

    let next = cursor
        .peek_line()
        .map_err(io_error(ordinal))?
        .map(str::to_string);
    match next {
        Some(line) if is_blank(&line) => {
            cursor.next_line().map_err(io_error(ordinal))?;
        }
        Some(line) => {
            return Err(corrupt(
                ordinal,
                cursor.line_number() + 1,
                &line,
                Corruption::UnexpectedLine,
            ))
        }
        None if grammar.terminator == Terminator::BlankOrEnd => {}
        None => {
            return Err(corrupt(
                ordinal,
                cursor.line_number() + 1,
                "",
                Corruption::UnexpectedEnd,
            ))
        }
    }
    Ok(Some(record))
}

/// Consume the next line if it carries `tag`.
fn take_tagged<R: BufRead>(
    cursor: &mut LineCursor<R>,
    tag: &str,
    ordinal: usize,
) -> Result<Option<String>, ReadError> {
    let matches = match cursor.peek_line().map_err(io_error(ordinal))? {
        Some(line) => split_tag(line).is_some_and(|(found, _)| found == tag),
        None => false,
    };
    if !matches {
        return Ok(None);
    }
    cursor.next_line().map_err(io_error(ordinal))
}

fn place_line<R: BufRead>(
    record: &mut Record,
    rule: &TagRule,
    line: &str,
    cursor: &LineCursor<R>,
    ordinal: usize,
) -> Result<(), ReadError> {
    let payload = split_tag(line).map_or("", |(_, payload)| payload);
    place(record, rule, payload).map_err(|kind| corrupt(ordinal, cursor.line_number(), line, kind))
}

/// Store a tag's payload according to its rule.
fn place(record: &mut Record, rule: &TagRule, payload: &str) -> Result<(), Corruption> {
    match &rule.payload {
        Payload::Fields(names) => {
            let words: Vec<&str> = payload.split_whitespace().collect();
            if words.len() != names.len() {
                return Err(Corruption::FieldCount {
                    expected: names.len(),
                    found: words.len(),
                });
            }
            let mut fields = Record::new();
            for (name, word) in names.iter().zip(words) {
                fields.set(name, Scalar::text(word));
            }
            match &rule.placement {
                Placement::Root => record.fields.extend(fields.fields),
                Placement::Group(group) => record.push_child(group, fields),
            }
        }
        Payload::Text(name) => {
            let value = Scalar::text(payload);
            match &rule.placement {
                Placement::Root => record.set(name, value),
                Placement::Group(group) => record.push_child(group, Record::new().with(name, value)),
            }
        }
        Payload::Words(name) => match &rule.placement {
            Placement::Root => record.set(name, Scalar::text(payload)),
            Placement::Group(group) => {
                for word in payload.split_whitespace() {
                    record.push_child(group, Record::new().with(name, Scalar::text(word)));
                }
            }
        },
    }
    Ok(())
}

/// An absent optional root tag leaves its fields null; groups stay empty.
fn mark_absent(record: &mut Record, rule: &TagRule) {
    if rule.placement != Placement::Root {
        return;
    }
    let names: Vec<&String> = match &rule.payload {
        Payload::Fields(names) => names.iter().collect(),
        Payload::Text(name) | Payload::Words(name) => vec![name],
    };
    for name in names {
        record.set(name, Scalar::Null);
    }
}
