//! Supported corpus formats
//!
//! Each format pairs a [`Grammar`] (how the file is cut into blocks) with a
//! [`Schema`] (which tables the blocks land in). Table names are derived from
//! a user-supplied prefix where the format takes one.
//!
//! | Format | Grammar | Tables |
//! |---|---|---|
//! | [`wiki`] | tagged lines | `<prefix>_revision` plus one table per tag |
//! | [`clusters`] | count-driven | `<prefix>_roots`, `_derivatives`, `_phrase_info` |
//! | [`memes`] | tagged lines | `<prefix>_times`, `_quotes`, `_links` |
//! | [`amazon`] | literal per line | `amz_metadata` and six child tables |
//! | [`json_lines`] | JSON per line | one table, columns guessed from the data |

pub mod amazon;
pub mod clusters;
pub mod json_lines;
pub mod memes;
pub mod wiki;

use crate::corpus::grammar::Grammar;
use crate::corpus::reading::BlockReader;
use crate::corpus::schema::Schema;
use std::io::BufRead;

/// Everything needed to load one kind of corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct Format {
    pub name: &'static str,
    pub grammar: Grammar,
    pub schema: Schema,
    /// Root field the `--min-date` filter compares against.
    pub timestamp_field: Option<String>,
}

impl Format {
    /// Lazily read this format's blocks from `reader`.
    pub fn reader<R: BufRead>(&self, reader: R) -> BlockReader<R> {
        BlockReader::new(reader, self.grammar.clone())
    }
}

/// Names accepted on the command line, in display order.
pub const FORMAT_NAMES: [&str; 5] = ["wiki", "clusters", "memes", "amazon", "json"];
