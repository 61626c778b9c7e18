//! Grammar Descriptor
//!
//! Declarative descriptions of how a corpus file is cut into blocks. These
//! types are pure data: the block reader interprets them, the formats in
//! [`crate::corpus::formats`] build them. Three shapes are supported:
//!
//! - [`TaggedGrammar`]: every line opens with a tag token. Tags must appear in
//!   a fixed order with a declared multiplicity, and a terminator closes the
//!   block.
//!
//!       REVISION 10 20 Page 2020-01-01 alice 5
//!       CATEGORY Foo Bar
//!       <blank>
//!
//! - [`CountedGrammar`]: positional, delimiter-separated lines where a field
//!   of each level declares how many lines of the next level follow.
//!
//!       2   50  root    1           <- 2 phrase sections follow
//!       7   1   phrase  11          <- 1 url line follows
//!       2008-08-01  1   B   http://...
//!       <blank>                     <- separator after each phrase section
//!
//! - [`RecordGrammar`]: one self-contained literal (JSON or Python-style) per
//!   line, projected onto root fields and child groups.

/// Top-level grammar of one format.
#[derive(Debug, Clone, PartialEq)]
pub enum Grammar {
    Tagged(TaggedGrammar),
    Counted(CountedGrammar),
    Records(RecordGrammar),
}

impl Grammar {
    /// Number of lines to discard before the first block.
    pub fn header_lines(&self) -> usize {
        match self {
            Grammar::Counted(counted) => counted.header_lines,
            _ => 0,
        }
    }
}

/// How many times a tag may appear at its position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occurs {
    /// Exactly one line.
    One,
    /// Zero or one line; absence yields an empty value.
    Optional,
    /// Zero or more consecutive lines.
    Many,
}

/// How the text after a tag token is split into fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Whitespace-separated positional fields; the count must match exactly.
    Fields(Vec<String>),
    /// The whole remaining line as one field.
    Text(String),
    /// Whitespace-separated words, one child record per word, each holding
    /// the word under the given field name.
    Words(String),
}

/// Where the fields read for a tag end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// Scalar fields of the block's root record.
    Root,
    /// Child records in the named collection.
    Group(String),
}

/// One tag position in a [`TaggedGrammar`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRule {
    pub tag: String,
    pub occurs: Occurs,
    pub payload: Payload,
    pub placement: Placement,
}

impl TagRule {
    /// A mandatory tag whose fields belong to the root record.
    pub fn root(tag: &str, payload: Payload) -> Self {
        Self {
            tag: tag.to_string(),
            occurs: Occurs::One,
            payload,
            placement: Placement::Root,
        }
    }

    /// A tag that may be absent; its rows go to `group`.
    pub fn optional(tag: &str, group: &str, payload: Payload) -> Self {
        Self {
            tag: tag.to_string(),
            occurs: Occurs::Optional,
            payload,
            placement: Placement::Group(group.to_string()),
        }
    }

    /// A tag that may repeat on consecutive lines; each line is one child.
    pub fn repeated(tag: &str, group: &str, payload: Payload) -> Self {
        Self {
            tag: tag.to_string(),
            occurs: Occurs::Many,
            payload,
            placement: Placement::Group(group.to_string()),
        }
    }
}

/// What closes a tagged block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    /// A blank line is mandatory.
    Blank,
    /// A blank line, or the end of the stream.
    BlankOrEnd,
}

/// Tagged-line grammar (revision-log style).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedGrammar {
    pub rules: Vec<TagRule>,
    pub terminator: Terminator,
}

/// Whether the separator after the final section of the stream is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalSeparator {
    /// Every section, including the last one in the file, is followed by a blank line.
    Required,
    /// End of stream may stand in for the blank line after the last section.
    OptionalAtEnd,
}

/// One nesting level of a [`CountedGrammar`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountedLevel {
    /// Collection the records of this level are placed in (unused for the root).
    pub group: String,
    pub fields: Vec<String>,
    /// Field holding the number of next-level lines that follow.
    pub count_field: Option<String>,
    /// A blank line follows every record of this level together with its children.
    pub separated: bool,
}

impl CountedLevel {
    pub fn new(group: &str, fields: &[&str]) -> Self {
        Self {
            group: group.to_string(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
            count_field: None,
            separated: false,
        }
    }

    pub fn counting(mut self, field: &str) -> Self {
        self.count_field = Some(field.to_string());
        self
    }

    pub fn separated(mut self) -> Self {
        self.separated = true;
        self
    }
}

/// Positional count-driven grammar (cluster-log style).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountedGrammar {
    pub header_lines: usize,
    pub delimiter: char,
    /// Root level first.
    pub levels: Vec<CountedLevel>,
    pub final_separator: FinalSeparator,
}

/// Literal syntax of a record line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Json,
    /// Python literal syntax (see [`crate::corpus::literal`]).
    Literal,
}

/// Which top-level keys become root fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSelection {
    /// Exactly these keys, in this order; missing keys are null.
    Named(Vec<String>),
    /// Every key of the record, sorted.
    All,
}

/// How a nested value becomes child records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupShape {
    /// A list; one child per item, stored under `field`.
    Items { field: String },
    /// A list of lists; only the first inner list is used.
    FirstItems { field: String },
    /// A map; one child per entry, with the key and the value as two fields.
    Entries { key: String, value: String },
}

/// A child collection extracted from a record line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordGroup {
    pub group: String,
    /// Key path from the record root; an absent path yields no children.
    pub path: Vec<String>,
    pub shape: GroupShape,
}

impl RecordGroup {
    pub fn new(group: &str, path: &[&str], shape: GroupShape) -> Self {
        Self {
            group: group.to_string(),
            path: path.iter().map(|p| p.to_string()).collect(),
            shape,
        }
    }
}

/// One literal per line (JSON-lines style).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordGrammar {
    pub syntax: Syntax,
    pub fields: FieldSelection,
    /// Keys that must be present for the line to count as a record.
    pub required: Vec<String>,
    pub groups: Vec<RecordGroup>,
}
