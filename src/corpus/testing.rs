//! Testing utilities
//!
//! Two rules for tests in this crate:
//!
//! 1. Take corpus text from [`samples`] instead of spelling it out in every
//!    test. The dumps have fiddly whitespace conventions (tabs versus spaces,
//!    blank separators) that are easy to get subtly wrong, and a wrong sample
//!    makes a test pass for the wrong reason.
//! 2. Check loaded data through [`table_rows`] / [`render_table`], which read
//!    rows back in insertion order, rather than through counts alone.
//!
//! ```rust-example
//! let mut sink = SqliteSink::in_memory()?;
//! let format = wiki::format("w");
//! ingest(&format, &mut sink, format.reader(samples::WIKI_SCENARIO.as_bytes()), &options)?;
//! assert_eq!(render_table(sink.connection(), "w_category")?, "20 | 'Foo'");
//! ```

use crate::corpus::schema::{quote_identifier, Value};
use rusqlite::Connection;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Curated corpus snippets.
pub mod samples {
    /// One revision with one category.
    pub const WIKI_SCENARIO: &str = "REVISION 10 20 \"Page\" 2020-01-01 alice 5\nCATEGORY Foo\n\n";

    /// Three revisions; the second carries every optional tag.
    pub const WIKI_THREE: &str = "REVISION 1 100 First 2019-05-01T10:00:00Z ann 11\n\
CATEGORY Alpha Beta\n\
\n\
REVISION 2 200 Second 2020-07-01T10:00:00Z bob 12\n\
CATEGORY Gamma\n\
IMAGE pic.png\n\
MAIN Linked_Page\n\
TALK Talk:Second\n\
USER User:bob\n\
USER_TALK User_talk:bob\n\
OTHER Other:x\n\
EXTERNAL http://example.org\n\
TEMPLATE Cite\n\
COMMENT rewrote the intro\n\
MINOR 0\n\
TEXTDATA 512\n\
\n\
REVISION 3 300 Third 2021-01-01T00:00:00Z cy 13\n\
\n";

    /// Same as [`WIKI_THREE`] but the second revision has a non-numeric
    /// article id.
    pub const WIKI_BAD_FIELD: &str = "REVISION 1 100 First 2019-05-01T10:00:00Z ann 11\n\
CATEGORY Alpha Beta\n\
\n\
REVISION two 200 Second 2020-07-01T10:00:00Z bob 12\n\
CATEGORY Gamma\n\
\n\
REVISION 3 300 Third 2021-01-01T00:00:00Z cy 13\n\
\n";

    /// Same as [`WIKI_THREE`] but the third block opens with the wrong tag.
    pub const WIKI_CORRUPT_THIRD: &str = "REVISION 1 100 First 2019-05-01T10:00:00Z ann 11\n\
CATEGORY Alpha Beta\n\
\n\
REVISION 2 200 Second 2020-07-01T10:00:00Z bob 12\n\
\n\
REVISON 3 300 Third 2021-01-01T00:00:00Z cy 13\n\
\n";

    /// Root with two phrase sections of one url each; no header.
    pub const CLUSTER_SCENARIO: &str = "2\t50\troot\t1\n\
\t30\t1\tfirst phrase\t11\n\
\t\t2008-08-01 00:00:00\t3\tB\thttp://a.example\n\
\n\
\t20\t1\tsecond phrase\t12\n\
\t\t2008-08-02 00:00:00\t1\tM\thttp://b.example\n\
\n";

    /// The six-line preamble the real cluster dumps start with.
    pub const CLUSTER_HEADER: &str = "format:\n\
<ClSz>\t<TotFq>\t<Root>\t<ClusterId>\n\
\t<QtFq>\t<Urls>\t<QtStr>\t<QuteId>\n\
\t\t<Tm>\t<Fq>\t<UrlTy>\t<Url>\n\
\n\
\n";

    pub const MEMES: &str = "P\thttp://blog.example/post\n\
T\t2008-08-01 00:00:16\n\
Q\tthat's not change you can believe in\n\
Q\tlipstick on a pig\n\
L\thttp://news.example/a\n\
\n\
P\thttp://blog.example/other\n\
T\t2008-08-01 00:00:19\n\
L\thttp://news.example/b\n\
L\thttp://news.example/c\n";

    pub const AMAZON: &str = "{'asin': '0000031852', 'title': 'Girls Ballet Tutu Zebra Hot Pink', 'price': 3.17, \
'imUrl': 'http://ecx.images-amazon.com/images/I/51fAmVkTbyL._SY300_.jpg', \
'related': {'also_bought': ['B00JHONN1S', 'B002BZX8Z6'], 'bought_together': ['B002BZX8Z6']}, \
'salesRank': {'Toys & Games': 211836}, 'categories': [['Sports & Outdoors', 'Other Sports', 'Dance']]}\n\
{'asin': '0000032069', 'title': \"Adult Ballet Tutu Cheetah Pink\", 'brand': None, 'price': 7.89}\n";

    pub const JSON_LINES: &str = "{\"name\": \"widget\", \"count\": 3, \"price\": \"1,250.50\"}\n\
{\"name\": \"gadget\", \"count\": 12, \"price\": \"9.99\"}\n\
\n\
{\"name\": \"doohickey\", \"price\": \"\"}\n";
}

/// All rows of `table` in insertion order.
pub fn table_rows(conn: &Connection, table: &str) -> rusqlite::Result<Vec<Vec<Value>>> {
    let sql = format!("SELECT * FROM {} ORDER BY rowid", quote_identifier(table));
    let mut statement = conn.prepare(&sql)?;
    let width = statement.column_count();
    let rows = statement.query_map([], |row| {
        (0..width)
            .map(|index| row.get::<_, rusqlite::types::Value>(index).map(Value::from))
            .collect()
    })?;
    rows.collect()
}

pub fn row_count(conn: &Connection, table: &str) -> rusqlite::Result<usize> {
    let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table));
    conn.query_row(&sql, [], |row| row.get::<_, i64>(0))
        .map(|count| count as usize)
}

/// One line per row, values separated by `" | "`; text is single-quoted.
pub fn render_table(conn: &Connection, table: &str) -> rusqlite::Result<String> {
    let rows = table_rows(conn, table)?;
    Ok(rows
        .iter()
        .map(|row| {
            row.iter()
                .map(|value| match value {
                    Value::Text(text) => format!("'{text}'"),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(" | ")
        })
        .collect::<Vec<_>>()
        .join("\n"))
}

pub fn write_gzip(path: impl AsRef<Path>, text: &str) -> io::Result<()> {
    let file = File::create(path)?;
    let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    encoder.write_all(text.as_bytes())?;
    encoder.finish().map(|_| ())
}

pub fn write_bz2(path: impl AsRef<Path>, text: &str) -> io::Result<()> {
    let file = File::create(path)?;
    let mut encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::default());
    encoder.write_all(text.as_bytes())?;
    encoder.finish().map(|_| ())
}
