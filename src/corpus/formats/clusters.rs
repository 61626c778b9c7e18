//! Phrase-cluster logs
//!
//! Tab-separated, three levels deep, after a fixed preamble:
//!
//!     <cluster_size> <total_frequency> <root> <cluster_id>
//!         <total_phrase_frequency> <num_urls> <phrase> <phrase_id>
//!             <timestamp> <frequency_in_url> <url_type> <url>
//!             ...                                   (num_urls lines)
//!         <blank>
//!         ...                                       (cluster_size sections)
//!
//! The blank line after the very last phrase section of the file may be
//! missing.

use super::Format;
use crate::corpus::grammar::{CountedGrammar, CountedLevel, FinalSeparator, Grammar};
use crate::corpus::schema::{ColumnSpec, ColumnType, RowPlan, Schema, TableSpec};

pub fn grammar(header_lines: usize) -> Grammar {
    Grammar::Counted(CountedGrammar {
        header_lines,
        delimiter: '\t',
        levels: vec![
            CountedLevel::new(
                "clusters",
                &["cluster_size", "total_frequency", "root", "cluster_id"],
            )
            .counting("cluster_size"),
            CountedLevel::new(
                "phrases",
                &["total_phrase_frequency", "num_urls", "phrase", "phrase_id"],
            )
            .counting("num_urls")
            .separated(),
            CountedLevel::new("urls", &["timestamp", "frequency_in_url", "url_type", "url"]),
        ],
        final_separator: FinalSeparator::OptionalAtEnd,
    })
}

pub fn schema(prefix: &str) -> Schema {
    use ColumnType::*;

    let roots = TableSpec::new(
        format!("{prefix}_roots"),
        vec![
            ColumnSpec::own("cluster_size", Integer, "cluster_size"),
            ColumnSpec::own("total_frequency", Integer, "total_frequency"),
            ColumnSpec::own("root", Text, "root"),
            ColumnSpec::own("cluster_id", Text, "cluster_id"),
        ],
    );
    let derivatives = TableSpec::new(
        format!("{prefix}_derivatives"),
        vec![
            ColumnSpec::inherited("cluster_id", Integer, "cluster_id"),
            ColumnSpec::own("total_phrase_frequency", Integer, "total_phrase_frequency"),
            ColumnSpec::own("num_urls", Integer, "num_urls"),
            ColumnSpec::own("phrase", Text, "phrase"),
            ColumnSpec::own("phrase_id", Integer, "phrase_id"),
        ],
    );
    let phrase_info = TableSpec::new(
        format!("{prefix}_phrase_info"),
        vec![
            ColumnSpec::inherited("cluster_id", Integer, "cluster_id"),
            ColumnSpec::inherited("phrase_id", Integer, "phrase_id"),
            ColumnSpec::own("frequency_in_url", Integer, "frequency_in_url"),
            ColumnSpec::own("timestamp", Timestamp, "timestamp"),
            ColumnSpec::own("url_type", Text, "url_type"),
            ColumnSpec::own("url", Text, "url"),
        ],
    );

    Schema {
        tables: vec![roots, derivatives, phrase_info],
        plan: RowPlan::new(0).nest("phrases", RowPlan::new(1).nest("urls", RowPlan::new(2))),
    }
}

pub fn format(prefix: &str, header_lines: usize) -> Format {
    Format {
        name: "clusters",
        grammar: grammar(header_lines),
        schema: schema(prefix),
        timestamp_field: None,
    }
}
