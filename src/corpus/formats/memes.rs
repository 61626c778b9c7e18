//! Quote propagation logs
//!
//! One block per crawled page; `Q` and `L` lines may repeat or be absent:
//!
//!     P <page url>
//!     T <time>
//!     Q <quote>*
//!     L <link>*
//!     <blank or end of file>

use super::Format;
use crate::corpus::grammar::{Grammar, Payload, TagRule, TaggedGrammar, Terminator};
use crate::corpus::schema::{ColumnSpec, ColumnType, RowPlan, Schema, TableSpec};

pub fn grammar() -> Grammar {
    Grammar::Tagged(TaggedGrammar {
        rules: vec![
            TagRule::root("P", Payload::Text("url".into())),
            TagRule::root("T", Payload::Text("time".into())),
            TagRule::repeated("Q", "quotes", Payload::Text("quote".into())),
            TagRule::repeated("L", "links", Payload::Text("link".into())),
        ],
        terminator: Terminator::BlankOrEnd,
    })
}

pub fn schema(prefix: &str) -> Schema {
    let keyed = |table: &str, column: &str, field: &str| {
        TableSpec::new(
            format!("{prefix}_{table}"),
            vec![
                ColumnSpec::inherited("URL", ColumnType::Text, "url"),
                ColumnSpec::own(column, ColumnType::Text, field),
            ],
        )
    };
    Schema {
        tables: vec![
            TableSpec::new(
                format!("{prefix}_times"),
                vec![
                    ColumnSpec::own("URL", ColumnType::Text, "url"),
                    ColumnSpec::own("Time", ColumnType::Text, "time"),
                ],
            ),
            keyed("quotes", "Quote", "quote"),
            keyed("links", "Link", "link"),
        ],
        plan: RowPlan::new(0)
            .nest("quotes", RowPlan::new(1))
            .nest("links", RowPlan::new(2)),
    }
}

pub fn format(prefix: &str) -> Format {
    Format {
        name: "memes",
        grammar: grammar(),
        schema: schema(prefix),
        timestamp_field: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::mapping::map_block;
    use crate::corpus::schema::Value;

    const PAGES: &str = "P\thttp://a\nT\t2008-08-01 00:00:16\nQ\tyes we can\nQ\tlipstick\nL\thttp://b\n\n\
                         P\thttp://c\nT\t2008-08-01 00:00:19\n";

    #[test]
    fn test_last_block_may_end_at_eof() {
        let format = format("m");
        let blocks: Vec<_> = format.reader(PAGES.as_bytes()).collect::<Result<_, _>>().unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[1].root.children("quotes").is_empty());
    }

    #[test]
    fn test_rows_keyed_by_page() {
        let format = format("m");
        let block = format.reader(PAGES.as_bytes()).next().unwrap().unwrap();
        let rows = map_block(&block, &format.schema).unwrap();
        let tables: Vec<usize> = rows.iter().map(|r| r.table).collect();
        assert_eq!(tables, vec![0, 1, 1, 2]);
        assert_eq!(
            rows[2].values,
            vec![Value::Text("http://a".into()), Value::Text("lipstick".into())]
        );
    }

    #[test]
    fn test_link_before_quote_is_corrupt() {
        let format = format("m");
        let text = "P\thttp://a\nT\tt\nL\thttp://b\nQ\tlate\n\n";
        assert!(format.reader(text.as_bytes()).next().unwrap().is_err());
    }
}
