//! Encyclopedia revision metadata
//!
//! One block per revision:
//!
//!     REVISION <article_id> <rev_id> <article_title> <timestamp> <username> <user_id>
//!     CATEGORY <word>*        \
//!     IMAGE <word>*            |
//!     ...                      | optional, in this order
//!     TEMPLATE <word>*         |
//!     COMMENT <text>           |
//!     MINOR <0|1>              |
//!     TEXTDATA <n>            /
//!     <blank>
//!
//! Every child row is keyed by the revision's `rev_id`.

use super::Format;
use crate::corpus::grammar::{Grammar, Payload, TagRule, TaggedGrammar, Terminator};
use crate::corpus::schema::{ColumnSpec, ColumnType, RowPlan, Schema, TableSpec};

const REVISION_FIELDS: [(&str, ColumnType); 6] = [
    ("article_id", ColumnType::Integer),
    ("rev_id", ColumnType::Integer),
    ("article_title", ColumnType::Text),
    ("timestamp", ColumnType::Timestamp),
    ("username", ColumnType::Text),
    ("user_id", ColumnType::Text),
];

/// Tags whose payload is a word list.
const LINK_TAGS: [&str; 9] = [
    "CATEGORY",
    "IMAGE",
    "MAIN",
    "TALK",
    "USER",
    "USER_TALK",
    "OTHER",
    "EXTERNAL",
    "TEMPLATE",
];

/// Tags whose payload is one value, with the column type it loads as.
const SINGLE_TAGS: [(&str, ColumnType); 3] = [
    ("COMMENT", ColumnType::Text),
    ("MINOR", ColumnType::Integer),
    ("TEXTDATA", ColumnType::Integer),
];

fn group_name(tag: &str) -> String {
    tag.to_lowercase()
}

pub fn grammar() -> Grammar {
    let mut rules = vec![TagRule::root(
        "REVISION",
        Payload::Fields(REVISION_FIELDS.iter().map(|(name, _)| name.to_string()).collect()),
    )];
    for tag in LINK_TAGS {
        let group = group_name(tag);
        rules.push(TagRule::optional(tag, &group, Payload::Words(group.clone())));
    }
    for (tag, _) in SINGLE_TAGS {
        let group = group_name(tag);
        rules.push(TagRule::optional(tag, &group, Payload::Text(group.clone())));
    }
    Grammar::Tagged(TaggedGrammar {
        rules,
        terminator: Terminator::Blank,
    })
}

pub fn schema(prefix: &str) -> Schema {
    let mut tables = vec![TableSpec::new(
        format!("{prefix}_revision"),
        REVISION_FIELDS
            .iter()
            .map(|(name, ty)| ColumnSpec::own(name, *ty, name))
            .collect(),
    )];
    let mut plan = RowPlan::new(0);

    let children = LINK_TAGS
        .iter()
        .map(|tag| (*tag, ColumnType::Text))
        .chain(SINGLE_TAGS);
    for (tag, ty) in children {
        let group = group_name(tag);
        tables.push(TableSpec::new(
            format!("{prefix}_{group}"),
            vec![
                ColumnSpec::inherited("rev_id", ColumnType::Integer, "rev_id"),
                ColumnSpec::own(tag, ty, &group),
            ],
        ));
        plan = plan.nest(&group, RowPlan::new(tables.len() - 1));
    }
    Schema { tables, plan }
}

pub fn format(prefix: &str) -> Format {
    Format {
        name: "wiki",
        grammar: grammar(),
        schema: schema(prefix),
        timestamp_field: Some("timestamp".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::mapping::map_block;
    use crate::corpus::schema::Value;

    #[test]
    fn test_table_names() {
        let names: Vec<String> = schema("enwiki").tables.into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "enwiki_revision",
                "enwiki_category",
                "enwiki_image",
                "enwiki_main",
                "enwiki_talk",
                "enwiki_user",
                "enwiki_user_talk",
                "enwiki_other",
                "enwiki_external",
                "enwiki_template",
                "enwiki_comment",
                "enwiki_minor",
                "enwiki_textdata",
            ]
        );
    }

    #[test]
    fn test_child_columns() {
        let schema = schema("p");
        let minor = schema.table_named("p_minor").unwrap();
        assert_eq!(
            minor.create_sql(),
            r#"CREATE TABLE "p_minor" ("rev_id" INTEGER, "MINOR" INTEGER)"#
        );
        let category = schema.table_named("p_category").unwrap();
        assert_eq!(
            category.create_sql(),
            r#"CREATE TABLE "p_category" ("rev_id" INTEGER, "CATEGORY" TEXT)"#
        );
    }

    #[test]
    fn test_full_revision_block() {
        let text = "REVISION 12 345 Some_Page 2008-01-01T00:00:00Z bob 77\n\
                    CATEGORY A B\n\
                    IMAGE\n\
                    MAIN m1\n\
                    TALK\n\
                    USER\n\
                    USER_TALK\n\
                    OTHER\n\
                    EXTERNAL http://x\n\
                    TEMPLATE\n\
                    COMMENT fixed a typo\n\
                    MINOR 1\n\
                    TEXTDATA 2048\n\
                    \n";
        let format = format("p");
        let block = format.reader(text.as_bytes()).next().unwrap().unwrap();
        let rows = map_block(&block, &format.schema).unwrap();
        let rendered: Vec<(String, Vec<Value>)> = rows
            .into_iter()
            .map(|row| (format.schema.table(row.table).name.clone(), row.values))
            .collect();
        assert_eq!(rendered.len(), 8);
        assert_eq!(rendered[0].0, "p_revision");
        assert_eq!(rendered[1], ("p_category".to_string(), vec![Value::Integer(345), Value::Text("A".into())]));
        assert_eq!(rendered[3].0, "p_main");
        assert_eq!(rendered[4].0, "p_external");
        assert_eq!(
            rendered[5],
            ("p_comment".to_string(), vec![Value::Integer(345), Value::Text("fixed a typo".into())])
        );
        assert_eq!(rendered[6], ("p_minor".to_string(), vec![Value::Integer(345), Value::Integer(1)]));
        assert_eq!(rendered[7], ("p_textdata".to_string(), vec![Value::Integer(345), Value::Integer(2048)]));
    }
}
