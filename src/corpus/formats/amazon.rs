//! Product metadata
//!
//! One product per line, written as a Python literal rather than JSON
//! (single quotes, `True`/`None`). Lines are decoded with the strict literal
//! decoder; nothing is evaluated. All tables are keyed by `asin`.

use super::Format;
use crate::corpus::grammar::{
    FieldSelection, Grammar, GroupShape, RecordGrammar, RecordGroup, Syntax,
};
use crate::corpus::schema::{ColumnSpec, ColumnType, RowPlan, Schema, TableSpec};

const METADATA: [(&str, ColumnType); 6] = [
    ("asin", ColumnType::Text),
    ("imUrl", ColumnType::Text),
    ("title", ColumnType::Text),
    ("description", ColumnType::Text),
    ("price", ColumnType::Real),
    ("brand", ColumnType::Text),
];

/// `(key under "related", column)`; the key also names the group and table.
const RELATED: [(&str, &str); 4] = [
    ("also_bought", "also_bought"),
    ("also_viewed", "also_viewed"),
    ("bought_together", "bought_together"),
    ("buy_after_viewing", "amz_buy_after_viewing"),
];

pub fn grammar() -> Grammar {
    let mut groups = Vec::new();
    for (key, column) in RELATED {
        groups.push(RecordGroup::new(
            key,
            &["related", key],
            GroupShape::Items {
                field: column.to_string(),
            },
        ));
    }
    groups.push(RecordGroup::new(
        "sales_rank",
        &["salesRank"],
        GroupShape::Entries {
            key: "area".into(),
            value: "rank".into(),
        },
    ));
    groups.push(RecordGroup::new(
        "categories",
        &["categories"],
        GroupShape::FirstItems {
            field: "category".into(),
        },
    ));

    Grammar::Records(RecordGrammar {
        syntax: Syntax::Literal,
        fields: FieldSelection::Named(METADATA.iter().map(|(name, _)| name.to_string()).collect()),
        required: vec!["asin".into()],
        groups,
    })
}

pub fn schema() -> Schema {
    let asin = || ColumnSpec::inherited("asin", ColumnType::Text, "asin");

    let mut tables = vec![TableSpec::new(
        "amz_metadata",
        METADATA
            .iter()
            .map(|(name, ty)| ColumnSpec::own(name, *ty, name))
            .collect(),
    )];
    for (key, column) in RELATED {
        tables.push(TableSpec::new(
            format!("amz_{key}"),
            vec![asin(), ColumnSpec::own(column, ColumnType::Text, column)],
        ));
    }
    tables.push(TableSpec::new(
        "amz_categories",
        vec![asin(), ColumnSpec::own("category", ColumnType::Text, "category")],
    ));
    tables.push(TableSpec::new(
        "amz_sales_rank",
        vec![
            asin(),
            ColumnSpec::own("area", ColumnType::Text, "area"),
            ColumnSpec::own("rank", ColumnType::Integer, "rank"),
        ],
    ));

    let mut plan = RowPlan::new(0);
    for (index, (key, _)) in RELATED.iter().enumerate() {
        plan = plan.nest(key, RowPlan::new(index + 1));
    }
    plan = plan
        .nest("sales_rank", RowPlan::new(6))
        .nest("categories", RowPlan::new(5));

    Schema { tables, plan }
}

pub fn format() -> Format {
    Format {
        name: "amazon",
        grammar: grammar(),
        schema: schema(),
        timestamp_field: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::mapping::map_block;
    use crate::corpus::schema::Value;

    fn table_names(format: &Format, rows: &[crate::corpus::schema::Row]) -> Vec<String> {
        rows.iter()
            .map(|row| format.schema.table(row.table).name.clone())
            .collect()
    }

    #[test]
    fn test_creation_order() {
        let names: Vec<String> = schema().tables.into_iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            vec![
                "amz_metadata",
                "amz_also_bought",
                "amz_also_viewed",
                "amz_bought_together",
                "amz_buy_after_viewing",
                "amz_categories",
                "amz_sales_rank",
            ]
        );
        assert_eq!(schema().tables[4].columns[1].name, "amz_buy_after_viewing");
    }

    #[test]
    fn test_emission_order() {
        let line = "{'asin': 'A1', 'price': 2, 'related': {'buy_after_viewing': ['B9'], 'also_bought': ['B1']}, \
                    'categories': [['Toys']], 'salesRank': {'Toys & Games': 5}}\n";
        let format = format();
        let block = format.reader(line.as_bytes()).next().unwrap().unwrap();
        let rows = map_block(&block, &format.schema).unwrap();
        assert_eq!(
            table_names(&format, &rows),
            vec![
                "amz_metadata",
                "amz_also_bought",
                "amz_buy_after_viewing",
                "amz_sales_rank",
                "amz_categories",
            ]
        );
        assert_eq!(rows[0].values[4], Value::Real(2.0));
        assert_eq!(
            rows[3].values,
            vec![
                Value::Text("A1".into()),
                Value::Text("Toys & Games".into()),
                Value::Integer(5),
            ]
        );
    }

    #[test]
    fn test_bad_price_fails_the_block_only() {
        let format = format();
        let text = "{'asin': 'A1', 'price': 'cheap'}\n{'asin': 'A2', 'price': 1.5}\n";
        let blocks: Vec<_> = format.reader(text.as_bytes()).map(Result::unwrap).collect();
        assert!(map_block(&blocks[0], &format.schema).is_err());
        assert_eq!(map_block(&blocks[1], &format.schema).unwrap().len(), 1);
    }
}
