//! Relational Mapper
//!
//! Flattens one [`Block`] into the rows it contributes, following the
//! schema's [`RowPlan`]:
//!
//! 1. The record at the current level emits one row into its plan's table.
//! 2. Each nested group is then walked in plan order; every child emits its
//!    own row and, before the next sibling, all rows of its descendants.
//!
//! So emission is depth-first pre-order, and a parent row is always emitted
//! before any row that references it. Parent keys reach descendant rows
//! through [`ColumnSource::Ancestor`] columns, resolved against the chain of
//! enclosing records, nearest first.
//!
//! Mapping is pure. All conversion to column types happens here, before any
//! row is handed to the sink, so a block that fails conversion contributes
//! no rows at all.

use crate::corpus::block::{Block, Record, Scalar};
use crate::corpus::schema::{ColumnSource, ColumnSpec, ColumnType, Row, RowPlan, Schema, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MappingError {
    #[error("block {ordinal}: cannot convert {value:?} to {expected} for column {table}.{column}")]
    FieldConversion {
        ordinal: usize,
        table: String,
        column: String,
        value: String,
        expected: ColumnType,
    },
    #[error("block {ordinal}: no field '{field}' for column {table}.{column}")]
    MissingField {
        ordinal: usize,
        table: String,
        column: String,
        field: String,
    },
}

impl MappingError {
    pub fn ordinal(&self) -> usize {
        match self {
            MappingError::FieldConversion { ordinal, .. }
            | MappingError::MissingField { ordinal, .. } => *ordinal,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            MappingError::FieldConversion { table, .. } | MappingError::MissingField { table, .. } => {
                table
            }
        }
    }
}

/// Rows contributed by `block`, in insertion order.
pub fn map_block(block: &Block, schema: &Schema) -> Result<Vec<Row>, MappingError> {
    let mut rows = Vec::new();
    let mut ancestors = Vec::new();
    emit(&block.root, &schema.plan, schema, block.ordinal, &mut ancestors, &mut rows)?;
    Ok(rows)
}

fn emit<'b>(
    record: &'b Record,
    plan: &RowPlan,
    schema: &Schema,
    ordinal: usize,
    ancestors: &mut Vec<&'b Record>,
    rows: &mut Vec<Row>,
) -> Result<(), MappingError> {
    let table = schema.table(plan.table);
    let mut values = Vec::with_capacity(table.columns.len());
    for column in &table.columns {
        let scalar = resolve(record, ancestors, &column.source).ok_or_else(|| {
            MappingError::MissingField {
                ordinal,
                table: table.name.clone(),
                column: column.name.clone(),
                field: source_field(&column.source).to_string(),
            }
        })?;
        let value = convert(scalar, column).ok_or_else(|| MappingError::FieldConversion {
            ordinal,
            table: table.name.clone(),
            column: column.name.clone(),
            value: scalar.to_string(),
            expected: column.ty,
        })?;
        values.push(value);
    }
    rows.push(Row {
        table: plan.table,
        values,
    });

    ancestors.push(record);
    for (group, nested) in &plan.nested {
        for child in record.children(group) {
            emit(child, nested, schema, ordinal, ancestors, rows)?;
        }
    }
    ancestors.pop();
    Ok(())
}

fn resolve<'b>(
    record: &'b Record,
    ancestors: &[&'b Record],
    source: &ColumnSource,
) -> Option<&'b Scalar> {
    match source {
        ColumnSource::Own(field) => record.field(field),
        ColumnSource::Ancestor(field) => ancestors.iter().rev().find_map(|a| a.field(field)),
    }
}

fn source_field(source: &ColumnSource) -> &str {
    match source {
        ColumnSource::Own(field) | ColumnSource::Ancestor(field) => field,
    }
}

/// Convert one scalar to its column type; `None` when it does not fit.
/// Never coerces lossily.
pub fn convert(scalar: &Scalar, column: &ColumnSpec) -> Option<Value> {
    let text = match scalar {
        Scalar::Null => return Some(Value::Null),
        Scalar::Integer(n) => {
            return Some(match column.ty {
                ColumnType::Integer => Value::Integer(*n),
                ColumnType::Real => Value::Real(*n as f64),
                ColumnType::Text | ColumnType::Timestamp => Value::Text(n.to_string()),
            })
        }
        Scalar::Real(r) => {
            return match column.ty {
                ColumnType::Real => Some(Value::Real(*r)),
                ColumnType::Integer => None,
                ColumnType::Text | ColumnType::Timestamp => Some(Value::Text(format!("{r:?}"))),
            }
        }
        Scalar::Text(text) => text,
    };

    if column.loose && text.trim().is_empty() {
        return Some(Value::Null);
    }
    match column.ty {
        ColumnType::Text | ColumnType::Timestamp => Some(Value::Text(text.clone())),
        ColumnType::Integer => text.trim().parse().ok().map(Value::Integer),
        ColumnType::Real if column.loose => text.trim().replace(',', "").parse().ok().map(Value::Real),
        ColumnType::Real => text.trim().parse().ok().map(Value::Real),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::schema::TableSpec;
    use rstest::rstest;

    fn schema() -> Schema {
        Schema {
            tables: vec![
                TableSpec::new(
                    "roots",
                    vec![
                        ColumnSpec::own("id", ColumnType::Integer, "id"),
                        ColumnSpec::own("name", ColumnType::Text, "name"),
                    ],
                ),
                TableSpec::new(
                    "kids",
                    vec![
                        ColumnSpec::inherited("root_id", ColumnType::Integer, "id"),
                        ColumnSpec::own("kid_id", ColumnType::Integer, "kid"),
                    ],
                ),
                TableSpec::new(
                    "grandkids",
                    vec![
                        ColumnSpec::inherited("root_id", ColumnType::Integer, "id"),
                        ColumnSpec::inherited("kid_id", ColumnType::Integer, "kid"),
                        ColumnSpec::own("weight", ColumnType::Real, "weight"),
                    ],
                ),
            ],
            plan: RowPlan::new(0).nest("kids", RowPlan::new(1).nest("grandkids", RowPlan::new(2))),
        }
    }

    fn kid(id: &str, weights: &[&str]) -> Record {
        let mut record = Record::new().with("kid", Scalar::text(id));
        record.group_mut("grandkids");
        for weight in weights {
            record.push_child("grandkids", Record::new().with("weight", Scalar::text(*weight)));
        }
        record
    }

    fn block(kids: Vec<Record>) -> Block {
        let mut root = Record::new()
            .with("id", Scalar::text("7"))
            .with("name", Scalar::text("seven"));
        for child in kids {
            root.push_child("kids", child);
        }
        Block::new(3, root)
    }

    #[test]
    fn test_pre_order_emission_with_parent_keys() {
        let rows = map_block(&block(vec![kid("1", &["0.5", "1.5"]), kid("2", &["2"])]), &schema())
            .unwrap();
        let tables: Vec<usize> = rows.iter().map(|r| r.table).collect();
        assert_eq!(tables, vec![0, 1, 2, 2, 1, 2]);
        assert_eq!(rows[2].values, vec![Value::Integer(7), Value::Integer(1), Value::Real(0.5)]);
        assert_eq!(rows[5].values, vec![Value::Integer(7), Value::Integer(2), Value::Real(2.0)]);
    }

    #[test]
    fn test_conversion_failure_names_column_and_block() {
        let error = map_block(&block(vec![kid("1", &["heavy"])]), &schema()).unwrap_err();
        assert_eq!(
            error,
            MappingError::FieldConversion {
                ordinal: 3,
                table: "grandkids".into(),
                column: "weight".into(),
                value: "heavy".into(),
                expected: ColumnType::Real,
            }
        );
        assert_eq!(
            error.to_string(),
            "block 3: cannot convert \"heavy\" to real for column grandkids.weight"
        );
    }

    #[test]
    fn test_missing_field() {
        let mut root = Record::new().with("id", Scalar::text("7"));
        root.group_mut("kids");
        let error = map_block(&Block::new(1, root), &schema()).unwrap_err();
        assert!(matches!(error, MappingError::MissingField { ref field, .. } if field == "name"));
    }

    #[test]
    fn test_mapping_is_repeatable() {
        let block = block(vec![kid("1", &["3"])]);
        assert_eq!(map_block(&block, &schema()), map_block(&block, &schema()));
    }

    #[rstest]
    #[case(Scalar::text("12"), ColumnType::Integer, false, Some(Value::Integer(12)))]
    #[case(Scalar::text(" 12 "), ColumnType::Integer, false, Some(Value::Integer(12)))]
    #[case(Scalar::text("1.5"), ColumnType::Integer, false, None)]
    #[case(Scalar::Real(1.0), ColumnType::Integer, false, None)]
    #[case(Scalar::Integer(2), ColumnType::Real, false, Some(Value::Real(2.0)))]
    #[case(Scalar::text("1,250.5"), ColumnType::Real, false, None)]
    #[case(Scalar::text("1,250.5"), ColumnType::Real, true, Some(Value::Real(1250.5)))]
    #[case(Scalar::text(""), ColumnType::Integer, true, Some(Value::Null))]
    #[case(Scalar::text(""), ColumnType::Text, false, Some(Value::Text(String::new())))]
    #[case(Scalar::text(""), ColumnType::Integer, false, None)]
    #[case(Scalar::Null, ColumnType::Integer, false, Some(Value::Null))]
    #[case(Scalar::Integer(5), ColumnType::Text, false, Some(Value::Text("5".into())))]
    fn test_convert(
        #[case] scalar: Scalar,
        #[case] ty: ColumnType,
        #[case] loose: bool,
        #[case] expected: Option<Value>,
    ) {
        let mut column = ColumnSpec::own("c", ty, "c");
        column.loose = loose;
        assert_eq!(convert(&scalar, &column), expected);
    }
}
