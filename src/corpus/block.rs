//! Block data model
//!
//! A [`Block`] is one complete record tree read from the source: a root
//! [`Record`] of scalar fields plus named child collections, each holding
//! records that may nest further. Field values stay as read ([`Scalar`]);
//! conversion to column types happens in the mapper.

use serde_json::Value as JsonValue;
use std::fmt;

/// A field value as it appeared in the input.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
}

impl Scalar {
    pub fn text(value: impl Into<String>) -> Self {
        Scalar::Text(value.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// Textual form of the value; `None` for null.
    pub fn render(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Text(text) => Some(text.clone()),
            Scalar::Integer(n) => Some(n.to_string()),
            Scalar::Real(r) => Some(format!("{r:?}")),
        }
    }

    /// Map a decoded literal onto a scalar. Nested lists and maps keep their
    /// JSON text.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => Scalar::Null,
            JsonValue::String(text) => Scalar::Text(text.clone()),
            JsonValue::Bool(flag) => Scalar::Text(flag.to_string()),
            JsonValue::Number(number) => match number.as_i64() {
                Some(n) => Scalar::Integer(n),
                None => number.as_f64().map(Scalar::Real).unwrap_or(Scalar::Null),
            },
            nested => Scalar::Text(nested.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.render() {
            Some(text) => write!(f, "{text}"),
            None => write!(f, "null"),
        }
    }
}

/// A named scalar.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: Scalar,
}

/// A named, ordered collection of child records.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Group {
    pub name: String,
    pub records: Vec<Record>,
}

/// One node of a block tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub fields: Vec<Field>,
    pub groups: Vec<Group>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field insertion.
    pub fn with(mut self, name: &str, value: Scalar) -> Self {
        self.set(name, value);
        self
    }

    /// Set a field, replacing an earlier value of the same name.
    pub fn set(&mut self, name: &str, value: Scalar) {
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => field.value = value,
            None => self.fields.push(Field {
                name: name.to_string(),
                value,
            }),
        }
    }

    pub fn field(&self, name: &str) -> Option<&Scalar> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    /// Append a child to the named collection, creating it on first use.
    pub fn push_child(&mut self, group: &str, child: Record) {
        self.group_mut(group).records.push(child);
    }

    /// Make sure the named collection exists, even if it stays empty.
    pub fn group_mut(&mut self, name: &str) -> &mut Group {
        let index = match self.groups.iter().position(|g| g.name == name) {
            Some(index) => index,
            None => {
                self.groups.push(Group {
                    name: name.to_string(),
                    records: Vec::new(),
                });
                self.groups.len() - 1
            }
        };
        &mut self.groups[index]
    }

    /// Children of the named collection; empty when the collection is absent.
    pub fn children(&self, group: &str) -> &[Record] {
        self.groups
            .iter()
            .find(|g| g.name == group)
            .map(|g| g.records.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of records in this subtree, this one included.
    pub fn size(&self) -> usize {
        1 + self
            .groups
            .iter()
            .flat_map(|g| g.records.iter())
            .map(Record::size)
            .sum::<usize>()
    }
}

/// A complete record tree and its 1-based position in the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub ordinal: usize,
    pub root: Record,
}

impl Block {
    pub fn new(ordinal: usize, root: Record) -> Self {
        Self { ordinal, root }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_children_of_absent_group_is_empty() {
        let record = Record::new().with("id", Scalar::Integer(1));
        assert!(record.children("missing").is_empty());
    }

    #[test]
    fn test_push_child_keeps_order() {
        let mut record = Record::new();
        record.push_child("items", Record::new().with("v", Scalar::text("a")));
        record.push_child("items", Record::new().with("v", Scalar::text("b")));
        let values: Vec<_> = record
            .children("items")
            .iter()
            .map(|c| c.field("v").cloned())
            .collect();
        assert_eq!(
            values,
            vec![Some(Scalar::text("a")), Some(Scalar::text("b"))]
        );
        assert_eq!(record.size(), 3);
    }

    #[test]
    fn test_set_replaces() {
        let mut record = Record::new().with("x", Scalar::Integer(1));
        record.set("x", Scalar::Integer(2));
        assert_eq!(record.fields.len(), 1);
        assert_eq!(record.field("x"), Some(&Scalar::Integer(2)));
    }

    #[test]
    fn test_from_json() {
        assert_eq!(Scalar::from_json(&json!(3)), Scalar::Integer(3));
        assert_eq!(Scalar::from_json(&json!(3.5)), Scalar::Real(3.5));
        assert_eq!(Scalar::from_json(&json!("s")), Scalar::text("s"));
        assert_eq!(Scalar::from_json(&json!(null)), Scalar::Null);
        assert_eq!(Scalar::from_json(&json!(true)), Scalar::text("true"));
        assert_eq!(Scalar::from_json(&json!([1, 2])), Scalar::text("[1,2]"));
    }

    #[test]
    fn test_render() {
        assert_eq!(Scalar::Real(3.0).render().as_deref(), Some("3.0"));
        assert_eq!(Scalar::Integer(-4).render().as_deref(), Some("-4"));
        assert_eq!(Scalar::Null.render(), None);
    }
}
