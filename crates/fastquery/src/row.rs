//! Storage-agnostic result rows
//!
//! A `ResultRow` is what every backend hands back and what the stitcher
//! annotates. It never refers to a backend's native record type.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};

/// Value held in a relation slot of a `ResultRow`
#[derive(Debug, Clone, PartialEq)]
pub enum RelationValue {
    /// Single related row, or `None` when nothing matched
    One(Option<Box<ResultRow>>),
    /// Ordered related rows, possibly empty
    Many(Vec<ResultRow>),
}

impl RelationValue {
    pub fn as_one(&self) -> Option<&ResultRow> {
        match self {
            RelationValue::One(row) => row.as_deref(),
            RelationValue::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&[ResultRow]> {
        match self {
            RelationValue::Many(rows) => Some(rows),
            RelationValue::One(_) => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RelationValue::One(None))
    }

    /// Number of rows held by this slot
    pub fn len(&self) -> usize {
        match self {
            RelationValue::One(row) => usize::from(row.is_some()),
            RelationValue::Many(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Convert to JSON value
    pub fn to_json(&self) -> JsonValue {
        match self {
            RelationValue::One(Some(row)) => row.to_json(),
            RelationValue::One(None) => JsonValue::Null,
            RelationValue::Many(rows) => {
                JsonValue::Array(rows.iter().map(ResultRow::to_json).collect())
            }
        }
    }
}

impl Serialize for RelationValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RelationValue::One(row) => row.serialize(serializer),
            RelationValue::Many(rows) => rows.serialize(serializer),
        }
    }
}

/// One fetched record plus the relations attached to it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResultRow {
    #[serde(flatten)]
    fields: Map<String, JsonValue>,
    #[serde(flatten)]
    relations: BTreeMap<String, RelationValue>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from a JSON object; any other JSON value yields `None`
    pub fn from_json(value: JsonValue) -> Option<Self> {
        match value {
            JsonValue::Object(fields) => Some(Self {
                fields,
                relations: BTreeMap::new(),
            }),
            _ => None,
        }
    }

    /// Add a field (builder style)
    pub fn with(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<JsonValue>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Get a field value
    pub fn get(&self, field: &str) -> Option<&JsonValue> {
        self.fields.get(field)
    }

    /// Field names in insertion order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn fields(&self) -> &Map<String, JsonValue> {
        &self.fields
    }

    /// Linking key stored in `field`, or `None` when absent or null
    pub fn key(&self, field: &str) -> Option<RowKey> {
        self.get(field).and_then(RowKey::from_json)
    }

    /// Attach a relation value, replacing any previous value for that name
    pub fn set_relation(&mut self, name: impl Into<String>, value: RelationValue) {
        self.relations.insert(name.into(), value);
    }

    /// Get an attached relation
    pub fn relation(&self, name: &str) -> Option<&RelationValue> {
        self.relations.get(name)
    }

    /// Whether the relation slot exists, even if it holds null
    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub fn relation_names(&self) -> impl Iterator<Item = &str> {
        self.relations.keys().map(String::as_str)
    }

    /// Whether `name` is either a field or a relation slot
    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name) || self.relations.contains_key(name)
    }

    /// Flatten fields and relations into one JSON object
    pub fn to_json(&self) -> JsonValue {
        let mut map = self.fields.clone();
        for (name, value) in &self.relations {
            map.insert(name.clone(), value.to_json());
        }
        JsonValue::Object(map)
    }
}

impl From<Map<String, JsonValue>> for ResultRow {
    fn from(fields: Map<String, JsonValue>) -> Self {
        Self {
            fields,
            relations: BTreeMap::new(),
        }
    }
}

/// Hashable form of a scalar linking value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RowKey {
    Bool(bool),
    Int(i64),
    Str(String),
    /// Any other scalar, keyed by its canonical JSON text
    Other(String),
}

impl RowKey {
    /// Build a key from a JSON value; null yields `None`
    pub fn from_json(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Null => None,
            JsonValue::Bool(b) => Some(RowKey::Bool(*b)),
            JsonValue::Number(n) => Some(match n.as_i64() {
                Some(i) => RowKey::Int(i),
                None => RowKey::Other(n.to_string()),
            }),
            JsonValue::String(s) => Some(RowKey::Str(s.clone())),
            other => Some(RowKey::Other(other.to_string())),
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowKey::Bool(b) => write!(f, "{}", b),
            RowKey::Int(i) => write!(f, "{}", i),
            RowKey::Str(s) => write!(f, "{}", s),
            RowKey::Other(s) => write!(f, "{}", s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_fields_keep_insertion_order() {
        let row = ResultRow::new().with("name", "Ann").with("id", 1).with("age", 30);
        let names: Vec<&str> = row.field_names().collect();
        assert_eq!(names, vec!["name", "id", "age"]);
    }

    #[test]
    fn test_row_key_extraction() {
        let row = ResultRow::from_json(json!({"id": 7, "location_id": null, "code": "x"})).unwrap();
        assert_eq!(row.key("id"), Some(RowKey::Int(7)));
        assert_eq!(row.key("location_id"), None);
        assert_eq!(row.key("missing"), None);
        assert_eq!(row.key("code"), Some(RowKey::Str("x".to_string())));
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(ResultRow::from_json(json!([1, 2])).is_none());
        assert!(ResultRow::from_json(json!(null)).is_none());
    }

    #[test]
    fn test_relation_slots_serialize_flat() {
        let location = ResultRow::new().with("id", 3).with("name", "Paris");
        let mut user = ResultRow::new().with("id", 1).with("location_id", 3);
        user.set_relation("location", RelationValue::One(Some(Box::new(location))));
        user.set_relation("profile", RelationValue::One(None));
        user.set_relation("groups", RelationValue::Many(Vec::new()));

        let expected = json!({
            "id": 1,
            "location_id": 3,
            "groups": [],
            "location": {"id": 3, "name": "Paris"},
            "profile": null,
        });
        assert_eq!(user.to_json(), expected);
        assert_eq!(serde_json::to_value(&user).unwrap(), expected);
    }

    #[test]
    fn test_relation_value_helpers() {
        let null = RelationValue::One(None);
        assert!(null.is_null());
        assert_eq!(null.len(), 0);

        let many = RelationValue::Many(vec![ResultRow::new(), ResultRow::new()]);
        assert_eq!(many.as_many().map(|rows| rows.len()), Some(2));
        assert!(many.as_one().is_none());
        assert!(!many.is_null());
    }
}
