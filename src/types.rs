use chrono::{DateTime, FixedOffset, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Column name of the partition key system property
pub const PARTITION_KEY: &str = "PartitionKey";
/// Column name of the row key system property
pub const ROW_KEY: &str = "RowKey";
/// Column name of the server-assigned timestamp
pub const TIMESTAMP: &str = "Timestamp";

/// System columns, always first and in this order
pub const SYSTEM_PROPERTIES: [&str; 3] = [PARTITION_KEY, ROW_KEY, TIMESTAMP];

pub fn is_system_property(name: &str) -> bool {
    SYSTEM_PROPERTIES.contains(&name)
}

/// Native kind of a property value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeTag {
    Boolean,
    DateTime,
    Double,
    Guid,
    Int32,
    Int64,
    Binary,
    String,
}

impl TypeTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeTag::Boolean => "Boolean",
            TypeTag::DateTime => "DateTime",
            TypeTag::Double => "Double",
            TypeTag::Guid => "Guid",
            TypeTag::Int32 => "Int32",
            TypeTag::Int64 => "Int64",
            TypeTag::Binary => "Binary",
            TypeTag::String => "String",
        }
    }

    /// Parse a tag as written in a `@type` column.
    ///
    /// Anything after an `@` is a qualifier and ignored. `int` and `long` are
    /// accepted as aliases for the 32/64-bit integer tags.
    pub fn parse(tag: &str) -> Option<Self> {
        let base = tag.split('@').next().unwrap_or_default();
        match base {
            "Boolean" => Some(TypeTag::Boolean),
            "DateTime" => Some(TypeTag::DateTime),
            "Double" => Some(TypeTag::Double),
            "Guid" => Some(TypeTag::Guid),
            "Int32" | "int" => Some(TypeTag::Int32),
            "Int64" | "long" => Some(TypeTag::Int64),
            "Binary" => Some(TypeTag::Binary),
            "String" => Some(TypeTag::String),
            _ => None,
        }
    }
}

impl std::fmt::Display for TypeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dynamically-typed property value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
    Binary(Vec<u8>),
    Guid(Uuid),
    DateTime(DateTime<Utc>),
}

impl PropertyValue {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            PropertyValue::Boolean(_) => TypeTag::Boolean,
            PropertyValue::Int32(_) => TypeTag::Int32,
            PropertyValue::Int64(_) => TypeTag::Int64,
            PropertyValue::Double(_) => TypeTag::Double,
            PropertyValue::String(_) => TypeTag::String,
            PropertyValue::Binary(_) => TypeTag::Binary,
            PropertyValue::Guid(_) => TypeTag::Guid,
            PropertyValue::DateTime(_) => TypeTag::DateTime,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int32(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int64(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<Vec<u8>> for PropertyValue {
    fn from(value: Vec<u8>) -> Self {
        PropertyValue::Binary(value)
    }
}

impl From<Uuid> for PropertyValue {
    fn from(value: Uuid) -> Self {
        PropertyValue::Guid(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropertyValue::DateTime(value)
    }
}

impl From<DateTime<FixedOffset>> for PropertyValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        PropertyValue::DateTime(value.with_timezone(&Utc))
    }
}

/// A table entity: the compound key, the server timestamp and an open
/// property bag kept in insertion order.
///
/// An empty key means "unset"; the store rejects such entities on submission.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub partition_key: String,
    pub row_key: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub etag: Option<String>,
    properties: IndexMap<String, PropertyValue>,
}

impl Entity {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            ..Default::default()
        }
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Insert or replace a property, returning the previous value.
    /// Replacing keeps the property's original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Option<PropertyValue> {
        self.properties.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<PropertyValue> {
        self.properties.shift_remove(name)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&String, &PropertyValue)> {
        self.properties.iter()
    }

    pub fn property_count(&self) -> usize {
        self.properties.len()
    }

    /// Value of a column as text for filtering, including the system columns
    pub fn column_text(&self, column: &str) -> Option<String> {
        match column {
            PARTITION_KEY => Some(self.partition_key.clone()),
            ROW_KEY => Some(self.row_key.clone()),
            TIMESTAMP => self.timestamp.map(|t| t.to_rfc3339()),
            _ => self.properties.get(column).and_then(|v| v.as_str()).map(str::to_string),
        }
    }

    /// Copy holding only the keys, as returned by a key-only projection
    pub fn key_only(&self) -> Self {
        Self {
            partition_key: self.partition_key.clone(),
            row_key: self.row_key.clone(),
            timestamp: self.timestamp,
            etag: self.etag.clone(),
            properties: IndexMap::new(),
        }
    }

    /// Compare keys and properties, ignoring the server-assigned timestamp and etag
    pub fn same_content(&self, other: &Entity) -> bool {
        self.partition_key == other.partition_key
            && self.row_key == other.row_key
            && self.properties == other.properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_tag_parse() {
        assert_eq!(TypeTag::parse("Boolean"), Some(TypeTag::Boolean));
        assert_eq!(TypeTag::parse("int"), Some(TypeTag::Int32));
        assert_eq!(TypeTag::parse("long"), Some(TypeTag::Int64));
        assert_eq!(TypeTag::parse("Int64@odata"), Some(TypeTag::Int64));
        assert_eq!(TypeTag::parse("Decimal"), None);
        assert_eq!(TypeTag::parse(""), None);
    }

    #[test]
    fn test_type_tag_from_value() {
        assert_eq!(PropertyValue::from(true).type_tag().as_str(), "Boolean");
        assert_eq!(PropertyValue::from(1i32).type_tag().as_str(), "Int32");
        assert_eq!(PropertyValue::from(1i64).type_tag().as_str(), "Int64");
        assert_eq!(PropertyValue::from(vec![1u8]).type_tag().as_str(), "Binary");
        assert_eq!(PropertyValue::from("x").type_tag().as_str(), "String");
    }

    #[test]
    fn test_entity_keeps_insertion_order() {
        let mut entity = Entity::new("p", "r")
            .with("zeta", 1i32)
            .with("alpha", 2i32);
        entity.insert("zeta", 3i32);

        let names: Vec<&str> = entity.properties().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha"]);
        assert_eq!(entity.get("zeta"), Some(&PropertyValue::Int32(3)));
    }

    #[test]
    fn test_fixed_offset_normalized_to_utc() {
        let dt = DateTime::parse_from_rfc3339("2020-01-01T03:01:01+02:00").unwrap();
        let value = PropertyValue::from(dt);
        assert_eq!(
            value,
            PropertyValue::DateTime(DateTime::parse_from_rfc3339("2020-01-01T01:01:01Z").unwrap().with_timezone(&Utc))
        );
    }
}
