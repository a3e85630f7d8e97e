use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single value of an identity attribute.
///
/// Values compare by content. In request files a plain string is a
/// [`AttributeValue::String`], `{"value": .., "scope": ..}` is a scoped value,
/// an array of octets is a byte value and `null` is the empty value.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Scoped { value: String, scope: String },
    Bytes(Vec<u8>),
    Empty,
}

/// Deterministically ordered set of values, as recorded in permit/deny sets.
pub type ValueSet = BTreeSet<AttributeValue>;

impl AttributeValue {
    pub fn string(value: impl Into<String>) -> Self {
        AttributeValue::String(value.into())
    }

    pub fn scoped(value: impl Into<String>, scope: impl Into<String>) -> Self {
        AttributeValue::Scoped {
            value: value.into(),
            scope: scope.into(),
        }
    }

    /// The textual part of string and scoped values.
    pub fn text(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            AttributeValue::Scoped { value, .. } => Some(value),
            _ => None,
        }
    }

    /// The scope of a scoped value.
    pub fn scope(&self) -> Option<&str> {
        match self {
            AttributeValue::Scoped { scope, .. } => Some(scope),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::String(s) => write!(f, "{}", s),
            AttributeValue::Scoped { value, scope } => write!(f, "{}@{}", value, scope),
            AttributeValue::Bytes(bytes) => {
                for b in bytes {
                    write!(f, "{:02x}", b)?;
                }
                Ok(())
            }
            AttributeValue::Empty => write!(f, "<empty>"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

/// A named, multi-valued identity attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    id: String,
    values: Vec<AttributeValue>,
}

impl Attribute {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            values: Vec::new(),
        }
    }

    pub fn with_values<I, V>(id: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<AttributeValue>,
    {
        Self {
            id: id.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    /// Replaces the whole value sequence.
    pub fn set_values(&mut self, values: Vec<AttributeValue>) {
        self.values = values;
    }

    pub fn contains(&self, value: &AttributeValue) -> bool {
        self.values.contains(value)
    }

    /// All values as a set.
    pub fn value_set(&self) -> ValueSet {
        self.values.iter().cloned().collect()
    }
}
