//! Record - Desired-state records and their observed remote state

use std::collections::HashMap;

/// Unique identifier for a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordId {
    /// Record kind (e.g., "vpc", "dynamodb_table")
    pub kind: String,
    /// Record name (the logical name in the topology)
    pub name: String,
}

impl RecordId {
    pub fn new(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

/// Attribute value of a record
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    /// Reference to another record's attribute (binding, attribute).
    /// Resolved only after the target record is materialized.
    Ref(String, String),
}

impl Value {
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(s.into())
    }

    /// Reference edge to another record's generated attribute
    pub fn reference(binding: impl Into<String>, attribute: impl Into<String>) -> Self {
        Value::Ref(binding.into(), attribute.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

/// A desired-state record in the topology.
///
/// Immutable once declared; the provider materializes it and reports back a
/// `RemoteState` carrying the generated identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    /// Binding name other records use in `Value::Ref` edges
    pub binding: String,
    pub attributes: HashMap<String, Value>,
    /// True for data sources: looked up, never created or mutated
    pub read_only: bool,
}

impl Record {
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        binding: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordId::new(kind, name),
            binding: binding.into(),
            attributes: HashMap::new(),
            read_only: false,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Returns true if this record is a data source (read-only)
    pub fn is_data_source(&self) -> bool {
        self.read_only
    }
}

/// Observed state of a record in the target environment
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteState {
    pub id: RecordId,
    /// Provider-assigned identifier (e.g., vpc-xxx, subnet-xxx)
    pub identifier: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Whether the record exists in the target environment
    pub exists: bool,
}

impl RemoteState {
    pub fn not_found(id: RecordId) -> Self {
        Self {
            id,
            identifier: None,
            attributes: HashMap::new(),
            exists: false,
        }
    }

    pub fn existing(id: RecordId, attributes: HashMap<String, Value>) -> Self {
        Self {
            id,
            identifier: None,
            attributes,
            exists: true,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }
}
