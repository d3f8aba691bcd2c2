//! State file structures for persisting applied records and outputs

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// The main state file structure that persists to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Monotonically increasing number for each state modification
    pub serial: u64,
    /// Unique identifier for this state lineage (prevents accidental overwrites)
    pub lineage: String,
    /// Version of flinklab that last modified this state
    pub tool_version: String,
    /// All applied records and their identifiers
    pub records: Vec<RecordState>,
    /// Outputs exported by the last successful apply
    #[serde(default)]
    pub outputs: BTreeMap<String, String>,
}

impl StateFile {
    /// Current state file format version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a new empty state file
    pub fn new() -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage: uuid::Uuid::new_v4().to_string(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            records: Vec::new(),
            outputs: BTreeMap::new(),
        }
    }

    /// Increment serial and stamp the tool version for a new state write
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.tool_version = env!("CARGO_PKG_VERSION").to_string();
    }

    /// Find a record by kind and name
    pub fn find_record(&self, kind: &str, name: &str) -> Option<&RecordState> {
        self.records
            .iter()
            .find(|r| r.kind == kind && r.name == name)
    }

    /// Find a record mutably by kind and name
    pub fn find_record_mut(&mut self, kind: &str, name: &str) -> Option<&mut RecordState> {
        self.records
            .iter_mut()
            .find(|r| r.kind == kind && r.name == name)
    }

    /// Add or update a record in the state
    pub fn upsert_record(&mut self, record: RecordState) {
        if let Some(existing) = self.find_record_mut(&record.kind, &record.name) {
            *existing = record;
        } else {
            self.records.push(record);
        }
    }

    /// Remove a record from the state
    pub fn remove_record(&mut self, kind: &str, name: &str) -> Option<RecordState> {
        self.records
            .iter()
            .position(|r| r.kind == kind && r.name == name)
            .map(|pos| self.records.remove(pos))
    }

    /// Replace the exported outputs
    pub fn set_outputs(&mut self, outputs: BTreeMap<String, String>) {
        self.outputs = outputs;
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a single applied record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordState {
    /// Record kind (e.g., "vpc", "dynamodb_table")
    pub kind: String,
    /// Record name from the topology
    pub name: String,
    /// Provider-assigned identifier (e.g., vpc-xxx)
    pub identifier: String,
    /// Attributes as they were last applied, reference edges resolved
    pub attributes: HashMap<String, serde_json::Value>,
}

impl RecordState {
    pub fn new(
        kind: impl Into<String>,
        name: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            identifier: identifier.into(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}
