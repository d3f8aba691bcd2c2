//! Schema - Type schemas for record attributes
//!
//! The provider defines a schema per record kind, enabling validation before
//! anything is submitted to the cloud control plane.

use std::collections::HashMap;
use std::fmt;

use crate::record::Value;

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    String,
    Int,
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    List(Box<AttributeType>),
    Map(Box<AttributeType>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            // Ref values resolve to strings at apply time, so they satisfy String
            (AttributeType::String, Value::String(_) | Value::Ref(_, _)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { validate, .. }, v) => {
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::Ref(binding, attr) => format!("Ref({}.{})", binding, attr),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    pub description: Option<String>,
    /// Provider-side property name (e.g., "VpcId" for AWS Cloud Control)
    pub provider_name: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            description: None,
            provider_name: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }
}

/// Record schema
#[derive(Debug, Clone)]
pub struct RecordSchema {
    pub kind: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
}

impl RecordSchema {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            attributes: HashMap::new(),
            description: None,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Validate record attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        for (name, schema) in &self.attributes {
            if schema.required && !attributes.contains_key(name) {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        for (name, value) in attributes {
            if let Some(schema) = self.attributes.get(name)
                && let Err(e) = schema.attr_type.validate(value)
            {
                errors.push(e);
            }
            // Unknown attributes are allowed (for flexibility)
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// CIDR block type (e.g., "10.0.0.0/16")
    pub fn cidr() -> AttributeType {
        AttributeType::Custom {
            name: "Cidr".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| {
                if let Value::String(s) = value {
                    validate_cidr(s)
                } else {
                    Err("Expected string".to_string())
                }
            },
        }
    }

    /// Port number type (0-65535)
    pub fn port_number() -> AttributeType {
        AttributeType::Custom {
            name: "PortNumber".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| {
                if let Value::Int(n) = value {
                    if *n >= 0 && *n <= 65535 {
                        Ok(())
                    } else {
                        Err("Port number must be between 0 and 65535".to_string())
                    }
                } else {
                    Err("Expected integer".to_string())
                }
            },
        }
    }
}

/// Validate CIDR block format (e.g., "10.0.0.0/16")
pub fn validate_cidr(cidr: &str) -> Result<(), String> {
    let parts: Vec<&str> = cidr.split('/').collect();
    if parts.len() != 2 {
        return Err(format!("Invalid CIDR format '{}': expected IP/prefix", cidr));
    }

    let ip = parts[0];
    let prefix = parts[1];

    let octets: Vec<&str> = ip.split('.').collect();
    if octets.len() != 4 {
        return Err(format!("Invalid IP address '{}': expected 4 octets", ip));
    }

    for octet in &octets {
        if octet.parse::<u8>().is_err() {
            return Err(format!(
                "Invalid octet '{}' in IP address: must be 0-255",
                octet
            ));
        }
    }

    match prefix.parse::<u8>() {
        Ok(p) if p <= 32 => Ok(()),
        Ok(p) => Err(format!("Invalid prefix length '{}': must be 0-32", p)),
        Err(_) => Err(format!(
            "Invalid prefix length '{}': must be a number",
            prefix
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_string_type() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::string("hello")).is_ok());
        assert!(t.validate(&Value::Int(42)).is_err());
    }

    #[test]
    fn string_type_accepts_refs() {
        let t = AttributeType::String;
        assert!(t.validate(&Value::reference("vpc", "vpc_id")).is_ok());
    }

    #[test]
    fn validate_enum_type() {
        let t = AttributeType::Enum(vec!["PAY_PER_REQUEST".to_string(), "PROVISIONED".to_string()]);
        assert!(t.validate(&Value::string("PAY_PER_REQUEST")).is_ok());
        assert!(t.validate(&Value::string("ON_DEMAND")).is_err());
    }

    #[test]
    fn validate_port_number() {
        let t = types::port_number();
        assert!(t.validate(&Value::Int(22)).is_ok());
        assert!(t.validate(&Value::Int(65535)).is_ok());
        assert!(t.validate(&Value::Int(-1)).is_err());
        assert!(t.validate(&Value::Int(70000)).is_err());
    }

    #[test]
    fn validate_cidr_type() {
        let t = types::cidr();
        assert!(t.validate(&Value::string("10.0.0.0/16")).is_ok());
        assert!(t.validate(&Value::string("0.0.0.0/0")).is_ok());
        assert!(t.validate(&Value::string("10.0.0.0")).is_err()); // no prefix
        assert!(t.validate(&Value::string("10.0.0.0/33")).is_err()); // prefix too large
        assert!(t.validate(&Value::string("10.0.0.256/16")).is_err()); // octet > 255
        assert!(t.validate(&Value::string("10.0.0/16")).is_err()); // only 3 octets
        assert!(t.validate(&Value::Int(42)).is_err()); // wrong type
    }

    #[test]
    fn validate_record_schema() {
        let schema = RecordSchema::new("subnet")
            .attribute(AttributeSchema::new("vpc_id", AttributeType::String).required())
            .attribute(AttributeSchema::new("cidr_block", types::cidr()).required())
            .attribute(AttributeSchema::new(
                "map_public_ip_on_launch",
                AttributeType::Bool,
            ));

        let mut attrs = HashMap::new();
        attrs.insert("vpc_id".to_string(), Value::reference("vpc", "vpc_id"));
        attrs.insert("cidr_block".to_string(), Value::string("10.0.1.0/24"));
        attrs.insert("map_public_ip_on_launch".to_string(), Value::Bool(true));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn missing_required_attribute() {
        let schema = RecordSchema::new("vpc")
            .attribute(AttributeSchema::new("cidr_block", types::cidr()).required());

        let attrs = HashMap::new();
        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn list_items_validated() {
        let schema = RecordSchema::new("security_group").attribute(AttributeSchema::new(
            "ingress",
            AttributeType::List(Box::new(AttributeType::Map(Box::new(AttributeType::String)))),
        ));

        let mut rule = HashMap::new();
        rule.insert("ip_protocol".to_string(), Value::string("tcp"));

        let mut attrs = HashMap::new();
        attrs.insert(
            "ingress".to_string(),
            Value::List(vec![Value::Map(rule), Value::Int(5)]),
        );

        let errors = schema.validate(&attrs).unwrap_err();
        assert!(matches!(errors[0], TypeError::ListItemError { index: 1, .. }));
    }
}
