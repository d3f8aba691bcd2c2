//! Cross-attribute validation
//!
//! Checks the per-attribute schemas cannot express: the relationship between
//! a security group's rule lists and the relationship between a table's hash
//! key and its attribute definitions.

use std::collections::HashMap;

use flinklab_core::record::Value;

/// Validation error with the attribute path it applies to
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// Validate a record's cross-attribute constraints based on its kind
pub fn validate_record(kind: &str, attributes: &HashMap<String, Value>) -> ValidationResult {
    match kind {
        "security_group" => validate_security_group(attributes),
        "dynamodb_table" => validate_dynamodb_table(attributes),
        _ => Ok(()), // Other kinds have no cross-attribute constraints
    }
}

/// Every ingress rule must name a concrete protocol, port range, and source;
/// egress must be declared (the lab posture leaves it fully open, but it has
/// to be explicit, not absent).
pub fn validate_security_group(attributes: &HashMap<String, Value>) -> ValidationResult {
    let mut errors = Vec::new();

    match attributes.get("ingress") {
        Some(Value::List(rules)) => {
            for (i, rule) in rules.iter().enumerate() {
                let path = format!("ingress[{}]", i);
                let Value::Map(rule) = rule else {
                    errors.push(ValidationError {
                        path,
                        message: "rule must be a map".to_string(),
                    });
                    continue;
                };

                match rule.get("ip_protocol") {
                    Some(Value::String(p)) if p != "-1" => {}
                    Some(Value::String(_)) => errors.push(ValidationError {
                        path: path.clone(),
                        message: "ingress rules must name a concrete protocol, not all traffic"
                            .to_string(),
                    }),
                    _ => errors.push(ValidationError {
                        path: path.clone(),
                        message: "missing ip_protocol".to_string(),
                    }),
                }

                for port in ["from_port", "to_port"] {
                    if !matches!(rule.get(port), Some(Value::Int(_))) {
                        errors.push(ValidationError {
                            path: path.clone(),
                            message: format!("missing {}", port),
                        });
                    }
                }

                if !matches!(rule.get("cidr_ip"), Some(Value::String(_))) {
                    errors.push(ValidationError {
                        path,
                        message: "missing cidr_ip source range".to_string(),
                    });
                }
            }
        }
        Some(_) => errors.push(ValidationError {
            path: "ingress".to_string(),
            message: "must be a list of rules".to_string(),
        }),
        None => errors.push(ValidationError {
            path: "ingress".to_string(),
            message: "ingress rules are required".to_string(),
        }),
    }

    if !matches!(attributes.get("egress"), Some(Value::List(_))) {
        errors.push(ValidationError {
            path: "egress".to_string(),
            message: "egress rules are required".to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// The declared hash key must appear in the attribute definition list
pub fn validate_dynamodb_table(attributes: &HashMap<String, Value>) -> ValidationResult {
    let mut errors = Vec::new();

    let hash_key = match attributes.get("hash_key") {
        Some(Value::String(k)) => Some(k.as_str()),
        _ => {
            errors.push(ValidationError {
                path: "hash_key".to_string(),
                message: "missing hash key".to_string(),
            });
            None
        }
    };

    if let Some(hash_key) = hash_key {
        let defined = match attributes.get("attributes") {
            Some(Value::List(defs)) => defs.iter().any(|d| {
                matches!(d, Value::Map(m)
                    if m.get("name").and_then(Value::as_str) == Some(hash_key))
            }),
            _ => false,
        };

        if !defined {
            errors.push(ValidationError {
                path: "attributes".to_string(),
                message: format!(
                    "hash key '{}' does not appear in the attribute definitions",
                    hash_key
                ),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}
