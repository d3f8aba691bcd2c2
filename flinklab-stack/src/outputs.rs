//! Output bindings
//!
//! Names the generated attributes a successful apply surfaces for downstream
//! consumption. Pure read-after-create: resolution only looks at attributes
//! the provider reported back.

use std::collections::{BTreeMap, HashMap};

use flinklab_core::record::Value;

/// A declared output: a name bound to one record attribute
#[derive(Debug, Clone)]
pub struct OutputBinding {
    /// Output name consumers read (e.g., "instancePublicIp")
    pub name: &'static str,
    /// Binding of the record the value comes from
    pub binding: &'static str,
    /// Attribute of that record
    pub attribute: &'static str,
}

/// Error resolving outputs after an apply
#[derive(Debug, Clone, thiserror::Error)]
pub enum OutputError {
    #[error("output '{name}' refers to unknown record binding '{binding}'")]
    UnknownBinding { name: String, binding: String },

    #[error("output '{name}': record '{binding}' has no attribute '{attribute}'")]
    MissingAttribute {
        name: String,
        binding: String,
        attribute: String,
    },

    #[error("output '{name}' resolved to an empty value")]
    EmptyValue { name: String },
}

/// The lab's exported outputs
pub fn output_bindings() -> Vec<OutputBinding> {
    vec![
        OutputBinding {
            name: "instancePublicIp",
            binding: "instance",
            attribute: "public_ip",
        },
        OutputBinding {
            name: "productCatalogTableName",
            binding: "product_table",
            attribute: "table_name",
        },
        OutputBinding {
            name: "productCatalogTableArn",
            binding: "product_table",
            attribute: "arn",
        },
    ]
}

/// Resolve every output against the materialized record attributes.
///
/// `resolved` maps record bindings to their attributes as reported by the
/// provider after apply.
pub fn resolve_outputs(
    resolved: &HashMap<String, HashMap<String, Value>>,
) -> Result<BTreeMap<String, String>, OutputError> {
    let mut outputs = BTreeMap::new();

    for output in output_bindings() {
        let attrs = resolved.get(output.binding).ok_or_else(|| {
            OutputError::UnknownBinding {
                name: output.name.to_string(),
                binding: output.binding.to_string(),
            }
        })?;

        let value = attrs
            .get(output.attribute)
            .and_then(Value::as_str)
            .ok_or_else(|| OutputError::MissingAttribute {
                name: output.name.to_string(),
                binding: output.binding.to_string(),
                attribute: output.attribute.to_string(),
            })?;

        if value.is_empty() {
            return Err(OutputError::EmptyValue {
                name: output.name.to_string(),
            });
        }

        outputs.insert(output.name.to_string(), value.to_string());
    }

    Ok(outputs)
}
