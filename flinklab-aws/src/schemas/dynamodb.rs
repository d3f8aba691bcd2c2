//! DynamoDB record schemas

use flinklab_core::record::Value;
use flinklab_core::schema::{AttributeSchema, AttributeType, RecordSchema};

use super::ec2::tags_type;

/// A table attribute definition: name + scalar type
fn attribute_definition_type() -> AttributeType {
    AttributeType::Custom {
        name: "AttributeDefinition".to_string(),
        base: Box::new(AttributeType::Map(Box::new(AttributeType::String))),
        validate: |value| {
            let Value::Map(attr) = value else {
                return Err("Attribute definition must be a map".to_string());
            };
            match attr.get("name") {
                Some(Value::String(s)) if !s.is_empty() => {}
                _ => return Err("Attribute definition needs a non-empty 'name'".to_string()),
            }
            match attr.get("type") {
                Some(Value::String(t)) if matches!(t.as_str(), "S" | "N" | "B") => Ok(()),
                _ => Err("Attribute 'type' must be one of S, N, B".to_string()),
            }
        },
    }
}

/// Returns the schema for the data table
pub fn dynamodb_table_schema() -> RecordSchema {
    RecordSchema::new("dynamodb_table")
        .with_description("Single-partition-key table with on-demand billing")
        .attribute(
            AttributeSchema::new("table_name", AttributeType::String)
                .required()
                .with_provider_name("TableName"),
        )
        .attribute(
            AttributeSchema::new(
                "attributes",
                AttributeType::List(Box::new(attribute_definition_type())),
            )
            .required(),
        )
        .attribute(AttributeSchema::new("hash_key", AttributeType::String).required())
        .attribute(
            AttributeSchema::new(
                "billing_mode",
                AttributeType::Enum(vec![
                    "PAY_PER_REQUEST".to_string(),
                    "PROVISIONED".to_string(),
                ]),
            )
            .with_provider_name("BillingMode"),
        )
        .attribute(
            AttributeSchema::new(
                "table_class",
                AttributeType::Enum(vec![
                    "STANDARD".to_string(),
                    "STANDARD_INFREQUENT_ACCESS".to_string(),
                ]),
            )
            .with_provider_name("TableClass"),
        )
        .attribute(AttributeSchema::new("tags", tags_type()).with_provider_name("Tags"))
}

/// Returns all DynamoDB-related schemas
pub fn schemas() -> Vec<RecordSchema> {
    vec![dynamodb_table_schema()]
}
