//! Attribute schemas for the record kinds this provider manages

pub mod dynamodb;
pub mod ec2;

use flinklab_core::schema::RecordSchema;

/// Returns all schemas this provider knows about
pub fn all_schemas() -> Vec<RecordSchema> {
    let mut schemas = ec2::schemas();
    schemas.extend(dynamodb::schemas());
    schemas
}

/// Look up the schema for a record kind
pub fn schema_for(kind: &str) -> Option<RecordSchema> {
    all_schemas().into_iter().find(|s| s.kind == kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_managed_kind_has_a_schema() {
        for kind in [
            "vpc",
            "subnet",
            "internet_gateway",
            "vpc_gateway_attachment",
            "route_table",
            "route",
            "route_table_association",
            "security_group",
            "ec2_instance",
            "dynamodb_table",
            "ami",
        ] {
            assert!(schema_for(kind).is_some(), "missing schema for {}", kind);
        }
    }

    #[test]
    fn unknown_kind_has_no_schema() {
        assert!(schema_for("nat_gateway").is_none());
    }
}
