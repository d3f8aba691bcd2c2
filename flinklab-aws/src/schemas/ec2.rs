//! EC2 record schemas
//!
//! Attribute names are the declared (snake_case) names; `provider_name`
//! carries the CloudFormation property each maps to.

use flinklab_core::record::Value;
use flinklab_core::schema::{AttributeSchema, AttributeType, RecordSchema, types};

/// Tags type (Name tag and friends)
pub fn tags_type() -> AttributeType {
    AttributeType::Map(Box::new(AttributeType::String))
}

/// Protocol type for security group rules ("-1" means all traffic)
pub fn protocol() -> AttributeType {
    AttributeType::Enum(vec![
        "tcp".to_string(),
        "udp".to_string(),
        "icmp".to_string(),
        "-1".to_string(),
    ])
}

/// A security group rule: protocol, port range, source/destination range
fn rule_type() -> AttributeType {
    AttributeType::Custom {
        name: "SecurityGroupRule".to_string(),
        base: Box::new(AttributeType::Map(Box::new(AttributeType::String))),
        validate: |value| {
            let Value::Map(rule) = value else {
                return Err("Rule must be a map".to_string());
            };
            match rule.get("ip_protocol") {
                Some(Value::String(_)) => {}
                _ => return Err("Rule needs an 'ip_protocol' string".to_string()),
            }
            for port in ["from_port", "to_port"] {
                match rule.get(port) {
                    Some(Value::Int(n)) if (0..=65535).contains(n) => {}
                    Some(_) => return Err(format!("Rule '{}' must be a port number", port)),
                    // All-traffic rules omit the port range
                    None if rule.get("ip_protocol") == Some(&Value::string("-1")) => {}
                    None => return Err(format!("Rule needs a '{}' port", port)),
                }
            }
            if let Some(Value::String(cidr)) = rule.get("cidr_ip") {
                flinklab_core::schema::validate_cidr(cidr)?;
            }
            Ok(())
        },
    }
}

/// Returns the schema for VPC
pub fn vpc_schema() -> RecordSchema {
    RecordSchema::new("vpc")
        .with_description("A virtual private cloud: the lab's network container")
        .attribute(
            AttributeSchema::new("cidr_block", types::cidr())
                .required()
                .with_provider_name("CidrBlock"),
        )
        .attribute(
            AttributeSchema::new("enable_dns_support", AttributeType::Bool)
                .with_provider_name("EnableDnsSupport"),
        )
        .attribute(
            AttributeSchema::new("enable_dns_hostnames", AttributeType::Bool)
                .with_provider_name("EnableDnsHostnames"),
        )
        .attribute(AttributeSchema::new("tags", tags_type()).with_provider_name("Tags"))
}

/// Returns the schema for Subnet
pub fn subnet_schema() -> RecordSchema {
    RecordSchema::new("subnet")
        .with_description("A subnet inside the lab VPC")
        .attribute(
            AttributeSchema::new("vpc_id", AttributeType::String)
                .required()
                .with_provider_name("VpcId"),
        )
        .attribute(
            AttributeSchema::new("cidr_block", types::cidr())
                .required()
                .with_provider_name("CidrBlock"),
        )
        .attribute(
            AttributeSchema::new("availability_zone", AttributeType::String)
                .with_provider_name("AvailabilityZone"),
        )
        .attribute(
            AttributeSchema::new("map_public_ip_on_launch", AttributeType::Bool)
                .with_provider_name("MapPublicIpOnLaunch"),
        )
        .attribute(AttributeSchema::new("tags", tags_type()).with_provider_name("Tags"))
}

/// Returns the schema for Internet Gateway
pub fn internet_gateway_schema() -> RecordSchema {
    RecordSchema::new("internet_gateway")
        .with_description("An internet gateway")
        .attribute(AttributeSchema::new("tags", tags_type()).with_provider_name("Tags"))
}

/// Returns the schema for VPC Gateway Attachment
pub fn vpc_gateway_attachment_schema() -> RecordSchema {
    RecordSchema::new("vpc_gateway_attachment")
        .with_description("Attaches the internet gateway to the VPC")
        .attribute(
            AttributeSchema::new("vpc_id", AttributeType::String)
                .required()
                .with_provider_name("VpcId"),
        )
        .attribute(
            AttributeSchema::new("internet_gateway_id", AttributeType::String)
                .required()
                .with_provider_name("InternetGatewayId"),
        )
}

/// Returns the schema for Route Table
pub fn route_table_schema() -> RecordSchema {
    RecordSchema::new("route_table")
        .with_description("A route table for the lab VPC")
        .attribute(
            AttributeSchema::new("vpc_id", AttributeType::String)
                .required()
                .with_provider_name("VpcId"),
        )
        .attribute(AttributeSchema::new("tags", tags_type()).with_provider_name("Tags"))
}

/// Returns the schema for Route
pub fn route_schema() -> RecordSchema {
    RecordSchema::new("route")
        .with_description("A route entry (the lab's default route to the gateway)")
        .attribute(
            AttributeSchema::new("route_table_id", AttributeType::String)
                .required()
                .with_provider_name("RouteTableId"),
        )
        .attribute(
            AttributeSchema::new("destination_cidr_block", types::cidr())
                .required()
                .with_provider_name("DestinationCidrBlock"),
        )
        .attribute(
            AttributeSchema::new("gateway_id", AttributeType::String)
                .with_provider_name("GatewayId"),
        )
}

/// Returns the schema for Route Table Association
pub fn route_table_association_schema() -> RecordSchema {
    RecordSchema::new("route_table_association")
        .with_description("Associates the route table with the subnet")
        .attribute(
            AttributeSchema::new("subnet_id", AttributeType::String)
                .required()
                .with_provider_name("SubnetId"),
        )
        .attribute(
            AttributeSchema::new("route_table_id", AttributeType::String)
                .required()
                .with_provider_name("RouteTableId"),
        )
}

/// Returns the schema for Security Group
pub fn security_group_schema() -> RecordSchema {
    RecordSchema::new("security_group")
        .with_description("The lab's access-control group")
        .attribute(
            AttributeSchema::new("vpc_id", AttributeType::String)
                .required()
                .with_provider_name("VpcId"),
        )
        .attribute(
            AttributeSchema::new("description", AttributeType::String)
                .with_provider_name("GroupDescription"),
        )
        .attribute(
            AttributeSchema::new("group_name", AttributeType::String)
                .with_provider_name("GroupName"),
        )
        .attribute(AttributeSchema::new(
            "ingress",
            AttributeType::List(Box::new(rule_type())),
        ))
        .attribute(AttributeSchema::new(
            "egress",
            AttributeType::List(Box::new(rule_type())),
        ))
        .attribute(AttributeSchema::new("tags", tags_type()).with_provider_name("Tags"))
}

/// Returns the schema for EC2 Instance
pub fn ec2_instance_schema() -> RecordSchema {
    RecordSchema::new("ec2_instance")
        .with_description("The lab compute instance")
        .attribute(
            AttributeSchema::new("image_id", AttributeType::String)
                .required()
                .with_provider_name("ImageId"),
        )
        .attribute(
            AttributeSchema::new("instance_type", AttributeType::String)
                .required()
                .with_provider_name("InstanceType"),
        )
        .attribute(
            AttributeSchema::new("subnet_id", AttributeType::String)
                .required()
                .with_provider_name("SubnetId"),
        )
        .attribute(
            AttributeSchema::new(
                "security_group_ids",
                AttributeType::List(Box::new(AttributeType::String)),
            )
            .with_provider_name("SecurityGroupIds"),
        )
        .attribute(
            AttributeSchema::new("key_name", AttributeType::String)
                .with_provider_name("KeyName"),
        )
        .attribute(AttributeSchema::new("user_data", AttributeType::String))
        .attribute(AttributeSchema::new("tags", tags_type()).with_provider_name("Tags"))
}

/// Returns the schema for the machine image data source
pub fn image_query_schema() -> RecordSchema {
    RecordSchema::new("ami")
        .with_description("Machine image lookup (a query result, not a managed record)")
        .attribute(AttributeSchema::new("name_pattern", AttributeType::String).required())
        .attribute(AttributeSchema::new("virtualization_type", AttributeType::String).required())
        .attribute(AttributeSchema::new("architecture", AttributeType::String).required())
        .attribute(AttributeSchema::new("owner", AttributeType::String).required())
}

/// Returns all EC2-related schemas
pub fn schemas() -> Vec<RecordSchema> {
    vec![
        vpc_schema(),
        subnet_schema(),
        internet_gateway_schema(),
        vpc_gateway_attachment_schema(),
        route_table_schema(),
        route_schema(),
        route_table_association_schema(),
        security_group_schema(),
        ec2_instance_schema(),
        image_query_schema(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn tcp_rule(port: i64) -> Value {
        Value::Map(HashMap::from([
            ("ip_protocol".to_string(), Value::string("tcp")),
            ("from_port".to_string(), Value::Int(port)),
            ("to_port".to_string(), Value::Int(port)),
            ("cidr_ip".to_string(), Value::string("0.0.0.0/0")),
        ]))
    }

    #[test]
    fn valid_vpc() {
        let schema = vpc_schema();
        let mut attrs = HashMap::new();
        attrs.insert("cidr_block".to_string(), Value::string("10.0.0.0/16"));
        attrs.insert("enable_dns_support".to_string(), Value::Bool(true));
        attrs.insert("enable_dns_hostnames".to_string(), Value::Bool(true));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn vpc_missing_cidr() {
        let schema = vpc_schema();
        assert!(schema.validate(&HashMap::new()).is_err());
    }

    #[test]
    fn valid_subnet_with_ref() {
        let schema = subnet_schema();
        let mut attrs = HashMap::new();
        attrs.insert("vpc_id".to_string(), Value::reference("vpc", "vpc_id"));
        attrs.insert("cidr_block".to_string(), Value::string("10.0.1.0/24"));
        attrs.insert(
            "availability_zone".to_string(),
            Value::string("us-east-1a"),
        );
        attrs.insert("map_public_ip_on_launch".to_string(), Value::Bool(true));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn valid_security_group_rules() {
        let schema = security_group_schema();
        let mut attrs = HashMap::new();
        attrs.insert("vpc_id".to_string(), Value::reference("vpc", "vpc_id"));
        attrs.insert(
            "ingress".to_string(),
            Value::List(vec![tcp_rule(22), tcp_rule(8081)]),
        );
        attrs.insert(
            "egress".to_string(),
            Value::List(vec![Value::Map(HashMap::from([
                ("ip_protocol".to_string(), Value::string("-1")),
                ("cidr_ip".to_string(), Value::string("0.0.0.0/0")),
            ]))]),
        );

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn ingress_rule_without_ports_is_rejected() {
        let schema = security_group_schema();
        let mut attrs = HashMap::new();
        attrs.insert("vpc_id".to_string(), Value::reference("vpc", "vpc_id"));
        attrs.insert(
            "ingress".to_string(),
            Value::List(vec![Value::Map(HashMap::from([(
                "ip_protocol".to_string(),
                Value::string("tcp"),
            )]))]),
        );

        assert!(schema.validate(&attrs).is_err());
    }

    #[test]
    fn rule_with_bad_cidr_is_rejected() {
        let rule = Value::Map(HashMap::from([
            ("ip_protocol".to_string(), Value::string("tcp")),
            ("from_port".to_string(), Value::Int(80)),
            ("to_port".to_string(), Value::Int(80)),
            ("cidr_ip".to_string(), Value::string("0.0.0.0")),
        ]));
        assert!(rule_type().validate(&rule).is_err());
    }

    #[test]
    fn valid_instance() {
        let schema = ec2_instance_schema();
        let mut attrs = HashMap::new();
        attrs.insert("image_id".to_string(), Value::reference("ami", "image_id"));
        attrs.insert("instance_type".to_string(), Value::string("t3.medium"));
        attrs.insert("subnet_id".to_string(), Value::reference("subnet", "subnet_id"));
        attrs.insert(
            "security_group_ids".to_string(),
            Value::List(vec![Value::reference("sg", "group_id")]),
        );
        attrs.insert(
            "key_name".to_string(),
            Value::string("keypair-sandbox0-sin-mymac.pem"),
        );
        attrs.insert("user_data".to_string(), Value::string("#!/bin/bash\n"));

        assert!(schema.validate(&attrs).is_ok());
    }

    #[test]
    fn protocol_enum() {
        let t = protocol();
        assert!(t.validate(&Value::string("tcp")).is_ok());
        assert!(t.validate(&Value::string("-1")).is_ok());
        assert!(t.validate(&Value::string("gre")).is_err());
    }
}
