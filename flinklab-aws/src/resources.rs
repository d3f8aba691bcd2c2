//! Record kind configurations for the AWS Cloud Control API
//!
//! Maps each declared record kind to its CloudFormation type name and its
//! attribute-name translations.

/// Attribute mapping: (declared name, CloudFormation property name)
pub type AttrMapping = (&'static str, &'static str);

/// Record kind configuration
pub struct RecordConfig {
    /// CloudFormation type name (e.g., "AWS::EC2::VPC")
    pub aws_type_name: &'static str,
    /// Standard attribute mappings (declared name -> AWS name)
    pub attributes: &'static [AttrMapping],
    /// Whether this kind carries tags
    pub has_tags: bool,
}

// =============================================================================
// Network Records
// =============================================================================

pub const VPC_CONFIG: RecordConfig = RecordConfig {
    aws_type_name: "AWS::EC2::VPC",
    attributes: &[
        ("vpc_id", "VpcId"), // Read-only identifier
        ("cidr_block", "CidrBlock"),
        ("enable_dns_hostnames", "EnableDnsHostnames"),
        ("enable_dns_support", "EnableDnsSupport"),
    ],
    has_tags: true,
};

pub const SUBNET_CONFIG: RecordConfig = RecordConfig {
    aws_type_name: "AWS::EC2::Subnet",
    attributes: &[
        ("subnet_id", "SubnetId"), // Read-only identifier
        ("vpc_id", "VpcId"),
        ("cidr_block", "CidrBlock"),
        ("availability_zone", "AvailabilityZone"),
        ("map_public_ip_on_launch", "MapPublicIpOnLaunch"),
    ],
    has_tags: true,
};

pub const INTERNET_GATEWAY_CONFIG: RecordConfig = RecordConfig {
    aws_type_name: "AWS::EC2::InternetGateway",
    attributes: &[
        ("internet_gateway_id", "InternetGatewayId"), // Read-only identifier
    ],
    has_tags: true,
};

pub const VPC_GATEWAY_ATTACHMENT_CONFIG: RecordConfig = RecordConfig {
    aws_type_name: "AWS::EC2::VPCGatewayAttachment",
    attributes: &[
        ("vpc_id", "VpcId"),
        ("internet_gateway_id", "InternetGatewayId"),
    ],
    has_tags: false,
};

// =============================================================================
// Route Records
// =============================================================================

pub const ROUTE_TABLE_CONFIG: RecordConfig = RecordConfig {
    aws_type_name: "AWS::EC2::RouteTable",
    attributes: &[
        ("route_table_id", "RouteTableId"), // Read-only identifier
        ("vpc_id", "VpcId"),
    ],
    has_tags: true,
};

pub const ROUTE_CONFIG: RecordConfig = RecordConfig {
    aws_type_name: "AWS::EC2::Route",
    attributes: &[
        ("route_table_id", "RouteTableId"),
        ("destination_cidr_block", "DestinationCidrBlock"),
        ("gateway_id", "GatewayId"),
    ],
    has_tags: false,
};

pub const ROUTE_TABLE_ASSOCIATION_CONFIG: RecordConfig = RecordConfig {
    aws_type_name: "AWS::EC2::SubnetRouteTableAssociation",
    attributes: &[
        ("id", "Id"), // Read-only identifier
        ("subnet_id", "SubnetId"),
        ("route_table_id", "RouteTableId"),
    ],
    has_tags: false,
};

// =============================================================================
// Security Group
// =============================================================================

pub const SECURITY_GROUP_CONFIG: RecordConfig = RecordConfig {
    aws_type_name: "AWS::EC2::SecurityGroup",
    attributes: &[
        ("group_id", "GroupId"), // Read-only identifier
        ("vpc_id", "VpcId"),
        ("description", "GroupDescription"),
        ("group_name", "GroupName"),
        // ingress/egress rule lists are assembled by the provider
    ],
    has_tags: true,
};

// =============================================================================
// Compute
// =============================================================================

pub const EC2_INSTANCE_CONFIG: RecordConfig = RecordConfig {
    aws_type_name: "AWS::EC2::Instance",
    attributes: &[
        ("instance_id", "InstanceId"), // Read-only identifier
        ("image_id", "ImageId"),
        ("instance_type", "InstanceType"),
        ("subnet_id", "SubnetId"),
        ("security_group_ids", "SecurityGroupIds"),
        ("key_name", "KeyName"),
        ("public_ip", "PublicIp"),   // Read-only
        ("private_ip", "PrivateIp"), // Read-only
        // user_data is base64-encoded by the provider
    ],
    has_tags: true,
};

// =============================================================================
// Data Table
// =============================================================================

pub const DYNAMODB_TABLE_CONFIG: RecordConfig = RecordConfig {
    aws_type_name: "AWS::DynamoDB::Table",
    attributes: &[
        ("table_name", "TableName"),
        ("billing_mode", "BillingMode"),
        ("table_class", "TableClass"),
        ("arn", "Arn"), // Read-only
        // attributes/hash_key become AttributeDefinitions/KeySchema in the provider
    ],
    has_tags: true,
};

// =============================================================================
// Config Lookup
// =============================================================================

/// Get record configuration by declared kind name
pub fn get_record_config(kind: &str) -> Option<&'static RecordConfig> {
    match kind {
        "vpc" => Some(&VPC_CONFIG),
        "subnet" => Some(&SUBNET_CONFIG),
        "internet_gateway" => Some(&INTERNET_GATEWAY_CONFIG),
        "vpc_gateway_attachment" => Some(&VPC_GATEWAY_ATTACHMENT_CONFIG),
        "route_table" => Some(&ROUTE_TABLE_CONFIG),
        "route" => Some(&ROUTE_CONFIG),
        "route_table_association" => Some(&ROUTE_TABLE_ASSOCIATION_CONFIG),
        "security_group" => Some(&SECURITY_GROUP_CONFIG),
        "ec2_instance" => Some(&EC2_INSTANCE_CONFIG),
        "dynamodb_table" => Some(&DYNAMODB_TABLE_CONFIG),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_kinds_resolve() {
        assert!(get_record_config("vpc").is_some());
        assert!(get_record_config("ec2_instance").is_some());
        assert!(get_record_config("dynamodb_table").is_some());
        assert!(get_record_config("ami").is_none()); // data source, not managed
        assert!(get_record_config("unknown").is_none());
    }

    #[test]
    fn cloudformation_type_names() {
        assert_eq!(get_record_config("vpc").unwrap().aws_type_name, "AWS::EC2::VPC");
        assert_eq!(
            get_record_config("route_table_association")
                .unwrap()
                .aws_type_name,
            "AWS::EC2::SubnetRouteTableAssociation"
        );
        assert_eq!(
            get_record_config("dynamodb_table").unwrap().aws_type_name,
            "AWS::DynamoDB::Table"
        );
    }

    #[test]
    fn attachment_and_route_do_not_carry_tags() {
        assert!(!get_record_config("vpc_gateway_attachment").unwrap().has_tags);
        assert!(!get_record_config("route").unwrap().has_tags);
        assert!(!get_record_config("route_table_association").unwrap().has_tags);
    }
}
