//! The lab's resource topology
//!
//! A fixed, declarative list of desired-state records. References always
//! point at records declared earlier, so declaration order is a valid
//! creation order.

use std::collections::HashMap;

use flinklab_core::record::{Record, Value};

use crate::bootstrap::BOOTSTRAP_SCRIPT;

/// Pre-existing key pair the instance launches with. Not created here; it
/// must already exist in the target account and region.
pub const DEFAULT_KEY_NAME: &str = "keypair-sandbox0-sin-mymac.pem";

/// Allowed inbound TCP ports: SSH, Flink UI, HTTP, HTTPS
pub const INGRESS_PORTS: [i64; 4] = [22, 8081, 80, 443];

const VPC_CIDR: &str = "10.0.0.0/16";
const SUBNET_CIDR: &str = "10.0.1.0/24";
const ANYWHERE: &str = "0.0.0.0/0";

/// Per-run inputs of the topology
#[derive(Debug, Clone)]
pub struct StackConfig {
    /// Active provider region; the subnet pins itself to its first zone
    pub region: String,
    /// Name of the pre-existing key pair
    pub key_name: String,
}

impl StackConfig {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            key_name: DEFAULT_KEY_NAME.to_string(),
        }
    }

    pub fn with_key_name(mut self, key_name: impl Into<String>) -> Self {
        self.key_name = key_name.into();
        self
    }

    /// The availability zone the subnet lands in: the region's "a" zone
    pub fn availability_zone(&self) -> String {
        format!("{}a", self.region)
    }
}

fn name_tag(name: &str) -> Value {
    Value::Map(HashMap::from([(
        "Name".to_string(),
        Value::string(name),
    )]))
}

fn tcp_rule(port: i64) -> Value {
    Value::Map(HashMap::from([
        ("ip_protocol".to_string(), Value::string("tcp")),
        ("from_port".to_string(), Value::Int(port)),
        ("to_port".to_string(), Value::Int(port)),
        ("cidr_ip".to_string(), Value::string(ANYWHERE)),
    ]))
}

fn all_traffic_rule() -> Value {
    Value::Map(HashMap::from([
        ("ip_protocol".to_string(), Value::string("-1")),
        ("cidr_ip".to_string(), Value::string(ANYWHERE)),
    ]))
}

/// Build the lab's desired-state records, leaves first.
///
/// The machine image is a data source: looked up, never created. Everything
/// else is managed and created once per successful run.
pub fn desired_records(config: &StackConfig) -> Vec<Record> {
    let mut records = Vec::new();

    // Latest Amazon Linux 2023 image; an external fact, not pinned
    records.push(
        Record::new("ami", "al2023", "ami")
            .with_read_only(true)
            .with_attribute(
                "name_pattern",
                Value::string("al2023-ami-2023*-kernel-6.12-x86_64"),
            )
            .with_attribute("virtualization_type", Value::string("hvm"))
            .with_attribute("architecture", Value::string("x86_64"))
            .with_attribute("owner", Value::string("amazon")),
    );

    records.push(
        Record::new("vpc", "flink-ddb-vpc", "vpc")
            .with_attribute("cidr_block", Value::string(VPC_CIDR))
            .with_attribute("enable_dns_support", Value::Bool(true))
            .with_attribute("enable_dns_hostnames", Value::Bool(true))
            .with_attribute("tags", name_tag("flink-ddb-vpc")),
    );

    records.push(
        Record::new("subnet", "flink-ddb-subnet", "subnet")
            .with_attribute("vpc_id", Value::reference("vpc", "vpc_id"))
            .with_attribute("cidr_block", Value::string(SUBNET_CIDR))
            .with_attribute("availability_zone", Value::string(config.availability_zone()))
            .with_attribute("map_public_ip_on_launch", Value::Bool(true))
            .with_attribute("tags", name_tag("flink-ddb-subnet")),
    );

    records.push(
        Record::new("internet_gateway", "flink-ddb-igw", "igw")
            .with_attribute("tags", name_tag("flink-ddb-igw")),
    );

    records.push(
        Record::new("vpc_gateway_attachment", "flink-ddb-igw-attachment", "igw_attachment")
            .with_attribute("vpc_id", Value::reference("vpc", "vpc_id"))
            .with_attribute(
                "internet_gateway_id",
                Value::reference("igw", "internet_gateway_id"),
            ),
    );

    records.push(
        Record::new("route_table", "flink-ddb-rt", "route_table")
            .with_attribute("vpc_id", Value::reference("vpc", "vpc_id"))
            .with_attribute("tags", name_tag("flink-ddb-rt")),
    );

    records.push(
        Record::new("route", "flink-ddb-default-route", "default_route")
            .with_attribute(
                "route_table_id",
                Value::reference("route_table", "route_table_id"),
            )
            .with_attribute("destination_cidr_block", Value::string(ANYWHERE))
            .with_attribute(
                "gateway_id",
                Value::reference("igw", "internet_gateway_id"),
            ),
    );

    records.push(
        Record::new("route_table_association", "flink-ddb-rta", "rta")
            .with_attribute("subnet_id", Value::reference("subnet", "subnet_id"))
            .with_attribute(
                "route_table_id",
                Value::reference("route_table", "route_table_id"),
            ),
    );

    // Fixed allow-list; egress stays fully open
    records.push(
        Record::new("security_group", "flink-ddb-sg", "sg")
            .with_attribute("vpc_id", Value::reference("vpc", "vpc_id"))
            .with_attribute("group_name", Value::string("flink-ddb-sg"))
            .with_attribute(
                "description",
                Value::string("Security group for Flink DynamoDB lab"),
            )
            .with_attribute(
                "ingress",
                Value::List(INGRESS_PORTS.iter().map(|p| tcp_rule(*p)).collect()),
            )
            .with_attribute("egress", Value::List(vec![all_traffic_rule()]))
            .with_attribute("tags", name_tag("flink-ddb-sg")),
    );

    records.push(
        Record::new("ec2_instance", "flink-ddb-instance", "instance")
            .with_attribute("image_id", Value::reference("ami", "image_id"))
            .with_attribute("instance_type", Value::string("t3.medium"))
            .with_attribute("subnet_id", Value::reference("subnet", "subnet_id"))
            .with_attribute(
                "security_group_ids",
                Value::List(vec![Value::reference("sg", "group_id")]),
            )
            .with_attribute("key_name", Value::string(&config.key_name))
            .with_attribute("user_data", Value::string(BOOTSTRAP_SCRIPT))
            .with_attribute("tags", name_tag("flink-ddb-instance")),
    );

    // Independent of all network records
    records.push(
        Record::new("dynamodb_table", "product-catalog", "product_table")
            .with_attribute("table_name", Value::string("product-catalog"))
            .with_attribute(
                "attributes",
                Value::List(vec![Value::Map(HashMap::from([
                    ("name".to_string(), Value::string("product_id")),
                    ("type".to_string(), Value::string("S")),
                ]))]),
            )
            .with_attribute("hash_key", Value::string("product_id"))
            .with_attribute("billing_mode", Value::string("PAY_PER_REQUEST"))
            .with_attribute("table_class", Value::string("STANDARD"))
            .with_attribute("tags", name_tag("product_catalog")),
    );

    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use flinklab_core::graph::{creation_order, verify_declaration_order};

    fn records() -> Vec<Record> {
        desired_records(&StackConfig::new("us-east-1"))
    }

    fn find<'a>(records: &'a [Record], binding: &str) -> &'a Record {
        records
            .iter()
            .find(|r| r.binding == binding)
            .unwrap_or_else(|| panic!("no record bound as '{}'", binding))
    }

    #[test]
    fn references_only_point_backwards() {
        assert!(verify_declaration_order(&records()).is_ok());
    }

    #[test]
    fn creation_order_matches_declaration_order() {
        let declared = records();
        let sorted = creation_order(&declared).unwrap();
        let declared_bindings: Vec<_> = declared.iter().map(|r| r.binding.clone()).collect();
        let sorted_bindings: Vec<_> = sorted.iter().map(|r| r.binding.clone()).collect();
        assert_eq!(declared_bindings, sorted_bindings);
    }

    #[test]
    fn ingress_is_exactly_the_fixed_allow_list() {
        let records = records();
        let sg = find(&records, "sg");

        let Some(Value::List(rules)) = sg.attributes.get("ingress") else {
            panic!("ingress missing");
        };

        let mut ports = Vec::new();
        for rule in rules {
            let Value::Map(rule) = rule else {
                panic!("rule is not a map")
            };
            assert_eq!(rule.get("ip_protocol"), Some(&Value::string("tcp")));
            assert_eq!(rule.get("cidr_ip"), Some(&Value::string("0.0.0.0/0")));
            assert_eq!(rule.get("from_port"), rule.get("to_port"));
            let Some(Value::Int(port)) = rule.get("from_port") else {
                panic!("rule has no port")
            };
            ports.push(*port);
        }
        ports.sort();
        assert_eq!(ports, vec![22, 80, 443, 8081]);
    }

    #[test]
    fn egress_is_fully_open() {
        let records = records();
        let sg = find(&records, "sg");

        let Some(Value::List(rules)) = sg.attributes.get("egress") else {
            panic!("egress missing");
        };
        assert_eq!(rules.len(), 1);
        let Value::Map(rule) = &rules[0] else {
            panic!("rule is not a map")
        };
        assert_eq!(rule.get("ip_protocol"), Some(&Value::string("-1")));
        assert_eq!(rule.get("cidr_ip"), Some(&Value::string("0.0.0.0/0")));
    }

    #[test]
    fn table_attribute_list_is_exactly_the_hash_key() {
        let records = records();
        let table = find(&records, "product_table");

        let Some(Value::String(hash_key)) = table.attributes.get("hash_key") else {
            panic!("hash_key missing");
        };
        let Some(Value::List(attrs)) = table.attributes.get("attributes") else {
            panic!("attributes missing");
        };

        assert_eq!(attrs.len(), 1);
        let Value::Map(attr) = &attrs[0] else {
            panic!("attribute is not a map")
        };
        assert_eq!(attr.get("name"), Some(&Value::string(hash_key.as_str())));
        assert_eq!(attr.get("type"), Some(&Value::string("S")));
    }

    #[test]
    fn table_billing_is_on_demand_with_no_throughput() {
        let records = records();
        let table = find(&records, "product_table");

        assert_eq!(
            table.attributes.get("billing_mode"),
            Some(&Value::string("PAY_PER_REQUEST"))
        );
        assert!(!table.attributes.contains_key("read_capacity"));
        assert!(!table.attributes.contains_key("write_capacity"));
    }

    #[test]
    fn subnet_zone_is_region_suffixed_with_a() {
        let config = StackConfig::new("us-east-1");
        assert_eq!(config.availability_zone(), "us-east-1a");

        let records = desired_records(&config);
        let subnet = find(&records, "subnet");
        assert_eq!(
            subnet.attributes.get("availability_zone"),
            Some(&Value::string("us-east-1a"))
        );
    }

    #[test]
    fn image_is_the_only_data_source() {
        let records = records();
        let data_sources: Vec<_> = records.iter().filter(|r| r.is_data_source()).collect();
        assert_eq!(data_sources.len(), 1);
        assert_eq!(data_sources[0].binding, "ami");
    }

    #[test]
    fn table_has_no_reference_edges_to_network_records() {
        let records = records();
        let table = find(&records, "product_table");
        let graph = flinklab_core::graph::ReferenceGraph::from_records(&records);
        assert!(graph.references_of(&table.binding).is_empty());
    }

    #[test]
    fn instance_references_image_subnet_and_group() {
        let records = records();
        let graph = flinklab_core::graph::ReferenceGraph::from_records(&records);
        let targets: std::collections::HashSet<_> = graph
            .references_of("instance")
            .iter()
            .map(|e| e.target.as_str())
            .collect();
        assert_eq!(targets, ["ami", "subnet", "sg"].into_iter().collect());
    }

    #[test]
    fn key_name_is_overridable() {
        let config = StackConfig::new("us-east-1").with_key_name("my-own-key");
        let records = desired_records(&config);
        let instance = find(&records, "instance");
        assert_eq!(
            instance.attributes.get("key_name"),
            Some(&Value::string("my-own-key"))
        );
    }

    #[test]
    fn every_record_passes_its_schema_and_cross_checks() {
        for record in records() {
            let schema = flinklab_aws::schemas::schema_for(&record.id.kind)
                .unwrap_or_else(|| panic!("no schema for {}", record.id.kind));
            if let Err(errors) = schema.validate(&record.attributes) {
                panic!("{} failed schema validation: {:?}", record.id, errors);
            }
            if let Err(errors) =
                flinklab_aws::validation::validate_record(&record.id.kind, &record.attributes)
            {
                panic!("{} failed validation: {:?}", record.id, errors);
            }
        }
    }
}
