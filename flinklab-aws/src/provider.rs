//! AWS Cloud Control provider implementation
//!
//! All resource lifecycle operations are requests to the Cloud Control API;
//! it performs the actual create/update/delete orchestration and reports
//! progress through request tokens that are polled here.

use std::collections::HashMap;
use std::time::Duration;

use aws_sdk_cloudcontrol::Client as CloudControlClient;
use aws_sdk_cloudcontrol::types::OperationStatus;
use aws_sdk_ec2::Client as Ec2Client;
use flinklab_core::provider::{ProviderError, ProviderResult};
use flinklab_core::record::{Record, RecordId, RemoteState, Value};
use serde_json::json;

use crate::lookup::{ImageQuery, ResolvedImage};
use crate::resources::{RecordConfig, get_record_config};
use crate::utils::encode_user_data;

/// AWS provider backed by the Cloud Control API
pub struct AwsProvider {
    cloudcontrol: CloudControlClient,
    ec2: Ec2Client,
    region: String,
}

impl AwsProvider {
    /// Connect using the default AWS config provider chain.
    ///
    /// Aborts immediately when no region is configured; there is no retry
    /// and no fallback region.
    pub async fn connect() -> ProviderResult<Self> {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .load()
            .await;

        let region = config
            .region()
            .map(|r| r.as_ref().to_string())
            .ok_or_else(|| {
                ProviderError::new(
                    "No AWS region configured; set AWS_REGION or configure a profile region",
                )
            })?;

        Ok(Self {
            cloudcontrol: CloudControlClient::new(&config),
            ec2: Ec2Client::new(&config),
            region,
        })
    }

    /// The active region this provider operates in
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Resolve a machine-image query against the provider catalog
    pub async fn resolve_image(&self, query: &ImageQuery) -> ProviderResult<ResolvedImage> {
        crate::lookup::resolve_image(&self.ec2, query).await
    }

    // =========================================================================
    // Cloud Control API Methods
    // =========================================================================

    /// Get a resource by identifier using Cloud Control API
    pub async fn cc_get_resource(
        &self,
        type_name: &str,
        identifier: &str,
    ) -> ProviderResult<Option<serde_json::Value>> {
        let result = self
            .cloudcontrol
            .get_resource()
            .type_name(type_name)
            .identifier(identifier)
            .send()
            .await;

        match result {
            Ok(response) => {
                if let Some(desc) = response.resource_description()
                    && let Some(props_str) = desc.properties()
                {
                    let props: serde_json::Value =
                        serde_json::from_str(props_str).unwrap_or_default();
                    Ok(Some(props))
                } else {
                    Ok(None)
                }
            }
            Err(e) => {
                let err_str = format!("{:?}", e);
                if err_str.contains("ResourceNotFound") || err_str.contains("NotFound") {
                    Ok(None)
                } else {
                    Err(ProviderError::new(format!(
                        "Failed to get resource: {:?}",
                        e
                    )))
                }
            }
        }
    }

    /// Create a resource using Cloud Control API
    pub async fn cc_create_resource(
        &self,
        type_name: &str,
        desired_state: serde_json::Value,
    ) -> ProviderResult<String> {
        let result = self
            .cloudcontrol
            .create_resource()
            .type_name(type_name)
            .desired_state(desired_state.to_string())
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("Failed to create resource: {:?}", e)))?;

        let request_token = result
            .progress_event()
            .and_then(|p| p.request_token())
            .ok_or_else(|| ProviderError::new("No request token returned"))?;

        self.wait_for_operation(request_token).await
    }

    /// Update a resource using Cloud Control API
    pub async fn cc_update_resource(
        &self,
        type_name: &str,
        identifier: &str,
        patch_ops: Vec<serde_json::Value>,
    ) -> ProviderResult<()> {
        if patch_ops.is_empty() {
            return Ok(());
        }

        let patch_document = serde_json::to_string(&patch_ops)
            .map_err(|e| ProviderError::new(format!("Failed to build patch: {}", e)))?;

        let result = self
            .cloudcontrol
            .update_resource()
            .type_name(type_name)
            .identifier(identifier)
            .patch_document(patch_document)
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("Failed to update resource: {:?}", e)))?;

        if let Some(request_token) = result.progress_event().and_then(|p| p.request_token()) {
            self.wait_for_operation(request_token).await?;
        }

        Ok(())
    }

    /// Delete a resource using Cloud Control API
    pub async fn cc_delete_resource(
        &self,
        type_name: &str,
        identifier: &str,
    ) -> ProviderResult<()> {
        let result = self
            .cloudcontrol
            .delete_resource()
            .type_name(type_name)
            .identifier(identifier)
            .send()
            .await
            .map_err(|e| ProviderError::new(format!("Failed to delete resource: {:?}", e)))?;

        if let Some(request_token) = result.progress_event().and_then(|p| p.request_token()) {
            self.wait_for_operation(request_token).await?;
        }

        Ok(())
    }

    /// Wait for a Cloud Control operation to complete
    async fn wait_for_operation(&self, request_token: &str) -> ProviderResult<String> {
        let max_attempts = 120;
        let delay = Duration::from_secs(5);

        for _ in 0..max_attempts {
            let status = self
                .cloudcontrol
                .get_resource_request_status()
                .request_token(request_token)
                .send()
                .await
                .map_err(|e| {
                    ProviderError::new(format!("Failed to get operation status: {:?}", e))
                })?;

            if let Some(progress) = status.progress_event() {
                match progress.operation_status() {
                    Some(OperationStatus::Success) => {
                        return Ok(progress.identifier().unwrap_or("").to_string());
                    }
                    Some(OperationStatus::Failed) => {
                        let msg = progress.status_message().unwrap_or("Unknown error");
                        return Err(ProviderError::new(format!("Operation failed: {}", msg)));
                    }
                    Some(OperationStatus::CancelComplete) => {
                        return Err(ProviderError::new("Operation was cancelled"));
                    }
                    _ => {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(ProviderError::new("Operation timed out"))
    }

    // =========================================================================
    // Record Operations
    // =========================================================================

    /// Read a record's remote state by its provider-assigned identifier
    pub async fn read_record(
        &self,
        id: &RecordId,
        identifier: Option<&str>,
    ) -> ProviderResult<RemoteState> {
        let config = record_config(id)?;

        let identifier = match identifier {
            Some(id) => id,
            None => return Ok(RemoteState::not_found(id.clone())),
        };

        let props = match self
            .cc_get_resource(config.aws_type_name, identifier)
            .await?
        {
            Some(props) => props,
            None => return Ok(RemoteState::not_found(id.clone())),
        };

        let mut attributes = HashMap::new();

        // Map AWS properties back to declared attribute names
        for (declared_name, aws_name) in config.attributes {
            if let Some(value) = props.get(*aws_name)
                && let Some(v) = json_to_value(value)
            {
                attributes.insert(declared_name.to_string(), v);
            }
        }

        // Tags come back in CloudFormation's Key/Value list form
        if config.has_tags
            && let Some(tags_array) = props.get("Tags").and_then(|v| v.as_array())
        {
            let tags_map = parse_tags(tags_array);
            if !tags_map.is_empty() {
                attributes.insert("tags".to_string(), Value::Map(tags_map));
            }
        }

        Ok(RemoteState::existing(id.clone(), attributes).with_identifier(identifier))
    }

    /// Create a record and return its remote state
    pub async fn create_record(&self, record: Record) -> ProviderResult<RemoteState> {
        let config = record_config(&record.id)?;

        let desired_state = self
            .build_desired_state(&record, config)
            .map_err(|e| e.for_record(record.id.clone()))?;

        let identifier = self
            .cc_create_resource(
                config.aws_type_name,
                serde_json::Value::Object(desired_state),
            )
            .await
            .map_err(|e| e.for_record(record.id.clone()))?;

        self.read_record(&record.id, Some(&identifier)).await
    }

    /// Update a record in place via a JSON patch
    pub async fn update_record(
        &self,
        id: RecordId,
        identifier: &str,
        to: Record,
    ) -> ProviderResult<RemoteState> {
        let config = record_config(&id)?;

        let desired_state = self
            .build_desired_state(&to, config)
            .map_err(|e| e.for_record(id.clone()))?;

        let patch_ops: Vec<serde_json::Value> = desired_state
            .into_iter()
            .map(|(aws_name, value)| {
                json!({
                    "op": "replace",
                    "path": format!("/{}", aws_name),
                    "value": value
                })
            })
            .collect();

        self.cc_update_resource(config.aws_type_name, identifier, patch_ops)
            .await
            .map_err(|e| e.for_record(id.clone()))?;

        self.read_record(&id, Some(identifier)).await
    }

    /// Delete a record
    pub async fn delete_record(&self, id: &RecordId, identifier: &str) -> ProviderResult<()> {
        let config = record_config(id)?;

        self.cc_delete_resource(config.aws_type_name, identifier)
            .await
            .map_err(|e| e.for_record(id.clone()))
    }

    // =========================================================================
    // Desired-State Assembly
    // =========================================================================

    /// Build the Cloud Control desired-state document for a record
    fn build_desired_state(
        &self,
        record: &Record,
        config: &RecordConfig,
    ) -> ProviderResult<serde_json::Map<String, serde_json::Value>> {
        let mut desired_state = serde_json::Map::new();

        for (declared_name, aws_name) in config.attributes {
            if let Some(value) = record.attributes.get(*declared_name) {
                desired_state.insert(aws_name.to_string(), value_to_json(value)?);
            }
        }

        self.assemble_special_attributes(record, &mut desired_state)?;

        if config.has_tags {
            let tags = build_tags(record.attributes.get("tags"));
            if !tags.is_empty() {
                desired_state.insert("Tags".to_string(), json!(tags));
            }
        }

        Ok(desired_state)
    }

    /// Properties that do not follow the one-to-one attribute mapping
    fn assemble_special_attributes(
        &self,
        record: &Record,
        desired_state: &mut serde_json::Map<String, serde_json::Value>,
    ) -> ProviderResult<()> {
        match record.id.kind.as_str() {
            "security_group" => {
                if let Some(ingress) = record.attributes.get("ingress") {
                    desired_state
                        .insert("SecurityGroupIngress".to_string(), rule_list_to_json(ingress)?);
                }
                if let Some(egress) = record.attributes.get("egress") {
                    desired_state
                        .insert("SecurityGroupEgress".to_string(), rule_list_to_json(egress)?);
                }
            }
            "ec2_instance" => {
                if let Some(Value::String(script)) = record.attributes.get("user_data") {
                    desired_state
                        .insert("UserData".to_string(), json!(encode_user_data(script)));
                }
            }
            "dynamodb_table" => {
                if let Some(attrs) = record.attributes.get("attributes") {
                    desired_state.insert(
                        "AttributeDefinitions".to_string(),
                        attribute_definitions_to_json(attrs)?,
                    );
                }
                if let Some(Value::String(hash_key)) = record.attributes.get("hash_key") {
                    desired_state.insert(
                        "KeySchema".to_string(),
                        json!([{"AttributeName": hash_key, "KeyType": "HASH"}]),
                    );
                }
            }
            _ => {}
        }
        Ok(())
    }
}

fn record_config(id: &RecordId) -> ProviderResult<&'static RecordConfig> {
    get_record_config(&id.kind).ok_or_else(|| {
        ProviderError::new(format!("Unknown record kind: {}", id.kind)).for_record(id.clone())
    })
}

// =============================================================================
// Value Conversion
// =============================================================================

/// Convert a declared Value to a Cloud Control JSON value.
///
/// Unresolved reference edges are an error here: by the time a record reaches
/// the provider, the apply loop has substituted every `Ref` with the target's
/// materialized attribute.
pub fn value_to_json(value: &Value) -> ProviderResult<serde_json::Value> {
    match value {
        Value::String(s) => Ok(json!(s)),
        Value::Int(i) => Ok(json!(i)),
        Value::Bool(b) => Ok(json!(b)),
        Value::List(items) => {
            let arr: Result<Vec<serde_json::Value>, ProviderError> =
                items.iter().map(value_to_json).collect();
            Ok(serde_json::Value::Array(arr?))
        }
        Value::Map(map) => {
            let mut obj = serde_json::Map::new();
            for (k, v) in map {
                obj.insert(k.clone(), value_to_json(v)?);
            }
            Ok(serde_json::Value::Object(obj))
        }
        Value::Ref(binding, attr) => Err(ProviderError::new(format!(
            "Unresolved reference {}.{}",
            binding, attr
        ))),
    }
}

/// Convert a Cloud Control JSON value to a declared Value
pub fn json_to_value(value: &serde_json::Value) -> Option<Value> {
    match value {
        serde_json::Value::String(s) => Some(Value::String(s.clone())),
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::Int(i))
            } else {
                n.as_f64().map(|f| Value::Int(f as i64))
            }
        }
        serde_json::Value::Array(arr) => {
            let items: Vec<Value> = arr.iter().filter_map(json_to_value).collect();
            Some(Value::List(items))
        }
        serde_json::Value::Object(obj) => {
            let map: HashMap<String, Value> = obj
                .iter()
                .filter_map(|(k, v)| json_to_value(v).map(|v| (k.clone(), v)))
                .collect();
            Some(Value::Map(map))
        }
        serde_json::Value::Null => None,
    }
}

/// Convert a list of rule maps to CloudFormation's rule property form
fn rule_list_to_json(rules: &Value) -> ProviderResult<serde_json::Value> {
    let Value::List(items) = rules else {
        return Err(ProviderError::new("Rule list must be a list of maps"));
    };

    let mut out = Vec::new();
    for item in items {
        let Value::Map(rule) = item else {
            return Err(ProviderError::new("Each rule must be a map"));
        };

        let mut obj = serde_json::Map::new();
        for (key, value) in rule {
            let aws_name = match key.as_str() {
                "ip_protocol" => "IpProtocol",
                "from_port" => "FromPort",
                "to_port" => "ToPort",
                "cidr_ip" => "CidrIp",
                "description" => "Description",
                other => {
                    return Err(ProviderError::new(format!(
                        "Unknown rule attribute '{}'",
                        other
                    )));
                }
            };
            obj.insert(aws_name.to_string(), value_to_json(value)?);
        }
        out.push(serde_json::Value::Object(obj));
    }

    Ok(serde_json::Value::Array(out))
}

/// Convert the table's attribute list to AttributeDefinitions form
fn attribute_definitions_to_json(attrs: &Value) -> ProviderResult<serde_json::Value> {
    let Value::List(items) = attrs else {
        return Err(ProviderError::new(
            "Table attributes must be a list of maps",
        ));
    };

    let mut out = Vec::new();
    for item in items {
        let Value::Map(attr) = item else {
            return Err(ProviderError::new("Each table attribute must be a map"));
        };

        let name = attr
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::new("Table attribute needs a 'name'"))?;
        let attr_type = attr
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::new("Table attribute needs a 'type'"))?;

        out.push(json!({"AttributeName": name, "AttributeType": attr_type}));
    }

    Ok(serde_json::Value::Array(out))
}

// =============================================================================
// Tag Helpers
// =============================================================================

/// Build the CloudFormation Key/Value tags array
fn build_tags(user_tags: Option<&Value>) -> Vec<serde_json::Value> {
    let mut tags = Vec::new();
    if let Some(Value::Map(user_tags)) = user_tags {
        let mut keys: Vec<_> = user_tags.keys().collect();
        keys.sort();
        for key in keys {
            if let Some(Value::String(v)) = user_tags.get(key) {
                tags.push(json!({"Key": key, "Value": v}));
            }
        }
    }
    tags
}

/// Parse CloudFormation's Key/Value tags array to a map
fn parse_tags(tags_array: &[serde_json::Value]) -> HashMap<String, Value> {
    let mut tags_map = HashMap::new();
    for tag in tags_array {
        if let (Some(key), Some(value)) = (
            tag.get("Key").and_then(|v| v.as_str()),
            tag.get("Value").and_then(|v| v.as_str()),
        ) {
            tags_map.insert(key.to_string(), Value::String(value.to_string()));
        }
    }
    tags_map
}
