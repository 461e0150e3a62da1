//! The `aptible_endpoint` resource.
//!
//! Endpoints are `vhosts` on the wire, attached to a service. Container ports
//! travel as 32-bit integers on this surface, so values go through the
//! checked narrowing helper rather than truncating.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::client::{self, AptibleClient};
use crate::error::ProviderError;
use crate::handler::{RemoteRecord, ResourceHandler};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::state::{narrow_to_i32, ResourceState};

use super::{parent_id, response_id};

pub struct EndpointResource;

const TYPE_NAME: &str = "aptible_endpoint";

fn narrowed_port(value: &Value) -> Result<Value, ProviderError> {
    let port = value.as_i64().ok_or_else(|| {
        ProviderError::Validation(format!("container_port must be an integer, got {}", value))
    })?;
    Ok(Value::from(narrow_to_i32(port)?))
}

fn record_from(record: &Value) -> Result<RemoteRecord, ProviderError> {
    let id = response_id(record, TYPE_NAME)?;
    let mut out = RemoteRecord::new(id);
    out.deleted = client::is_deprovisioned(record);
    out = out
        .with_attribute("endpoint_id", Value::from(id))
        .with_attribute(
            "virtual_domain",
            record.get("virtual_domain").cloned().unwrap_or(Value::Null),
        )
        .with_attribute(
            "external_hostname",
            record.get("external_host").cloned().unwrap_or(Value::Null),
        )
        .with_attribute(
            "container_port",
            record.get("container_port").cloned().unwrap_or(Value::Null),
        )
        .with_attribute(
            "ip_filtering",
            record.get("ip_whitelist").cloned().unwrap_or(Value::Null),
        );
    Ok(out)
}

#[async_trait]
impl ResourceHandler for EndpointResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "service_id",
                Attribute::required_int64()
                    .with_force_new()
                    .with_description("Service the endpoint exposes"),
            )
            .with_attribute(
                "endpoint_type",
                Attribute::optional_string()
                    .with_force_new()
                    .with_default(Value::from("https"))
                    .with_description("Endpoint type"),
            )
            .with_attribute(
                "internal",
                Attribute::optional_bool()
                    .with_force_new()
                    .with_default(Value::from(false)),
            )
            .with_attribute(
                "default_domain",
                Attribute::optional_bool()
                    .with_force_new()
                    .with_default(Value::from(false))
                    .with_description("Use the platform-provided default domain"),
            )
            .with_attribute(
                "container_port",
                Attribute::optional_int64().with_description("Container port to route to"),
            )
            .with_attribute(
                "ip_filtering",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::optional(),
                )
                .with_description("CIDR allow-list"),
            )
            .with_attribute("endpoint_id", Attribute::computed_int64())
            .with_attribute("virtual_domain", Attribute::computed_string())
            .with_attribute("external_hostname", Attribute::computed_string())
    }

    async fn create_remote(
        &self,
        aptible: &AptibleClient,
        config: &ResourceState,
    ) -> Result<RemoteRecord, ProviderError> {
        let service_id = parent_id(config, "service_id")?;

        let mut body = Map::new();
        if let Some(kind) = config.get("endpoint_type") {
            body.insert("type".to_string(), kind.clone());
        }
        if let Some(internal) = config.get("internal") {
            body.insert("internal".to_string(), internal.clone());
        }
        if let Some(default_domain) = config.get("default_domain") {
            body.insert("default".to_string(), default_domain.clone());
        }
        if let Some(port) = config.get("container_port") {
            body.insert("container_port".to_string(), narrowed_port(port)?);
        }
        if let Some(filtering) = config.get("ip_filtering") {
            body.insert("ip_whitelist".to_string(), filtering.clone());
        }

        let record = aptible
            .post(
                &format!("services/{}/vhosts", service_id),
                &Value::Object(body),
            )
            .await?;
        record_from(&record)
    }

    async fn read_remote(
        &self,
        aptible: &AptibleClient,
        id: i64,
    ) -> Result<RemoteRecord, ProviderError> {
        let record = aptible.get(&format!("vhosts/{}", id)).await?;
        record_from(&record)
    }

    async fn update_remote(
        &self,
        aptible: &AptibleClient,
        id: i64,
        changes: &Map<String, Value>,
    ) -> Result<(), ProviderError> {
        let mut body = Map::new();
        if let Some(port) = changes.get("container_port") {
            body.insert("container_port".to_string(), narrowed_port(port)?);
        }
        if let Some(filtering) = changes.get("ip_filtering") {
            body.insert("ip_whitelist".to_string(), filtering.clone());
        }
        if body.is_empty() {
            return Ok(());
        }

        aptible
            .put(&format!("vhosts/{}", id), &Value::Object(body))
            .await?;
        Ok(())
    }

    async fn delete_remote(&self, aptible: &AptibleClient, id: i64) -> Result<(), ProviderError> {
        aptible.delete(&format!("vhosts/{}", id)).await
    }
}
