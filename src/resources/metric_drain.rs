//! The `aptible_metric_drain` resource. Like log drains, entirely force-new.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::client::{self, AptibleClient};
use crate::error::ProviderError;
use crate::handler::{RemoteRecord, ResourceHandler};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::state::ResourceState;

use super::{parent_id, request_body, response_id};

pub struct MetricDrainResource;

const TYPE_NAME: &str = "aptible_metric_drain";

fn record_from(record: &Value) -> Result<RemoteRecord, ProviderError> {
    let id = response_id(record, TYPE_NAME)?;
    let mut out = RemoteRecord::new(id);
    out.deleted = client::is_deprovisioned(record);
    out = out.with_attribute("metric_drain_id", Value::from(id));
    Ok(out)
}

#[async_trait]
impl ResourceHandler for MetricDrainResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "env_id",
                Attribute::required_int64()
                    .with_force_new()
                    .with_description("Environment the drain belongs to"),
            )
            .with_attribute("handle", Attribute::required_string().with_force_new())
            .with_attribute(
                "drain_type",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Destination kind, e.g. influxdb or datadog"),
            )
            .with_attribute(
                "drain_configuration",
                Attribute::new(
                    AttributeType::map(AttributeType::String),
                    AttributeFlags::optional(),
                )
                .with_force_new()
                .sensitive()
                .with_description("Destination-specific settings such as API keys"),
            )
            .with_attribute("metric_drain_id", Attribute::computed_int64())
    }

    async fn create_remote(
        &self,
        aptible: &AptibleClient,
        config: &ResourceState,
    ) -> Result<RemoteRecord, ProviderError> {
        let env_id = parent_id(config, "env_id")?;
        let body = request_body(
            config,
            &[
                ("handle", "handle"),
                ("drain_type", "drain_type"),
                ("drain_configuration", "drain_configuration"),
            ],
        );
        let record = aptible
            .post(&format!("accounts/{}/metric_drains", env_id), &body)
            .await?;
        record_from(&record)
    }

    async fn read_remote(
        &self,
        aptible: &AptibleClient,
        id: i64,
    ) -> Result<RemoteRecord, ProviderError> {
        let record = aptible.get(&format!("metric_drains/{}", id)).await?;
        record_from(&record)
    }

    async fn update_remote(
        &self,
        _aptible: &AptibleClient,
        _id: i64,
        _changes: &Map<String, Value>,
    ) -> Result<(), ProviderError> {
        // No mutable attributes; the driver has nothing to send here.
        Ok(())
    }

    async fn delete_remote(&self, aptible: &AptibleClient, id: i64) -> Result<(), ProviderError> {
        aptible.delete(&format!("metric_drains/{}", id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_attribute_is_mutable() {
        let schema = MetricDrainResource.schema();
        assert!(schema.mutable_attribute_names().is_empty());
        assert!(schema.attributes["drain_configuration"].flags.sensitive);
    }

    #[test]
    fn record_mapping() {
        let record = record_from(&json!({"id": 60, "handle": "datadog"})).unwrap();
        assert_eq!(record.attributes.get("metric_drain_id"), Some(&json!(60)));
    }
}
