//! The `aptible_log_drain` resource.
//!
//! Every attribute is fixed at creation; any change is a replacement, so
//! Update degenerates to a refresh and the remote update call is never
//! issued.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::client::{self, AptibleClient};
use crate::error::ProviderError;
use crate::handler::{RemoteRecord, ResourceHandler};
use crate::schema::{Attribute, Schema};
use crate::state::ResourceState;

use super::{parent_id, request_body, response_id};

pub struct LogDrainResource;

const TYPE_NAME: &str = "aptible_log_drain";

fn record_from(record: &Value) -> Result<RemoteRecord, ProviderError> {
    let id = response_id(record, TYPE_NAME)?;
    let mut out = RemoteRecord::new(id);
    out.deleted = client::is_deprovisioned(record);
    out = out.with_attribute("log_drain_id", Value::from(id));
    Ok(out)
}

#[async_trait]
impl ResourceHandler for LogDrainResource {
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
                    .with_description("Destination kind, e.g. syslog_tls_tcp or https_post"),
            )
            .with_attribute("drain_host", Attribute::optional_string().with_force_new())
            .with_attribute("drain_port", Attribute::optional_int64().with_force_new())
            .with_attribute(
                "url",
                Attribute::optional_string()
                    .with_force_new()
                    .with_description("Destination URL for HTTPS drains"),
            )
            .with_attribute("log_drain_id", Attribute::computed_int64())
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
                ("drain_host", "drain_host"),
                ("drain_port", "drain_port"),
                ("url", "url"),
            ],
        );
        let record = aptible
            .post(&format!("accounts/{}/log_drains", env_id), &body)
            .await?;
        record_from(&record)
    }

    async fn read_remote(
        &self,
        aptible: &AptibleClient,
        id: i64,
    ) -> Result<RemoteRecord, ProviderError> {
        let record = aptible.get(&format!("log_drains/{}", id)).await?;
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
        aptible.delete(&format!("log_drains/{}", id)).await
    }
}
