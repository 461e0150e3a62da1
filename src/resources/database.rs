//! The `aptible_database` resource.
//!
//! Handle and engine type are fixed at creation; container and disk sizes may
//! grow in place. Connection URLs come back in the record's credential
//! envelope and are sensitive.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::client::{self, AptibleClient};
use crate::error::ProviderError;
use crate::handler::{RemoteRecord, ResourceHandler};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::state::ResourceState;

use super::{parent_id, request_body, response_id};

pub struct DatabaseResource;

const TYPE_NAME: &str = "aptible_database";

pub(crate) fn connection_urls(record: &Value) -> Vec<Value> {
    client::embedded(record, "database_credentials")
        .iter()
        .filter_map(|cred| cred.get("connection_url"))
        .filter(|url| !url.is_null())
        .cloned()
        .collect()
}

pub(crate) fn disk_size(record: &Value) -> Option<Value> {
    record
        .get("_embedded")
        .and_then(|e| e.get("disk"))
        .and_then(|disk| disk.get("size"))
        .filter(|size| !size.is_null())
        .cloned()
}

fn record_from(record: &Value) -> Result<RemoteRecord, ProviderError> {
    let id = response_id(record, TYPE_NAME)?;
    let mut out = RemoteRecord::new(id);
    out.deleted = client::is_deprovisioned(record);
    out = out
        .with_attribute("database_id", Value::from(id))
        .with_attribute("handle", record.get("handle").cloned().unwrap_or(Value::Null))
        .with_attribute(
            "default_connection_url",
            record.get("connection_url").cloned().unwrap_or(Value::Null),
        )
        .with_attribute("connection_urls", Value::Array(connection_urls(record)));
    if let Some(size) = disk_size(record) {
        out = out.with_attribute("disk_size", size);
    }
    Ok(out)
}

#[async_trait]
impl ResourceHandler for DatabaseResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "env_id",
                Attribute::required_int64()
                    .with_force_new()
                    .with_description("Environment the database belongs to"),
            )
            .with_attribute(
                "handle",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Database handle"),
            )
            .with_attribute(
                "database_type",
                Attribute::optional_string()
                    .with_force_new()
                    .with_default(Value::from("postgresql"))
                    .with_description("Database engine"),
            )
            .with_attribute(
                "container_size",
                Attribute::optional_int64().with_description("Container memory in MB"),
            )
            .with_attribute(
                "disk_size",
                Attribute::optional_int64().with_description("Disk size in GB"),
            )
            .with_attribute("database_id", Attribute::computed_int64())
            .with_attribute(
                "default_connection_url",
                Attribute::computed_string().sensitive(),
            )
            .with_attribute(
                "connection_urls",
                Attribute::new(
                    AttributeType::list(AttributeType::String),
                    AttributeFlags::computed(),
                )
                .sensitive(),
            )
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
                ("database_type", "type"),
                ("container_size", "initial_container_size"),
                ("disk_size", "initial_disk_size"),
            ],
        );
        let record = aptible
            .post(&format!("accounts/{}/databases", env_id), &body)
            .await?;
        record_from(&record)
    }

    async fn read_remote(
        &self,
        aptible: &AptibleClient,
        id: i64,
    ) -> Result<RemoteRecord, ProviderError> {
        let record = aptible.get(&format!("databases/{}", id)).await?;
        record_from(&record)
    }

    async fn update_remote(
        &self,
        aptible: &AptibleClient,
        id: i64,
        changes: &Map<String, Value>,
    ) -> Result<(), ProviderError> {
        aptible
            .put(
                &format!("databases/{}", id),
                &Value::Object(changes.clone()),
            )
            .await?;
        Ok(())
    }

    async fn delete_remote(&self, aptible: &AptibleClient, id: i64) -> Result<(), ProviderError> {
        aptible.delete(&format!("databases/{}", id)).await
    }
}
