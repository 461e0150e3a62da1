//! The `aptible_database_replica` resource.
//!
//! Replicas are databases created from a primary via the replicate call. The
//! primary and the handle are fixed at creation; sizes may change in place.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::client::{self, AptibleClient};
use crate::error::ProviderError;
use crate::handler::{RemoteRecord, ResourceHandler};
use crate::schema::{Attribute, Schema};
use crate::state::ResourceState;

use super::{parent_id, request_body, response_id};

pub struct DatabaseReplicaResource;

const TYPE_NAME: &str = "aptible_database_replica";

fn record_from(record: &Value) -> Result<RemoteRecord, ProviderError> {
    let id = response_id(record, TYPE_NAME)?;
    let mut out = RemoteRecord::new(id);
    out.deleted = client::is_deprovisioned(record);
    out = out
        .with_attribute("replica_id", Value::from(id))
        .with_attribute(
            "default_connection_url",
            record.get("connection_url").cloned().unwrap_or(Value::Null),
        );
    if let Some(size) = super::database::disk_size(record) {
        out = out.with_attribute("disk_size", size);
    }
    Ok(out)
}

#[async_trait]
impl ResourceHandler for DatabaseReplicaResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "primary_database_id",
                Attribute::required_int64()
                    .with_force_new()
                    .with_description("Database to replicate from"),
            )
            .with_attribute(
                "handle",
                Attribute::required_string()
                    .with_force_new()
                    .with_description("Replica handle"),
            )
            .with_attribute(
                "container_size",
                Attribute::optional_int64().with_description("Container memory in MB"),
            )
            .with_attribute(
                "disk_size",
                Attribute::optional_int64().with_description("Disk size in GB"),
            )
            .with_attribute("replica_id", Attribute::computed_int64())
            .with_attribute(
                "default_connection_url",
                Attribute::computed_string().sensitive(),
            )
    }

    async fn create_remote(
        &self,
        aptible: &AptibleClient,
        config: &ResourceState,
    ) -> Result<RemoteRecord, ProviderError> {
        let primary = parent_id(config, "primary_database_id")?;
        let body = request_body(
            config,
            &[
                ("handle", "handle"),
                ("container_size", "initial_container_size"),
                ("disk_size", "initial_disk_size"),
            ],
        );
        let record = aptible
            .post(&format!("databases/{}/replicate", primary), &body)
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

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primary_and_handle_force_replacement() {
        let schema = DatabaseReplicaResource.schema();
        assert_eq!(
            schema.mutable_attribute_names(),
            vec!["container_size", "disk_size"]
        );
        assert!(!schema.overwritable_on_read("primary_database_id"));
        assert!(!schema.overwritable_on_read("handle"));
    }

    #[test]
    fn record_mapping() {
        let record = record_from(&json!({
            "id": 31,
            "handle": "main-db-replica",
            "connection_url": "postgresql://u:p@replica.example.com:5432/db",
            "_embedded": {"disk": {"size": 20}},
            "_links": {"initialize_from": {"href": "https://api.aptible.com/databases/30"}}
        }))
        .unwrap();

        assert_eq!(record.id, 31);
        assert_eq!(record.attributes.get("replica_id"), Some(&json!(31)));
        assert_eq!(record.attributes.get("disk_size"), Some(&json!(20)));
        assert_eq!(
            record.attributes.get("default_connection_url"),
            Some(&json!("postgresql://u:p@replica.example.com:5432/db"))
        );
    }
}
