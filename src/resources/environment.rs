//! The `aptible_environment` resource.
//!
//! Environments are `accounts` on the wire. The stack and organization are
//! fixed at creation; only the handle can change in place.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::client::{self, AptibleClient};
use crate::error::ProviderError;
use crate::handler::{RemoteRecord, ResourceHandler};
use crate::schema::{Attribute, Schema};
use crate::state::ResourceState;

use super::{request_body, response_id};

pub struct EnvironmentResource;

const TYPE_NAME: &str = "aptible_environment";

fn record_from(record: &Value) -> Result<RemoteRecord, ProviderError> {
    let id = response_id(record, TYPE_NAME)?;
    let mut out = RemoteRecord::new(id);
    out.deleted = client::is_deprovisioned(record);
    out = out
        .with_attribute("env_id", Value::from(id))
        .with_attribute("handle", record.get("handle").cloned().unwrap_or(Value::Null));
    Ok(out)
}

#[async_trait]
impl ResourceHandler for EnvironmentResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "handle",
                Attribute::required_string().with_description("Environment handle"),
            )
            .with_attribute(
                "stack_id",
                Attribute::optional_int64()
                    .with_force_new()
                    .with_description("Stack hosting the environment"),
            )
            .with_attribute(
                "org_id",
                Attribute::optional_string()
                    .with_force_new()
                    .with_description("Owning organization"),
            )
            .with_attribute("env_id", Attribute::computed_int64())
    }

    async fn create_remote(
        &self,
        aptible: &AptibleClient,
        config: &ResourceState,
    ) -> Result<RemoteRecord, ProviderError> {
        let body = request_body(
            config,
            &[
                ("handle", "handle"),
                ("stack_id", "stack_id"),
                ("org_id", "organization_id"),
            ],
        );
        let record = aptible.post("accounts", &body).await?;
        record_from(&record)
    }

    async fn read_remote(
        &self,
        aptible: &AptibleClient,
        id: i64,
    ) -> Result<RemoteRecord, ProviderError> {
        let record = aptible.get(&format!("accounts/{}", id)).await?;
        record_from(&record)
    }

    async fn update_remote(
        &self,
        aptible: &AptibleClient,
        id: i64,
        changes: &Map<String, Value>,
    ) -> Result<(), ProviderError> {
        aptible
            .put(&format!("accounts/{}", id), &Value::Object(changes.clone()))
            .await?;
        Ok(())
    }

    async fn delete_remote(&self, aptible: &AptibleClient, id: i64) -> Result<(), ProviderError> {
        aptible.delete(&format!("accounts/{}", id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn only_handle_is_mutable() {
        let schema = EnvironmentResource.schema();
        assert_eq!(schema.mutable_attribute_names(), vec!["handle"]);
        assert!(!schema.overwritable_on_read("stack_id"));
        assert!(schema.overwritable_on_read("env_id"));
    }

    #[test]
    fn record_mapping() {
        let record = record_from(&json!({
            "id": 5,
            "handle": "production",
            "type": "production"
        }))
        .unwrap();

        assert_eq!(record.id, 5);
        assert!(!record.deleted);
        assert_eq!(record.attributes.get("env_id"), Some(&json!(5)));
        assert_eq!(record.attributes.get("handle"), Some(&json!("production")));
    }

    #[test]
    fn record_without_id_is_rejected() {
        assert!(record_from(&json!({"handle": "production"})).is_err());
    }
}
