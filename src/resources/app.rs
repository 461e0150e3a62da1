//! The `aptible_app` resource.
//!
//! Apps are created under an environment and carry an optional configuration
//! map. Configuration is not a field on the app record: it is applied through
//! a `configure` operation after the app exists, and the platform keeps it on
//! the current release rather than echoing it back on reads.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::client::{self, AptibleClient};
use crate::error::ProviderError;
use crate::handler::{RemoteRecord, ResourceHandler};
use crate::schema::{Attribute, AttributeFlags, AttributeType, Schema};
use crate::state::ResourceState;

use super::{parent_id, request_body, response_id};

pub struct AppResource;

const TYPE_NAME: &str = "aptible_app";

fn record_from(record: &Value) -> Result<RemoteRecord, ProviderError> {
    let id = response_id(record, TYPE_NAME)?;
    let mut out = RemoteRecord::new(id);
    out.deleted = client::is_deprovisioned(record);
    out = out
        .with_attribute("app_id", Value::from(id))
        .with_attribute("handle", record.get("handle").cloned().unwrap_or(Value::Null))
        .with_attribute(
            "git_repo",
            record.get("git_repo").cloned().unwrap_or(Value::Null),
        );
    Ok(out)
}

async fn apply_configuration(
    aptible: &AptibleClient,
    id: i64,
    env: &Value,
) -> Result<(), ProviderError> {
    let body = json!({"type": "configure", "env": env});
    aptible
        .post(&format!("apps/{}/operations", id), &body)
        .await?;
    Ok(())
}

#[async_trait]
impl ResourceHandler for AppResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "env_id",
                Attribute::required_int64()
                    .with_force_new()
                    .with_description("Environment the app belongs to"),
            )
            .with_attribute(
                "handle",
                Attribute::required_string().with_description("App handle"),
            )
            .with_attribute(
                "config",
                Attribute::new(
                    AttributeType::map(AttributeType::String),
                    AttributeFlags::optional(),
                )
                .with_description("Configuration applied to the app's environment"),
            )
            .with_attribute("app_id", Attribute::computed_int64())
            .with_attribute("git_repo", Attribute::computed_string())
    }

    async fn create_remote(
        &self,
        aptible: &AptibleClient,
        config: &ResourceState,
    ) -> Result<RemoteRecord, ProviderError> {
        let env_id = parent_id(config, "env_id")?;
        let body = request_body(config, &[("handle", "handle")]);
        let record = aptible
            .post(&format!("accounts/{}/apps", env_id), &body)
            .await?;
        record_from(&record)
    }

    // Configuration is applied once the app exists and its id is recorded;
    // a failing configure leaves a tracked, unconfigured app rather than an
    // orphan that a retry would try to recreate.
    async fn finish_create(
        &self,
        aptible: &AptibleClient,
        id: i64,
        config: &ResourceState,
    ) -> Result<(), ProviderError> {
        if let Some(env) = config.get("config") {
            apply_configuration(aptible, id, env).await?;
        }
        Ok(())
    }

    async fn read_remote(
        &self,
        aptible: &AptibleClient,
        id: i64,
    ) -> Result<RemoteRecord, ProviderError> {
        let record = aptible.get(&format!("apps/{}", id)).await?;
        record_from(&record)
    }

    async fn update_remote(
        &self,
        aptible: &AptibleClient,
        id: i64,
        changes: &Map<String, Value>,
    ) -> Result<(), ProviderError> {
        if let Some(handle) = changes.get("handle") {
            aptible
                .put(&format!("apps/{}", id), &json!({"handle": handle}))
                .await?;
        }

        if let Some(env) = changes.get("config") {
            apply_configuration(aptible, id, env).await?;
        }

        Ok(())
    }

    async fn delete_remote(&self, aptible: &AptibleClient, id: i64) -> Result<(), ProviderError> {
        aptible.delete(&format!("apps/{}", id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn env_id_forces_replacement() {
        let schema = AppResource.schema();
        assert_eq!(schema.mutable_attribute_names(), vec!["config", "handle"]);
        assert!(!schema.overwritable_on_read("env_id"));
        assert!(schema.overwritable_on_read("git_repo"));
    }

    #[test]
    fn record_mapping() {
        let record = record_from(&json!({
            "id": 17,
            "handle": "demo",
            "git_repo": "git@beta.aptible.com:demo.git",
            "status": "provisioned",
            "_links": {"account": {"href": "https://api.aptible.com/accounts/5"}}
        }))
        .unwrap();

        assert_eq!(record.id, 17);
        assert!(!record.deleted);
        assert_eq!(record.attributes.get("app_id"), Some(&json!(17)));
        assert_eq!(
            record.attributes.get("git_repo"),
            Some(&json!("git@beta.aptible.com:demo.git"))
        );
    }

    #[test]
    fn deprovisioned_app_is_a_tombstone() {
        let record = record_from(&json!({
            "id": 17,
            "handle": "demo",
            "status": "deprovisioned"
        }))
        .unwrap();
        assert!(record.deleted);
    }

    #[test]
    fn create_response_without_git_repo_omits_it() {
        let record = record_from(&json!({"id": 17, "handle": "demo"})).unwrap();
        assert!(!record.attributes.contains_key("git_repo"));
    }
}
