//! The `aptible_backup_retention_policy` resource.
//!
//! One policy per environment. Every retention knob is mutable in place; the
//! policy keeps its id across updates.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::client::{self, AptibleClient};
use crate::error::ProviderError;
use crate::handler::{RemoteRecord, ResourceHandler};
use crate::schema::{Attribute, Schema};
use crate::state::ResourceState;

use super::{parent_id, request_body, response_id};

pub struct BackupRetentionPolicyResource;

const TYPE_NAME: &str = "aptible_backup_retention_policy";

const KNOBS: [&str; 5] = ["daily", "monthly", "yearly", "make_copy", "keep_final"];

fn record_from(record: &Value) -> Result<RemoteRecord, ProviderError> {
    let id = response_id(record, TYPE_NAME)?;
    let mut out = RemoteRecord::new(id).with_attribute("policy_id", Value::from(id));
    for knob in KNOBS {
        out = out.with_attribute(knob, record.get(knob).cloned().unwrap_or(Value::Null));
    }
    if let Some(env_id) = client::link_id(record, "account") {
        out = out.with_attribute("env_id", Value::from(env_id));
    }
    Ok(out)
}

#[async_trait]
impl ResourceHandler for BackupRetentionPolicyResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "env_id",
                Attribute::required_int64()
                    .with_force_new()
                    .with_description("Environment the policy applies to"),
            )
            .with_attribute(
                "daily",
                Attribute::optional_int64().with_description("Daily backups retained"),
            )
            .with_attribute(
                "monthly",
                Attribute::optional_int64().with_description("Monthly backups retained"),
            )
            .with_attribute(
                "yearly",
                Attribute::optional_int64().with_description("Yearly backups retained"),
            )
            .with_attribute(
                "make_copy",
                Attribute::optional_bool().with_description("Copy backups across regions"),
            )
            .with_attribute(
                "keep_final",
                Attribute::optional_bool()
                    .with_description("Keep a final backup when a database is deprovisioned"),
            )
            .with_attribute("policy_id", Attribute::computed_int64())
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
                ("daily", "daily"),
                ("monthly", "monthly"),
                ("yearly", "yearly"),
                ("make_copy", "make_copy"),
                ("keep_final", "keep_final"),
            ],
        );
        let record = aptible
            .post(
                &format!("accounts/{}/backup_retention_policies", env_id),
                &body,
            )
            .await?;
        record_from(&record)
    }

    async fn read_remote(
        &self,
        aptible: &AptibleClient,
        id: i64,
    ) -> Result<RemoteRecord, ProviderError> {
        let record = aptible
            .get(&format!("backup_retention_policies/{}", id))
            .await?;
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
                &format!("backup_retention_policies/{}", id),
                &Value::Object(changes.clone()),
            )
            .await?;
        Ok(())
    }

    async fn delete_remote(&self, aptible: &AptibleClient, id: i64) -> Result<(), ProviderError> {
        aptible
            .delete(&format!("backup_retention_policies/{}", id))
            .await
    }
}
