//! The `aptible_backup_retention_policy` data source.
//!
//! Environments are created with a default policy, but one can be absent; an
//! empty policy list is a definitive not-found, never an empty success.

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{self, AptibleClient};
use crate::datasource::DataSourceHandler;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceState;

pub struct BackupRetentionPolicyDataSource;

fn state_from(env_id: i64, record: &Value) -> ResourceState {
    let mut state = ResourceState::new();
    if let Some(id) = client::record_id(record) {
        state.set_id(id);
        state.set("policy_id", Value::from(id));
    }
    state.set("env_id", Value::from(env_id));
    for knob in ["daily", "monthly", "yearly", "make_copy", "keep_final"] {
        state.set_if_present(knob, record.get(knob).cloned());
    }
    state
}

#[async_trait]
impl DataSourceHandler for BackupRetentionPolicyDataSource {
    fn type_name(&self) -> &'static str {
        "aptible_backup_retention_policy"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "env_id",
                Attribute::required_int64().with_description("Environment to look up"),
            )
            .with_attribute("policy_id", Attribute::computed_int64())
            .with_attribute("daily", Attribute::computed_int64())
            .with_attribute("monthly", Attribute::computed_int64())
            .with_attribute("yearly", Attribute::computed_int64())
            .with_attribute("make_copy", Attribute::computed_bool())
            .with_attribute("keep_final", Attribute::computed_bool())
    }

    async fn read(
        &self,
        aptible: &AptibleClient,
        config: &ResourceState,
    ) -> Result<ResourceState, ProviderError> {
        let env_id = config.get_i64("env_id").ok_or_else(|| {
            ProviderError::Validation("missing required attribute 'env_id'".to_string())
        })?;

        let page = aptible
            .get(&format!("accounts/{}/backup_retention_policies", env_id))
            .await?;
        let policies = client::embedded(&page, "backup_retention_policies");

        match policies.first() {
            Some(record) => Ok(state_from(env_id, record)),
            None => Err(ProviderError::NotFound(format!(
                "environment {} does not have a backup retention policy",
                env_id
            ))),
        }
    }
}
