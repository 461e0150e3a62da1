//! The `aptible_environment` data source: look an environment up by handle.

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{self, AptibleClient};
use crate::datasource::DataSourceHandler;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceState;

pub struct EnvironmentDataSource;

fn state_from(record: &Value) -> ResourceState {
    let mut state = ResourceState::new();
    if let Some(id) = client::record_id(record) {
        state.set_id(id);
        state.set("env_id", Value::from(id));
    }
    state.set_if_present("handle", record.get("handle").cloned());
    if let Some(stack_id) = client::link_id(record, "stack") {
        state.set("stack_id", Value::from(stack_id));
    }
    state
}

#[async_trait]
impl DataSourceHandler for EnvironmentDataSource {
    fn type_name(&self) -> &'static str {
        "aptible_environment"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "handle",
                Attribute::required_string().with_description("Environment handle to match"),
            )
            .with_attribute("env_id", Attribute::computed_int64())
            .with_attribute("stack_id", Attribute::computed_int64())
    }

    async fn read(
        &self,
        aptible: &AptibleClient,
        config: &ResourceState,
    ) -> Result<ResourceState, ProviderError> {
        let handle = config.get_str("handle").ok_or_else(|| {
            ProviderError::Validation("missing required attribute 'handle'".to_string())
        })?;

        let page = aptible.get("accounts").await?;
        let matched = client::embedded(&page, "accounts")
            .iter()
            .find(|account| account.get("handle").and_then(Value::as_str) == Some(handle));

        match matched {
            Some(record) => Ok(state_from(record)),
            None => Err(ProviderError::NotFound(format!(
                "no environment with handle {:?}",
                handle
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn state_mapping() {
        let state = state_from(&json!({
            "id": 5,
            "handle": "production",
            "_links": {"stack": {"href": "https://api.aptible.com/stacks/3"}}
        }));

        assert_eq!(state.id().unwrap(), Some(5));
        assert_eq!(state.get_i64("env_id"), Some(5));
        assert_eq!(state.get_str("handle"), Some("production"));
        assert_eq!(state.get_i64("stack_id"), Some(3));
    }
}
