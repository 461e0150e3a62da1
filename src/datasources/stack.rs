//! The `aptible_stack` data source: look a stack up by name.

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{self, AptibleClient};
use crate::datasource::DataSourceHandler;
use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};
use crate::state::ResourceState;

pub struct StackDataSource;

/// The trailing path segment of a link href, kept as a string.
///
/// Organization hrefs end in a UUID, so this cannot go through the numeric
/// link-id parser.
fn link_tail(record: &Value, rel: &str) -> Option<String> {
    record
        .get("_links")
        .and_then(|links| links.get(rel))
        .and_then(|link| link.get("href"))
        .and_then(Value::as_str)
        .and_then(|href| href.trim_end_matches('/').rsplit('/').next())
        .filter(|tail| !tail.is_empty())
        .map(str::to_string)
}

fn state_from(record: &Value) -> ResourceState {
    let mut state = ResourceState::new();
    if let Some(id) = client::record_id(record) {
        state.set_id(id);
        state.set("stack_id", Value::from(id));
    }
    state.set_if_present("name", record.get("name").cloned());
    if let Some(org_id) = link_tail(record, "organization") {
        state.set("org_id", Value::from(org_id));
    }
    state
}

#[async_trait]
impl DataSourceHandler for StackDataSource {
    fn type_name(&self) -> &'static str {
        "aptible_stack"
    }

    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "name",
                Attribute::required_string().with_description("Stack name to match"),
            )
            .with_attribute("stack_id", Attribute::computed_int64())
            .with_attribute("org_id", Attribute::computed_string())
    }

    async fn read(
        &self,
        aptible: &AptibleClient,
        config: &ResourceState,
    ) -> Result<ResourceState, ProviderError> {
        let name = config.get_str("name").ok_or_else(|| {
            ProviderError::Validation("missing required attribute 'name'".to_string())
        })?;

        let page = aptible.get("stacks").await?;
        let matched = client::embedded(&page, "stacks")
            .iter()
            .find(|stack| stack.get("name").and_then(Value::as_str) == Some(name));

        match matched {
            Some(record) => Ok(state_from(record)),
            None => Err(ProviderError::NotFound(format!(
                "no stack with name {:?}",
                name
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
            "id": 3,
            "name": "shared-us-west-1",
            "_links": {
                "organization": {
                    "href": "https://auth.aptible.com/organizations/1c2b3a40-aaaa-bbbb-cccc-0123456789ab"
                }
            }
        }));

        assert_eq!(state.get_i64("stack_id"), Some(3));
        assert_eq!(state.get_str("name"), Some("shared-us-west-1"));
        assert_eq!(
            state.get_str("org_id"),
            Some("1c2b3a40-aaaa-bbbb-cccc-0123456789ab")
        );
    }

    #[test]
    fn shared_stack_has_no_organization() {
        let state = state_from(&json!({"id": 3, "name": "shared-us-west-1"}));
        assert_eq!(state.get("org_id"), None);
    }
}
