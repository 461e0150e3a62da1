//! The data source contract.
//!
//! Data sources are read-only lookups keyed by natural attributes (a handle,
//! a name) rather than by identifier. They hold no lifecycle: the driver
//! validates the query configuration, delegates to the handler's single
//! lookup call, and requires a populated result. A lookup that matches
//! nothing is an error, never an empty success.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::client::AptibleClient;
use crate::error::ProviderError;
use crate::schema::Schema;
use crate::state::ResourceState;
use crate::validation::validate_result;

/// The per-kind half of a data source: the declared schema and the lookup.
#[async_trait]
pub trait DataSourceHandler: Send + Sync {
    /// The data source type name, e.g. `aptible_environment`.
    fn type_name(&self) -> &'static str;

    /// The declared attribute schema.
    fn schema(&self) -> Schema;

    /// Resolve the query configuration to a fully populated state.
    ///
    /// Implementations return [`ProviderError::NotFound`] when the lookup
    /// matches nothing.
    async fn read(
        &self,
        client: &AptibleClient,
        config: &ResourceState,
    ) -> Result<ResourceState, ProviderError>;
}

/// Run a data source lookup: validate the query, then resolve it.
pub async fn read(
    handler: &dyn DataSourceHandler,
    client: &AptibleClient,
    config: &ResourceState,
) -> Result<ResourceState, ProviderError> {
    let schema = handler.schema();
    validate_result(&schema, &Value::Object(config.attributes().clone())).map_err(
        |diagnostics| {
            let summaries: Vec<String> = diagnostics.into_iter().map(|d| d.summary).collect();
            ProviderError::Validation(summaries.join("; "))
        },
    )?;

    debug!(data_source = handler.type_name(), "resolving data source");
    handler.read(client, config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Attribute;
    use crate::testing::{test_client, MockDataSource};
    use serde_json::json;

    fn handle_schema() -> Schema {
        Schema::v0()
            .with_attribute("handle", Attribute::required_string())
            .with_attribute("env_id", Attribute::computed_int64())
    }

    #[tokio::test]
    async fn read_resolves_populated_state() {
        let source = MockDataSource::resolving(
            "mock_env",
            handle_schema(),
            ResourceState::from_value(json!({"handle": "production", "env_id": 5})).unwrap(),
        );
        let client = test_client();

        let config = ResourceState::from_value(json!({"handle": "production"})).unwrap();
        let state = read(&source, &client, &config).await.unwrap();

        assert_eq!(state.get_i64("env_id"), Some(5));
    }

    #[tokio::test]
    async fn read_validates_query_before_lookup() {
        let source = MockDataSource::resolving(
            "mock_env",
            handle_schema(),
            ResourceState::new(),
        );
        let client = test_client();

        let config = ResourceState::new();
        let err = read(&source, &client, &config).await.unwrap_err();
        assert!(matches!(err, ProviderError::Validation(_)));
    }

    #[tokio::test]
    async fn empty_lookup_is_an_error() {
        let source = MockDataSource::empty("mock_env", handle_schema(), "no such environment");
        let client = test_client();

        let config = ResourceState::from_value(json!({"handle": "missing"})).unwrap();
        let err = read(&source, &client, &config).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }
}
