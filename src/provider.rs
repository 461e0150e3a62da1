//! The provider registry.
//!
//! Maps resource and data source type names to their handlers and owns the
//! single shared [`AptibleClient`]. The client slot is a write-once cell set
//! at configure time; a missing or invalid credential is fatal there, before
//! any lifecycle call runs. Dispatch methods validate the type name, resolve
//! the handler, and delegate to the generic drivers.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde_json::Value;
use tracing::{debug, info};

use crate::client::{AptibleClient, ProviderConfig};
use crate::datasource::{self, DataSourceHandler};
use crate::datasources::{BackupRetentionPolicyDataSource, EnvironmentDataSource, StackDataSource};
use crate::error::ProviderError;
use crate::handler::{self, ResourceHandler};
use crate::resources::{
    AppResource, BackupRetentionPolicyResource, DatabaseReplicaResource, DatabaseResource,
    EndpointResource, EnvironmentResource, LogDrainResource, MetricDrainResource,
};
use crate::schema::{Attribute, Diagnostic, ProviderSchema, Schema};
use crate::state::ResourceState;
use crate::validation::validate;

/// Schema for the provider configuration block.
pub fn provider_config_schema() -> Schema {
    Schema::v0()
        .with_attribute(
            "api_root_url",
            Attribute::optional_string().with_description("Override the API root URL"),
        )
        .with_attribute(
            "auth_root_url",
            Attribute::optional_string().with_description("Override the auth root URL"),
        )
        .with_attribute(
            "access_token",
            Attribute::optional_string()
                .sensitive()
                .with_description("Bearer token; falls back to APTIBLE_ACCESS_TOKEN"),
        )
}

/// Registry of resource and data source handlers plus the shared client.
#[derive(Default)]
pub struct ProviderRegistry {
    resources: HashMap<&'static str, Box<dyn ResourceHandler>>,
    data_sources: HashMap<&'static str, Box<dyn DataSourceHandler>>,
    client: OnceLock<Arc<AptibleClient>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource handler under its own type name.
    pub fn with_resource(mut self, handler: impl ResourceHandler + 'static) -> Self {
        self.resources.insert(handler.type_name(), Box::new(handler));
        self
    }

    /// Register a data source handler under its own type name.
    pub fn with_data_source(mut self, handler: impl DataSourceHandler + 'static) -> Self {
        self.data_sources
            .insert(handler.type_name(), Box::new(handler));
        self
    }

    /// Resolve provider configuration and construct the shared client.
    ///
    /// Runs once per provider process; a second configure call and a missing
    /// access token are both fatal configuration errors.
    pub fn configure(&self, config: &Value) -> Result<(), ProviderError> {
        let resolved = ProviderConfig::resolve(config)?;
        info!(api_root = %resolved.api_root, "provider configured");

        self.client
            .set(Arc::new(AptibleClient::new(resolved)))
            .map_err(|_| {
                ProviderError::Configuration("provider is already configured".to_string())
            })
    }

    fn client(&self) -> Result<&AptibleClient, ProviderError> {
        self.client
            .get()
            .map(Arc::as_ref)
            .ok_or_else(|| ProviderError::Configuration("provider is not configured".to_string()))
    }

    fn resource(&self, type_name: &str) -> Result<&dyn ResourceHandler, ProviderError> {
        self.resources
            .get(type_name)
            .map(Box::as_ref)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    fn data_source(&self, type_name: &str) -> Result<&dyn DataSourceHandler, ProviderError> {
        self.data_sources
            .get(type_name)
            .map(Box::as_ref)
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    /// The full provider schema: configuration block plus every registered
    /// resource and data source.
    pub fn schema(&self) -> ProviderSchema {
        let mut schema = ProviderSchema::new().with_provider_config(provider_config_schema());
        for (name, handler) in &self.resources {
            schema = schema.with_resource(*name, handler.schema());
        }
        for (name, handler) in &self.data_sources {
            schema = schema.with_data_source(*name, handler.schema());
        }
        schema
    }

    /// Registered resource type names, sorted.
    pub fn resource_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.resources.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Registered data source type names, sorted.
    pub fn data_source_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.data_sources.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Validate a resource configuration against its declared schema.
    pub fn validate_resource_config(
        &self,
        type_name: &str,
        config: &Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let handler = self.resource(type_name)?;
        debug!(resource_type = type_name, "validating configuration");
        Ok(validate(&handler.schema(), config))
    }

    /// Create a resource instance.
    pub async fn create_resource(
        &self,
        type_name: &str,
        state: &mut ResourceState,
    ) -> Result<(), ProviderError> {
        let handler = self.resource(type_name)?;
        handler::create(handler, self.client()?, state).await
    }

    /// Refresh a resource instance from remote state.
    pub async fn read_resource(
        &self,
        type_name: &str,
        state: &mut ResourceState,
    ) -> Result<(), ProviderError> {
        let handler = self.resource(type_name)?;
        handler::read(handler, self.client()?, state).await
    }

    /// Update a resource instance in place.
    pub async fn update_resource(
        &self,
        type_name: &str,
        prior: &ResourceState,
        state: &mut ResourceState,
    ) -> Result<(), ProviderError> {
        let handler = self.resource(type_name)?;
        handler::update(handler, self.client()?, prior, state).await
    }

    /// Delete a resource instance.
    pub async fn delete_resource(
        &self,
        type_name: &str,
        state: &mut ResourceState,
    ) -> Result<(), ProviderError> {
        let handler = self.resource(type_name)?;
        handler::delete(handler, self.client()?, state).await
    }

    /// Import an existing instance by an external identifier string.
    pub async fn import_resource(
        &self,
        type_name: &str,
        external_id: &str,
    ) -> Result<ResourceState, ProviderError> {
        let handler = self.resource(type_name)?;
        info!(resource_type = type_name, external_id, "importing resource");
        handler::import(handler, self.client()?, external_id).await
    }

    /// Resolve a data source lookup.
    pub async fn read_data_source(
        &self,
        type_name: &str,
        config: &ResourceState,
    ) -> Result<ResourceState, ProviderError> {
        let handler = self.data_source(type_name)?;
        datasource::read(handler, self.client()?, config).await
    }
}

/// The registry carrying every Aptible resource and data source.
pub fn default_registry() -> ProviderRegistry {
    ProviderRegistry::new()
        .with_resource(EnvironmentResource)
        .with_resource(AppResource)
        .with_resource(DatabaseResource)
        .with_resource(DatabaseReplicaResource)
        .with_resource(EndpointResource)
        .with_resource(LogDrainResource)
        .with_resource(MetricDrainResource)
        .with_resource(BackupRetentionPolicyResource)
        .with_data_source(EnvironmentDataSource)
        .with_data_source(StackDataSource)
        .with_data_source(BackupRetentionPolicyDataSource)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_error_contains, assert_no_errors, MockDataSource, MockResource};
    use serde_json::json;

    fn configured(registry: ProviderRegistry) -> ProviderRegistry {
        registry
            .configure(&json!({
                "api_root_url": "https://api.aptible.test",
                "access_token": "test-token"
            }))
            .unwrap();
        registry
    }

    #[test]
    fn default_registry_carries_every_kind() {
        let registry = default_registry();

        assert_eq!(
            registry.resource_names(),
            vec![
                "aptible_app",
                "aptible_backup_retention_policy",
                "aptible_database",
                "aptible_database_replica",
                "aptible_endpoint",
                "aptible_environment",
                "aptible_log_drain",
                "aptible_metric_drain",
            ]
        );
        assert_eq!(
            registry.data_source_names(),
            vec![
                "aptible_backup_retention_policy",
                "aptible_environment",
                "aptible_stack",
            ]
        );
    }

    #[test]
    fn schema_covers_provider_and_handlers() {
        let schema = default_registry().schema();

        assert!(schema.provider.attributes["access_token"].flags.sensitive);
        assert_eq!(schema.resources.len(), 8);
        assert_eq!(schema.data_sources.len(), 3);
        assert!(schema.resources["aptible_app"].attributes.contains_key("git_repo"));
    }

    #[test]
    fn configure_twice_is_rejected() {
        let registry = configured(ProviderRegistry::new());
        let err = registry
            .configure(&json!({"access_token": "another"}))
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn dispatch_requires_configuration() {
        let registry = ProviderRegistry::new().with_resource(MockResource::app_like());

        let mut state =
            ResourceState::from_value(json!({"env_id": 5, "handle": "demo"})).unwrap();
        let err = registry
            .create_resource("mock_app", &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[tokio::test]
    async fn unknown_type_name_is_rejected() {
        let registry = configured(ProviderRegistry::new());

        let mut state = ResourceState::new();
        let err = registry
            .create_resource("aptible_widget", &mut state)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));

        let err = registry
            .read_data_source("aptible_widget", &ResourceState::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::UnknownResource(_)));
    }

    #[tokio::test]
    async fn full_lifecycle_through_the_registry() {
        let registry = configured(ProviderRegistry::new().with_resource(MockResource::app_like()));

        let mut state =
            ResourceState::from_value(json!({"env_id": 5, "handle": "demo"})).unwrap();
        registry.create_resource("mock_app", &mut state).await.unwrap();
        assert!(state.has_id());
        assert_eq!(
            state.get_str("git_repo"),
            Some("git@beta.aptible.com:demo.git")
        );
        let id = state.id().unwrap().unwrap();

        let prior = state.clone();
        let mut next = state.clone();
        next.set("handle", json!("demo-renamed"));
        registry
            .update_resource("mock_app", &prior, &mut next)
            .await
            .unwrap();
        assert_eq!(next.get_str("handle"), Some("demo-renamed"));

        let imported = registry
            .import_resource("mock_app", &id.to_string())
            .await
            .unwrap();
        assert_eq!(imported.id().unwrap(), Some(id));

        registry.delete_resource("mock_app", &mut next).await.unwrap();
        assert!(!next.has_id());
    }

    #[tokio::test]
    async fn data_source_miss_is_terminal() {
        let source = MockDataSource::empty(
            "mock_policy",
            Schema::v0().with_attribute("env_id", Attribute::required_int64()),
            "environment 9999 does not have a backup retention policy",
        );
        let registry = configured(ProviderRegistry::new().with_data_source(source));

        let config = ResourceState::from_value(json!({"env_id": 9999})).unwrap();
        let err = registry
            .read_data_source("mock_policy", &config)
            .await
            .unwrap_err();

        assert!(err
            .to_string()
            .contains("environment 9999 does not have a backup retention policy"));
    }

    #[test]
    fn validation_runs_against_the_declared_schema() {
        let registry = ProviderRegistry::new().with_resource(MockResource::app_like());

        let diagnostics = registry
            .validate_resource_config("mock_app", &json!({"env_id": 5, "handle": "demo"}))
            .unwrap();
        assert_no_errors(&diagnostics);

        let diagnostics = registry
            .validate_resource_config("mock_app", &json!({"env_id": "five"}))
            .unwrap();
        assert_error_contains(&diagnostics, "handle");
        assert_error_contains(&diagnostics, "env_id");
    }
}
