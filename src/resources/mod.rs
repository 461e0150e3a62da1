//! Resource handlers for the Aptible platform.
//!
//! One module per managed kind. Each handler declares its schema and
//! translates between local attribute names and the API's request/response
//! shapes; lifecycle control flow lives in [`crate::handler`].

pub mod app;
pub mod backup_retention_policy;
pub mod database;
pub mod database_replica;
pub mod endpoint;
pub mod environment;
pub mod log_drain;
pub mod metric_drain;

pub use app::AppResource;
pub use backup_retention_policy::BackupRetentionPolicyResource;
pub use database::DatabaseResource;
pub use database_replica::DatabaseReplicaResource;
pub use endpoint::EndpointResource;
pub use environment::EnvironmentResource;
pub use log_drain::LogDrainResource;
pub use metric_drain::MetricDrainResource;

use serde_json::{Map, Value};

use crate::error::ProviderError;
use crate::state::ResourceState;

/// Build a JSON request body from the named attributes, skipping absent ones.
pub(crate) fn request_body(config: &ResourceState, fields: &[(&str, &str)]) -> Value {
    let mut body = Map::new();
    for (local, wire) in fields {
        if let Some(value) = config.get(local) {
            body.insert((*wire).to_string(), value.clone());
        }
    }
    Value::Object(body)
}

/// A required integer parent id from configuration.
///
/// Validation runs before any remote call, so absence here means the schema
/// and the handler disagree; surface it as a validation failure either way.
pub(crate) fn parent_id(config: &ResourceState, name: &str) -> Result<i64, ProviderError> {
    config
        .get_i64(name)
        .ok_or_else(|| ProviderError::Validation(format!("missing required attribute '{}'", name)))
}

/// The numeric id of an API response record.
pub(crate) fn response_id(record: &Value, kind: &str) -> Result<i64, ProviderError> {
    crate::client::record_id(record).ok_or_else(|| {
        ProviderError::Validation(format!("{} response carried no record id", kind))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_skips_absent_fields() {
        let config = ResourceState::from_value(json!({
            "handle": "demo",
            "env_id": 5,
            "missing": null
        }))
        .unwrap();

        let body = request_body(
            &config,
            &[("handle", "handle"), ("missing", "missing"), ("env_id", "account_id")],
        );

        assert_eq!(body, json!({"handle": "demo", "account_id": 5}));
    }

    #[test]
    fn parent_id_requires_presence() {
        let config = ResourceState::from_value(json!({"env_id": 5})).unwrap();
        assert_eq!(parent_id(&config, "env_id").unwrap(), 5);
        assert!(parent_id(&config, "stack_id").is_err());
    }

    #[test]
    fn response_id_requires_numeric_id() {
        assert_eq!(response_id(&json!({"id": 9}), "aptible_app").unwrap(), 9);
        assert!(response_id(&json!({}), "aptible_app").is_err());
    }
}
