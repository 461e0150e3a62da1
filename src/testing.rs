//! Testing utilities for provider code.
//!
//! [`MockResource`] is an in-memory [`ResourceHandler`] backed by a
//! `HashMap`, with call counters and failure switches, so lifecycle control
//! flow can be exercised without an API. [`test_client`] builds a client
//! that never sends anything (mock handlers ignore it).
//!
//! # Example
//!
//! ```ignore
//! use aptible_provider::testing::{test_client, MockResource};
//! use aptible_provider::{handler, state::ResourceState};
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn create_then_read() {
//!     let mock = MockResource::app_like();
//!     let client = test_client();
//!     let mut state =
//!         ResourceState::from_value(json!({"env_id": 5, "handle": "demo"})).unwrap();
//!     handler::create(&mock, &client, &mut state).await.unwrap();
//!     assert!(state.has_id());
//! }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};
use url::Url;

use crate::client::{AptibleClient, ProviderConfig};
use crate::datasource::DataSourceHandler;
use crate::error::{ApiFailure, ProviderError};
use crate::handler::{RemoteRecord, ResourceHandler};
use crate::schema::{Attribute, Diagnostic, DiagnosticSeverity, Schema};
use crate::state::ResourceState;

/// A client pointed at a test host. Mock handlers never send through it.
pub fn test_client() -> AptibleClient {
    AptibleClient::new(ProviderConfig {
        api_root: Url::parse("https://api.aptible.test/").unwrap(),
        auth_root: Url::parse("https://auth.aptible.test/").unwrap(),
        access_token: "test-token".to_string(),
    })
}

/// The canonical remote not-found failure.
pub fn not_found_failure(message: impl Into<String>) -> ProviderError {
    ProviderError::Api(ApiFailure {
        status: Some(404),
        code: Some("not_found".to_string()),
        message: Some(message.into()),
    })
}

type ComputeFn = dyn Fn(&ResourceState) -> Map<String, Value> + Send + Sync;

/// An in-memory resource handler.
pub struct MockResource {
    type_name: &'static str,
    schema: Schema,
    compute: Box<ComputeFn>,
    store: Mutex<HashMap<i64, RemoteRecord>>,
    next_id: AtomicI64,
    create_calls: AtomicUsize,
    read_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    last_changes: Mutex<Option<Map<String, Value>>>,
    fail_creates: std::sync::atomic::AtomicBool,
    fail_reads: std::sync::atomic::AtomicBool,
    fail_finishes: std::sync::atomic::AtomicBool,
    deletes_race_not_found: std::sync::atomic::AtomicBool,
}

impl MockResource {
    /// Create a mock with the given type name, schema, and a function that
    /// stamps server-computed attributes onto newly created records.
    pub fn new(
        type_name: &'static str,
        schema: Schema,
        compute: impl Fn(&ResourceState) -> Map<String, Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            type_name,
            schema,
            compute: Box::new(compute),
            store: Mutex::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            create_calls: AtomicUsize::new(0),
            read_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            last_changes: Mutex::new(None),
            fail_creates: std::sync::atomic::AtomicBool::new(false),
            fail_reads: std::sync::atomic::AtomicBool::new(false),
            fail_finishes: std::sync::atomic::AtomicBool::new(false),
            deletes_race_not_found: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// A mock shaped like the app resource: a force-new parent id, a mutable
    /// handle, and a server-computed `git_repo`.
    pub fn app_like() -> Self {
        let schema = Schema::v0()
            .with_attribute("env_id", Attribute::required_int64().with_force_new())
            .with_attribute("handle", Attribute::required_string())
            .with_attribute("git_repo", Attribute::computed_string());

        Self::new("mock_app", schema, |config| {
            let mut computed = Map::new();
            if let Some(handle) = config.get_str("handle") {
                computed.insert(
                    "git_repo".to_string(),
                    Value::String(format!("git@beta.aptible.com:{}.git", handle)),
                );
            }
            computed
        })
    }

    /// Flag the stored record as deleted (out-of-band deprovision).
    pub fn mark_deleted(&self, id: i64) {
        if let Some(record) = self.store.lock().unwrap().get_mut(&id) {
            record.deleted = true;
        }
    }

    /// Remove the stored record entirely (reads will 404).
    pub fn purge(&self, id: i64) {
        self.store.lock().unwrap().remove(&id);
    }

    /// Overwrite a stored attribute, simulating out-of-band change.
    pub fn set_remote_attribute(&self, id: i64, name: &str, value: Value) {
        if let Some(record) = self.store.lock().unwrap().get_mut(&id) {
            record.attributes.insert(name.to_string(), value);
        }
    }

    /// Make every subsequent create call fail.
    pub fn fail_creates(&self) {
        self.fail_creates.store(true, Ordering::SeqCst);
    }

    /// Make every subsequent read call fail with a non-404 error.
    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    /// Make the post-create follow-up step fail.
    pub fn fail_finishes(&self) {
        self.fail_finishes.store(true, Ordering::SeqCst);
    }

    /// Make delete calls come back not-found while the record still reads
    /// as active (a remote deletion racing the confirm read).
    pub fn race_deletes_not_found(&self) {
        self.deletes_race_not_found.store(true, Ordering::SeqCst);
    }

    /// Number of create calls issued.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of read calls issued.
    pub fn read_calls(&self) -> usize {
        self.read_calls.load(Ordering::SeqCst)
    }

    /// Number of update calls issued.
    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    /// Number of delete calls issued.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// The change set carried by the most recent update call.
    pub fn last_changes(&self) -> Option<Map<String, Value>> {
        self.last_changes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceHandler for MockResource {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    async fn create_remote(
        &self,
        _client: &AptibleClient,
        config: &ResourceState,
    ) -> Result<RemoteRecord, ProviderError> {
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(ProviderError::Api(ApiFailure {
                status: Some(422),
                code: Some("unprocessable_entity".to_string()),
                message: Some("create rejected".to_string()),
            }));
        }
        self.create_calls.fetch_add(1, Ordering::SeqCst);

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut record = RemoteRecord::new(id);
        for (name, value) in config.attributes() {
            if name != crate::state::ID_ATTRIBUTE {
                record.attributes.insert(name.clone(), value.clone());
            }
        }
        for (name, value) in (self.compute)(config) {
            record.attributes.insert(name, value);
        }

        self.store.lock().unwrap().insert(id, record.clone());
        Ok(record)
    }

    async fn finish_create(
        &self,
        _client: &AptibleClient,
        _id: i64,
        _config: &ResourceState,
    ) -> Result<(), ProviderError> {
        if self.fail_finishes.load(Ordering::SeqCst) {
            return Err(ProviderError::Api(ApiFailure {
                status: Some(500),
                code: Some("internal_server_error".to_string()),
                message: Some("follow-up step failed".to_string()),
            }));
        }
        Ok(())
    }

    async fn read_remote(
        &self,
        _client: &AptibleClient,
        id: i64,
    ) -> Result<RemoteRecord, ProviderError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ProviderError::Api(ApiFailure {
                status: Some(500),
                code: Some("internal_server_error".to_string()),
                message: Some("read failed".to_string()),
            }));
        }
        self.read_calls.fetch_add(1, Ordering::SeqCst);

        self.store
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found_failure(format!("{} {} not found", self.type_name, id)))
    }

    async fn update_remote(
        &self,
        _client: &AptibleClient,
        id: i64,
        changes: &Map<String, Value>,
    ) -> Result<(), ProviderError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_changes.lock().unwrap() = Some(changes.clone());

        let mut store = self.store.lock().unwrap();
        let record = store
            .get_mut(&id)
            .ok_or_else(|| not_found_failure(format!("{} {} not found", self.type_name, id)))?;
        for (name, value) in changes {
            record.attributes.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    async fn delete_remote(
        &self,
        _client: &AptibleClient,
        id: i64,
    ) -> Result<(), ProviderError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.deletes_race_not_found.load(Ordering::SeqCst) {
            self.store.lock().unwrap().remove(&id);
            return Err(not_found_failure(format!(
                "{} {} not found",
                self.type_name, id
            )));
        }
        self.store
            .lock()
            .unwrap()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found_failure(format!("{} {} not found", self.type_name, id)))
    }
}

/// An in-memory data source handler returning a fixed result.
pub struct MockDataSource {
    type_name: &'static str,
    schema: Schema,
    result: Option<ResourceState>,
    not_found_message: String,
}

impl MockDataSource {
    /// A data source that always resolves to `result`.
    pub fn resolving(type_name: &'static str, schema: Schema, result: ResourceState) -> Self {
        Self {
            type_name,
            schema,
            result: Some(result),
            not_found_message: String::new(),
        }
    }

    /// A data source whose lookup always comes back empty.
    pub fn empty(type_name: &'static str, schema: Schema, message: impl Into<String>) -> Self {
        Self {
            type_name,
            schema,
            result: None,
            not_found_message: message.into(),
        }
    }
}

#[async_trait]
impl DataSourceHandler for MockDataSource {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn schema(&self) -> Schema {
        self.schema.clone()
    }

    async fn read(
        &self,
        _client: &AptibleClient,
        _config: &ResourceState,
    ) -> Result<ResourceState, ProviderError> {
        match &self.result {
            Some(state) => Ok(state.clone()),
            None => Err(ProviderError::NotFound(self.not_found_message.clone())),
        }
    }
}

// =========================================================================
// Assertion helpers
// =========================================================================

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    let errors: Vec<_> = diagnostics
        .iter()
        .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
        .collect();

    assert!(
        errors.is_empty(),
        "Expected no errors, but got {} error(s): {:?}",
        errors.len(),
        errors.iter().map(|d| &d.summary).collect::<Vec<_>>()
    );
}

/// Assert that diagnostics contain at least one error.
///
/// # Panics
///
/// Panics if there are no error diagnostics.
pub fn assert_has_errors(diagnostics: &[Diagnostic]) {
    let has_errors = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error));

    assert!(has_errors, "Expected at least one error, but got none");
}

/// Assert that diagnostics contain an error with the given summary substring.
///
/// # Panics
///
/// Panics if no error diagnostic contains the given substring.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    let has_matching_error = diagnostics
        .iter()
        .any(|d| matches!(d.severity, DiagnosticSeverity::Error) && d.summary.contains(substring));

    assert!(
        has_matching_error,
        "Expected an error containing '{}', but no matching error found. Errors: {:?}",
        substring,
        diagnostics
            .iter()
            .filter(|d| matches!(d.severity, DiagnosticSeverity::Error))
            .map(|d| &d.summary)
            .collect::<Vec<_>>()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn mock_resource_round_trip() {
        let mock = MockResource::app_like();
        let client = test_client();

        let config = ResourceState::from_value(json!({"env_id": 5, "handle": "demo"})).unwrap();
        let created = mock.create_remote(&client, &config).await.unwrap();
        assert_eq!(created.attributes.get("handle"), Some(&json!("demo")));

        let fetched = mock.read_remote(&client, created.id).await.unwrap();
        assert_eq!(fetched, created);

        mock.delete_remote(&client, created.id).await.unwrap();
        let err = mock.read_remote(&client, created.id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn mock_data_source_variants() {
        let client = test_client();
        let config = ResourceState::new();

        let hit = MockDataSource::resolving(
            "mock_env",
            Schema::v0(),
            ResourceState::from_value(json!({"env_id": 5})).unwrap(),
        );
        let state = hit.read(&client, &config).await.unwrap();
        assert_eq!(state.get_i64("env_id"), Some(5));

        let miss = MockDataSource::empty("mock_env", Schema::v0(), "no environment");
        let err = miss.read(&client, &config).await.unwrap_err();
        assert!(matches!(err, ProviderError::NotFound(_)));
    }

    #[test]
    fn assert_helpers() {
        assert_no_errors(&[Diagnostic::warning("just a warning")]);
        assert_has_errors(&[Diagnostic::error("an error")]);
        assert_error_contains(&[Diagnostic::error("Invalid configuration value")], "Invalid");
    }

    #[test]
    #[should_panic(expected = "Expected no errors")]
    fn assert_no_errors_panics_on_error() {
        assert_no_errors(&[Diagnostic::error("boom")]);
    }
}
