//! Declarative-infrastructure provider for the Aptible platform.
//!
//! Resource and data source schemas mapped onto CRUD calls against the
//! Aptible REST API: desired-state attribute maps in, HTTP calls out, API
//! responses reconciled back into per-instance local state.
//!
//! The crate is organized around four pieces:
//!
//! - [`error`]: the provider error taxonomy and the tolerant API error
//!   payload decoder.
//! - [`handler`]: the generic resource lifecycle driver
//!   (create/read/update/delete/import) over the [`ResourceHandler`] trait;
//!   per-kind implementations live in [`resources`].
//! - [`datasource`]: read-only lookups by natural key, implemented in
//!   [`datasources`].
//! - [`provider`]: the registry mapping type names to handlers and owning
//!   the shared authenticated client.
//!
//! # Example
//!
//! ```no_run
//! use aptible_provider::provider::default_registry;
//! use aptible_provider::state::ResourceState;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), aptible_provider::error::ProviderError> {
//! aptible_provider::logging::init_logging();
//!
//! let registry = default_registry();
//! registry.configure(&json!({}))?; // credentials from APTIBLE_ACCESS_TOKEN
//!
//! let mut app = ResourceState::from_value(json!({
//!     "env_id": 5,
//!     "handle": "demo"
//! }))?;
//! registry.create_resource("aptible_app", &mut app).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod datasource;
pub mod datasources;
pub mod error;
pub mod handler;
pub mod logging;
pub mod provider;
pub mod resources;
pub mod schema;
pub mod state;
pub mod testing;
pub mod validation;

pub use client::{AptibleClient, ProviderConfig};
pub use datasource::DataSourceHandler;
pub use error::{ApiFailure, ProviderError};
pub use handler::{RemoteRecord, ResourceHandler};
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use provider::{default_registry, ProviderRegistry};
pub use schema::{
    Attribute, AttributeFlags, AttributeType, Diagnostic, DiagnosticSeverity, ProviderSchema,
    Schema,
};
pub use state::ResourceState;
pub use validation::{is_valid, validate, validate_result};
