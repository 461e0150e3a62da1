//! The resource lifecycle contract.
//!
//! Every managed kind implements [`ResourceHandler`]: a declared schema plus
//! the four remote calls. All lifecycle control flow lives in the generic
//! driver functions here, so each kind describes *what* its remote calls look
//! like and the driver owns *when* they happen:
//!
//! - [`create`]: validate → remote create → set id → reconciling read
//! - [`read`]: refresh from remote, clearing the id on out-of-band deletion
//! - [`update`]: send only changed mutable attributes, then read
//! - [`delete`]: read-confirm first, locally terminal
//! - [`import`]: seed the id from an external string, then read
//!
//! Handlers never retry; every remote failure propagates to the host runtime
//! immediately.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::client::AptibleClient;
use crate::error::ProviderError;
use crate::schema::Schema;
use crate::state::ResourceState;
use crate::validation::validate_result;

/// A remote record as one flat view: identifier, deletion flag, attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteRecord {
    /// Platform-assigned identifier.
    pub id: i64,
    /// Whether the platform has flagged the record as gone.
    pub deleted: bool,
    /// Attribute values keyed by local attribute name.
    pub attributes: Map<String, Value>,
}

impl RemoteRecord {
    /// Create an active record with the given identifier.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Create a record flagged as deleted.
    pub fn tombstone(id: i64) -> Self {
        Self {
            id,
            deleted: true,
            ..Default::default()
        }
    }

    /// Attach an attribute value. Nulls are dropped: absent optional fields
    /// simply do not appear in the record.
    pub fn with_attribute(mut self, name: impl Into<String>, value: Value) -> Self {
        if !value.is_null() {
            self.attributes.insert(name.into(), value);
        }
        self
    }
}

/// The per-kind half of the lifecycle: remote calls and the declared schema.
///
/// Implementations translate between local attribute names and the API's
/// request/response shapes; they must not duplicate lifecycle control flow.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// The resource type name, e.g. `aptible_app`.
    fn type_name(&self) -> &'static str;

    /// The declared attribute schema.
    fn schema(&self) -> Schema;

    /// Issue the remote create call with the creatable attributes.
    async fn create_remote(
        &self,
        client: &AptibleClient,
        config: &ResourceState,
    ) -> Result<RemoteRecord, ProviderError>;

    /// Follow-up remote work once the record exists and the identifier has
    /// been recorded, e.g. applying app configuration through an operation.
    ///
    /// The driver runs this after `set_id`, so a failure here surfaces with
    /// the identifier already in place, like a failing reconcile read does.
    async fn finish_create(
        &self,
        _client: &AptibleClient,
        _id: i64,
        _config: &ResourceState,
    ) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Fetch the remote record by identifier.
    async fn read_remote(
        &self,
        client: &AptibleClient,
        id: i64,
    ) -> Result<RemoteRecord, ProviderError>;

    /// Issue the remote update call carrying only the changed fields.
    async fn update_remote(
        &self,
        client: &AptibleClient,
        id: i64,
        changes: &Map<String, Value>,
    ) -> Result<(), ProviderError>;

    /// Issue the remote delete call.
    async fn delete_remote(&self, client: &AptibleClient, id: i64)
        -> Result<(), ProviderError>;
}

/// Create a new instance.
///
/// On remote failure the local identifier remains unset. On success the
/// identifier is set before the reconciling read runs, so a failing read
/// leaves the id in place for a later refresh to reconcile (the documented
/// inconsistency window).
pub async fn create(
    handler: &dyn ResourceHandler,
    client: &AptibleClient,
    state: &mut ResourceState,
) -> Result<(), ProviderError> {
    let schema = handler.schema();
    validate_config(&schema, state)?;

    debug!(resource_type = handler.type_name(), "creating resource");
    let record = handler.create_remote(client, state).await?;
    state.set_id(record.id);
    info!(
        resource_type = handler.type_name(),
        id = record.id,
        "resource created"
    );

    // Follow-up steps and the reconcile run with the id already recorded:
    // the record exists remotely, so their failures must not untrack it.
    handler.finish_create(client, record.id, state).await?;

    // Reconcile immediately: create responses may omit derived fields.
    read(handler, client, state).await
}

/// Refresh local state from the remote record.
///
/// Three outcomes: an active record overwrites computed and mutable
/// attributes (force-new attributes are caller-supplied and authoritative);
/// a deleted or missing record clears the identifier and succeeds (drift is
/// not an error); any other remote failure propagates with state untouched.
pub async fn read(
    handler: &dyn ResourceHandler,
    client: &AptibleClient,
    state: &mut ResourceState,
) -> Result<(), ProviderError> {
    let Some(id) = state.id()? else {
        return Ok(());
    };

    let record = match handler.read_remote(client, id).await {
        Ok(record) => record,
        Err(err) if err.is_not_found() => {
            info!(
                resource_type = handler.type_name(),
                id, "resource gone out of band, untracking"
            );
            state.clear_id();
            return Ok(());
        },
        Err(err) => return Err(err),
    };

    if record.deleted {
        info!(
            resource_type = handler.type_name(),
            id, "resource flagged deleted, untracking"
        );
        state.clear_id();
        return Ok(());
    }

    let schema = handler.schema();
    for (name, value) in record.attributes {
        if schema.overwritable_on_read(&name) {
            state.set_if_present(&name, Some(value));
        }
    }

    Ok(())
}

/// Update an instance in place.
///
/// Only mutable attributes that differ between `prior` and the planned state
/// are sent; with zero changed fields no remote update call is issued. Either
/// way a reconciling read follows.
pub async fn update(
    handler: &dyn ResourceHandler,
    client: &AptibleClient,
    prior: &ResourceState,
    state: &mut ResourceState,
) -> Result<(), ProviderError> {
    let schema = handler.schema();
    validate_config(&schema, state)?;

    if !state.has_id() {
        if let Some(id) = prior.id()? {
            state.set_id(id);
        }
    }
    let Some(id) = state.id()? else {
        return Err(ProviderError::Validation(format!(
            "cannot update untracked {}",
            handler.type_name()
        )));
    };

    let changes = changed_attributes(&schema, prior, state);
    if changes.is_empty() {
        debug!(
            resource_type = handler.type_name(),
            id, "no mutable changes, refreshing only"
        );
    } else {
        info!(
            resource_type = handler.type_name(),
            id,
            changed = changes.len(),
            "updating resource"
        );
        handler.update_remote(client, id, &changes).await?;
    }

    read(handler, client, state).await
}

/// Delete an instance. Locally terminal.
///
/// A read runs first; an already-absent record makes the delete a silent
/// success, as does a remote not-found on the delete call itself. Any other
/// remote failure is surfaced and a repeated delete converges through the
/// read-confirm branch.
pub async fn delete(
    handler: &dyn ResourceHandler,
    client: &AptibleClient,
    state: &mut ResourceState,
) -> Result<(), ProviderError> {
    let Some(id) = state.id()? else {
        return Ok(());
    };

    match handler.read_remote(client, id).await {
        Ok(record) if record.deleted => {
            state.clear_id();
            return Ok(());
        },
        Err(err) if err.is_not_found() => {
            state.clear_id();
            return Ok(());
        },
        Err(err) => return Err(err),
        Ok(_) => {},
    }

    match handler.delete_remote(client, id).await {
        Ok(()) => {},
        Err(err) if err.is_not_found() => {},
        Err(err) => return Err(err),
    }

    info!(resource_type = handler.type_name(), id, "resource deleted");
    state.clear_id();
    Ok(())
}

/// Import an existing instance by an externally supplied identifier string.
///
/// Seeds the identifier and delegates to [`read`]; any failure (including the
/// record turning out to be gone) is an import failure with no retry.
pub async fn import(
    handler: &dyn ResourceHandler,
    client: &AptibleClient,
    external_id: &str,
) -> Result<ResourceState, ProviderError> {
    let id: i64 = external_id.trim().parse().map_err(|_| {
        ProviderError::Validation(format!(
            "import id {:?} is not a valid {} identifier",
            external_id,
            handler.type_name()
        ))
    })?;

    let mut state = ResourceState::new();
    state.set_id(id);
    read(handler, client, &mut state).await?;

    if !state.has_id() {
        return Err(ProviderError::NotFound(format!(
            "{} {} does not exist",
            handler.type_name(),
            id
        )));
    }

    Ok(state)
}

/// Mutable attributes whose planned value differs from the prior value.
///
/// Force-new and computed attributes never appear here: the schema rejects
/// force-new changes upstream and computed values belong to the remote side.
/// A removed attribute is not sent either, matching the posture that absent
/// optional fields simply do not travel.
fn changed_attributes(
    schema: &Schema,
    prior: &ResourceState,
    planned: &ResourceState,
) -> Map<String, Value> {
    let mut changes = Map::new();
    for name in schema.mutable_attribute_names() {
        let before = prior.get(name);
        let after = planned.get(name);
        if before != after {
            if let Some(after) = after {
                changes.insert(name.to_string(), after.clone());
            }
        }
    }
    changes
}

fn validate_config(schema: &Schema, state: &ResourceState) -> Result<(), ProviderError> {
    validate_result(schema, &Value::Object(state.attributes().clone())).map_err(|diagnostics| {
        let summaries: Vec<String> = diagnostics.into_iter().map(|d| d.summary).collect();
        ProviderError::Validation(summaries.join("; "))
    })
}
