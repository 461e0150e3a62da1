//! Local state for a single managed instance.
//!
//! The host runtime owns the persisted state blob; the provider only reads
//! and writes named attributes within the per-instance map handed to it on
//! each call. [`ResourceState`] wraps that map.
//!
//! Invariant: the `id` attribute is set if and only if the corresponding
//! remote record is known to exist and not be deleted. [`ResourceState::clear_id`]
//! is the sole mechanism for signaling "untrack this resource".

use serde_json::{Map, Value};

use crate::error::ProviderError;

/// The attribute under which the local identifier is stored.
pub const ID_ATTRIBUTE: &str = "id";

/// A flat attribute map for one managed instance.
///
/// Identifiers are stored as strings (the host runtime's convention) but
/// exchanged with the remote API as 64-bit integers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceState {
    attrs: Map<String, Value>,
}

impl ResourceState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value. Null becomes the empty state; anything other than
    /// an object is rejected.
    pub fn from_value(value: Value) -> Result<Self, ProviderError> {
        match value {
            Value::Object(attrs) => Ok(Self { attrs }),
            Value::Null => Ok(Self::new()),
            other => Err(ProviderError::Validation(format!(
                "state must be an object, got {}",
                other
            ))),
        }
    }

    /// Unwrap into a JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.attrs)
    }

    /// The local identifier, parsed as a 64-bit integer.
    ///
    /// Returns `None` when unset; an unparsable identifier is an error
    /// rather than silently treated as absent.
    pub fn id(&self) -> Result<Option<i64>, ProviderError> {
        match self.attrs.get(ID_ATTRIBUTE) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => n.as_i64().map(Some).ok_or_else(|| {
                ProviderError::Validation(format!("identifier {} is not a valid integer", n))
            }),
            Some(Value::String(s)) => s.parse::<i64>().map(Some).map_err(|_| {
                ProviderError::Validation(format!("identifier {:?} is not a valid integer", s))
            }),
            Some(other) => Err(ProviderError::Validation(format!(
                "identifier has invalid type: {}",
                other
            ))),
        }
    }

    /// Whether the local identifier is set.
    pub fn has_id(&self) -> bool {
        matches!(
            self.attrs.get(ID_ATTRIBUTE),
            Some(Value::Number(_)) | Some(Value::String(_))
        )
    }

    /// Record the remote identifier, marking the instance as tracked.
    pub fn set_id(&mut self, id: i64) {
        self.attrs
            .insert(ID_ATTRIBUTE.to_string(), Value::String(id.to_string()));
    }

    /// Untrack the instance.
    pub fn clear_id(&mut self) {
        self.attrs.remove(ID_ATTRIBUTE);
    }

    /// Get an attribute value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self.attrs.get(name) {
            Some(Value::Null) | None => None,
            Some(v) => Some(v),
        }
    }

    /// Get a string attribute.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// Get an integer attribute.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// Get a boolean attribute.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// Set an attribute value.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.attrs.insert(name.into(), value);
    }

    /// Set an attribute only when the value is present and non-null.
    ///
    /// Partial remote responses are tolerated: absent optional fields are
    /// simply not written rather than erroring or overwriting with null.
    pub fn set_if_present(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(Value::Null) | None => {},
            Some(v) => {
                self.attrs.insert(name.to_string(), v);
            },
        }
    }

    /// Remove an attribute.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.attrs.remove(name)
    }

    /// The underlying attribute map.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attrs
    }
}

/// Narrow a wire identifier to 32 bits, rejecting out-of-range values.
///
/// Identifiers are exchanged with the remote API as `i64`; schema positions
/// that require a 32-bit representation must go through this check rather
/// than truncate.
pub fn narrow_to_i32(value: i64) -> Result<i32, ProviderError> {
    i32::try_from(value).map_err(|_| {
        ProviderError::Validation(format!("value {} does not fit in a 32-bit integer", value))
    })
}
