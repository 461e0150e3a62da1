//! Error types for the Aptible provider.
//!
//! Remote failures carry an [`ApiFailure`] decoded from the Aptible API's
//! error payload (`{code, error, message}`, every field optional). The
//! decoder never panics on malformed payloads; when it cannot recover both
//! the status code and the error tag it renders a best-effort message
//! prefixed with a "could not fully decode" marker so no failure is silent.

use serde::Deserialize;
use thiserror::Error;

use crate::schema::Diagnostic;

/// Marker prefix for error payloads the decoder could not fully interpret.
pub const DECODE_MARKER: &str = "could not fully decode API error";

/// Errors that can occur while operating the provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Missing or invalid provider configuration (fatal at configure time).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The configuration failed schema validation before any remote call.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A lookup found nothing (terminal for data sources).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested resource or data source type is not registered.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// The remote API rejected a call.
    #[error("{0}")]
    Api(ApiFailure),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The HTTP transport failed before a response was produced.
    #[error("Transport error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ProviderError {
    /// Convert this error into an error-severity diagnostic.
    pub fn into_diagnostic(self) -> Diagnostic {
        Diagnostic::error(self.to_string())
    }

    /// Whether this error represents a remote "not found" outcome.
    ///
    /// Covers both the provider's own [`ProviderError::NotFound`] and API
    /// failures tagged `not_found` or carrying a 404 status.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Api(failure) => {
                failure.status == Some(404) || failure.code.as_deref() == Some("not_found")
            },
            _ => false,
        }
    }
}

/// A decoded API error payload.
///
/// The Aptible API surfaces failures as a JSON object with optional `code`
/// (numeric status), `error` (machine-readable tag) and `message` fields.
/// This is the explicit tagged form of that payload; construction tolerates
/// any byte sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiFailure {
    /// Status code reported inside the payload (or by the transport).
    pub status: Option<i64>,
    /// Machine-readable error tag, e.g. `not_found`.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: Option<String>,
}

/// Wire shape of an Aptible error payload. `code` is numeric in practice but
/// has been observed as a string; accept either.
#[derive(Deserialize)]
struct RawErrorPayload {
    code: Option<serde_json::Value>,
    error: Option<String>,
    message: Option<String>,
}

impl ApiFailure {
    /// Decode an error payload from a response body.
    ///
    /// `http_status` is used as the status code when the payload itself does
    /// not carry one. Malformed bodies yield a failure with whatever fields
    /// could be recovered, never an error or panic.
    pub fn decode(http_status: Option<u16>, body: &[u8]) -> Self {
        let raw: Option<RawErrorPayload> = serde_json::from_slice(body).ok();

        let mut failure = ApiFailure {
            status: http_status.map(i64::from),
            ..Default::default()
        };

        if let Some(raw) = raw {
            if let Some(code) = raw.code {
                failure.status = code
                    .as_i64()
                    .or_else(|| code.as_str().and_then(|s| s.parse().ok()))
                    .or(failure.status);
            }
            failure.code = raw.error;
            failure.message = raw.message;
        }

        failure
    }

    /// Whether every field needed for the canonical rendering is present.
    pub fn is_complete(&self) -> bool {
        self.status.is_some() && self.code.is_some()
    }
}

impl std::fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let (Some(status), Some(code)) = (self.status, self.code.as_deref()) {
            return write!(
                f,
                "status={} code={} message={}",
                status,
                code,
                self.message.as_deref().unwrap_or_default()
            );
        }

        // Best-effort rendering: list whichever fields are present so the
        // caller is never left with a silent failure.
        write!(f, "{}", DECODE_MARKER)?;
        if let Some(status) = self.status {
            write!(f, " status={}", status)?;
        }
        if let Some(code) = self.code.as_deref() {
            write!(f, " code={}", code)?;
        }
        if let Some(message) = self.message.as_deref() {
            write!(f, " message={}", message)?;
        }
        Ok(())
    }
}

impl From<ApiFailure> for ProviderError {
    fn from(failure: ApiFailure) -> Self {
        ProviderError::Api(failure)
    }
}
