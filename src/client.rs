//! The Aptible API client.
//!
//! One [`AptibleClient`] is constructed per provider process at configure
//! time and shared by every handler invocation. It wraps a `reqwest::Client`
//! (whose connection pool is safe for concurrent use), the API root URL, and
//! the bearer token; handlers never mutate it. Timeouts and retry policy are
//! the transport's responsibility, so every call here is a single round trip.
//!
//! The API speaks hypermedia-style JSON: collections arrive under
//! `_embedded`, relations under `_links`. The free functions at the bottom of
//! this module pull ids and collections out of those envelopes.

use reqwest::header::ACCEPT;
use serde_json::Value;
use url::Url;

use crate::error::{ApiFailure, ProviderError};

/// Environment variable naming the API root URL.
pub const API_ROOT_ENV: &str = "APTIBLE_API_ROOT_URL";
/// Environment variable naming the auth root URL.
pub const AUTH_ROOT_ENV: &str = "APTIBLE_AUTH_ROOT_URL";
/// Environment variable carrying the access token.
pub const ACCESS_TOKEN_ENV: &str = "APTIBLE_ACCESS_TOKEN";

const DEFAULT_API_ROOT: &str = "https://api.aptible.com";
const DEFAULT_AUTH_ROOT: &str = "https://auth.aptible.com";

/// Resolved provider configuration.
///
/// Values come from provider config attributes when present, falling back to
/// environment variables; the access token has no default and its absence is
/// a fatal configuration error.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Root URL of the resource API.
    pub api_root: Url,
    /// Root URL of the auth API.
    pub auth_root: Url,
    /// Bearer token presented on every call.
    pub access_token: String,
}

impl ProviderConfig {
    /// Resolve configuration from provider config attributes and the
    /// environment.
    pub fn resolve(config: &Value) -> Result<Self, ProviderError> {
        let api_root = resolve_url(config, "api_root_url", API_ROOT_ENV, DEFAULT_API_ROOT)?;
        let auth_root = resolve_url(config, "auth_root_url", AUTH_ROOT_ENV, DEFAULT_AUTH_ROOT)?;

        let access_token = config
            .get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| std::env::var(ACCESS_TOKEN_ENV).ok())
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                ProviderError::Configuration(format!(
                    "no access token: set the access_token attribute or {}",
                    ACCESS_TOKEN_ENV
                ))
            })?;

        Ok(Self {
            api_root,
            auth_root,
            access_token,
        })
    }
}

fn resolve_url(
    config: &Value,
    attribute: &str,
    env_var: &str,
    default: &str,
) -> Result<Url, ProviderError> {
    let raw = config
        .get(attribute)
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| std::env::var(env_var).ok())
        .unwrap_or_else(|| default.to_string());

    let mut url = Url::parse(&raw)
        .map_err(|e| ProviderError::Configuration(format!("invalid URL {:?}: {}", raw, e)))?;

    // Normalize to a trailing slash so joins keep the full base path.
    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }

    Ok(url)
}

/// Shared, read-mostly handle to the Aptible API.
pub struct AptibleClient {
    http: reqwest::Client,
    api_root: Url,
    access_token: String,
}

impl AptibleClient {
    /// Create a client from resolved configuration.
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_root: config.api_root,
            access_token: config.access_token,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.api_root
            .join(path.trim_start_matches('/'))
            .map_err(|e| ProviderError::Configuration(format!("invalid path {:?}: {}", path, e)))
    }

    /// `GET` a resource, decoding the JSON body.
    pub async fn get(&self, path: &str) -> Result<Value, ProviderError> {
        let url = self.endpoint(path)?;
        self.execute(self.http.get(url)).await
    }

    /// `POST` a JSON body.
    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let url = self.endpoint(path)?;
        self.execute(self.http.post(url).json(body)).await
    }

    /// `PUT` a JSON body.
    pub async fn put(&self, path: &str, body: &Value) -> Result<Value, ProviderError> {
        let url = self.endpoint(path)?;
        self.execute(self.http.put(url).json(body)).await
    }

    /// `DELETE` a resource. Empty response bodies are fine.
    pub async fn delete(&self, path: &str) -> Result<(), ProviderError> {
        let url = self.endpoint(path)?;
        self.execute(self.http.delete(url)).await.map(|_| ())
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value, ProviderError> {
        let response = request
            .bearer_auth(&self.access_token)
            .header(ACCEPT, "application/hal+json")
            .send()
            .await?;

        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(ApiFailure::decode(Some(status.as_u16()), &bytes).into());
        }

        if bytes.is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(ProviderError::from)
    }
}

// =========================================================================
// Hypermedia envelope helpers
// =========================================================================

/// The `_embedded` collection under `key`, or an empty slice.
pub fn embedded<'a>(record: &'a Value, key: &str) -> &'a [Value] {
    record
        .get("_embedded")
        .and_then(|e| e.get(key))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// The record's own numeric id.
pub fn record_id(record: &Value) -> Option<i64> {
    record.get("id").and_then(Value::as_i64)
}

/// Parse the id out of a `_links.<rel>.href` relation.
///
/// Hrefs end in the related record's numeric id, e.g.
/// `https://api.aptible.com/accounts/5`.
pub fn link_id(record: &Value, rel: &str) -> Option<i64> {
    record
        .get("_links")
        .and_then(|links| links.get(rel))
        .and_then(|link| link.get("href"))
        .and_then(Value::as_str)
        .and_then(|href| href.trim_end_matches('/').rsplit('/').next())
        .and_then(|tail| tail.parse().ok())
}

/// Whether the record is flagged as gone.
///
/// The API marks removal either with an explicit `deleted` flag or with a
/// `deprovisioned` status.
pub fn is_deprovisioned(record: &Value) -> bool {
    if record.get("deleted").and_then(Value::as_bool) == Some(true) {
        return true;
    }
    matches!(
        record.get("status").and_then(Value::as_str),
        Some("deprovisioned")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config() -> ProviderConfig {
        ProviderConfig {
            api_root: Url::parse("https://api.aptible.com/").unwrap(),
            auth_root: Url::parse("https://auth.aptible.com/").unwrap(),
            access_token: "test-token".to_string(),
        }
    }

    #[test]
    fn resolve_from_config_attributes() {
        let config = ProviderConfig::resolve(&json!({
            "api_root_url": "https://api.example.com/v1",
            "auth_root_url": "https://auth.example.com",
            "access_token": "secret"
        }))
        .unwrap();

        assert_eq!(config.api_root.as_str(), "https://api.example.com/v1/");
        assert_eq!(config.auth_root.as_str(), "https://auth.example.com/");
        assert_eq!(config.access_token, "secret");
    }

    #[test]
    fn resolve_missing_token_is_fatal() {
        std::env::remove_var(ACCESS_TOKEN_ENV);
        let err = ProviderConfig::resolve(&json!({})).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
        assert!(err.to_string().contains(ACCESS_TOKEN_ENV));
    }

    #[test]
    fn resolve_rejects_invalid_url() {
        let err = ProviderConfig::resolve(&json!({
            "api_root_url": "not a url",
            "access_token": "secret"
        }))
        .unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn endpoint_joins_paths() {
        let client = AptibleClient::new(test_config());
        let url = client.endpoint("/apps/5").unwrap();
        assert_eq!(url.as_str(), "https://api.aptible.com/apps/5");

        let url = client.endpoint("accounts/5/apps").unwrap();
        assert_eq!(url.as_str(), "https://api.aptible.com/accounts/5/apps");
    }

    #[test]
    fn embedded_extraction() {
        let record = json!({
            "_embedded": {
                "apps": [{"id": 1}, {"id": 2}]
            }
        });

        assert_eq!(embedded(&record, "apps").len(), 2);
        assert!(embedded(&record, "databases").is_empty());
        assert!(embedded(&json!({}), "apps").is_empty());
    }

    #[test]
    fn link_id_parses_href_tail() {
        let record = json!({
            "_links": {
                "account": {"href": "https://api.aptible.com/accounts/5"},
                "self": {"href": "https://api.aptible.com/apps/17/"}
            }
        });

        assert_eq!(link_id(&record, "account"), Some(5));
        assert_eq!(link_id(&record, "self"), Some(17));
        assert_eq!(link_id(&record, "stack"), None);

        let record = json!({"_links": {"account": {"href": "https://api.aptible.com/accounts/"}}});
        assert_eq!(link_id(&record, "account"), None);
    }

    #[test]
    fn deprovisioned_detection() {
        assert!(is_deprovisioned(&json!({"status": "deprovisioned"})));
        assert!(is_deprovisioned(&json!({"deleted": true})));
        assert!(!is_deprovisioned(&json!({"status": "provisioned"})));
        assert!(!is_deprovisioned(&json!({"deleted": false})));
        assert!(!is_deprovisioned(&json!({})));
    }

    #[test]
    fn record_id_reads_numeric_id() {
        assert_eq!(record_id(&json!({"id": 9})), Some(9));
        assert_eq!(record_id(&json!({"id": "9"})), None);
        assert_eq!(record_id(&json!({})), None);
    }
}
