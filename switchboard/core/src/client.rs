//! Backend Client Boundary
//!
//! The orchestration layer never talks to a vendor endpoint directly; it goes
//! through the [`BackendClient`] trait, one implementation per configured
//! backend. The trait is the only suspension point in a task's execution:
//! `invoke` either returns, fails, or times out in finite time.
//!
//! A reference HTTP adapter ([`HttpBackendClient`]) is included for backends
//! that speak a plain JSON completion endpoint. Vendor-specific clients live
//! with whatever composes the application.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;

use crate::task::TaskDescriptor;

// ============================================================================
// Backend Client Trait
// ============================================================================

/// Trait for remote inference backend clients
///
/// Implement this to plug a backend into the registry. The engine treats an
/// implementation as an opaque capability: credentials, wire formats, and
/// vendor quirks stay behind this boundary.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Human-readable client name, used in logs
    fn name(&self) -> &str;

    /// Execute one prompt against the backend
    async fn invoke(
        &self,
        prompt: &str,
        task: &TaskDescriptor,
    ) -> Result<BackendResponse, BackendError>;

    /// Cheap reachability probe
    ///
    /// Default implementation reports healthy; clients with a natural probe
    /// endpoint should override.
    async fn health_check(&self) -> bool {
        true
    }
}

/// Response from a successful backend invocation
#[derive(Clone, Debug)]
pub struct BackendResponse {
    /// The response payload (opaque to this layer)
    pub content: String,

    /// Wall time the backend reported or the client measured, in milliseconds
    pub latency_ms: u64,

    /// Exact output units consumed, when the backend reports them
    pub units: Option<u32>,
}

// ============================================================================
// Backend Errors
// ============================================================================

/// Errors raised by a backend client
///
/// Every variant is recoverable by failing over to another backend; none of
/// them crosses the execution engine boundary raw.
#[derive(Clone, Debug)]
pub enum BackendError {
    /// Could not reach the backend
    ConnectionFailed(String),
    /// The backend rejected or failed the request
    RequestFailed(String),
    /// The invocation exceeded its timeout budget
    Timeout,
    /// The backend rate limited the request
    RateLimited {
        /// Suggested wait before retrying, if the backend provided one
        retry_after_ms: Option<u64>,
    },
    /// Credentials were rejected
    AuthenticationFailed,
    /// The response could not be decoded
    MalformedResponse(String),
    /// Anything else
    Internal(String),
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionFailed(e) => write!(f, "Connection failed: {e}"),
            Self::RequestFailed(e) => write!(f, "Request failed: {e}"),
            Self::Timeout => write!(f, "Request timed out"),
            Self::RateLimited { retry_after_ms } => {
                if let Some(ms) = retry_after_ms {
                    write!(f, "Rate limited, retry after {ms}ms")
                } else {
                    write!(f, "Rate limited")
                }
            }
            Self::AuthenticationFailed => write!(f, "Authentication failed"),
            Self::MalformedResponse(e) => write!(f, "Malformed response: {e}"),
            Self::Internal(e) => write!(f, "Internal error: {e}"),
        }
    }
}

impl std::error::Error for BackendError {}

// ============================================================================
// Reference HTTP Adapter
// ============================================================================

/// Client for backends exposing a JSON completion endpoint
///
/// Sends `POST {base_url}/v1/complete` with the prompt and task constraints,
/// expects `{ "content": "...", "units": <optional> }` back. Status codes map
/// onto the [`BackendError`] taxonomy.
pub struct HttpBackendClient {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

/// Wire shape of a completion response
#[derive(Debug, Deserialize)]
struct CompletionBody {
    content: String,
    units: Option<u32>,
}

impl HttpBackendClient {
    /// Create a new client for the given endpoint
    ///
    /// # Panics
    ///
    /// Panics if the underlying HTTP client cannot be constructed, which only
    /// happens when the TLS backend is unavailable at startup.
    #[must_use]
    pub fn new(name: impl Into<String>, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    fn complete_url(&self) -> String {
        format!("{}/v1/complete", self.base_url)
    }
}

#[async_trait]
impl BackendClient for HttpBackendClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(
        &self,
        prompt: &str,
        task: &TaskDescriptor,
    ) -> Result<BackendResponse, BackendError> {
        let body = serde_json::json!({
            "prompt": prompt,
            "kind": task.kind,
            "complexity": task.complexity,
            "max_output_units": task.max_output_units,
            "require_citations": task.requires_citations,
        });

        let started = Instant::now();
        let response = self
            .client
            .post(self.complete_url())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    BackendError::Timeout
                } else if e.is_connect() {
                    BackendError::ConnectionFailed(e.to_string())
                } else {
                    BackendError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(BackendError::AuthenticationFailed);
        }
        if status.as_u16() == 429 {
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000);
            return Err(BackendError::RateLimited { retry_after_ms });
        }
        if !status.is_success() {
            return Err(BackendError::RequestFailed(format!(
                "status {}",
                status.as_u16()
            )));
        }

        let parsed: CompletionBody = response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))?;

        Ok(BackendResponse {
            content: parsed.content,
            latency_ms: started.elapsed().as_millis() as u64,
            units: parsed.units,
        })
    }

    async fn health_check(&self) -> bool {
        self.client
            .get(format!("{}/v1/health", self.base_url))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_client_creation() {
        let client = HttpBackendClient::new("relay", "https://inference.example", "sk-test");
        assert_eq!(client.name(), "relay");
        assert_eq!(client.complete_url(), "https://inference.example/v1/complete");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(BackendError::Timeout.to_string(), "Request timed out");
        assert_eq!(
            BackendError::RateLimited {
                retry_after_ms: Some(250)
            }
            .to_string(),
            "Rate limited, retry after 250ms"
        );
        assert_eq!(
            BackendError::RateLimited {
                retry_after_ms: None
            }
            .to_string(),
            "Rate limited"
        );
        assert_eq!(
            BackendError::ConnectionFailed("refused".into()).to_string(),
            "Connection failed: refused"
        );
    }
}
