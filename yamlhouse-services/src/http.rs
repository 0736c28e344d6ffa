//! HTTP seam shared by all adapters.
//!
//! [`HttpClient`] is the opaque request capability; [`UreqClient`] is the
//! production implementation. [`ApiClient`] binds one client to a service's
//! base URL and credentials and turns responses into JSON or a
//! [`RemoteFetchError`].

use std::fmt;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use thiserror::Error;

use crate::error::RemoteFetchError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Transport types
// ---------------------------------------------------------------------------

/// Request authentication.
#[derive(Clone, PartialEq, Eq)]
pub enum Auth {
    Bearer(String),
    Basic { username: String, password: String },
}

impl Auth {
    /// Value for the `Authorization` header.
    pub fn header_value(&self) -> String {
        match self {
            Auth::Bearer(token) => format!("Bearer {token}"),
            Auth::Basic { username, password } => {
                format!("Basic {}", STANDARD.encode(format!("{username}:{password}")))
            }
        }
    }
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Auth::Bearer(_) => f.write_str("Bearer(***)"),
            Auth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

/// Status and body of a completed request. Non-2xx statuses are values here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request did not complete.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Opaque GET capability.
pub trait HttpClient {
    fn get(&self, url: &str, query: &[(&str, String)], auth: &Auth)
        -> Result<HttpResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// ureq implementation
// ---------------------------------------------------------------------------

/// Blocking [`HttpClient`] backed by a `ureq` agent.
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl HttpClient for UreqClient {
    fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
        auth: &Auth,
    ) -> Result<HttpResponse, TransportError> {
        let mut request = self
            .agent
            .get(url)
            .set("Authorization", &auth.header_value())
            .set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }

        match request.call() {
            Ok(response) => {
                let status = response.status();
                let body = response
                    .into_string()
                    .map_err(|e| TransportError(e.to_string()))?;
                Ok(HttpResponse { status, body })
            }
            Err(ureq::Error::Status(status, response)) => Ok(HttpResponse {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(transport)) => Err(TransportError(transport.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// ApiClient
// ---------------------------------------------------------------------------

/// One service's view of the HTTP capability.
pub struct ApiClient {
    service: String,
    base_url: String,
    auth: Auth,
    http: Box<dyn HttpClient>,
}

impl ApiClient {
    pub fn new(
        service: impl Into<String>,
        base_url: impl Into<String>,
        auth: Auth,
        http: Box<dyn HttpClient>,
    ) -> Self {
        Self {
            service: service.into(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            auth,
            http,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// GET `<base_url><endpoint>` and decode the JSON body.
    pub fn get_json(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<Value, RemoteFetchError> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(service = %self.service, endpoint, "GET");

        let response = self
            .http
            .get(&url, query, &self.auth)
            .map_err(|source| RemoteFetchError::Transport {
                service: self.service.clone(),
                endpoint: endpoint.to_owned(),
                source,
            })?;

        if !response.is_success() {
            return Err(RemoteFetchError::Status {
                service: self.service.clone(),
                endpoint: endpoint.to_owned(),
                status: response.status,
            });
        }

        serde_json::from_str(&response.body).map_err(|source| RemoteFetchError::Decode {
            service: self.service.clone(),
            endpoint: endpoint.to_owned(),
            source,
        })
    }

    /// Build a [`RemoteFetchError::Shape`] for `endpoint`.
    pub fn shape_error(&self, endpoint: &str, expected: &'static str) -> RemoteFetchError {
        RemoteFetchError::Shape {
            service: self.service.clone(),
            endpoint: endpoint.to_owned(),
            expected,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Canned(HttpResponse);

    impl HttpClient for Canned {
        fn get(
            &self,
            _url: &str,
            _query: &[(&str, String)],
            _auth: &Auth,
        ) -> Result<HttpResponse, TransportError> {
            Ok(self.0.clone())
        }
    }

    struct Unreachable;

    impl HttpClient for Unreachable {
        fn get(
            &self,
            _url: &str,
            _query: &[(&str, String)],
            _auth: &Auth,
        ) -> Result<HttpResponse, TransportError> {
            Err(TransportError("connection refused".into()))
        }
    }

    fn client(http: impl HttpClient + 'static) -> ApiClient {
        ApiClient::new("svc", "https://api.test/", Auth::Bearer("t".into()), Box::new(http))
    }

    #[test]
    fn basic_auth_is_base64_encoded() {
        let auth = Auth::Basic {
            username: "me@example.com".into(),
            password: "key".into(),
        };
        assert_eq!(auth.header_value(), "Basic bWVAZXhhbXBsZS5jb206a2V5");
    }

    #[test]
    fn debug_output_hides_secrets() {
        let auth = Auth::Bearer("super-secret".into());
        assert!(!format!("{auth:?}").contains("super-secret"));
    }

    #[test]
    fn non_success_status_is_a_status_error() {
        let api = client(Canned(HttpResponse {
            status: 500,
            body: "oops".into(),
        }));
        let err = api.get_json("/workspaces", &[]).unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.endpoint(), "/workspaces");
        assert_eq!(err.service(), "svc");
    }

    #[test]
    fn invalid_json_is_a_decode_error() {
        let api = client(Canned(HttpResponse {
            status: 200,
            body: "<html>".into(),
        }));
        let err = api.get_json("/project", &[]).unwrap_err();
        assert!(matches!(err, RemoteFetchError::Decode { .. }));
    }

    #[test]
    fn transport_failure_keeps_context() {
        let err = client(Unreachable).get_json("/project", &[]).unwrap_err();
        assert!(matches!(err, RemoteFetchError::Transport { .. }));
        assert!(err.to_string().contains("connection refused"));
    }
}
