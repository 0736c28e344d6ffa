//! Error types for yamlhouse-services.

use thiserror::Error;

use yamlhouse_core::{ConfigError, CoreError};

use crate::http::TransportError;

/// A request to an upstream API did not produce a usable response.
///
/// Any variant ends the producing adapter's record stream.
#[derive(Debug, Error)]
pub enum RemoteFetchError {
    /// Non-success HTTP status.
    #[error("{service}: GET {endpoint} returned status {status}")]
    Status {
        service: String,
        endpoint: String,
        status: u16,
    },

    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("{service}: GET {endpoint} failed: {source}")]
    Transport {
        service: String,
        endpoint: String,
        #[source]
        source: TransportError,
    },

    /// The body was not valid JSON.
    #[error("{service}: GET {endpoint} returned an unreadable body: {source}")]
    Decode {
        service: String,
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    /// Valid JSON, but not the envelope the adapter expects.
    #[error("{service}: GET {endpoint} response is not {expected}")]
    Shape {
        service: String,
        endpoint: String,
        expected: &'static str,
    },
}

impl RemoteFetchError {
    pub fn service(&self) -> &str {
        match self {
            Self::Status { service, .. }
            | Self::Transport { service, .. }
            | Self::Decode { service, .. }
            | Self::Shape { service, .. } => service,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            Self::Status { endpoint, .. }
            | Self::Transport { endpoint, .. }
            | Self::Decode { endpoint, .. }
            | Self::Shape { endpoint, .. } => endpoint,
        }
    }

    /// HTTP status, when the failure was a status code.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A single upstream item could not be normalized. The item is skipped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordMappingError {
    #[error("item has no usable `{field}`")]
    MissingField { field: &'static str },

    #[error(transparent)]
    Record(#[from] CoreError),
}

/// Errors from building or addressing the service registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown service '{kind}'; expected one of: {known}")]
    UnknownService { kind: String, known: String },

    #[error("invalid settings for service '{kind}': {source}")]
    InvalidSettings {
        kind: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("service index {index} out of range (registry holds {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}
