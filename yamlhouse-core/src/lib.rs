//! yamlhouse core library: record types, configuration, errors.
//!
//! - [`types`]: [`Record`], [`RecordId`], [`FieldValue`]
//! - [`config`]: [`SyncConfig`] load / resolve
//! - [`error`]: [`CoreError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{Credential, RepositoryConfig, ServiceEntry, SyncConfig};
pub use error::{ConfigError, CoreError};
pub use types::{FieldValue, Record, RecordId};
