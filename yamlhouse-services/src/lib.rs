//! # yamlhouse-services
//!
//! Service adapters that turn task-tracker APIs into normalized records.
//!
//! Every adapter implements [`ServiceAdapter`]; [`ServiceRegistry`] builds
//! them from config entries through a fixed table of known kinds.

pub mod adapter;
pub mod asana;
pub mod error;
pub mod http;
pub mod jira;
pub mod registry;

pub use adapter::{RecordStream, ServiceAdapter};
pub use asana::AsanaAdapter;
pub use error::{RecordMappingError, RegistryError, RemoteFetchError};
pub use http::{ApiClient, Auth, HttpClient, HttpResponse, TransportError, UreqClient};
pub use jira::JiraAdapter;
pub use registry::ServiceRegistry;
