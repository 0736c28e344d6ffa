//! # yamlhouse-sync
//!
//! Git-backed record store and sync orchestration.
//!
//! [`RecordStore`] writes one YAML file per record into a working tree;
//! [`pipeline::run`] drains every registered service into it and commits once.

pub mod error;
pub mod pipeline;
pub mod repository;
pub mod store;

pub use error::{error_chain, RepositorySyncError, StoreError, SyncError};
pub use pipeline::{CommitStatus, Orchestrator, ServiceReport, SyncPhase, SyncReport, WriteObserver};
pub use repository::{GitCli, Repository};
pub use store::{CommitOutcome, RecordStore, TreeStatus, WriteResult};
