//! Sync orchestration: ensure tree → drain each service → one commit.
//!
//! ```text
//! Idle → EnsuringRepo → PerService(0..n) → Committing → Done
//!             └──────→ Failed
//! ```
//!
//! Only a failed clone/pull ends the run. A service whose fetch fails is
//! recorded in the report and the run moves on; records it already wrote
//! stay in the tree and go into the commit.

use chrono::{DateTime, Utc};

use yamlhouse_services::{ServiceAdapter, ServiceRegistry};

use crate::error::{error_chain, StoreError, SyncError};
use crate::repository::Repository;
use crate::store::{CommitOutcome, RecordStore, WriteResult};

/// Message of the commit created by every run.
pub const COMMIT_MESSAGE: &str = "Update records from yamlhouse sync";

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    EnsuringRepo,
    PerService(usize),
    Committing,
    Done,
    Failed,
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What happened to one service during a run.
///
/// Only counts are kept; per-write detail goes to the run's write observer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceReport {
    pub service: String,
    pub written: usize,
    pub unchanged: usize,
    /// Dry run only.
    pub would_write: usize,
    pub write_failures: usize,
    /// Set when the service's fetch aborted; rendered with its source chain.
    pub fetch_error: Option<String>,
}

impl ServiceReport {
    fn new(service: &str) -> Self {
        Self {
            service: service.to_owned(),
            ..Self::default()
        }
    }

    fn count(&mut self, result: &WriteResult) {
        match result {
            WriteResult::Written { .. } => self.written += 1,
            WriteResult::Unchanged { .. } => self.unchanged += 1,
            WriteResult::WouldWrite { .. } => self.would_write += 1,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.fetch_error.is_some()
    }
}

/// Result of the commit step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitStatus {
    Committed,
    NothingToCommit,
    DryRun,
    /// Logged and reported; staged changes are left for manual recovery.
    Failed(String),
}

impl From<CommitOutcome> for CommitStatus {
    fn from(outcome: CommitOutcome) -> Self {
        match outcome {
            CommitOutcome::Committed => CommitStatus::Committed,
            CommitOutcome::NothingToCommit => CommitStatus::NothingToCommit,
            CommitOutcome::DryRun => CommitStatus::DryRun,
        }
    }
}

/// Outcome of one sync run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub services: Vec<ServiceReport>,
    pub commit: CommitStatus,
}

impl SyncReport {
    pub fn failed_services(&self) -> impl Iterator<Item = &ServiceReport> {
        self.services.iter().filter(|s| s.is_failed())
    }

    /// Whether the tree is in a state worth pushing: the commit step did not
    /// fail and was not skipped. `NothingToCommit` still qualifies, since an
    /// earlier run's commit may be waiting on a push.
    pub fn can_push(&self) -> bool {
        matches!(
            self.commit,
            CommitStatus::Committed | CommitStatus::NothingToCommit
        )
    }
}

/// Called once per successful write with the service name and the result.
pub type WriteObserver<'a> = Box<dyn FnMut(&str, &WriteResult) + 'a>;

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Drives one sync run over a registry and a store.
pub struct Orchestrator<'a, R: Repository> {
    registry: &'a ServiceRegistry,
    store: &'a RecordStore<R>,
    phase: SyncPhase,
    on_write: Option<WriteObserver<'a>>,
}

impl<'a, R: Repository> Orchestrator<'a, R> {
    pub fn new(registry: &'a ServiceRegistry, store: &'a RecordStore<R>) -> Self {
        Self {
            registry,
            store,
            phase: SyncPhase::Idle,
            on_write: None,
        }
    }

    /// Report every write as it happens instead of collecting them.
    pub fn on_write(mut self, observer: impl FnMut(&str, &WriteResult) + 'a) -> Self {
        self.on_write = Some(Box::new(observer));
        self
    }

    pub fn phase(&self) -> SyncPhase {
        self.phase
    }

    fn enter(&mut self, phase: SyncPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "sync phase");
        self.phase = phase;
    }

    /// Run ensure → per-service drain → commit.
    pub fn run(&mut self) -> Result<SyncReport, SyncError> {
        let started_at = Utc::now();

        self.enter(SyncPhase::EnsuringRepo);
        if let Err(err) = self.store.ensure_working_tree() {
            tracing::error!(error = %error_chain(&err), "cannot prepare working tree; aborting run");
            self.enter(SyncPhase::Failed);
            return Err(SyncError::WorkingTree(err));
        }

        let registry = self.registry;
        let mut services = Vec::with_capacity(registry.len());
        for (index, adapter) in registry.all().iter().enumerate() {
            self.enter(SyncPhase::PerService(index));
            services.push(self.drain(adapter.as_ref()));
        }

        self.enter(SyncPhase::Committing);
        let commit = match self.store.commit_all(COMMIT_MESSAGE) {
            Ok(outcome) => outcome.into(),
            Err(err) => {
                let message = error_chain(&err);
                tracing::error!(error = %message, "commit failed; staged changes left in working tree");
                CommitStatus::Failed(message)
            }
        };

        self.enter(SyncPhase::Done);
        Ok(SyncReport {
            started_at,
            finished_at: Utc::now(),
            services,
            commit,
        })
    }

    /// Write every record the adapter produces, stopping at its fetch error.
    fn drain(&mut self, adapter: &dyn ServiceAdapter) -> ServiceReport {
        let service = adapter.name();
        let mut report = ServiceReport::new(service);
        tracing::info!(service, "syncing service");

        for item in adapter.produce_records() {
            let record = match item {
                Ok(record) => record,
                Err(err) => {
                    let message = error_chain(&err);
                    tracing::error!(
                        service,
                        endpoint = err.endpoint(),
                        error = %message,
                        "fetch failed; continuing with next service"
                    );
                    report.fetch_error = Some(message);
                    break;
                }
            };

            match self.store.write(&record, service) {
                Ok(result) => {
                    report.count(&result);
                    if let Some(observer) = self.on_write.as_mut() {
                        observer(service, &result);
                    }
                }
                Err(err) => {
                    report.write_failures += 1;
                    log_write_failure(service, record.id().as_str(), &err);
                }
            }
        }

        tracing::info!(
            service,
            written = report.written,
            unchanged = report.unchanged,
            would_write = report.would_write,
            write_failures = report.write_failures,
            failed = report.is_failed(),
            "service done"
        );
        report
    }
}

fn log_write_failure(service: &str, id: &str, err: &StoreError) {
    tracing::warn!(service, record = id, error = %error_chain(err), "failed to write record");
}

/// Run one sync over `registry` into `store`.
pub fn run<R: Repository>(
    registry: &ServiceRegistry,
    store: &RecordStore<R>,
) -> Result<SyncReport, SyncError> {
    Orchestrator::new(registry, store).run()
}

/// [`run`], calling `on_write` for every record written.
///
/// Canonical entrypoint used by the CLI.
pub fn run_with<'a, R: Repository>(
    registry: &'a ServiceRegistry,
    store: &'a RecordStore<R>,
    on_write: impl FnMut(&str, &WriteResult) + 'a,
) -> Result<SyncReport, SyncError> {
    Orchestrator::new(registry, store).on_write(on_write).run()
}

/// Push the store's working tree. Never chained automatically after a run.
pub fn push<R: Repository>(store: &RecordStore<R>) -> Result<(), StoreError> {
    store.push().inspect_err(|err| {
        tracing::error!(error = %error_chain(err), "push failed");
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
