//! Versioned record store: one YAML file per record inside a git working tree.
//!
//! ## Layout
//!
//! ```text
//! <root>/<service>/<path_1>/.../<path_n>/<id>.yml
//! ```
//!
//! ## `atomic_write`: hash-gated protocol
//!
//! 1. Normalise line endings to LF.
//! 2. SHA-256 hash the content.
//! 3. Hash the file on disk, if any → skip if identical.
//! 4. Write to `<path>.yamlhouse.tmp`.
//! 5. Rename to final path (atomic on POSIX).

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use yamlhouse_core::{Record, RepositoryConfig};

use crate::error::{io_err, StoreError};
use crate::repository::Repository;

/// File extension of every store entry.
pub const ENTRY_EXTENSION: &str = "yml";

/// Suffix of the scratch file an entry is written to before the rename.
const TMP_SUFFIX: &str = ".yamlhouse.tmp";

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of an individual file write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteResult {
    /// File was written (content changed or did not previously exist).
    Written { path: PathBuf },
    /// File was skipped; content matches what is on disk.
    Unchanged { path: PathBuf },
    /// `--dry-run` mode: the file *would* have been written.
    WouldWrite { path: PathBuf },
}

impl WriteResult {
    pub fn path(&self) -> &Path {
        match self {
            WriteResult::Written { path }
            | WriteResult::Unchanged { path }
            | WriteResult::WouldWrite { path } => path,
        }
    }
}

/// How the working tree was prepared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeStatus {
    Cloned,
    Pulled,
}

/// Outcome of [`RecordStore::commit_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    NothingToCommit,
    DryRun,
}

// ---------------------------------------------------------------------------
// atomic_write
// ---------------------------------------------------------------------------

fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Atomically write `content` to `path` unless the file already holds it.
pub(crate) fn atomic_write(
    path: &Path,
    content: &str,
    dry_run: bool,
) -> Result<WriteResult, StoreError> {
    let tmp = PathBuf::from(format!("{}{TMP_SUFFIX}", path.display()));
    atomic_write_with_tmp(path, content, dry_run, &tmp)
}

fn atomic_write_with_tmp(
    path: &Path,
    content: &str,
    dry_run: bool,
    tmp: &Path,
) -> Result<WriteResult, StoreError> {
    let normalized = content.replace("\r\n", "\n");
    let content = normalized.as_str();

    let digest = sha256_hex(content.as_bytes());
    match std::fs::read(path) {
        Ok(existing) if sha256_hex(&existing) == digest => {
            tracing::debug!("unchanged: {}", path.display());
            return Ok(WriteResult::Unchanged {
                path: path.to_path_buf(),
            });
        }
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => return Err(io_err(path, e)),
    }

    if dry_run {
        tracing::info!("[dry-run] would write: {}", path.display());
        return Ok(WriteResult::WouldWrite {
            path: path.to_path_buf(),
        });
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    if let Some(tmp_parent) = tmp.parent() {
        std::fs::create_dir_all(tmp_parent).map_err(|e| io_err(tmp_parent, e))?;
    }
    std::fs::write(tmp, content).map_err(|e| io_err(tmp, e))?;

    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(io_err(path, e));
    }

    tracing::debug!("wrote: {}", path.display());
    Ok(WriteResult::Written {
        path: path.to_path_buf(),
    })
}

/// Delete scratch files left behind by an interrupted write, so the next
/// stage-all cannot pick them up. Returns how many were removed.
fn sweep_stale_tmp(dir: &Path) -> Result<usize, StoreError> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(io_err(dir, e)),
    };
    let mut removed = 0;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_err(&path, e))?;
        if file_type.is_dir() {
            if entry.file_name() != ".git" {
                removed += sweep_stale_tmp(&path)?;
            }
        } else if entry.file_name().to_string_lossy().ends_with(TMP_SUFFIX) {
            std::fs::remove_file(&path).map_err(|e| io_err(&path, e))?;
            tracing::warn!("removed stale scratch file: {}", path.display());
            removed += 1;
        }
    }
    Ok(removed)
}

// ---------------------------------------------------------------------------
// Entry layout and content
// ---------------------------------------------------------------------------

/// Reject anything that would not stay a single directory level.
fn checked_segment(segment: &str) -> Result<&str, StoreError> {
    let reason = if segment.is_empty() {
        Some("empty")
    } else if segment == "." || segment == ".." {
        Some("relative component")
    } else if segment.contains(['/', '\\', '\0']) {
        Some("contains a path separator")
    } else if segment == ".git" {
        Some("reserved by git")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(StoreError::InvalidSegment {
            segment: segment.to_owned(),
            reason,
        }),
        None => Ok(segment),
    }
}

/// `<service>/<path...>/<id>.yml`, relative to the store root.
pub fn entry_relative_path(service: &str, record: &Record) -> Result<PathBuf, StoreError> {
    let mut rel = PathBuf::from(checked_segment(service)?);
    for segment in record.path() {
        rel.push(checked_segment(segment)?);
    }
    let id = checked_segment(record.id().as_str())?;
    rel.push(format!("{id}.{ENTRY_EXTENSION}"));
    Ok(rel)
}

/// YAML document for a record: `id`, `path`, then fields in key order.
pub fn render_entry(record: &Record) -> Result<String, StoreError> {
    use serde_yaml::{Mapping, Value};

    let mut doc = Mapping::new();
    doc.insert(Value::from("id"), Value::from(record.id().as_str()));
    doc.insert(Value::from("path"), serde_yaml::to_value(record.path())?);
    for (key, value) in record.fields() {
        if key == "id" || key == "path" {
            tracing::debug!(record = %record.id(), field = %key, "field shadows address key; dropped");
            continue;
        }
        doc.insert(Value::from(key.as_str()), serde_yaml::to_value(value)?);
    }
    Ok(serde_yaml::to_string(&doc)?)
}

// ---------------------------------------------------------------------------
// RecordStore
// ---------------------------------------------------------------------------

/// Records materialised under a working tree, committed once per run.
///
/// The store assumes exclusive use of its working tree for the length of a
/// run; callers serialise runs against the same root.
pub struct RecordStore<R: Repository> {
    root: PathBuf,
    remote_url: String,
    repo: R,
    dry_run: bool,
}

impl<R: Repository> RecordStore<R> {
    pub fn new(root: impl Into<PathBuf>, remote_url: impl Into<String>, repo: R) -> Self {
        Self {
            root: root.into(),
            remote_url: remote_url.into(),
            repo,
            dry_run: false,
        }
    }

    pub fn from_config(config: &RepositoryConfig, repo: R) -> Self {
        Self::new(config.path.clone(), config.url.clone(), repo)
    }

    /// Report writes without touching files; skip commit.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Pull an existing working tree, or clone the remote into `root`.
    ///
    /// Outside dry run, scratch files from an interrupted earlier run are
    /// removed from an existing tree first.
    pub fn ensure_working_tree(&self) -> Result<TreeStatus, StoreError> {
        if self.repo.is_working_tree(&self.root) {
            if !self.dry_run {
                sweep_stale_tmp(&self.root)?;
            }
            self.repo.pull(&self.root)?;
            tracing::info!(root = %self.root.display(), "pulled working tree");
            Ok(TreeStatus::Pulled)
        } else {
            self.repo.clone_repo(&self.remote_url, &self.root)?;
            tracing::info!(root = %self.root.display(), url = %self.remote_url, "cloned working tree");
            Ok(TreeStatus::Cloned)
        }
    }

    /// Absolute location of a record's entry.
    pub fn entry_path(&self, service: &str, record: &Record) -> Result<PathBuf, StoreError> {
        Ok(self.root.join(entry_relative_path(service, record)?))
    }

    /// Write one record, replacing whatever was at its location.
    pub fn write(&self, record: &Record, service: &str) -> Result<WriteResult, StoreError> {
        let path = self.entry_path(service, record)?;
        let content = render_entry(record)?;
        atomic_write(&path, &content, self.dry_run)
    }

    /// Stage everything and create one commit. Nothing staged is a no-op.
    pub fn commit_all(&self, message: &str) -> Result<CommitOutcome, StoreError> {
        if self.dry_run {
            return Ok(CommitOutcome::DryRun);
        }
        self.repo.stage_all(&self.root)?;
        if !self.repo.has_staged_changes(&self.root)? {
            tracing::info!("nothing to commit");
            return Ok(CommitOutcome::NothingToCommit);
        }
        self.repo.commit(&self.root, message)?;
        tracing::info!(message, "committed working tree");
        Ok(CommitOutcome::Committed)
    }

    /// Push the current branch to its remote.
    pub fn push(&self) -> Result<(), StoreError> {
        self.repo.push(&self.root)?;
        tracing::info!(root = %self.root.display(), "pushed working tree");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
