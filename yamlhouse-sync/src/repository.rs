//! Version-control capability used by the record store.
//!
//! [`Repository`] is the seam; [`GitCli`] drives the `git` binary.

use std::path::Path;
use std::process::{Command, Output};

use crate::error::RepositorySyncError;

/// Clone / pull / stage-all / commit / push over a working tree.
pub trait Repository {
    /// Whether `path` already holds a working tree.
    fn is_working_tree(&self, path: &Path) -> bool;

    fn clone_repo(&self, url: &str, path: &Path) -> Result<(), RepositorySyncError>;

    fn pull(&self, path: &Path) -> Result<(), RepositorySyncError>;

    /// Stage every addition, modification and deletion in the tree.
    fn stage_all(&self, path: &Path) -> Result<(), RepositorySyncError>;

    fn has_staged_changes(&self, path: &Path) -> Result<bool, RepositorySyncError>;

    fn commit(&self, path: &Path, message: &str) -> Result<(), RepositorySyncError>;

    fn push(&self, path: &Path) -> Result<(), RepositorySyncError>;
}

// ---------------------------------------------------------------------------
// git CLI
// ---------------------------------------------------------------------------

/// [`Repository`] backed by the `git` executable on `PATH`.
#[derive(Debug, Clone, Default)]
pub struct GitCli {
    identity: Option<(String, String)>,
}

impl GitCli {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit as `name <email>` regardless of the user's git config.
    pub fn with_identity(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            identity: Some((name.into(), email.into())),
        }
    }

    fn command(&self, dir: Option<&Path>) -> Command {
        let mut cmd = Command::new("git");
        cmd.env("GIT_TERMINAL_PROMPT", "0");
        if let Some(dir) = dir {
            cmd.arg("-C").arg(dir);
        }
        if let Some((name, email)) = &self.identity {
            cmd.arg("-c")
                .arg(format!("user.name={name}"))
                .arg("-c")
                .arg(format!("user.email={email}"));
        }
        cmd
    }

    fn output(
        &self,
        op: &'static str,
        path: &Path,
        mut cmd: Command,
    ) -> Result<Output, RepositorySyncError> {
        tracing::debug!(op, path = %path.display(), "git");
        cmd.output().map_err(|e| RepositorySyncError {
            op,
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }

    /// Run `git -C <path> <args>` and require a zero exit status.
    fn run(&self, op: &'static str, path: &Path, args: &[&str]) -> Result<(), RepositorySyncError> {
        let mut cmd = self.command(Some(path));
        cmd.args(args);
        let output = self.output(op, path, cmd)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(failure(op, path, &output))
        }
    }
}

impl GitCli {
    /// Whether `origin` holds the branch checked out in `path`.
    ///
    /// A remote that was cloned empty and never pushed to has no such ref,
    /// and `git pull` would fail against it.
    fn remote_has_current_branch(&self, path: &Path) -> Result<bool, RepositorySyncError> {
        let mut cmd = self.command(Some(path));
        cmd.args(["symbolic-ref", "--quiet", "--short", "HEAD"]);
        let output = self.output("symbolic-ref", path, cmd)?;
        if !output.status.success() {
            return Err(failure("symbolic-ref", path, &output));
        }
        let branch = String::from_utf8_lossy(&output.stdout).trim().to_owned();

        let mut cmd = self.command(Some(path));
        cmd.args(["ls-remote", "--exit-code", "--heads", "origin"])
            .arg(format!("refs/heads/{branch}"));
        let output = self.output("ls-remote", path, cmd)?;
        match output.status.code() {
            Some(0) => Ok(true),
            // --exit-code: no matching refs
            Some(2) => Ok(false),
            _ => Err(failure("ls-remote", path, &output)),
        }
    }
}

fn failure(op: &'static str, path: &Path, output: &Output) -> RepositorySyncError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    RepositorySyncError {
        op,
        path: path.to_path_buf(),
        detail: format!("{} ({})", stderr.trim(), output.status),
    }
}

impl Repository for GitCli {
    fn is_working_tree(&self, path: &Path) -> bool {
        path.join(".git").exists()
    }

    fn clone_repo(&self, url: &str, path: &Path) -> Result<(), RepositorySyncError> {
        let mut cmd = self.command(None);
        cmd.arg("clone").arg(url).arg(path);
        let output = self.output("clone", path, cmd)?;
        if output.status.success() {
            Ok(())
        } else {
            Err(failure("clone", path, &output))
        }
    }

    fn pull(&self, path: &Path) -> Result<(), RepositorySyncError> {
        if !self.remote_has_current_branch(path)? {
            tracing::debug!(path = %path.display(), "remote has no copy of the current branch; nothing to pull");
            return Ok(());
        }
        self.run("pull", path, &["pull", "--ff-only"])
    }

    fn stage_all(&self, path: &Path) -> Result<(), RepositorySyncError> {
        self.run("add", path, &["add", "--all"])
    }

    fn has_staged_changes(&self, path: &Path) -> Result<bool, RepositorySyncError> {
        let mut cmd = self.command(Some(path));
        cmd.args(["diff", "--cached", "--quiet"]);
        let output = self.output("diff", path, cmd)?;
        match output.status.code() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(failure("diff", path, &output)),
        }
    }

    fn commit(&self, path: &Path, message: &str) -> Result<(), RepositorySyncError> {
        self.run("commit", path, &["commit", "--message", message])
    }

    fn push(&self, path: &Path) -> Result<(), RepositorySyncError> {
        self.run("push", path, &["push", "--set-upstream", "origin", "HEAD"])
    }
}

// ---------------------------------------------------------------------------
// In-memory double for unit tests
// ---------------------------------------------------------------------------
