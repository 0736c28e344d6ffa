//! End-to-end runs against a local bare repository with the real `git` binary.
//!
//! Skipped when `git` is not on `PATH`.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;
use yamlhouse_core::Record;
use yamlhouse_services::{RecordStream, ServiceAdapter, ServiceRegistry};
use yamlhouse_sync::{pipeline, CommitStatus, GitCli, RecordStore, TreeStatus};

struct Fixed {
    records: Vec<Record>,
}

impl ServiceAdapter for Fixed {
    fn name(&self) -> &str {
        "alpha"
    }

    fn kind(&self) -> &'static str {
        "fixed"
    }

    fn produce_records(&self) -> RecordStream<'_> {
        Box::new(self.records.iter().cloned().map(Ok))
    }
}

fn task(id: &str, name: &str) -> Record {
    Record::new(id, vec!["p1".to_string()])
        .unwrap()
        .with_field("name", name)
        .with_field("completed", false)
}

fn registry(records: Vec<Record>) -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    registry.add_adapter(Box::new(Fixed { records }));
    registry
}

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .arg("-C")
        .arg(dir)
        .args(args)
        .output()
        .expect("run git");
    assert!(out.status.success(), "git {args:?}: {}", String::from_utf8_lossy(&out.stderr));
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn commit_count(dir: &Path) -> usize {
    git(dir, &["rev-list", "--count", "HEAD"]).trim().parse().unwrap()
}

#[test]
fn sync_commit_push_then_pull_from_second_clone() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }

    let tmp = TempDir::new().unwrap();
    let url = bare_remote(&tmp);

    let writer_root = tmp.path().join("writer");
    let writer = RecordStore::new(&writer_root, url.as_str(), GitCli::with_identity("sync", "sync@example.com"));

    let first = pipeline::run(&registry(vec![task("t1", "A"), task("t2", "B")]), &writer).unwrap();
    assert_eq!(first.commit, CommitStatus::Committed);
    assert_eq!(
        fs::read_to_string(writer_root.join("alpha/p1/t1.yml")).unwrap(),
        "id: t1\npath:\n- p1\ncompleted: false\nname: A\n"
    );
    pipeline::push(&writer).unwrap();

    let reader_root = tmp.path().join("reader");
    let reader = RecordStore::new(&reader_root, url.as_str(), GitCli::new());
    assert_eq!(reader.ensure_working_tree().unwrap(), TreeStatus::Cloned);
    assert!(reader_root.join("alpha/p1/t2.yml").exists());

    // Same content: tree pulled, nothing new to commit.
    let again = pipeline::run(&registry(vec![task("t1", "A"), task("t2", "B")]), &writer).unwrap();
    assert_eq!(again.commit, CommitStatus::NothingToCommit);
    assert_eq!(commit_count(&writer_root), 1);

    // Update one record and check the second clone picks it up.
    let third = pipeline::run(&registry(vec![task("t1", "A2"), task("t2", "B")]), &writer).unwrap();
    assert_eq!(third.commit, CommitStatus::Committed);
    assert_eq!(third.services[0].written, 1);
    assert_eq!(third.services[0].unchanged, 1);
    pipeline::push(&writer).unwrap();

    assert_eq!(reader.ensure_working_tree().unwrap(), TreeStatus::Pulled);
    let t1 = fs::read_to_string(reader_root.join("alpha/p1/t1.yml")).unwrap();
    assert!(t1.contains("name: A2"), "got: {t1}");
    assert_eq!(commit_count(&reader_root), 2);
}

fn bare_remote(tmp: &TempDir) -> String {
    let remote = tmp.path().join("remote.git");
    fs::create_dir_all(&remote).unwrap();
    git(&remote, &["init", "--bare", "--quiet"]);
    remote.to_string_lossy().into_owned()
}

#[test]
fn runs_against_a_never_pushed_remote_keep_working() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }

    let tmp = TempDir::new().unwrap();
    let url = bare_remote(&tmp);
    let root = tmp.path().join("tree");
    let store = RecordStore::new(&root, url.as_str(), GitCli::with_identity("sync", "sync@example.com"));

    let first = pipeline::run(&registry(vec![task("t1", "A")]), &store).unwrap();
    assert_eq!(first.commit, CommitStatus::Committed);

    // No push in between: the remote still has no branch to pull from.
    let second = pipeline::run(&registry(vec![task("t1", "A")]), &store).unwrap();
    assert_eq!(second.commit, CommitStatus::NothingToCommit);

    let third = pipeline::run(&registry(vec![task("t1", "A"), task("t2", "B")]), &store).unwrap();
    assert_eq!(third.commit, CommitStatus::Committed);
    assert_eq!(commit_count(&root), 2);

    // A later run with nothing new still publishes the waiting commits.
    let fourth = pipeline::run(&registry(vec![task("t1", "A"), task("t2", "B")]), &store).unwrap();
    assert_eq!(fourth.commit, CommitStatus::NothingToCommit);
    assert!(fourth.can_push());
    pipeline::push(&store).unwrap();

    let heads = git(Path::new(&url), &["for-each-ref", "--format=%(refname)", "refs/heads"]);
    assert!(!heads.trim().is_empty(), "remote received no branch");
    let after_push = pipeline::run(&registry(vec![task("t1", "A"), task("t2", "B")]), &store).unwrap();
    assert_eq!(after_push.commit, CommitStatus::NothingToCommit);
}

#[test]
fn unreachable_remote_aborts_before_any_write() {
    if !git_available() {
        eprintln!("git not available; skipping");
        return;
    }

    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("does-not-exist.git");
    let root = tmp.path().join("tree");
    let store = RecordStore::new(&root, missing.to_string_lossy(), GitCli::new());

    let err = pipeline::run(&registry(vec![task("t1", "A")]), &store).unwrap_err();
    assert!(err.to_string().contains("cannot prepare working tree"));
    assert!(!root.join("alpha").exists());
}
