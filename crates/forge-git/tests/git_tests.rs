//! Integration tests against real `git` subprocesses in temp directories.

use forge_git::GitManager;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

fn init_repo(dir: &Path) {
    let run = |args: &[&str]| {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .status()
            .expect("git available");
        assert!(status.success(), "git {:?} failed", args);
    };
    std::fs::create_dir_all(dir).unwrap();
    run(&["init", "-q"]);
    run(&["config", "user.email", "forge@example.com"]);
    run(&["config", "user.name", "forge"]);
    std::fs::write(dir.join("README.md"), "hello\n").unwrap();
    run(&["add", "."]);
    run(&["commit", "-q", "-m", "initial"]);
}

#[tokio::test]
async fn local_clone_creates_disjoint_working_copy() {
    let root = tempfile::tempdir().unwrap();
    let base = root.path().join("base");
    init_repo(&base);

    let manager = GitManager::new(Duration::from_secs(30));
    let task_dir = root.path().join("task-aaaaaaaa");
    manager.local_clone(&base, &task_dir).await.unwrap();

    assert!(task_dir.join("README.md").exists());

    // mutating the task clone must not touch base
    std::fs::write(task_dir.join("new.txt"), "x").unwrap();
    assert!(!base.join("new.txt").exists());
}

#[tokio::test]
async fn create_branch_commit_and_log_roundtrip() {
    let root = tempfile::tempdir().unwrap();
    let base = root.path().join("base");
    init_repo(&base);

    let manager = GitManager::new(Duration::from_secs(30));
    let task_dir = root.path().join("task-deadbeef");
    manager.local_clone(&base, &task_dir).await.unwrap();

    manager
        .create_branch(&task_dir, "forge/task-deadbeef")
        .await
        .unwrap();

    std::fs::write(task_dir.join("feature.txt"), "feature\n").unwrap();
    manager
        .stage(&task_dir, &["feature.txt".to_string()])
        .await
        .unwrap();
    let hash = manager
        .commit(&task_dir, "add feature\nwith a body line")
        .await
        .unwrap();
    assert_eq!(hash.len(), 40);

    let log = manager.log(&task_dir, "HEAD", 5).await.unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0].subject, "add feature with a body line");
}

#[tokio::test]
async fn create_branch_rejects_non_conforming_name() {
    let root = tempfile::tempdir().unwrap();
    let base = root.path().join("base");
    init_repo(&base);

    let manager = GitManager::new(Duration::from_secs(30));
    let task_dir = root.path().join("task-x");
    manager.local_clone(&base, &task_dir).await.unwrap();

    let err = manager
        .create_branch(&task_dir, "feature/whatever")
        .await
        .unwrap_err();
    assert!(format!("{err}").contains("does not match"));
}

#[tokio::test]
async fn pull_failure_leaves_stale_base_untouched() {
    // a directory with no remote: `pull` fails, but the manager does not
    // mutate or delete anything on failure.
    let root = tempfile::tempdir().unwrap();
    let base = root.path().join("base");
    init_repo(&base);

    let manager = GitManager::new(Duration::from_secs(5));
    let before = std::fs::read_to_string(base.join("README.md")).unwrap();
    let result = manager.pull(&base).await;
    assert!(result.is_err());
    let after = std::fs::read_to_string(base.join("README.md")).unwrap();
    assert_eq!(before, after);
}
