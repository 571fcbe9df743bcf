//! End-to-end workspace lifecycle tests against real git repos.

use forge_core::{ProjectId, TaskId};
use forge_git::GitManager;
use forge_workspace::WorkspaceManager;
use std::process::Command;
use std::time::Duration;

fn init_remote(dir: &std::path::Path) {
    let run = |args: &[&str]| {
        let status = Command::new("git")
            .args(args)
            .current_dir(dir)
            .status()
            .unwrap();
        assert!(status.success());
    };
    std::fs::create_dir_all(dir).unwrap();
    run(&["init", "-q"]);
    run(&["config", "user.email", "forge@example.com"]);
    run(&["config", "user.name", "forge"]);
    std::fs::write(dir.join("index.ts"), "export const x = 1;\n").unwrap();
    run(&["add", "."]);
    run(&["commit", "-q", "-m", "initial"]);
}

#[tokio::test]
async fn ensure_base_clones_when_missing() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = tmp.path().join("remote");
    init_remote(&remote);

    let root = tmp.path().join("workspaces");
    let manager = WorkspaceManager::new(&root, GitManager::new(Duration::from_secs(30)));
    let project = ProjectId::new("proj1");

    manager
        .ensure_base(&project, &remote.to_string_lossy())
        .await
        .unwrap();

    assert!(manager.base_dir(&project).join(".git").exists());
    assert!(manager.base_dir(&project).join("index.ts").exists());
}

#[tokio::test]
async fn create_and_cleanup_task_workspace() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = tmp.path().join("remote");
    init_remote(&remote);

    let root = tmp.path().join("workspaces");
    let manager = WorkspaceManager::new(&root, GitManager::new(Duration::from_secs(30)));
    let project = ProjectId::new("proj1");
    let task = TaskId::new("deadbeefcafe0000");

    manager
        .ensure_base(&project, &remote.to_string_lossy())
        .await
        .unwrap();

    let task_dir = manager
        .create_task_workspace(&project, &task)
        .await
        .unwrap();
    assert!(task_dir.join("index.ts").exists());

    // mutating the task workspace must never reach .base
    std::fs::write(task_dir.join("scratch.ts"), "export {};").unwrap();
    assert!(!manager.base_dir(&project).join("scratch.ts").exists());

    manager
        .cleanup_task_workspace(&project, &task, false)
        .unwrap();
    assert!(!task_dir.exists());
}

#[tokio::test]
async fn cleanup_respects_keep_flag() {
    let tmp = tempfile::tempdir().unwrap();
    let remote = tmp.path().join("remote");
    init_remote(&remote);

    let root = tmp.path().join("workspaces");
    let manager = WorkspaceManager::new(&root, GitManager::new(Duration::from_secs(30)));
    let project = ProjectId::new("proj1");
    let task = TaskId::new("feedfacecafe0000");

    manager
        .ensure_base(&project, &remote.to_string_lossy())
        .await
        .unwrap();
    let task_dir = manager
        .create_task_workspace(&project, &task)
        .await
        .unwrap();

    manager.cleanup_task_workspace(&project, &task, true).unwrap();
    assert!(task_dir.exists());
}
