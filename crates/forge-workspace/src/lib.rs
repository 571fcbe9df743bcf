//! Workspace Manager — per-project cached clone, per-task isolated clones,
//! dependency linking, cleanup.
//!
//! Layout on disk:
//!
//! ```text
//! workspaces/
//!   <project_id>/
//!     .base/                (git clone, node_modules installed)
//!     task-<8hex>/          (isolated working copy; branch forge/task-<8hex>)
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

use forge_core::error::Result;
use forge_core::{ProjectId, TaskId};
use forge_git::GitManager;

pub enum PackageManager {
    Pnpm,
    Yarn,
    Npm,
}

impl PackageManager {
    /// Detect by lock file presence, pnpm first (matches the priority order
    /// a real monorepo toolchain resolves in).
    pub fn detect(dir: &Path) -> Option<Self> {
        if dir.join("pnpm-lock.yaml").exists() {
            Some(Self::Pnpm)
        } else if dir.join("yarn.lock").exists() {
            Some(Self::Yarn)
        } else if dir.join("package.json").exists() {
            Some(Self::Npm)
        } else {
            None
        }
    }

    fn install_command(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            Self::Pnpm => ("pnpm", &["install", "--frozen-lockfile"]),
            Self::Yarn => ("yarn", &["install", "--frozen-lockfile"]),
            Self::Npm => ("npm", &["ci"]),
        }
    }
}

pub struct WorkspaceManager {
    root: PathBuf,
    git: GitManager,
    install_timeout: Duration,
}

impl WorkspaceManager {
    pub fn new(root: impl Into<PathBuf>, git: GitManager) -> Self {
        Self {
            root: root.into(),
            git,
            install_timeout: Duration::from_secs(180),
        }
    }

    pub fn project_root(&self, project_id: &ProjectId) -> PathBuf {
        self.root.join(project_id.as_str())
    }

    pub fn base_dir(&self, project_id: &ProjectId) -> PathBuf {
        self.project_root(project_id).join(".base")
    }

    pub fn task_dir(&self, project_id: &ProjectId, task_id: &TaskId) -> PathBuf {
        self.project_root(project_id)
            .join(task_id.workspace_dir_name())
    }

    /// Clone the project if `.base` doesn't exist yet; otherwise attempt a
    /// `pull`. A failed pull keeps the stale base rather than failing the
    /// task — see the Ordering guarantees in the concurrency model.
    pub async fn ensure_base(&self, project_id: &ProjectId, remote: &str) -> Result<()> {
        let base = self.base_dir(project_id);
        if base.join(".git").exists() {
            if let Err(e) = self.git.pull(&base).await {
                warn!(project = %project_id, error = %e, "base pull failed, keeping stale base");
            }
            return Ok(());
        }

        std::fs::create_dir_all(&self.project_root(project_id))?;
        self.git.clone(remote, &base).await
    }

    /// Install dependencies in `.base`, if a recognized package manager lock
    /// file is present. Failures are logged but never fatal — a task can
    /// still proceed against a `.base` whose dependencies failed to install;
    /// the validator will simply fail for reasons unrelated to this step.
    pub async fn ensure_base_dependencies(&self, project_id: &ProjectId) -> Result<()> {
        let base = self.base_dir(project_id);
        let Some(pm) = PackageManager::detect(&base) else {
            return Ok(());
        };
        let (bin, args) = pm.install_command();

        let result = tokio::time::timeout(
            self.install_timeout,
            Command::new(bin)
                .args(args)
                .current_dir(&base)
                .env("HUSKY", "0")
                .output(),
        )
        .await;

        match result {
            Ok(Ok(output)) if output.status.success() => {
                info!(project = %project_id, "base dependencies installed");
            }
            Ok(Ok(output)) => {
                warn!(
                    project = %project_id,
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "dependency install failed, continuing anyway"
                );
            }
            Ok(Err(e)) => {
                warn!(project = %project_id, error = %e, "failed to spawn dependency install");
            }
            Err(_) => {
                warn!(project = %project_id, "dependency install timed out, continuing anyway");
            }
        }
        Ok(())
    }

    /// `local_clone(.base, task-<8hex>)`, then link `.base/node_modules`
    /// into the new workspace. Falls back to a recursive copy if symlinks
    /// are unsupported on this platform.
    pub async fn create_task_workspace(
        &self,
        project_id: &ProjectId,
        task_id: &TaskId,
    ) -> Result<PathBuf> {
        let base = self.base_dir(project_id);
        let task_dir = self.task_dir(project_id, task_id);

        self.git.local_clone(&base, &task_dir).await?;

        let base_modules = base.join("node_modules");
        if base_modules.exists() {
            let task_modules = task_dir.join("node_modules");
            link_or_copy(&base_modules, &task_modules)?;
        }

        Ok(task_dir)
    }

    /// Recursively remove the task workspace unless `keep` is set.
    pub fn cleanup_task_workspace(
        &self,
        project_id: &ProjectId,
        task_id: &TaskId,
        keep: bool,
    ) -> Result<()> {
        if keep {
            return Ok(());
        }
        let task_dir = self.task_dir(project_id, task_id);
        if task_dir.exists() {
            std::fs::remove_dir_all(&task_dir)?;
        }
        Ok(())
    }
}

#[cfg(unix)]
fn link_or_copy(src: &Path, dest: &Path) -> Result<()> {
    match std::os::unix::fs::symlink(src, dest) {
        Ok(()) => Ok(()),
        Err(_) => copy_dir_recursive(src, dest),
    }
}

#[cfg(not(unix))]
fn link_or_copy(src: &Path, dest: &Path) -> Result<()> {
    copy_dir_recursive(src, dest)
}

fn copy_dir_recursive(src: &Path, dest: &Path) -> Result<()> {
    std::fs::create_dir_all(dest)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let dest_path = dest.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &dest_path)?;
        } else {
            std::fs::copy(entry.path(), dest_path)?;
        }
    }
    Ok(())
}
