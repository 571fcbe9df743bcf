//! Layered configuration: defaults, then `forge.toml`, then `FORGE_*`
//! environment variables. CLI flags on the root binary override whatever
//! comes out of this chain for the handful of values that make sense as
//! flags (`--keep-workspace`, `--push`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ForgeError, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    pub max_correction_rounds: u32,
    pub task_timeout_ms: u64,
    pub keep_workspace: bool,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            max_correction_rounds: 5,
            task_timeout_ms: 15 * 60 * 1000,
            keep_workspace: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    pub per_task_token_limit: u64,
    pub per_task_cost_usd: Option<f64>,
    pub monthly_token_limit: Option<u64>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            per_task_token_limit: 200_000,
            per_task_cost_usd: None,
            monthly_token_limit: None,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub build_timeout_ms: u64,
    pub run_build: bool,
    pub enable_tests: bool,
    pub enable_auto_fix: bool,
    pub enable_atomic_edits: bool,
    pub enable_structured_errors: bool,
    pub enable_repository_index: bool,
    pub enable_planning_preview: bool,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            build_timeout_ms: 60_000,
            run_build: true,
            enable_tests: false,
            enable_auto_fix: true,
            enable_atomic_edits: true,
            enable_structured_errors: true,
            enable_repository_index: true,
            enable_planning_preview: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub workspaces_root: PathBuf,
    pub push_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            workspaces_root: PathBuf::from("workspaces"),
            push_enabled: false,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ForgeConfig {
    pub correction: CorrectionConfig,
    pub budget: BudgetConfig,
    pub validation: ValidationConfig,
    pub storage: StorageConfig,
}

impl ForgeConfig {
    /// Defaults, then `path` (if it exists), then `FORGE_*` env overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = Self::default();

        if let Some(path) = path {
            if path.exists() {
                let text = std::fs::read_to_string(path)?;
                cfg = toml::from_str(&text)
                    .map_err(|e| ForgeError::Config(format!("{}: {}", path.display(), e)))?;
            }
        }

        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("FORGE_MAX_CORRECTION_ROUNDS") {
            if let Ok(n) = v.parse() {
                self.correction.max_correction_rounds = n;
            }
        }
        if let Ok(v) = std::env::var("FORGE_TASK_TIMEOUT_MS") {
            if let Ok(n) = v.parse() {
                self.correction.task_timeout_ms = n;
            }
        }
        if let Ok(v) = std::env::var("FORGE_PER_TASK_TOKEN_LIMIT") {
            if let Ok(n) = v.parse() {
                self.budget.per_task_token_limit = n;
            }
        }
        if let Ok(v) = std::env::var("FORGE_PER_TASK_COST_USD") {
            if let Ok(n) = v.parse() {
                self.budget.per_task_cost_usd = Some(n);
            }
        }
        if let Ok(v) = std::env::var("FORGE_MONTHLY_TOKEN_LIMIT") {
            if let Ok(n) = v.parse() {
                self.budget.monthly_token_limit = Some(n);
            }
        }
        if let Ok(v) = std::env::var("FORGE_WORKSPACES_ROOT") {
            self.storage.workspaces_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("FORGE_PUSH_ENABLED") {
            self.storage.push_enabled = parse_bool(&v, self.storage.push_enabled);
        }
        if let Ok(v) = std::env::var("FORGE_KEEP_WORKSPACE") {
            self.correction.keep_workspace = parse_bool(&v, self.correction.keep_workspace);
        }
    }
}

fn parse_bool(v: &str, default: bool) -> bool {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let cfg = ForgeConfig::default();
        assert_eq!(cfg.correction.max_correction_rounds, 5);
        assert_eq!(cfg.budget.per_task_token_limit, 200_000);
        assert!(cfg.validation.run_build);
        assert!(!cfg.storage.push_enabled);
    }

    #[test]
    fn load_missing_path_falls_back_to_defaults() {
        let cfg = ForgeConfig::load(Some(Path::new("/nonexistent/forge.toml"))).unwrap();
        assert_eq!(cfg.correction.max_correction_rounds, 5);
    }

    #[test]
    fn load_parses_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forge.toml");
        std::fs::write(
            &path,
            r#"
            [correction]
            max_correction_rounds = 3

            [budget]
            per_task_token_limit = 50000
            "#,
        )
        .unwrap();
        let cfg = ForgeConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.correction.max_correction_rounds, 3);
        assert_eq!(cfg.budget.per_task_token_limit, 50_000);
        // untouched sections keep their defaults
        assert!(cfg.validation.run_build);
    }
}
