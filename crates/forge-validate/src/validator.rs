//! Validator (component I). Runs type-check, lint, and tests in sequence,
//! each bounded by the same `run_bounded` subprocess helper the Git Manager
//! and bash tool use, parses their output into `StructuredError`s, and
//! attempts an in-place unused-import repair before giving the linter a
//! second (and final) chance.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use regex::{Regex, RegexBuilder};

use forge_core::config::ValidationConfig;
use forge_core::error::Result;
use forge_core::types::{Severity, StructuredError, TestResult, ValidationResult};
use forge_tools::subprocess::run_bounded;

pub struct Validator {
    timeout: Duration,
}

impl Validator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// `tsc --noEmit` (or the project's type-check equivalent). Failure is
    /// always reportable; whether it is fatal is the Correction
    /// Controller's call, gated on the baseline flag.
    pub async fn type_check(&self, workspace: &Path) -> Result<(bool, Vec<StructuredError>, String)> {
        let output = run_bounded("npx", &["tsc", "--noEmit"], workspace, self.timeout).await?;
        let combined = format!("{}\n{}", output.stdout, output.stderr);
        let structured = parse_tsc_errors(&combined);
        Ok((output.success, structured, combined))
    }

    /// Run the linter restricted to `changed_files`. If any structured
    /// error matches the "defined but never used" shape and auto-fix is
    /// enabled, rewrite the offending import block in place, then re-run
    /// `--fix` and re-lint once before returning the final result.
    pub async fn lint(
        &self,
        workspace: &Path,
        changed_files: &[String],
        auto_fix: bool,
    ) -> Result<(bool, Vec<StructuredError>, String)> {
        if changed_files.is_empty() {
            return Ok((true, Vec::new(), String::new()));
        }

        let mut args: Vec<&str> = vec!["eslint", "--format", "stylish"];
        args.extend(changed_files.iter().map(String::as_str));
        let output = run_bounded("npx", &args, workspace, self.timeout).await?;
        let combined = format!("{}\n{}", output.stdout, output.stderr);
        let mut structured = parse_eslint_stylish(&combined);

        if auto_fix && structured.iter().any(is_unused_import_error) {
            let repaired = repair_unused_imports(workspace, &structured)?;
            if !repaired.is_empty() {
                let mut fix_args: Vec<&str> = vec!["eslint", "--fix", "--format", "stylish"];
                fix_args.extend(changed_files.iter().map(String::as_str));
                let _ = run_bounded("npx", &fix_args, workspace, self.timeout).await?;

                let relint = run_bounded("npx", &args, workspace, self.timeout).await?;
                let relint_combined = format!("{}\n{}", relint.stdout, relint.stderr);
                structured = parse_eslint_stylish(&relint_combined);
                return Ok((relint.success, structured, relint_combined));
            }
        }

        Ok((output.success, structured, combined))
    }

    /// Run the project's test command. Gated on `ValidationConfig::enable_tests`
    /// by the caller; this method always runs when called.
    pub async fn run_tests(&self, workspace: &Path, command: &str, args: &[&str]) -> Result<TestResult> {
        let output = run_bounded(command, args, workspace, self.timeout).await?;
        let combined = format!("{}\n{}", output.stdout, output.stderr);
        let (passed, failed) = parse_test_counts(&combined);
        Ok(TestResult {
            passed,
            failed,
            raw_output: combined,
        })
    }

    /// Run the full validation sequence: type-check, lint, and
    /// (optionally) tests, then fold the results into one `ValidationResult`.
    /// `baseline_build_failed` is the flag captured before any edit was
    /// applied; when set, a type-check failure is recorded but does not by
    /// itself flip `success` to `false` unless lint or tests also fail.
    pub async fn validate(
        &self,
        workspace: &Path,
        changed_files: &[String],
        config: &ValidationConfig,
        baseline_build_failed: bool,
    ) -> Result<ValidationResult> {
        let mut structured = Vec::new();
        let mut raw_sections = Vec::new();
        let mut build_ok = true;

        if config.run_build {
            let (ok, errors, raw) = self.type_check(workspace).await?;
            build_ok = ok || baseline_build_failed;
            structured.extend(errors);
            raw_sections.push(raw);
        }

        let (lint_ok, lint_errors, lint_raw) = self
            .lint(workspace, changed_files, config.enable_auto_fix)
            .await?;
        structured.extend(lint_errors);
        raw_sections.push(lint_raw);

        let mut test_result = None;
        let mut tests_ok = true;
        if config.enable_tests {
            let result = self.run_tests(workspace, "npm", &["test", "--", "--watchAll=false"]).await?;
            tests_ok = result.failed == 0;
            raw_sections.push(result.raw_output.clone());
            test_result = Some(result);
        }

        let error_count = structured
            .iter()
            .filter(|e| e.severity == Severity::Error)
            .count();
        let warning_count = structured
            .iter()
            .filter(|e| e.severity == Severity::Warning)
            .count();

        Ok(ValidationResult {
            success: build_ok && lint_ok && tests_ok,
            error_count,
            warning_count,
            structured,
            raw_output: raw_sections.join("\n---\n"),
            test_result,
            baseline_build_failed,
        })
    }
}

fn tsc_error_regex() -> Regex {
    Regex::new(r"(?m)^(?P<file>[^\s()][^()\n]*?)\((?P<line>\d+),(?P<col>\d+)\):\s*error\s+(?P<rule>TS\d+):\s*(?P<message>.+)$")
        .unwrap()
}

fn parse_tsc_errors(raw: &str) -> Vec<StructuredError> {
    tsc_error_regex()
        .captures_iter(raw)
        .map(|c| StructuredError {
            file: c["file"].trim().to_string(),
            line: c["line"].parse().unwrap_or(0),
            col: c["col"].parse().unwrap_or(0),
            rule: Some(c["rule"].to_string()),
            severity: Severity::Error,
            message: c["message"].trim().to_string(),
        })
        .collect()
}

/// ESLint `stylish` output: a file-path header line, followed by one line
/// per finding (`  12:5  error  message  rule-name`).
fn parse_eslint_stylish(raw: &str) -> Vec<StructuredError> {
    let finding = Regex::new(
        r"^\s*(?P<line>\d+):(?P<col>\d+)\s+(?P<severity>error|warning)\s+(?P<message>.+?)\s{2,}(?P<rule>[\w@/-]+)\s*$",
    )
    .unwrap();

    let mut current_file = String::new();
    let mut out = Vec::new();

    for line in raw.lines() {
        if line.is_empty() || line.starts_with(' ') {
            if let Some(c) = finding.captures(line) {
                let severity = if &c["severity"] == "error" {
                    Severity::Error
                } else {
                    Severity::Warning
                };
                out.push(StructuredError {
                    file: current_file.clone(),
                    line: c["line"].parse().unwrap_or(0),
                    col: c["col"].parse().unwrap_or(0),
                    rule: Some(c["rule"].to_string()),
                    severity,
                    message: c["message"].trim().to_string(),
                });
            }
        } else if line.contains('/') || line.contains('\\') {
            current_file = line.trim().to_string();
        }
    }

    out
}

fn unused_import_name(message: &str) -> Option<String> {
    let re = Regex::new(r"'([^']+)' is defined but never used").unwrap();
    re.captures(message).map(|c| c[1].to_string())
}

fn is_unused_import_error(error: &StructuredError) -> bool {
    unused_import_name(&error.message).is_some()
}

fn parse_test_counts(raw: &str) -> (u32, u32) {
    // jest: "Tests:       2 failed, 8 passed, 10 total"
    if let Some(c) = Regex::new(r"Tests:\s+(?:(\d+)\s+failed,\s*)?(\d+)\s+passed").unwrap().captures(raw) {
        let failed = c.get(1).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        let passed = c.get(2).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        return (passed, failed);
    }
    // mocha: "10 passing" / "2 failing"
    let passing = Regex::new(r"(\d+)\s+passing").unwrap();
    let failing = Regex::new(r"(\d+)\s+failing").unwrap();
    let passed = passing
        .captures(raw)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);
    let failed = failing
        .captures(raw)
        .and_then(|c| c[1].parse().ok())
        .unwrap_or(0);
    (passed, failed)
}

/// For each file with at least one "defined but never used" finding,
/// rewrite the offending `import { … }` block to drop those specifiers. If
/// the named-import list empties, drop the whole statement — unless a
/// leading default import is present, in which case that default import is
/// kept on its own.
fn repair_unused_imports(workspace: &Path, errors: &[StructuredError]) -> Result<Vec<String>> {
    let mut by_file: HashMap<String, Vec<String>> = HashMap::new();
    for error in errors {
        if let Some(name) = unused_import_name(&error.message) {
            by_file.entry(error.file.clone()).or_default().push(name);
        }
    }

    let import_re = RegexBuilder::new(
        r#"import\s+(?:(?P<default>[\w$]+)\s*,\s*)?\{\s*(?P<names>[^}]*)\s*\}\s*from\s*(?P<source>['"][^'"]+['"]);?"#,
    )
    .dot_matches_new_line(true)
    .build()
    .unwrap();

    let mut touched = Vec::new();

    for (file, unused) in &by_file {
        let path = workspace.join(file);
        let Ok(content) = std::fs::read_to_string(&path) else {
            continue;
        };

        let rewritten = import_re.replace_all(&content, |caps: &regex::Captures| {
            let default_import = caps.name("default").map(|m| m.as_str().to_string());
            let source = caps["source"].to_string();
            let remaining: Vec<String> = caps["names"]
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .filter(|spec| {
                    let bare = spec.split_whitespace().next().unwrap_or(spec);
                    !unused.iter().any(|u| u == bare)
                })
                .map(str::to_string)
                .collect();

            match (remaining.is_empty(), &default_import) {
                (true, Some(default)) => format!("import {default} from {source};"),
                (true, None) => String::new(),
                (false, Some(default)) => {
                    format!("import {default}, {{ {} }} from {source};", remaining.join(", "))
                }
                (false, None) => format!("import {{ {} }} from {source};", remaining.join(", ")),
            }
        });

        if rewritten != content {
            std::fs::write(&path, rewritten.as_ref())?;
            touched.push(file.clone());
        }
    }

    Ok(touched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tsc_error_format() {
        let raw = "src/a.ts(12,5): error TS2345: Argument of type 'string' is not assignable.\n";
        let errors = parse_tsc_errors(raw);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file, "src/a.ts");
        assert_eq!(errors[0].line, 12);
        assert_eq!(errors[0].rule.as_deref(), Some("TS2345"));
    }

    #[test]
    fn parses_eslint_stylish_with_file_header() {
        let raw = "/repo/src/page.tsx\n  3:10  error  'Button' is defined but never used  no-unused-vars\n\n";
        let errors = parse_eslint_stylish(raw);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].file, "/repo/src/page.tsx");
        assert_eq!(errors[0].rule.as_deref(), Some("no-unused-vars"));
        assert!(is_unused_import_error(&errors[0]));
    }

    #[test]
    fn parse_test_counts_handles_jest_format() {
        let raw = "Tests:       2 failed, 8 passed, 10 total\n";
        assert_eq!(parse_test_counts(raw), (8, 2));
    }

    #[test]
    fn parse_test_counts_handles_mocha_format() {
        let raw = "  10 passing (200ms)\n  2 failing\n";
        assert_eq!(parse_test_counts(raw), (10, 2));
    }

    #[test]
    fn repair_unused_imports_drops_single_specifier() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/page.tsx"),
            "import { Button, Card } from './ui';\n\nexport const Page = () => <Card />;\n",
        )
        .unwrap();

        let errors = vec![StructuredError {
            file: "src/page.tsx".to_string(),
            line: 1,
            col: 10,
            rule: Some("no-unused-vars".to_string()),
            severity: Severity::Error,
            message: "'Button' is defined but never used".to_string(),
        }];

        let touched = repair_unused_imports(dir.path(), &errors).unwrap();
        assert_eq!(touched, vec!["src/page.tsx".to_string()]);

        let result = std::fs::read_to_string(dir.path().join("src/page.tsx")).unwrap();
        assert!(result.contains("import { Card } from './ui';"));
        assert!(!result.contains("Button"));
    }

    #[test]
    fn repair_unused_imports_drops_whole_statement_when_emptied() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/page.tsx"),
            "import { Button } from './ui';\n\nexport const Page = () => null;\n",
        )
        .unwrap();

        let errors = vec![StructuredError {
            file: "src/page.tsx".to_string(),
            line: 1,
            col: 10,
            rule: Some("no-unused-vars".to_string()),
            severity: Severity::Error,
            message: "'Button' is defined but never used".to_string(),
        }];

        repair_unused_imports(dir.path(), &errors).unwrap();
        let result = std::fs::read_to_string(dir.path().join("src/page.tsx")).unwrap();
        assert!(!result.contains("import"));
    }

    #[test]
    fn repair_unused_imports_preserves_leading_default_import() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(
            dir.path().join("src/page.tsx"),
            "import React, { useEffect } from 'react';\n",
        )
        .unwrap();

        let errors = vec![StructuredError {
            file: "src/page.tsx".to_string(),
            line: 1,
            col: 17,
            rule: Some("no-unused-vars".to_string()),
            severity: Severity::Error,
            message: "'useEffect' is defined but never used".to_string(),
        }];

        repair_unused_imports(dir.path(), &errors).unwrap();
        let result = std::fs::read_to_string(dir.path().join("src/page.tsx")).unwrap();
        assert_eq!(result.trim(), "import React from 'react';");
    }
}
