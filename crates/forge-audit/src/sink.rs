//! `RecordSink` — the persistence boundary for the record shapes
//! `forge-engine` produces but this workspace does not own storage for
//! (§6's `code_changes`, `token_usage`, `audit_log`, `execution_events`
//! tables). `forge-engine` emits them as owned Rust values; a caller that
//! owns a real database supplies its own `RecordSink`. `JsonLinesSink` is
//! the default so the engine is runnable standalone without assuming any
//! particular external store.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use forge_core::error::Result;
use forge_core::ids::TaskId;
use forge_core::types::{CodeChange, ExecutionEvent, TokenUsage};

use crate::record::AuditRecord;

pub trait RecordSink: Send + Sync {
    fn persist_code_change(&self, change: &CodeChange) -> Result<()>;
    fn persist_token_usage(&self, task_id: &TaskId, usage: &TokenUsage) -> Result<()>;
    fn append_audit(&self, record: &AuditRecord) -> Result<()>;
    fn append_event(&self, event: &ExecutionEvent) -> Result<()>;
}

#[derive(serde::Serialize)]
struct TokenUsageRow<'a> {
    task_id: &'a TaskId,
    #[serde(flatten)]
    usage: &'a TokenUsage,
    recorded_at: chrono::DateTime<chrono::Utc>,
}

/// Appends one JSON object per line to four files under a root directory,
/// one per §6 record shape. Each file is opened once and held behind its
/// own `Mutex`, so a write to `code_changes.jsonl` never blocks a writer
/// appending to `execution_events.jsonl`.
pub struct JsonLinesSink {
    code_changes: Mutex<File>,
    token_usage: Mutex<File>,
    audit_log: Mutex<File>,
    execution_events: Mutex<File>,
}

impl JsonLinesSink {
    pub fn open(root: &Path) -> Result<Self> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            code_changes: Mutex::new(open_append(&root.join("code_changes.jsonl"))?),
            token_usage: Mutex::new(open_append(&root.join("token_usage.jsonl"))?),
            audit_log: Mutex::new(open_append(&root.join("audit_log.jsonl"))?),
            execution_events: Mutex::new(open_append(&root.join("execution_events.jsonl"))?),
        })
    }
}

fn open_append(path: &Path) -> Result<File> {
    Ok(OpenOptions::new().create(true).append(true).open(path)?)
}

fn write_line(file: &Mutex<File>, value: &impl serde::Serialize) -> Result<()> {
    let line = serde_json::to_string(value)?;
    let mut guard = file.lock().expect("jsonl sink mutex poisoned");
    writeln!(guard, "{line}")?;
    Ok(())
}

impl RecordSink for JsonLinesSink {
    fn persist_code_change(&self, change: &CodeChange) -> Result<()> {
        write_line(&self.code_changes, change)
    }

    fn persist_token_usage(&self, task_id: &TaskId, usage: &TokenUsage) -> Result<()> {
        write_line(
            &self.token_usage,
            &TokenUsageRow {
                task_id,
                usage,
                recorded_at: chrono::Utc::now(),
            },
        )
    }

    fn append_audit(&self, record: &AuditRecord) -> Result<()> {
        write_line(&self.audit_log, record)
    }

    fn append_event(&self, event: &ExecutionEvent) -> Result<()> {
        write_line(&self.execution_events, event)
    }
}
