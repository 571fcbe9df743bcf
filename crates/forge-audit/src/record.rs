//! Immutable audit records — one per LLM turn — and the append-only
//! execution trace. Content addressing uses `ring::digest` (SHA-256) over
//! UTF-8 input/output bytes, base64-encoded for storage.

use std::sync::Arc;

use ring::digest::{digest, SHA256};

use forge_core::ids::{TaskId, TraceId};
use forge_core::types::ExecutionEvent;

use crate::sink::RecordSink;

/// SHA-256 digest of `bytes`, base64-encoded.
pub fn content_hash(bytes: &str) -> String {
    let hash = digest(&SHA256, bytes.as_bytes());
    base64::Engine::encode(&base64::engine::general_purpose::STANDARD, hash.as_ref())
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AuditRecord {
    pub task_id: TaskId,
    pub agent: String,
    pub phase: String,
    pub input_hash: String,
    pub output_hash: String,
    pub sanitizer_warnings: Vec<String>,
    pub runtime_tag: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl AuditRecord {
    pub fn new(
        task_id: TaskId,
        agent: impl Into<String>,
        phase: impl Into<String>,
        input: &str,
        output: &str,
        sanitizer_warnings: Vec<String>,
        runtime_tag: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            agent: agent.into(),
            phase: phase.into(),
            input_hash: content_hash(input),
            output_hash: content_hash(output),
            sanitizer_warnings,
            runtime_tag: runtime_tag.into(),
            created_at: chrono::Utc::now(),
        }
    }
}

/// Append-only store of audit records and execution events, both shared by
/// `trace_id`. Guarded by a `std::sync::Mutex` — writers serialize at the
/// persistence boundary, which for an in-process log is just lock
/// contention, not an external store.
pub struct AuditTrail {
    records: std::sync::Mutex<Vec<AuditRecord>>,
    events: std::sync::Mutex<Vec<ExecutionEvent>>,
    sink: Option<Arc<dyn RecordSink>>,
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditTrail {
    pub fn new() -> Self {
        Self {
            records: std::sync::Mutex::new(Vec::new()),
            events: std::sync::Mutex::new(Vec::new()),
            sink: None,
        }
    }

    /// Durable variant: every `record`/`emit` call is still kept in memory
    /// for the current process (controller/test callers read it back
    /// through `records_for_task`/`events_for_trace`) and additionally
    /// forwarded to `sink`.
    pub fn with_sink(sink: Arc<dyn RecordSink>) -> Self {
        Self {
            records: std::sync::Mutex::new(Vec::new()),
            events: std::sync::Mutex::new(Vec::new()),
            sink: Some(sink),
        }
    }

    pub fn record(&self, record: AuditRecord) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.append_audit(&record) {
                tracing::warn!(error = %e, "failed to persist audit record");
            }
        }
        self.records.lock().expect("audit records mutex poisoned").push(record);
    }

    pub fn emit(&self, event: ExecutionEvent) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.append_event(&event) {
                tracing::warn!(error = %e, "failed to persist execution event");
            }
        }
        self.events.lock().expect("audit events mutex poisoned").push(event);
    }

    /// Persist a `CodeChange`/`TokenUsage` pair through the configured
    /// sink, if any. A no-op (not an error) when no sink is configured —
    /// matching the "engine is runnable standalone" posture in SPEC §6.
    pub fn persist_code_change(&self, change: &forge_core::types::CodeChange) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.persist_code_change(change) {
                tracing::warn!(error = %e, "failed to persist code change");
            }
        }
    }

    pub fn persist_token_usage(&self, task_id: &TaskId, usage: &forge_core::types::TokenUsage) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.persist_token_usage(task_id, usage) {
                tracing::warn!(error = %e, "failed to persist token usage");
            }
        }
    }

    pub fn records_for_task(&self, task_id: &TaskId) -> Vec<AuditRecord> {
        self.records
            .lock()
            .expect("audit records mutex poisoned")
            .iter()
            .filter(|r| &r.task_id == task_id)
            .cloned()
            .collect()
    }

    pub fn events_for_trace(&self, trace_id: &TraceId) -> Vec<ExecutionEvent> {
        self.events
            .lock()
            .expect("audit events mutex poisoned")
            .iter()
            .filter(|e| &e.trace_id == trace_id)
            .cloned()
            .collect()
    }
}
