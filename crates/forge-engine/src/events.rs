//! Named `ExecutionEvent` constructors for the correction loop's phase
//! boundaries. Kept as one small helper module rather than inlined at each
//! call site so the event-type strings exist in exactly one place.

use forge_core::ids::TraceId;
use forge_core::types::{EventLevel, ExecutionEvent};

const AGENT: &str = "forge-engine";

fn event(trace_id: &TraceId, event_type: &str, message: impl Into<String>, level: EventLevel) -> ExecutionEvent {
    ExecutionEvent::new(trace_id.clone(), AGENT, event_type, message, level)
}

pub fn plan_started(trace_id: &TraceId) -> ExecutionEvent {
    event(trace_id, "forge:plan_started", "planning phase started", EventLevel::Info)
}

pub fn execute_started(trace_id: &TraceId) -> ExecutionEvent {
    event(trace_id, "forge:execute_started", "execution phase started", EventLevel::Info)
}

pub fn validation_failed(trace_id: &TraceId, message: impl Into<String>) -> ExecutionEvent {
    event(trace_id, "forge:validation_failed", message, EventLevel::Warn)
}

pub fn correction_round(trace_id: &TraceId, round: u32, message: impl Into<String>) -> ExecutionEvent {
    event(
        trace_id,
        "forge:correction_round",
        format!("round {round}: {}", message.into()),
        EventLevel::Info,
    )
}

pub fn commit_started(trace_id: &TraceId) -> ExecutionEvent {
    event(trace_id, "forge:commit_started", "staging and committing changes", EventLevel::Info)
}

pub fn delivery_complete(trace_id: &TraceId, message: impl Into<String>) -> ExecutionEvent {
    event(trace_id, "forge:delivery_complete", message, EventLevel::Info)
}

pub fn delivery_failed(trace_id: &TraceId, message: impl Into<String>) -> ExecutionEvent {
    event(trace_id, "forge:delivery_complete", message, EventLevel::Error)
}
