//! Event-sourcing reducer: folds [`ExecutionEvent`]s into an [`Execution`].
//!
//! The reducer owns no state. Callers pass the current snapshot in and get
//! the next one back; nothing is shared with a previously returned value.
//!
//! Every non-`init` event also refreshes the execution-level bookkeeping:
//! aggregated stats are recomputed from the node map, `updatedAt` takes the
//! event timestamp, `startedAt` is set if still unset, and `finishedAt` is
//! set the first time the status is terminal.

use chrono::{DateTime, Utc};
use serde_json::Value;

use vigil_core::error::StreamError;
use vigil_core::event::{
    ExecutionEvent, InitEvent, NodeOutputUpdateEvent, NodeOutputUpdateStatusEvent,
    NodeUpdateStatusEvent, OutputUpdateEvent, UpdateStatusEvent,
};
use vigil_core::execution::Execution;
use vigil_core::node::{NodeState, OutputState};
use vigil_core::stats;

/// Apply one event to an optional snapshot.
///
/// `init` always yields its baseline (after replaying any events it
/// carries). Any other event requires an existing snapshot and fails with
/// [`StreamError::Sequence`] otherwise.
pub fn reduce(current: Option<Execution>, event: &ExecutionEvent) -> Result<Execution, StreamError> {
    match (current, event) {
        (_, ExecutionEvent::Init(init)) => Ok(initialize(init)),
        (Some(execution), event) => Ok(apply_event(execution, event)),
        (None, event) => Err(StreamError::Sequence {
            op: event.op().to_owned(),
        }),
    }
}

/// Apply one event to an existing snapshot. Never fails: unknown nodes and
/// outputs are created on first reference.
pub fn apply_event(execution: Execution, event: &ExecutionEvent) -> Execution {
    match event {
        ExecutionEvent::Init(init) => initialize(init),
        ExecutionEvent::UpdateStatus(e) => update(execution, e.created_at, |x| apply_status(x, e)),
        ExecutionEvent::OutputUpdate(e) => update(execution, e.created_at, |x| apply_output(x, e)),
        ExecutionEvent::NodeUpdateStatus(e) => {
            update(execution, e.created_at, |x| apply_node_status(x, e))
        }
        ExecutionEvent::NodeOutputUpdateStatus(e) => {
            update(execution, e.created_at, |x| apply_node_output_status(x, e))
        }
        ExecutionEvent::NodeOutputUpdate(e) => {
            update(execution, e.created_at, |x| apply_node_output(x, e))
        }
    }
}

/// Replay the events buffered on a baseline, oldest first, then clear them.
///
/// The sort is stable, so events sharing a timestamp keep their listed order.
pub fn replay_pending(mut execution: Execution) -> Execution {
    let Some(mut events) = execution.events.take() else {
        return execution;
    };
    events.sort_by_key(ExecutionEvent::created_at);
    events.iter().fold(execution, apply_event)
}

fn initialize(init: &InitEvent) -> Execution {
    replay_pending(init.execution.as_ref().clone())
}

fn update(
    mut execution: Execution,
    at: DateTime<Utc>,
    mutate: impl FnOnce(&mut Execution),
) -> Execution {
    mutate(&mut execution);
    execution.stats = Some(stats::aggregate(
        execution.state.values().map(|node| node.stats.as_ref()),
    ));
    execution.started_at.get_or_insert(at);
    execution.updated_at = at;
    if execution.status.is_terminal() && execution.finished_at.is_none() {
        execution.finished_at = Some(at);
    }
    execution
}

fn apply_status(execution: &mut Execution, event: &UpdateStatusEvent) {
    // A terminal status is final.
    if !execution.status.is_terminal() {
        execution.status = event.status;
    }
    if let Some(message) = present_text(&event.message) {
        execution.message = Some(message.to_owned());
    }
    if let Some(errors) = present_list(&event.errors) {
        execution.errors = Some(errors.to_vec());
    }
}

fn apply_output(execution: &mut Execution, event: &OutputUpdateEvent) {
    let next = if event.append.unwrap_or(false) {
        append_value(execution.outputs.get(&event.output), &event.value)
    } else {
        event.value.clone()
    };
    execution.outputs.insert(event.output.clone(), next);
}

fn apply_node_status(execution: &mut Execution, event: &NodeUpdateStatusEvent) {
    let node = node_entry(execution, &event.node_id, event.created_at);
    node.status = event.status;
    if let Some(retries) = event.retries.filter(|&r| r > 0) {
        node.retries = retries;
    }
    if let Some(message) = present_text(&event.message) {
        node.message = Some(message.to_owned());
    }
    if let Some(errors) = present_list(&event.errors) {
        node.errors = Some(errors.to_vec());
    }
    if let Some(stats) = &event.stats {
        node.stats = Some(stats.clone());
    }
    node.updated_at = event.created_at;
}

fn apply_node_output_status(execution: &mut Execution, event: &NodeOutputUpdateStatusEvent) {
    let node = node_entry(execution, &event.node_id, event.created_at);
    // An output never seen before is recorded as known-but-stateless.
    if let Some(output) = node.outputs.entry(event.output.clone()).or_insert(None) {
        output.status = event.status;
    }
    node.updated_at = event.created_at;
}

fn apply_node_output(execution: &mut Execution, event: &NodeOutputUpdateEvent) {
    let node = node_entry(execution, &event.node_id, event.created_at);
    let append = event.append.unwrap_or(false);
    let slot = node.outputs.entry(event.output.clone()).or_insert(None);
    let previous = slot.as_ref().map(|output| &output.value);
    let value = if append {
        append_value(previous, &event.value)
    } else {
        event.value.clone()
    };
    *slot = Some(OutputState::new(event.status, value));
    node.updated_at = event.created_at;
}

fn node_entry<'a>(
    execution: &'a mut Execution,
    node_id: &str,
    at: DateTime<Utc>,
) -> &'a mut NodeState {
    execution
        .state
        .entry(node_id.to_owned())
        .or_insert_with(|| NodeState::pending(at))
}

/// Concatenate `next` onto `previous` as text.
///
/// Strings contribute their contents, `null` or a missing value contributes
/// nothing, and any other value contributes its compact JSON text.
pub fn append_value(previous: Option<&Value>, next: &Value) -> Value {
    let mut text = previous.map(fragment).unwrap_or_default();
    text.push_str(&fragment(next));
    Value::String(text)
}

fn fragment(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn present_text(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn present_list(value: &Option<Vec<Value>>) -> Option<&[Value]> {
    value.as_deref().filter(|list| !list.is_empty())
}
