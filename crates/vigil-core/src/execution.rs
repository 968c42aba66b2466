use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::ExecutionEvent;
use crate::node::{null_as_default, NodeState};
use crate::stats::ExecutionStats;

/// Execution-level lifecycle.
///
/// `pending → running → (cancelling → cancelled) | finished | error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Cancelling,
    Cancelled,
    Finished,
    Error,
}

impl ExecutionStatus {
    /// Finished, cancelled or error: no further progress occurs.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Finished | ExecutionStatus::Cancelled | ExecutionStatus::Error
        )
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Cancelling => write!(f, "cancelling"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Finished => write!(f, "finished"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Reconstructed snapshot of one agent execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Execution {
    #[serde(rename = "_id")]
    pub id: String,
    pub status: ExecutionStatus,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queued_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_id: Option<String>,
    /// Workflow definition the execution runs; kept opaque.
    #[serde(default)]
    pub pipeline: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    /// Node id to node state.
    #[serde(default, deserialize_with = "null_as_default")]
    pub state: HashMap<String, NodeState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ExecutionStats>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub inputs: HashMap<String, Value>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub outputs: HashMap<String, Value>,
    /// Events buffered server-side that still have to be replayed onto this baseline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<ExecutionEvent>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "_errors", default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_execution_id: Option<String>,
}

impl Execution {
    /// A minimal pending execution with no nodes, inputs or outputs.
    pub fn new(id: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            status: ExecutionStatus::Pending,
            updated_at,
            queued_at: None,
            started_at: None,
            finished_at: None,
            pipeline_id: None,
            pipeline: Value::Null,
            external_id: None,
            state: HashMap::new(),
            stats: None,
            inputs: HashMap::new(),
            outputs: HashMap::new(),
            events: None,
            message: None,
            errors: None,
            parent_execution_id: None,
        }
    }

    pub fn is_ended(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn node(&self, node_id: &str) -> Option<&NodeState> {
        self.state.get(node_id)
    }

    pub fn output(&self, name: &str) -> Option<&Value> {
        self.outputs.get(name)
    }

    /// The value of `output` on node `node_id`, if both exist.
    pub fn node_output(&self, node_id: &str, output: &str) -> Option<&Value> {
        self.node(node_id).and_then(|node| node.output_value(output))
    }
}
