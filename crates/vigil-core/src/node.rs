use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::stats::ExecutionStats;

/// Lifecycle of a single node within an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Retry,
    Starting,
    Running,
    Finished,
    Cancelled,
    Error,
}

impl NodeStatus {
    pub fn is_waiting(self) -> bool {
        self == NodeStatus::Pending
    }

    pub fn is_starting(self) -> bool {
        matches!(self, NodeStatus::Starting | NodeStatus::Retry)
    }

    pub fn is_started(self) -> bool {
        self == NodeStatus::Running
    }

    /// Finished, cancelled or error.
    pub fn is_ended(self) -> bool {
        matches!(
            self,
            NodeStatus::Finished | NodeStatus::Error | NodeStatus::Cancelled
        )
    }

    pub fn is_failed(self) -> bool {
        matches!(self, NodeStatus::Error | NodeStatus::Cancelled)
    }

    pub fn is_succeeded(self) -> bool {
        self == NodeStatus::Finished
    }
}

/// Status of one named node output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStatus {
    Pending,
    Running,
    Finished,
    Cancelled,
}

/// Current status and value of one named node output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputState {
    pub status: OutputStatus,
    #[serde(default)]
    pub value: Value,
}

impl OutputState {
    pub fn new(status: OutputStatus, value: Value) -> Self {
        Self { status, value }
    }
}

/// Reconstructed state of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeState {
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<HashMap<String, Value>>,
    /// Output entries; `None` marks an output referenced before any state was known.
    #[serde(default, deserialize_with = "null_as_default")]
    pub outputs: HashMap<String, Option<OutputState>>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default)]
    pub retries: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ExecutionStats>,
}

impl NodeState {
    /// A freshly synthesized node: pending, no retries, nothing produced yet.
    pub fn pending(updated_at: DateTime<Utc>) -> Self {
        Self {
            status: NodeStatus::Pending,
            inputs: None,
            outputs: HashMap::new(),
            updated_at,
            errors: None,
            message: None,
            retries: 0,
            stats: None,
        }
    }

    /// The value of a named output, if the output exists and has state.
    pub fn output_value(&self, name: &str) -> Option<&Value> {
        self.outputs
            .get(name)
            .and_then(Option::as_ref)
            .map(|output| &output.value)
    }

    pub fn is_waiting(&self) -> bool {
        self.status.is_waiting()
    }

    pub fn is_starting(&self) -> bool {
        self.status.is_starting()
    }

    pub fn is_started(&self) -> bool {
        self.status.is_started()
    }

    pub fn is_ended(&self) -> bool {
        self.status.is_ended()
    }

    pub fn is_failed(&self) -> bool {
        self.status.is_failed()
    }

    pub fn is_succeeded(&self) -> bool {
        self.status.is_succeeded()
    }
}

/// Accept `null` wherever a defaultable collection is expected.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}
