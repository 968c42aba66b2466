use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::execution::{Execution, ExecutionStatus};
use crate::node::{NodeStatus, OutputStatus};
use crate::stats::ExecutionStats;

/// Baseline snapshot that starts (or restarts) reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitEvent {
    pub created_at: DateTime<Utc>,
    pub execution: Box<Execution>,
}

/// Execution-level status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusEvent {
    pub created_at: DateTime<Utc>,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(rename = "_errors", default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Value>>,
}

/// Write to an execution-level output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputUpdateEvent {
    pub created_at: DateTime<Utc>,
    pub output: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,
}

/// Node-level status change, optionally carrying fresh stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeUpdateStatusEvent {
    pub created_at: DateTime<Utc>,
    pub node_id: String,
    pub status: NodeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ExecutionStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retries: Option<u32>,
}

/// Status change of one node output, without a value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutputUpdateStatusEvent {
    pub created_at: DateTime<Utc>,
    pub node_id: String,
    pub output: String,
    pub status: OutputStatus,
}

/// Status and value update of one node output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOutputUpdateEvent {
    pub created_at: DateTime<Utc>,
    pub node_id: String,
    pub output: String,
    pub status: OutputStatus,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub append: Option<bool>,
}

/// One wire-level update, discriminated by its `op` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op")]
pub enum ExecutionEvent {
    #[serde(rename = "init")]
    Init(InitEvent),
    #[serde(rename = "updateStatus")]
    UpdateStatus(UpdateStatusEvent),
    #[serde(rename = "output.update")]
    OutputUpdate(OutputUpdateEvent),
    #[serde(rename = "node.updateStatus")]
    NodeUpdateStatus(NodeUpdateStatusEvent),
    #[serde(rename = "node.output.updateStatus")]
    NodeOutputUpdateStatus(NodeOutputUpdateStatusEvent),
    #[serde(rename = "node.output.update")]
    NodeOutputUpdate(NodeOutputUpdateEvent),
}

impl ExecutionEvent {
    /// Every recognized `op` value, in declaration order.
    pub const OPS: [&'static str; 6] = [
        "init",
        "updateStatus",
        "output.update",
        "node.updateStatus",
        "node.output.updateStatus",
        "node.output.update",
    ];

    /// The wire discriminator of this event.
    pub fn op(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::UpdateStatus(_) => "updateStatus",
            Self::OutputUpdate(_) => "output.update",
            Self::NodeUpdateStatus(_) => "node.updateStatus",
            Self::NodeOutputUpdateStatus(_) => "node.output.updateStatus",
            Self::NodeOutputUpdate(_) => "node.output.update",
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Self::Init(e) => e.created_at,
            Self::UpdateStatus(e) => e.created_at,
            Self::OutputUpdate(e) => e.created_at,
            Self::NodeUpdateStatus(e) => e.created_at,
            Self::NodeOutputUpdateStatus(e) => e.created_at,
            Self::NodeOutputUpdate(e) => e.created_at,
        }
    }

    /// Returns `true` for execution-level status updates.
    pub fn is_status_update(&self) -> bool {
        matches!(self, Self::UpdateStatus(_))
    }

    /// The node this event targets, if any.
    pub fn node_id(&self) -> Option<&str> {
        match self {
            Self::NodeUpdateStatus(e) => Some(&e.node_id),
            Self::NodeOutputUpdateStatus(e) => Some(&e.node_id),
            Self::NodeOutputUpdate(e) => Some(&e.node_id),
            Self::Init(_) | Self::UpdateStatus(_) | Self::OutputUpdate(_) => None,
        }
    }
}
