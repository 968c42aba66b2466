pub mod config;
pub mod error;
pub mod event;
pub mod execution;
pub mod node;
pub mod request;
pub mod schema;
pub mod stats;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::StreamConfig;
    pub use crate::error::{DecodeError, Result, StreamError, TransportError, VigilError};
    pub use crate::event::{
        ExecutionEvent, InitEvent, NodeOutputUpdateEvent, NodeOutputUpdateStatusEvent,
        NodeUpdateStatusEvent, OutputUpdateEvent, UpdateStatusEvent,
    };
    pub use crate::execution::{Execution, ExecutionStatus};
    pub use crate::node::{NodeState, NodeStatus, OutputState, OutputStatus};
    pub use crate::request::{ExecuteRequest, ExecuteResponse};
    pub use crate::schema::{TypeDescriptor, TypeKind};
    pub use crate::stats::ExecutionStats;
}
