pub mod decoder;
pub mod dispatch;
pub mod driver;
pub mod reassembler;
pub mod reducer;
pub mod tracker;
pub mod transport;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::decoder::decode_event;
    pub use crate::dispatch::{ExecutionHooks, FnHooks, TerminalDetector};
    pub use crate::driver::{drive, execution_updates, follow, ExecutionUpdate};
    pub use crate::reassembler::LineReassembler;
    pub use crate::reducer::{apply_event, reduce, replay_pending};
    pub use crate::tracker::{ExecutionTracker, StreamOutcome};
    pub use crate::transport::{follow_response, read_execute_response, response_updates};
    pub use vigil_core::prelude::*;
}
