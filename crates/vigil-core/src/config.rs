use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default upper bound for a single unterminated line (8 MiB).
pub const DEFAULT_MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

/// Configuration for following one execution stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Identifier attached to every log record emitted for this stream.
    #[serde(default = "Uuid::new_v4")]
    pub run_id: Uuid,

    /// Maximum size of the partial line held between chunks.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,

    /// Tags for filtering and categorization.
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_max_line_bytes() -> usize {
    DEFAULT_MAX_LINE_BYTES
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            tags: Vec::new(),
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn with_max_line_bytes(mut self, limit: usize) -> Self {
        self.max_line_bytes = limit;
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }
}
