use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of an agent execute call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub inputs: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

impl ExecuteRequest {
    /// A request whose response is a newline-delimited event stream.
    pub fn streaming(inputs: HashMap<String, Value>) -> Self {
        Self {
            inputs,
            stream: Some(true),
            external_id: None,
        }
    }

    /// A request answered with a single [`ExecuteResponse`].
    pub fn non_streaming(inputs: HashMap<String, Value>) -> Self {
        Self {
            inputs,
            stream: Some(false),
            external_id: None,
        }
    }

    pub fn with_input(mut self, name: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(name.into(), value);
        self
    }

    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = Some(id.into());
        self
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.unwrap_or(false)
    }
}

/// Fully-buffered reply to a non-streaming execute call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    #[serde(default = "default_status")]
    pub status: String,
    pub execution_id: String,
}

fn default_status() -> String {
    "ok".into()
}
