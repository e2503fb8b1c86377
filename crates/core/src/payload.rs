//! Structured job payload captured at processing-start.
//!
//! The record stores the payload as opaque JSON so that fields this crate
//! does not know about survive untouched. `JobPayload` is the shape the
//! monitor itself reads: enough to re-submit the job later.

use serde::{Deserialize, Serialize};

/// Payload carried by the processing-started signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    /// Human-readable job class name (used as the record's `job_class`).
    pub display_name: String,
    /// Handler the queue system uses to run the job, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,
    /// Attempt counter as reported by the queue system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<u32>,
    pub data: JobPayloadData,
}

/// Serialized command that reconstructs the job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayloadData {
    pub command_name: String,
    pub command: serde_json::Value,
}

impl JobPayload {
    pub fn new(display_name: impl Into<String>, command: serde_json::Value) -> Self {
        let display_name = display_name.into();
        Self {
            data: JobPayloadData {
                command_name: display_name.clone(),
                command,
            },
            display_name,
            job: None,
            attempts: None,
        }
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Whether a stored payload carries nothing: `null`, `{}` or `[]`.
    pub fn is_blank(payload: &serde_json::Value) -> bool {
        match payload {
            serde_json::Value::Null => true,
            serde_json::Value::Object(map) => map.is_empty(),
            serde_json::Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Extract the serialized command from a stored (opaque) payload.
    pub fn command_of(payload: &serde_json::Value) -> Option<&serde_json::Value> {
        payload.get("data")?.get("command").filter(|c| !c.is_null())
    }
}
