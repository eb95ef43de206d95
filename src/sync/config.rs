//! Session configuration
//!
//! Passed explicitly to each session; there is no process-wide settings
//! object.

use crate::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default coalescing window for grouping keystrokes into one undo action
pub const DEFAULT_UNDO_COALESCE_WINDOW: Duration = Duration::from_millis(500);

/// Default number of operations after which an undo action is closed
pub const DEFAULT_MAX_OPERATIONS_PER_ACTION: usize = 20;

/// Tunables of a [`SyncSession`](super::SyncSession)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Edits closer together than this join the same undo action
    #[serde(rename = "undoCoalesceWindowMs", with = "duration_ms")]
    pub undo_coalesce_window: Duration,

    /// An action whose operation count exceeds this is closed early
    pub max_operations_per_action: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            undo_coalesce_window: DEFAULT_UNDO_COALESCE_WINDOW,
            max_operations_per_action: DEFAULT_MAX_OPERATIONS_PER_ACTION,
        }
    }
}

impl SessionConfig {
    /// Parse and validate a JSON configuration; missing fields use defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: SessionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_operations_per_action == 0 {
            return Err(SyncError::InvalidConfig(
                "maxOperationsPerAction must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
