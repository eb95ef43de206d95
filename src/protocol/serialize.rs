//! Serialization layer - Convert operations to/from the wire payload
//!
//! This module provides conversion between [`TextOperation`] and the JSON
//! message format handed to the transport:
//!
//! ```json
//! {"authorId":"client-1","steps":[{"type":"retain","amount":5},{"type":"insert","text":" world"}]}
//! ```

use crate::error::{Result, SyncError};
use crate::ot::{Step, TextOperation};
use serde::{Deserialize, Serialize};

/// One step of a serialized operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StepData {
    Retain { amount: usize },
    Insert { text: String },
    Delete { text: String },
}

/// Serialized operation as exchanged with the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationData {
    /// Author of the operation; `userId` is accepted on input
    #[serde(alias = "userId")]
    pub author_id: String,

    pub steps: Vec<StepData>,
}

/// Serialize an operation to the wire payload
pub fn serialize_operation(operation: &TextOperation) -> OperationData {
    let steps = operation
        .steps()
        .iter()
        .map(|step| match step {
            Step::Retain(amount) => StepData::Retain { amount: *amount },
            Step::Insert(text) => StepData::Insert { text: text.clone() },
            Step::Delete(text) => StepData::Delete { text: text.clone() },
        })
        .collect();

    OperationData {
        author_id: operation.author_id().unwrap_or_default().to_string(),
        steps,
    }
}

/// Deserialize an operation from the wire payload
///
/// # Errors
///
/// `CorruptOperation` if a step covers no characters or the step lengths
/// add up past `usize::MAX`.
pub fn deserialize_operation(data: &OperationData) -> Result<TextOperation> {
    let mut operation = TextOperation::new(Some(data.author_id.clone()));
    let mut source_length: usize = 0;
    let mut target_length: usize = 0;

    for (index, step) in data.steps.iter().enumerate() {
        let step = match step {
            StepData::Retain { amount } => Step::Retain(*amount),
            StepData::Insert { text } => Step::Insert(text.clone()),
            StepData::Delete { text } => Step::Delete(text.clone()),
        };
        if step.is_empty() {
            return Err(SyncError::CorruptOperation(format!(
                "step {} of operation by {:?} is empty",
                index, data.author_id
            )));
        }

        let length = step.len();
        let (source, target) = match step {
            Step::Retain(_) => (source_length.checked_add(length), target_length.checked_add(length)),
            Step::Insert(_) => (Some(source_length), target_length.checked_add(length)),
            Step::Delete(_) => (source_length.checked_add(length), Some(target_length)),
        };
        let (Some(source), Some(target)) = (source, target) else {
            return Err(SyncError::CorruptOperation(format!(
                "step {} of operation by {:?} overflows the operation length",
                index, data.author_id
            )));
        };
        source_length = source;
        target_length = target;

        operation.push(step);
    }

    Ok(operation)
}

/// Encode a payload as JSON
pub fn encode_message(data: &OperationData) -> Result<String> {
    Ok(serde_json::to_string(data)?)
}

/// Decode a JSON payload
///
/// Malformed JSON and unknown step types are reported as `CorruptOperation`.
pub fn decode_message(json: &str) -> Result<OperationData> {
    serde_json::from_str(json)
        .map_err(|e| SyncError::CorruptOperation(format!("failed to decode operation: {}", e)))
}

impl From<&TextOperation> for OperationData {
    fn from(operation: &TextOperation) -> Self {
        serialize_operation(operation)
    }
}

impl TryFrom<&OperationData> for TextOperation {
    type Error = SyncError;

    fn try_from(data: &OperationData) -> Result<Self> {
        deserialize_operation(data)
    }
}
