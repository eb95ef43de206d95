//! Wire protocol for operations
//!
//! The transport only ever sees [`OperationData`]; framing, reconnection and
//! delivery guarantees belong to the transport itself.

pub mod serialize;

pub use serialize::{
    decode_message, deserialize_operation, encode_message, serialize_operation, OperationData,
    StepData,
};
