//! WASM bindings for OTSync
//!
//! JavaScript-friendly wrappers for the operation algebra and the server
//! document. Only compiled with the `wasm` feature.

pub mod bindings;
pub mod utils;

pub use bindings::{WasmDocument, WasmTextOperation};
pub use utils::{generate_client_id, init_panic_hook};
