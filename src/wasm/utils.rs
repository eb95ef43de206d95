//! WASM utility functions

use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in browser
#[wasm_bindgen(js_name = initPanicHook)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Fresh random client identifier
#[wasm_bindgen(js_name = generateClientId)]
pub fn generate_client_id() -> String {
    crate::sync::generate_client_id()
}
