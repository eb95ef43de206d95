//! JavaScript bindings for the operation algebra and the server document
//!
//! Operations cross the boundary as JSON strings in the wire format of
//! [`crate::protocol`].

use crate::ot::{Document, TextOperation};
use crate::protocol::{decode_message, deserialize_operation, encode_message, serialize_operation};
use wasm_bindgen::prelude::*;

fn to_js(err: crate::error::SyncError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn parse(json: &str) -> Result<TextOperation, JsValue> {
    let data = decode_message(json).map_err(to_js)?;
    deserialize_operation(&data).map_err(to_js)
}

/// JavaScript-friendly wrapper for TextOperation
#[wasm_bindgen]
pub struct WasmTextOperation {
    inner: TextOperation,
}

#[wasm_bindgen]
impl WasmTextOperation {
    /// Parse an operation from its JSON payload
    #[wasm_bindgen(js_name = fromJSON)]
    pub fn from_json(json: &str) -> Result<WasmTextOperation, JsValue> {
        parse(json).map(|inner| WasmTextOperation { inner })
    }

    /// Export as JSON string
    #[wasm_bindgen(js_name = toJSON)]
    pub fn to_json(&self) -> Result<String, JsValue> {
        encode_message(&serialize_operation(&self.inner)).map_err(to_js)
    }

    /// Apply to `text`, returning the new text
    #[wasm_bindgen(js_name = apply)]
    pub fn apply(&self, text: &str) -> Result<String, JsValue> {
        self.inner.apply(text).map_err(to_js)
    }

    /// Operation with the effect of this one followed by `other`
    #[wasm_bindgen(js_name = compose)]
    pub fn compose(&self, other: &WasmTextOperation) -> Result<WasmTextOperation, JsValue> {
        self.inner
            .compose(&other.inner)
            .map(|inner| WasmTextOperation { inner })
            .map_err(to_js)
    }

    /// Transform against a concurrent operation
    ///
    /// Returns a JSON array `[thisPrime, otherPrime]`.
    #[wasm_bindgen(js_name = transform)]
    pub fn transform(&self, other: &WasmTextOperation) -> Result<String, JsValue> {
        let (a_prime, b_prime) = self.inner.transform(&other.inner).map_err(to_js)?;
        let pair = [serialize_operation(&a_prime), serialize_operation(&b_prime)];
        serde_json::to_string(&pair)
            .map_err(|e| JsValue::from_str(&format!("JSON serialization failed: {}", e)))
    }

    #[wasm_bindgen(js_name = invert)]
    pub fn invert(&self) -> WasmTextOperation {
        WasmTextOperation {
            inner: self.inner.invert(),
        }
    }

    /// Whether this operation's insert goes first against `other_id`
    #[wasm_bindgen(js_name = gotPriority)]
    pub fn got_priority(&self, other_id: &str) -> bool {
        self.inner.got_priority(other_id)
    }

    #[wasm_bindgen(js_name = isNoop)]
    pub fn is_noop(&self) -> bool {
        self.inner.is_noop()
    }

    #[wasm_bindgen(js_name = equals)]
    pub fn equals(&self, other: &WasmTextOperation) -> bool {
        self.inner == other.inner
    }

    #[wasm_bindgen(getter, js_name = sourceLength)]
    pub fn source_length(&self) -> usize {
        self.inner.source_length()
    }

    #[wasm_bindgen(getter, js_name = targetLength)]
    pub fn target_length(&self) -> usize {
        self.inner.target_length()
    }
}

/// JavaScript-friendly wrapper for the server Document
#[wasm_bindgen]
pub struct WasmDocument {
    inner: Document,
}

#[wasm_bindgen]
impl WasmDocument {
    /// Create a document holding `text` at `revision`
    #[wasm_bindgen(constructor)]
    pub fn new(text: String, revision: u64) -> Self {
        Self {
            inner: Document::new(text, revision),
        }
    }

    /// Apply a client operation built against `revision`
    ///
    /// Returns the JSON of the transformed operation to relay to every
    /// client.
    #[wasm_bindgen(js_name = applyOperation)]
    pub fn apply_operation(&mut self, json: &str, revision: u64) -> Result<String, JsValue> {
        let operation = parse(json)?;
        let applied = self.inner.apply(operation, revision).map_err(to_js)?;
        encode_message(&serialize_operation(&applied)).map_err(to_js)
    }

    /// Drop history older than `revision`
    #[wasm_bindgen(js_name = compact)]
    pub fn compact(&mut self, revision: u64) -> Result<(), JsValue> {
        self.inner.compact(revision).map_err(to_js)
    }

    #[wasm_bindgen(js_name = getText)]
    pub fn text(&self) -> String {
        self.inner.text().to_string()
    }

    #[wasm_bindgen(js_name = getRevision)]
    pub fn revision(&self) -> u64 {
        self.inner.revision()
    }
}
