//! Wire frames exchanged with a plugin process.
//!
//! Both directions are newline-framed JSON. The request carries the entry
//! symbol and the three sections verbatim; the response is either
//! `{"ok": true, "payload": "<standard Base64>"}` or
//! `{"ok": false, "error": "<message>"}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use talon_core::{PluginMeta, PluginResult, Result};
use talon_crypto::codec;

#[derive(Debug, Serialize)]
pub(crate) struct PluginRequest<'a> {
    pub entry: &'a str,
    pub meta: &'a PluginMeta,
    pub input: &'a Value,
    pub settings: &'a Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PluginResponse {
    pub ok: bool,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Serializes one request frame. JSON string escaping guarantees the frame
/// itself contains no raw newline.
pub(crate) fn request_line(
    entry: &str,
    meta: &PluginMeta,
    input: &Value,
    settings: &Value,
) -> Result<String> {
    let frame = PluginRequest {
        entry,
        meta,
        input,
        settings,
    };
    Ok(serde_json::to_string(&frame)?)
}

/// Maps a raw response frame to the invocation outcome.
pub(crate) fn classify_response(line: &str) -> PluginResult {
    let response: PluginResponse = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            return PluginResult::Error(format!("plugin exception: malformed response frame: {e}"))
        }
    };

    if !response.ok {
        let message = response
            .error
            .unwrap_or_else(|| "unspecified plugin failure".to_string());
        return PluginResult::Error(format!("plugin exception: {message}"));
    }

    match response.payload {
        None | Some(Value::Null) => PluginResult::error("plugin returned null"),
        Some(Value::String(encoded)) => match codec::decode_standard(&encoded) {
            Ok(bytes) => PluginResult::Ok(bytes),
            Err(_) => PluginResult::error("plugin returned non-byte[] type"),
        },
        Some(_) => PluginResult::error("plugin returned non-byte[] type"),
    }
}
