use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, Result};

/// Plugin identity and envelope flags, taken from the `meta` section.
///
/// Unknown fields are preserved in `extra` so the section reaches the plugin
/// exactly as the caller supplied it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginMeta {
    /// Logical plugin id; derives the `PLUGIN_SIG_*` lookup key.
    pub plugin_name: String,
    /// Entry symbol inside the artifact. Absence is classified by the
    /// loader, not rejected at parse time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_main_class: Option<String>,
    /// Artifact location, resolvable by the artifact provider.
    pub file_location: String,
    /// If true, `input.data` is a Base64 AES-GCM ciphertext.
    #[serde(default)]
    pub encrypted_input: bool,
    /// If true, plugin output is AES-GCM-wrapped before encoding.
    #[serde(default)]
    pub encrypt_output: bool,
    /// Selects the URL-safe Base64 alphabet for the final encoding.
    #[serde(default)]
    pub url_safe_output: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One full invocation: the three JSON sections the pipeline consumes.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub meta: PluginMeta,
    pub input: Value,
    pub settings: Value,
}

impl InvocationRequest {
    /// Builds a request from three standalone JSON strings (3-argument CLI
    /// mode and the embedded entry point).
    pub fn from_json_parts(meta: &str, input: &str, settings: &str) -> Result<Self> {
        Ok(Self {
            meta: serde_json::from_str(meta)?,
            input: serde_json::from_str(input)?,
            settings: serde_json::from_str(settings)?,
        })
    }

    /// Builds a request from one top-level object with `meta`, `input`, and
    /// `settings` keys (stdin CLI mode).
    pub fn from_value(mut piped: Value) -> Result<Self> {
        let obj = piped
            .as_object_mut()
            .ok_or_else(|| EngineError::Protocol("top-level value must be an object".into()))?;
        let meta = obj
            .remove("meta")
            .ok_or_else(|| EngineError::Protocol("missing \"meta\" section".into()))?;
        let input = obj
            .remove("input")
            .ok_or_else(|| EngineError::Protocol("missing \"input\" section".into()))?;
        let settings = obj
            .remove("settings")
            .ok_or_else(|| EngineError::Protocol("missing \"settings\" section".into()))?;
        Ok(Self {
            meta: serde_json::from_value(meta)?,
            input,
            settings,
        })
    }
}
