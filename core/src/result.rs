/// Outcome of one plugin invocation.
///
/// Exactly one of the three variants describes every invocation: a payload,
/// a deterministic failure, or a wall-clock timeout. Nothing raises across
/// the plugin boundary; the loader returns this by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginResult {
    /// The plugin completed and returned raw output bytes.
    Ok(Vec<u8>),
    /// The plugin failed deterministically; the reason is one of the fixed
    /// loader strings.
    Error(String),
    /// Execution exceeded the allotted wall-clock budget. The plugin process
    /// is killed, but the engine does not wait for it to die.
    Timeout,
}

impl PluginResult {
    pub fn error(reason: impl Into<String>) -> Self {
        PluginResult::Error(reason.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, PluginResult::Ok(_))
    }
}
