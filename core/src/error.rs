use thiserror::Error;

/// Convenience result type used throughout the Talon crates.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for the Talon runtime.
///
/// Internal stages convert their failures into one of these variants; the
/// orchestrator collapses them into the fixed pipeline failure strings before
/// anything reaches a caller.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Cipher, MAC, or key derivation failure.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Base64 encode/decode failure.
    #[error("codec error: {0}")]
    Codec(String),

    /// Filesystem or pipe I/O failure.
    #[error("io error: {0}")]
    Io(String),

    /// Malformed request section or wire frame.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Protocol(err.to_string())
    }
}
