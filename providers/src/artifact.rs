//! Artifact resolution and loading.

use std::fs;
use std::path::{Path, PathBuf};

use talon_core::{EngineError, Result};

/// Abstraction for loading raw plugin artifacts from an external source.
///
/// Implementations may resolve locations against remote schemes (object
/// stores, content-addressed caches), but the returned path must be openable
/// by [`ArtifactProvider::read`]. No caching: every invocation reads fresh.
pub trait ArtifactProvider: Send + Sync {
    /// Maps a location string to a filesystem path. The default is identity
    /// resolution on the local filesystem.
    fn resolve(&self, location: &str) -> PathBuf {
        PathBuf::from(location)
    }

    /// Reads the entire artifact.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;
}

/// Default provider: artifacts staged on the local filesystem.
#[derive(Debug, Default)]
pub struct LocalArtifactProvider;

impl ArtifactProvider for LocalArtifactProvider {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| EngineError::Io(format!("{}: {e}", path.display())))
    }
}
