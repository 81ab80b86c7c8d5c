//! External-data seams for the pipeline: artifact bytes and ambient secrets.

pub mod artifact;
pub mod secrets;

pub use artifact::{ArtifactProvider, LocalArtifactProvider};
pub use secrets::{EnvSecrets, MapSecrets, SecretProvider};
