//! Release-version registry error types.

use thiserror::Error;

/// Errors that can occur while loading the versions configuration.
#[derive(Debug, Error)]
pub enum ReleasesError {
    /// The configuration file could not be located.
    #[error("no versions configuration found within {depth} directories above '{start}'")]
    NotFound { start: String, depth: usize },

    /// Failed to read the configuration file.
    #[error("failed to read versions configuration '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse versions configuration '{path}': {source}")]
    Toml {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}
