//! Module differ error types.

use thiserror::Error;

/// Errors loading or parsing Go module manifests.
///
/// Parse errors are per-side and fail the whole diff; there is no partial
/// output.
#[derive(Debug, Error)]
pub enum GomodError {
    /// Could not read a manifest file.
    #[error("reading module file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A manifest line could not be parsed.
    #[error("{file}:{line}: {message}")]
    Parse {
        file: String,
        line: usize,
        message: String,
    },
}
