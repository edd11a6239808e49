//! Go module manifest differ.
//!
//! Answers "do these two `go.mod` files diverge in a way that matters"
//! for the community/enterprise split, where both repositories carry
//! module manifests that must track each other. Comparison is structural
//! and directive-scoped rather than textual, so formatting and ordering
//! differences never count as divergence.

mod diff;
mod error;
mod parse;

pub use diff::{diff_mod_files, DiffOptions, Directive, DirectiveDiff};
pub use error::GomodError;
pub use parse::{parse, GoDebug, ModFile, ModuleVersion, ParseMode, Replace, Retract};

use std::path::PathBuf;

use tracing::debug;

/// A request to diff two module manifest files.
#[derive(Debug, Clone)]
pub struct DiffModulesReq {
    pub a_path: PathBuf,
    pub b_path: PathBuf,
    pub mode: ParseMode,
    pub opts: DiffOptions,
}

impl DiffModulesReq {
    /// Reads, parses and diffs the two manifests.
    ///
    /// # Errors
    ///
    /// Fails when either file cannot be read or parsed; parse failures
    /// produce no partial diff.
    pub fn run(&self) -> Result<Vec<DirectiveDiff>, GomodError> {
        debug!(
            a = %self.a_path.display(),
            b = %self.b_path.display(),
            "diffing module manifests"
        );

        let read = |path: &PathBuf| {
            std::fs::read_to_string(path).map_err(|source| GomodError::Io {
                path: path.display().to_string(),
                source,
            })
        };

        let a = parse(&self.a_path.display().to_string(), &read(&self.a_path)?, self.mode)?;
        let b = parse(&self.b_path.display().to_string(), &read(&self.b_path)?, self.mode)?;

        Ok(diff_mod_files(&a, &b, &self.opts))
    }
}
