//! Active release-version registry.
//!
//! Release metadata lives in `.release/versions.toml` at the repository
//! root. Each entry describes one release series and whether its community
//! branch still receives backports:
//!
//! ```toml
//! [versions."1.19.x"]
//! ce-active = true
//! lts = true
//! ```
//!
//! The registry is loaded once per request and never mutated afterwards.

mod error;

pub use error::ReleasesError;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

/// Repository-relative location of the versions configuration.
pub const VERSIONS_CONFIG_PATH: &str = ".release/versions.toml";

/// One release series from the versions configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Version {
    /// Whether the community branch for this series still takes backports.
    pub ce_active: bool,

    /// Whether the series is under long-term support.
    #[serde(default)]
    pub lts: bool,
}

/// A snapshot of all configured release series, keyed by version label
/// (e.g. `1.19.x`).
pub type ActiveVersions = BTreeMap<String, Version>;

#[derive(Debug, Deserialize)]
struct VersionsConfig {
    versions: ActiveVersions,
}

/// Loads the active-versions snapshot.
///
/// When `path` is given it must point at the configuration file. Otherwise
/// the file is searched for as `.release/versions.toml` starting at
/// `start_dir` and walking up at most `search_depth` parent directories.
///
/// # Errors
///
/// Returns [`ReleasesError::NotFound`] when the search exhausts its depth,
/// and I/O or TOML errors when the file cannot be read or parsed. Parse
/// errors are fatal to the containing request.
pub fn load_active_versions(
    path: Option<&Path>,
    start_dir: &Path,
    search_depth: usize,
) -> Result<ActiveVersions, ReleasesError> {
    let config_path = match path {
        Some(p) => p.to_path_buf(),
        None => find_versions_config(start_dir, search_depth)?,
    };

    debug!(path = %config_path.display(), "loading active versions");

    let raw = std::fs::read_to_string(&config_path).map_err(|source| ReleasesError::Io {
        path: config_path.display().to_string(),
        source,
    })?;

    let config: VersionsConfig = toml::from_str(&raw).map_err(|source| ReleasesError::Toml {
        path: config_path.display().to_string(),
        source,
    })?;

    Ok(config.versions)
}

/// Walks from `start_dir` upward looking for the versions configuration.
fn find_versions_config(start_dir: &Path, search_depth: usize) -> Result<PathBuf, ReleasesError> {
    let mut dir = start_dir.to_path_buf();
    for _ in 0..=search_depth {
        let candidate = dir.join(VERSIONS_CONFIG_PATH);
        if candidate.is_file() {
            return Ok(candidate);
        }
        if !dir.pop() {
            break;
        }
    }

    Err(ReleasesError::NotFound {
        start: start_dir.display().to_string(),
        depth: search_depth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_config(dir: &Path) {
        fs::create_dir_all(dir.join(".release")).unwrap();
        fs::write(
            dir.join(VERSIONS_CONFIG_PATH),
            r#"
[versions."1.19.x"]
ce-active = true
lts = true

[versions."1.18.x"]
ce-active = false
"#,
        )
        .unwrap();
    }

    #[test]
    fn loads_explicit_path() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path());

        let versions = load_active_versions(
            Some(&temp.path().join(VERSIONS_CONFIG_PATH)),
            temp.path(),
            0,
        )
        .unwrap();

        assert!(versions["1.19.x"].ce_active);
        assert!(versions["1.19.x"].lts);
        assert!(!versions["1.18.x"].ce_active);
        assert!(!versions["1.18.x"].lts);
    }

    #[test]
    fn searches_parent_directories() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path());
        let nested = temp.path().join("tools/pipeline");
        fs::create_dir_all(&nested).unwrap();

        let versions = load_active_versions(None, &nested, 3).unwrap();
        assert_eq!(versions.len(), 2);
    }

    #[test]
    fn search_depth_is_bounded() {
        let temp = TempDir::new().unwrap();
        write_config(temp.path());
        let nested = temp.path().join("a/b/c/d");
        fs::create_dir_all(&nested).unwrap();

        let result = load_active_versions(None, &nested, 2);
        assert!(matches!(result, Err(ReleasesError::NotFound { .. })));
    }

    #[test]
    fn malformed_config_is_fatal() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(".release")).unwrap();
        fs::write(temp.path().join(VERSIONS_CONFIG_PATH), "versions = 42").unwrap();

        let result = load_active_versions(None, temp.path(), 0);
        assert!(matches!(result, Err(ReleasesError::Toml { .. })));
    }
}
