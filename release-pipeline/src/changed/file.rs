//! Changed-file and file-group types.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// A named group a changed file can belong to.
///
/// The set of groups is closed: downstream policy (exclusion from community
/// branches, forced backports to inactive branches) names groups from this
/// enum and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileGroup {
    /// Application source code.
    App,
    /// Changelog entries.
    Changelog,
    /// Documentation and website content.
    Docs,
    /// Enterprise-only files. Never carried onto community branches.
    Enterprise,
    /// Go module and toolchain manifests.
    #[serde(rename = "gotoolchain")]
    GoToolchain,
    /// CI and pipeline tooling.
    Pipeline,
    /// Web UI sources.
    Ui,
}

impl FileGroup {
    /// Returns the short name used in skip reasons and CLI flags.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Changelog => "changelog",
            Self::Docs => "docs",
            Self::Enterprise => "enterprise",
            Self::GoToolchain => "gotoolchain",
            Self::Pipeline => "pipeline",
            Self::Ui => "ui",
        }
    }

    /// Parses a short group name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "app" => Some(Self::App),
            "changelog" => Some(Self::Changelog),
            "docs" => Some(Self::Docs),
            "enterprise" => Some(Self::Enterprise),
            "gotoolchain" => Some(Self::GoToolchain),
            "pipeline" => Some(Self::Pipeline),
            "ui" => Some(Self::Ui),
            _ => None,
        }
    }
}

impl fmt::Display for FileGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered set of file groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileGroups(BTreeSet<FileGroup>);

impl FileGroups {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group to the set.
    pub fn insert(&mut self, group: FileGroup) {
        self.0.insert(group);
    }

    /// Returns true if `group` is a member.
    #[must_use]
    pub fn contains(&self, group: FileGroup) -> bool {
        self.0.contains(&group)
    }

    /// Returns true if the two sets share at least one group.
    #[must_use]
    pub fn intersects(&self, other: &FileGroups) -> bool {
        self.0.iter().any(|g| other.0.contains(g))
    }

    /// Returns true if the set has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the groups in their stable order.
    pub fn iter(&self) -> impl Iterator<Item = &FileGroup> {
        self.0.iter()
    }
}

impl fmt::Display for FileGroups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(FileGroup::as_str).collect();
        f.write_str(&names.join(", "))
    }
}

impl FromIterator<FileGroup> for FileGroups {
    fn from_iter<T: IntoIterator<Item = FileGroup>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A file changed by a pull request, with its assigned groups.
#[derive(Debug, Clone, Serialize)]
pub struct ChangedFile {
    /// Repository-relative path.
    pub path: String,
    /// Blob SHA reported by GitHub.
    pub sha: String,
    /// Groups assigned by the classifier.
    pub groups: FileGroups,
}

impl ChangedFile {
    /// Builds a file with groups assigned by [`classify`][super::classify].
    #[must_use]
    pub fn classified(path: &str, sha: &str) -> Self {
        Self {
            path: path.to_string(),
            sha: sha.to_string(),
            groups: super::classify(path),
        }
    }

    /// Returns true if the file belongs to any of `groups`.
    #[must_use]
    pub fn in_any(&self, groups: &FileGroups) -> bool {
        self.groups.intersects(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_names_round_trip() {
        for group in [
            FileGroup::App,
            FileGroup::Changelog,
            FileGroup::Docs,
            FileGroup::Enterprise,
            FileGroup::GoToolchain,
            FileGroup::Pipeline,
            FileGroup::Ui,
        ] {
            assert_eq!(FileGroup::parse(group.as_str()), Some(group));
        }
        assert_eq!(FileGroup::parse("nonsense"), None);
    }

    #[test]
    fn groups_display_is_sorted_and_comma_joined() {
        let groups: FileGroups = [FileGroup::Pipeline, FileGroup::Changelog]
            .into_iter()
            .collect();
        assert_eq!(groups.to_string(), "changelog, pipeline");
    }

    #[test]
    fn intersects_is_symmetric() {
        let a: FileGroups = [FileGroup::App, FileGroup::Docs].into_iter().collect();
        let b: FileGroups = [FileGroup::Docs].into_iter().collect();
        let c: FileGroups = [FileGroup::Enterprise].into_iter().collect();
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
    }
}
