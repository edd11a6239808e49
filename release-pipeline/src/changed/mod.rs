//! Changed-file classification.
//!
//! Every file touched by a pull request is assigned to zero or more named
//! groups. The backport and copy workflows use group membership to decide
//! whether a file may land on a community branch and whether an inactive
//! community branch must receive a backport anyway.

mod classify;
mod file;

pub use classify::classify;
pub use file::{ChangedFile, FileGroup, FileGroups};

/// Returns true when every file belongs to at least one of `groups`.
///
/// An empty file list returns false: "all files are excluded" is a statement
/// about files that exist.
#[must_use]
pub fn each_has_any_group(files: &[ChangedFile], groups: &FileGroups) -> bool {
    !files.is_empty() && files.iter().all(|f| f.groups.intersects(groups))
}

/// Returns the union of the groups of all files.
#[must_use]
pub fn union_groups(files: &[ChangedFile]) -> FileGroups {
    files
        .iter()
        .flat_map(|f| f.groups.iter().copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str) -> ChangedFile {
        ChangedFile::classified(path, "0000000000000000000000000000000000000000")
    }

    #[test]
    fn each_has_any_group_requires_files() {
        let exclude: FileGroups = [FileGroup::Enterprise].into_iter().collect();
        assert!(!each_has_any_group(&[], &exclude));
    }

    #[test]
    fn each_has_any_group_all_enterprise() {
        let exclude: FileGroups = [FileGroup::Enterprise].into_iter().collect();
        let files = vec![file("vault_ent/go.mod"), file("helper_ent.go")];
        assert!(each_has_any_group(&files, &exclude));
    }

    #[test]
    fn each_has_any_group_mixed() {
        let exclude: FileGroups = [FileGroup::Enterprise].into_iter().collect();
        let files = vec![file("go.mod"), file("vault_ent/go.mod")];
        assert!(!each_has_any_group(&files, &exclude));
    }

    #[test]
    fn union_groups_collects_all() {
        let files = vec![file("changelog/1234.txt"), file("vault_ent/go.mod")];
        let union = union_groups(&files);
        assert!(union.contains(FileGroup::Changelog));
        assert!(union.contains(FileGroup::Enterprise));
        assert!(union.contains(FileGroup::GoToolchain));
    }
}
