//! Path-based group assignment.

use super::{FileGroup, FileGroups};

/// Assigns groups to a repository-relative path.
///
/// Classification is a pure function of the path: the same path always maps
/// to the same set of groups, independent of any other file in the change.
/// A file may match several predicates and so belong to several groups.
#[must_use]
pub fn classify(path: &str) -> FileGroups {
    let mut groups = FileGroups::new();
    let base = basename(path);

    if path.starts_with("changelog/") {
        groups.insert(FileGroup::Changelog);
    }

    if path.starts_with("docs/") || path.starts_with("website/") || is_readme(base) {
        groups.insert(FileGroup::Docs);
    }

    if path.starts_with(".github/") || path.starts_with("tools/") || path.starts_with(".release/") {
        groups.insert(FileGroup::Pipeline);
    }

    if path.starts_with("ui/") {
        groups.insert(FileGroup::Ui);
    }

    if is_enterprise(path, base) {
        groups.insert(FileGroup::Enterprise);
    }

    if matches!(base, "go.mod" | "go.sum" | ".go-version") {
        groups.insert(FileGroup::GoToolchain);
        groups.insert(FileGroup::App);
    }

    if path.ends_with(".go") || path.ends_with(".proto") {
        groups.insert(FileGroup::App);
    }

    groups
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn is_readme(base: &str) -> bool {
    let lower = base.to_ascii_lowercase();
    lower == "readme.md" || lower == "readme"
}

/// Enterprise files live in `*_ent` directories or carry an `_ent` stem
/// suffix (`foo_ent.go`, `foo_ent_test.go`).
fn is_enterprise(path: &str, base: &str) -> bool {
    if path.split('/').any(|seg| seg.ends_with("_ent") && !seg.contains('.')) {
        return true;
    }
    let stem = base.rsplit_once('.').map_or(base, |(s, _)| s);
    stem.ends_with("_ent") || stem.ends_with("_ent_test")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(path: &str) -> Vec<&'static str> {
        classify(path).iter().map(|g| g.as_str()).collect()
    }

    #[test]
    fn enterprise_go_mod_gets_three_groups() {
        // The canonical mixed case: an enterprise module manifest.
        assert_eq!(groups("vault_ent/go.mod"), ["app", "enterprise", "gotoolchain"]);
    }

    #[test]
    fn top_level_go_mod_is_toolchain_and_app() {
        assert_eq!(groups("go.mod"), ["app", "gotoolchain"]);
    }

    #[test]
    fn changelog_entry() {
        assert_eq!(groups("changelog/12345.txt"), ["changelog"]);
    }

    #[test]
    fn docs_and_website() {
        assert_eq!(groups("website/content/docs/index.mdx"), ["docs"]);
        assert_eq!(groups("docs/agent.md"), ["docs"]);
        assert_eq!(groups("README.md"), ["docs"]);
    }

    #[test]
    fn pipeline_paths() {
        assert_eq!(groups(".github/workflows/build.yml"), ["pipeline"]);
        assert_eq!(groups("tools/pipeline/main.go"), ["app", "pipeline"]);
        assert_eq!(groups(".release/versions.toml"), ["pipeline"]);
    }

    #[test]
    fn enterprise_stem_suffixes() {
        assert_eq!(groups("vault/core_ent.go"), ["app", "enterprise"]);
        assert_eq!(groups("vault/core_ent_test.go"), ["app", "enterprise"]);
        assert_eq!(groups("vault/core.go"), ["app"]);
    }

    #[test]
    fn ui_sources() {
        assert_eq!(groups("ui/app/router.js"), ["ui"]);
    }

    #[test]
    fn unknown_files_have_no_groups() {
        assert!(classify("LICENSE").is_empty());
    }

    #[test]
    fn classification_is_deterministic() {
        for _ in 0..3 {
            assert_eq!(classify("vault_ent/go.mod"), classify("vault_ent/go.mod"));
        }
    }
}
