//! Branch reference scheme for the dual community/enterprise repository.
//!
//! Branches come in two flavors: community branches carry the CE prefix
//! (`ce/main`, `ce/release/1.19.x`) and everything else is enterprise
//! (`main`, `release/1.19.x+ent`). An optional enterprise prefix exists so
//! the scheme can be exercised against sandbox repositories where both
//! flavors live under distinct prefixes.
//!
//! Every ref reduces to a version key that matches the keys of the active
//! version registry and the suffix of backport labels:
//!
//! ```text
//! ce/main                => main
//! main                   => main
//! ce/release/1.19.x      => release/1.19.x
//! release/1.19.x+ent     => release/1.19.x
//! ent/release/1.19.x+ent => release/1.19.x
//! ```

use tracing::{debug, warn};

/// Prefix rules for community and enterprise branches plus backport labels.
#[derive(Debug, Clone)]
pub struct RefScheme {
    /// Prefix of community branches, e.g. `ce`.
    pub ce_branch_prefix: String,
    /// Optional prefix of enterprise branches, for sandbox repositories.
    pub ent_branch_prefix: Option<String>,
    /// Prefix of backport labels, e.g. `backport`.
    pub backport_label_prefix: String,
}

impl Default for RefScheme {
    fn default() -> Self {
        Self {
            ce_branch_prefix: "ce".to_string(),
            ent_branch_prefix: None,
            backport_label_prefix: "backport".to_string(),
        }
    }
}

impl RefScheme {
    /// Whether the ref is a community branch.
    #[must_use]
    pub fn has_ce_prefix(&self, target_ref: &str) -> bool {
        target_ref.starts_with(&format!("{}/", self.ce_branch_prefix))
    }

    /// Whether the ref carries the enterprise prefix, when one is set.
    #[must_use]
    pub fn has_ent_prefix(&self, target_ref: &str) -> bool {
        match &self.ent_branch_prefix {
            Some(prefix) => target_ref.starts_with(&format!("{prefix}/")),
            None => false,
        }
    }

    /// Any branch without the CE prefix belongs to the enterprise flavor.
    #[must_use]
    pub fn is_ent_ref(&self, target_ref: &str) -> bool {
        !self.has_ce_prefix(target_ref)
    }

    /// Reduces a ref to its version key.
    #[must_use]
    pub fn version_key(&self, target_ref: &str) -> String {
        let stripped = if self.has_ce_prefix(target_ref) {
            &target_ref[self.ce_branch_prefix.len() + 1..]
        } else if self.has_ent_prefix(target_ref) {
            let prefix = self.ent_branch_prefix.as_deref().unwrap_or_default();
            &target_ref[prefix.len() + 1..]
        } else {
            target_ref
        };
        stripped.trim_end_matches("+ent").to_string()
    }

    /// The registry key of a release version key: `release/1.19.x` maps to
    /// `1.19.x`. `main` and other non-release keys have no registry entry.
    #[must_use]
    pub fn release_version<'a>(&self, version_key: &'a str) -> Option<&'a str> {
        version_key.strip_prefix("release/")
    }

    /// The community branch for a version key.
    #[must_use]
    pub fn ce_ref(&self, version_key: &str) -> String {
        format!("{}/{version_key}", self.ce_branch_prefix)
    }

    /// The enterprise release branch for a bare version, e.g. `1.19.x`
    /// becomes `release/1.19.x+ent`.
    #[must_use]
    pub fn ent_release_ref(&self, version: &str) -> String {
        match &self.ent_branch_prefix {
            Some(prefix) => format!("{prefix}/release/{version}+ent"),
            None => format!("release/{version}+ent"),
        }
    }

    /// The enterprise branch a community version key lands on when copied:
    /// `main` stays `main` and release keys gain the `+ent` suffix.
    #[must_use]
    pub fn ent_ref(&self, version_key: &str) -> String {
        let bare = if version_key == "main" {
            "main".to_string()
        } else {
            format!("{version_key}+ent")
        };
        match &self.ent_branch_prefix {
            Some(prefix) => format!("{prefix}/{bare}"),
            None => bare,
        }
    }

    /// Plans the backport target refs for a merged pull request.
    ///
    /// An enterprise base always gets a backport to the corresponding CE
    /// branch first; its backport labels then map to enterprise release
    /// branches. A community base maps labels to CE release branches only.
    /// Labels that do not carry the backport prefix are ignored, a label
    /// naming the base's own version is refused, and duplicates are planned
    /// once.
    #[must_use]
    pub fn plan_backport_refs(&self, base_ref: &str, labels: &[String]) -> Vec<String> {
        let base_version = self.version_key(base_ref);
        debug!(
            base_ref,
            base_version,
            labels = labels.join(" "),
            "planning backport target refs"
        );

        let mut refs: Vec<String> = Vec::new();
        let mut push = |target: String| {
            if !refs.contains(&target) {
                refs.push(target);
            }
        };

        let ent_base = self.is_ent_ref(base_ref);
        if ent_base {
            push(self.ce_ref(&base_version));
        }

        for label in labels {
            let Some((prefix, version)) = label.split_once('/') else {
                debug!(label, "skipping label without a backport prefix");
                continue;
            };
            if prefix != self.backport_label_prefix {
                debug!(label, "skipping label without a backport prefix");
                continue;
            }
            if version == base_version {
                warn!(label, base_version, "cannot backport to the base ref itself");
                continue;
            }
            if ent_base {
                push(self.ent_release_ref(version));
            } else {
                push(format!("{}/release/{version}", self.ce_branch_prefix));
            }
        }

        debug!(refs = refs.join(","), "planned backport target refs");
        refs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme() -> RefScheme {
        RefScheme::default()
    }

    #[test]
    fn version_key_strips_prefixes_and_ent_suffix() {
        let s = scheme();
        assert_eq!(s.version_key("ce/main"), "main");
        assert_eq!(s.version_key("main"), "main");
        assert_eq!(s.version_key("ce/release/1.19.x"), "release/1.19.x");
        assert_eq!(s.version_key("release/1.19.x+ent"), "release/1.19.x");

        let prefixed = RefScheme {
            ent_branch_prefix: Some("ent".to_string()),
            ..RefScheme::default()
        };
        assert_eq!(
            prefixed.version_key("ent/release/1.19.x+ent"),
            "release/1.19.x"
        );
    }

    #[test]
    fn enterprise_main_backports_to_ce_main() {
        let refs = scheme().plan_backport_refs("main", &[]);
        assert_eq!(refs, ["ce/main"]);
    }

    #[test]
    fn enterprise_labels_map_to_enterprise_release_refs() {
        let labels = vec![
            "backport/1.19.x".to_string(),
            "docs".to_string(),
            "backport/1.18.x".to_string(),
        ];
        let refs = scheme().plan_backport_refs("main", &labels);
        assert_eq!(
            refs,
            ["ce/main", "release/1.19.x+ent", "release/1.18.x+ent"]
        );
    }

    #[test]
    fn community_labels_map_to_ce_release_refs() {
        let labels = vec!["backport/1.19.x".to_string()];
        let refs = scheme().plan_backport_refs("ce/main", &labels);
        assert_eq!(refs, ["ce/release/1.19.x"]);
    }

    #[test]
    fn label_for_the_base_version_is_refused() {
        let labels = vec!["backport/main".to_string()];
        let refs = scheme().plan_backport_refs("main", &labels);
        assert_eq!(refs, ["ce/main"]);
    }

    #[test]
    fn duplicate_labels_plan_once() {
        let labels = vec![
            "backport/1.19.x".to_string(),
            "backport/1.19.x".to_string(),
        ];
        let refs = scheme().plan_backport_refs("ce/main", &labels);
        assert_eq!(refs, ["ce/release/1.19.x"]);
    }

    #[test]
    fn ent_ref_maps_community_version_keys() {
        let s = scheme();
        assert_eq!(s.ent_ref("main"), "main");
        assert_eq!(s.ent_ref("release/1.19.x"), "release/1.19.x+ent");

        let prefixed = RefScheme {
            ent_branch_prefix: Some("ent".to_string()),
            ..RefScheme::default()
        };
        assert_eq!(prefixed.ent_ref("main"), "ent/main");
        assert_eq!(
            prefixed.ent_ref("release/1.19.x"),
            "ent/release/1.19.x+ent"
        );
    }

    #[test]
    fn release_version_requires_release_key() {
        let s = scheme();
        assert_eq!(s.release_version("release/1.19.x"), Some("1.19.x"));
        assert_eq!(s.release_version("main"), None);
    }
}
