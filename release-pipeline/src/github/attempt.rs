//! Per-target attempt records and the shared propagation result.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::comment;
use super::refs::RefScheme;
use super::types::{CreatedPullRequest, PullRequestRef};
use crate::changed::{union_groups, ChangedFile, FileGroups};
use crate::releases::ActiveVersions;

/// One attempt at propagating a pull request to a target branch.
///
/// An attempt either skips (with a reason) or progresses: a failed transfer
/// still pushes a placeholder branch and opens a pull request where
/// possible, so `error` and `pull_request` can both be set.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PropagationAttempt {
    /// The target base branch.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub base_ref: String,
    /// The branch pushed for this attempt.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target_ref: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub skipped: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub skipped_reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pull_request: Option<CreatedPullRequest>,
}

impl PropagationAttempt {
    /// Appends an error, keeping any earlier one.
    pub fn push_error(&mut self, message: String) {
        self.error = Some(match self.error.take() {
            Some(existing) => format!("{existing}\n{message}"),
            None => message,
        });
    }
}

/// The outcome of a backport or copy request.
///
/// Requests always produce a result, even when things go wrong: errors are
/// embedded rather than returned so that every target gets its attempt and
/// the source pull request gets its status comment.
#[derive(Debug, Default, Serialize)]
pub struct PropagationResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_pull_request: Option<PullRequestRef>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attempts: BTreeMap<String, PropagationAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PropagationResult {
    /// Appends a top-level error, keeping any earlier one.
    pub fn push_error(&mut self, message: String) {
        self.error = Some(match self.error.take() {
            Some(existing) => format!("{existing}\n{message}"),
            None => message,
        });
    }

    /// Errors of individual attempts, in target order.
    #[must_use]
    pub fn attempt_errors(&self) -> Vec<&str> {
        self.attempts
            .values()
            .filter_map(|attempt| attempt.error.as_deref())
            .collect()
    }

    /// A single combined error covering the run and every attempt, or
    /// `None` when everything succeeded.
    #[must_use]
    pub fn err(&self) -> Option<String> {
        let mut parts: Vec<&str> = Vec::new();
        if let Some(error) = &self.error {
            parts.push(error);
        }
        parts.extend(self.attempt_errors());
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }

    /// The markdown status comment for this result.
    #[must_use]
    pub fn comment_body(&self, workflow: &str) -> String {
        comment::status_comment(workflow, &self.attempts, self.error.as_deref(), self.err())
    }

    /// Serializes the result to JSON.
    ///
    /// # Errors
    ///
    /// Fails when serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Whether a target ref should be skipped or progressed.
#[derive(Debug, PartialEq, Eq)]
pub enum SkipCheck {
    /// Skip the target, with a human-readable reason.
    Skip(String),
    /// Progress the target; the reason is logged, not reported.
    Proceed(&'static str),
}

/// Decides whether propagation to `target_ref` should be skipped.
///
/// The rules run in order and the first match wins: an empty change set,
/// a missing version key, or a missing ref always skip; enterprise targets
/// always progress; community targets skip when every changed file is in
/// an excluded group, progress for `ce/main` or when an allow-inactive
/// group changed, and otherwise follow the active version registry.
#[must_use]
pub fn skip_check(
    scheme: &RefScheme,
    target_ref: &str,
    version_key: &str,
    active_versions: &ActiveVersions,
    changed_files: &[ChangedFile],
    ce_exclude: &FileGroups,
    ce_allow_inactive: &FileGroups,
) -> SkipCheck {
    debug!(target_ref, version_key, "determining whether to skip target");

    if changed_files.is_empty() {
        return SkipCheck::Skip("no files were changed".to_string());
    }
    if version_key.is_empty() {
        return SkipCheck::Skip("missing base ref".to_string());
    }
    if target_ref.is_empty() {
        return SkipCheck::Skip("missing ref".to_string());
    }

    if scheme.is_ent_ref(target_ref) {
        return SkipCheck::Proceed("enterprise branches are always propagated");
    }

    if crate::changed::each_has_any_group(changed_files, ce_exclude) {
        return SkipCheck::Skip(format!(
            "all changed files are in excluded groups: {ce_exclude}"
        ));
    }

    if target_ref == scheme.ce_ref("main") {
        return SkipCheck::Proceed("ce/main is always active and there are CE allowed files");
    }

    let changed_groups = union_groups(changed_files);
    if changed_groups.intersects(ce_allow_inactive) {
        return SkipCheck::Proceed("changed file groups are allowed on inactive branches");
    }

    if let Some(version) = scheme.release_version(version_key) {
        if let Some(entry) = active_versions.get(version) {
            if entry.ce_active {
                return SkipCheck::Proceed("CE branch is active");
            }
            return SkipCheck::Skip("CE branch is inactive".to_string());
        }
    }

    SkipCheck::Skip(format!(
        "could not find branch in active branches configuration: {version_key}"
    ))
}
