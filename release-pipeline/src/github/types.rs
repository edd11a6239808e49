//! Engine-facing GitHub domain types.
//!
//! The propagation engine never handles octocrab models directly; the host
//! implementation converts API responses into these types so that workflows
//! can be driven by fakes in tests.

use serde::Serialize;

/// Whether a pull request is open or closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    Open,
    Closed,
}

/// A snapshot of a source pull request. Immutable for the lifetime of a
/// request.
#[derive(Debug, Clone, Serialize)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub base_ref: String,
    pub head_ref: String,
    pub head_sha: String,
    pub merge_commit_sha: Option<String>,
    pub state: PullRequestState,
    pub merged: bool,
    pub labels: Vec<String>,
    pub assignee: Option<String>,
    pub merged_by: Option<String>,
}

/// Parameters for opening a pull request.
#[derive(Debug, Clone)]
pub struct NewPullRequest {
    pub title: String,
    pub head: String,
    pub base: String,
    pub body: String,
}

/// A pull request created by the engine.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedPullRequest {
    pub number: u64,
    pub html_url: String,
}

/// One commit of a source pull request.
#[derive(Debug, Clone)]
pub struct PullCommit {
    pub sha: String,
    pub author_name: String,
    pub author_email: String,
}

/// An issue that a pull request would close on merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosingIssue {
    pub url: String,
    pub number: u64,
    pub title: String,
    pub closed: bool,
    pub name_with_owner: String,
}

impl ClosingIssue {
    /// Identity for de-duplication across the origin and copy PR lists.
    #[must_use]
    pub fn key(&self) -> (String, u64, String, String) {
        (
            self.url.clone(),
            self.number,
            self.title.clone(),
            self.name_with_owner.clone(),
        )
    }

    /// Splits `nameWithOwner` into `(owner, repo)`.
    ///
    /// GitHub repository names cannot contain `/`, so a single split is
    /// sufficient; anything else is malformed.
    #[must_use]
    pub fn owner_repo(&self) -> Option<(&str, &str)> {
        self.name_with_owner.split_once('/')
    }
}

/// A posted issue comment.
#[derive(Debug, Clone, Serialize)]
pub struct PostedComment {
    pub html_url: String,
}
