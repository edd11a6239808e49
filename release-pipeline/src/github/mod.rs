//! GitHub workflows and host plumbing.
//!
//! The three propagation workflows live here: [`CreateBackportReq`] carries
//! merged pull requests to sibling branches, [`CreateCopyReq`] moves
//! community pull requests into the enterprise repository, and
//! [`CloseOriginReq`] closes a copy's origin after the copy merges. All of
//! them talk to GitHub through the [`GithubHost`] trait.

mod attempt;
mod backport;
mod branch;
mod close_origin;
mod comment;
mod copy;
mod error;
mod host;
mod refs;
mod transfer;
mod types;

pub use attempt::{skip_check, PropagationAttempt, PropagationResult, SkipCheck};
pub use backport::CreateBackportReq;
pub use branch::{
    backport_branch_name, copy_branch_name, parse_copy_branch, BranchNameError, CopyOrigin,
    MAX_BRANCH_LEN,
};
pub use close_origin::{CloseOriginReq, CloseOriginRes};
pub use comment::{truncate_body, MAX_COMMENT_LEN};
pub use copy::CreateCopyReq;
pub use error::{GithubError, RequestError};
pub use host::{GithubHost, OctocrabHost};
pub use refs::RefScheme;
pub use types::{
    ClosingIssue, CreatedPullRequest, NewPullRequest, PostedComment, PullCommit, PullRequestRef,
    PullRequestState,
};
