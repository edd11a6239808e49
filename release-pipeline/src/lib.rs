//! Release-pipeline automation for a dual community/enterprise repository.
//!
//! The crate drives the repetitive maintenance work that surrounds the
//! split between a public ("community", CE) repository and a private
//! ("enterprise") repository embedding it:
//!
//! - [`github::CreateBackportReq`] backports a merged pull request onto
//!   its sibling release branches,
//! - [`github::CreateCopyReq`] copies an accepted community pull request
//!   into the enterprise repository,
//! - [`github::CloseOriginReq`] closes a copy's origin pull request and
//!   linked issues once the copy merges, and
//! - [`gomod::DiffModulesReq`] reports meaningful divergence between two
//!   Go module manifests.
//!
//! Supporting modules classify changed files ([`changed`]), load the
//! active release-version registry ([`releases`]), wrap the `git` binary
//! ([`git`]) and render pull request bodies ([`templates`]).

pub mod changed;
pub mod git;
pub mod github;
pub mod gomod;
pub mod releases;
pub mod templates;

pub use changed::{classify, ChangedFile, FileGroup, FileGroups};
pub use github::{
    CloseOriginReq, CloseOriginRes, CreateBackportReq, CreateCopyReq, GithubHost, OctocrabHost,
    PropagationResult, RefScheme,
};
pub use gomod::{DiffModulesReq, DiffOptions, ParseMode};
pub use releases::{load_active_versions, ActiveVersions, Version};
