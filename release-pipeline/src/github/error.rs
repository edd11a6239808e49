//! GitHub host error types.

use thiserror::Error;

/// Errors that can occur while talking to GitHub.
#[derive(Debug, Error)]
pub enum GithubError {
    /// GitHub API error.
    #[error("GitHub API error: {0}")]
    Api(#[from] octocrab::Error),

    /// A GraphQL response did not have the expected shape.
    #[error("unexpected GraphQL response: missing {0}")]
    GraphQl(String),
}

/// A request was missing a required field. Validation failures are fatal
/// and reported before any comment is posted or branch is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("no github organization has been provided")]
    MissingOwner,

    #[error("no github repository has been provided")]
    MissingRepo,

    #[error("no pull request number has been provided")]
    MissingPullNumber,

    #[error("no base origin has been configured")]
    MissingBaseOrigin,

    #[error("no ce branch prefix has been configured")]
    MissingCePrefix,

    #[error("no backport label prefix has been configured")]
    MissingLabelPrefix,

    #[error("no access token has been provided")]
    MissingToken,

    #[error("no origin repository has been provided")]
    MissingOriginRepo,
}
