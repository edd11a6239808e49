//! Copy and backport branch names.
//!
//! Copy branches encode their origin so that the close-origin workflow can
//! recover the community pull request from a copy PR's head ref alone:
//!
//! ```text
//! copy/<origin owner>/<origin repo>/<origin number>/<origin head ref>
//! ```
//!
//! Backport branches carry the target base ref and the source head ref:
//!
//! ```text
//! backport/<target ref>/<source head ref>
//! ```
//!
//! Both are truncated to [`MAX_BRANCH_LEN`] characters at a character
//! boundary; GitHub rejects longer ref names.

use thiserror::Error;

/// Maximum branch name length accepted by GitHub.
pub const MAX_BRANCH_LEN: usize = 250;

const COPY_PREFIX: &str = "copy";
const BACKPORT_PREFIX: &str = "backport";

/// Errors decoding a copy branch name.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BranchNameError {
    #[error("branch name is empty")]
    Empty,

    #[error("branch '{0}' is not a copy branch")]
    NotCopy(String),

    #[error("branch '{0}' does not have the five segments of a copy branch")]
    TooFewSegments(String),

    #[error("branch '{name}' has a non-numeric pull request number '{number}'")]
    BadNumber { name: String, number: String },
}

/// The origin pull request recovered from a copy branch name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyOrigin {
    pub owner: String,
    pub repo: String,
    pub number: u64,
    pub pr_branch: String,
}

/// Encodes the head branch name for a copy pull request.
#[must_use]
pub fn copy_branch_name(owner: &str, repo: &str, number: u64, pr_branch: &str) -> String {
    truncate_branch(format!("{COPY_PREFIX}/{owner}/{repo}/{number}/{pr_branch}"))
}

/// Encodes the head branch name for a backport pull request.
#[must_use]
pub fn backport_branch_name(target_ref: &str, pr_branch: &str) -> String {
    truncate_branch(format!("{BACKPORT_PREFIX}/{target_ref}/{pr_branch}"))
}

/// Decodes a copy branch name back into its origin coordinates.
///
/// The origin head ref is everything after the fourth `/`, so head refs
/// containing slashes round-trip.
///
/// # Errors
///
/// Fails when the name is empty, does not start with the copy prefix, has
/// fewer than five segments, or carries a non-numeric pull request number.
pub fn parse_copy_branch(name: &str) -> Result<CopyOrigin, BranchNameError> {
    if name.is_empty() {
        return Err(BranchNameError::Empty);
    }

    let mut parts = name.splitn(5, '/');
    let prefix = parts.next().unwrap_or_default();
    if prefix != COPY_PREFIX {
        return Err(BranchNameError::NotCopy(name.to_string()));
    }

    let (Some(owner), Some(repo), Some(number), Some(pr_branch)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(BranchNameError::TooFewSegments(name.to_string()));
    };
    if owner.is_empty() || repo.is_empty() || pr_branch.is_empty() {
        return Err(BranchNameError::TooFewSegments(name.to_string()));
    }

    let number: u64 = number.parse().map_err(|_| BranchNameError::BadNumber {
        name: name.to_string(),
        number: number.to_string(),
    })?;

    Ok(CopyOrigin {
        owner: owner.to_string(),
        repo: repo.to_string(),
        number,
        pr_branch: pr_branch.to_string(),
    })
}

/// Truncates to [`MAX_BRANCH_LEN`] characters without splitting a character.
fn truncate_branch(name: String) -> String {
    match name.char_indices().nth(MAX_BRANCH_LEN) {
        Some((idx, _)) => name[..idx].to_string(),
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_branch_round_trips() {
        let name = copy_branch_name("hashicorp", "vault", 31545, "my/feature-branch");
        assert_eq!(name, "copy/hashicorp/vault/31545/my/feature-branch");
        assert_eq!(
            parse_copy_branch(&name).unwrap(),
            CopyOrigin {
                owner: "hashicorp".to_string(),
                repo: "vault".to_string(),
                number: 31545,
                pr_branch: "my/feature-branch".to_string(),
            }
        );
    }

    #[test]
    fn backport_branch_embeds_target_ref() {
        assert_eq!(
            backport_branch_name("ce/release/1.19.x", "fix-seal-rewrap"),
            "backport/ce/release/1.19.x/fix-seal-rewrap"
        );
    }

    #[test]
    fn long_names_truncate_on_character_boundary() {
        let long = "b".repeat(300);
        let name = backport_branch_name("main", &long);
        assert_eq!(name.chars().count(), MAX_BRANCH_LEN);

        // Multi-byte characters never get split in half.
        let wide = "é".repeat(300);
        let name = copy_branch_name("o", "r", 1, &wide);
        assert_eq!(name.chars().count(), MAX_BRANCH_LEN);
        assert!(name.is_char_boundary(name.len()));
    }

    #[test]
    fn parse_rejects_malformed_names() {
        assert_eq!(parse_copy_branch(""), Err(BranchNameError::Empty));
        assert!(matches!(
            parse_copy_branch("backport/main/feature"),
            Err(BranchNameError::NotCopy(_))
        ));
        assert!(matches!(
            parse_copy_branch("copy/hashicorp/vault/31545"),
            Err(BranchNameError::TooFewSegments(_))
        ));
        assert!(matches!(
            parse_copy_branch("copy/hashicorp/vault/not-a-number/branch"),
            Err(BranchNameError::BadNumber { .. })
        ));
    }
}
