//! Commit transfer strategies.
//!
//! Two ways of carrying a pull request's changes onto a freshly created
//! branch:
//!
//! * whole-commit transfer cherry-picks each non-merge commit of the
//!   source pull request in order, and
//! * patch-filtered transfer regenerates the merge commit as a mailbox
//!   patch restricted to non-excluded files and applies it with `git am`,
//!   used when enterprise-only files must not reach a community branch.
//!
//! Failed transfers are recovered by resetting the branch and recording a
//! single empty placeholder commit so a pull request can still be opened.

use tracing::debug;

use super::types::PullCommit;
use crate::changed::{ChangedFile, FileGroups};
use crate::git::{
    AmOpts, CherryPickOpts, CommitOpts, DiffAlgorithm, EmptyCommit, GitClient, GitError,
    MergeStrategy, MergeStrategyOption, ShowOpts, WhitespaceAction,
};

/// The cherry-pick policy used for every transferred commit: fast-forward
/// when possible, keep commits that become empty, and resolve conflicts in
/// favor of the incoming side while ignoring whitespace-only drift.
fn cherry_pick_policy(commit: &str) -> CherryPickOpts {
    CherryPickOpts {
        commit: commit.to_string(),
        ff: true,
        empty: EmptyCommit::Keep,
        strategy: MergeStrategy::Ort,
        strategy_options: vec![
            MergeStrategyOption::Theirs,
            MergeStrategyOption::IgnoreSpaceChange,
        ],
    }
}

/// Cherry-picks the commits of a pull request in order, skipping merge
/// commits. Returns the SHAs that were skipped.
///
/// # Errors
///
/// Fails on the first commit that cannot be picked; the worktree is left
/// as git left it and the caller owns recovery.
pub(super) async fn cherry_pick_pull_commits<G: GitClient>(
    git: &G,
    commits: &[PullCommit],
) -> Result<Vec<String>, GitError> {
    let mut skipped = Vec::new();
    for commit in commits {
        let parents = git.parent_hashes(&commit.sha).await?;
        if parents.len() > 1 {
            debug!(sha = %commit.sha, "skipping merge commit");
            skipped.push(commit.sha.clone());
            continue;
        }
        debug!(sha = %commit.sha, "cherry-picking commit");
        git.cherry_pick(&cherry_pick_policy(&commit.sha)).await?;
    }
    Ok(skipped)
}

/// Transfers `commit_sha` as a mailbox patch restricted to the files whose
/// groups are not excluded.
///
/// Cherry-picking a commit that touches files absent from the target branch
/// conflicts on every such file; regenerating the change as a patch without
/// them applies cleanly while `--format=mboxrd` plus `git am` preserve the
/// source commit's author, date and message.
pub(super) async fn apply_patch_excluding<G: GitClient>(
    git: &G,
    commit_sha: &str,
    changed_files: &[ChangedFile],
    exclude: &FileGroups,
) -> Result<(), GitError> {
    let mut kept = Vec::new();
    for file in changed_files {
        if file.in_any(exclude) {
            debug!(file = %file.path, "omitting file in excluded groups");
        } else {
            debug!(file = %file.path, "including changed file");
            kept.push(file.path.clone());
        }
    }

    let patch_dir = tempfile::tempdir().map_err(GitError::TempDir)?;
    let patch_file = patch_dir.path().join(format!("{commit_sha}.patch"));

    git.show(&ShowOpts {
        object: commit_sha.to_string(),
        format: Some("mboxrd".to_string()),
        patch: true,
        no_color: true,
        output: Some(patch_file.clone()),
        diff_algorithm: Some(DiffAlgorithm::Myers),
        path_spec: kept,
        ..Default::default()
    })
    .await?;

    git.am(&AmOpts {
        mbox: vec![patch_file],
        three_way: true,
        whitespace: Some(WhitespaceAction::Fix),
        keep_non_patch: true,
        committer_date_is_author_date: true,
        empty: EmptyCommit::Keep,
    })
    .await?;

    Ok(())
}

/// Resets the branch back to its base ref and records one empty commit.
///
/// The placeholder keeps the branch pushable so a pull request can be
/// opened for the failed transfer; open pull requests are how unfinished
/// propagation is audited.
pub(super) async fn reset_and_noop_commit<G: GitClient>(
    git: &G,
    base_ref: &str,
    origin_url: &str,
) -> Result<(), GitError> {
    git.reset_hard(base_ref).await?;
    git.commit(&CommitOpts {
        message: Some(format!(
            "Placeholder commit: the automated transfer of {origin_url} failed"
        )),
        allow_empty: true,
        no_verify: true,
        ..Default::default()
    })
    .await?;
    Ok(())
}

/// Records an empty commit crediting every author of the source commits
/// with a `Co-Authored-By` trailer.
pub(super) async fn create_co_author_commit<G: GitClient>(
    git: &G,
    origin_url: &str,
    commits: &[PullCommit],
) -> Result<(), GitError> {
    let mut message = format!("Copy of {origin_url}");
    let trailers = co_author_trailers(commits);
    if !trailers.is_empty() {
        message.push_str("\n\n");
        message.push_str(&trailers.join("\n"));
    }

    git.commit(&CommitOpts {
        message: Some(message),
        allow_empty: true,
        no_verify: true,
        ..Default::default()
    })
    .await?;
    Ok(())
}

/// Builds `Co-Authored-By` trailers for the commit authors, de-duplicated
/// by email with first-seen order preserved.
pub(super) fn co_author_trailers(commits: &[PullCommit]) -> Vec<String> {
    let mut seen: Vec<&str> = Vec::new();
    let mut trailers = Vec::new();
    for commit in commits {
        if commit.author_email.is_empty() || seen.contains(&commit.author_email.as_str()) {
            continue;
        }
        seen.push(&commit.author_email);
        trailers.push(format!(
            "Co-Authored-By: {} <{}>",
            commit.author_name, commit.author_email
        ));
    }
    trailers
}

/// Fetch refspec that makes a pull request's head commits reachable in the
/// local repository even after a squash merge.
pub(super) fn pull_head_refspec(number: u64) -> String {
    format!("pull/{number}/head")
}
