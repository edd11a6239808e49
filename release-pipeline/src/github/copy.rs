//! Copy workflow.
//!
//! Moves an accepted community pull request onto the corresponding branch
//! of the enterprise repository. The copy branch name encodes the origin
//! coordinates so that merging the copy can later close the origin, the
//! first commit on the branch credits every origin author, and the origin
//! pull request receives a status comment.

use std::path::PathBuf;

use tracing::{debug, info, info_span, Instrument};

use super::attempt::{PropagationAttempt, PropagationResult};
use super::branch::copy_branch_name;
use super::comment::truncate_body;
use super::error::RequestError;
use super::host::GithubHost;
use super::refs::RefScheme;
use super::transfer;
use super::types::{NewPullRequest, PullRequestRef};
use crate::git::{
    authenticated_url, ensure_repo_dir, initialize_existing_repo, initialize_new_repo,
    CheckoutOpts, FetchOpts, Git, GitClient, PushOpts, RemoteAddOpts,
};
use crate::templates::{PrBodyData, PrBodyTemplate, TemplateRenderer};

/// A request to copy a community pull request into the enterprise
/// repository.
#[derive(Debug, Clone)]
pub struct CreateCopyReq {
    /// Owner of the community repository the pull request lives in.
    pub origin_owner: String,
    /// The community repository, e.g. `vault`.
    pub origin_repo: String,
    /// Owner of the enterprise repository receiving the copy.
    pub owner: String,
    /// The enterprise repository, e.g. `vault-enterprise`.
    pub repo: String,
    /// The number of the community pull request to copy.
    pub pull_number: u64,
    /// Remote name for the enterprise repository, e.g. `origin`.
    pub base_origin: String,
    /// Remote name added for the community repository, e.g. `ce`.
    pub origin_remote: String,
    /// Optional existing checkout to reuse.
    pub repo_dir: Option<PathBuf>,
    /// Branch prefix rules.
    pub refs: RefScheme,
    /// Access token used for API calls and authenticated clone URLs.
    pub token: String,
}

impl CreateCopyReq {
    /// Creates a request with the default remotes (`origin` for the
    /// enterprise repository, `ce` for the community one).
    #[must_use]
    pub fn new(
        origin_owner: String,
        origin_repo: String,
        owner: String,
        repo: String,
        pull_number: u64,
        token: String,
    ) -> Self {
        Self {
            origin_owner,
            origin_repo,
            owner,
            repo,
            pull_number,
            base_origin: "origin".to_string(),
            origin_remote: "ce".to_string(),
            repo_dir: None,
            refs: RefScheme::default(),
            token,
        }
    }

    /// Checks that every required field is present.
    ///
    /// # Errors
    ///
    /// Returns the first missing field.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.owner.is_empty() {
            return Err(RequestError::MissingOwner);
        }
        if self.repo.is_empty() {
            return Err(RequestError::MissingRepo);
        }
        if self.origin_owner.is_empty() || self.origin_repo.is_empty() {
            return Err(RequestError::MissingOriginRepo);
        }
        if self.pull_number == 0 {
            return Err(RequestError::MissingPullNumber);
        }
        if self.base_origin.is_empty() || self.origin_remote.is_empty() {
            return Err(RequestError::MissingBaseOrigin);
        }
        if self.refs.ce_branch_prefix.is_empty() {
            return Err(RequestError::MissingCePrefix);
        }
        if self.token.is_empty() {
            return Err(RequestError::MissingToken);
        }
        Ok(())
    }

    /// Runs the copy workflow.
    ///
    /// Always returns a result; a validation failure returns immediately
    /// without posting a comment.
    pub async fn run<H: GithubHost>(&self, host: &H) -> PropagationResult {
        let mut res = PropagationResult::default();

        debug!(
            origin_owner = %self.origin_owner,
            origin_repo = %self.origin_repo,
            owner = %self.owner,
            repo = %self.repo,
            pull_number = self.pull_number,
            "running copy request"
        );

        if let Err(err) = self.validate() {
            res.push_error(format!("validating copy request: {err}"));
            return res;
        }

        self.execute(host, &mut res)
            .instrument(info_span!("copy", pull_number = self.pull_number))
            .await;

        // Report status back on the origin pull request.
        let body = truncate_body(&res.comment_body("Copy"));
        match host
            .create_comment(
                &self.origin_owner,
                &self.origin_repo,
                self.pull_number,
                &body,
            )
            .await
        {
            Ok(comment) => res.comment_url = Some(comment.html_url),
            Err(err) => res.push_error(format!("creating status comment: {err}")),
        }

        res
    }

    async fn execute<H: GithubHost>(&self, host: &H, res: &mut PropagationResult) {
        let origin = match host
            .get_pull(&self.origin_owner, &self.origin_repo, self.pull_number)
            .await
        {
            Ok(pull) => pull,
            Err(err) => {
                res.push_error(format!("fetching origin pull request: {err}"));
                return;
            }
        };
        res.origin_pull_request = Some(origin.clone());

        // The copy lands on the enterprise branch that corresponds to the
        // origin's base: ce/main goes to main, ce/release/X to release/X+ent.
        let target_ref = self.refs.ent_ref(&self.refs.version_key(&origin.base_ref));

        let changed_files = match host
            .list_changed_files(&self.origin_owner, &self.origin_repo, self.pull_number)
            .await
        {
            Ok(files) => files,
            Err(err) => {
                res.push_error(format!("listing changed files: {err}"));
                return;
            }
        };

        let mut attempt = PropagationAttempt {
            base_ref: target_ref.clone(),
            ..PropagationAttempt::default()
        };
        if changed_files.is_empty() {
            info!(target_ref, "skipping copy");
            attempt.skipped = true;
            attempt.skipped_reason = "no files were changed".to_string();
            res.attempts.insert(target_ref, attempt);
            return;
        }

        let worktree = match ensure_repo_dir(self.repo_dir.as_deref()) {
            Ok(tree) => tree,
            Err(err) => {
                res.push_error(format!("preparing repository directory: {err}"));
                return;
            }
        };
        let git = Git::new(worktree.dir());

        let init = if worktree.dir().join(".git").exists() {
            initialize_existing_repo(&git, &self.base_origin, &target_ref).await
        } else {
            initialize_new_repo(
                &git,
                &self.owner,
                &self.repo,
                &self.base_origin,
                &target_ref,
                &self.token,
            )
            .await
        };
        if let Err(err) = init {
            res.push_error(format!("initializing repository: {err}"));
            return;
        }

        attempt = self.copy_pull(host, &git, &origin, &target_ref).await;
        res.attempts.insert(target_ref, attempt);
    }

    async fn copy_pull<H: GithubHost>(
        &self,
        host: &H,
        git: &Git,
        origin: &PullRequestRef,
        target_ref: &str,
    ) -> PropagationAttempt {
        let mut attempt = PropagationAttempt {
            base_ref: target_ref.to_string(),
            ..PropagationAttempt::default()
        };
        let branch_name = copy_branch_name(
            &self.origin_owner,
            &self.origin_repo,
            self.pull_number,
            &origin.head_ref,
        );
        attempt.target_ref = branch_name.clone();

        // Make the origin's commits reachable: add the community repository
        // as a remote and fetch the pull request head.
        if let Err(err) = git
            .remote_add(&RemoteAddOpts {
                name: self.origin_remote.clone(),
                url: authenticated_url(&self.origin_owner, &self.origin_repo, &self.token),
                ..Default::default()
            })
            .await
        {
            attempt.push_error(format!("adding origin remote: {err}"));
            return attempt;
        }
        if let Err(err) = git
            .fetch(&FetchOpts {
                remote: self.origin_remote.clone(),
                refspecs: vec![transfer::pull_head_refspec(self.pull_number)],
                ..Default::default()
            })
            .await
        {
            attempt.push_error(format!("fetching origin pull request head: {err}"));
            return attempt;
        }

        if let Err(err) = git
            .checkout(&CheckoutOpts {
                branch: target_ref.to_string(),
                new_branch_force: Some(branch_name.clone()),
            })
            .await
        {
            attempt.push_error(format!("checking out new copy branch: {err}"));
            return attempt;
        }

        match host
            .list_pull_commits(&self.origin_owner, &self.origin_repo, self.pull_number)
            .await
        {
            Ok(commits) => {
                // Credit the origin authors first so the trailer commit is
                // always present, then carry the commits over.
                if let Err(err) =
                    transfer::create_co_author_commit(git, &origin.html_url, &commits).await
                {
                    attempt.push_error(format!("creating co-author commit: {err}"));
                } else if let Err(err) = transfer::cherry_pick_pull_commits(git, &commits).await {
                    attempt.push_error(format!("cherry-picking pull request commits: {err}"));
                }
            }
            Err(err) => {
                attempt.push_error(format!("listing pull request commits: {err}"));
            }
        }

        if attempt.error.is_some() {
            if let Err(err) =
                transfer::reset_and_noop_commit(git, target_ref, &origin.html_url).await
            {
                attempt.push_error(format!("creating placeholder commit: {err}"));
            }
        }

        if let Err(err) = git
            .push(&PushOpts {
                repository: self.base_origin.clone(),
                refspecs: vec![branch_name.clone()],
            })
            .await
        {
            attempt.push_error(format!("pushing copy branch: {err}"));
            return attempt;
        }

        let title = format!("Copy {} into {target_ref}", origin.title);
        let body = match TemplateRenderer::new().render_pr_body(
            PrBodyTemplate::Copy,
            &PrBodyData {
                origin_url: &origin.html_url,
                origin_number: origin.number,
                origin_title: &origin.title,
                target_ref,
                error: attempt.error.as_deref(),
            },
        ) {
            Ok(body) => body,
            Err(err) => {
                attempt.push_error(format!("rendering copy pull request body: {err}"));
                return attempt;
            }
        };

        let created = match host
            .create_pull(
                &self.owner,
                &self.repo,
                &NewPullRequest {
                    title,
                    head: branch_name,
                    base: target_ref.to_string(),
                    body: truncate_body(&body),
                },
            )
            .await
        {
            Ok(pull) => pull,
            Err(err) => {
                attempt.push_error(format!("creating copy pull request: {err}"));
                return attempt;
            }
        };
        let created_number = created.number;
        attempt.pull_request = Some(created);

        // The copy is reviewed by whoever approved or owned the origin.
        let mut assignees = match host
            .list_approvers(&self.origin_owner, &self.origin_repo, self.pull_number)
            .await
        {
            Ok(approvers) => approvers,
            Err(err) => {
                attempt.push_error(format!("listing origin approvers: {err}"));
                Vec::new()
            }
        };
        if let Some(assignee) = &origin.assignee {
            if !assignee.is_empty() && !assignees.contains(assignee) {
                assignees.push(assignee.clone());
            }
        }
        if !assignees.is_empty() {
            if let Err(err) = host
                .add_assignees(&self.owner, &self.repo, created_number, &assignees)
                .await
            {
                attempt.push_error(format!("assigning ownership to copy pull request: {err}"));
            }
        }

        attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> CreateCopyReq {
        CreateCopyReq::new(
            "hashicorp".to_string(),
            "vault".to_string(),
            "hashicorp".to_string(),
            "vault-enterprise".to_string(),
            31545,
            "t0ken".to_string(),
        )
    }

    #[test]
    fn defaults_match_policy() {
        let req = req();
        assert_eq!(req.base_origin, "origin");
        assert_eq!(req.origin_remote, "ce");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn validation_requires_origin_coordinates() {
        let mut missing = req();
        missing.origin_repo = String::new();
        assert_eq!(missing.validate(), Err(RequestError::MissingOriginRepo));
    }
}
