//! Backport workflow.
//!
//! Propagates a merged pull request to sibling branches of the same
//! repository. Target branches are planned from the pull request's base ref
//! and backport labels, each target gets its own attempt, and the source
//! pull request receives a status comment summarizing every attempt.
//!
//! The request is designed to always produce a result, even when things go
//! wrong: errors are embedded in the result instead of returned so that
//! every target is attempted and the status comment is always posted.

use std::path::PathBuf;

use tracing::{debug, info, info_span, Instrument};

use super::attempt::{skip_check, PropagationAttempt, PropagationResult, SkipCheck};
use super::branch::backport_branch_name;
use super::comment::truncate_body;
use super::error::RequestError;
use super::host::GithubHost;
use super::refs::RefScheme;
use super::transfer;
use super::types::{NewPullRequest, PullRequestRef};
use crate::changed::{union_groups, ChangedFile, FileGroup, FileGroups};
use crate::git::{
    ensure_repo_dir, initialize_existing_repo, initialize_new_repo, CheckoutOpts, FetchOpts, Git,
    GitClient, PushOpts,
};
use crate::releases::{load_active_versions, ActiveVersions};
use crate::templates::{PrBodyData, PrBodyTemplate, TemplateRenderer};

/// A request to backport a merged pull request to its target branches.
///
/// Designed to be triggered from a merge event where only the repository
/// coordinates and the pull request number are known; everything else has
/// workable defaults.
#[derive(Debug, Clone)]
pub struct CreateBackportReq {
    /// The GitHub owner, e.g. `hashicorp`.
    pub owner: String,
    /// The GitHub repository, e.g. `vault-enterprise`.
    pub repo: String,
    /// The number of the merged pull request to backport.
    pub pull_number: u64,
    /// Remote name for the repository, e.g. `origin`.
    pub base_origin: String,
    /// Optional existing checkout to reuse. A temporary directory is
    /// created when unset.
    pub repo_dir: Option<PathBuf>,
    /// Explicit path to the versions configuration. When unset the file is
    /// searched for upward from the current directory.
    pub versions_config_path: Option<PathBuf>,
    /// How many parent directories the versions-config search may climb.
    pub versions_search_depth: usize,
    /// File groups that must never reach community branches.
    pub ce_exclude: FileGroups,
    /// File groups that may land on inactive community branches.
    pub ce_allow_inactive: FileGroups,
    /// Branch prefix and label rules.
    pub refs: RefScheme,
    /// Access token used for API calls and authenticated clone URLs.
    pub token: String,
}

impl CreateBackportReq {
    /// Creates a request with the default policy: `origin` remote, a
    /// three-level versions-config search, enterprise files excluded from
    /// community branches, and changelog/docs/pipeline changes allowed on
    /// inactive branches.
    #[must_use]
    pub fn new(owner: String, repo: String, pull_number: u64, token: String) -> Self {
        Self {
            owner,
            repo,
            pull_number,
            base_origin: "origin".to_string(),
            repo_dir: None,
            versions_config_path: None,
            versions_search_depth: 3,
            ce_exclude: [FileGroup::Enterprise].into_iter().collect(),
            ce_allow_inactive: [FileGroup::Changelog, FileGroup::Docs, FileGroup::Pipeline]
                .into_iter()
                .collect(),
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
        if self.pull_number == 0 {
            return Err(RequestError::MissingPullNumber);
        }
        if self.base_origin.is_empty() {
            return Err(RequestError::MissingBaseOrigin);
        }
        if self.refs.ce_branch_prefix.is_empty() {
            return Err(RequestError::MissingCePrefix);
        }
        if self.refs.backport_label_prefix.is_empty() {
            return Err(RequestError::MissingLabelPrefix);
        }
        if self.token.is_empty() {
            return Err(RequestError::MissingToken);
        }
        Ok(())
    }

    /// Runs the backport workflow.
    ///
    /// Always returns a result; inspect [`PropagationResult::err`] for a
    /// combined error. A validation failure returns immediately without
    /// posting a comment, since a malformed request cannot be trusted to
    /// name the right pull request.
    pub async fn run<H: GithubHost>(&self, host: &H) -> PropagationResult {
        debug!(
            owner = %self.owner,
            repo = %self.repo,
            pull_number = self.pull_number,
            base_origin = %self.base_origin,
            ce_exclude = %self.ce_exclude,
            ce_allow_inactive = %self.ce_allow_inactive,
            "running backport request"
        );

        // Validation fails fast here too: a temporary worktree is I/O.
        if let Err(err) = self.validate() {
            let mut res = PropagationResult::default();
            res.push_error(format!("validating backport request: {err}"));
            return res;
        }

        let worktree = match ensure_repo_dir(self.repo_dir.as_deref()) {
            Ok(tree) => tree,
            Err(err) => {
                let mut res = PropagationResult::default();
                res.push_error(format!("preparing repository directory: {err}"));
                self.comment_status(host, &mut res).await;
                return res;
            }
        };
        self.run_with_client(host, &Git::new(worktree.dir())).await
    }

    /// Runs the backport workflow against an explicit git client bound to a
    /// prepared worktree. [`Self::run`] wires in the subprocess client.
    pub async fn run_with_client<H: GithubHost, G: GitClient>(
        &self,
        host: &H,
        git: &G,
    ) -> PropagationResult {
        let mut res = PropagationResult::default();

        if let Err(err) = self.validate() {
            res.push_error(format!("validating backport request: {err}"));
            return res;
        }

        self.execute(host, git, &mut res)
            .instrument(info_span!("backport", pull_number = self.pull_number))
            .await;

        // Whatever happened, report status back on the source pull request.
        self.comment_status(host, &mut res).await;

        res
    }

    async fn comment_status<H: GithubHost>(&self, host: &H, res: &mut PropagationResult) {
        let body = truncate_body(&res.comment_body("Backport"));
        match host
            .create_comment(&self.owner, &self.repo, self.pull_number, &body)
            .await
        {
            Ok(comment) => res.comment_url = Some(comment.html_url),
            Err(err) => res.push_error(format!("creating status comment: {err}")),
        }
    }

    async fn execute<H: GithubHost, G: GitClient>(
        &self,
        host: &H,
        git: &G,
        res: &mut PropagationResult,
    ) {
        let origin = match host
            .get_pull(&self.owner, &self.repo, self.pull_number)
            .await
        {
            Ok(pull) => pull,
            Err(err) => {
                res.push_error(format!("fetching origin pull request: {err}"));
                return;
            }
        };
        res.origin_pull_request = Some(origin.clone());

        if !origin.merged {
            res.push_error("cannot backport an unmerged pull request".to_string());
            return;
        }
        let Some(merge_sha) = origin.merge_commit_sha.clone() else {
            res.push_error("no merge commit SHA is associated with the pull request".to_string());
            return;
        };

        // Resolve the versions config before any cloning: the configured
        // path may be relative to where the request was started.
        let start_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let active_versions = match load_active_versions(
            self.versions_config_path.as_deref(),
            &start_dir,
            self.versions_search_depth,
        ) {
            Ok(versions) => versions,
            Err(err) => {
                res.push_error(format!("loading active versions: {err}"));
                return;
            }
        };

        let init = if git.dir().join(".git").exists() {
            initialize_existing_repo(git, &self.base_origin, &origin.base_ref).await
        } else {
            initialize_new_repo(
                git,
                &self.owner,
                &self.repo,
                &self.base_origin,
                &origin.base_ref,
                &self.token,
            )
            .await
        };
        if let Err(err) = init {
            res.push_error(format!("initializing repository: {err}"));
            return;
        }

        let changed_files = match host
            .list_changed_files(&self.owner, &self.repo, self.pull_number)
            .await
        {
            Ok(files) => files,
            Err(err) => {
                res.push_error(format!("listing changed files: {err}"));
                return;
            }
        };

        for target_ref in self.refs.plan_backport_refs(&origin.base_ref, &origin.labels) {
            let attempt = self
                .backport_ref(
                    host,
                    git,
                    &origin,
                    &active_versions,
                    &changed_files,
                    &merge_sha,
                    &target_ref,
                )
                .await;
            let failed = attempt.error.is_some();
            res.attempts.insert(target_ref, attempt);

            if failed {
                // Reset so the next attempt does not start from a dirty
                // worktree. If even that fails, stop trying.
                let base = format!("{}/{}", self.base_origin, origin.base_ref);
                if let Err(err) = git.reset_hard(&base).await {
                    res.push_error(format!(
                        "resetting repository after failed attempt: {err}"
                    ));
                    break;
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn backport_ref<H: GithubHost, G: GitClient>(
        &self,
        host: &H,
        git: &G,
        origin: &PullRequestRef,
        active_versions: &ActiveVersions,
        changed_files: &[ChangedFile],
        merge_sha: &str,
        target_ref: &str,
    ) -> PropagationAttempt {
        let mut attempt = PropagationAttempt {
            base_ref: target_ref.to_string(),
            ..PropagationAttempt::default()
        };

        let version_key = self.refs.version_key(target_ref);
        let branch_name = backport_branch_name(target_ref, &origin.head_ref);
        attempt.target_ref = branch_name.clone();

        match skip_check(
            &self.refs,
            target_ref,
            &version_key,
            active_versions,
            changed_files,
            &self.ce_exclude,
            &self.ce_allow_inactive,
        ) {
            SkipCheck::Skip(reason) => {
                info!(target_ref, version_key, reason, "skipping backport");
                attempt.skipped = true;
                attempt.skipped_reason = reason;
                return attempt;
            }
            SkipCheck::Proceed(reason) => {
                debug!(target_ref, version_key, reason, "creating backport");
            }
        }

        if let Err(err) = git
            .fetch(&FetchOpts {
                remote: self.base_origin.clone(),
                refspecs: vec![format!("{target_ref}:{target_ref}")],
                set_upstream: true,
                porcelain: true,
            })
            .await
        {
            attempt.push_error(format!("fetching target branch base ref: {err}"));
            return attempt;
        }

        if let Err(err) = git
            .checkout(&CheckoutOpts {
                branch: target_ref.to_string(),
                new_branch_force: Some(branch_name.clone()),
            })
            .await
        {
            attempt.push_error(format!("checking out new backport branch: {err}"));
            return attempt;
        }

        // Community targets with excluded files get a filtered patch of the
        // merge commit; everything else takes the source commits whole.
        let filtered = self.refs.has_ce_prefix(target_ref)
            && union_groups(changed_files).intersects(&self.ce_exclude);
        if filtered {
            if let Err(err) =
                transfer::apply_patch_excluding(git, merge_sha, changed_files, &self.ce_exclude)
                    .await
            {
                attempt.push_error(format!("applying filtered backport patch: {err}"));
            }
        } else if let Err(err) = self.transfer_whole_commits(host, git).await {
            attempt.push_error(err);
        }

        // A failed transfer still gets a branch and a pull request: open
        // pull requests are how unfinished backports are audited.
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
            attempt.push_error(format!("pushing backport branch: {err}"));
            // Without a pushed branch there is nothing to open a PR from.
            return attempt;
        }

        let title = format!(
            "Backport {} into {target_ref}",
            strip_backport_prefix(&origin.title)
        );
        let template = if self.refs.has_ce_prefix(target_ref) {
            PrBodyTemplate::BackportCe
        } else {
            PrBodyTemplate::Backport
        };
        let body = match TemplateRenderer::new().render_pr_body(
            template,
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
                attempt.push_error(format!("rendering backport pull request body: {err}"));
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
                attempt.push_error(format!("creating backport pull request: {err}"));
                return attempt;
            }
        };
        let created_number = created.number;
        attempt.pull_request = Some(created);

        // Hand the backport to whoever owned the source change.
        let mut assignees: Vec<String> = Vec::new();
        for login in [origin.assignee.clone(), origin.merged_by.clone()]
            .into_iter()
            .flatten()
        {
            if !login.is_empty() && !assignees.contains(&login) {
                assignees.push(login);
            }
        }
        if !assignees.is_empty() {
            if let Err(err) = host
                .add_assignees(&self.owner, &self.repo, created_number, &assignees)
                .await
            {
                attempt.push_error(format!(
                    "assigning ownership to backport pull request: {err}"
                ));
            }
        }

        attempt
    }

    /// Whole-commit transfer: fetch the pull request head so its commits
    /// are reachable locally, then cherry-pick each non-merge commit.
    async fn transfer_whole_commits<H: GithubHost, G: GitClient>(
        &self,
        host: &H,
        git: &G,
    ) -> Result<(), String> {
        let commits = host
            .list_pull_commits(&self.owner, &self.repo, self.pull_number)
            .await
            .map_err(|err| format!("listing pull request commits: {err}"))?;

        git.fetch(&FetchOpts {
            remote: self.base_origin.clone(),
            refspecs: vec![transfer::pull_head_refspec(self.pull_number)],
            ..Default::default()
        })
        .await
        .map_err(|err| format!("fetching pull request head: {err}"))?;

        let skipped = transfer::cherry_pick_pull_commits(git, &commits)
            .await
            .map_err(|err| format!("cherry-picking pull request commits: {err}"))?;
        if !skipped.is_empty() {
            debug!(skipped = skipped.join(","), "skipped merge commits");
        }
        Ok(())
    }
}

/// Removes a leading "Backport " from a source title so generated titles
/// do not stutter.
fn strip_backport_prefix(title: &str) -> String {
    match title.get(..9) {
        Some(prefix) if prefix.eq_ignore_ascii_case("backport ") => title[9..].trim().to_string(),
        _ => title.to_string(),
    }
}
