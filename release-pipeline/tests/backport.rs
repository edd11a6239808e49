use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use release_pipeline::changed::ChangedFile;
use release_pipeline::git::{
    AmOpts, CheckoutOpts, CherryPickOpts, CloneOpts, CommitOpts, FetchOpts, GitClient, GitError,
    GitOutput, PushOpts, RemoteAddOpts, ShowOpts,
};
use release_pipeline::github::{
    backport_branch_name, CreateBackportReq, CreatedPullRequest, GithubError, GithubHost,
    NewPullRequest, PostedComment, PullCommit, PullRequestRef, PullRequestState,
};

/// In-memory GitHub with just enough behavior for the backport flow.
#[derive(Default)]
struct FakeHost {
    pulls: HashMap<(String, String, u64), PullRequestRef>,
    changed_files: Vec<ChangedFile>,
    commits: Vec<PullCommit>,
    created_pulls: Mutex<Vec<(String, String, String, String)>>,
    next_number: Mutex<u64>,
    assignees: Mutex<Vec<(u64, Vec<String>)>>,
    comments: Mutex<Vec<(String, String, u64, String)>>,
}

impl FakeHost {
    fn with_pull(mut self, pull: PullRequestRef) -> Self {
        self.pulls
            .insert((pull.owner.clone(), pull.repo.clone(), pull.number), pull);
        self
    }

    fn with_changed_files(mut self, files: Vec<ChangedFile>) -> Self {
        self.changed_files = files;
        self
    }

    fn with_commits(mut self, commits: Vec<PullCommit>) -> Self {
        self.commits = commits;
        self
    }
}

impl GithubHost for FakeHost {
    async fn get_pull(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestRef, GithubError> {
        self.pulls
            .get(&(owner.to_string(), repo.to_string(), number))
            .cloned()
            .ok_or_else(|| GithubError::GraphQl(format!("no pull {owner}/{repo}#{number}")))
    }

    async fn list_changed_files(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Vec<ChangedFile>, GithubError> {
        Ok(self.changed_files.clone())
    }

    async fn list_pull_commits(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Vec<PullCommit>, GithubError> {
        Ok(self.commits.clone())
    }

    async fn list_approvers(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Vec<String>, GithubError> {
        Ok(Vec::new())
    }

    async fn create_pull(
        &self,
        owner: &str,
        repo: &str,
        new: &NewPullRequest,
    ) -> Result<CreatedPullRequest, GithubError> {
        self.created_pulls.lock().unwrap().push((
            new.title.clone(),
            new.head.clone(),
            new.base.clone(),
            new.body.clone(),
        ));
        let mut next = self.next_number.lock().unwrap();
        *next += 1;
        Ok(CreatedPullRequest {
            number: *next,
            html_url: format!("https://github.com/{owner}/{repo}/pull/{}", *next),
        })
    }

    async fn add_assignees(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        assignees: &[String],
    ) -> Result<(), GithubError> {
        self.assignees
            .lock()
            .unwrap()
            .push((number, assignees.to_vec()));
        Ok(())
    }

    async fn create_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<PostedComment, GithubError> {
        self.comments.lock().unwrap().push((
            owner.to_string(),
            repo.to_string(),
            number,
            body.to_string(),
        ));
        Ok(PostedComment {
            html_url: format!("https://github.com/{owner}/{repo}/pull/{number}#issuecomment-1"),
        })
    }

    async fn close_pull(&self, _owner: &str, _repo: &str, _number: u64) -> Result<(), GithubError> {
        unreachable!("backport never closes pull requests");
    }

    async fn close_issue(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<(), GithubError> {
        unreachable!("backport never closes issues");
    }

    async fn closing_issues(
        &self,
        _owner: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Vec<release_pipeline::github::ClosingIssue>, GithubError> {
        unreachable!("backport never lists linked issues");
    }
}

/// In-memory git worktree that records every invocation as one line and
/// fails on command when configured to.
#[derive(Default)]
struct FakeGit {
    dir: PathBuf,
    parents: HashMap<String, Vec<String>>,
    /// Cherry-picks fail while the checked-out branch contains this.
    fail_cherry_pick_on: Option<String>,
    /// Hard resets to a treeish containing this fail.
    fail_reset_to: Option<String>,
    checked_out: Mutex<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeGit {
    fn new() -> Self {
        Self {
            // No `.git` here, so the workflow takes the fresh-clone path.
            dir: PathBuf::from("/nonexistent/worktree"),
            ..Self::default()
        }
    }

    fn with_parents(mut self, sha: &str, parents: &[&str]) -> Self {
        self.parents.insert(
            sha.to_string(),
            parents.iter().map(ToString::to_string).collect(),
        );
        self
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn failed(&self, command: &str) -> GitError {
        GitError::CommandFailed {
            command: command.to_string(),
            stdout: String::new(),
            stderr: "boom".to_string(),
        }
    }
}

impl GitClient for FakeGit {
    fn dir(&self) -> &Path {
        &self.dir
    }

    async fn clone_repo(&self, _opts: &CloneOpts) -> Result<GitOutput, GitError> {
        self.record("clone".to_string());
        Ok(GitOutput::default())
    }

    async fn remote_add(&self, opts: &RemoteAddOpts) -> Result<GitOutput, GitError> {
        self.record(format!("remote-add {}", opts.name));
        Ok(GitOutput::default())
    }

    async fn fetch(&self, opts: &FetchOpts) -> Result<GitOutput, GitError> {
        self.record(format!("fetch {} {}", opts.remote, opts.refspecs.join(" ")));
        Ok(GitOutput::default())
    }

    async fn checkout(&self, opts: &CheckoutOpts) -> Result<GitOutput, GitError> {
        match &opts.new_branch_force {
            Some(new_branch) => {
                self.record(format!("checkout -B {new_branch} {}", opts.branch));
                *self.checked_out.lock().unwrap() = new_branch.clone();
            }
            None => {
                self.record(format!("checkout {}", opts.branch));
                *self.checked_out.lock().unwrap() = opts.branch.clone();
            }
        }
        Ok(GitOutput::default())
    }

    async fn current_branch(&self) -> Result<String, GitError> {
        Ok(self.checked_out.lock().unwrap().clone())
    }

    async fn pull_rebase(&self) -> Result<GitOutput, GitError> {
        self.record("pull-rebase".to_string());
        Ok(GitOutput::default())
    }

    async fn cherry_pick(&self, opts: &CherryPickOpts) -> Result<GitOutput, GitError> {
        self.record(format!("cherry-pick {}", opts.commit));
        let branch = self.checked_out.lock().unwrap().clone();
        if let Some(marker) = &self.fail_cherry_pick_on {
            if branch.contains(marker.as_str()) {
                return Err(self.failed(&format!("git cherry-pick {}", opts.commit)));
            }
        }
        Ok(GitOutput::default())
    }

    async fn show(&self, opts: &ShowOpts) -> Result<GitOutput, GitError> {
        self.record(format!("show {} -- {}", opts.object, opts.path_spec.join(" ")));
        Ok(GitOutput::default())
    }

    async fn am(&self, _opts: &AmOpts) -> Result<GitOutput, GitError> {
        self.record("am".to_string());
        Ok(GitOutput::default())
    }

    async fn commit(&self, opts: &CommitOpts) -> Result<GitOutput, GitError> {
        self.record(format!(
            "commit {}",
            opts.message.clone().unwrap_or_default()
        ));
        Ok(GitOutput::default())
    }

    async fn push(&self, opts: &PushOpts) -> Result<GitOutput, GitError> {
        self.record(format!(
            "push {} {}",
            opts.repository,
            opts.refspecs.join(" ")
        ));
        Ok(GitOutput::default())
    }

    async fn reset_hard(&self, treeish: &str) -> Result<GitOutput, GitError> {
        self.record(format!("reset {treeish}"));
        if let Some(marker) = &self.fail_reset_to {
            if treeish.contains(marker.as_str()) {
                return Err(self.failed(&format!("git reset --hard {treeish}")));
            }
        }
        Ok(GitOutput::default())
    }

    async fn parent_hashes(&self, commit: &str) -> Result<Vec<String>, GitError> {
        Ok(self
            .parents
            .get(commit)
            .cloned()
            .unwrap_or_else(|| vec!["p0".to_string()]))
    }
}

fn origin_pull() -> PullRequestRef {
    PullRequestRef {
        owner: "hashicorp".to_string(),
        repo: "vault-enterprise".to_string(),
        number: 100,
        title: "Fix seal rewrap".to_string(),
        html_url: "https://github.com/hashicorp/vault-enterprise/pull/100".to_string(),
        base_ref: "main".to_string(),
        head_ref: "seal-fix".to_string(),
        head_sha: "abc123".to_string(),
        merge_commit_sha: Some("msha".to_string()),
        state: PullRequestState::Closed,
        merged: true,
        labels: vec![
            "backport/1.18.x".to_string(),
            "backport/1.19.x".to_string(),
        ],
        assignee: Some("jo".to_string()),
        merged_by: Some("sam".to_string()),
    }
}

fn changed_files() -> Vec<ChangedFile> {
    vec![
        ChangedFile::classified("README.md", "s1"),
        ChangedFile::classified("vault_ent/core.go", "s2"),
        ChangedFile::classified("docs/guide.mdx", "s3"),
    ]
}

fn commits() -> Vec<PullCommit> {
    vec![
        PullCommit {
            sha: "c1".to_string(),
            author_name: "Jo Dev".to_string(),
            author_email: "jo@example.com".to_string(),
        },
        // A merge commit, skipped by the whole-commit transfer.
        PullCommit {
            sha: "cm".to_string(),
            author_name: "Web Flow".to_string(),
            author_email: "noreply@github.com".to_string(),
        },
    ]
}

fn req() -> CreateBackportReq {
    let mut req = CreateBackportReq::new(
        "hashicorp".to_string(),
        "vault-enterprise".to_string(),
        100,
        "t0ken".to_string(),
    );
    req.versions_config_path = Some(PathBuf::from("tests/fixtures/versions.toml"));
    req
}

fn host() -> FakeHost {
    FakeHost::default()
        .with_pull(origin_pull())
        .with_changed_files(changed_files())
        .with_commits(commits())
}

#[tokio::test]
async fn fans_out_to_every_planned_target() {
    let host = host();
    let git = FakeGit::new()
        .with_parents("c1", &["p1"])
        .with_parents("cm", &["p1", "p2"]);
    let req = req();

    let res = req.run_with_client(&host, &git).await;

    assert_eq!(res.err(), None);

    // One attempt per planned target, no more, no less.
    let origin = origin_pull();
    let planned: BTreeSet<String> = req
        .refs
        .plan_backport_refs(&origin.base_ref, &origin.labels)
        .into_iter()
        .collect();
    let attempted: BTreeSet<String> = res.attempts.keys().cloned().collect();
    assert_eq!(attempted, planned);
    assert_eq!(
        planned.len(),
        3,
        "expected ce/main plus two enterprise release targets"
    );

    let calls = git.calls();

    // The community target carries enterprise files, so it gets a patch
    // of the merge commit restricted to the non-enterprise paths.
    assert!(
        calls.contains(&"show msha -- README.md docs/guide.mdx".to_string()),
        "{calls:?}"
    );
    assert_eq!(calls.iter().filter(|c| *c == "am").count(), 1);

    // Enterprise targets take the commits whole; the merge commit is
    // skipped on each.
    assert_eq!(
        calls.iter().filter(|c| *c == "cherry-pick c1").count(),
        2,
        "{calls:?}"
    );
    assert!(!calls.contains(&"cherry-pick cm".to_string()));

    // Nothing failed, so no recovery resets.
    assert!(!calls.iter().any(|c| c.starts_with("reset ")), "{calls:?}");

    // Each attempt pushed its branch and opened a pull request on its
    // target, with ownership handed to the source assignee and merger.
    let created = host.created_pulls.lock().unwrap();
    let bases: BTreeSet<String> = created.iter().map(|(_, _, base, _)| base.clone()).collect();
    assert_eq!(bases, planned);
    for (_, head, base, _) in created.iter() {
        assert_eq!(head, &backport_branch_name(base, "seal-fix"));
        assert!(calls.contains(&format!("push origin {head}")), "{calls:?}");
    }
    let assignees = host.assignees.lock().unwrap();
    assert_eq!(assignees.len(), 3);
    assert!(assignees
        .iter()
        .all(|(_, logins)| logins == &["jo".to_string(), "sam".to_string()]));

    // The source pull request got exactly one status comment.
    let comments = host.comments.lock().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].2, 100);
    assert!(comments[0].3.contains("Backport"));
    assert!(res.comment_url.is_some());
}

#[tokio::test]
async fn failed_transfer_recovers_with_a_placeholder_and_resets_between_attempts() {
    let host = host();
    let mut git = FakeGit::new()
        .with_parents("c1", &["p1"])
        .with_parents("cm", &["p1", "p2"]);
    git.fail_cherry_pick_on = Some("1.18".to_string());
    let req = req();

    let res = req.run_with_client(&host, &git).await;

    // The failure is contained to its own attempt; every planned target
    // still gets one.
    assert_eq!(res.attempts.len(), 3);
    let failed = &res.attempts["release/1.18.x+ent"];
    let err = failed.error.as_deref().expect("cherry-pick should fail");
    assert!(err.contains("cherry-picking pull request commits"), "{err}");
    assert!(
        failed.pull_request.is_some(),
        "failed transfers still open a pull request"
    );
    assert!(res.attempts["release/1.19.x+ent"].error.is_none());

    let calls = git.calls();

    // Recovery: branch reset to its base, one placeholder commit, and the
    // worktree reset to the source base before the next attempt.
    assert!(calls.contains(&"reset release/1.18.x+ent".to_string()), "{calls:?}");
    assert!(
        calls.iter().any(|c| c.starts_with("commit Placeholder commit:")),
        "{calls:?}"
    );
    assert!(calls.contains(&"reset origin/main".to_string()), "{calls:?}");

    // The status comment carries the combined error.
    let comments = host.comments.lock().unwrap();
    assert_eq!(comments.len(), 1);
    assert!(comments[0].3.contains("cherry-picking pull request commits"));
}

#[tokio::test]
async fn stops_attempting_targets_when_the_recovery_reset_fails() {
    let host = host();
    let mut git = FakeGit::new()
        .with_parents("c1", &["p1"])
        .with_parents("cm", &["p1", "p2"]);
    git.fail_cherry_pick_on = Some("1.18".to_string());
    git.fail_reset_to = Some("origin/main".to_string());
    let req = req();

    let res = req.run_with_client(&host, &git).await;

    // A worktree that cannot be reset is unusable for further attempts.
    let err = res.error.as_deref().expect("recovery reset should fail");
    assert!(
        err.contains("resetting repository after failed attempt"),
        "{err}"
    );
    let attempted: Vec<&String> = res.attempts.keys().collect();
    assert_eq!(attempted, ["ce/main", "release/1.18.x+ent"]);

    // The status comment is still posted.
    assert_eq!(host.comments.lock().unwrap().len(), 1);
}
