//! GitHub host abstraction.
//!
//! [`GithubHost`] is the seam between the propagation workflows and the
//! GitHub API: the production implementation wraps an [`octocrab::Octocrab`]
//! client, while tests drive the workflows with in-memory fakes.

use octocrab::Octocrab;
use serde::Deserialize;
use tracing::debug;

use super::error::GithubError;
use super::types::{
    ClosingIssue, CreatedPullRequest, NewPullRequest, PostedComment, PullCommit, PullRequestRef,
    PullRequestState,
};
use crate::changed::ChangedFile;

const PER_PAGE: u8 = 100;

/// Everything the propagation workflows need from GitHub.
#[allow(async_fn_in_trait)]
pub trait GithubHost {
    /// Fetches a pull request snapshot.
    async fn get_pull(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestRef, GithubError>;

    /// Lists the files changed by a pull request, classified into groups.
    async fn list_changed_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<ChangedFile>, GithubError>;

    /// Lists the commits of a pull request in order.
    async fn list_pull_commits(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<PullCommit>, GithubError>;

    /// Logins of reviewers whose latest review approved the pull request.
    async fn list_approvers(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<String>, GithubError>;

    /// Opens a pull request.
    async fn create_pull(
        &self,
        owner: &str,
        repo: &str,
        new: &NewPullRequest,
    ) -> Result<CreatedPullRequest, GithubError>;

    /// Assigns users to a pull request.
    async fn add_assignees(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        assignees: &[String],
    ) -> Result<(), GithubError>;

    /// Posts an issue comment on a pull request.
    async fn create_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<PostedComment, GithubError>;

    /// Closes a pull request without merging it.
    async fn close_pull(&self, owner: &str, repo: &str, number: u64) -> Result<(), GithubError>;

    /// Closes an issue.
    async fn close_issue(&self, owner: &str, repo: &str, number: u64) -> Result<(), GithubError>;

    /// Issues the pull request would close on merge, via the GraphQL
    /// `closingIssuesReferences` connection.
    async fn closing_issues(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<ClosingIssue>, GithubError>;
}

/// [`GithubHost`] backed by the GitHub REST and GraphQL APIs.
pub struct OctocrabHost {
    client: Octocrab,
}

#[derive(Debug, Deserialize)]
struct FileItem {
    filename: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    sha: String,
    commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    author: Option<CommitIdent>,
    committer: Option<CommitIdent>,
}

#[derive(Debug, Deserialize)]
struct CommitIdent {
    name: Option<String>,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReviewItem {
    state: Option<String>,
    user: Option<ReviewUser>,
}

#[derive(Debug, Deserialize)]
struct ReviewUser {
    login: String,
}

impl OctocrabHost {
    /// Builds a host authenticated with a personal or installation access
    /// token.
    pub fn new(token: String) -> Result<Self, GithubError> {
        let client = Octocrab::builder().personal_token(token).build()?;
        Ok(Self { client })
    }

    #[must_use]
    pub fn from_client(client: Octocrab) -> Self {
        Self { client }
    }

    /// Fetches every page of a list endpoint that returns a JSON array.
    async fn get_all<T: serde::de::DeserializeOwned>(
        &self,
        route: &str,
    ) -> Result<Vec<T>, GithubError> {
        let mut items = Vec::new();
        let mut page = 1u32;
        loop {
            let route = format!("{route}?per_page={PER_PAGE}&page={page}");
            let batch: Vec<T> = self.client.get(&route, None::<&()>).await?;
            let len = batch.len();
            items.extend(batch);
            if len < usize::from(PER_PAGE) {
                return Ok(items);
            }
            page += 1;
        }
    }
}

impl GithubHost for OctocrabHost {
    async fn get_pull(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<PullRequestRef, GithubError> {
        debug!(owner, repo, number, "fetching pull request");
        let pull = self.client.pulls(owner, repo).get(number).await?;

        let state = match pull.state {
            Some(octocrab::models::IssueState::Closed) => PullRequestState::Closed,
            _ => PullRequestState::Open,
        };
        let labels = pull
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|label| label.name)
            .collect();

        Ok(PullRequestRef {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
            title: pull.title.unwrap_or_default(),
            html_url: pull
                .html_url
                .map(|url| url.to_string())
                .unwrap_or_else(|| format!("https://github.com/{owner}/{repo}/pull/{number}")),
            base_ref: pull.base.ref_field,
            head_ref: pull.head.ref_field,
            head_sha: pull.head.sha,
            merge_commit_sha: pull.merge_commit_sha,
            state,
            merged: pull.merged_at.is_some(),
            labels,
            assignee: pull.assignee.map(|user| user.login),
            merged_by: pull.merged_by.map(|user| user.login),
        })
    }

    async fn list_changed_files(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<ChangedFile>, GithubError> {
        let files: Vec<FileItem> = self
            .get_all(&format!("/repos/{owner}/{repo}/pulls/{number}/files"))
            .await?;
        Ok(files
            .into_iter()
            .map(|file| ChangedFile::classified(&file.filename, &file.sha))
            .collect())
    }

    async fn list_pull_commits(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<PullCommit>, GithubError> {
        let commits: Vec<CommitItem> = self
            .get_all(&format!("/repos/{owner}/{repo}/pulls/{number}/commits"))
            .await?;
        Ok(commits
            .into_iter()
            .map(|item| {
                let ident = item.commit.author.or(item.commit.committer);
                let (name, email) = ident
                    .map(|ident| {
                        (
                            ident.name.unwrap_or_default(),
                            ident.email.unwrap_or_default(),
                        )
                    })
                    .unwrap_or_default();
                PullCommit {
                    sha: item.sha,
                    author_name: name,
                    author_email: email,
                }
            })
            .collect())
    }

    async fn list_approvers(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<String>, GithubError> {
        let reviews: Vec<ReviewItem> = self
            .get_all(&format!("/repos/{owner}/{repo}/pulls/{number}/reviews"))
            .await?;

        // Reviews arrive oldest first; only a user's latest review counts.
        let mut latest: Vec<(String, String)> = Vec::new();
        for review in reviews {
            let (Some(user), Some(state)) = (review.user, review.state) else {
                continue;
            };
            if let Some(entry) = latest.iter_mut().find(|(login, _)| *login == user.login) {
                entry.1 = state;
            } else {
                latest.push((user.login, state));
            }
        }
        Ok(latest
            .into_iter()
            .filter(|(_, state)| state == "APPROVED")
            .map(|(login, _)| login)
            .collect())
    }

    async fn create_pull(
        &self,
        owner: &str,
        repo: &str,
        new: &NewPullRequest,
    ) -> Result<CreatedPullRequest, GithubError> {
        debug!(owner, repo, head = %new.head, base = %new.base, "creating pull request");
        let pull = self
            .client
            .pulls(owner, repo)
            .create(&new.title, &new.head, &new.base)
            .body(&new.body)
            .send()
            .await?;
        Ok(CreatedPullRequest {
            number: pull.number,
            html_url: pull
                .html_url
                .map(|url| url.to_string())
                .unwrap_or_else(|| {
                    format!("https://github.com/{owner}/{repo}/pull/{}", pull.number)
                }),
        })
    }

    async fn add_assignees(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        assignees: &[String],
    ) -> Result<(), GithubError> {
        let assignees: Vec<&str> = assignees.iter().map(String::as_str).collect();
        self.client
            .issues(owner, repo)
            .add_assignees(number, &assignees)
            .await?;
        Ok(())
    }

    async fn create_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<PostedComment, GithubError> {
        let comment = self
            .client
            .issues(owner, repo)
            .create_comment(number, body)
            .await?;
        Ok(PostedComment {
            html_url: comment.html_url.to_string(),
        })
    }

    async fn close_pull(&self, owner: &str, repo: &str, number: u64) -> Result<(), GithubError> {
        debug!(owner, repo, number, "closing pull request");
        self.client
            .pulls(owner, repo)
            .update(number)
            .state(octocrab::params::pulls::State::Closed)
            .send()
            .await?;
        Ok(())
    }

    async fn close_issue(&self, owner: &str, repo: &str, number: u64) -> Result<(), GithubError> {
        debug!(owner, repo, number, "closing issue");
        self.client
            .issues(owner, repo)
            .update(number)
            .state(octocrab::models::IssueState::Closed)
            .send()
            .await?;
        Ok(())
    }

    async fn closing_issues(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<ClosingIssue>, GithubError> {
        let query = r"
            query($owner: String!, $repo: String!, $number: Int!) {
                repository(owner: $owner, name: $repo) {
                    pullRequest(number: $number) {
                        closingIssuesReferences(first: 100) {
                            nodes {
                                url
                                number
                                title
                                closed
                                repository { nameWithOwner }
                            }
                        }
                    }
                }
            }";
        let response: serde_json::Value = self
            .client
            .graphql(&serde_json::json!({
                "query": query,
                "variables": {
                    "owner": owner,
                    "repo": repo,
                    "number": number,
                },
            }))
            .await?;

        let nodes = response
            .pointer("/data/repository/pullRequest/closingIssuesReferences/nodes")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| {
                GithubError::GraphQl("repository.pullRequest.closingIssuesReferences".to_string())
            })?;

        let mut issues = Vec::with_capacity(nodes.len());
        for node in nodes {
            issues.push(ClosingIssue {
                url: node
                    .pointer("/url")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                number: node
                    .pointer("/number")
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or_default(),
                title: node
                    .pointer("/title")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                closed: node
                    .pointer("/closed")
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or_default(),
                name_with_owner: node
                    .pointer("/repository/nameWithOwner")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
        Ok(issues)
    }
}
