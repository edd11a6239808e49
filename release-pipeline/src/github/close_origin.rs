//! Close-origin workflow.
//!
//! Runs after a copy pull request merges into the enterprise repository:
//! the origin coordinates are decoded from the copy branch name, the
//! origin pull request is closed without merging, and every issue either
//! pull request would have closed is closed explicitly (GitHub only closes
//! linked issues on merge, and the origin never merges). Both pull
//! requests get an explanatory comment.

use serde::Serialize;
use tracing::{debug, info, info_span, Instrument};

use super::branch::parse_copy_branch;
use super::comment::truncate_body;
use super::error::RequestError;
use super::host::GithubHost;
use super::types::{ClosingIssue, PullRequestRef, PullRequestState};

/// A request to close the origin of a merged copy pull request.
#[derive(Debug, Clone)]
pub struct CloseOriginReq {
    /// Owner of the enterprise repository the copy merged into.
    pub owner: String,
    /// The enterprise repository.
    pub repo: String,
    /// The number of the merged copy pull request.
    pub pull_number: u64,
}

/// The outcome of a close-origin request. Like propagation results, errors
/// are embedded rather than returned.
#[derive(Debug, Default, Serialize)]
pub struct CloseOriginRes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_pull_request: Option<PullRequestRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_pull_request: Option<PullRequestRef>,
    /// Whether this run closed the origin pull request.
    pub origin_closed: bool,
    /// Issues closed by this run.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub closed_issues: Vec<ClosingIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_comment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_comment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CloseOriginRes {
    /// Appends an error, keeping any earlier one.
    pub fn push_error(&mut self, message: String) {
        self.error = Some(match self.error.take() {
            Some(existing) => format!("{existing}\n{message}"),
            None => message,
        });
    }

    /// Serializes the result to JSON.
    ///
    /// # Errors
    ///
    /// Fails when serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl CloseOriginReq {
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
        Ok(())
    }

    /// Runs the close-origin workflow.
    pub async fn run<H: GithubHost>(&self, host: &H) -> CloseOriginRes {
        let mut res = CloseOriginRes::default();

        debug!(
            owner = %self.owner,
            repo = %self.repo,
            pull_number = self.pull_number,
            "running close origin request"
        );

        if let Err(err) = self.validate() {
            res.push_error(format!("validating close origin request: {err}"));
            return res;
        }

        let span = info_span!("close_origin", pull_number = self.pull_number);
        async {
            self.execute(host, &mut res).await;
            self.comment(host, &mut res).await;
        }
        .instrument(span)
        .await;

        res
    }

    async fn execute<H: GithubHost>(&self, host: &H, res: &mut CloseOriginRes) {
        let copy = match host
            .get_pull(&self.owner, &self.repo, self.pull_number)
            .await
        {
            Ok(pull) => pull,
            Err(err) => {
                res.push_error(format!("fetching copy pull request: {err}"));
                return;
            }
        };

        let origin_coords = match parse_copy_branch(&copy.head_ref) {
            Ok(coords) => coords,
            Err(err) => {
                res.push_error(format!("decoding copy branch name: {err}"));
                res.copy_pull_request = Some(copy);
                return;
            }
        };
        res.copy_pull_request = Some(copy);

        if !res.copy_pull_request.as_ref().is_some_and(|pr| pr.merged) {
            res.push_error("copy pull request has not been merged".to_string());
            return;
        }

        let origin = match host
            .get_pull(
                &origin_coords.owner,
                &origin_coords.repo,
                origin_coords.number,
            )
            .await
        {
            Ok(pull) => pull,
            Err(err) => {
                res.push_error(format!("fetching origin pull request: {err}"));
                return;
            }
        };
        res.origin_pull_request = Some(origin.clone());

        // The origin is closed, never merged; its changes arrived through
        // the copy.
        if origin.state == PullRequestState::Open {
            match host
                .close_pull(&origin.owner, &origin.repo, origin.number)
                .await
            {
                Ok(()) => {
                    info!(
                        owner = %origin.owner,
                        repo = %origin.repo,
                        number = origin.number,
                        "closed origin pull request"
                    );
                    res.origin_closed = true;
                }
                Err(err) => {
                    res.push_error(format!("closing origin pull request: {err}"));
                }
            }
        } else {
            debug!(number = origin.number, "origin pull request already closed");
        }

        self.close_linked_issues(host, res, &origin).await;
    }

    /// Closes every open issue linked to either pull request.
    async fn close_linked_issues<H: GithubHost>(
        &self,
        host: &H,
        res: &mut CloseOriginRes,
        origin: &PullRequestRef,
    ) {
        let mut issues: Vec<ClosingIssue> = Vec::new();
        for (owner, repo, number) in [
            (&self.owner, &self.repo, self.pull_number),
            (&origin.owner, &origin.repo, origin.number),
        ] {
            match host.closing_issues(owner, repo, number).await {
                Ok(linked) => {
                    for issue in linked {
                        if !issues.iter().any(|known| known.key() == issue.key()) {
                            issues.push(issue);
                        }
                    }
                }
                Err(err) => {
                    res.push_error(format!(
                        "listing issues linked to {owner}/{repo}#{number}: {err}"
                    ));
                }
            }
        }

        for issue in issues {
            if issue.closed {
                debug!(url = %issue.url, "linked issue already closed");
                continue;
            }
            let Some((owner, repo)) = issue.owner_repo() else {
                res.push_error(format!(
                    "cannot split repository name '{}' into owner and repo",
                    issue.name_with_owner
                ));
                continue;
            };
            match host.close_issue(owner, repo, issue.number).await {
                Ok(()) => {
                    info!(url = %issue.url, "closed linked issue");
                    res.closed_issues.push(issue);
                }
                Err(err) => {
                    res.push_error(format!("closing linked issue {}: {err}", issue.url));
                }
            }
        }
    }

    /// Comments on both pull requests describing what was done.
    async fn comment<H: GithubHost>(&self, host: &H, res: &mut CloseOriginRes) {
        let Some(origin) = res.origin_pull_request.clone() else {
            return;
        };
        let copy_url = res
            .copy_pull_request
            .as_ref()
            .map(|pr| pr.html_url.clone())
            .unwrap_or_default();

        let mut closed_list = String::new();
        for issue in &res.closed_issues {
            closed_list.push_str(&format!("\n- {} ({})", issue.url, issue.title));
        }

        let mut origin_body = format!(
            "This pull request was closed because its copy {copy_url} has been merged."
        );
        if !closed_list.is_empty() {
            origin_body.push_str(&format!("\n\nClosed linked issues:{closed_list}"));
        }
        if let Some(error) = &res.error {
            origin_body.push_str(&format!("\n\nError: {error}"));
        }

        match host
            .create_comment(
                &origin.owner,
                &origin.repo,
                origin.number,
                &truncate_body(&origin_body),
            )
            .await
        {
            Ok(comment) => res.origin_comment_url = Some(comment.html_url),
            Err(err) => res.push_error(format!("commenting on origin pull request: {err}")),
        }

        let mut copy_body = format!(
            "Closed origin pull request {} after this copy merged.",
            origin.html_url
        );
        if !closed_list.is_empty() {
            copy_body.push_str(&format!("\n\nClosed linked issues:{closed_list}"));
        }
        if let Some(error) = &res.error {
            copy_body.push_str(&format!("\n\nError: {error}"));
        }

        match host
            .create_comment(
                &self.owner,
                &self.repo,
                self.pull_number,
                &truncate_body(&copy_body),
            )
            .await
        {
            Ok(comment) => res.copy_comment_url = Some(comment.html_url),
            Err(err) => res.push_error(format!("commenting on copy pull request: {err}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_names_the_missing_field() {
        let req = CloseOriginReq {
            owner: String::new(),
            repo: "vault-enterprise".to_string(),
            pull_number: 1,
        };
        assert_eq!(req.validate(), Err(RequestError::MissingOwner));

        let req = CloseOriginReq {
            owner: "hashicorp".to_string(),
            repo: "vault-enterprise".to_string(),
            pull_number: 0,
        };
        assert_eq!(req.validate(), Err(RequestError::MissingPullNumber));
    }
}
