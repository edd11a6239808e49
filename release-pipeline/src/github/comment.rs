//! Markdown status comments.
//!
//! Each workflow reports back to the source pull request with a table of
//! attempts. Columns that never carry a value (no attempt was skipped, no
//! attempt failed) are suppressed so the common all-green comment stays
//! small.

use std::collections::BTreeMap;

use super::attempt::PropagationAttempt;

/// Maximum characters GitHub accepts in an issue comment or PR body.
pub const MAX_COMMENT_LEN: usize = 65_536;

/// When truncating, prefer cutting at a newline within this many characters
/// of the limit so we do not leave half a table row behind.
const NEWLINE_SLACK: usize = 1_000;

const TRUNCATION_NOTICE: &str =
    "\n\n_The rest of this message was truncated because it exceeded the maximum length._";

/// Truncates a comment or PR body to [`MAX_COMMENT_LEN`] characters,
/// appending a notice when content was dropped.
#[must_use]
pub fn truncate_body(body: &str) -> String {
    let total = body.chars().count();
    if total <= MAX_COMMENT_LEN {
        return body.to_string();
    }

    let notice_len = TRUNCATION_NOTICE.chars().count();
    let budget = MAX_COMMENT_LEN - notice_len;
    let cut = body
        .char_indices()
        .nth(budget)
        .map_or(body.len(), |(idx, _)| idx);
    let mut head = &body[..cut];

    // Cut at a newline when one is close enough to the limit.
    let floor = head
        .char_indices()
        .rev()
        .nth(NEWLINE_SLACK)
        .map_or(0, |(idx, _)| idx);
    if let Some(newline) = head[floor..].rfind('\n') {
        head = &head[..floor + newline];
    }

    format!("{head}{TRUNCATION_NOTICE}")
}

/// Renders the status comment for a propagation result.
///
/// With no attempts and an error the workflow never got far enough for a
/// table and the error is reported alone. Otherwise the table is rendered
/// with a completed/failed title, and a failed run puts the top-level error
/// (attempt errors are already in the table) in a caption below.
pub(super) fn status_comment(
    workflow: &str,
    attempts: &BTreeMap<String, PropagationAttempt>,
    top_error: Option<&str>,
    combined_error: Option<String>,
) -> String {
    let Some(error) = combined_error else {
        return format!(
            "## {workflow} workflow completed!\n\n{}",
            attempts_table(attempts)
        );
    };

    if attempts.is_empty() {
        return format!("## {workflow} workflow failed!\n\nError: {error}");
    }

    let mut body = format!("## {workflow} workflow failed!\n\n{}", attempts_table(attempts));
    if let Some(top) = top_error {
        body.push_str(&format!("\n\nError: {top}"));
    }
    body
}

/// Renders attempts as a markdown table, suppressing empty columns.
fn attempts_table(attempts: &BTreeMap<String, PropagationAttempt>) -> String {
    const HEADERS: [&str; 5] = [
        "Base Branch",
        "Target Branch",
        "URL",
        "Skipped Reason",
        "Error",
    ];

    let rows: Vec<[String; 5]> = attempts
        .values()
        .map(|attempt| {
            [
                attempt.base_ref.clone(),
                attempt.target_ref.clone(),
                attempt
                    .pull_request
                    .as_ref()
                    .map(|pr| pr.html_url.clone())
                    .unwrap_or_default(),
                attempt.skipped_reason.clone(),
                attempt.error.clone().unwrap_or_default(),
            ]
        })
        .collect();

    let keep: Vec<usize> = (0..HEADERS.len())
        .filter(|&col| col < 2 || rows.iter().any(|row| !row[col].is_empty()))
        .collect();

    let mut out = String::new();
    render_row(&mut out, &keep, |col| HEADERS[col].to_string());
    render_row(&mut out, &keep, |_| "---".to_string());
    for row in &rows {
        render_row(&mut out, &keep, |col| escape_cell(&row[col]));
    }
    out
}

fn render_row(out: &mut String, keep: &[usize], cell: impl Fn(usize) -> String) {
    out.push('|');
    for &col in keep {
        out.push(' ');
        out.push_str(&cell(col));
        out.push_str(" |");
    }
    out.push('\n');
}

/// Pipes and newlines would break the table layout.
fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', "<br>")
}
