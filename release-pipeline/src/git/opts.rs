//! Typed options for git subcommands.
//!
//! Each option struct renders itself to argument vectors; the client in
//! [`super`] owns execution. Only the flags the propagation engine uses are
//! modeled.

use std::path::PathBuf;

/// Merge strategy passed with `-s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategy {
    /// The default ort strategy, named explicitly for reproducibility.
    Ort,
}

impl MergeStrategy {
    pub(super) fn as_arg(&self) -> &'static str {
        match self {
            Self::Ort => "ort",
        }
    }
}

/// Strategy option passed with `-X`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStrategyOption {
    /// Prefer the incoming side on conflicting hunks.
    Theirs,
    /// Ignore whitespace-only changes when matching context.
    IgnoreSpaceChange,
}

impl MergeStrategyOption {
    pub(super) fn as_arg(&self) -> &'static str {
        match self {
            Self::Theirs => "theirs",
            Self::IgnoreSpaceChange => "ignore-space-change",
        }
    }
}

/// Behavior for commits that become empty, passed with `--empty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyCommit {
    Keep,
    Drop,
    Stop,
}

impl EmptyCommit {
    pub(super) fn as_arg(&self) -> &'static str {
        match self {
            Self::Keep => "keep",
            Self::Drop => "drop",
            Self::Stop => "stop",
        }
    }
}

/// Whitespace handling for `git am`, passed with `--whitespace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhitespaceAction {
    Fix,
    Nowarn,
}

impl WhitespaceAction {
    pub(super) fn as_arg(&self) -> &'static str {
        match self {
            Self::Fix => "fix",
            Self::Nowarn => "nowarn",
        }
    }
}

/// Diff algorithm for `git show --diff-algorithm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffAlgorithm {
    Myers,
    Histogram,
}

impl DiffAlgorithm {
    pub(super) fn as_arg(&self) -> &'static str {
        match self {
            Self::Myers => "myers",
            Self::Histogram => "histogram",
        }
    }
}

/// Options for `git clone`.
#[derive(Debug, Clone, Default)]
pub struct CloneOpts {
    /// Clone URL.
    pub repository: String,
    /// Branch to clone.
    pub branch: Option<String>,
    /// Pass `--single-branch`.
    pub single_branch: bool,
    /// Pass `--no-checkout`.
    pub no_checkout: bool,
    /// Name for the origin remote, `--origin`.
    pub origin: Option<String>,
}

impl CloneOpts {
    pub(super) fn to_args(&self) -> Vec<String> {
        let mut args = vec!["clone".to_string()];
        if self.single_branch {
            args.push("--single-branch".to_string());
        }
        if self.no_checkout {
            args.push("--no-checkout".to_string());
        }
        if let Some(origin) = &self.origin {
            args.push("--origin".to_string());
            args.push(origin.clone());
        }
        if let Some(branch) = &self.branch {
            args.push("--branch".to_string());
            args.push(branch.clone());
        }
        args.push(self.repository.clone());
        // Clone into the client's worktree directory itself.
        args.push(".".to_string());
        args
    }
}

/// Options for `git remote add`.
#[derive(Debug, Clone, Default)]
pub struct RemoteAddOpts {
    pub name: String,
    pub url: String,
    /// Pass `-f` to fetch immediately.
    pub fetch: bool,
    /// Branches to track, `-t`.
    pub track: Vec<String>,
}

impl RemoteAddOpts {
    pub(super) fn to_args(&self) -> Vec<String> {
        let mut args = vec!["remote".to_string(), "add".to_string()];
        if self.fetch {
            args.push("-f".to_string());
        }
        for branch in &self.track {
            args.push("-t".to_string());
            args.push(branch.clone());
        }
        args.push(self.name.clone());
        args.push(self.url.clone());
        args
    }
}

/// Options for `git fetch`.
#[derive(Debug, Clone, Default)]
pub struct FetchOpts {
    /// Remote name.
    pub remote: String,
    /// Refspecs, e.g. `main:main`.
    pub refspecs: Vec<String>,
    /// Pass `--set-upstream`.
    pub set_upstream: bool,
    /// Pass `--porcelain`.
    pub porcelain: bool,
}

impl FetchOpts {
    pub(super) fn to_args(&self) -> Vec<String> {
        let mut args = vec!["fetch".to_string()];
        if self.porcelain {
            args.push("--porcelain".to_string());
        }
        if self.set_upstream {
            args.push("--set-upstream".to_string());
        }
        args.push(self.remote.clone());
        args.extend(self.refspecs.iter().cloned());
        args
    }
}

/// Options for `git checkout`.
#[derive(Debug, Clone, Default)]
pub struct CheckoutOpts {
    /// Ref to check out.
    pub branch: String,
    /// Force-create this branch from `branch` (`-B`).
    pub new_branch_force: Option<String>,
}

impl CheckoutOpts {
    pub(super) fn to_args(&self) -> Vec<String> {
        let mut args = vec!["checkout".to_string()];
        if let Some(new_branch) = &self.new_branch_force {
            args.push("-B".to_string());
            args.push(new_branch.clone());
        }
        args.push(self.branch.clone());
        args
    }
}

/// Options for `git cherry-pick`.
#[derive(Debug, Clone)]
pub struct CherryPickOpts {
    /// Commit to pick.
    pub commit: String,
    /// Pass `--ff`.
    pub ff: bool,
    pub empty: EmptyCommit,
    pub strategy: MergeStrategy,
    pub strategy_options: Vec<MergeStrategyOption>,
}

impl CherryPickOpts {
    pub(super) fn to_args(&self) -> Vec<String> {
        let mut args = vec!["cherry-pick".to_string()];
        if self.ff {
            args.push("--ff".to_string());
        }
        args.push(format!("--empty={}", self.empty.as_arg()));
        args.push("--strategy".to_string());
        args.push(self.strategy.as_arg().to_string());
        for opt in &self.strategy_options {
            args.push(format!("--strategy-option={}", opt.as_arg()));
        }
        args.push(self.commit.clone());
        args
    }
}

/// Options for `git show`.
#[derive(Debug, Clone, Default)]
pub struct ShowOpts {
    /// Object to show.
    pub object: String,
    /// Pretty format, `--format`.
    pub format: Option<String>,
    /// Pass `--patch`.
    pub patch: bool,
    /// Pass `--no-patch`.
    pub no_patch: bool,
    /// Pass `--no-color`.
    pub no_color: bool,
    /// Write output to a file, `--output`.
    pub output: Option<PathBuf>,
    pub diff_algorithm: Option<DiffAlgorithm>,
    /// Restrict the patch to these paths.
    pub path_spec: Vec<String>,
}

impl ShowOpts {
    pub(super) fn to_args(&self) -> Vec<String> {
        let mut args = vec!["show".to_string()];
        if let Some(format) = &self.format {
            args.push(format!("--format={format}"));
        }
        if self.patch {
            args.push("--patch".to_string());
        }
        if self.no_patch {
            args.push("--no-patch".to_string());
        }
        if self.no_color {
            args.push("--no-color".to_string());
        }
        if let Some(algorithm) = &self.diff_algorithm {
            args.push(format!("--diff-algorithm={}", algorithm.as_arg()));
        }
        if let Some(output) = &self.output {
            args.push(format!("--output={}", output.display()));
        }
        args.push(self.object.clone());
        if !self.path_spec.is_empty() {
            args.push("--".to_string());
            args.extend(self.path_spec.iter().cloned());
        }
        args
    }
}

/// Options for `git am`.
#[derive(Debug, Clone)]
pub struct AmOpts {
    /// Mailbox patch files to apply.
    pub mbox: Vec<PathBuf>,
    /// Pass `--3way`.
    pub three_way: bool,
    pub whitespace: Option<WhitespaceAction>,
    /// Pass `--keep-non-patch`.
    pub keep_non_patch: bool,
    /// Pass `--committer-date-is-author-date`.
    pub committer_date_is_author_date: bool,
    pub empty: EmptyCommit,
}

impl AmOpts {
    pub(super) fn to_args(&self) -> Vec<String> {
        let mut args = vec!["am".to_string()];
        if self.three_way {
            args.push("--3way".to_string());
        }
        if let Some(action) = &self.whitespace {
            args.push(format!("--whitespace={}", action.as_arg()));
        }
        if self.keep_non_patch {
            args.push("--keep-non-patch".to_string());
        }
        if self.committer_date_is_author_date {
            args.push("--committer-date-is-author-date".to_string());
        }
        args.push(format!("--empty={}", self.empty.as_arg()));
        args.extend(self.mbox.iter().map(|p| p.display().to_string()));
        args
    }
}

/// Options for `git commit`.
#[derive(Debug, Clone, Default)]
pub struct CommitOpts {
    /// Commit message, `-m`.
    pub message: Option<String>,
    /// Read the message from a file, `-F`.
    pub file: Option<PathBuf>,
    pub allow_empty: bool,
    pub no_verify: bool,
    pub no_edit: bool,
}

impl CommitOpts {
    pub(super) fn to_args(&self) -> Vec<String> {
        let mut args = vec!["commit".to_string()];
        if self.allow_empty {
            args.push("--allow-empty".to_string());
        }
        if self.no_verify {
            args.push("--no-verify".to_string());
        }
        if self.no_edit {
            args.push("--no-edit".to_string());
        }
        if let Some(message) = &self.message {
            args.push("-m".to_string());
            args.push(message.clone());
        }
        if let Some(file) = &self.file {
            args.push("-F".to_string());
            args.push(file.display().to_string());
        }
        args
    }
}

/// Options for `git push`.
#[derive(Debug, Clone, Default)]
pub struct PushOpts {
    /// Remote name or URL.
    pub repository: String,
    pub refspecs: Vec<String>,
}

impl PushOpts {
    pub(super) fn to_args(&self) -> Vec<String> {
        let mut args = vec!["push".to_string()];
        args.push(self.repository.clone());
        args.extend(self.refspecs.iter().cloned());
        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cherry_pick_args_match_policy() {
        let opts = CherryPickOpts {
            commit: "abc123".to_string(),
            ff: true,
            empty: EmptyCommit::Keep,
            strategy: MergeStrategy::Ort,
            strategy_options: vec![
                MergeStrategyOption::Theirs,
                MergeStrategyOption::IgnoreSpaceChange,
            ],
        };
        assert_eq!(
            opts.to_args(),
            [
                "cherry-pick",
                "--ff",
                "--empty=keep",
                "--strategy",
                "ort",
                "--strategy-option=theirs",
                "--strategy-option=ignore-space-change",
                "abc123",
            ]
        );
    }

    #[test]
    fn am_args_match_policy() {
        let opts = AmOpts {
            mbox: vec![PathBuf::from("/tmp/x.patch")],
            three_way: true,
            whitespace: Some(WhitespaceAction::Fix),
            keep_non_patch: true,
            committer_date_is_author_date: true,
            empty: EmptyCommit::Keep,
        };
        assert_eq!(
            opts.to_args(),
            [
                "am",
                "--3way",
                "--whitespace=fix",
                "--keep-non-patch",
                "--committer-date-is-author-date",
                "--empty=keep",
                "/tmp/x.patch",
            ]
        );
    }

    #[test]
    fn show_restricts_pathspec_after_separator() {
        let opts = ShowOpts {
            object: "deadbeef".to_string(),
            format: Some("mboxrd".to_string()),
            patch: true,
            no_color: true,
            output: Some(PathBuf::from("/tmp/p.patch")),
            diff_algorithm: Some(DiffAlgorithm::Myers),
            path_spec: vec!["go.mod".to_string(), "vault/core.go".to_string()],
            ..Default::default()
        };
        let args = opts.to_args();
        assert_eq!(args[0], "show");
        assert!(args.contains(&"--format=mboxrd".to_string()));
        let sep = args.iter().position(|a| a == "--").unwrap();
        assert!(args.iter().position(|a| a == "deadbeef").unwrap() < sep);
        assert_eq!(&args[sep + 1..], ["go.mod", "vault/core.go"]);
    }

    #[test]
    fn fetch_with_tracking_refspec() {
        let opts = FetchOpts {
            remote: "origin".to_string(),
            refspecs: vec!["main:main".to_string()],
            set_upstream: true,
            porcelain: true,
        };
        assert_eq!(
            opts.to_args(),
            ["fetch", "--porcelain", "--set-upstream", "origin", "main:main"]
        );
    }

    #[test]
    fn checkout_force_creates_branch() {
        let opts = CheckoutOpts {
            branch: "ce/main".to_string(),
            new_branch_force: Some("backport/ce/main/my-feature".to_string()),
        };
        assert_eq!(
            opts.to_args(),
            ["checkout", "-B", "backport/ce/main/my-feature", "ce/main"]
        );
    }
}
