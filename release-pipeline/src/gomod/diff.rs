//! Directive-scoped module diffing.
//!
//! Compares two parsed manifests one directive at a time. Every emitted
//! diff carries its directive kind and a unified-diff payload with one line
//! of context whose headers name the two input files. The diff list is
//! empty exactly when the manifests agree under the enabled directives and
//! strictness.

use serde::Serialize;

use super::parse::{GoDebug, ModFile, ModuleVersion, Replace, Retract};

/// A top-level manifest construct. Ordering drives the final sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Directive {
    Module,
    Go,
    Toolchain,
    Godebug,
    Require,
    Exclude,
    Replace,
    Retract,
    Tool,
    Ignore,
}

impl Directive {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Go => "go",
            Self::Toolchain => "toolchain",
            Self::Godebug => "godebug",
            Self::Require => "require",
            Self::Exclude => "exclude",
            Self::Replace => "replace",
            Self::Retract => "retract",
            Self::Tool => "tool",
            Self::Ignore => "ignore",
        }
    }
}

/// One divergence between the manifests.
#[derive(Debug, Clone, Serialize)]
pub struct DirectiveDiff {
    pub directive: Directive,
    /// Unified diff, 1 line of context.
    pub diff: String,
}

/// Which passes run and how strictly list directives are compared.
///
/// Non-strict list comparison only reports entries whose key exists on
/// both sides with different values; the strict sub-flags additionally
/// report entries present on one side only.
#[derive(Debug, Clone, Copy)]
pub struct DiffOptions {
    pub module: bool,
    pub go: bool,
    pub toolchain: bool,
    pub godebug: bool,
    pub require: bool,
    pub exclude: bool,
    pub replace: bool,
    pub retract: bool,
    pub tool: bool,
    pub ignore: bool,
    pub strict_require: bool,
    pub strict_exclude: bool,
    pub strict_replace: bool,
    pub strict_retract: bool,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            module: true,
            go: true,
            toolchain: true,
            godebug: true,
            require: true,
            exclude: true,
            replace: true,
            retract: true,
            tool: true,
            ignore: true,
            strict_require: false,
            strict_exclude: false,
            strict_replace: false,
            strict_retract: false,
        }
    }
}

impl DiffOptions {
    /// Enables every strict sub-flag.
    #[must_use]
    pub fn all_strict(mut self) -> Self {
        self.strict_require = true;
        self.strict_exclude = true;
        self.strict_replace = true;
        self.strict_retract = true;
        self
    }
}

/// Diffs two manifests.
#[must_use]
pub fn diff_mod_files(a: &ModFile, b: &ModFile, opts: &DiffOptions) -> Vec<DirectiveDiff> {
    let mut diffs = Vec::new();

    if opts.module {
        scalar_pass(&mut diffs, Directive::Module, a, b, &a.module, &b.module);
    }
    if opts.go {
        scalar_pass(&mut diffs, Directive::Go, a, b, &a.go, &b.go);
    }
    if opts.toolchain {
        scalar_pass(
            &mut diffs,
            Directive::Toolchain,
            a,
            b,
            &a.toolchain,
            &b.toolchain,
        );
    }
    if opts.godebug {
        keyed_pass(
            &mut diffs,
            Directive::Godebug,
            a,
            b,
            &a.godebug,
            &b.godebug,
            true,
            |entry| entry.key.clone(),
            GoDebug::text,
        );
    }
    if opts.require {
        module_version_pass(
            &mut diffs,
            Directive::Require,
            a,
            b,
            &a.require,
            &b.require,
            opts.strict_require,
        );
    }
    if opts.exclude {
        module_version_pass(
            &mut diffs,
            Directive::Exclude,
            a,
            b,
            &a.exclude,
            &b.exclude,
            opts.strict_exclude,
        );
    }
    if opts.replace {
        keyed_pass(
            &mut diffs,
            Directive::Replace,
            a,
            b,
            &a.replace,
            &b.replace,
            opts.strict_replace,
            |entry| entry.old_path.clone(),
            Replace::text,
        );
    }
    if opts.retract {
        keyed_pass(
            &mut diffs,
            Directive::Retract,
            a,
            b,
            &a.retract,
            &b.retract,
            opts.strict_retract,
            |entry| entry.low.clone(),
            Retract::text,
        );
    }
    if opts.tool {
        presence_pass(&mut diffs, Directive::Tool, a, b, &a.tool, &b.tool);
    }
    if opts.ignore {
        presence_pass(&mut diffs, Directive::Ignore, a, b, &a.ignore, &b.ignore);
    }

    diffs.sort_by(|x, y| {
        x.directive
            .cmp(&y.directive)
            .then_with(|| x.diff.cmp(&y.diff))
    });
    diffs
}

/// Single-value directives: one diff when the values differ or only one
/// side has the directive.
fn scalar_pass(
    out: &mut Vec<DirectiveDiff>,
    directive: Directive,
    a: &ModFile,
    b: &ModFile,
    a_value: &Option<String>,
    b_value: &Option<String>,
) {
    if a_value == b_value {
        return;
    }
    let text = |value: &Option<String>| {
        value
            .as_ref()
            .map(|v| format!("{} {v}", directive.as_str()))
            .unwrap_or_default()
    };
    out.push(DirectiveDiff {
        directive,
        diff: unified(&a.name, &b.name, &text(a_value), &text(b_value)),
    });
}

/// Keyed list directives.
///
/// Entries whose key matches on both sides but whose value differs emit a
/// two-sided diff (once, keyed from the A pass). With `strict`, entries
/// whose key appears only on one side emit a one-sided diff.
#[allow(clippy::too_many_arguments)]
fn keyed_pass<T: PartialEq>(
    out: &mut Vec<DirectiveDiff>,
    directive: Directive,
    a: &ModFile,
    b: &ModFile,
    a_entries: &[T],
    b_entries: &[T],
    strict: bool,
    key: impl Fn(&T) -> String,
    text: impl Fn(&T) -> String,
) {
    for entry in a_entries {
        match b_entries.iter().find(|other| key(other) == key(entry)) {
            Some(other) => {
                if entry != other {
                    out.push(DirectiveDiff {
                        directive,
                        diff: unified(&a.name, &b.name, &text(entry), &text(other)),
                    });
                }
            }
            None if strict => out.push(DirectiveDiff {
                directive,
                diff: unified(&a.name, &b.name, &text(entry), ""),
            }),
            None => {}
        }
    }
    if strict {
        for entry in b_entries {
            if !a_entries.iter().any(|other| key(other) == key(entry)) {
                out.push(DirectiveDiff {
                    directive,
                    diff: unified(&a.name, &b.name, "", &text(entry)),
                });
            }
        }
    }
}

fn module_version_pass(
    out: &mut Vec<DirectiveDiff>,
    directive: Directive,
    a: &ModFile,
    b: &ModFile,
    a_entries: &[ModuleVersion],
    b_entries: &[ModuleVersion],
    strict: bool,
) {
    let name = directive.as_str();
    keyed_pass(
        out,
        directive,
        a,
        b,
        a_entries,
        b_entries,
        strict,
        |entry| entry.path.clone(),
        |entry| entry.text(name),
    );
}

/// Value-less list directives: one-sided presence diffs in both
/// directions.
fn presence_pass(
    out: &mut Vec<DirectiveDiff>,
    directive: Directive,
    a: &ModFile,
    b: &ModFile,
    a_entries: &[String],
    b_entries: &[String],
) {
    let text = |value: &str| format!("{} {value}", directive.as_str());
    for entry in a_entries {
        if !b_entries.contains(entry) {
            out.push(DirectiveDiff {
                directive,
                diff: unified(&a.name, &b.name, &text(entry), ""),
            });
        }
    }
    for entry in b_entries {
        if !a_entries.contains(entry) {
            out.push(DirectiveDiff {
                directive,
                diff: unified(&a.name, &b.name, "", &text(entry)),
            });
        }
    }
}

/// Renders a unified diff of two canonical entry texts with one line of
/// context and the input file names as headers.
fn unified(a_name: &str, b_name: &str, a_text: &str, b_text: &str) -> String {
    let terminated = |text: &str| {
        if text.is_empty() {
            String::new()
        } else {
            format!("{text}\n")
        }
    };
    let a_text = terminated(a_text);
    let b_text = terminated(b_text);
    let patch = diffy::DiffOptions::new()
        .set_context_len(1)
        .create_patch(&a_text, &b_text);

    // diffy labels the sides "original" and "modified"; name the inputs.
    let mut lines = Vec::new();
    for line in patch.to_string().lines() {
        if line == "--- original" {
            lines.push(format!("--- {a_name}"));
        } else if line == "+++ modified" {
            lines.push(format!("+++ {b_name}"));
        } else {
            lines.push(line.to_string());
        }
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}
