//! Go module manifest parser.
//!
//! Parses the directives the differ compares: `module`, `go`, `toolchain`,
//! `godebug`, `require`, `exclude`, `replace`, `retract`, `tool` and
//! `ignore`, in both single-line and block form. Entries are canonicalized
//! to a directive-qualified single line which serves as the pre-image for
//! unified-diff output.

use super::error::GomodError;

/// How strictly to parse a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Unknown directives are tolerated and skipped.
    #[default]
    Lax,
    /// Unknown directives are rejected.
    Strict,
}

/// A `godebug key=value` setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoDebug {
    pub key: String,
    pub value: String,
}

impl GoDebug {
    #[must_use]
    pub fn text(&self) -> String {
        format!("godebug {}={}", self.key, self.value)
    }
}

/// A `require` or `exclude` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleVersion {
    pub path: String,
    pub version: String,
}

impl ModuleVersion {
    #[must_use]
    pub fn text(&self, directive: &str) -> String {
        format!("{directive} {} {}", self.path, self.version)
    }
}

/// A `replace` entry. Versions are absent for filesystem replacements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replace {
    pub old_path: String,
    pub old_version: Option<String>,
    pub new_path: String,
    pub new_version: Option<String>,
}

impl Replace {
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::from("replace ");
        out.push_str(&self.old_path);
        if let Some(version) = &self.old_version {
            out.push(' ');
            out.push_str(version);
        }
        out.push_str(" => ");
        out.push_str(&self.new_path);
        if let Some(version) = &self.new_version {
            out.push(' ');
            out.push_str(version);
        }
        out
    }
}

/// A `retract` entry: a single version or a closed interval, with the
/// rationale taken from the trailing comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retract {
    pub low: String,
    pub high: String,
    pub rationale: Option<String>,
}

impl Retract {
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = if self.low == self.high {
            format!("retract {}", self.low)
        } else {
            format!("retract [{}, {}]", self.low, self.high)
        };
        if let Some(rationale) = &self.rationale {
            out.push_str(" // ");
            out.push_str(rationale);
        }
        out
    }
}

/// A parsed module manifest.
#[derive(Debug, Clone, Default)]
pub struct ModFile {
    /// Label used in diff headers, usually the file path.
    pub name: String,
    pub module: Option<String>,
    pub go: Option<String>,
    pub toolchain: Option<String>,
    pub godebug: Vec<GoDebug>,
    pub require: Vec<ModuleVersion>,
    pub exclude: Vec<ModuleVersion>,
    pub replace: Vec<Replace>,
    pub retract: Vec<Retract>,
    pub tool: Vec<String>,
    pub ignore: Vec<String>,
}

/// Parses a manifest.
///
/// # Errors
///
/// Fails on malformed directives in either mode, and on unknown directives
/// in strict mode.
pub fn parse(name: &str, content: &str, mode: ParseMode) -> Result<ModFile, GomodError> {
    let mut file = ModFile {
        name: name.to_string(),
        ..ModFile::default()
    };

    let mut block: Option<String> = None;
    for (idx, raw) in content.lines().enumerate() {
        let line = idx + 1;
        let (code, comment) = split_comment(raw);
        let code = code.trim();
        if code.is_empty() {
            continue;
        }

        if let Some(directive) = block.clone() {
            if code == ")" {
                block = None;
                continue;
            }
            file.add_entry(&directive, code, comment, mode, name, line)?;
            continue;
        }

        let Some((directive, rest)) = code.split_once(char::is_whitespace) else {
            return Err(parse_error(name, line, format!("lone token '{code}'")));
        };
        let rest = rest.trim();
        if rest == "(" {
            block = Some(directive.to_string());
            continue;
        }
        file.add_entry(directive, rest, comment, mode, name, line)?;
    }

    if let Some(directive) = block {
        return Err(parse_error(
            name,
            content.lines().count(),
            format!("unclosed '{directive}' block"),
        ));
    }

    Ok(file)
}

impl ModFile {
    fn add_entry(
        &mut self,
        directive: &str,
        rest: &str,
        comment: Option<&str>,
        mode: ParseMode,
        name: &str,
        line: usize,
    ) -> Result<(), GomodError> {
        let tokens = tokenize(rest);
        match directive {
            "module" | "go" | "toolchain" => {
                let [value] = tokens.as_slice() else {
                    return Err(parse_error(
                        name,
                        line,
                        format!("'{directive}' takes exactly one argument"),
                    ));
                };
                let slot = match directive {
                    "module" => &mut self.module,
                    "go" => &mut self.go,
                    _ => &mut self.toolchain,
                };
                *slot = Some(value.clone());
            }
            "godebug" => {
                let [setting] = tokens.as_slice() else {
                    return Err(parse_error(
                        name,
                        line,
                        "'godebug' takes exactly one key=value argument".to_string(),
                    ));
                };
                let Some((key, value)) = setting.split_once('=') else {
                    return Err(parse_error(
                        name,
                        line,
                        format!("'godebug' setting '{setting}' is not key=value"),
                    ));
                };
                self.godebug.push(GoDebug {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
            "require" | "exclude" => {
                let [path, version] = tokens.as_slice() else {
                    return Err(parse_error(
                        name,
                        line,
                        format!("'{directive}' takes a module path and a version"),
                    ));
                };
                let entry = ModuleVersion {
                    path: path.clone(),
                    version: version.clone(),
                };
                if directive == "require" {
                    self.require.push(entry);
                } else {
                    self.exclude.push(entry);
                }
            }
            "replace" => {
                let arrow = tokens.iter().position(|token| token == "=>").ok_or_else(|| {
                    parse_error(name, line, "'replace' is missing '=>'".to_string())
                })?;
                let (old, new) = (&tokens[..arrow], &tokens[arrow + 1..]);
                let split = |side: &[String]| match side {
                    [path] => Some((path.clone(), None)),
                    [path, version] => Some((path.clone(), Some(version.clone()))),
                    _ => None,
                };
                let (Some((old_path, old_version)), Some((new_path, new_version))) =
                    (split(old), split(new))
                else {
                    return Err(parse_error(
                        name,
                        line,
                        "'replace' sides take a path and an optional version".to_string(),
                    ));
                };
                self.replace.push(Replace {
                    old_path,
                    old_version,
                    new_path,
                    new_version,
                });
            }
            "retract" => {
                let rationale = comment.map(ToString::to_string);
                if let Some(interval) = rest.strip_prefix('[') {
                    let Some((low, high)) = interval
                        .strip_suffix(']')
                        .and_then(|inner| inner.split_once(','))
                    else {
                        return Err(parse_error(
                            name,
                            line,
                            "'retract' interval must be [low, high]".to_string(),
                        ));
                    };
                    self.retract.push(Retract {
                        low: low.trim().to_string(),
                        high: high.trim().to_string(),
                        rationale,
                    });
                } else {
                    let [version] = tokens.as_slice() else {
                        return Err(parse_error(
                            name,
                            line,
                            "'retract' takes a version or an interval".to_string(),
                        ));
                    };
                    self.retract.push(Retract {
                        low: version.clone(),
                        high: version.clone(),
                        rationale,
                    });
                }
            }
            "tool" | "ignore" => {
                let [path] = tokens.as_slice() else {
                    return Err(parse_error(
                        name,
                        line,
                        format!("'{directive}' takes exactly one argument"),
                    ));
                };
                if directive == "tool" {
                    self.tool.push(path.clone());
                } else {
                    self.ignore.push(path.clone());
                }
            }
            unknown => {
                if mode == ParseMode::Strict {
                    return Err(parse_error(
                        name,
                        line,
                        format!("unknown directive '{unknown}'"),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn parse_error(file: &str, line: usize, message: String) -> GomodError {
    GomodError::Parse {
        file: file.to_string(),
        line,
        message,
    }
}

/// Splits a line into code and trailing comment.
fn split_comment(line: &str) -> (&str, Option<&str>) {
    match line.split_once("//") {
        Some((code, comment)) => {
            let comment = comment.trim();
            (code, (!comment.is_empty()).then_some(comment))
        }
        None => (line, None),
    }
}

/// Whitespace tokenizer that keeps quoted strings whole and unquotes them.
fn tokenize(code: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in code.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '`' => quote = Some(ch),
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"module github.com/hashicorp/vault

go 1.25.2

toolchain go1.25.2

godebug tlskyber=0

require (
	github.com/hashicorp/go-hclog v1.6.3
	github.com/hashicorp/go-uuid v1.0.3 // indirect
)

require golang.org/x/net v0.30.0

exclude github.com/broken/module v0.1.0

replace github.com/old/module => github.com/new/module v1.2.3

replace github.com/local/module v1.0.0 => ../local

retract v1.12.0 // published with a broken seal migration
retract [v1.10.0, v1.10.2]

tool github.com/bufbuild/buf/cmd/buf
"#;

    #[test]
    fn parses_every_directive_form() {
        let file = parse("go.mod", SAMPLE, ParseMode::Strict).unwrap();
        assert_eq!(file.module.as_deref(), Some("github.com/hashicorp/vault"));
        assert_eq!(file.go.as_deref(), Some("1.25.2"));
        assert_eq!(file.toolchain.as_deref(), Some("go1.25.2"));
        assert_eq!(file.godebug.len(), 1);
        assert_eq!(file.godebug[0].key, "tlskyber");
        assert_eq!(file.godebug[0].value, "0");

        assert_eq!(file.require.len(), 3);
        assert_eq!(file.require[0].path, "github.com/hashicorp/go-hclog");
        assert_eq!(file.require[1].version, "v1.0.3");
        assert_eq!(file.require[2].path, "golang.org/x/net");

        assert_eq!(file.exclude.len(), 1);
        assert_eq!(file.replace.len(), 2);
        assert_eq!(file.replace[0].old_version, None);
        assert_eq!(
            file.replace[0].new_version.as_deref(),
            Some("v1.2.3")
        );
        assert_eq!(file.replace[1].old_version.as_deref(), Some("v1.0.0"));
        assert_eq!(file.replace[1].new_path, "../local");
        assert_eq!(file.replace[1].new_version, None);

        assert_eq!(file.retract.len(), 2);
        assert_eq!(file.retract[0].low, "v1.12.0");
        assert_eq!(file.retract[0].high, "v1.12.0");
        assert_eq!(
            file.retract[0].rationale.as_deref(),
            Some("published with a broken seal migration")
        );
        assert_eq!(file.retract[1].low, "v1.10.0");
        assert_eq!(file.retract[1].high, "v1.10.2");

        assert_eq!(file.tool, ["github.com/bufbuild/buf/cmd/buf"]);
    }

    #[test]
    fn strict_rejects_unknown_directives() {
        let content = "module example.com/m\nfrobnicate all\n";
        assert!(parse("go.mod", content, ParseMode::Lax).is_ok());
        let err = parse("go.mod", content, ParseMode::Strict).unwrap_err();
        assert!(err.to_string().contains("unknown directive 'frobnicate'"));
        assert!(err.to_string().contains("go.mod:2"));
    }

    #[test]
    fn malformed_directives_fail_in_both_modes() {
        let content = "require github.com/only/path\n";
        assert!(parse("go.mod", content, ParseMode::Lax).is_err());
        assert!(parse("go.mod", content, ParseMode::Strict).is_err());
    }

    #[test]
    fn unclosed_block_is_an_error() {
        let content = "require (\n\tgithub.com/a/b v1.0.0\n";
        assert!(parse("go.mod", content, ParseMode::Lax).is_err());
    }

    #[test]
    fn canonical_texts_are_directive_qualified() {
        let file = parse("go.mod", SAMPLE, ParseMode::Strict).unwrap();
        assert_eq!(
            file.require[0].text("require"),
            "require github.com/hashicorp/go-hclog v1.6.3"
        );
        assert_eq!(
            file.replace[0].text(),
            "replace github.com/old/module => github.com/new/module v1.2.3"
        );
        assert_eq!(
            file.retract[1].text(),
            "retract [v1.10.0, v1.10.2]"
        );
        assert_eq!(file.godebug[0].text(), "godebug tlskyber=0");
    }
}
