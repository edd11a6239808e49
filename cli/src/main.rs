//! CLI for the release-pipeline automation.
//!
//! One executable with a subcommand per workflow: `backport`, `copy` and
//! `close-origin` drive pull request propagation between the community and
//! enterprise repositories, and `gomod diff` compares module manifests.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use release_pipeline::github::{CloseOriginReq, CreateBackportReq, CreateCopyReq, OctocrabHost};
use release_pipeline::gomod::{DiffModulesReq, DiffOptions, ParseMode};
use release_pipeline::{FileGroup, FileGroups, RefScheme};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Release pipeline tooling for the community/enterprise repository split.
#[derive(Parser, Debug)]
#[command(name = "pipeline", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Backport a merged pull request onto its target branches.
    Backport(BackportArgs),
    /// Copy a community pull request into the enterprise repository.
    Copy(CopyArgs),
    /// Close the origin of a merged copy pull request.
    CloseOrigin(CloseOriginArgs),
    /// Go module manifest tools.
    Gomod {
        #[command(subcommand)]
        command: GomodCommands,
    },
}

#[derive(Args, Debug)]
struct BackportArgs {
    /// GitHub owner of the repository.
    #[arg(long, default_value = "hashicorp")]
    owner: String,

    /// Repository to backport within.
    #[arg(long, default_value = "vault-enterprise")]
    repo: String,

    /// Number of the merged pull request.
    #[arg(long)]
    pull_number: u64,

    /// Remote name of the repository.
    #[arg(long, default_value = "origin")]
    base_origin: String,

    /// Existing checkout to reuse instead of a temporary clone.
    #[arg(long)]
    repo_dir: Option<PathBuf>,

    /// Explicit path to the versions configuration.
    #[arg(long)]
    versions_config: Option<PathBuf>,

    /// How many parent directories to search for the versions configuration.
    #[arg(long, default_value_t = 3)]
    versions_search_depth: usize,

    /// File groups excluded from community branches.
    #[arg(long, value_delimiter = ',', default_value = "enterprise")]
    ce_exclude: Vec<String>,

    /// File groups allowed onto inactive community branches.
    #[arg(long, value_delimiter = ',', default_value = "changelog,docs,pipeline")]
    ce_allow_inactive: Vec<String>,

    /// Prefix of community branches.
    #[arg(long, default_value = "ce")]
    ce_branch_prefix: String,

    /// Prefix of enterprise branches, for sandbox repositories.
    #[arg(long)]
    ent_branch_prefix: Option<String>,

    /// Prefix of backport labels.
    #[arg(long, default_value = "backport")]
    backport_label_prefix: String,

    /// GitHub access token.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,

    /// Emit the result as JSON instead of the status comment markdown.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct CopyArgs {
    /// GitHub owner of the community repository.
    #[arg(long, default_value = "hashicorp")]
    origin_owner: String,

    /// Community repository the pull request lives in.
    #[arg(long, default_value = "vault")]
    origin_repo: String,

    /// GitHub owner of the enterprise repository.
    #[arg(long, default_value = "hashicorp")]
    owner: String,

    /// Enterprise repository receiving the copy.
    #[arg(long, default_value = "vault-enterprise")]
    repo: String,

    /// Number of the community pull request.
    #[arg(long)]
    pull_number: u64,

    /// Remote name of the enterprise repository.
    #[arg(long, default_value = "origin")]
    base_origin: String,

    /// Remote name added for the community repository.
    #[arg(long, default_value = "ce")]
    origin_remote: String,

    /// Existing checkout to reuse instead of a temporary clone.
    #[arg(long)]
    repo_dir: Option<PathBuf>,

    /// Prefix of community branches.
    #[arg(long, default_value = "ce")]
    ce_branch_prefix: String,

    /// Prefix of enterprise branches, for sandbox repositories.
    #[arg(long)]
    ent_branch_prefix: Option<String>,

    /// GitHub access token.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,

    /// Emit the result as JSON instead of the status comment markdown.
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct CloseOriginArgs {
    /// GitHub owner of the enterprise repository.
    #[arg(long, default_value = "hashicorp")]
    owner: String,

    /// Enterprise repository the copy merged into.
    #[arg(long, default_value = "vault-enterprise")]
    repo: String,

    /// Number of the merged copy pull request.
    #[arg(long)]
    pull_number: u64,

    /// GitHub access token.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: String,
}

#[derive(Subcommand, Debug)]
enum GomodCommands {
    /// Diff two module manifests directive by directive.
    Diff(GomodDiffArgs),
}

#[derive(Args, Debug)]
struct GomodDiffArgs {
    /// First manifest.
    a: PathBuf,

    /// Second manifest.
    b: PathBuf,

    /// Reject unknown directives while parsing.
    #[arg(long)]
    strict_parse: bool,

    /// Also report require/exclude/replace/retract entries present on one
    /// side only.
    #[arg(long)]
    strict: bool,

    /// Directives to skip, e.g. --skip require --skip toolchain.
    #[arg(long)]
    skip: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Commands::Backport(args) => run_backport(args).await,
        Commands::Copy(args) => run_copy(args).await,
        Commands::CloseOrigin(args) => run_close_origin(args).await,
        Commands::Gomod {
            command: GomodCommands::Diff(args),
        } => run_gomod_diff(&args),
    }
}

/// Initializes tracing with environment filter support.
///
/// Sets up the global tracing subscriber with:
/// - Compact log formatting (single-line output)
/// - Log level filtering via `RUST_LOG` env var (defaults to "info")
fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

async fn run_backport(args: BackportArgs) -> ExitCode {
    let host = match OctocrabHost::new(args.token.clone()) {
        Ok(host) => host,
        Err(e) => {
            error!(error = %e, "building GitHub client");
            return ExitCode::from(2);
        }
    };

    let (ce_exclude, ce_allow_inactive) =
        match (parse_groups(&args.ce_exclude), parse_groups(&args.ce_allow_inactive)) {
            (Ok(exclude), Ok(allow)) => (exclude, allow),
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "parsing file groups");
                return ExitCode::from(2);
            }
        };

    let mut req = CreateBackportReq::new(args.owner, args.repo, args.pull_number, args.token);
    req.base_origin = args.base_origin;
    req.repo_dir = args.repo_dir;
    req.versions_config_path = args.versions_config;
    req.versions_search_depth = args.versions_search_depth;
    req.ce_exclude = ce_exclude;
    req.ce_allow_inactive = ce_allow_inactive;
    req.refs = RefScheme {
        ce_branch_prefix: args.ce_branch_prefix,
        ent_branch_prefix: args.ent_branch_prefix,
        backport_label_prefix: args.backport_label_prefix,
    };

    let res = req.run(&host).await;
    if args.json {
        match res.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!(error = %e, "serializing result");
                return ExitCode::from(2);
            }
        }
    } else {
        println!("{}", res.comment_body("Backport"));
    }

    match res.err() {
        Some(err) => {
            error!(error = %err, "backport finished with errors");
            ExitCode::from(1)
        }
        None => ExitCode::from(0),
    }
}

async fn run_copy(args: CopyArgs) -> ExitCode {
    let host = match OctocrabHost::new(args.token.clone()) {
        Ok(host) => host,
        Err(e) => {
            error!(error = %e, "building GitHub client");
            return ExitCode::from(2);
        }
    };

    let mut req = CreateCopyReq::new(
        args.origin_owner,
        args.origin_repo,
        args.owner,
        args.repo,
        args.pull_number,
        args.token,
    );
    req.base_origin = args.base_origin;
    req.origin_remote = args.origin_remote;
    req.repo_dir = args.repo_dir;
    req.refs = RefScheme {
        ce_branch_prefix: args.ce_branch_prefix,
        ent_branch_prefix: args.ent_branch_prefix,
        ..RefScheme::default()
    };

    let res = req.run(&host).await;
    if args.json {
        match res.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => {
                error!(error = %e, "serializing result");
                return ExitCode::from(2);
            }
        }
    } else {
        println!("{}", res.comment_body("Copy"));
    }

    match res.err() {
        Some(err) => {
            error!(error = %err, "copy finished with errors");
            ExitCode::from(1)
        }
        None => ExitCode::from(0),
    }
}

async fn run_close_origin(args: CloseOriginArgs) -> ExitCode {
    let host = match OctocrabHost::new(args.token) {
        Ok(host) => host,
        Err(e) => {
            error!(error = %e, "building GitHub client");
            return ExitCode::from(2);
        }
    };

    let req = CloseOriginReq {
        owner: args.owner,
        repo: args.repo,
        pull_number: args.pull_number,
    };
    let res = req.run(&host).await;

    match res.to_json() {
        Ok(json) => println!("{json}"),
        Err(e) => {
            error!(error = %e, "serializing result");
            return ExitCode::from(2);
        }
    }

    match &res.error {
        Some(err) => {
            error!(error = %err, "close-origin finished with errors");
            ExitCode::from(1)
        }
        None => ExitCode::from(0),
    }
}

fn run_gomod_diff(args: &GomodDiffArgs) -> ExitCode {
    let mut opts = DiffOptions::default();
    if args.strict {
        opts = opts.all_strict();
    }
    for skip in &args.skip {
        match skip.as_str() {
            "module" => opts.module = false,
            "go" => opts.go = false,
            "toolchain" => opts.toolchain = false,
            "godebug" => opts.godebug = false,
            "require" => opts.require = false,
            "exclude" => opts.exclude = false,
            "replace" => opts.replace = false,
            "retract" => opts.retract = false,
            "tool" => opts.tool = false,
            "ignore" => opts.ignore = false,
            other => {
                error!(directive = other, "unknown directive in --skip");
                return ExitCode::from(2);
            }
        }
    }

    let req = DiffModulesReq {
        a_path: args.a.clone(),
        b_path: args.b.clone(),
        mode: if args.strict_parse {
            ParseMode::Strict
        } else {
            ParseMode::Lax
        },
        opts,
    };

    match req.run() {
        Ok(diffs) if diffs.is_empty() => ExitCode::from(0),
        Ok(diffs) => {
            for diff in &diffs {
                print!("{}", diff.diff);
            }
            ExitCode::from(1)
        }
        Err(e) => {
            error!(error = %e, "diffing module manifests");
            ExitCode::from(2)
        }
    }
}

/// Parses comma-separated file group names.
fn parse_groups(names: &[String]) -> Result<FileGroups, String> {
    names
        .iter()
        .map(|name| {
            FileGroup::parse(name).ok_or_else(|| format!("unknown file group '{name}'"))
        })
        .collect::<Result<FileGroups, _>>()
}
