//! repowatch: track GitHub releases and keep local clones current.
//!
//! # Usage
//!
//! ```text
//! repowatch repo add <owner/name | url>... [--source folder|manual]
//! repowatch repo list [--json]
//! repowatch repo remove <id | owner/name>
//! repowatch fetch [--json]
//! repowatch releases [--json]
//! repowatch commits [--json]
//! repowatch last-commit <owner/name>
//! repowatch token set <TOKEN> | show | remove
//! repowatch rate-limit
//! repowatch export <PATH>
//! repowatch import <PATH>
//! repowatch folder set <PATH> | show
//! repowatch update [REPO...] [--folder <PATH>] [--jobs <K>]
//! ```

mod commands;

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    fetch::FetchArgs,
    folder::FolderCommand,
    records::{CommitsArgs, ReleasesArgs},
    remote::{LastCommitArgs, RateLimitArgs},
    repo::RepoCommand,
    token::TokenCommand,
    transfer::{ExportArgs, ImportArgs},
    update::UpdateArgs,
};
use repowatch_core::RepoSource;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "repowatch",
    version,
    about = "Track GitHub releases and keep local clones up to date",
    long_about = None,
)]
struct Cli {
    /// Log debug output to stderr.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage tracked repositories.
    Repo {
        #[command(subcommand)]
        command: RepoCommand,
    },

    /// Fetch latest releases and commits for every tracked repository.
    Fetch(FetchArgs),

    /// Show stored releases, newest first.
    Releases(ReleasesArgs),

    /// Show stored default-branch commits, newest first.
    Commits(CommitsArgs),

    /// Look up the latest default-branch commit of any repository.
    LastCommit(LastCommitArgs),

    /// Manage the GitHub token.
    Token {
        #[command(subcommand)]
        command: TokenCommand,
    },

    /// Show the GitHub API quota.
    RateLimit(RateLimitArgs),

    /// Write the whole catalog to a file.
    Export(ExportArgs),

    /// Merge an exported catalog into this one.
    Import(ImportArgs),

    /// Manage the folder that holds local clones.
    Folder {
        #[command(subcommand)]
        command: FolderCommand,
    },

    /// Clone or pull local working copies of tracked repositories.
    Update(UpdateArgs),
}

// ---------------------------------------------------------------------------
// Shared RepoSource argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse `RepoSource` from CLI args.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceArg(pub RepoSource);

impl FromStr for SourceArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "manual" => Ok(Self(RepoSource::Manual)),
            "folder" => Ok(Self(RepoSource::Folder)),
            other => Err(format!(
                "unknown source '{other}'; expected: manual, folder"
            )),
        }
    }
}

impl fmt::Display for SourceArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<SourceArg> for RepoSource {
    fn from(s: SourceArg) -> Self {
        s.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Repo { command } => commands::repo::run(command),
        Commands::Fetch(args) => args.run(),
        Commands::Releases(args) => args.run(),
        Commands::Commits(args) => args.run(),
        Commands::LastCommit(args) => args.run(),
        Commands::Token { command } => commands::token::run(command),
        Commands::RateLimit(args) => args.run(),
        Commands::Export(args) => args.run(),
        Commands::Import(args) => args.run(),
        Commands::Folder { command } => commands::folder::run(command),
        Commands::Update(args) => args.run(),
    }
}

/// `RUST_LOG` wins; otherwise `warn`, or `debug` with `--verbose`.
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
