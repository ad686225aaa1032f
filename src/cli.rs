//! # Command-Line Interface Module
//!
//! Argument definitions for `catalog-sync`. Parsing never exits the process;
//! [`parse_args`] returns a [`ParsedArgs`] and the binary decides what to
//! print and which exit code to use.
//!
//! ## Examples
//!
//! ```bash
//! catalog-sync /srv/music
//! catalog-sync /srv/music "Miles Davis" --verbose
//! catalog-sync /srv/music incoming --dbname ~/catalog.db --create-schema
//! ```

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

/// Reconcile a music archive directory with its SQLite catalog.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "catalog-sync")]
#[command(version)]
pub struct Args {
    /// Root of the music archive
    ///
    /// Track locations are stored relative to this directory.
    pub archive_root: PathBuf,

    /// Part of the archive to scan, relative to the archive root
    #[arg(default_value = ".")]
    pub subdirectory: PathBuf,

    /// Log every create, update and unchanged decision
    #[arg(short, long)]
    pub verbose: bool,

    /// Path of the SQLite catalog
    ///
    /// Defaults to `catalog.db` in the platform data directory.
    #[arg(long, env = "CATALOG_DBNAME", value_name = "PATH")]
    pub dbname: Option<PathBuf>,

    /// Database user (not used by the SQLite backend)
    #[arg(long, env = "CATALOG_DBUSER")]
    pub dbuser: Option<String>,

    /// Database password (not used by the SQLite backend)
    #[arg(long, env = "CATALOG_DBPASS", hide_env_values = true)]
    pub dbpass: Option<String>,

    /// Database host (not used by the SQLite backend)
    #[arg(long, env = "CATALOG_DBHOST")]
    pub dbhost: Option<String>,

    /// Create missing catalog tables and sentinel rows before scanning
    #[arg(long)]
    pub create_schema: bool,

    /// Only print the media files that would be reconciled
    #[arg(long, conflicts_with = "create_schema")]
    pub list_only: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// What the command line asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedArgs {
    /// Options for a run
    Run(Args),
    /// Help or version text; print to stdout and exit successfully
    Display(String),
    /// Usage error; print to stderr and exit with failure
    Invalid(String),
}

impl ParsedArgs {
    /// Exit code for the non-run outcomes
    pub fn exit_code(&self) -> i32 {
        match self {
            ParsedArgs::Run(_) | ParsedArgs::Display(_) => 0,
            ParsedArgs::Invalid(_) => 2,
        }
    }
}

pub fn parse_args<I, T>(args: I) -> ParsedArgs
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Args::try_parse_from(args) {
        Ok(args) => ParsedArgs::Run(args),
        Err(err) if err.use_stderr() => ParsedArgs::Invalid(err.render().to_string()),
        Err(err) => ParsedArgs::Display(err.render().to_string()),
    }
}
