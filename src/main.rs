//! # catalog-sync
//!
//! Reconciles a music archive directory with its SQLite catalog.
//!
//! ```bash
//! # Whole archive
//! catalog-sync /srv/music
//!
//! # One artist, logging every decision
//! catalog-sync /srv/music "Miles Davis" --verbose
//!
//! # Fresh catalog file
//! catalog-sync /srv/music --dbname ./catalog.db --create-schema
//!
//! # Just list what would be scanned
//! catalog-sync /srv/music incoming --list-only
//! ```
//!
//! ## Exit codes
//!
//! - `0`: success, or help/version shown
//! - `2`: invalid command line
//! - `-2`: the catalog has duplicate artist/album/genre names or lacks a
//!   sentinel row
//! - `1`: any other failure

use anyhow::{Context, Result};
use log::{debug, info};

use catalog_sync::cli::{self, ParsedArgs};
use catalog_sync::config::RunConfig;
use catalog_sync::db::Catalog;
use catalog_sync::tags::LoftyTagReader;
use catalog_sync::{scanner, sync, RunSummary, SyncError};

/// Exit code for catalog integrity violations
const INTEGRITY_EXIT_CODE: i32 = -2;

/// Initialise `env_logger`. `RUST_LOG` overrides the default level, which is
/// `info` with `--verbose` and `warn` without.
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

/// Exit code for errors that must not surface as a plain failure
fn fatal_exit_code(err: &anyhow::Error) -> Option<i32> {
    err.downcast_ref::<SyncError>()
        .filter(|err| err.is_integrity_violation())
        .map(|_| INTEGRITY_EXIT_CODE)
}

/// Open the catalog, run, and close the catalog again on every path.
fn execute(config: &RunConfig) -> Result<RunSummary> {
    let mut catalog = Catalog::open(&config.db_path)
        .with_context(|| format!("Failed to open catalog {}", config.db_path.display()))?;

    if config.create_schema {
        catalog
            .create_schema()
            .context("Failed to create catalog tables")?;
    }

    let summary = sync::run(
        &mut catalog,
        &config.archive_root,
        &config.scan_root,
        &LoftyTagReader::new(),
    )?;

    debug!("Closing catalog {}", config.db_path.display());
    Ok(summary)
}

fn list_only(config: &RunConfig) -> Result<()> {
    for path in scanner::walk(&config.scan_root) {
        println!("{}", path?.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = match cli::parse_args(std::env::args_os()) {
        ParsedArgs::Run(args) => args,
        other => {
            match &other {
                ParsedArgs::Display(text) => print!("{text}"),
                ParsedArgs::Invalid(text) => eprint!("{text}"),
                ParsedArgs::Run(_) => {}
            }
            std::process::exit(other.exit_code());
        }
    };

    init_logging(args.verbose);
    let config = RunConfig::from_args(args)?;
    debug!("Run configuration: {config:?}");

    if config.list_only {
        return list_only(&config);
    }

    info!(
        "Reconciling {} against {}",
        config.scan_root.display(),
        config.db_path.display()
    );

    match execute(&config) {
        Ok(summary) => {
            if config.json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{summary}");
            }
            Ok(())
        }
        Err(err) => match fatal_exit_code(&err) {
            Some(code) => {
                eprintln!("Fatal: {err}");
                eprintln!("The catalog needs manual repair before it can be synced again.");
                std::process::exit(code);
            }
            None => Err(err),
        },
    }
}
