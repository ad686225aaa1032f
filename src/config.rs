//! # Configuration Module
//!
//! Turns parsed [`Args`] into a [`RunConfig`]: absolute, normalized archive
//! and scan roots, and the location of the SQLite catalog.
//!
//! ## Data Storage
//!
//! Without `--dbname` the catalog lives in the platform data directory:
//! - Linux: `~/.local/share/catalog-sync/catalog.db`
//! - macOS: `~/Library/Application Support/catalog-sync/catalog.db`
//! - Windows: `%APPDATA%\catalog-sync\catalog.db`

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use log::warn;
use path_absolutize::Absolutize;
use serde::{Deserialize, Serialize};

use crate::cli::Args;

/// Returns the default catalog path, creating its directory if needed.
///
/// # Errors
///
/// Fails if the platform data directory cannot be determined or the
/// `catalog-sync` subdirectory cannot be created.
pub fn default_db_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow!("Could not determine system data directory. Pass --dbname to choose a catalog file.")
    })?;

    let app_dir = data_dir.join("catalog-sync");
    fs::create_dir_all(&app_dir).with_context(|| {
        format!(
            "Failed to create data directory at {}. Please check file permissions.",
            app_dir.display()
        )
    })?;

    Ok(app_dir.join("catalog.db"))
}

fn absolute(path: &Path) -> Result<PathBuf> {
    Ok(path
        .absolutize()
        .with_context(|| format!("Cannot resolve {} to an absolute path", path.display()))?
        .into_owned())
}

/// Resolved options for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    pub archive_root: PathBuf,
    /// `archive_root` joined with the requested subdirectory
    pub scan_root: PathBuf,
    pub db_path: PathBuf,
    pub verbose: bool,
    pub create_schema: bool,
    pub list_only: bool,
    pub json: bool,
    pub db_user: Option<String>,
    #[serde(skip_serializing, default)]
    pub db_pass: Option<String>,
    pub db_host: Option<String>,
}

impl RunConfig {
    /// Resolve `args`, falling back to [`default_db_path`] when no catalog
    /// path was given.
    pub fn from_args(args: Args) -> Result<Self> {
        let db_path = match &args.dbname {
            Some(path) => absolute(path)?,
            None => default_db_path()?,
        };
        Self::with_db_path(args, db_path)
    }

    /// Resolve `args` against an explicit catalog path.
    pub fn with_db_path(args: Args, db_path: PathBuf) -> Result<Self> {
        let archive_root = absolute(&args.archive_root)?;
        let scan_root = absolute(&archive_root.join(&args.subdirectory))?;

        if !scan_root.starts_with(&archive_root) {
            warn!(
                "{} is outside the archive root {}; its files will be skipped",
                scan_root.display(),
                archive_root.display()
            );
        }

        let config = Self {
            archive_root,
            scan_root,
            db_path,
            verbose: args.verbose,
            create_schema: args.create_schema,
            list_only: args.list_only,
            json: args.json,
            db_user: args.dbuser,
            db_pass: args.dbpass,
            db_host: args.dbhost,
        };

        for option in config.ignored_options() {
            warn!("{option} has no effect with the SQLite catalog");
        }
        Ok(config)
    }

    /// Connection options that were given but that SQLite has no use for
    pub fn ignored_options(&self) -> Vec<&'static str> {
        [
            ("--dbuser", self.db_user.is_some()),
            ("--dbpass", self.db_pass.is_some()),
            ("--dbhost", self.db_host.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, given)| given.then_some(name))
        .collect()
    }
}
