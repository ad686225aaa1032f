//! # Sync Driver
//!
//! One run over one subtree: snapshot, walk and reconcile, then recount.
//! Phase banners go to stdout; per-file decisions are logged at `info`.

use std::path::Path;

use log::info;

use crate::aggregate;
use crate::db::Catalog;
use crate::error::Result;
use crate::reconciler::Reconciler;
use crate::scanner;
use crate::summary::RunSummary;
use crate::tags::TagReader;

/// Reconcile every media file below `scan_root` with the catalog, then
/// recompute the track counts of the whole catalog.
///
/// `archive_root` and `scan_root` must be absolute and normalized, with
/// `scan_root` inside `archive_root`; [`crate::config::RunConfig`] takes
/// care of that.
///
/// # Errors
///
/// The first error that is not a skippable path aborts the run. Writes made
/// before it stay in the catalog, so running again resumes the work.
pub fn run(
    catalog: &mut Catalog,
    archive_root: &Path,
    scan_root: &Path,
    tags: &dyn TagReader,
) -> Result<RunSummary> {
    println!("Loading catalog snapshot...");
    let summary = {
        let mut reconciler = Reconciler::new(catalog, tags, archive_root)?;
        info!("{} tracks already catalogued", reconciler.snapshot().len());

        println!("Scanning {}...", scan_root.display());
        reconciler.run(scanner::walk(scan_root))?;
        reconciler.finish()
    };

    println!("Recalculating track counts...");
    aggregate::recalculate(catalog)?;

    Ok(summary)
}
