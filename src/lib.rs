//! Keeps a SQLite music catalog in step with the archive directory it
//! describes.
//!
//! A run walks one subtree of the archive and, for every `.mp3` file:
//! - creates a track row if the catalog has none for its path,
//! - rewrites the row if the file's modification time changed,
//! - leaves it alone otherwise.
//!
//! Artist, album and genre rows are looked up by name and created on first
//! use. When the walk is done, the `track_cnt` of every artist, album and genre
//! is recomputed in a single transaction.
//!
//! ## Modules
//!
//! - [`path_codec`] - Stored (percent-encoded, root-relative) path format
//! - [`db`] - Catalog tables and queries
//! - [`entity_cache`] - Per-run artist/album/genre resolution
//! - [`scanner`] - Media file discovery
//! - [`tags`] - Tag reading
//! - [`reconciler`] - Create / update / no-op decisions
//! - [`aggregate`] - Track count recalculation
//! - [`sync`] - One complete run
//!
//! ### Supporting Modules
//!
//! - [`cli`] - Command-line arguments
//! - [`config`] - Resolved run options and default catalog location
//! - [`error`] - Engine error type
//!
//! ## Example
//!
//! ```no_run
//! use catalog_sync::{db::Catalog, sync, tags::LoftyTagReader};
//! use std::path::Path;
//!
//! let mut catalog = Catalog::open(Path::new("catalog.db"))?;
//! catalog.create_schema()?;
//!
//! let root = Path::new("/srv/music");
//! let summary = sync::run(&mut catalog, root, &root.join("Jazz"), &LoftyTagReader::new())?;
//! println!("{summary}");
//! # Ok::<(), catalog_sync::SyncError>(())
//! ```
//!
//! ## Error Handling
//!
//! Engine functions return [`SyncError`]. Duplicate dimension names and a
//! missing "N/A" row are integrity violations
//! ([`SyncError::is_integrity_violation`]); the binary exits with code -2 for
//! them. Paths outside the archive root are skipped, everything else aborts
//! the run.

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod db;
pub mod entity_cache;
pub mod error;
pub mod path_codec;
pub mod reconciler;
pub mod scanner;
pub mod summary;
pub mod sync;
pub mod tags;

pub use error::SyncError;
pub use summary::RunSummary;
