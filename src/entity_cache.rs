//! # Entity Cache
//!
//! Run-scoped resolve-or-create for the three dimension tables. A name is
//! looked up in the catalog at most once per run; afterwards it is served from
//! memory. Created rows are counted for the run summary.
//!
//! The read-then-insert sequence is not atomic with respect to other writers
//! of the same catalog. Two concurrent runs can both insert a name, and the
//! next lookup of that name then fails with [`SyncError::AmbiguousEntity`].

use std::collections::HashMap;
use std::fmt;

use log::{debug, info};

use crate::db::Catalog;
use crate::error::{Result, SyncError};

/// Name stored for a dimension value that is missing from a file's tags.
/// The row must already exist in each dimension table.
pub const SENTINEL_NAME: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionKind {
    Artist,
    Album,
    Genre,
}

impl DimensionKind {
    pub const ALL: [DimensionKind; 3] = [DimensionKind::Artist, DimensionKind::Album, DimensionKind::Genre];

    /// Dimension table name
    pub fn table(self) -> &'static str {
        match self {
            DimensionKind::Artist => "artists",
            DimensionKind::Album => "albums",
            DimensionKind::Genre => "genres",
        }
    }

    /// Column of `tracks` referencing this dimension
    pub fn foreign_key(self) -> &'static str {
        match self {
            DimensionKind::Artist => "ar_id",
            DimensionKind::Album => "al_id",
            DimensionKind::Genre => "ge_id",
        }
    }
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DimensionKind::Artist => "artist",
            DimensionKind::Album => "album",
            DimensionKind::Genre => "genre",
        })
    }
}

#[derive(Debug, Default)]
struct DimensionCache {
    by_name: HashMap<String, i64>,
    by_id: HashMap<i64, String>,
    created: usize,
}

impl DimensionCache {
    fn remember(&mut self, id: i64, name: &str) {
        self.by_name.insert(name.to_string(), id);
        self.by_id.insert(id, name.to_string());
    }
}

/// Per-run memo of dimension name → id, one table per [`DimensionKind`].
#[derive(Debug, Default)]
pub struct EntityCache {
    artists: DimensionCache,
    albums: DimensionCache,
    genres: DimensionCache,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, kind: DimensionKind) -> &DimensionCache {
        match kind {
            DimensionKind::Artist => &self.artists,
            DimensionKind::Album => &self.albums,
            DimensionKind::Genre => &self.genres,
        }
    }

    fn slot_mut(&mut self, kind: DimensionKind) -> &mut DimensionCache {
        match kind {
            DimensionKind::Artist => &mut self.artists,
            DimensionKind::Album => &mut self.albums,
            DimensionKind::Genre => &mut self.genres,
        }
    }

    /// Id of the `kind` row called `name`, inserting it if the catalog has
    /// none. Blank names resolve to the [`SENTINEL_NAME`] row, which is never
    /// created here.
    ///
    /// # Errors
    ///
    /// - [`SyncError::MissingSentinel`] if a blank name is resolved and the
    ///   sentinel row does not exist
    /// - [`SyncError::AmbiguousEntity`] if several rows carry `name`
    /// - [`SyncError::Store`] on any query failure
    pub fn resolve(&mut self, catalog: &Catalog, kind: DimensionKind, name: &str) -> Result<i64> {
        let name = match name.trim() {
            "" => SENTINEL_NAME,
            trimmed => trimmed,
        };

        let cache = self.slot_mut(kind);
        if let Some(&id) = cache.by_name.get(name) {
            return Ok(id);
        }

        let ids = catalog.dimension_ids_named(kind, name)?;
        let id = match ids.as_slice() {
            [] if name == SENTINEL_NAME => return Err(SyncError::MissingSentinel { kind }),
            [] => {
                catalog.insert_dimension(kind, name)?;
                let id = single_row(kind, name, &catalog.dimension_ids_named(kind, name)?)?;
                cache.created += 1;
                info!("New {kind}: {name}");
                id
            }
            found => single_row(kind, name, found)?,
        };

        debug!("Resolved {kind} {name:?} to id {id}");
        cache.remember(id, name);
        Ok(id)
    }

    /// Number of `kind` rows inserted during this run
    pub fn created(&self, kind: DimensionKind) -> usize {
        self.slot(kind).created
    }

    /// Name behind an id resolved earlier in this run
    pub fn name_of(&self, kind: DimensionKind, id: i64) -> Option<&str> {
        self.slot(kind).by_id.get(&id).map(String::as_str)
    }
}

fn single_row(kind: DimensionKind, name: &str, ids: &[i64]) -> Result<i64> {
    match ids {
        [id] => Ok(*id),
        [] => Err(SyncError::Store(rusqlite::Error::QueryReturnedNoRows)),
        many => Err(SyncError::AmbiguousEntity {
            kind,
            name: name.to_string(),
            count: many.len(),
        }),
    }
}
