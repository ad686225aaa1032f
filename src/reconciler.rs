//! # Reconciler
//!
//! Decides, for each media file the scanner yields, whether the catalog needs
//! a new track row, an updated one, or nothing at all:
//!
//! | catalog row for the path      | action  |
//! |-------------------------------|---------|
//! | none                          | create  |
//! | stored `mtime` == file mtime  | no-op   |
//! | stored `mtime` != file mtime  | update  |
//!
//! Existing rows are loaded once into a [`Snapshot`] keyed by absolute path,
//! so each decision is a single map lookup. Writes go straight to the catalog
//! row by row; there is no run-wide transaction.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};

use crate::db::{Catalog, Track};
use crate::entity_cache::{DimensionKind, EntityCache};
use crate::error::{Result, SyncError};
use crate::path_codec;
use crate::summary::RunSummary;
use crate::tags::{TagReader, TrackTags};

/// Outcome for one visited path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Created,
    Updated,
    Unchanged,
    /// Path outside the archive root
    Skipped,
}

/// Every track row in the catalog, keyed by its decoded absolute path.
#[derive(Debug, Default)]
pub struct Snapshot {
    by_path: HashMap<PathBuf, Track>,
}

impl Snapshot {
    /// Load the whole fact table. Rows whose location cannot be decoded are
    /// left out with a warning.
    pub fn load(catalog: &Catalog, archive_root: &Path) -> Result<Self> {
        let mut by_path = HashMap::new();
        for track in catalog.load_tracks()? {
            match path_codec::to_readable(&track.location, archive_root) {
                Ok(path) => {
                    if let Some(previous) = by_path.insert(path, track) {
                        warn!("Duplicate location {:?} (track {})", previous.location, previous.id);
                    }
                }
                Err(err) => warn!("Ignoring track {}: {err}", track.id),
            }
        }
        debug!("Snapshot holds {} tracks", by_path.len());
        Ok(Self { by_path })
    }

    pub fn get(&self, path: &Path) -> Option<&Track> {
        self.by_path.get(path)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    fn insert(&mut self, path: &Path, track: Track) {
        self.by_path.insert(path.to_path_buf(), track);
    }
}

#[derive(Debug, Default)]
struct TrackCounters {
    created: usize,
    updated: usize,
    existing: usize,
    skipped: usize,
}

/// Drives one run's create/update decisions.
pub struct Reconciler<'a> {
    catalog: &'a Catalog,
    tags: &'a dyn TagReader,
    archive_root: &'a Path,
    snapshot: Snapshot,
    entities: EntityCache,
    counters: TrackCounters,
}

impl<'a> Reconciler<'a> {
    /// Build the snapshot and an empty entity cache for a new run.
    pub fn new(catalog: &'a Catalog, tags: &'a dyn TagReader, archive_root: &'a Path) -> Result<Self> {
        Ok(Self {
            catalog,
            tags,
            archive_root,
            snapshot: Snapshot::load(catalog, archive_root)?,
            entities: EntityCache::new(),
            counters: TrackCounters::default(),
        })
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Reconcile every path, stopping at the first error.
    pub fn run<I>(&mut self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = Result<PathBuf>>,
    {
        for path in paths {
            self.reconcile(&path?)?;
        }
        Ok(())
    }

    /// Bring the catalog row for `path` up to date.
    ///
    /// # Errors
    ///
    /// Anything but [`SyncError::InvalidPath`], which is counted and skipped.
    pub fn reconcile(&mut self, path: &Path) -> Result<Decision> {
        let location = match path_codec::to_storable(path, self.archive_root) {
            Ok(location) => location,
            Err(err @ SyncError::InvalidPath { .. }) => {
                warn!("Skipping {}: {err}", path.display());
                self.counters.skipped += 1;
                return Ok(Decision::Skipped);
            }
            Err(err) => return Err(err),
        };

        let metadata = fs::metadata(path).map_err(|source| SyncError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let modified_at = metadata
            .modified()
            .map(unix_seconds)
            .map_err(|source| SyncError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let size = i64::try_from(metadata.len()).unwrap_or(i64::MAX);

        let decision = match self.snapshot.get(path) {
            None => {
                let tags = self.tags.read(path)?;
                let mut track = self.build_track(path, &tags)?;
                track.location = location;
                track.size = size;
                track.modified_at = modified_at;
                track.date = unix_seconds(SystemTime::now());
                track.id = self.catalog.insert_track(&track)?;

                info!("Created track {}: {}", track.id, path.display());
                self.snapshot.insert(path, track);
                self.counters.created += 1;
                Decision::Created
            }
            Some(existing) if existing.modified_at == modified_at => {
                info!("Unchanged: {}", path.display());
                Decision::Unchanged
            }
            Some(existing) => {
                let (id, date, previous_mtime) = (existing.id, existing.date, existing.modified_at);
                let tags = self.tags.read(path)?;
                let mut track = self.build_track(path, &tags)?;
                track.id = id;
                track.date = date;
                track.location = location;
                track.size = size;
                track.modified_at = modified_at;
                self.catalog.update_track(&track)?;

                info!(
                    "Updated track {id} (mtime {previous_mtime} -> {modified_at}): {}",
                    path.display()
                );
                self.snapshot.insert(path, track);
                self.counters.updated += 1;
                Decision::Updated
            }
        };

        self.counters.existing += 1;
        Ok(decision)
    }

    /// Track row with the tag-derived fields filled in and dimension ids
    /// resolved. File-derived fields are left for the caller.
    fn build_track(&mut self, path: &Path, tags: &TrackTags) -> Result<Track> {
        let mut resolve = |kind, value: &Option<String>| {
            self.entities
                .resolve(self.catalog, kind, value.as_deref().unwrap_or_default())
        };
        let artist_id = resolve(DimensionKind::Artist, &tags.artist)?;
        let album_id = resolve(DimensionKind::Album, &tags.album)?;
        let genre_id = resolve(DimensionKind::Genre, &tags.genre)?;

        let name = tags.title.clone().unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        });

        Ok(Track {
            id: 0,
            artist_id,
            album_id,
            genre_id,
            name,
            size: 0,
            duration: i64::try_from(tags.duration_secs).unwrap_or(i64::MAX),
            track_number: tags.track_number,
            year: tags.year,
            date: 0,
            bit_rate: tags.bit_rate,
            sample_rate: tags.sample_rate,
            kind: tags.kind.clone(),
            comment: tags.comment.clone(),
            location: String::new(),
            modified_at: 0,
        })
    }

    /// Counters for this run, consuming the reconciler and its caches.
    pub fn finish(self) -> RunSummary {
        RunSummary {
            new_artists: self.entities.created(DimensionKind::Artist),
            new_albums: self.entities.created(DimensionKind::Album),
            new_genres: self.entities.created(DimensionKind::Genre),
            new_tracks: self.counters.created,
            updated_tracks: self.counters.updated,
            existing_tracks: self.counters.existing,
            skipped_paths: self.counters.skipped,
        }
    }
}

/// Whole seconds relative to the unix epoch, negative before it
pub fn unix_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
        Err(before) => {
            let before = before.duration();
            let whole = i64::try_from(before.as_secs()).unwrap_or(i64::MAX);
            if before.subsec_nanos() > 0 {
                -whole - 1
            } else {
                -whole
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::sample_track;
    use std::cell::Cell;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Tags derived from the file name: "<artist>-<album>-<genre>.mp3"
    #[derive(Default)]
    struct NameTags {
        reads: Cell<usize>,
    }

    impl TagReader for NameTags {
        fn read(&self, path: &Path) -> Result<TrackTags> {
            self.reads.set(self.reads.get() + 1);
            let stem = path.file_stem().unwrap().to_string_lossy().into_owned();
            let mut parts = stem.split('-').map(str::to_string);
            Ok(TrackTags {
                artist: parts.next(),
                album: parts.next(),
                genre: parts.next(),
                duration_secs: 180,
                kind: "MPEG audio file".to_string(),
                ..TrackTags::default()
            })
        }
    }

    fn setup() -> (TempDir, Catalog) {
        let dir = TempDir::new().unwrap();
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.create_schema().unwrap();
        (dir, catalog)
    }

    fn touch(path: &Path) {
        fs::write(path, b"ID3").unwrap();
    }

    #[test]
    fn test_unix_seconds() {
        assert_eq!(unix_seconds(UNIX_EPOCH), 0);
        assert_eq!(unix_seconds(UNIX_EPOCH + Duration::from_millis(1_999)), 1);
        assert_eq!(unix_seconds(UNIX_EPOCH - Duration::from_secs(5)), -5);
        assert_eq!(unix_seconds(UNIX_EPOCH - Duration::from_millis(4_500)), -5);
    }

    #[test]
    fn test_create_then_unchanged() {
        let (dir, catalog) = setup();
        let file = dir.path().join("Can-Tago Mago-Krautrock.mp3");
        touch(&file);
        let tags = NameTags::default();

        let mut reconciler = Reconciler::new(&catalog, &tags, dir.path()).unwrap();
        assert_eq!(reconciler.reconcile(&file).unwrap(), Decision::Created);
        let summary = reconciler.finish();
        assert_eq!(summary.new_tracks, 1);
        assert_eq!(summary.existing_tracks, 1);
        assert_eq!((summary.new_artists, summary.new_albums, summary.new_genres), (1, 1, 1));

        let stored = catalog.load_tracks().unwrap().remove(0);
        assert_eq!(stored.location, "Can-Tago%20Mago-Krautrock.mp3");
        assert_eq!(stored.name, "Can-Tago Mago-Krautrock");
        assert_eq!(stored.size, 3);
        assert_eq!(stored.duration, 180);

        let mut reconciler = Reconciler::new(&catalog, &tags, dir.path()).unwrap();
        assert_eq!(reconciler.snapshot().len(), 1);
        assert_eq!(reconciler.reconcile(&file).unwrap(), Decision::Unchanged);
        let summary = reconciler.finish();
        assert!(summary.is_noop());
        assert_eq!(summary.existing_tracks, 1);
        assert_eq!(tags.reads.get(), 1, "unchanged files are not re-read");
    }

    #[test]
    fn test_mtime_difference_triggers_update() {
        let (dir, catalog) = setup();
        let file = dir.path().join("Low-Things We Lost-Slowcore.mp3");
        touch(&file);
        let tags = NameTags::default();

        Reconciler::new(&catalog, &tags, dir.path())
            .unwrap()
            .reconcile(&file)
            .unwrap();
        let created = catalog.load_tracks().unwrap().remove(0);

        catalog
            .connection()
            .execute("UPDATE tracks SET mtime = mtime - 1, name = 'stale'", [])
            .unwrap();

        let mut reconciler = Reconciler::new(&catalog, &tags, dir.path()).unwrap();
        assert_eq!(reconciler.reconcile(&file).unwrap(), Decision::Updated);
        let summary = reconciler.finish();
        assert_eq!(summary.updated_tracks, 1);
        assert_eq!(summary.new_tracks, 0);
        assert_eq!(summary.existing_tracks, 1);

        let updated = catalog.load_tracks().unwrap().remove(0);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.date, created.date);
        assert_eq!(updated.modified_at, created.modified_at);
        assert_eq!(updated.name, "Low-Things We Lost-Slowcore");
    }

    #[test]
    fn test_update_can_move_track_to_new_artist() {
        let (dir, catalog) = setup();
        let file = dir.path().join("Prince-Purple Rain-Pop.mp3");
        touch(&file);
        let mut track = sample_track("Prince-Purple%20Rain-Pop.mp3");
        track.modified_at = 0;
        catalog.insert_track(&track).unwrap();

        let tags = NameTags::default();
        let mut reconciler = Reconciler::new(&catalog, &tags, dir.path()).unwrap();
        assert_eq!(reconciler.reconcile(&file).unwrap(), Decision::Updated);
        assert_eq!(reconciler.finish().new_artists, 1);

        let prince = catalog.dimension_ids_named(DimensionKind::Artist, "Prince").unwrap();
        assert_eq!(catalog.load_tracks().unwrap()[0].artist_id, prince[0]);
    }

    #[test]
    fn test_missing_tags_use_sentinels() {
        let (dir, catalog) = setup();
        let file = dir.path().join("untitled.mp3");
        touch(&file);

        struct Blank;
        impl TagReader for Blank {
            fn read(&self, _: &Path) -> Result<TrackTags> {
                Ok(TrackTags::default())
            }
        }

        let mut reconciler = Reconciler::new(&catalog, &Blank, dir.path()).unwrap();
        reconciler.reconcile(&file).unwrap();
        let summary = reconciler.finish();
        assert_eq!((summary.new_artists, summary.new_albums, summary.new_genres), (0, 0, 0));

        let track = catalog.load_tracks().unwrap().remove(0);
        for (kind, id) in [
            (DimensionKind::Artist, track.artist_id),
            (DimensionKind::Album, track.album_id),
            (DimensionKind::Genre, track.genre_id),
        ] {
            assert_eq!(catalog.dimension_ids_named(kind, "N/A").unwrap(), vec![id]);
        }
        assert_eq!(track.name, "untitled");
    }

    #[test]
    fn test_path_outside_root_is_skipped() {
        let (dir, catalog) = setup();
        let archive = dir.path().join("archive");
        fs::create_dir(&archive).unwrap();
        let stray = dir.path().join("stray.mp3");
        touch(&stray);

        let tags = NameTags::default();
        let mut reconciler = Reconciler::new(&catalog, &tags, &archive).unwrap();
        assert_eq!(reconciler.reconcile(&stray).unwrap(), Decision::Skipped);
        let summary = reconciler.finish();
        assert_eq!(summary.skipped_paths, 1);
        assert_eq!(summary.existing_tracks, 0);
        assert!(catalog.load_tracks().unwrap().is_empty());
    }

    #[test]
    fn test_tag_failure_aborts() {
        let (dir, catalog) = setup();
        let file = dir.path().join("broken.mp3");
        touch(&file);

        struct Failing;
        impl TagReader for Failing {
            fn read(&self, path: &Path) -> Result<TrackTags> {
                Err(SyncError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidData, "corrupt"),
                })
            }
        }

        let mut reconciler = Reconciler::new(&catalog, &Failing, dir.path()).unwrap();
        assert!(reconciler.reconcile(&file).is_err());
        assert!(catalog.load_tracks().unwrap().is_empty());
    }

    #[test]
    fn test_snapshot_skips_undecodable_locations() {
        let (dir, catalog) = setup();
        catalog.insert_track(&sample_track("good.mp3")).unwrap();
        catalog.insert_track(&sample_track("bad//location.mp3")).unwrap();

        let snapshot = Snapshot::load(&catalog, dir.path()).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get(&dir.path().join("good.mp3")).is_some());
    }
}
