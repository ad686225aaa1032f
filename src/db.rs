//! # Catalog Store
//!
//! Thin layer over the SQLite catalog. The column names are fixed by the
//! existing catalog format and must not change:
//!
//! - `artists`, `albums`, `genres`: `id`, `name`, `track_cnt`
//! - `tracks`: `id`, `ar_id`, `al_id`, `ge_id`, `name`, `size`, `time`,
//!   `track_number`, `year`, `date`, `bit_rate`, `sample_rate`, `kind`,
//!   `comments`, `location`, `mtime`
//!
//! [`Catalog`] owns the connection for the duration of a run. Nothing here
//! caches; deduplication lives in [`crate::entity_cache`].

use std::path::Path;

use log::{debug, info};
use rusqlite::{params, Connection, Row};

use crate::entity_cache::{DimensionKind, SENTINEL_NAME};
use crate::error::Result;

/// One row of the `tracks` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: i64,
    pub artist_id: i64,
    pub album_id: i64,
    pub genre_id: i64,
    /// Title tag, or the file stem when untagged
    pub name: String,
    /// Bytes
    pub size: i64,
    /// Whole seconds
    pub duration: i64,
    pub track_number: Option<u32>,
    pub year: Option<u32>,
    /// Unix seconds at which the row was first created
    pub date: i64,
    /// kbps
    pub bit_rate: Option<u32>,
    /// Hz
    pub sample_rate: Option<u32>,
    pub kind: String,
    pub comment: Option<String>,
    /// Percent-encoded path relative to the archive root
    pub location: String,
    /// File modification time, unix seconds
    pub modified_at: i64,
}

const TRACK_COLUMNS: &str = "id, ar_id, al_id, ge_id, name, size, time, track_number, year, \
     date, bit_rate, sample_rate, kind, comments, location, mtime";

fn track_from_row(row: &Row<'_>) -> rusqlite::Result<Track> {
    Ok(Track {
        id: row.get(0)?,
        artist_id: row.get(1)?,
        album_id: row.get(2)?,
        genre_id: row.get(3)?,
        name: row.get(4)?,
        size: row.get(5)?,
        duration: row.get(6)?,
        track_number: row.get(7)?,
        year: row.get(8)?,
        date: row.get(9)?,
        bit_rate: row.get(10)?,
        sample_rate: row.get(11)?,
        kind: row.get(12)?,
        comment: row.get(13)?,
        location: row.get(14)?,
        modified_at: row.get(15)?,
    })
}

/// Handle on the catalog database, held for one run.
#[derive(Debug)]
pub struct Catalog {
    conn: Connection,
}

impl Catalog {
    /// Open (or create) the SQLite catalog at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        debug!("Opening catalog {}", path.display());
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Private in-memory catalog, used by tests and benchmarks.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Create any missing tables and sentinel rows. Existing tables are left
    /// exactly as they are.
    pub fn create_schema(&self) -> Result<()> {
        for kind in DimensionKind::ALL {
            let table = kind.table();
            self.conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id        INTEGER PRIMARY KEY,
                    name      TEXT    NOT NULL,
                    track_cnt INTEGER NOT NULL DEFAULT 0
                );
                CREATE INDEX IF NOT EXISTS idx_{table}_name ON {table}(name);"
            ))?;

            let seeded = self.conn.execute(
                &format!(
                    "INSERT INTO {table} (name, track_cnt)
                     SELECT ?1, 0 WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE name = ?1)"
                ),
                [SENTINEL_NAME],
            )?;
            if seeded > 0 {
                info!("Seeded sentinel {kind} row {SENTINEL_NAME:?}");
            }
        }

        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS tracks (
                id           INTEGER PRIMARY KEY,
                ar_id        INTEGER NOT NULL REFERENCES artists(id),
                al_id        INTEGER NOT NULL REFERENCES albums(id),
                ge_id        INTEGER NOT NULL REFERENCES genres(id),
                name         TEXT    NOT NULL,
                size         INTEGER NOT NULL,
                time         INTEGER NOT NULL,
                track_number INTEGER,
                year         INTEGER,
                date         INTEGER NOT NULL,
                bit_rate     INTEGER,
                sample_rate  INTEGER,
                kind         TEXT    NOT NULL,
                comments     TEXT,
                location     TEXT    NOT NULL UNIQUE,
                mtime        INTEGER NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tracks_ar_id ON tracks(ar_id);
            CREATE INDEX IF NOT EXISTS idx_tracks_al_id ON tracks(al_id);
            CREATE INDEX IF NOT EXISTS idx_tracks_ge_id ON tracks(ge_id);",
        )?;

        Ok(())
    }

    /// Ids of every `kind` row named exactly `name`.
    pub fn dimension_ids_named(&self, kind: DimensionKind, name: &str) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("SELECT id FROM {} WHERE name = ?1", kind.table()))?;
        let ids = stmt
            .query_map([name], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    pub fn insert_dimension(&self, kind: DimensionKind, name: &str) -> Result<()> {
        self.conn.execute(
            &format!("INSERT INTO {} (name, track_cnt) VALUES (?1, 0)", kind.table()),
            [name],
        )?;
        Ok(())
    }

    /// Every row of the fact table, in id order.
    pub fn load_tracks(&self) -> Result<Vec<Track>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TRACK_COLUMNS} FROM tracks ORDER BY id"))?;
        let tracks = stmt
            .query_map([], track_from_row)?
            .collect::<rusqlite::Result<Vec<Track>>>()?;
        Ok(tracks)
    }

    /// Insert `track` (its `id` is ignored) and return the assigned id.
    pub fn insert_track(&self, track: &Track) -> Result<i64> {
        let mut stmt = self.conn.prepare_cached(
            "INSERT INTO tracks (ar_id, al_id, ge_id, name, size, time, track_number, year,
                                 date, bit_rate, sample_rate, kind, comments, location, mtime)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )?;
        stmt.execute(params![
            track.artist_id,
            track.album_id,
            track.genre_id,
            track.name,
            track.size,
            track.duration,
            track.track_number,
            track.year,
            track.date,
            track.bit_rate,
            track.sample_rate,
            track.kind,
            track.comment,
            track.location,
            track.modified_at,
        ])?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Overwrite the mutable columns of the row with `track.id`. `location`
    /// and `date` are left untouched.
    pub fn update_track(&self, track: &Track) -> Result<()> {
        let mut stmt = self.conn.prepare_cached(
            "UPDATE tracks SET ar_id = ?1, al_id = ?2, ge_id = ?3, name = ?4, size = ?5,
                               time = ?6, track_number = ?7, year = ?8, bit_rate = ?9,
                               sample_rate = ?10, kind = ?11, comments = ?12, mtime = ?13
             WHERE id = ?14",
        )?;
        stmt.execute(params![
            track.artist_id,
            track.album_id,
            track.genre_id,
            track.name,
            track.size,
            track.duration,
            track.track_number,
            track.year,
            track.bit_rate,
            track.sample_rate,
            track.kind,
            track.comment,
            track.modified_at,
            track.id,
        ])?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_track(location: &str) -> Track {
        Track {
            id: 0,
            artist_id: 1,
            album_id: 1,
            genre_id: 1,
            name: "So What".to_string(),
            size: 4_096,
            duration: 545,
            track_number: Some(1),
            year: Some(1959),
            date: 1_700_000_000,
            bit_rate: Some(320),
            sample_rate: Some(44_100),
            kind: "MPEG audio file".to_string(),
            comment: None,
            location: location.to_string(),
            modified_at: 1_600_000_000,
        }
    }

    #[test]
    fn test_create_schema_is_repeatable_and_seeds_sentinels_once() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.create_schema().unwrap();
        catalog.create_schema().unwrap();

        for kind in DimensionKind::ALL {
            let ids = catalog.dimension_ids_named(kind, SENTINEL_NAME).unwrap();
            assert_eq!(ids.len(), 1, "{kind} sentinel");
        }
    }

    #[test]
    fn test_dimension_lookup_returns_every_match() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.create_schema().unwrap();

        assert!(catalog.dimension_ids_named(DimensionKind::Genre, "Jazz").unwrap().is_empty());

        catalog.insert_dimension(DimensionKind::Genre, "Jazz").unwrap();
        catalog.insert_dimension(DimensionKind::Genre, "Jazz").unwrap();
        catalog.insert_dimension(DimensionKind::Genre, "jazz").unwrap();

        assert_eq!(catalog.dimension_ids_named(DimensionKind::Genre, "Jazz").unwrap().len(), 2);
        assert_eq!(catalog.dimension_ids_named(DimensionKind::Genre, "jazz").unwrap().len(), 1);
    }

    #[test]
    fn test_insert_load_update_track() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.create_schema().unwrap();

        let mut track = sample_track("Miles%20Davis/So%20What.mp3");
        track.id = catalog.insert_track(&track).unwrap();

        let loaded = catalog.load_tracks().unwrap();
        assert_eq!(loaded, vec![track.clone()]);

        let mut changed = track.clone();
        changed.name = "So What (Remastered)".to_string();
        changed.comment = Some("remaster".to_string());
        changed.modified_at += 1;
        changed.date = 0;
        changed.location = "moved.mp3".to_string();
        catalog.update_track(&changed).unwrap();

        let reloaded = catalog.load_tracks().unwrap().remove(0);
        assert_eq!(reloaded.name, "So What (Remastered)");
        assert_eq!(reloaded.comment.as_deref(), Some("remaster"));
        assert_eq!(reloaded.modified_at, track.modified_at + 1);
        // Identity columns survive an update
        assert_eq!(reloaded.date, track.date);
        assert_eq!(reloaded.location, track.location);
    }

    #[test]
    fn test_location_is_unique() {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.create_schema().unwrap();

        let track = sample_track("a.mp3");
        catalog.insert_track(&track).unwrap();
        assert!(catalog.insert_track(&track).is_err());
    }
}
