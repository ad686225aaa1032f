//! # Track Count Recalculation
//!
//! Rewrites the denormalized `track_cnt` of every artist, album and genre row
//! from the fact table. The three updates share one transaction, so the counts
//! are either all refreshed or all left as they were.

use log::debug;

use crate::db::Catalog;
use crate::entity_cache::DimensionKind;
use crate::error::Result;

/// Recompute `track_cnt` for all dimension rows across the whole catalog.
pub fn recalculate(catalog: &mut Catalog) -> Result<()> {
    let tx = catalog.connection_mut().transaction()?;

    for kind in DimensionKind::ALL {
        let table = kind.table();
        let column = kind.foreign_key();
        let rows = tx.execute(
            &format!(
                "UPDATE {table} SET track_cnt =
                    (SELECT COUNT(*) FROM tracks WHERE tracks.{column} = {table}.id)"
            ),
            [],
        )?;
        debug!("Recounted tracks for {rows} {kind} rows");
    }

    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::sample_track;

    fn track_cnt(catalog: &Catalog, kind: DimensionKind, name: &str) -> i64 {
        catalog
            .connection()
            .query_row(
                &format!("SELECT track_cnt FROM {} WHERE name = ?1", kind.table()),
                [name],
                |row| row.get(0),
            )
            .unwrap()
    }

    fn seeded_catalog() -> Catalog {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog.create_schema().unwrap();
        catalog.insert_dimension(DimensionKind::Artist, "X").unwrap();
        catalog.insert_dimension(DimensionKind::Album, "Y").unwrap();
        catalog.insert_dimension(DimensionKind::Genre, "Z").unwrap();

        let x = catalog.dimension_ids_named(DimensionKind::Artist, "X").unwrap()[0];
        let y = catalog.dimension_ids_named(DimensionKind::Album, "Y").unwrap()[0];
        let z = catalog.dimension_ids_named(DimensionKind::Genre, "Z").unwrap()[0];

        for (i, album) in [y, y, 1].into_iter().enumerate() {
            let mut track = sample_track(&format!("{i}.mp3"));
            track.artist_id = x;
            track.album_id = album;
            track.genre_id = z;
            catalog.insert_track(&track).unwrap();
        }
        catalog
    }

    #[test]
    fn test_counts_match_fact_rows() {
        let mut catalog = seeded_catalog();
        recalculate(&mut catalog).unwrap();

        assert_eq!(track_cnt(&catalog, DimensionKind::Artist, "X"), 3);
        assert_eq!(track_cnt(&catalog, DimensionKind::Album, "Y"), 2);
        assert_eq!(track_cnt(&catalog, DimensionKind::Album, "N/A"), 1);
        assert_eq!(track_cnt(&catalog, DimensionKind::Genre, "Z"), 3);
        assert_eq!(track_cnt(&catalog, DimensionKind::Artist, "N/A"), 0);
    }

    #[test]
    fn test_stale_counts_are_reset() {
        let mut catalog = seeded_catalog();
        catalog
            .connection()
            .execute("UPDATE artists SET track_cnt = 99", [])
            .unwrap();

        recalculate(&mut catalog).unwrap();
        assert_eq!(track_cnt(&catalog, DimensionKind::Artist, "N/A"), 0);
        assert_eq!(track_cnt(&catalog, DimensionKind::Artist, "X"), 3);
    }

    #[test]
    fn test_failure_rolls_back_every_kind() {
        let mut catalog = seeded_catalog();
        // Genres are recounted last; make that statement fail
        catalog
            .connection()
            .execute("ALTER TABLE genres RENAME COLUMN track_cnt TO cnt", [])
            .unwrap();

        assert!(recalculate(&mut catalog).is_err());
        assert_eq!(track_cnt(&catalog, DimensionKind::Artist, "X"), 0);
        assert_eq!(track_cnt(&catalog, DimensionKind::Album, "Y"), 0);
    }
}
