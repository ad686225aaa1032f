use std::fmt;

use serde::{Deserialize, Serialize};

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub new_artists: usize,
    pub new_albums: usize,
    pub new_genres: usize,
    pub new_tracks: usize,
    pub updated_tracks: usize,
    /// Every media file visited, whether created, updated or unchanged
    pub existing_tracks: usize,
    /// Files that could not be expressed relative to the archive root
    pub skipped_paths: usize,
}

impl RunSummary {
    /// True when the run wrote nothing to the fact or dimension tables
    pub fn is_noop(&self) -> bool {
        self.new_artists == 0
            && self.new_albums == 0
            && self.new_genres == 0
            && self.new_tracks == 0
            && self.updated_tracks == 0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "New artists:     {}", self.new_artists)?;
        writeln!(f, "New albums:      {}", self.new_albums)?;
        writeln!(f, "New genres:      {}", self.new_genres)?;
        writeln!(f, "New tracks:      {}", self.new_tracks)?;
        writeln!(f, "Updated tracks:  {}", self.updated_tracks)?;
        write!(f, "Existing tracks: {}", self.existing_tracks)?;
        if self.skipped_paths > 0 {
            write!(f, "\nSkipped paths:   {}", self.skipped_paths)?;
        }
        Ok(())
    }
}
