//! # Tag Reading
//!
//! The reconciler needs a file's tag values and audio properties; where they
//! come from is behind [`TagReader`]. [`LoftyTagReader`] reads real files with
//! `lofty`; tests plug in readers that never touch file contents.

use std::path::Path;

use lofty::file::{FileType, TaggedFileExt};
use lofty::prelude::*;
use lofty::probe::Probe;
use log::debug;

use crate::error::{Result, SyncError};

/// Tag values and audio properties of one media file. Blank tag values are
/// stored as `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub comment: Option<String>,
    pub track_number: Option<u32>,
    pub year: Option<u32>,
    /// Whole seconds
    pub duration_secs: u64,
    /// kbps
    pub bit_rate: Option<u32>,
    /// Hz
    pub sample_rate: Option<u32>,
    /// Human readable file type, e.g. "MPEG audio file"
    pub kind: String,
}

pub trait TagReader {
    /// # Errors
    ///
    /// [`SyncError::Tag`] when the file cannot be parsed.
    fn read(&self, path: &Path) -> Result<TrackTags>;
}

/// [`TagReader`] backed by `lofty`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl LoftyTagReader {
    pub fn new() -> Self {
        Self
    }
}

impl TagReader for LoftyTagReader {
    fn read(&self, path: &Path) -> Result<TrackTags> {
        let tag_error = |source| SyncError::Tag {
            path: path.to_path_buf(),
            source,
        };

        let tagged_file = Probe::open(path)
            .map_err(tag_error)?
            .read()
            .map_err(tag_error)?;

        let properties = tagged_file.properties();
        let mut tags = TrackTags {
            duration_secs: properties.duration().as_secs(),
            bit_rate: properties.audio_bitrate(),
            sample_rate: properties.sample_rate(),
            kind: kind_name(tagged_file.file_type()).to_string(),
            ..TrackTags::default()
        };

        if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
            tags.title = non_blank(tag.title());
            tags.artist = non_blank(tag.artist());
            tags.album = non_blank(tag.album());
            tags.genre = non_blank(tag.genre());
            tags.comment = non_blank(tag.comment());
            tags.track_number = tag.track();
            tags.year = tag.year();
        } else {
            debug!("{} carries no tags", path.display());
        }

        debug!(
            "Read tags from {}: artist={:?} album={:?} title={:?}",
            path.display(),
            tags.artist,
            tags.album,
            tags.title
        );
        Ok(tags)
    }
}

fn non_blank(value: Option<std::borrow::Cow<'_, str>>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn kind_name(file_type: FileType) -> &'static str {
    match file_type {
        FileType::Mpeg => "MPEG audio file",
        FileType::Flac => "FLAC audio file",
        FileType::Vorbis => "Ogg Vorbis audio file",
        FileType::Opus => "Opus audio file",
        FileType::Aac => "AAC audio file",
        FileType::Mp4 => "MPEG-4 audio file",
        FileType::Wav => "WAV audio file",
        FileType::Aiff => "AIFF audio file",
        _ => "Audio file",
    }
}
