//! # Path Codec
//!
//! Converts between absolute filesystem paths and the form stored in the
//! `tracks.location` column: the path relative to the archive root, with each
//! segment percent-encoded (RFC 3986 unreserved characters kept as-is) and
//! segments joined by the platform separator.
//!
//! ```
//! use catalog_sync::path_codec::{to_readable, to_storable};
//! use std::path::Path;
//!
//! let root = Path::new("/srv/music");
//! let stored = to_storable(Path::new("/srv/music/Miles Davis/So What.mp3"), root)?;
//! assert_eq!(stored, "Miles%20Davis/So%20What.mp3");
//! assert_eq!(to_readable(&stored, root)?, Path::new("/srv/music/Miles Davis/So What.mp3"));
//! # Ok::<(), catalog_sync::SyncError>(())
//! ```

use std::ffi::{OsStr, OsString};
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR_STR};

use log::trace;

use crate::error::{Result, SyncError};

/// Encode `absolute_path` for storage relative to `archive_root`.
///
/// # Errors
///
/// [`SyncError::InvalidPath`] if the path is not below the archive root, is
/// the archive root itself, or contains `..` after the root.
pub fn to_storable(absolute_path: &Path, archive_root: &Path) -> Result<String> {
    let relative = absolute_path.strip_prefix(archive_root).map_err(|_| {
        SyncError::invalid_path(
            absolute_path,
            format!("not within archive root {}", archive_root.display()),
        )
    })?;

    let mut segments = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(segment) => {
                let encoded = encode_segment(segment).ok_or_else(|| {
                    SyncError::invalid_path(absolute_path, "file name is not valid unicode")
                })?;
                segments.push(encoded);
            }
            Component::CurDir => {}
            _ => {
                return Err(SyncError::invalid_path(
                    absolute_path,
                    "relative part escapes the archive root",
                ))
            }
        }
    }

    if segments.is_empty() {
        return Err(SyncError::invalid_path(absolute_path, "path is the archive root itself"));
    }

    let stored = segments.join(MAIN_SEPARATOR_STR);
    trace!("Encoded {} as {stored}", absolute_path.display());
    Ok(stored)
}

/// Decode a stored location back into an absolute path under `archive_root`.
///
/// # Errors
///
/// [`SyncError::InvalidPath`] if the location is empty or a segment decodes
/// to something that is not a plain file name.
pub fn to_readable(encoded_relative_path: &str, archive_root: &Path) -> Result<PathBuf> {
    if encoded_relative_path.is_empty() {
        return Err(SyncError::invalid_path(archive_root, "stored location is empty"));
    }

    let mut absolute = archive_root.to_path_buf();
    for segment in encoded_relative_path.split(MAIN_SEPARATOR_STR) {
        let decoded = decode_segment(segment)
            .filter(|name| is_plain_name(name))
            .ok_or_else(|| {
                SyncError::invalid_path(
                    encoded_relative_path,
                    format!("segment {segment:?} does not decode to a file name"),
                )
            })?;
        absolute.push(decoded);
    }

    Ok(absolute)
}

fn is_plain_name(name: &OsStr) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(single)), None) if single == name
    )
}

#[cfg(unix)]
fn encode_segment(segment: &OsStr) -> Option<String> {
    use std::os::unix::ffi::OsStrExt;
    Some(urlencoding::encode_binary(segment.as_bytes()).into_owned())
}

#[cfg(not(unix))]
fn encode_segment(segment: &OsStr) -> Option<String> {
    segment.to_str().map(|s| urlencoding::encode(s).into_owned())
}

#[cfg(unix)]
fn decode_segment(segment: &str) -> Option<OsString> {
    use std::os::unix::ffi::OsStringExt;
    Some(OsString::from_vec(
        urlencoding::decode_binary(segment.as_bytes()).into_owned(),
    ))
}

#[cfg(not(unix))]
fn decode_segment(segment: &str) -> Option<OsString> {
    urlencoding::decode(segment).ok().map(|s| OsString::from(s.into_owned()))
}
