//! Tag writing for the supported containers.
//!
//! The pipeline only talks to the [`TagWriter`] trait. The implementation is
//! picked once per file from its extension:
//!
//! * [`mp3::Mp3TagWriter`]: ID3v2 frames via the `id3` crate
//! * [`opus::OpusTagWriter`]: Vorbis comments via `lofty`, cover art as a
//!   base64 `METADATA_BLOCK_PICTURE`
//!
//! Each file is tagged independently and writes are not transactional: a
//! crash in the middle of a write can leave that one file partially tagged.

pub mod cover;
pub mod mp3;
pub mod opus;
pub mod picture;

use std::fmt;
use std::path::Path;

use tracing::trace;

use crate::error::{AutotagError, Result};
pub use cover::{CoverFetcher, HttpCoverFetcher};
pub use mp3::Mp3TagWriter;
pub use opus::OpusTagWriter;

/// Container formats the tool knows how to tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioFormat {
    Mp3,
    Opus,
}

impl AudioFormat {
    /// Match an extension case-insensitively, without the leading dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "opus" => Some(AudioFormat::Opus),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AudioFormat::Mp3 => write!(f, "MP3"),
            AudioFormat::Opus => write!(f, "Opus"),
        }
    }
}

/// Metadata written into a file after recognition.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub label: Option<String>,
    pub original_year: Option<String>,
}

/// Format-specific tag mutation.
pub trait TagWriter {
    /// Set title, artist and album, plus label and original year when given.
    fn write_tags(&self, path: &Path, tags: &TrackTags) -> Result<()>;

    /// Embed already-downloaded cover art as the front cover.
    fn write_cover(&self, path: &Path, image: &[u8]) -> Result<()>;
}

/// Hands out the writer for a format.
pub trait TagWriterSet {
    fn writer_for(&self, format: AudioFormat) -> &dyn TagWriter;
}

/// The production writers.
#[derive(Debug, Default)]
pub struct FormatTagWriters {
    mp3: Mp3TagWriter,
    opus: OpusTagWriter,
}

impl TagWriterSet for FormatTagWriters {
    fn writer_for(&self, format: AudioFormat) -> &dyn TagWriter {
        match format {
            AudioFormat::Mp3 => &self.mp3,
            AudioFormat::Opus => &self.opus,
        }
    }
}

/// Download the cover at `cover_url` and embed it with `writer`.
///
/// A missing or blank URL is not an error: nothing is written.
pub fn write_cover_art(
    writer: &dyn TagWriter,
    fetcher: &dyn CoverFetcher,
    path: &Path,
    cover_url: Option<&str>,
) -> Result<()> {
    let url = match cover_url.map(str::trim) {
        Some(url) if !url.is_empty() => url,
        _ => {
            trace!("No cover art URL for {}, skipping", path.display());
            return Ok(());
        }
    };

    let image = fetcher
        .fetch(url)
        .map_err(|e| AutotagError::cover_art(path, e))?;
    trace!("Fetched {} bytes of cover art from {}", image.len(), url);
    writer.write_cover(path, &image)
}
