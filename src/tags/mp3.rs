//! ID3v2 tagging for MP3 files.

use std::path::Path;

use id3::frame::{ExtendedText, Picture, PictureType};
use id3::{ErrorKind, Tag, TagLike, Version};

use super::{TagWriter, TrackTags};
use crate::error::{AutotagError, Result};

/// TXXX description used for the original release year.
pub const ORIGINAL_YEAR_DESCRIPTION: &str = "ORIGINALYEAR";

/// Writes ID3v2.4 tags (UTF-8 text frames).
#[derive(Debug, Default, Clone, Copy)]
pub struct Mp3TagWriter;

/// Load the existing tag, or start a fresh one if the file has none.
fn read_or_new(path: &Path) -> Result<Tag> {
    match Tag::read_from_path(path) {
        Ok(tag) => Ok(tag),
        Err(e) if matches!(e.kind, ErrorKind::NoTag) => Ok(Tag::new()),
        Err(e) => Err(AutotagError::tag_write(path, e)),
    }
}

fn save(tag: &Tag, path: &Path) -> Result<()> {
    tag.write_to_path(path, Version::Id3v24)
        .map_err(|e| AutotagError::tag_write(path, format!("write_to_path failed: {e}")))
}

impl TagWriter for Mp3TagWriter {
    fn write_tags(&self, path: &Path, tags: &TrackTags) -> Result<()> {
        let mut tag = read_or_new(path)?;

        tag.set_title(tags.title.as_str());
        tag.set_artist(tags.artist.as_str());
        tag.set_album(tags.album.as_str());

        if let Some(label) = tags.label.as_deref() {
            tag.set_text("TPUB", label);
        }
        if let Some(year) = tags.original_year.as_deref() {
            tag.add_frame(ExtendedText {
                description: ORIGINAL_YEAR_DESCRIPTION.to_string(),
                value: year.to_string(),
            });
        }

        save(&tag, path)
    }

    fn write_cover(&self, path: &Path, image: &[u8]) -> Result<()> {
        let mut tag = read_or_new(path).map_err(|e| AutotagError::cover_art(path, e))?;

        tag.remove_picture_by_type(PictureType::CoverFront);
        tag.add_frame(Picture {
            mime_type: "image/jpeg".to_string(),
            picture_type: PictureType::CoverFront,
            description: "cover".to_string(),
            data: image.to_vec(),
        });

        save(&tag, path).map_err(|e| AutotagError::cover_art(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// A file with a few bytes of fake MPEG data and no tag.
    fn untagged_mp3(dir: &Path, name: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        fs::write(&path, [0xFFu8, 0xFB, 0x90, 0x64, 0x00, 0x00, 0x00, 0x00]).unwrap();
        path
    }

    fn beatles() -> TrackTags {
        TrackTags {
            title: "Drive My Car".to_string(),
            artist: "The Beatles".to_string(),
            album: "Rubber Soul".to_string(),
            label: Some("Parlophone".to_string()),
            original_year: Some("1965".to_string()),
        }
    }

    #[test]
    fn test_write_tags_to_untagged_file() {
        let dir = TempDir::new().unwrap();
        let path = untagged_mp3(dir.path(), "a.mp3");

        Mp3TagWriter.write_tags(&path, &beatles()).unwrap();

        let tag = Tag::read_from_path(&path).unwrap();
        assert_eq!(tag.title(), Some("Drive My Car"));
        assert_eq!(tag.artist(), Some("The Beatles"));
        assert_eq!(tag.album(), Some("Rubber Soul"));
        assert_eq!(
            tag.get("TPUB").and_then(|f| f.content().text()),
            Some("Parlophone")
        );
        let year = tag
            .extended_texts()
            .find(|t| t.description == ORIGINAL_YEAR_DESCRIPTION)
            .map(|t| t.value.clone());
        assert_eq!(year.as_deref(), Some("1965"));
    }

    #[test]
    fn test_optional_fields_skipped() {
        let dir = TempDir::new().unwrap();
        let path = untagged_mp3(dir.path(), "a.mp3");
        let mut tags = beatles();
        tags.label = None;
        tags.original_year = None;

        Mp3TagWriter.write_tags(&path, &tags).unwrap();

        let tag = Tag::read_from_path(&path).unwrap();
        assert!(tag.get("TPUB").is_none());
        assert_eq!(tag.extended_texts().count(), 0);
    }

    #[test]
    fn test_write_cover_replaces_front_cover() {
        let dir = TempDir::new().unwrap();
        let path = untagged_mp3(dir.path(), "a.mp3");

        Mp3TagWriter.write_cover(&path, &[1, 2, 3]).unwrap();
        Mp3TagWriter.write_cover(&path, &[4, 5, 6]).unwrap();

        let tag = Tag::read_from_path(&path).unwrap();
        let pictures: Vec<_> = tag.pictures().collect();
        assert_eq!(pictures.len(), 1);
        assert_eq!(pictures[0].data, vec![4, 5, 6]);
        assert_eq!(pictures[0].mime_type, "image/jpeg");
        assert_eq!(pictures[0].description, "cover");
        assert_eq!(pictures[0].picture_type, PictureType::CoverFront);
    }

    #[test]
    fn test_missing_file_is_tag_error() {
        let err = Mp3TagWriter
            .write_tags(Path::new("/nonexistent/dir/a.mp3"), &beatles())
            .unwrap_err();
        assert!(matches!(err, AutotagError::TagWrite { .. }));
    }
}
