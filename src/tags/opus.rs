//! Vorbis comment tagging for Ogg Opus files.

use std::fs::File;
use std::path::Path;

use lofty::config::{ParseOptions, WriteOptions};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::ogg::{OggPictureStorage, OpusFile};
use lofty::picture::PictureType;
use lofty::read_from_path;
use lofty::tag::{Tag, TagExt, TagType};
use tracing::debug;

use super::picture;
use super::{TagWriter, TrackTags};
use crate::error::{AutotagError, Result};

pub const LABEL_KEY: &str = "LABEL";
pub const ORIGINAL_YEAR_KEY: &str = "ORIGINALYEAR";
pub const PICTURE_KEY: &str = "METADATA_BLOCK_PICTURE";

/// Writes Vorbis comments into `.opus` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpusTagWriter;

/// Make sure the file carries a Vorbis comment block, saving once if it
/// had to be created.
fn ensure_comment_block(path: &Path) -> Result<()> {
    let mut tagged_file =
        read_from_path(path).map_err(|e| AutotagError::tag_write(path, format!("Failed to read tags: {e}")))?;

    if tagged_file.tag(TagType::VorbisComments).is_none() {
        debug!("No Vorbis comments in {}, creating a fresh block", path.display());
        tagged_file.insert_tag(Tag::new(TagType::VorbisComments));
        tagged_file
            .save_to_path(path, WriteOptions::default())
            .map_err(|e| AutotagError::tag_write(path, format!("Failed to create tag block: {e}")))?;
    }
    Ok(())
}

fn read_opus(path: &Path) -> Result<OpusFile> {
    let mut file = File::open(path).map_err(|e| AutotagError::tag_write(path, e))?;
    OpusFile::read_from(&mut file, ParseOptions::new())
        .map_err(|e| AutotagError::tag_write(path, format!("Failed to parse Opus file: {e}")))
}

impl TagWriter for OpusTagWriter {
    fn write_tags(&self, path: &Path, tags: &TrackTags) -> Result<()> {
        ensure_comment_block(path)?;
        let mut opus = read_opus(path)?;
        let comments = opus.vorbis_comments_mut();

        comments.insert("TITLE".to_string(), tags.title.clone());
        comments.insert("ARTIST".to_string(), tags.artist.clone());
        comments.insert("ALBUM".to_string(), tags.album.clone());
        if let Some(label) = &tags.label {
            comments.insert(LABEL_KEY.to_string(), label.clone());
        }
        if let Some(year) = &tags.original_year {
            comments.insert(ORIGINAL_YEAR_KEY.to_string(), year.clone());
        }

        comments
            .save_to_path(path, WriteOptions::default())
            .map_err(|e| AutotagError::tag_write(path, format!("Failed to write tags: {e}")))
    }

    fn write_cover(&self, path: &Path, image: &[u8]) -> Result<()> {
        let encoded = picture::encode_front_cover(image).map_err(|e| AutotagError::cover_art(path, e))?;

        ensure_comment_block(path).map_err(|e| AutotagError::cover_art(path, e))?;
        let mut opus = read_opus(path).map_err(|e| AutotagError::cover_art(path, e))?;
        let comments = opus.vorbis_comments_mut();
        comments.remove_picture_type(PictureType::CoverFront);
        comments.insert(PICTURE_KEY.to_string(), encoded);

        comments
            .save_to_path(path, WriteOptions::default())
            .map_err(|e| AutotagError::cover_art(path, format!("Failed to write cover: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat, RgbImage};
    use std::fs;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn tags() -> TrackTags {
        TrackTags {
            title: "Title".to_string(),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            label: None,
            original_year: None,
        }
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

    fn ogg_crc(bytes: &[u8]) -> u32 {
        let mut crc = 0u32;
        for &b in bytes {
            crc ^= (b as u32) << 24;
            for _ in 0..8 {
                crc = if crc & 0x8000_0000 != 0 { (crc << 1) ^ 0x04C1_1DB7 } else { crc << 1 };
            }
        }
        crc
    }

    /// One Ogg page carrying a single packet shorter than 255 bytes.
    fn ogg_page(header_type: u8, granule: u64, sequence: u32, packet: &[u8]) -> Vec<u8> {
        let mut page = b"OggS".to_vec();
        page.push(0);
        page.push(header_type);
        page.extend_from_slice(&granule.to_le_bytes());
        page.extend_from_slice(&0x4155_5447u32.to_le_bytes());
        page.extend_from_slice(&sequence.to_le_bytes());
        page.extend_from_slice(&[0, 0, 0, 0]);
        page.push(1);
        page.push(packet.len() as u8);
        page.extend_from_slice(packet);

        let crc = ogg_crc(&page);
        page[22..26].copy_from_slice(&crc.to_le_bytes());
        page
    }

    /// Minimal Ogg Opus stream: OpusHead, an empty OpusTags, one silent packet.
    fn write_opus(dir: &Path, name: &str) -> std::path::PathBuf {
        let mut head = b"OpusHead".to_vec();
        head.push(1);
        head.push(1);
        head.extend_from_slice(&312u16.to_le_bytes());
        head.extend_from_slice(&48_000u32.to_le_bytes());
        head.extend_from_slice(&0i16.to_le_bytes());
        head.push(0);

        let mut opus_tags = b"OpusTags".to_vec();
        let vendor = b"autotag";
        opus_tags.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        opus_tags.extend_from_slice(vendor);
        opus_tags.extend_from_slice(&0u32.to_le_bytes());

        let mut data = ogg_page(0x02, 0, 0, &head);
        data.extend(ogg_page(0x00, 0, 1, &opus_tags));
        data.extend(ogg_page(0x04, 1272, 2, &[0xF8, 0xFF, 0xFE]));

        let path = dir.join(name);
        fs::write(&path, data).unwrap();
        path
    }

    fn png_cover() -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(2, 2))
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_write_tags_to_fresh_stream() {
        let dir = TempDir::new().unwrap();
        let path = write_opus(dir.path(), "track.opus");

        OpusTagWriter.write_tags(&path, &beatles()).unwrap();

        let opus = read_opus(&path).unwrap();
        let comments = opus.vorbis_comments();
        assert_eq!(comments.get("TITLE"), Some("Drive My Car"));
        assert_eq!(comments.get("ARTIST"), Some("The Beatles"));
        assert_eq!(comments.get("ALBUM"), Some("Rubber Soul"));
        assert_eq!(comments.get(LABEL_KEY), Some("Parlophone"));
        assert_eq!(comments.get(ORIGINAL_YEAR_KEY), Some("1965"));
    }

    #[test]
    fn test_rewrite_replaces_values() {
        let dir = TempDir::new().unwrap();
        let path = write_opus(dir.path(), "track.opus");

        OpusTagWriter.write_tags(&path, &beatles()).unwrap();
        OpusTagWriter.write_tags(&path, &tags()).unwrap();

        let opus = read_opus(&path).unwrap();
        let comments = opus.vorbis_comments();
        assert_eq!(comments.get_all("TITLE").collect::<Vec<_>>(), vec!["Title"]);
        // optional fields absent from the second write keep their old value
        assert_eq!(comments.get(LABEL_KEY), Some("Parlophone"));
    }

    #[test]
    fn test_cover_is_replaced_not_appended() {
        let dir = TempDir::new().unwrap();
        let path = write_opus(dir.path(), "track.opus");
        let cover = png_cover();

        OpusTagWriter.write_tags(&path, &beatles()).unwrap();
        for _ in 0..3 {
            OpusTagWriter.write_cover(&path, &cover).unwrap();
            OpusTagWriter.write_tags(&path, &beatles()).unwrap();
        }

        let opus = read_opus(&path).unwrap();
        let comments = opus.vorbis_comments();
        let pictures = comments.pictures();
        assert_eq!(pictures.len(), 1);
        let (picture, _) = &pictures[0];
        assert_eq!(picture.pic_type(), PictureType::CoverFront);
        assert_eq!(picture.data(), cover.as_slice());
        assert_eq!(comments.get("TITLE"), Some("Drive My Car"));
    }

    #[test]
    fn test_garbage_file_is_tag_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.opus");
        fs::write(&path, b"definitely not an ogg stream").unwrap();

        let err = OpusTagWriter.write_tags(&path, &tags()).unwrap_err();
        assert!(matches!(err, AutotagError::TagWrite { .. }));
    }

    #[test]
    fn test_undecodable_cover_is_cover_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.opus");
        fs::write(&path, b"OggS").unwrap();

        let err = OpusTagWriter.write_cover(&path, b"not an image").unwrap_err();
        assert!(matches!(err, AutotagError::CoverArt { .. }));
    }
}
