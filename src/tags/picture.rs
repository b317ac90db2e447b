//! FLAC-style picture blocks for Vorbis comments.
//!
//! Ogg containers have no picture frame of their own. Cover art goes into a
//! `METADATA_BLOCK_PICTURE` comment holding the base64 of a FLAC picture
//! metadata block:
//!
//! ```text
//! u32 picture type        (3 = front cover)
//! u32 MIME length, MIME bytes
//! u32 description length, description bytes
//! u32 width, u32 height
//! u32 colour depth        (bits per pixel)
//! u32 palette colours     (0 for true colour)
//! u32 data length, image bytes
//! ```
//!
//! All integers are big-endian.

use std::collections::HashSet;
use std::io::{self, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use image::{ColorType, GenericImageView};

/// Picture type code for "Cover (front)".
pub const FRONT_COVER: u32 = 3;

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const PNG_INDEXED_COLOR: u8 = 3;

/// What the picture block records about an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureInfo {
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    pub color_depth: u32,
    /// Distinct palette entries for indexed images, 0 otherwise.
    pub colors: u32,
}

/// Decode `data` far enough to fill in a [`PictureInfo`].
pub fn describe_image(data: &[u8]) -> Result<PictureInfo, String> {
    let format = image::guess_format(data).map_err(|e| format!("Unknown image format: {}", e))?;
    let decoded =
        image::load_from_memory_with_format(data, format).map_err(|e| format!("Failed to decode image: {}", e))?;
    let (width, height) = decoded.dimensions();

    let (color_depth, colors) = match png_palette_colors(data) {
        Some(colors) => (8, colors),
        None => {
            let depth = match decoded.color() {
                ColorType::Rgb8 => 24,
                ColorType::Rgba8 => 32,
                _ => 8,
            };
            (depth, 0)
        }
    };

    Ok(PictureInfo {
        mime_type: format.to_mime_type().to_string(),
        width,
        height,
        color_depth,
        colors,
    })
}

/// Count distinct palette colours of an indexed PNG.
///
/// Returns `None` when `data` is not a PNG or not palette-based.
pub fn png_palette_colors(data: &[u8]) -> Option<u32> {
    let mut rest = data.strip_prefix(PNG_SIGNATURE)?;
    let mut indexed = false;

    while rest.len() >= 8 {
        let length = BigEndian::read_u32(&rest[0..4]) as usize;
        let kind = &rest[4..8];
        let body = rest.get(8..8 + length)?;

        match kind {
            b"IHDR" => indexed = body.get(9) == Some(&PNG_INDEXED_COLOR),
            b"PLTE" if indexed => {
                let distinct: HashSet<&[u8]> = body.chunks_exact(3).collect();
                return Some(distinct.len() as u32);
            }
            b"IDAT" | b"IEND" => return None,
            _ => {}
        }

        // chunk header + body + CRC
        rest = rest.get(8 + length + 4..)?;
    }
    None
}

/// Serialize a picture block.
pub fn build_picture_block(
    data: &[u8],
    info: &PictureInfo,
    picture_type: u32,
    description: &str,
) -> io::Result<Vec<u8>> {
    let mut block = Vec::with_capacity(32 + info.mime_type.len() + description.len() + data.len());

    block.write_u32::<BigEndian>(picture_type)?;
    block.write_u32::<BigEndian>(info.mime_type.len() as u32)?;
    block.write_all(info.mime_type.as_bytes())?;
    block.write_u32::<BigEndian>(description.len() as u32)?;
    block.write_all(description.as_bytes())?;
    block.write_u32::<BigEndian>(info.width)?;
    block.write_u32::<BigEndian>(info.height)?;
    block.write_u32::<BigEndian>(info.color_depth)?;
    block.write_u32::<BigEndian>(info.colors)?;
    block.write_u32::<BigEndian>(data.len() as u32)?;
    block.write_all(data)?;

    Ok(block)
}

/// Describe, serialize and base64-encode `data` as the front cover.
pub fn encode_front_cover(data: &[u8]) -> Result<String, String> {
    let info = describe_image(data)?;
    let block = build_picture_block(data, &info, FRONT_COVER, "cover")
        .map_err(|e| format!("Failed to build picture block: {}", e))?;
    Ok(STANDARD.encode(block))
}
