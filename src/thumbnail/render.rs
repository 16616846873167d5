//! Default renderer: decode with `image`, fit inside a square, encode PNG.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{GenericImageView, ImageFormat};

use super::{Thumbnail, ThumbnailError, ThumbnailRenderer};

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRenderer;

impl ThumbnailRenderer for ImageRenderer {
    fn render(&self, bytes: &[u8], max_edge: u32) -> Result<Thumbnail, ThumbnailError> {
        let image = image::load_from_memory(bytes)
            .map_err(|e| ThumbnailError::Decode(e.to_string()))?;

        let (width, height) = image.dimensions();
        let image = if width > max_edge || height > max_edge {
            image.resize(max_edge, max_edge, FilterType::Triangle)
        } else {
            image
        };

        let mut cursor = Cursor::new(Vec::new());
        image
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| ThumbnailError::Encode(e.to_string()))?;

        let (width, height) = image.dimensions();
        Ok(Thumbnail {
            png: cursor.into_inner(),
            width,
            height,
        })
    }
}

#[cfg(test)]
pub(crate) fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let image = image::DynamicImage::new_rgba8(width, height);
    let mut cursor = Cursor::new(Vec::new());
    image.write_to(&mut cursor, ImageFormat::Png).unwrap();
    cursor.into_inner()
}
