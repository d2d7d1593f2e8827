//! Raw upload -> fixed-size tile.

use image::imageops::FilterType;
use image::metadata::Orientation;
use image::{DynamicImage, ImageDecoder, ImageReader};
use std::io::Cursor;

use crate::codec::encode_png;
use crate::error::PosterError;
use crate::geometry::TILE_SIZE;

/// Rotate per EXIF orientation, force-resize to `TILE_SIZE` square (aspect
/// ratio is not preserved), encode as PNG.
pub fn normalize(raw: &[u8]) -> Result<Vec<u8>, PosterError> {
    let invalid = |e: image::ImageError| PosterError::InvalidImage(e.to_string());

    let mut decoder = ImageReader::new(Cursor::new(raw))
        .with_guessed_format()
        .map_err(|e| PosterError::InvalidImage(e.to_string()))?
        .into_decoder()
        .map_err(invalid)?;
    // Missing or unreadable EXIF is not an error, just no rotation.
    let orientation = decoder
        .orientation()
        .unwrap_or(Orientation::NoTransforms);
    let mut image = DynamicImage::from_decoder(decoder).map_err(invalid)?;
    image.apply_orientation(orientation);

    let tile = image
        .resize_exact(TILE_SIZE, TILE_SIZE, FilterType::Lanczos3)
        .into_rgba8();
    encode_png(&tile)
}
