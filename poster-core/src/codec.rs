use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

use crate::error::PosterError;

/// Decode any supported raster into RGBA8. `what` names the input in errors.
pub(crate) fn decode_rgba(bytes: &[u8], what: &str) -> Result<RgbaImage, PosterError> {
    image::load_from_memory(bytes)
        .map(|img| img.into_rgba8())
        .map_err(|e| PosterError::InvalidImage(format!("{what}: {e}")))
}

/// Lossless, alpha-capable encoding used for every artifact we write.
pub(crate) fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, PosterError> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| PosterError::StorageFailure(format!("png encode: {e}")))?;
    Ok(out.into_inner())
}
