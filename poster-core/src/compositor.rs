//! Tile placement onto the shared poster.
//!
//! Pure over image bytes: fetching and storing poster versions is the
//! publisher's job.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

use crate::codec::{decode_rgba, encode_png};
use crate::error::PosterError;
use crate::geometry::{Square, STARTER_HEIGHT, STARTER_WIDTH, TILE_SIZE};

pub const DEFAULT_PREVIEW_WIDTH: u32 = 1200;

/// Where the poster being composited onto comes from.
pub enum PosterBase {
    /// A previously published or starter poster, still encoded.
    Encoded(Vec<u8>),
    /// Nothing published and no starter image: a white canvas.
    Blank,
}

impl PosterBase {
    fn into_image(self) -> Result<RgbaImage, PosterError> {
        match self {
            PosterBase::Encoded(bytes) => decode_rgba(&bytes, "poster"),
            PosterBase::Blank => Ok(blank_poster()),
        }
    }
}

/// New poster plus its preview, both PNG.
pub struct Composite {
    pub poster: Vec<u8>,
    pub preview: Vec<u8>,
}

#[derive(Clone, Copy, Debug)]
pub struct Compositor {
    preview_width: u32,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(DEFAULT_PREVIEW_WIDTH)
    }
}

impl Compositor {
    pub fn new(preview_width: u32) -> Self {
        Self {
            preview_width: preview_width.max(1),
        }
    }

    pub fn preview_width(&self) -> u32 {
        self.preview_width
    }

    /// Place `tile` on `poster` at `square_index`. The index is validated
    /// before either image is decoded.
    pub fn place_tile(
        &self,
        poster: &[u8],
        tile: &[u8],
        square_index: i64,
    ) -> Result<Vec<u8>, PosterError> {
        let square = Square::new(square_index)?;
        let mut poster = decode_rgba(poster, "poster")?;
        let tile = decode_rgba(tile, "tile")?;
        place_tile_image(&mut poster, &tile, square)?;
        encode_png(&poster)
    }

    /// Place the tile and derive the preview in one pass.
    pub fn composite(
        &self,
        base: PosterBase,
        tile: &[u8],
        square: Square,
    ) -> Result<Composite, PosterError> {
        let tile = decode_rgba(tile, "tile")?;
        let mut poster = base.into_image()?;
        place_tile_image(&mut poster, &tile, square)?;
        let preview = self.preview(&poster);
        Ok(Composite {
            poster: encode_png(&poster)?,
            preview: encode_png(&preview)?,
        })
    }

    /// Uniform downscale to `preview_width`. Narrower posters are not upscaled.
    pub fn preview(&self, poster: &RgbaImage) -> RgbaImage {
        let (width, height) = poster.dimensions();
        if width <= self.preview_width {
            return poster.clone();
        }
        let scaled = (u64::from(height) * u64::from(self.preview_width) + u64::from(width) / 2)
            / u64::from(width);
        let preview_height = u32::try_from(scaled).unwrap_or(height).max(1);
        imageops::resize(poster, self.preview_width, preview_height, FilterType::Triangle)
    }
}

/// Opaque overwrite of the square's rectangle; no blending, every other
/// pixel untouched.
pub fn place_tile_image(
    poster: &mut RgbaImage,
    tile: &RgbaImage,
    square: Square,
) -> Result<(), PosterError> {
    if tile.dimensions() != (TILE_SIZE, TILE_SIZE) {
        let (w, h) = tile.dimensions();
        return Err(PosterError::InvalidImage(format!(
            "tile is {w}x{h}, expected {TILE_SIZE}x{TILE_SIZE}"
        )));
    }
    let origin = square.origin();
    let (width, height) = poster.dimensions();
    if origin.left + TILE_SIZE > width || origin.top + TILE_SIZE > height {
        return Err(PosterError::InvalidGeometry(format!(
            "square {square} needs a poster of at least {}x{}, got {width}x{height}",
            origin.left + TILE_SIZE,
            origin.top + TILE_SIZE
        )));
    }
    imageops::replace(poster, tile, i64::from(origin.left), i64::from(origin.top));
    Ok(())
}

pub fn blank_poster() -> RgbaImage {
    RgbaImage::from_pixel(STARTER_WIDTH, STARTER_HEIGHT, Rgba([255, 255, 255, 255]))
}

#[cfg(test)]
mod tests {
    use super::*;

    // Just big enough to hold square 0: [100, 750) x [1250, 1900).
    const W: u32 = 800;
    const H: u32 = 1950;

    fn starter() -> RgbaImage {
        RgbaImage::from_fn(W, H, |x, y| Rgba([(x % 251) as u8, (y % 241) as u8, 7, 255]))
    }

    fn tile() -> RgbaImage {
        RgbaImage::from_fn(TILE_SIZE, TILE_SIZE, |x, y| {
            Rgba([200, (x % 256) as u8, (y % 256) as u8, 128])
        })
    }

    #[test]
    fn tile_lands_only_inside_its_rectangle() {
        let before = starter();
        let tile = tile();
        let out = Compositor::default()
            .place_tile(
                &encode_png(&before).unwrap(),
                &encode_png(&tile).unwrap(),
                0,
            )
            .unwrap();
        let after = decode_rgba(&out, "poster").unwrap();

        assert_eq!(after.dimensions(), (W, H));
        for (x, y, pixel) in after.enumerate_pixels() {
            let inside = (100..750).contains(&x) && (1250..1900).contains(&y);
            if inside {
                assert_eq!(pixel, tile.get_pixel(x - 100, y - 1250), "({x},{y})");
            } else {
                assert_eq!(pixel, before.get_pixel(x, y), "({x},{y})");
            }
        }
    }

    #[test]
    fn translucent_tile_overwrites_instead_of_blending() {
        let mut poster = starter();
        place_tile_image(&mut poster, &tile(), Square::new(0).unwrap()).unwrap();
        assert_eq!(poster.get_pixel(100, 1250)[3], 128);
    }

    #[test]
    fn placing_twice_equals_placing_once() {
        let compositor = Compositor::default();
        let poster = encode_png(&starter()).unwrap();
        let tile = encode_png(&tile()).unwrap();

        let once = compositor.place_tile(&poster, &tile, 0).unwrap();
        let twice = compositor.place_tile(&once, &tile, 0).unwrap();
        assert_eq!(
            decode_rgba(&once, "once").unwrap(),
            decode_rgba(&twice, "twice").unwrap()
        );
    }

    #[test]
    fn out_of_range_square_never_touches_poster_bytes() {
        let compositor = Compositor::default();
        // Not decodable: reaching the decoder would yield InvalidImage.
        let poster = b"not a poster";
        for index in [-1, 72] {
            let err = compositor.place_tile(poster, b"", index).unwrap_err();
            assert!(matches!(err, PosterError::InvalidGeometry(_)), "{index}");
        }
    }

    #[test]
    fn poster_too_small_for_square_is_invalid_geometry() {
        let mut poster = starter();
        let err = place_tile_image(&mut poster, &tile(), Square::new(9).unwrap()).unwrap_err();
        assert!(matches!(err, PosterError::InvalidGeometry(_)));
        assert_eq!(poster, starter());
    }

    #[test]
    fn wrong_tile_size_is_invalid_image() {
        let mut poster = starter();
        let small = RgbaImage::new(64, 64);
        let err = place_tile_image(&mut poster, &small, Square::new(0).unwrap()).unwrap_err();
        assert!(matches!(err, PosterError::InvalidImage(_)));
    }

    #[test]
    fn preview_keeps_aspect_ratio() {
        let compositor = Compositor::new(200);
        let preview = compositor.preview(&starter());
        assert_eq!(preview.dimensions(), (200, 488));
    }

    #[test]
    fn narrow_poster_preview_is_not_upscaled() {
        let compositor = Compositor::new(5000);
        let poster = starter();
        assert_eq!(compositor.preview(&poster), poster);
    }

    #[test]
    fn blank_canvas_holds_last_square() {
        let mut poster = PosterBase::Blank.into_image().unwrap();
        assert_eq!(poster.dimensions(), (STARTER_WIDTH, STARTER_HEIGHT));

        place_tile_image(&mut poster, &tile(), Square::new(71).unwrap()).unwrap();
        assert_eq!(*poster.get_pixel(4650, 6450), Rgba([200, 0, 0, 128]));
        assert_eq!(*poster.get_pixel(4649, 6450), Rgba([255, 255, 255, 255]));
        assert_eq!(*poster.get_pixel(5299, 7099), Rgba([200, 137, 137, 128]));
    }

    #[test]
    fn composite_returns_poster_and_preview() {
        let compositor = Compositor::new(400);
        let out = compositor
            .composite(
                PosterBase::Encoded(encode_png(&starter()).unwrap()),
                &encode_png(&tile()).unwrap(),
                Square::new(0).unwrap(),
            )
            .unwrap();

        let poster = decode_rgba(&out.poster, "poster").unwrap();
        assert_eq!(*poster.get_pixel(749, 1899), Rgba([200, 137, 137, 128]));
        let preview = decode_rgba(&out.preview, "preview").unwrap();
        assert_eq!(preview.dimensions(), (400, 975));
    }
}
