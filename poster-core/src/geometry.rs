//! Poster grid geometry.
//!
//! These constants are part of the on-disk contract: every poster already
//! published was laid out with them, so changing any value moves every tile.

use serde::{Deserialize, Serialize};

use crate::error::PosterError;

/// Number of squares on the poster.
pub const NUM_SQUARES: u32 = 72;

/// Grid columns. Rows follow as `NUM_SQUARES / COLUMNS`.
pub const COLUMNS: u32 = 8;

pub const ROWS: u32 = NUM_SQUARES / COLUMNS;

/// Edge length of a tile in pixels.
pub const TILE_SIZE: u32 = 650;

/// Pixel offset of the first grid row from the poster's top edge.
pub const ROOT_TOP: u32 = 1250;

/// Pixel offset of the first grid column from the poster's left edge.
pub const ROOT_LEFT: u32 = 100;

/// Blank poster canvas used when neither a published poster nor a starter
/// image exists. Symmetric side margins, 200px footer under the last row.
pub const STARTER_WIDTH: u32 = ROOT_LEFT * 2 + COLUMNS * TILE_SIZE;
pub const STARTER_HEIGHT: u32 = ROOT_TOP + ROWS * TILE_SIZE + 200;

/// A validated square index in `[0, NUM_SQUARES)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Square(u32);

/// Top-left pixel of a square's tile rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TileOrigin {
    pub top: u32,
    pub left: u32,
}

impl Square {
    /// Validate a raw index. Signed so callers can hand over whatever they
    /// parsed without a lossy cast first.
    pub fn new(index: i64) -> Result<Self, PosterError> {
        u32::try_from(index)
            .ok()
            .filter(|i| *i < NUM_SQUARES)
            .map(Square)
            .ok_or_else(|| {
                PosterError::InvalidGeometry(format!(
                    "square index {index} is outside [0, {NUM_SQUARES})"
                ))
            })
    }

    pub fn index(self) -> u32 {
        self.0
    }

    pub fn column(self) -> u32 {
        self.0 % COLUMNS
    }

    pub fn row(self) -> u32 {
        self.0 / COLUMNS
    }

    /// Pure mapping from index to pixel position.
    pub fn origin(self) -> TileOrigin {
        TileOrigin {
            top: ROOT_TOP + self.row() * TILE_SIZE,
            left: ROOT_LEFT + self.column() * TILE_SIZE,
        }
    }

    /// Every square on the grid, in index order.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..NUM_SQUARES).map(Square)
    }
}

impl TryFrom<u32> for Square {
    type Error = PosterError;

    fn try_from(index: u32) -> Result<Self, Self::Error> {
        Square::new(i64::from(index))
    }
}

impl From<Square> for u32 {
    fn from(square: Square) -> Self {
        square.0
    }
}

impl std::fmt::Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
