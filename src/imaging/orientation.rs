//! The eight EXIF orientation cases.
//!
//! Cameras record how the body was held instead of rotating pixels; the
//! `Orientation` tag (EXIF 0x0112) carries one of eight codes describing
//! where the stored image's row 0 / column 0 sit relative to the scene.
//! [`Orientation::apply`] performs the correcting transpose/rotate so the
//! image is upright *before* any user-requested rotation — the two must not
//! be merged, since user rotation is arbitrary-angle and lossy while
//! orientation correction is an exact pixel shuffle.
//!
//! Codes 5–8 are the 90°-family: for those the stored pixel grid is turned
//! relative to the scene, so reported width/height swap
//! ([`Orientation::swaps_axes`]).

use image::DynamicImage;

/// EXIF orientation code 1–8, named by the scene position of (row 0, col 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Orientation {
    /// 1 — already upright.
    #[default]
    TopLeft = 1,
    /// 2 — mirrored horizontally.
    TopRight = 2,
    /// 3 — upside down.
    BottomRight = 3,
    /// 4 — mirrored vertically.
    BottomLeft = 4,
    /// 5 — mirrored then turned; corrected by a transpose.
    LeftTop = 5,
    /// 6 — turned 90° CCW in the camera; corrected by a 90° CW turn.
    RightTop = 6,
    /// 7 — mirrored then turned the other way; corrected by a transverse.
    RightBottom = 7,
    /// 8 — turned 90° CW in the camera; corrected by a 90° CCW turn.
    LeftBottom = 8,
}

impl Orientation {
    /// Map a raw EXIF code to an orientation; out-of-range codes are `None`.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(Orientation::TopLeft),
            2 => Some(Orientation::TopRight),
            3 => Some(Orientation::BottomRight),
            4 => Some(Orientation::BottomLeft),
            5 => Some(Orientation::LeftTop),
            6 => Some(Orientation::RightTop),
            7 => Some(Orientation::RightBottom),
            8 => Some(Orientation::LeftBottom),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Whether this orientation turns the pixel grid 90° relative to the
    /// scene, swapping reported width and height (codes 5–8).
    pub fn swaps_axes(self) -> bool {
        self.code() >= 5
    }

    /// Apply the correcting transform, yielding an upright image.
    pub fn apply(self, img: DynamicImage) -> DynamicImage {
        match self {
            Orientation::TopLeft => img,
            Orientation::TopRight => img.fliph(),
            Orientation::BottomRight => img.rotate180(),
            Orientation::BottomLeft => img.flipv(),
            Orientation::LeftTop => img.rotate90().fliph(),
            Orientation::RightTop => img.rotate90(),
            Orientation::RightBottom => img.rotate90().flipv(),
            Orientation::LeftBottom => img.rotate270(),
        }
    }
}
