//! Pure calculation functions for target dimensions.
//!
//! Two distinct sizing policies live here and are never conflated:
//!
//! - [`derive_size`] fills in a *missing* dimension directly from the source
//!   aspect ratio. This is what the resize path itself uses when a caller
//!   asks for "width 640, whatever height that implies".
//! - [`fit_size`] treats *both* dimensions as a bounding box and finds the
//!   largest aspect-preserving size inside it: scale by width first, and if
//!   the implied height overflows the box, scale by height instead. This is
//!   the policy for view boxes and thumbnails.
//!
//! All derived pixel values round half-up. No I/O, no images — everything
//! here is testable with bare numbers.

/// Round half-up to a pixel count: `floor(x + 0.5)`, clamped at zero.
pub fn round_half_up(x: f64) -> u32 {
    let rounded = (x + 0.5).floor();
    if rounded < 0.0 { 0 } else { rounded as u32 }
}

/// Derive whichever of `width`/`height` is missing from the source aspect
/// ratio. With both given, they are returned untouched (the caller asked
/// for an exact size); with neither, the raw dimensions stand.
pub fn derive_size(raw: (u32, u32), width: Option<u32>, height: Option<u32>) -> (u32, u32) {
    let (raw_w, raw_h) = raw;
    let ratio = raw_w as f64 / raw_h as f64;
    match (width, height) {
        (Some(w), Some(h)) => (w, h),
        (Some(w), None) => (w, round_half_up(w as f64 / ratio)),
        (None, Some(h)) => (round_half_up(h as f64 * ratio), h),
        (None, None) => (raw_w, raw_h),
    }
}

/// Largest aspect-preserving size that fits inside `bounds`.
///
/// Tries width-fit first; falls back to height-fit when the implied height
/// would overflow the box.
pub fn fit_size(raw: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (raw_w, raw_h) = raw;
    let (box_w, box_h) = bounds;
    let ratio = raw_w as f64 / raw_h as f64;

    let height_for_width = round_half_up(box_w as f64 / ratio);
    if height_for_width <= box_h {
        (box_w, height_for_width)
    } else {
        (round_half_up(box_h as f64 * ratio), box_h)
    }
}

/// Canvas size needed to hold a `width`×`height` image rotated by `degrees`
/// without clipping.
pub fn rotated_extent(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let radians = degrees.to_radians();
    let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
    let w = width as f64;
    let h = height as f64;
    (
        round_half_up(w * cos + h * sin).max(1),
        round_half_up(w * sin + h * cos).max(1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // round_half_up
    // =========================================================================

    #[test]
    fn rounds_half_up() {
        assert_eq!(round_half_up(2.4), 2);
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(2.6), 3);
        assert_eq!(round_half_up(0.0), 0);
        assert_eq!(round_half_up(-0.4), 0);
    }

    // =========================================================================
    // derive_size
    // =========================================================================

    #[test]
    fn derive_height_from_width() {
        assert_eq!(derive_size((1920, 1080), Some(640), None), (640, 360));
    }

    #[test]
    fn derive_width_from_height() {
        assert_eq!(derive_size((1920, 1080), None, Some(360)), (640, 360));
    }

    #[test]
    fn derive_keeps_both_when_given() {
        // An exact request is honored even when it distorts.
        assert_eq!(derive_size((1920, 1080), Some(500), Some(500)), (500, 500));
    }

    #[test]
    fn derive_falls_back_to_raw() {
        assert_eq!(derive_size((1920, 1080), None, None), (1920, 1080));
    }

    #[test]
    fn derive_rounds_half_up() {
        // 333 / (4000/3000) = 249.75 → 250
        assert_eq!(derive_size((4000, 3000), Some(333), None), (333, 250));
    }

    // =========================================================================
    // fit_size
    // =========================================================================

    #[test]
    fn fit_landscape_into_square() {
        assert_eq!(fit_size((4000, 3000), (800, 800)), (800, 600));
    }

    #[test]
    fn fit_portrait_into_square() {
        assert_eq!(fit_size((3000, 4000), (800, 800)), (600, 800));
    }

    #[test]
    fn fit_exact_aspect_match() {
        assert_eq!(fit_size((1600, 1200), (800, 600)), (800, 600));
    }

    #[test]
    fn fit_wide_box_scales_by_height() {
        // 1:1 source into a wide box: width-fit overflows, height-fit wins.
        assert_eq!(fit_size((1000, 1000), (900, 300)), (300, 300));
    }

    #[test]
    fn fit_can_upscale() {
        // The policy is pure geometry; refusing to upscale is the caller's
        // call, not this function's.
        assert_eq!(fit_size((400, 300), (800, 800)), (800, 600));
    }

    // =========================================================================
    // rotated_extent
    // =========================================================================

    #[test]
    fn extent_unchanged_at_zero() {
        assert_eq!(rotated_extent(640, 480, 0.0), (640, 480));
    }

    #[test]
    fn extent_swaps_at_ninety() {
        assert_eq!(rotated_extent(640, 480, 90.0), (480, 640));
    }

    #[test]
    fn extent_grows_at_forty_five() {
        let (w, h) = rotated_extent(100, 100, 45.0);
        // 100 * sqrt(2) ≈ 141.42
        assert_eq!((w, h), (141, 141));
    }
}
