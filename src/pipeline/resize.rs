//! Image resolution: scale a bitmap to cover a pixel box, then center-crop.
//!
//! Card art comes in every aspect ratio (scans, full-art crops, screenshots).
//! Uniform scaling until *both* axes cover the target, followed by a
//! symmetric crop of the overflowing axis, fills the card exactly without
//! distortion and without white bars.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use tracing::debug;

/// Scaled size `(w, h)` that covers `target_w × target_h` while keeping the
/// aspect ratio of `src_w × src_h`.
///
/// Wider-than-target sources are scaled to the target height; all others to
/// the target width. The free axis is floored and never below the target.
pub fn cover_size(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> (u32, u32) {
    let (sw, sh, tw, th) = (src_w as u64, src_h as u64, target_w as u64, target_h as u64);

    // Cross-multiplied ratio comparison and integer floor keep this exact.
    if sw * th > tw * sh {
        let w = (th * sw / sh) as u32;
        (w.max(target_w), target_h)
    } else {
        let h = (tw * sh / sw) as u32;
        (target_w, h.max(target_h))
    }
}

/// Resize `image` to exactly `target_w × target_h` RGBA pixels.
///
/// The image is converted to RGBA first (transparency is kept for the PDF
/// soft mask), scaled with Lanczos3 to cover the box, and cropped from the
/// center with floor offsets.
///
/// Returns `None` when the source or the target has a zero dimension.
pub fn resolve(image: &DynamicImage, target_w: u32, target_h: u32) -> Option<RgbaImage> {
    let (src_w, src_h) = (image.width(), image.height());
    if src_w == 0 || src_h == 0 || target_w == 0 || target_h == 0 {
        return None;
    }

    let rgba = image.to_rgba8();
    let (scaled_w, scaled_h) = cover_size(src_w, src_h, target_w, target_h);
    let scaled = if (scaled_w, scaled_h) == (src_w, src_h) {
        rgba
    } else {
        imageops::resize(&rgba, scaled_w, scaled_h, FilterType::Lanczos3)
    };

    let left = (scaled_w - target_w) / 2;
    let top = (scaled_h - target_h) / 2;
    debug!(
        "Resolved {}x{} → {}x{} → crop {}x{} at ({}, {})",
        src_w, src_h, scaled_w, scaled_h, target_w, target_h, left, top
    );

    Some(imageops::crop_imm(&scaled, left, top, target_w, target_h).to_image())
}
