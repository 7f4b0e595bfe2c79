//! PNG encoding: `RgbaImage` → print-ready PNG with embedded DPI.
//!
//! The `image` crate's PNG encoder has no way to write the `pHYs` chunk, and
//! without it print dialogs and layout tools assume 72 or 96 DPI and scale the
//! card to several times its real size. The `png` crate is used directly so the
//! resolution travels with the file, and `Compression::Best` with adaptive
//! filtering keeps 600 DPI card art as small as lossless allows.

use crate::error::ItemError;
use image::RgbaImage;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Pixels per metre for `dpi`, as stored in the PNG `pHYs` chunk.
pub fn pixels_per_metre(dpi: u32) -> u32 {
    (dpi as f64 / 0.0254).round() as u32
}

/// Encode `img` as an RGBA PNG at maximum compression with `dpi` metadata.
pub fn encode_png(img: &RgbaImage, dpi: u32) -> Result<Vec<u8>, png::EncodingError> {
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buf, img.width(), img.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Best);
        encoder.set_adaptive_filter(png::AdaptiveFilterType::Adaptive);
        let ppm = pixels_per_metre(dpi);
        encoder.set_pixel_dims(Some(png::PixelDimensions {
            xppu: ppm,
            yppu: ppm,
            unit: png::Unit::Meter,
        }));

        let mut writer = encoder.write_header()?;
        writer.write_image_data(img.as_raw())?;
        writer.finish()?;
    }
    debug!(
        "Encoded {}x{} @ {} DPI → {} bytes PNG",
        img.width(),
        img.height(),
        dpi,
        buf.len()
    );
    Ok(buf)
}

/// Encode and write `img` to `path` atomically.
///
/// The PNG is written to a temp file next to `path` and renamed into place,
/// so `path` either holds a complete image or does not exist.
pub fn save_png(img: &RgbaImage, path: &Path, dpi: u32) -> Result<(), ItemError> {
    let fail = |detail: String| ItemError::EncodeFailure {
        path: path.to_path_buf(),
        detail,
    };

    let bytes = encode_png(img, dpi).map_err(|e| fail(e.to_string()))?;
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| fail(e.to_string()))?;
    tmp.write_all(&bytes).map_err(|e| fail(e.to_string()))?;
    tmp.persist(path).map_err(|e| fail(e.error.to_string()))?;
    Ok(())
}
