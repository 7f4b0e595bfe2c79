//! Configuration types for proxy-sheet generation.
//!
//! All pipeline behaviour is controlled through [`SheetConfig`], built via its
//! [`SheetConfigBuilder`]. One struct carries every knob so the same config
//! can be handed to the converter, the layout engine, the renderer and the
//! compressor, and two runs can be compared by diffing their configs.

use crate::error::ProxyError;
use crate::progress::{CancelToken, ProgressCallback};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Millimetres per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// ISO A4 sheet, portrait, in millimetres.
pub const A4_MM: (f64, f64) = (210.0, 297.0);

/// Convert millimetres to PDF points.
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * POINTS_PER_INCH / MM_PER_INCH
}

/// Convert millimetres to whole pixels at `dpi`, rounding to nearest.
pub fn mm_to_px(mm: f64, dpi: u32) -> u32 {
    (mm / MM_PER_INCH * dpi as f64).round() as u32
}

/// Configuration for a proxy-sheet run.
///
/// Built via [`SheetConfig::builder()`] or using [`SheetConfig::default()`].
///
/// # Example
/// ```rust
/// use proxysheet::SheetConfig;
///
/// let config = SheetConfig::builder()
///     .dpi(300)
///     .grid(3, 3)
///     .workers(4)
///     .build()
///     .unwrap();
/// assert_eq!(config.target_pixels(), (744, 1039));
/// ```
#[derive(Clone)]
pub struct SheetConfig {
    /// Print resolution of the normalized images. Range: 72–1200. Default: 600.
    ///
    /// 600 DPI matches what home laser and inkjet printers resolve on card
    /// stock; 300 halves the pixel count on each axis for quicker test runs.
    pub dpi: u32,

    /// Physical card width in millimetres. Default: 63.
    pub card_width_mm: f64,

    /// Physical card height in millimetres. Default: 88.
    pub card_height_mm: f64,

    /// Grid columns per sheet. Default: 3.
    pub columns: u32,

    /// Grid rows per sheet. Default: 3.
    pub rows: u32,

    /// Maximum images resized at once. Default: available parallelism.
    pub workers: usize,

    /// Run the external compressor after rendering. Default: true.
    pub compress: bool,

    /// Ghostscript `-dPDFSETTINGS` preset. Default: [`CompressionPreset::Prepress`].
    pub preset: CompressionPreset,

    /// Explicit Ghostscript executable. If None, `PATH` is searched.
    pub ghostscript: Option<PathBuf>,

    /// Timeout for Scryfall requests and image downloads in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Printing languages to search, in preference order. Default: `["en", "pt"]`.
    pub languages: Vec<String>,

    /// Optional per-item progress events.
    pub progress_callback: Option<ProgressCallback>,

    /// Optional cooperative cancellation flag.
    pub cancel: Option<CancelToken>,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            dpi: 600,
            card_width_mm: 63.0,
            card_height_mm: 88.0,
            columns: 3,
            rows: 3,
            workers: default_workers(),
            compress: true,
            preset: CompressionPreset::default(),
            ghostscript: None,
            download_timeout_secs: 120,
            languages: vec!["en".to_string(), "pt".to_string()],
            progress_callback: None,
            cancel: None,
        }
    }
}

impl fmt::Debug for SheetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetConfig")
            .field("dpi", &self.dpi)
            .field("card_width_mm", &self.card_width_mm)
            .field("card_height_mm", &self.card_height_mm)
            .field("columns", &self.columns)
            .field("rows", &self.rows)
            .field("workers", &self.workers)
            .field("compress", &self.compress)
            .field("preset", &self.preset)
            .field("ghostscript", &self.ghostscript)
            .field("languages", &self.languages)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn SheetProgressCallback>"),
            )
            .finish()
    }
}

impl SheetConfig {
    /// Create a new builder for `SheetConfig`.
    pub fn builder() -> SheetConfigBuilder {
        SheetConfigBuilder {
            config: Self::default(),
        }
    }

    /// Pixel box every normalized image must match exactly: `(width, height)`.
    pub fn target_pixels(&self) -> (u32, u32) {
        (
            mm_to_px(self.card_width_mm, self.dpi),
            mm_to_px(self.card_height_mm, self.dpi),
        )
    }

    /// Card size in PDF points: `(width, height)`.
    pub fn card_points(&self) -> (f64, f64) {
        (mm_to_pt(self.card_width_mm), mm_to_pt(self.card_height_mm))
    }

    /// Sheet size in PDF points: `(width, height)`.
    pub fn sheet_points(&self) -> (f64, f64) {
        (mm_to_pt(A4_MM.0), mm_to_pt(A4_MM.1))
    }

    /// Grid cells per sheet.
    pub fn cells_per_page(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Builder for [`SheetConfig`].
pub struct SheetConfigBuilder {
    config: SheetConfig,
}

impl fmt::Debug for SheetConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SheetConfigBuilder")
            .field("config", &self.config)
            .finish()
    }
}

impl SheetConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 1200);
        self
    }

    pub fn card_size_mm(mut self, width: f64, height: f64) -> Self {
        self.config.card_width_mm = width;
        self.config.card_height_mm = height;
        self
    }

    pub fn grid(mut self, columns: u32, rows: u32) -> Self {
        self.config.columns = columns;
        self.config.rows = rows;
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n.max(1);
        self
    }

    pub fn compress(mut self, v: bool) -> Self {
        self.config.compress = v;
        self
    }

    pub fn preset(mut self, preset: CompressionPreset) -> Self {
        self.config.preset = preset;
        self
    }

    pub fn ghostscript(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.ghostscript = Some(path.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn languages<I, S>(mut self, langs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.languages = langs.into_iter().map(Into::into).collect();
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.config.cancel = Some(token);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<SheetConfig, ProxyError> {
        let c = &self.config;
        if !(c.card_width_mm > 0.0 && c.card_height_mm > 0.0) {
            return Err(ProxyError::InvalidConfig(format!(
                "Card size must be positive, got {}×{} mm",
                c.card_width_mm, c.card_height_mm
            )));
        }
        if c.columns == 0 || c.rows == 0 {
            return Err(ProxyError::InvalidConfig(format!(
                "Grid must have at least one column and one row, got {}×{}",
                c.columns, c.rows
            )));
        }
        let grid_w = c.columns as f64 * c.card_width_mm;
        let grid_h = c.rows as f64 * c.card_height_mm;
        if grid_w > A4_MM.0 || grid_h > A4_MM.1 {
            return Err(ProxyError::InvalidConfig(format!(
                "A {}×{} grid of {}×{} mm cards ({grid_w}×{grid_h} mm) does not fit on A4",
                c.columns, c.rows, c.card_width_mm, c.card_height_mm
            )));
        }
        if c.languages.is_empty() {
            return Err(ProxyError::InvalidConfig(
                "At least one search language is required".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Ghostscript `-dPDFSETTINGS` quality preset.
///
/// | Preset | Image resolution | Use case |
/// |--------|------------------|----------|
/// | `prepress` | 300 DPI, colour preserving | Home/print-shop printing (default) |
/// | `printer`  | 300 DPI | Office printers |
/// | `ebook`    | 150 DPI | On-screen proofs |
/// | `screen`   | 72 DPI  | Smallest file, previews only |
/// | `default`  | Ghostscript default | - |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionPreset {
    #[default]
    Prepress,
    Printer,
    Ebook,
    Screen,
    Default,
}

impl CompressionPreset {
    /// The value passed as `-dPDFSETTINGS=`.
    pub fn as_pdf_settings(&self) -> &'static str {
        match self {
            CompressionPreset::Prepress => "/prepress",
            CompressionPreset::Printer => "/printer",
            CompressionPreset::Ebook => "/ebook",
            CompressionPreset::Screen => "/screen",
            CompressionPreset::Default => "/default",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_target_box_at_600_dpi() {
        let config = SheetConfig::default();
        assert_eq!(config.target_pixels(), (1488, 2079));
    }

    #[test]
    fn a4_in_points() {
        let (w, h) = SheetConfig::default().sheet_points();
        assert!((w - 595.2756).abs() < 1e-3, "got {w}");
        assert!((h - 841.8898).abs() < 1e-3, "got {h}");
    }

    #[test]
    fn dpi_is_clamped() {
        let config = SheetConfig::builder().dpi(10).build().unwrap();
        assert_eq!(config.dpi, 72);
        let config = SheetConfig::builder().dpi(5000).build().unwrap();
        assert_eq!(config.dpi, 1200);
    }

    #[test]
    fn workers_at_least_one() {
        let config = SheetConfig::builder().workers(0).build().unwrap();
        assert_eq!(config.workers, 1);
    }

    #[test]
    fn empty_grid_rejected() {
        let err = SheetConfig::builder().grid(0, 3).build().unwrap_err();
        assert!(matches!(err, ProxyError::InvalidConfig(_)));
    }

    #[test]
    fn oversized_grid_rejected() {
        // Four 63 mm columns are 252 mm, wider than A4.
        let err = SheetConfig::builder().grid(4, 3).build().unwrap_err();
        assert!(err.to_string().contains("does not fit"), "got: {err}");
    }

    #[test]
    fn no_languages_rejected() {
        let err = SheetConfig::builder()
            .languages(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidConfig(_)));
    }

    #[test]
    fn preset_settings_flag() {
        assert_eq!(CompressionPreset::default().as_pdf_settings(), "/prepress");
        assert_eq!(CompressionPreset::Screen.as_pdf_settings(), "/screen");
    }
}
