//! Eager entry points: convert a folder, build a sheet, or both.
//!
//! ## Why eager vs. streaming?
//!
//! [`convert_all`] waits for every image and returns one [`ConvertReport`].
//! Use [`crate::stream::convert_stream`] instead when statuses should be shown
//! as each unit finishes without implementing a progress callback.
//!
//! ## Concurrency
//!
//! Each source image is one unit of work: decode, resize, encode, write. Units
//! run on Tokio's blocking pool, at most [`SheetConfig::workers`] at once, and
//! share no mutable state; each writes only its own output file. A failure in
//! one unit is recorded in its status and never aborts the others.

use crate::config::SheetConfig;
use crate::error::{ItemError, ProxyError};
use crate::output::{ConvertReport, ConvertStatus, RunOutput, SheetOutput, SkipReason};
use crate::pipeline::{compress, encode, input, layout, render, resize};
use futures::stream::{self, Stream, StreamExt};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert every eligible image in `input_dir` to a print-ready PNG in
/// `output_dir`.
///
/// # Returns
/// `Ok(ConvertReport)` with one status per eligible file, even if some failed
/// (check [`ConvertReport::failed`]).
///
/// # Errors
/// Returns `Err(ProxyError)` only when a directory is unusable:
/// - input directory missing or unreadable
/// - output directory cannot be created or written
pub async fn convert_all(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &SheetConfig,
) -> Result<ConvertReport, ProxyError> {
    let start = Instant::now();
    let units = plan(input_dir.as_ref(), output_dir.as_ref())?;
    let total = units.len();
    let target_px = config.target_pixels();
    info!(
        "Converting {} images to {}x{} px at {} DPI with {} workers",
        total, target_px.0, target_px.1, config.dpi, config.workers
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut statuses = Vec::with_capacity(total);
    let mut pending = unit_stream(units, config);
    while let Some(status) = pending.next().await {
        if let Some(ref cb) = config.progress_callback {
            cb.on_item_complete(&status, total);
        }
        statuses.push(status);
    }

    let report = ConvertReport {
        statuses,
        target_px,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Conversion finished: {} converted, {} skipped, {} failed, {} cancelled in {}ms",
        report.converted(),
        report.skipped(),
        report.failed(),
        report.cancelled(),
        report.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(report.converted(), report.skipped(), report.failed());
    }
    Ok(report)
}

/// Lay out the images in `cards_dir`, render them to `pdf_path`, and
/// optionally compress the result.
///
/// `compressed_path` defaults to `<stem>_compressed.pdf` next to `pdf_path`.
///
/// # Errors
/// - [`ProxyError::NothingToRender`] when `cards_dir` holds no images
/// - [`ProxyError::OutputWriteFailed`] when the PDF cannot be written
///
/// A missing or failing Ghostscript is not an error; see
/// [`SheetOutput::compression`].
pub async fn build_sheet(
    cards_dir: impl AsRef<Path>,
    pdf_path: impl AsRef<Path>,
    compressed_path: Option<&Path>,
    config: &SheetConfig,
) -> Result<SheetOutput, ProxyError> {
    let start = Instant::now();
    let cards_dir = cards_dir.as_ref();
    let pdf_path = pdf_path.as_ref();

    // ── Layout ───────────────────────────────────────────────────────────
    let pages = layout::layout_dir(cards_dir, config)?;
    if pages.is_empty() {
        return Err(ProxyError::NothingToRender {
            dir: cards_dir.to_path_buf(),
        });
    }
    let page_placements: Vec<usize> = pages.iter().map(|p| p.placements.len()).collect();

    // ── Render ───────────────────────────────────────────────────────────
    if let Some(parent) = pdf_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ProxyError::OutputWriteFailed {
                path: pdf_path.to_path_buf(),
                source: e,
            })?;
    }
    let render_stats = render::render(pages, pdf_path, config).await?;

    // ── Compress ─────────────────────────────────────────────────────────
    let compressed = compressed_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| compress::default_compressed_path(pdf_path));
    let compression = compress::compress_pdf(pdf_path, &compressed, config).await?;

    let output = SheetOutput {
        pdf_path: pdf_path.to_path_buf(),
        compression,
        render: render_stats,
        page_placements,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Sheet ready: {} ({} pages, {}ms)",
        output.final_artifact().display(),
        output.render.pages,
        output.duration_ms
    );
    Ok(output)
}

/// Convert `input_dir` into `cards_dir`, then build the sheet from `cards_dir`.
///
/// The sheet is built from everything in `cards_dir`, including cards
/// converted by earlier runs. A cancelled conversion stops before the sheet.
pub async fn run(
    input_dir: impl AsRef<Path>,
    cards_dir: impl AsRef<Path>,
    pdf_path: impl AsRef<Path>,
    config: &SheetConfig,
) -> Result<RunOutput, ProxyError> {
    let cards_dir = cards_dir.as_ref();
    let convert = convert_all(input_dir, cards_dir, config).await?;
    if config.is_cancelled() {
        return Err(ProxyError::Cancelled);
    }
    let sheet = build_sheet(cards_dir, pdf_path, None, config).await?;
    Ok(RunOutput { convert, sheet })
}

/// Synchronous wrapper around [`convert_all`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_all_sync(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &SheetConfig,
) -> Result<ConvertReport, ProxyError> {
    runtime()?.block_on(convert_all(input_dir, output_dir, config))
}

/// Synchronous wrapper around [`build_sheet`] with the default compressed path.
pub fn build_sheet_sync(
    cards_dir: impl AsRef<Path>,
    pdf_path: impl AsRef<Path>,
    config: &SheetConfig,
) -> Result<SheetOutput, ProxyError> {
    runtime()?.block_on(build_sheet(cards_dir, pdf_path, None, config))
}

/// Synchronous wrapper around [`run`].
pub fn run_sync(
    input_dir: impl AsRef<Path>,
    cards_dir: impl AsRef<Path>,
    pdf_path: impl AsRef<Path>,
    config: &SheetConfig,
) -> Result<RunOutput, ProxyError> {
    runtime()?.block_on(run(input_dir, cards_dir, pdf_path, config))
}

fn runtime() -> Result<tokio::runtime::Runtime, ProxyError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ProxyError::Internal(format!("Failed to create tokio runtime: {}", e)))
}

// ── Units of work ────────────────────────────────────────────────────────

/// One source image and where its normalized copy goes.
#[derive(Debug, Clone)]
pub(crate) struct Unit {
    pub source: PathBuf,
    pub output: PathBuf,
    /// An earlier input in sorted order already maps to `output`.
    pub duplicate: bool,
}

/// Validate both directories and pair each input with its output path.
///
/// Fails before any work is dispatched, so a bad directory never leaves a
/// half-converted batch behind.
pub(crate) fn plan(input_dir: &Path, output_dir: &Path) -> Result<Vec<Unit>, ProxyError> {
    let files = input::list_images(input_dir)?;
    input::ensure_output_dir(output_dir)?;

    let mut claimed = HashSet::new();
    Ok(files
        .into_iter()
        .map(|source| {
            let output = input::normalized_output_path(&source, output_dir);
            let duplicate = !claimed.insert(output.clone());
            Unit {
                source,
                output,
                duplicate,
            }
        })
        .collect())
}

/// Run `units` with at most `config.workers` in flight, yielding statuses in
/// completion order.
pub(crate) fn unit_stream(
    units: Vec<Unit>,
    config: &SheetConfig,
) -> impl Stream<Item = ConvertStatus> + Send + 'static {
    let workers = config.workers.max(1);
    let config = config.clone();
    stream::iter(units)
        .map(move |unit| run_unit(unit, config.clone()))
        .buffer_unordered(workers)
}

async fn run_unit(unit: Unit, config: SheetConfig) -> ConvertStatus {
    let status = if config.is_cancelled() {
        ConvertStatus::Cancelled {
            source: unit.source,
        }
    } else if unit.duplicate {
        ConvertStatus::Skipped {
            source: unit.source,
            output: unit.output,
            reason: SkipReason::DuplicateStem,
        }
    } else {
        let (target_w, target_h) = config.target_pixels();
        let dpi = config.dpi;
        let source = unit.source.clone();
        tokio::task::spawn_blocking(move || {
            convert_file(&unit.source, &unit.output, target_w, target_h, dpi)
        })
        .await
        .unwrap_or_else(|e| ConvertStatus::Failed {
            error: ItemError::EncodeFailure {
                path: source.clone(),
                detail: format!("conversion task panicked: {e}"),
            },
            source,
        })
    };

    match &status {
        ConvertStatus::Converted { .. } | ConvertStatus::Cancelled { .. } => debug!("{status}"),
        ConvertStatus::Skipped { .. } => info!("{status}"),
        ConvertStatus::Failed { .. } => warn!("{status}"),
    }
    status
}

/// Convert one image: skip if `output` exists, else decode, resize, write.
///
/// Blocking; called on the blocking pool by [`convert_all`].
pub fn convert_file(
    source: &Path,
    output: &Path,
    target_w: u32,
    target_h: u32,
    dpi: u32,
) -> ConvertStatus {
    if output.exists() {
        return ConvertStatus::Skipped {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            reason: SkipReason::AlreadyExists,
        };
    }

    let failed = |error| ConvertStatus::Failed {
        source: source.to_path_buf(),
        error,
    };
    let decode_failure = |detail: String| ItemError::DecodeFailure {
        path: source.to_path_buf(),
        detail,
    };

    let img = match image::open(source) {
        Ok(img) => img,
        Err(e) => return failed(decode_failure(e.to_string())),
    };
    let Some(resolved) = resize::resolve(&img, target_w, target_h) else {
        return failed(decode_failure(format!(
            "cannot fit {}x{} image into {}x{}",
            img.width(),
            img.height(),
            target_w,
            target_h
        )));
    };
    drop(img);

    match encode::save_png(&resolved, output, dpi) {
        Ok(()) => ConvertStatus::Converted {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
        },
        Err(e) => failed(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::CancelToken;
    use image::{Rgba, RgbaImage};

    fn write_image(dir: &Path, name: &str, w: u32, h: u32) {
        image::DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, Rgba([120, 40, 200, 255])))
            .save(dir.join(name))
            .unwrap();
    }

    fn small_config() -> SheetConfig {
        // 72 DPI keeps the target box tiny: 179x249 px.
        SheetConfig::builder().dpi(72).workers(2).build().unwrap()
    }

    #[test]
    fn convert_file_writes_exact_box() {
        let dir = tempfile::tempdir().unwrap();
        write_image(dir.path(), "wide.png", 80, 60);
        let out = dir.path().join("out.png");
        let status = convert_file(&dir.path().join("wide.png"), &out, 63, 88, 300);
        assert!(matches!(status, ConvertStatus::Converted { .. }), "{status}");
        let img = image::open(&out).unwrap();
        assert_eq!((img.width(), img.height()), (63, 88));
    }

    #[test]
    fn convert_file_reports_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("broken.jpg");
        std::fs::write(&src, b"definitely not a jpeg").unwrap();
        let out = dir.path().join("broken.png");
        let status = convert_file(&src, &out, 63, 88, 300);
        assert!(matches!(
            status,
            ConvertStatus::Failed {
                error: ItemError::DecodeFailure { .. },
                ..
            }
        ));
        assert!(!out.exists());
    }

    #[test]
    fn plan_marks_duplicate_stems() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_image(input.path(), "bolt.jpg", 4, 4);
        write_image(input.path(), "bolt.png", 4, 4);
        write_image(input.path(), "elf.png", 4, 4);

        let units = plan(input.path(), output.path()).unwrap();
        let flags: Vec<(String, bool)> = units
            .iter()
            .map(|u| {
                (
                    u.source.file_name().unwrap().to_string_lossy().into_owned(),
                    u.duplicate,
                )
            })
            .collect();
        assert_eq!(
            flags,
            vec![
                ("bolt.jpg".to_string(), false),
                ("bolt.png".to_string(), true),
                ("elf.png".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn second_run_skips_everything() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_image(input.path(), "a.png", 30, 40);
        write_image(input.path(), "b.jpg", 40, 30);
        let config = small_config();

        let first = convert_all(input.path(), output.path(), &config).await.unwrap();
        assert_eq!(first.converted(), 2);
        assert_eq!(first.target_px, (179, 249));

        let second = convert_all(input.path(), output.path(), &config).await.unwrap();
        assert_eq!(second.converted(), 0);
        assert_eq!(second.skipped(), 2);
    }

    #[tokio::test]
    async fn one_bad_file_does_not_stop_the_batch() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_image(input.path(), "good.png", 30, 40);
        std::fs::write(input.path().join("bad.png"), b"nope").unwrap();

        let report = convert_all(input.path(), output.path(), &small_config())
            .await
            .unwrap();
        assert_eq!(report.converted(), 1);
        assert_eq!(report.failed(), 1);
        assert!(output.path().join("good.png").exists());
    }

    #[tokio::test]
    async fn cancelled_before_start_converts_nothing() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        write_image(input.path(), "a.png", 30, 40);
        let token = CancelToken::new();
        token.cancel();
        let config = SheetConfig::builder()
            .dpi(72)
            .cancel_token(token)
            .build()
            .unwrap();

        let report = convert_all(input.path(), output.path(), &config).await.unwrap();
        assert_eq!(report.cancelled(), 1);
        assert!(!output.path().join("a.png").exists());
    }

    #[tokio::test]
    async fn missing_input_dir_is_fatal() {
        let output = tempfile::tempdir().unwrap();
        let err = convert_all("/no/such/imagens", output.path(), &small_config())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::InputDirUnreadable { .. }));
    }

    #[tokio::test]
    async fn empty_cards_dir_has_nothing_to_render() {
        let cards = tempfile::tempdir().unwrap();
        let pdf = cards.path().join("sheet.pdf");
        let err = build_sheet(cards.path(), &pdf, None, &small_config())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::NothingToRender { .. }));
    }
}
