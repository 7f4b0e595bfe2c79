//! PDF emission: turn [`PageLayout`]s into an A4 document with `lopdf`.
//!
//! ## Why spawn_blocking?
//!
//! Decoding 600 DPI card PNGs and Flate-compressing the document are CPU-bound
//! and take hundreds of milliseconds per image. [`render`] moves the whole
//! document build onto the blocking pool so Tokio worker threads keep serving
//! the rest of the application.
//!
//! ## Image reuse
//!
//! A deck typically repeats the same basic land or staple many times. Each
//! distinct path is decoded and embedded once through an [`ImageCache`], and
//! every later placement (on any page) references the same XObject. A path
//! that fails to decode is cached as a miss and never retried in the same run.
//!
//! ## Transparency
//!
//! PDF image XObjects carry colour and alpha separately: RGB samples in the
//! image stream and a `DeviceGray` soft mask (`/SMask`) for alpha. The mask is
//! only written for images with at least one non-opaque pixel, so ordinary
//! opaque scans cost no extra bytes.

use crate::config::SheetConfig;
use crate::error::{ItemError, ProxyError};
use crate::output::RenderStats;
use crate::pipeline::layout::{GuideLine, PageLayout, Placement, SheetGeometry};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Stroke width of cut guides, in points.
pub const GUIDE_LINE_WIDTH: f64 = 0.5;

/// Gray level (0 = black, 1 = white) of cut guides.
pub const GUIDE_GRAY: f64 = 0.8;

// ── Image cache ──────────────────────────────────────────────────────────

/// Per-run mapping from image path to a loaded handle.
///
/// Failed loads are remembered as `None`, so each distinct path is loaded at
/// most once no matter how many placements reference it.
#[derive(Debug)]
pub struct ImageCache<H> {
    entries: HashMap<PathBuf, Option<H>>,
    loads: usize,
}

impl<H> Default for ImageCache<H> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            loads: 0,
        }
    }
}

impl<H: Clone> ImageCache<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached handle for `path`, calling `load` on first use only.
    pub fn get_or_insert_with<F>(&mut self, path: &Path, load: F) -> Option<H>
    where
        F: FnOnce() -> Option<H>,
    {
        if let Some(entry) = self.entries.get(path) {
            return entry.clone();
        }
        self.loads += 1;
        let handle = load();
        self.entries.insert(path.to_path_buf(), handle.clone());
        handle
    }

    /// Number of times a loader actually ran.
    pub fn loads(&self) -> usize {
        self.loads
    }
}

/// An image XObject already added to the document.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    /// Resource name used by `Do`, e.g. `Im3`.
    pub name: String,
    pub id: ObjectId,
    pub width: u32,
    pub height: u32,
    pub has_alpha: bool,
}

/// Decode `path` and add it to `doc` as an RGB XObject, with a soft mask when
/// any pixel is translucent.
pub fn embed_image(doc: &mut Document, path: &Path, name: String) -> Result<EmbeddedImage, ItemError> {
    let rgba = image::open(path)
        .map_err(|e| ItemError::DecodeFailure {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?
        .to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(ItemError::DecodeFailure {
            path: path.to_path_buf(),
            detail: "image has no pixels".into(),
        });
    }

    let pixel_count = width as usize * height as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    for px in rgba.pixels() {
        rgb.extend_from_slice(&px.0[..3]);
        alpha.push(px.0[3]);
    }
    let has_alpha = alpha.iter().any(|&a| a != u8::MAX);

    let mut image_dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width as i64,
        "Height" => height as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8,
    };
    if has_alpha {
        let smask = compressed_stream(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width as i64,
                "Height" => height as i64,
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8,
            },
            alpha,
            path,
        )?;
        let smask_id = doc.add_object(smask);
        image_dict.set("SMask", smask_id);
    }
    let id = doc.add_object(compressed_stream(image_dict, rgb, path)?);

    debug!(
        "Embedded '{}' as /{} ({}x{}{})",
        path.display(),
        name,
        width,
        height,
        if has_alpha { ", soft mask" } else { "" }
    );
    Ok(EmbeddedImage {
        name,
        id,
        width,
        height,
        has_alpha,
    })
}

/// Flate-compress raw samples right away; only the compressed bytes stay
/// in the document until it is saved.
fn compressed_stream(dict: Dictionary, samples: Vec<u8>, path: &Path) -> Result<Stream, ItemError> {
    let mut stream = Stream::new(dict, samples);
    stream.compress().map_err(|e| ItemError::EncodeFailure {
        path: path.to_path_buf(),
        detail: format!("Flate compression failed: {e}"),
    })?;
    Ok(stream)
}

// ── Content stream helpers ───────────────────────────────────────────────

fn real(v: f64) -> Object {
    Object::Real(v as f32)
}

/// Rectangle `(x, y, w, h)` that fits an `img_w × img_h` image inside
/// `placement`'s cell without distortion, centered on both axes.
pub fn fit_in_cell(placement: &Placement, img_w: u32, img_h: u32) -> (f64, f64, f64, f64) {
    let img_ratio = img_w as f64 / img_h as f64;
    let cell_ratio = placement.width / placement.height;
    let (w, h) = if img_ratio > cell_ratio {
        (placement.width, placement.width / img_ratio)
    } else {
        (placement.height * img_ratio, placement.height)
    };
    (
        placement.x + (placement.width - w) / 2.0,
        placement.y + (placement.height - h) / 2.0,
        w,
        h,
    )
}

fn draw_image_ops(ops: &mut Vec<Operation>, image: &EmbeddedImage, rect: (f64, f64, f64, f64)) {
    let (x, y, w, h) = rect;
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new(
        "cm",
        vec![real(w), real(0.0), real(0.0), real(h), real(x), real(y)],
    ));
    ops.push(Operation::new(
        "Do",
        vec![Object::Name(image.name.as_bytes().to_vec())],
    ));
    ops.push(Operation::new("Q", vec![]));
}

fn draw_guides_ops(ops: &mut Vec<Operation>, guides: &[GuideLine]) {
    ops.push(Operation::new("q", vec![]));
    ops.push(Operation::new("w", vec![real(GUIDE_LINE_WIDTH)]));
    ops.push(Operation::new(
        "RG",
        vec![real(GUIDE_GRAY), real(GUIDE_GRAY), real(GUIDE_GRAY)],
    ));
    for line in guides {
        ops.push(Operation::new("m", vec![real(line.x1), real(line.y1)]));
        ops.push(Operation::new("l", vec![real(line.x2), real(line.y2)]));
        ops.push(Operation::new("S", vec![]));
    }
    ops.push(Operation::new("Q", vec![]));
}

// ── Document assembly ────────────────────────────────────────────────────

/// Render `pages` to a PDF at `output_path`.
///
/// This runs inside `spawn_blocking`; see the module docs.
pub async fn render(
    pages: Vec<PageLayout>,
    output_path: &Path,
    config: &SheetConfig,
) -> Result<RenderStats, ProxyError> {
    let path = output_path.to_path_buf();
    let config = config.clone();

    tokio::task::spawn_blocking(move || render_blocking(&pages, &path, &config))
        .await
        .map_err(|e| ProxyError::Internal(format!("Render task panicked: {}", e)))?
}

/// Blocking implementation of [`render`].
pub fn render_blocking(
    pages: &[PageLayout],
    output_path: &Path,
    config: &SheetConfig,
) -> Result<RenderStats, ProxyError> {
    let pdf_err = |detail: String| ProxyError::PdfWriteFailed {
        path: output_path.to_path_buf(),
        detail,
    };
    if pages.is_empty() {
        return Err(pdf_err("no pages to render".into()));
    }

    let geometry = SheetGeometry::from_config(config);
    let media_box = vec![
        real(0.0),
        real(0.0),
        real(geometry.sheet_width),
        real(geometry.sheet_height),
    ];

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let mut cache: ImageCache<EmbeddedImage> = ImageCache::new();
    let mut stats = RenderStats::default();
    let mut kids = Vec::with_capacity(pages.len());
    let total_pages = pages.len();

    for page in pages {
        if config.is_cancelled() {
            info!("Render cancelled before page {}", page.number);
            return Err(ProxyError::Cancelled);
        }

        let mut ops = Vec::new();
        let mut xobjects = Dictionary::new();
        let mut drawn = 0usize;

        for placement in &page.placements {
            let next_name = format!("Im{}", cache.loads() + 1);
            let embedded = cache.get_or_insert_with(&placement.image, || {
                match embed_image(&mut doc, &placement.image, next_name) {
                    Ok(img) => Some(img),
                    Err(e) => {
                        warn!("{e}. Placements of this image are skipped.");
                        None
                    }
                }
            });
            let Some(image) = embedded else {
                stats.placements_skipped += 1;
                continue;
            };

            xobjects.set(image.name.as_bytes().to_vec(), image.id);
            draw_image_ops(&mut ops, &image, fit_in_cell(placement, image.width, image.height));
            drawn += 1;
        }
        draw_guides_ops(&mut ops, &page.guides);

        let content = Content { operations: ops }
            .encode()
            .map_err(|e| pdf_err(format!("page {}: {}", page.number, e)))?;
        let content_id = doc.add_object(Stream::new(Dictionary::new(), content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => media_box.clone(),
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => xobjects,
            },
        });
        kids.push(Object::Reference(page_id));

        stats.pages += 1;
        stats.placements_drawn += drawn;
        debug!(
            "Page {}/{}: {} of {} placements drawn",
            page.number,
            total_pages,
            drawn,
            page.placements.len()
        );
        if let Some(cb) = &config.progress_callback {
            cb.on_page_rendered(page.number, total_pages, drawn);
        }
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => total_pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.compress();

    save_atomically(&mut doc, output_path)?;
    stats.images_decoded = cache.loads();

    info!(
        "Wrote {} ({} pages, {} placements, {} distinct images)",
        output_path.display(),
        stats.pages,
        stats.placements_drawn,
        stats.images_decoded
    );
    Ok(stats)
}

fn save_atomically(doc: &mut Document, path: &Path) -> Result<(), ProxyError> {
    let write_err = |source| ProxyError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    doc.save_to(&mut tmp).map_err(|e| ProxyError::PdfWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
