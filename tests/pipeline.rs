//! Offline integration tests: folder of source images → card PNGs → A4 PDF.
//!
//! Everything runs against generated images in temp directories; no network
//! and no Ghostscript are needed.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use image::{Rgb, RgbImage};
use lopdf::{Document, Object};
use proxysheet::pipeline::encode::pixels_per_metre;
use proxysheet::{
    build_sheet, convert_all, layout_dir, run, CompressOutcome, ConvertStatus, ProxyError,
    SheetConfig, SkipReason,
};
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn write_source(dir: &Path, name: &str, w: u32, h: u32, colour: [u8; 3]) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(w, h, Rgb(colour)).save(&path).unwrap();
    path
}

fn config(dpi: u32) -> SheetConfig {
    SheetConfig::builder()
        .dpi(dpi)
        .workers(2)
        .compress(false)
        .build()
        .unwrap()
}

fn file_names(paths: impl IntoIterator<Item = PathBuf>) -> Vec<String> {
    paths
        .into_iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

fn image_xobject_count(doc: &Document) -> usize {
    doc.objects
        .values()
        .filter(|obj| match obj {
            Object::Stream(s) => matches!(
                s.dict.get(b"Subtype"),
                Ok(Object::Name(name)) if name.as_slice() == b"Image"
            ),
            _ => false,
        })
        .count()
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn full_run_at_print_resolution() {
    let root = tempfile::tempdir().unwrap();
    let imagens = root.path().join("imagens");
    let cartas = root.path().join("cartas");
    std::fs::create_dir_all(&imagens).unwrap();
    write_source(&imagens, "fireball.png", 800, 600, [200, 40, 20]);
    write_source(&imagens, "(2x)lightning.png", 600, 800, [240, 220, 40]);

    let pdf = root.path().join("cartas_A4.pdf");
    let out = run(&imagens, &cartas, &pdf, &config(600)).await.unwrap();

    // Both sources converted to the exact 63×88 mm box at 600 DPI.
    assert_eq!(out.convert.converted(), 2);
    assert_eq!(out.convert.target_px, (1488, 2079));
    for name in ["fireball.png", "(2x)lightning.png"] {
        let card = cartas.join(name);
        assert_eq!(image::image_dimensions(&card).unwrap(), (1488, 2079));

        let decoder = png::Decoder::new(std::fs::File::open(&card).unwrap());
        let reader = decoder.read_info().unwrap();
        let dims = reader.info().pixel_dims.expect("pHYs chunk");
        assert_eq!(dims.xppu, pixels_per_metre(600));
        assert_eq!(dims.yppu, pixels_per_metre(600));
        assert_eq!(dims.unit, png::Unit::Meter);
    }

    // One page, three placements, in display-name order with repeats.
    assert_eq!(out.sheet.page_placements, vec![3]);
    assert_eq!(out.sheet.render.pages, 1);
    assert_eq!(out.sheet.render.placements_drawn, 3);
    assert_eq!(out.sheet.render.images_decoded, 2);
    let pages = layout_dir(&cartas, &config(600)).unwrap();
    assert_eq!(
        file_names(pages[0].placements.iter().map(|p| p.image.clone())),
        vec!["fireball.png", "(2x)lightning.png", "(2x)lightning.png"]
    );

    // The PDF is valid, one A4 page, and embeds each distinct image once.
    let doc = Document::load(&pdf).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
    assert_eq!(image_xobject_count(&doc), 2);

    assert!(matches!(
        out.sheet.compression,
        CompressOutcome::Skipped { .. }
    ));
    assert_eq!(out.sheet.final_artifact(), pdf.as_path());
}

#[tokio::test]
async fn second_conversion_skips_existing_outputs() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_source(input.path(), "elf.png", 120, 90, [20, 160, 40]);
    write_source(input.path(), "bolt.jpg", 90, 120, [200, 20, 20]);

    let first = convert_all(input.path(), output.path(), &config(72))
        .await
        .unwrap();
    assert_eq!(first.converted(), 2);
    let written = std::fs::read(output.path().join("elf.png")).unwrap();

    let second = convert_all(input.path(), output.path(), &config(72))
        .await
        .unwrap();
    assert_eq!(second.converted(), 0);
    assert_eq!(second.skipped(), 2);
    assert!(second.statuses.iter().all(|s| matches!(
        s,
        ConvertStatus::Skipped {
            reason: SkipReason::AlreadyExists,
            ..
        }
    )));
    assert_eq!(std::fs::read(output.path().join("elf.png")).unwrap(), written);
}

#[tokio::test]
async fn broken_source_does_not_stop_the_batch() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_source(input.path(), "good.png", 64, 64, [10, 10, 200]);
    std::fs::write(input.path().join("broken.png"), b"not a png").unwrap();
    std::fs::write(input.path().join("notes.txt"), b"ignored").unwrap();

    let report = convert_all(input.path(), output.path(), &config(72))
        .await
        .unwrap();
    assert_eq!(report.statuses.len(), 2);
    assert_eq!(report.converted(), 1);
    assert_eq!(report.failed(), 1);
    assert!(output.path().join("good.png").exists());
    assert!(!output.path().join("broken.png").exists());
}

#[tokio::test]
async fn ten_cards_spill_onto_a_second_page() {
    let cards = tempfile::tempdir().unwrap();
    write_source(cards.path(), "(10x)island.png", 179, 249, [30, 60, 200]);

    let pdf = cards.path().join("out").join("sheet.pdf");
    let sheet = build_sheet(cards.path(), &pdf, None, &config(72))
        .await
        .unwrap();
    assert_eq!(sheet.page_placements, vec![9, 1]);
    assert_eq!(sheet.render.images_decoded, 1);

    let doc = Document::load(&pdf).unwrap();
    assert_eq!(doc.get_pages().len(), 2);
    assert_eq!(image_xobject_count(&doc), 1);
}

#[tokio::test]
async fn empty_cards_directory_is_an_error() {
    let cards = tempfile::tempdir().unwrap();
    let pdf = cards.path().join("sheet.pdf");
    let err = build_sheet(cards.path(), &pdf, None, &config(72))
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::NothingToRender { .. }));
    assert!(!pdf.exists());
}

#[tokio::test]
async fn missing_input_directory_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    let err = convert_all(root.path().join("nope"), root.path().join("out"), &config(72))
        .await
        .unwrap_err();
    assert!(matches!(err, ProxyError::InputDirUnreadable { .. }));
    assert!(!root.path().join("out").exists());
}
