//! Layout engine: repeat expansion, pagination and grid geometry.
//!
//! ## Repeat annotations
//!
//! A file named `(4x)Lightning Bolt.png` stands for four copies of the card.
//! The token may appear anywhere in the name; a name without one counts once.
//! A token whose number does not fit a `u32` is logged and counted once, so a
//! malformed name never fails the run. Counts above [`MAX_REPEAT`] are clamped.
//!
//! ## Ordering
//!
//! Files are ordered by name with the repeat token removed, ties broken by the
//! full name. `(2x)lightning.png` therefore sorts next to `lightning.png`, not
//! ahead of every other card because of the leading parenthesis. For a given
//! directory snapshot the page assignment is fully deterministic.
//!
//! ## Geometry
//!
//! PDF user space has its origin at the bottom-left of the sheet. Grid row 0 is
//! the *top* row, so a cell's `y` is counted from the bottom:
//!
//! ```text
//! y = margin_y + (rows - row_from_top - 1) * card_h
//! ```
//!
//! Cut guides run edge to edge across the whole sheet, not only across the
//! grid, so they are still visible after the printer's own margins are trimmed.

use crate::config::SheetConfig;
use crate::error::{ItemError, ProxyError};
use crate::pipeline::input;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

static RE_REPEAT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\((\d+)x\)").unwrap());

/// Largest repeat count honoured for a single file (111 full 3×3 pages).
pub const MAX_REPEAT: u32 = 999;

/// Parse the repeat annotation embedded in a file name.
///
/// * `Ok(None)`: no `(Nx)` token
/// * `Ok(Some(n))`: first token found
/// * `Err(_)`: token present but the number is out of range
pub fn repeat_annotation(name: &str) -> Result<Option<u32>, ItemError> {
    let Some(caps) = RE_REPEAT.captures(name) else {
        return Ok(None);
    };
    caps[1]
        .parse::<u32>()
        .map(Some)
        .map_err(|e| ItemError::ParseFailure {
            name: name.to_string(),
            detail: e.to_string(),
        })
}

/// How many grid cells the file `name` occupies. Never fails: a missing or
/// malformed token counts as 1, and a huge one is clamped to [`MAX_REPEAT`].
pub fn repeat_count(name: &str) -> u32 {
    match repeat_annotation(name) {
        Ok(Some(n)) if n > MAX_REPEAT => {
            warn!("'{}' asks for {}x; using {}x", name, n, MAX_REPEAT);
            MAX_REPEAT
        }
        Ok(Some(n)) => {
            debug!("'{}' repeats {}x", name, n);
            n
        }
        Ok(None) => 1,
        Err(e) => {
            warn!("{e}. Using 1x.");
            1
        }
    }
}

/// `name` without its repeat tokens, used as the primary sort key.
pub fn display_name(name: &str) -> String {
    RE_REPEAT.replace_all(name, "").into_owned()
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Sort paths into layout order: by display name, then by full file name.
pub fn sort_for_layout(paths: &mut [PathBuf]) {
    paths.sort_by_cached_key(|p| {
        let name = file_name_of(p);
        (display_name(&name), name)
    });
}

/// Repeat each path by its annotation count, preserving relative order.
pub fn expand(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut expanded = Vec::with_capacity(paths.len());
    for path in paths {
        let count = repeat_count(&file_name_of(path));
        if count == 0 {
            warn!("'{}' is annotated (0x); it will not be placed", path.display());
        }
        expanded.extend(std::iter::repeat_n(path.clone(), count as usize));
    }
    expanded
}

/// One image drawn into one grid cell, in PDF points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    pub image: PathBuf,
    pub column: u32,
    /// Row counted from the top of the sheet.
    pub row: u32,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// A straight cut-guide segment, in PDF points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GuideLine {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl GuideLine {
    pub fn is_vertical(&self) -> bool {
        self.x1 == self.x2
    }
}

/// Everything needed to draw one physical page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    /// 1-indexed page number.
    pub number: usize,
    pub placements: Vec<Placement>,
    pub guides: Vec<GuideLine>,
}

/// Sheet, card and margin measurements for one grid configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SheetGeometry {
    pub sheet_width: f64,
    pub sheet_height: f64,
    pub card_width: f64,
    pub card_height: f64,
    pub columns: u32,
    pub rows: u32,
    pub margin_x: f64,
    pub margin_y: f64,
}

impl SheetGeometry {
    pub fn from_config(config: &SheetConfig) -> Self {
        let (sheet_width, sheet_height) = config.sheet_points();
        let (card_width, card_height) = config.card_points();
        let (columns, rows) = (config.columns, config.rows);
        Self {
            sheet_width,
            sheet_height,
            card_width,
            card_height,
            columns,
            rows,
            margin_x: (sheet_width - columns as f64 * card_width) / 2.0,
            margin_y: (sheet_height - rows as f64 * card_height) / 2.0,
        }
    }

    pub fn cells(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Place `image` in cell `idx` (0-indexed, row-major from the top-left).
    pub fn place(&self, idx: usize, image: PathBuf) -> Placement {
        let column = (idx % self.columns as usize) as u32;
        let row = (idx / self.columns as usize) as u32;
        Placement {
            image,
            column,
            row,
            x: self.margin_x + column as f64 * self.card_width,
            y: self.margin_y + (self.rows - row - 1) as f64 * self.card_height,
            width: self.card_width,
            height: self.card_height,
        }
    }

    /// Full-bleed cut guides for the complete grid: `columns + 1` vertical
    /// lines followed by `rows + 1` horizontal lines.
    pub fn guides(&self) -> Vec<GuideLine> {
        let vertical = (0..=self.columns).map(|c| {
            let x = self.margin_x + c as f64 * self.card_width;
            GuideLine {
                x1: x,
                y1: 0.0,
                x2: x,
                y2: self.sheet_height,
            }
        });
        let horizontal = (0..=self.rows).map(|r| {
            let y = self.margin_y + r as f64 * self.card_height;
            GuideLine {
                x1: 0.0,
                y1: y,
                x2: self.sheet_width,
                y2: y,
            }
        });
        vertical.chain(horizontal).collect()
    }
}

/// Lay out already-sorted paths: expand repeats, chunk into pages, place.
///
/// Every page, including a partial last page, carries the full guide set.
pub fn layout_paths(sorted: &[PathBuf], config: &SheetConfig) -> Vec<PageLayout> {
    let geometry = SheetGeometry::from_config(config);
    let expanded = expand(sorted);
    let guides = geometry.guides();

    expanded
        .chunks(geometry.cells())
        .enumerate()
        .map(|(i, chunk)| PageLayout {
            number: i + 1,
            placements: chunk
                .iter()
                .enumerate()
                .map(|(idx, path)| geometry.place(idx, path.clone()))
                .collect(),
            guides: guides.clone(),
        })
        .collect()
}

/// List `dir`, order it for layout, and lay it out.
///
/// The order is [`sort_for_layout`]'s, which is not a plain file-name sort:
/// `(2x)lightning.png` is placed after `fireball.png` even though `(` sorts
/// before `f`.
pub fn layout_dir(dir: &Path, config: &SheetConfig) -> Result<Vec<PageLayout>, ProxyError> {
    let mut files = input::list_images(dir)?;
    sort_for_layout(&mut files);
    let pages = layout_paths(&files, config);
    info!(
        "Laid out {} files from {} onto {} pages",
        files.len(),
        dir.display(),
        pages.len()
    );
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from("cartas").join(n)).collect()
    }

    fn names(pages: &PageLayout) -> Vec<String> {
        pages
            .placements
            .iter()
            .map(|p| file_name_of(&p.image))
            .collect()
    }

    #[test]
    fn annotation_parsing() {
        assert_eq!(repeat_annotation("(5x)bolt.png"), Ok(Some(5)));
        assert_eq!(repeat_annotation("bolt (12x).png"), Ok(Some(12)));
        assert_eq!(repeat_annotation("bolt.png"), Ok(None));
        assert_eq!(repeat_annotation("(x)bolt.png"), Ok(None));
        assert_eq!(repeat_annotation("(5X)bolt.png"), Ok(None));
        assert!(matches!(
            repeat_annotation("(99999999999x)bolt.png"),
            Err(ItemError::ParseFailure { .. })
        ));
    }

    #[test]
    fn malformed_count_falls_back_to_one() {
        assert_eq!(repeat_count("(99999999999x)bolt.png"), 1);
        assert_eq!(repeat_count("plain.png"), 1);
        assert_eq!(repeat_count("(3x)bolt.png"), 3);
    }

    #[test]
    fn expansion_keeps_sort_position() {
        let expanded = expand(&paths(&["a.png", "(3x)b.png", "c.png"]));
        let got: Vec<String> = expanded.iter().map(|p| file_name_of(p)).collect();
        assert_eq!(
            got,
            vec!["a.png", "(3x)b.png", "(3x)b.png", "(3x)b.png", "c.png"]
        );
    }

    #[test]
    fn huge_count_is_clamped() {
        assert_eq!(repeat_count("(4000000000x)island.png"), MAX_REPEAT);
        assert_eq!(repeat_count("(999x)island.png"), 999);
        let expanded = expand(&paths(&["(4000000000x)island.png", "bolt.png"]));
        assert_eq!(expanded.len(), MAX_REPEAT as usize + 1);
        assert_eq!(expanded.last(), Some(&PathBuf::from("cartas/bolt.png")));
    }

    #[test]
    fn zero_count_is_not_placed() {
        assert!(expand(&paths(&["(0x)gone.png"])).is_empty());
    }

    #[test]
    fn sort_ignores_repeat_token() {
        let mut files = paths(&["fireball.png", "(2x)lightning.png", "(9x)armor.png"]);
        sort_for_layout(&mut files);
        let got: Vec<String> = files.iter().map(|p| file_name_of(p)).collect();
        assert_eq!(got, vec!["(9x)armor.png", "fireball.png", "(2x)lightning.png"]);
    }

    #[test]
    fn pagination_9_9_2() {
        let config = SheetConfig::default();
        let files = paths(&["(20x)goblin.png"]);
        let pages = layout_paths(&files, &config);
        let counts: Vec<usize> = pages.iter().map(|p| p.placements.len()).collect();
        assert_eq!(counts, vec![9, 9, 2]);
        assert_eq!(
            pages.iter().map(|p| p.number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn grid_geometry_for_default_sheet() {
        let config = SheetConfig::default();
        let g = SheetGeometry::from_config(&config);
        let card_w = 63.0 * 72.0 / 25.4;
        let card_h = 88.0 * 72.0 / 25.4;
        assert!((g.margin_x - (g.sheet_width - 3.0 * card_w) / 2.0).abs() < 1e-9);
        assert!((g.margin_y - (g.sheet_height - 3.0 * card_h) / 2.0).abs() < 1e-9);

        // First placement is the top-left cell of the centered grid.
        let p = g.place(0, PathBuf::from("a.png"));
        assert_eq!((p.column, p.row), (0, 0));
        assert!((p.x - g.margin_x).abs() < 1e-9);
        assert!((p.y - (g.margin_y + 2.0 * card_h)).abs() < 1e-9);
        assert!((p.y + p.height - (g.sheet_height - g.margin_y)).abs() < 1e-9);

        // Last cell is bottom-right.
        let p = g.place(8, PathBuf::from("a.png"));
        assert_eq!((p.column, p.row), (2, 2));
        assert!((p.y - g.margin_y).abs() < 1e-9);
        assert!((p.x - (g.margin_x + 2.0 * card_w)).abs() < 1e-9);
    }

    #[test]
    fn guides_span_full_sheet() {
        let config = SheetConfig::default();
        let g = SheetGeometry::from_config(&config);
        let guides = g.guides();
        let vertical: Vec<_> = guides.iter().filter(|l| l.is_vertical()).collect();
        let horizontal: Vec<_> = guides.iter().filter(|l| !l.is_vertical()).collect();
        assert_eq!(vertical.len(), 4);
        assert_eq!(horizontal.len(), 4);
        for v in vertical {
            assert_eq!((v.y1, v.y2), (0.0, g.sheet_height));
        }
        for h in &horizontal {
            assert_eq!((h.x1, h.x2), (0.0, g.sheet_width));
        }
        assert!((horizontal[3].y1 - (g.margin_y + 3.0 * g.card_height)).abs() < 1e-9);
    }

    #[test]
    fn partial_page_keeps_all_guides() {
        let config = SheetConfig::default();
        let pages = layout_paths(&paths(&["(10x)elf.png"]), &config);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].placements.len(), 1);
        assert_eq!(pages[1].guides.len(), 8);
        assert_eq!(pages[1].guides, pages[0].guides);
    }

    #[test]
    fn non_square_grid() {
        let config = SheetConfig::builder().grid(2, 3).build().unwrap();
        let pages = layout_paths(&paths(&["a.png", "b.png", "c.png"]), &config);
        let p = &pages[0].placements;
        assert_eq!((p[1].column, p[1].row), (1, 0));
        assert_eq!((p[2].column, p[2].row), (0, 1));
        assert_eq!(pages[0].guides.len(), 3 + 4);
    }

    #[test]
    fn layout_dir_end_to_end_order() {
        let dir = tempfile::tempdir().unwrap();
        for n in ["fireball.png", "(2x)lightning.png", "readme.txt"] {
            std::fs::write(dir.path().join(n), b"x").unwrap();
        }
        let pages = layout_dir(dir.path(), &SheetConfig::default()).unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(
            names(&pages[0]),
            vec!["fireball.png", "(2x)lightning.png", "(2x)lightning.png"]
        );
    }

    #[test]
    fn empty_dir_yields_no_pages() {
        let dir = tempfile::tempdir().unwrap();
        assert!(layout_dir(dir.path(), &SheetConfig::default())
            .unwrap()
            .is_empty());
    }
}
