//! # proxysheet
//!
//! Turn trading-card images into print-ready A4 proxy sheets.
//!
//! ## Why this crate?
//!
//! Printing proxies by hand means resizing every scan to exactly 63×88 mm,
//! arranging nine per page with cut lines, and keeping the file small enough
//! to send to a print shop. This crate does all of it from a folder of images
//! or a pasted deck list, and repeats cards named `(4x)Card.png` four times.
//!
//! ## Pipeline Overview
//!
//! ```text
//! deck list / folder
//!  │
//!  ├─ 1. Search   Scryfall lookup, printing grouping, language preference
//!  ├─ 2. Fetch    stream chosen PNGs into the download folder
//!  ├─ 3. Convert  cover-resize + center-crop to the card pixel box (spawn_blocking)
//!  ├─ 4. Layout   (Nx) expansion, 3×3 grid pagination, cut guides
//!  ├─ 5. Render   A4 PDF, each distinct image embedded once
//!  └─ 6. Compress optional Ghostscript pass
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use proxysheet::{run, SheetConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SheetConfig::default();
//!     let output = run("imagens", "cartas", "cartas_A4.pdf", &config).await?;
//!     eprintln!(
//!         "{} converted, {} pages → {}",
//!         output.convert.converted(),
//!         output.sheet.render.pages,
//!         output.sheet.final_artifact().display()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `proxysheet` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! proxysheet = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod clean;
pub mod config;
pub mod convert;
pub mod decklist;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod search;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use clean::{clean_dirs, CleanStatus};
pub use config::{CompressionPreset, SheetConfig, SheetConfigBuilder};
pub use convert::{
    build_sheet, build_sheet_sync, convert_all, convert_all_sync, convert_file, run, run_sync,
};
pub use decklist::{parse_deck, parse_line, DeckEntry};
pub use error::{ItemError, ProxyError};
pub use output::{
    CompressOutcome, ConvertReport, ConvertStatus, RenderStats, RunOutput, SheetOutput, SkipReason,
};
pub use pipeline::layout::{layout_dir, layout_paths, PageLayout, Placement};
pub use progress::{CancelToken, NoopProgressCallback, ProgressCallback, SheetProgressCallback};
pub use search::{fetch_deck, group_printings, Card, CardGroup, Edition, FetchStatus, ScryfallClient};
pub use stream::{convert_stream, StatusStream};
