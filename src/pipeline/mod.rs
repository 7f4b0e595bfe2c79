//! Pipeline stages for proxy-sheet generation.
//!
//! Each submodule implements exactly one transformation step, so each can be
//! tested on its own with generated images and temp directories.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ resize ──▶ encode ──▶ layout ──▶ render ──▶ compress
//! (list)    (cover)    (PNG+DPI)  (grid)     (lopdf)    (gs)
//! ```
//!
//! 1. [`input`]: list allow-listed images, validate stage directories
//! 2. [`resize`]: cover-scale and center-crop to the exact card pixel box
//! 3. [`encode`]: write the RGBA PNG with `pHYs` DPI metadata, atomically
//! 4. [`layout`]: expand `(Nx)` repeats, paginate, compute grid geometry
//! 5. [`render`]: embed each distinct image once and emit the A4 PDF;
//!    runs in `spawn_blocking`
//! 6. [`compress`]: optional Ghostscript re-encode of the finished PDF

pub mod compress;
pub mod encode;
pub mod input;
pub mod layout;
pub mod render;
pub mod resize;
