//! Error types for the proxysheet library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ProxyError`]: **Fatal**: a pipeline stage cannot proceed at all
//!   (unreadable input directory, unwritable output directory, invalid
//!   configuration). Returned as `Err(ProxyError)` from the top-level
//!   functions; outputs of earlier stages are left untouched.
//!
//! * [`ItemError`]: **Non-fatal**: a single unit of work failed (one image
//!   did not decode, one card was not found, one download broke) while the
//!   rest of the batch is fine. Stored inside per-item statuses such as
//!   [`crate::output::ConvertStatus`] so callers always see partial progress.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the proxysheet library.
///
/// Item-level failures use [`ItemError`] and are reported per unit of work
/// rather than propagated here.
#[derive(Debug, Error)]
pub enum ProxyError {
    // ── Directory errors ──────────────────────────────────────────────────
    /// The input directory does not exist or cannot be listed.
    #[error("Cannot read input directory '{path}': {source}\nCheck the path exists and is readable.")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output directory could not be created or is not writable.
    #[error("Cannot write to output directory '{path}': {source}")]
    OutputDirUnwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cards directory holds no eligible images, so there is no page to draw.
    #[error("No card images found in '{dir}'\nRun the convert step first or check the directory.")]
    NothingToRender { dir: PathBuf },

    /// The PDF document could not be assembled or serialised.
    #[error("Failed to build PDF '{path}': {detail}")]
    PdfWriteFailed { path: PathBuf, detail: String },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Control ───────────────────────────────────────────────────────────
    /// The run was cancelled through its [`crate::progress::CancelToken`].
    #[error("Operation cancelled")]
    Cancelled,

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single unit of work.
///
/// The batch it belongs to always continues; the error only explains why
/// this one file, card or placement produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ItemError {
    /// The card search yielded no record, or the record had no identifier.
    #[error("'{query}' not found: {detail}")]
    NotFound { query: String, detail: String },

    /// A download or metadata fetch failed.
    #[error("Transfer failed for '{url}': {reason}")]
    TransferFailure { url: String, reason: String },

    /// An image could not be opened or decoded.
    #[error("Cannot decode image '{path}': {detail}")]
    DecodeFailure { path: PathBuf, detail: String },

    /// A normalized image could not be encoded or saved.
    #[error("Cannot save image '{path}': {detail}")]
    EncodeFailure { path: PathBuf, detail: String },

    /// A repeat-count annotation in a file name was malformed.
    #[error("Malformed repeat annotation in '{name}': {detail}")]
    ParseFailure { name: String, detail: String },

    /// The external PDF compression tool is not installed.
    #[error("External tool '{tool}' is not available")]
    ExternalToolUnavailable { tool: String },

    /// The external PDF compression tool ran but reported failure.
    #[error("External tool '{tool}' failed: {detail}")]
    ExternalToolFailed { tool: String, detail: String },
}
