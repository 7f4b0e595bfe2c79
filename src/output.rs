//! Result types returned by the pipeline entry points.

use crate::error::ItemError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Outcome of one Batch Converter unit of work.
///
/// `Display` renders the human-readable status line shown to users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ConvertStatus {
    /// The source was resized and saved.
    Converted { source: PathBuf, output: PathBuf },
    /// Nothing was written; `reason` says why.
    Skipped {
        source: PathBuf,
        output: PathBuf,
        reason: SkipReason,
    },
    /// The source could not be converted.
    Failed { source: PathBuf, error: ItemError },
    /// The run was cancelled before this unit started.
    Cancelled { source: PathBuf },
}

/// Why a conversion unit wrote nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The output file exists from an earlier run.
    AlreadyExists,
    /// Another input with the same stem maps to the same output.
    DuplicateStem,
}

impl ConvertStatus {
    pub fn source(&self) -> &Path {
        match self {
            ConvertStatus::Converted { source, .. }
            | ConvertStatus::Skipped { source, .. }
            | ConvertStatus::Failed { source, .. }
            | ConvertStatus::Cancelled { source } => source,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ConvertStatus::Failed { .. })
    }
}

impl fmt::Display for ConvertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertStatus::Converted { output, .. } => {
                write!(f, "Saved print-ready image: {}", output.display())
            }
            ConvertStatus::Skipped {
                output,
                reason: SkipReason::AlreadyExists,
                ..
            } => write!(f, "'{}' already exists, skipping", file_name(output)),
            ConvertStatus::Skipped {
                source,
                output,
                reason: SkipReason::DuplicateStem,
            } => write!(
                f,
                "'{}' maps to '{}' which another input already produces, skipping",
                file_name(source),
                file_name(output)
            ),
            ConvertStatus::Failed { source, error } => {
                write!(f, "Error processing '{}': {error}", source.display())
            }
            ConvertStatus::Cancelled { source } => {
                write!(f, "Cancelled before processing '{}'", source.display())
            }
        }
    }
}

fn file_name(p: &Path) -> String {
    p.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| p.display().to_string())
}

/// Aggregate result of a Batch Converter run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConvertReport {
    /// One status per eligible input file, in completion order.
    pub statuses: Vec<ConvertStatus>,
    /// Target pixel box every converted image matches.
    pub target_px: (u32, u32),
    pub duration_ms: u64,
}

impl ConvertReport {
    pub fn converted(&self) -> usize {
        self.count(|s| matches!(s, ConvertStatus::Converted { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, ConvertStatus::Skipped { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(ConvertStatus::is_failure)
    }

    pub fn cancelled(&self) -> usize {
        self.count(|s| matches!(s, ConvertStatus::Cancelled { .. }))
    }

    fn count(&self, pred: impl Fn(&ConvertStatus) -> bool) -> usize {
        self.statuses.iter().filter(|s| pred(s)).count()
    }
}

/// Counters from one Page Renderer run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderStats {
    pub pages: usize,
    /// Placements actually drawn.
    pub placements_drawn: usize,
    /// Placements skipped because their image failed to decode.
    pub placements_skipped: usize,
    /// Distinct image files decoded (successfully or not).
    pub images_decoded: usize,
}

/// Result of the optional external compression step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CompressOutcome {
    /// A compressed copy was written.
    Compressed { path: PathBuf, bytes: u64 },
    /// Compression did not run; the uncompressed document stands.
    Skipped { reason: String },
    /// The tool ran and failed; the uncompressed document stands.
    Failed { error: ItemError },
}

/// Everything produced by a sheet run: layout, render and compression.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetOutput {
    /// The PDF written by the renderer.
    pub pdf_path: PathBuf,
    pub compression: CompressOutcome,
    pub render: RenderStats,
    /// Placements per page, in page order.
    pub page_placements: Vec<usize>,
    pub duration_ms: u64,
}

impl SheetOutput {
    /// The document users should print: the compressed copy when one exists.
    pub fn final_artifact(&self) -> &Path {
        match &self.compression {
            CompressOutcome::Compressed { path, .. } => path,
            _ => &self.pdf_path,
        }
    }
}

/// Result of a full convert-then-sheet run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutput {
    pub convert: ConvertReport,
    pub sheet: SheetOutput,
}
