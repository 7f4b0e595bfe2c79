//! Optional post-processing of the rendered PDF by an external tool.
//!
//! The renderer's output is already Flate-compressed, but Ghostscript's
//! `pdfwrite` device re-encodes embedded images and typically shrinks a
//! 600 DPI sheet several-fold. It is an optional system dependency: when it
//! is not installed the step is skipped and the uncompressed document stands
//! as the final artifact.
//!
//! The executable is located in this order:
//!
//! 1. [`SheetConfig::ghostscript`], if set
//! 2. the `PROXYSHEET_GHOSTSCRIPT` environment variable
//! 3. `gs`, `gswin64c` or `gswin32c` on `PATH`

use crate::config::{CompressionPreset, SheetConfig};
use crate::error::{ItemError, ProxyError};
use crate::output::CompressOutcome;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Environment variable naming an explicit Ghostscript executable.
pub const GHOSTSCRIPT_ENV: &str = "PROXYSHEET_GHOSTSCRIPT";

#[cfg(windows)]
const GHOSTSCRIPT_CANDIDATES: &[&str] = &["gswin64c.exe", "gswin32c.exe", "gs.exe"];
#[cfg(not(windows))]
const GHOSTSCRIPT_CANDIDATES: &[&str] = &["gs", "gswin64c", "gswin32c"];

/// Something that can turn `input` into a smaller `output` PDF.
///
/// Implementations never fail the run; every problem is reported through the
/// returned [`CompressOutcome`].
pub trait PdfCompressor: Send + Sync {
    fn compress(&self, input: &Path, output: &Path) -> CompressOutcome;
}

/// Leaves the document untouched.
#[derive(Debug, Clone, Default)]
pub struct Passthrough;

impl PdfCompressor for Passthrough {
    fn compress(&self, _input: &Path, _output: &Path) -> CompressOutcome {
        CompressOutcome::Skipped {
            reason: "compression disabled".into(),
        }
    }
}

/// Ghostscript `pdfwrite` re-encoder.
#[derive(Debug, Clone)]
pub struct Ghostscript {
    /// Resolved executable, or `None` when none could be found.
    pub executable: Option<PathBuf>,
    pub preset: CompressionPreset,
}

impl Ghostscript {
    /// Locate Ghostscript for `config` (see the module docs for the order).
    pub fn from_config(config: &SheetConfig) -> Self {
        let executable = config
            .ghostscript
            .clone()
            .or_else(|| std::env::var_os(GHOSTSCRIPT_ENV).map(PathBuf::from))
            .or_else(|| find_ghostscript(std::env::var_os("PATH")));
        Self {
            executable,
            preset: config.preset,
        }
    }

    /// Command-line arguments for one run.
    pub fn args(&self, input: &Path, output: &Path) -> Vec<String> {
        vec![
            "-sDEVICE=pdfwrite".into(),
            "-dCompatibilityLevel=1.4".into(),
            format!("-dPDFSETTINGS={}", self.preset.as_pdf_settings()),
            "-dNOPAUSE".into(),
            "-dQUIET".into(),
            "-dBATCH".into(),
            format!("-sOutputFile={}", output.display()),
            input.display().to_string(),
        ]
    }
}

impl PdfCompressor for Ghostscript {
    fn compress(&self, input: &Path, output: &Path) -> CompressOutcome {
        let Some(exe) = &self.executable else {
            let error = ItemError::ExternalToolUnavailable {
                tool: "ghostscript".into(),
            };
            warn!("{error}. Skipping compression.");
            return CompressOutcome::Skipped {
                reason: error.to_string(),
            };
        };

        let tool = exe.display().to_string();
        let mut cmd = Command::new(exe);
        cmd.args(self.args(input, output));
        debug!("Ghostscript command: {:?}", cmd);

        let result = match cmd.output() {
            Ok(result) => result,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let error = ItemError::ExternalToolUnavailable { tool };
                warn!("{error}. Skipping compression.");
                return CompressOutcome::Skipped {
                    reason: error.to_string(),
                };
            }
            Err(e) => {
                return failed(ItemError::ExternalToolFailed {
                    tool,
                    detail: e.to_string(),
                })
            }
        };

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return failed(ItemError::ExternalToolFailed {
                tool,
                detail: format!("{}: {}", result.status, stderr.trim()),
            });
        }

        match std::fs::metadata(output) {
            Ok(meta) => {
                info!(
                    "Compressed PDF written: {} ({} bytes)",
                    output.display(),
                    meta.len()
                );
                CompressOutcome::Compressed {
                    path: output.to_path_buf(),
                    bytes: meta.len(),
                }
            }
            Err(e) => failed(ItemError::ExternalToolFailed {
                tool,
                detail: format!("no output at {}: {}", output.display(), e),
            }),
        }
    }
}

fn failed(error: ItemError) -> CompressOutcome {
    warn!("{error}. Keeping the uncompressed PDF.");
    CompressOutcome::Failed { error }
}

/// First executable Ghostscript candidate on `search_path`.
fn find_ghostscript(search_path: Option<OsString>) -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    GHOSTSCRIPT_CANDIDATES
        .iter()
        .find_map(|c| which::which_in(c, search_path.as_ref(), &cwd).ok())
}

/// The compressor `config` asks for.
pub fn compressor_for(config: &SheetConfig) -> Box<dyn PdfCompressor> {
    if config.compress {
        Box::new(Ghostscript::from_config(config))
    } else {
        Box::new(Passthrough)
    }
}

/// Run the configured compressor on the blocking pool.
pub async fn compress_pdf(
    input: &Path,
    output: &Path,
    config: &SheetConfig,
) -> Result<CompressOutcome, ProxyError> {
    let compressor = compressor_for(config);
    let (input, output) = (input.to_path_buf(), output.to_path_buf());
    tokio::task::spawn_blocking(move || compressor.compress(&input, &output))
        .await
        .map_err(|e| ProxyError::Internal(format!("Compression task panicked: {}", e)))
}

/// `cartas_A4.pdf` → `cartas_A4_compressed.pdf`, next to the input.
pub fn default_compressed_path(pdf: &Path) -> PathBuf {
    let stem = pdf
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sheet".into());
    pdf.with_file_name(format!("{stem}_compressed.pdf"))
}
