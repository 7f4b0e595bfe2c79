//! Streaming conversion API: emit statuses as units complete.
//!
//! ## Why stream?
//!
//! Converting a few hundred 600 DPI cards takes minutes. A stream lets a
//! caller print each status line the moment its unit finishes, drive its own
//! progress display, or stop early by dropping the stream, without
//! implementing [`crate::progress::SheetProgressCallback`].
//!
//! Statuses arrive in completion order, which differs from file order when
//! more than one worker is configured.

use crate::config::SheetConfig;
use crate::convert::{plan, unit_stream};
use crate::error::ProxyError;
use crate::output::ConvertStatus;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::{Stream, StreamExt};
use tracing::info;

/// A boxed stream of conversion statuses.
pub type StatusStream = Pin<Box<dyn Stream<Item = ConvertStatus> + Send>>;

/// Running totals reported to `on_batch_complete` once the stream ends.
#[derive(Default)]
struct Tally {
    converted: AtomicUsize,
    skipped: AtomicUsize,
    failed: AtomicUsize,
}

impl Tally {
    fn record(&self, status: &ConvertStatus) {
        let counter = match status {
            ConvertStatus::Converted { .. } => &self.converted,
            ConvertStatus::Skipped { .. } => &self.skipped,
            ConvertStatus::Failed { .. } => &self.failed,
            ConvertStatus::Cancelled { .. } => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Convert `input_dir` into `output_dir`, streaming one status per file.
///
/// Dropping the stream stops dispatching new units; units already on the
/// blocking pool still finish and write their output. `on_batch_complete`
/// fires after the last status, so a stream dropped early never reports it.
///
/// # Returns
/// - `Ok(StatusStream)`: one [`ConvertStatus`] per eligible file
/// - `Err(ProxyError)`: a directory is unusable; nothing was started
///
/// # Example
/// ```rust,no_run
/// use proxysheet::{convert_stream, SheetConfig};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = SheetConfig::default();
/// let mut statuses = convert_stream("imagens", "cartas", &config).await?;
/// while let Some(status) = statuses.next().await {
///     println!("{status}");
/// }
/// # Ok(())
/// # }
/// ```
pub async fn convert_stream(
    input_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    config: &SheetConfig,
) -> Result<StatusStream, ProxyError> {
    let units = plan(input_dir.as_ref(), output_dir.as_ref())?;
    let total = units.len();
    info!(
        "Starting streaming conversion of {} images from {}",
        total,
        input_dir.as_ref().display()
    );

    let callback = config.progress_callback.clone();
    if let Some(ref cb) = callback {
        cb.on_batch_start(total);
    }

    let tally = Arc::new(Tally::default());
    let (item_cb, item_tally) = (callback.clone(), tally.clone());
    let items = unit_stream(units, config).map(move |status| {
        item_tally.record(&status);
        if let Some(ref cb) = item_cb {
            cb.on_item_complete(&status, total);
        }
        status
    });

    // Polled only after `items` is exhausted; yields nothing.
    let finish = tokio_stream::iter([()]).filter_map(move |()| {
        if let Some(ref cb) = callback {
            cb.on_batch_complete(
                tally.converted.load(Ordering::Relaxed),
                tally.skipped.load(Ordering::Relaxed),
                tally.failed.load(Ordering::Relaxed),
            );
        }
        None::<ConvertStatus>
    });
    Ok(Box::pin(items.chain(finish)))
}
