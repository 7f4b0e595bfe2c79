//! Progress callbacks and cooperative cancellation.
//!
//! Inject an [`Arc<dyn SheetProgressCallback>`] via
//! [`crate::config::SheetConfigBuilder::progress_callback`] to receive events
//! as the pipeline converts images and renders pages. The streaming API in
//! [`crate::stream`] is the channel-style alternative for callers that would
//! rather pull statuses than be called back.
//!
//! # Example
//!
//! ```rust
//! use proxysheet::{ConvertStatus, SheetConfig, SheetProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     done: AtomicUsize,
//! }
//!
//! impl SheetProgressCallback for CountingCallback {
//!     fn on_item_complete(&self, status: &ConvertStatus, total: usize) {
//!         let n = self.done.fetch_add(1, Ordering::SeqCst) + 1;
//!         eprintln!("[{n}/{total}] {status}");
//!     }
//! }
//!
//! let config = SheetConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { done: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::ConvertStatus;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Called by the pipeline as it processes each unit of work.
///
/// Implementations must be `Send + Sync`: conversion units complete on
/// blocking-pool threads and may report concurrently. All methods have
/// default no-op implementations so callers only override what they need.
pub trait SheetProgressCallback: Send + Sync {
    /// Called once before any image is converted.
    fn on_batch_start(&self, total_items: usize) {
        let _ = total_items;
    }

    /// Called when one conversion unit finishes, in completion order.
    fn on_item_complete(&self, status: &ConvertStatus, total_items: usize) {
        let _ = (status, total_items);
    }

    /// Called once after every conversion unit has finished.
    fn on_batch_complete(&self, converted: usize, skipped: usize, failed: usize) {
        let _ = (converted, skipped, failed);
    }

    /// Called after each PDF page has been emitted.
    ///
    /// * `page_num`: 1-indexed page number
    /// * `placements`: cards drawn on that page
    fn on_page_rendered(&self, page_num: usize, total_pages: usize, placements: usize) {
        let _ = (page_num, total_pages, placements);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl SheetProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SheetConfig`].
pub type ProgressCallback = Arc<dyn SheetProgressCallback>;

/// Shared cancellation flag checked between units of work.
///
/// Work already running is never interrupted; units that have not started
/// yet observe the flag and report themselves as cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
