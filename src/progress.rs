//! Progress-callback trait for publish stage events.
//!
//! Inject an [`Arc<dyn PublishProgressCallback>`] via
//! [`crate::config::PublishConfigBuilder::progress_callback`] to be told when
//! the converter starts and finishes, as each image is copied, and when the
//! draft lands. The CLI uses this to drive its spinner; library callers can
//! forward the events wherever they like.
//!
//! # Example
//!
//! ```rust
//! use nbpublish::{PublishConfig, PublishProgressCallback};
//! use std::path::Path;
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     copied: AtomicUsize,
//! }
//!
//! impl PublishProgressCallback for CountingCallback {
//!     fn on_image_copied(&self, index: usize, total: usize, destination: &Path) {
//!         self.copied.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{}/{} → {}", index, total, destination.display());
//!     }
//! }
//!
//! let config = PublishConfig::builder()
//!     .notebook("post.ipynb")
//!     .blog_home("/srv/blog")
//!     .progress_callback(Arc::new(CountingCallback { copied: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::path::Path;
use std::sync::Arc;

/// Called by the publish pipeline as it moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events fire in pipeline order from a single task.
pub trait PublishProgressCallback: Send + Sync {
    /// Called just before the external converter is spawned.
    fn on_conversion_start(&self, notebook: &Path) {
        let _ = notebook;
    }

    /// Called once the converted markdown has been found.
    ///
    /// # Arguments
    /// * `markdown`: path of the converted markdown
    /// * `markdown_len`: byte length of the markdown read back
    fn on_conversion_complete(&self, markdown: &Path, markdown_len: usize) {
        let _ = (markdown, markdown_len);
    }

    /// Called after all references are validated, before any copy.
    fn on_relocation_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called after each image copy.
    ///
    /// # Arguments
    /// * `index`: 1-indexed position of this reference
    /// * `total`: references in the document
    /// * `destination`: where the image was copied to
    fn on_image_copied(&self, index: usize, total: usize, destination: &Path) {
        let _ = (index, total, destination);
    }

    /// Called once the draft has been written.
    fn on_draft_written(&self, draft: &Path) {
        let _ = draft;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PublishProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PublishConfig`].
pub type ProgressCallback = Arc<dyn PublishProgressCallback>;
