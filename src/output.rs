//! Result types returned by a publish run.

use crate::config::ReferenceSyntax;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One image reference that was copied and rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelocatedImage {
    /// Path as written in the converted markdown.
    pub reference: String,
    /// Syntax the reference was written in.
    pub syntax: ReferenceSyntax,
    /// File the image was copied from.
    pub source: PathBuf,
    /// File the image was copied to.
    pub destination: PathBuf,
    /// Path the reference now points at.
    pub url: String,
}

/// Rewritten markdown plus the images it now points at.
#[derive(Debug, Clone)]
pub struct Relocation {
    pub markdown: String,
    pub images: Vec<RelocatedImage>,
}

/// Summary of a complete publish run.
///
/// Printed as JSON by `nbpublish --json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishReport {
    /// Notebook that was published.
    pub notebook: PathBuf,
    /// Markdown the converter produced (or that was reused with `--no-convert`).
    pub markdown_path: PathBuf,
    /// Draft post that was written.
    pub draft_path: PathBuf,
    /// Directory relocated images were copied into.
    pub asset_dir: PathBuf,
    /// Whether the converter ran in this invocation.
    pub converted: bool,
    /// Every relocated reference, in document order.
    pub images: Vec<RelocatedImage>,
    pub stats: PublishStats,
}

/// Timing and size figures for a publish run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublishStats {
    /// Bytes of markdown read back from the converter.
    pub markdown_bytes: usize,
    /// Bytes written to the draft.
    pub draft_bytes: usize,
    /// Image copies performed (one per reference).
    pub images_copied: usize,
    /// Wall-clock time spent in the external converter.
    pub conversion_duration_ms: u64,
    /// Wall-clock time for the whole run.
    pub total_duration_ms: u64,
}
