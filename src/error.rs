//! Error types for the nbpublish library.
//!
//! Every failure is fatal for the invocation: publishing is a one-shot,
//! human-supervised operation, so nothing here is retried or partially
//! recovered. [`PublishError`] carries enough structure (paths, exit status,
//! the offending reference) for the CLI to print an actionable message.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the nbpublish library.
#[derive(Debug, Error)]
pub enum PublishError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The notebook given with `--ipynb` does not exist.
    #[error("Notebook not found: '{path}'\nCheck the path exists and is readable.")]
    NotebookNotFound { path: PathBuf },

    /// The blog home given with `--bloghome` does not exist.
    #[error("Blog home not found: '{path}'\nPass the root of the blog's working tree with --bloghome.")]
    BlogHomeNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The blog home exists but has no drafts directory.
    #[error("Drafts directory '{path}' does not exist.\nIs --bloghome pointing at the blog's working tree? Override with --drafts-dir.")]
    DraftsDirNotFound { path: PathBuf },

    // ── Conversion errors ─────────────────────────────────────────────────
    /// The converter program could not be spawned.
    #[error("Failed to run converter '{program}': {source}\nIs it installed and on PATH? Try: pip install nbconvert")]
    ConverterNotFound {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The converter ran but exited with a non-zero status.
    #[error("Converter exited with {status} while converting '{path}'\n{stderr}")]
    ConversionFailed {
        path: PathBuf,
        status: String,
        stderr: String,
    },

    /// The converter exited successfully but left no markdown behind.
    #[error("Converter finished but produced no markdown at '{path}'")]
    ConverterOutputMissing { path: PathBuf },

    /// The converted markdown could not be read.
    #[error("Failed to read converted markdown '{path}': {source}")]
    MarkdownReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Relocation errors ─────────────────────────────────────────────────
    /// An image reference points at a file that does not exist.
    #[error("Image '{reference}' not found at '{path}'")]
    ImageNotFound { reference: String, path: PathBuf },

    /// The per-post asset directory could not be created.
    #[error("Failed to create asset directory '{path}': {source}")]
    AssetDirCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Copying an image into the asset directory failed.
    #[error("Failed to copy image '{from}' to '{to}': {source}")]
    AssetCopyFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Could not create or write the draft post.
    #[error("Failed to write draft '{path}': {source}")]
    DraftWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
