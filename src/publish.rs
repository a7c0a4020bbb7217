//! The publish pipeline: convert, read, relocate, write.
//!
//! ```text
//! notebook.ipynb ──▶ nbconvert ──▶ notebook.md ──▶ relocate ──▶ <blog>/blog/_drafts/notebook.md
//!                                                    │
//!                                                    └──▶ <blog>/<assets>/notebook/*.png
//! ```
//!
//! Every step is awaited in order on the caller's task. Inputs are checked
//! before the converter runs, and all image references are validated before
//! anything is copied, so the common mistakes (wrong `--bloghome`, a missing
//! figure) fail without leaving half a post behind.

use crate::config::PublishConfig;
use crate::error::PublishError;
use crate::output::{PublishReport, PublishStats};
use crate::pipeline::{nbconvert, relocate};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Publish a notebook as a blog draft.
///
/// # Errors
/// Any failure aborts the run. See [`PublishError`] for the taxonomy.
pub async fn publish(config: &PublishConfig) -> Result<PublishReport, PublishError> {
    let total_start = Instant::now();

    // ── Step 1: Resolve and check inputs ─────────────────────────────────
    let mut config = config.clone();
    config.blog_home = resolve_blog_home(&config.blog_home).await?;

    let draft_dir = config.draft_dir();
    if !is_dir(&draft_dir).await {
        return Err(PublishError::DraftsDirNotFound { path: draft_dir });
    }
    if config.run_converter && !config.notebook.is_file() {
        return Err(PublishError::NotebookNotFound {
            path: config.notebook.clone(),
        });
    }
    let progress = config.progress_callback.as_ref();

    // ── Step 2: Convert ──────────────────────────────────────────────────
    let convert_start = Instant::now();
    let markdown_path = if config.run_converter {
        if let Some(cb) = progress {
            cb.on_conversion_start(&config.notebook);
        }
        nbconvert::convert_notebook(&config.notebook, &config.converter).await?
    } else {
        debug!("Skipping converter, reusing existing markdown");
        nbconvert::derive_markdown_path(&config.notebook)
    };
    let conversion_duration_ms = convert_start.elapsed().as_millis() as u64;

    // ── Step 3: Read the converted markdown ──────────────────────────────
    let markdown = tokio::fs::read_to_string(&markdown_path)
        .await
        .map_err(|e| PublishError::MarkdownReadFailed {
            path: markdown_path.clone(),
            source: e,
        })?;
    if let Some(cb) = progress {
        cb.on_conversion_complete(&markdown_path, markdown.len());
    }

    // ── Step 4: Relocate images ──────────────────────────────────────────
    let target = relocate::RelocationTarget::from_config(&config);
    let plan = relocate::plan_relocation(&markdown, &target, &config.syntaxes)?;
    info!(
        "Found {} image reference(s) in {}",
        plan.len(),
        markdown_path.display()
    );
    let relocation = relocate::execute_plan(&markdown, &plan, progress).await?;

    // ── Step 5: Write the draft ──────────────────────────────────────────
    let draft_path = config.draft_path();
    let draft_bytes = write_draft(&draft_path, &relocation.markdown).await?;
    if let Some(cb) = progress {
        cb.on_draft_written(&draft_path);
    }

    let stats = PublishStats {
        markdown_bytes: markdown.len(),
        draft_bytes,
        images_copied: relocation.images.len(),
        conversion_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };
    info!(
        "Published {} → {} ({} image(s), {}ms)",
        config.notebook.display(),
        draft_path.display(),
        stats.images_copied,
        stats.total_duration_ms
    );

    Ok(PublishReport {
        notebook: config.notebook.clone(),
        markdown_path,
        draft_path,
        asset_dir: plan.asset_dir,
        converted: config.run_converter,
        images: relocation.images,
        stats,
    })
}

/// Synchronous wrapper around [`publish`].
///
/// Creates a current-thread tokio runtime internally.
pub fn publish_sync(config: &PublishConfig) -> Result<PublishReport, PublishError> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PublishError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(publish(config))
}

/// Write the draft post, replacing any existing file.
///
/// Uses atomic write (temp file + rename) so an interrupted run never leaves
/// a truncated draft. Returns the number of bytes written.
pub async fn write_draft(path: &Path, text: &str) -> Result<usize, PublishError> {
    let tmp_path = path.with_extension("md.tmp");
    let write_err = |e| PublishError::DraftWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    tokio::fs::write(&tmp_path, text).await.map_err(write_err)?;
    if let Err(e) = tokio::fs::rename(&tmp_path, path).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(write_err(e));
    }

    debug!("Wrote draft {} ({} bytes)", path.display(), text.len());
    Ok(text.len())
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn resolve_blog_home(path: &Path) -> Result<PathBuf, PublishError> {
    let resolved = tokio::fs::canonicalize(path)
        .await
        .map_err(|e| PublishError::BlogHomeNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
    debug!("Blog home: {}", resolved.display());
    Ok(resolved)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_dir())
        .unwrap_or(false)
}
