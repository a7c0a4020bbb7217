//! Conversion: run the external notebook-to-markdown converter.
//!
//! The converter is treated as a black box: given `notebook.ipynb` it must
//! leave `notebook.md` next to it. We check its exit status and then check
//! that the markdown actually exists, so a failed conversion surfaces as
//! [`PublishError::ConversionFailed`] or
//! [`PublishError::ConverterOutputMissing`] instead of a confusing read error
//! further down the pipeline.

use crate::config::ConverterCommand;
use crate::error::PublishError;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Where the converter leaves its markdown: same path, `md` extension.
///
/// `posts/notebook.ipynb` → `posts/notebook.md`
pub fn derive_markdown_path(notebook: &Path) -> PathBuf {
    notebook.with_extension("md")
}

/// Run `converter` on `notebook` and return the path of the markdown it wrote.
///
/// Blocks (asynchronously) until the converter exits; there is no timeout.
pub async fn convert_notebook(
    notebook: &Path,
    converter: &ConverterCommand,
) -> Result<PathBuf, PublishError> {
    let markdown = derive_markdown_path(notebook);
    info!("Converting {} with `{}`", notebook.display(), converter);

    let output = Command::new(&converter.program)
        .args(&converter.args)
        .arg(notebook)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| PublishError::ConverterNotFound {
            program: converter.program.clone(),
            source: e,
        })?;

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if !output.status.success() {
        return Err(PublishError::ConversionFailed {
            path: notebook.to_path_buf(),
            status: output.status.to_string(),
            stderr,
        });
    }
    if !stderr.is_empty() {
        debug!("Converter stderr:\n{}", stderr);
    }

    if !markdown.is_file() {
        return Err(PublishError::ConverterOutputMissing { path: markdown });
    }

    debug!("Converter wrote {}", markdown.display());
    Ok(markdown)
}
