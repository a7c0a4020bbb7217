//! Image relocation: copy referenced images into the blog and rewrite paths.
//!
//! Relocation runs in two phases. [`plan_relocation`] scans the markdown and
//! checks that every referenced file exists, touching nothing on disk.
//! [`execute_plan`] then copies the files and splices the new paths in. A
//! missing image therefore aborts the run before a single byte is copied or
//! a draft is written.
//!
//! Images land in `<blog home>/<assets dir>/<post name>/` and references are
//! rewritten to `<url prefix>/<post name>/<file name>`. Every reference gets
//! its own copy, duplicates included; copies overwrite.

use crate::config::{PublishConfig, ReferenceSyntax};
use crate::error::PublishError;
use crate::output::{RelocatedImage, Relocation};
use crate::pipeline::scan::{self, ImageReference};
use crate::progress::ProgressCallback;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Characters escaped in rewritten URLs so they survive markdown and HTML.
const URL_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'<')
    .add(b'>')
    .add(b'#')
    .add(b'?')
    .add(b'%');

/// Where images come from and where they go.
#[derive(Debug, Clone)]
pub struct RelocationTarget {
    /// Directory relative image paths are resolved against.
    pub source_dir: PathBuf,
    /// Absolute blog home.
    pub blog_home: PathBuf,
    /// Asset directory relative to `blog_home`.
    pub assets_dir: PathBuf,
    /// URL prefix `assets_dir` is served under.
    pub url_prefix: String,
    /// Per-post subdirectory name.
    pub post_name: String,
}

impl RelocationTarget {
    pub fn from_config(config: &PublishConfig) -> Self {
        Self {
            source_dir: config.source_dir(),
            blog_home: config.blog_home.clone(),
            assets_dir: config.assets_dir.clone(),
            url_prefix: config.asset_url_prefix.clone(),
            post_name: config.post_name(),
        }
    }

    /// `<blog home>/<assets dir>/<post name>`
    pub fn asset_dir(&self) -> PathBuf {
        self.blog_home.join(&self.assets_dir).join(&self.post_name)
    }

    fn url_for(&self, file_name: &str) -> String {
        format!(
            "{}/{}/{}",
            self.url_prefix,
            utf8_percent_encode(&self.post_name, URL_SEGMENT),
            utf8_percent_encode(file_name, URL_SEGMENT)
        )
    }
}

/// One validated copy-and-rewrite.
#[derive(Debug, Clone)]
pub struct PlannedCopy {
    pub reference: ImageReference,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub url: String,
}

/// Every copy a relocation will perform, in document order.
#[derive(Debug, Clone, Default)]
pub struct RelocationPlan {
    pub asset_dir: PathBuf,
    pub copies: Vec<PlannedCopy>,
}

impl RelocationPlan {
    pub fn is_empty(&self) -> bool {
        self.copies.is_empty()
    }

    pub fn len(&self) -> usize {
        self.copies.len()
    }
}

/// Scan `markdown` and validate every image reference against the disk.
///
/// Fails with [`PublishError::ImageNotFound`] on the first reference whose
/// file does not exist. Nothing is created or copied.
pub fn plan_relocation(
    markdown: &str,
    target: &RelocationTarget,
    syntaxes: &[ReferenceSyntax],
) -> Result<RelocationPlan, PublishError> {
    let asset_dir = target.asset_dir();
    let mut claimed: HashMap<OsString, PathBuf> = HashMap::new();
    let mut copies = Vec::new();

    for reference in scan::find_references(markdown, syntaxes) {
        let source = resolve_source(&target.source_dir, &reference.path).ok_or_else(|| {
            PublishError::ImageNotFound {
                reference: reference.path.clone(),
                path: target.source_dir.join(&reference.path),
            }
        })?;

        let file_name = destination_name(&source, &mut claimed)?;
        let url = target.url_for(&file_name.to_string_lossy());
        let destination = asset_dir.join(&file_name);
        debug!(
            "Planned {} → {} ({})",
            source.display(),
            destination.display(),
            url
        );

        copies.push(PlannedCopy {
            reference,
            source,
            destination,
            url,
        });
    }

    Ok(RelocationPlan { asset_dir, copies })
}

/// Copy every planned image and return the rewritten markdown.
///
/// The asset directory is created only when there is something to copy.
pub async fn execute_plan(
    markdown: &str,
    plan: &RelocationPlan,
    progress: Option<&ProgressCallback>,
) -> Result<Relocation, PublishError> {
    if plan.is_empty() {
        return Ok(Relocation {
            markdown: markdown.to_string(),
            images: Vec::new(),
        });
    }

    if let Some(cb) = progress {
        cb.on_relocation_start(plan.len());
    }

    tokio::fs::create_dir_all(&plan.asset_dir)
        .await
        .map_err(|e| PublishError::AssetDirCreateFailed {
            path: plan.asset_dir.clone(),
            source: e,
        })?;

    let total = plan.len();
    let mut replacements = Vec::with_capacity(total);
    let mut images = Vec::with_capacity(total);

    for (i, copy) in plan.copies.iter().enumerate() {
        copy_image(&copy.source, &copy.destination).await?;
        if let Some(cb) = progress {
            cb.on_image_copied(i + 1, total, &copy.destination);
        }

        replacements.push((copy.reference.span.clone(), copy.url.clone()));
        images.push(RelocatedImage {
            reference: copy.reference.path.clone(),
            syntax: copy.reference.syntax,
            source: copy.source.clone(),
            destination: copy.destination.clone(),
            url: copy.url.clone(),
        });
    }

    info!(
        "Relocated {} image(s) into {}",
        images.len(),
        plan.asset_dir.display()
    );

    Ok(Relocation {
        markdown: scan::splice(markdown, &replacements),
        images,
    })
}

/// Plan and execute in one call.
pub async fn relocate_images(
    markdown: &str,
    target: &RelocationTarget,
    syntaxes: &[ReferenceSyntax],
    progress: Option<&ProgressCallback>,
) -> Result<Relocation, PublishError> {
    let plan = plan_relocation(markdown, target, syntaxes)?;
    execute_plan(markdown, &plan, progress).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve a reference to an existing file, trying the literal path first
/// and then its percent-decoded form (`my%20plot.png`).
fn resolve_source(source_dir: &Path, reference: &str) -> Option<PathBuf> {
    let literal = source_dir.join(reference);
    if literal.is_file() {
        return Some(literal);
    }
    if !reference.contains('%') {
        return None;
    }
    let decoded = percent_decode_str(reference).decode_utf8().ok()?;
    let decoded = source_dir.join(&*decoded);
    decoded.is_file().then_some(decoded)
}

/// Pick the file name `source` is copied under.
///
/// The same source always maps to the same name. A different source whose
/// name is already taken (`a/plot.png` vs `b/plot.png`) gets a numeric
/// suffix: `plot-1.png`.
fn destination_name(
    source: &Path,
    claimed: &mut HashMap<OsString, PathBuf>,
) -> Result<OsString, PublishError> {
    let key = std::fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());
    let file_name = source
        .file_name()
        .ok_or_else(|| PublishError::Internal(format!("no file name in '{}'", source.display())))?;

    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = Path::new(file_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()));

    let mut candidate = file_name.to_os_string();
    let mut n = 0;
    loop {
        match claimed.get(&candidate) {
            None => {
                claimed.insert(candidate.clone(), key);
                return Ok(candidate);
            }
            Some(owner) if *owner == key => return Ok(candidate),
            Some(_) => {
                n += 1;
                candidate = OsString::from(format!("{stem}-{n}{}", ext.as_deref().unwrap_or("")));
            }
        }
    }
}

async fn copy_image(from: &Path, to: &Path) -> Result<(), PublishError> {
    // Copying a file onto itself truncates it.
    if let (Ok(a), Ok(b)) = (
        tokio::fs::canonicalize(from).await,
        tokio::fs::canonicalize(to).await,
    ) {
        if a == b {
            debug!("Image already in place: {}", to.display());
            return Ok(());
        }
    }

    let bytes = tokio::fs::copy(from, to)
        .await
        .map_err(|e| PublishError::AssetCopyFailed {
            from: from.to_path_buf(),
            to: to.to_path_buf(),
            source: e,
        })?;
    debug!("Copied {} ({} bytes) → {}", from.display(), bytes, to.display());
    Ok(())
}
