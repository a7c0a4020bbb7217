//! Configuration types for publishing a notebook as a blog draft.
//!
//! All publishing behaviour is controlled through [`PublishConfig`], built
//! once at the entry point via [`PublishConfigBuilder`] and passed down to
//! every stage. The blog-layout conventions (where drafts live, where assets
//! are copied, how relocated images are addressed) are fields here rather
//! than constants because they belong to the static-site generator, not to
//! this tool.

use crate::error::PublishError;
use crate::pipeline::scan;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Default drafts directory, relative to the blog home.
pub const DEFAULT_DRAFTS_DIR: &str = "blog/_drafts";

/// Default asset directory, relative to the blog home.
pub const DEFAULT_ASSETS_DIR: &str = "blog/assets/img";

/// Default URL under which the asset directory is served.
pub const DEFAULT_ASSET_URL_PREFIX: &str = "/assets/img";

/// Configuration for one publish run.
///
/// # Example
/// ```rust
/// use nbpublish::PublishConfig;
///
/// let config = PublishConfig::builder()
///     .notebook("analysis.ipynb")
///     .blog_home("/home/me/blog")
///     .build()
///     .unwrap();
/// assert!(config.draft_dir().ends_with("blog/_drafts"));
/// ```
#[derive(Clone)]
pub struct PublishConfig {
    /// Source notebook (`--ipynb`).
    pub notebook: PathBuf,

    /// Root of the blog's working tree (`--bloghome`).
    ///
    /// Canonicalised by [`crate::publish`] before any path is derived from it.
    pub blog_home: PathBuf,

    /// Drafts directory relative to `blog_home`. Default: `blog/_drafts`.
    ///
    /// Must already exist; its presence is how we tell a blog tree from a
    /// typo in `--bloghome`.
    pub drafts_dir: PathBuf,

    /// Asset directory relative to `blog_home`. Default: `blog/assets/img`.
    ///
    /// Images are copied into `<assets_dir>/<post name>/`, created on demand.
    pub assets_dir: PathBuf,

    /// URL prefix the static site serves `assets_dir` under. Default: `/assets/img`.
    pub asset_url_prefix: String,

    /// External notebook-to-markdown converter.
    pub converter: ConverterCommand,

    /// Run the converter before reading the markdown. Default: `true`.
    ///
    /// Turn off to republish a notebook whose `.md` is already up to date.
    pub run_converter: bool,

    /// Image reference syntaxes to scan for. Default: markdown and HTML.
    pub syntaxes: Vec<ReferenceSyntax>,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            notebook: PathBuf::new(),
            blog_home: PathBuf::new(),
            drafts_dir: PathBuf::from(DEFAULT_DRAFTS_DIR),
            assets_dir: PathBuf::from(DEFAULT_ASSETS_DIR),
            asset_url_prefix: DEFAULT_ASSET_URL_PREFIX.to_string(),
            converter: ConverterCommand::default(),
            run_converter: true,
            syntaxes: ReferenceSyntax::all(),
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishConfig")
            .field("notebook", &self.notebook)
            .field("blog_home", &self.blog_home)
            .field("drafts_dir", &self.drafts_dir)
            .field("assets_dir", &self.assets_dir)
            .field("asset_url_prefix", &self.asset_url_prefix)
            .field("converter", &self.converter)
            .field("run_converter", &self.run_converter)
            .field("syntaxes", &self.syntaxes)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn PublishProgressCallback>"),
            )
            .finish()
    }
}

impl PublishConfig {
    /// Create a builder with default settings.
    pub fn builder() -> PublishConfigBuilder {
        PublishConfigBuilder {
            config: Self::default(),
        }
    }

    /// Post name derived from the notebook: its file stem.
    ///
    /// `notes/2024-05-01-gradients.ipynb` → `2024-05-01-gradients`.
    pub fn post_name(&self) -> String {
        self.notebook
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Directory the notebook's relative image paths are resolved against.
    pub fn source_dir(&self) -> PathBuf {
        match self.notebook.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    /// Absolute drafts directory under the (already resolved) blog home.
    pub fn draft_dir(&self) -> PathBuf {
        self.blog_home.join(&self.drafts_dir)
    }

    /// Path of the draft post this run will write.
    pub fn draft_path(&self) -> PathBuf {
        self.draft_dir().join(format!("{}.md", self.post_name()))
    }
}

/// Builder for [`PublishConfig`].
#[derive(Debug)]
pub struct PublishConfigBuilder {
    config: PublishConfig,
}

impl PublishConfigBuilder {
    pub fn notebook(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.notebook = path.into();
        self
    }

    pub fn blog_home(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.blog_home = path.into();
        self
    }

    pub fn drafts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.drafts_dir = dir.into();
        self
    }

    pub fn assets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.assets_dir = dir.into();
        self
    }

    /// Trailing slashes are dropped so `"/img/"` and `"/img"` rewrite alike.
    pub fn asset_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.asset_url_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn converter(mut self, converter: ConverterCommand) -> Self {
        self.config.converter = converter;
        self
    }

    pub fn run_converter(mut self, v: bool) -> Self {
        self.config.run_converter = v;
        self
    }

    pub fn syntaxes(mut self, syntaxes: Vec<ReferenceSyntax>) -> Self {
        self.config.syntaxes = syntaxes;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Validate and build the configuration.
    pub fn build(self) -> Result<PublishConfig, PublishError> {
        let c = &self.config;
        if c.notebook.as_os_str().is_empty() {
            return Err(PublishError::InvalidConfig(
                "A notebook path is required".into(),
            ));
        }
        if c.post_name().is_empty() {
            return Err(PublishError::InvalidConfig(format!(
                "Cannot derive a post name from '{}'",
                c.notebook.display()
            )));
        }
        if c.blog_home.as_os_str().is_empty() {
            return Err(PublishError::InvalidConfig(
                "A blog home path is required".into(),
            ));
        }
        for (name, dir) in [("drafts_dir", &c.drafts_dir), ("assets_dir", &c.assets_dir)] {
            if !is_blog_relative(dir) {
                return Err(PublishError::InvalidConfig(format!(
                    "{name} must be relative to the blog home, got '{}'",
                    dir.display()
                )));
            }
        }
        // Rewritten references must not look relative, or a second run would
        // try to relocate them again.
        if !c.asset_url_prefix.is_empty() && scan::is_relocatable(&c.asset_url_prefix) {
            return Err(PublishError::InvalidConfig(format!(
                "asset_url_prefix must start with '/' or a URL scheme, got '{}'",
                c.asset_url_prefix
            )));
        }
        if c.syntaxes.is_empty() {
            return Err(PublishError::InvalidConfig(
                "At least one image reference syntax must be enabled".into(),
            ));
        }
        Ok(self.config)
    }
}

/// A relative path that cannot climb out of the blog home.
fn is_blog_relative(dir: &Path) -> bool {
    use std::path::Component;
    !dir.as_os_str().is_empty()
        && dir
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

// ── Converter command ────────────────────────────────────────────────────

/// External notebook-to-markdown converter.
///
/// The notebook path is appended as the final argument. The converter must
/// leave its markdown next to the notebook with the extension replaced by
/// `md`, which is what `jupyter nbconvert --to markdown` does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConverterCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ConverterCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for ConverterCommand {
    fn default() -> Self {
        Self::new("jupyter", ["nbconvert", "--to", "markdown"])
    }
}

impl FromStr for ConverterCommand {
    type Err = PublishError;

    /// Whitespace-split: `"jupyter nbconvert --to markdown"`. No shell quoting.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| PublishError::InvalidConfig("Converter command is empty".into()))?;
        Ok(Self::new(program, parts))
    }
}

impl fmt::Display for ConverterCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Syntax an image reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceSyntax {
    /// `![alt](path "optional title")`, as nbconvert emits for cell outputs.
    Markdown,
    /// `<img src="path" ...>`, common in hand-written markdown cells.
    Html,
}

impl ReferenceSyntax {
    pub fn all() -> Vec<ReferenceSyntax> {
        vec![ReferenceSyntax::Markdown, ReferenceSyntax::Html]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> PublishConfigBuilder {
        PublishConfig::builder()
            .notebook("notes/gradients.ipynb")
            .blog_home("/blogs/mine")
    }

    #[test]
    fn defaults_follow_blog_layout() {
        let c = base().build().unwrap();
        assert_eq!(c.drafts_dir, PathBuf::from("blog/_drafts"));
        assert_eq!(c.assets_dir, PathBuf::from("blog/assets/img"));
        assert_eq!(c.asset_url_prefix, "/assets/img");
        assert!(c.run_converter);
        assert_eq!(c.syntaxes, ReferenceSyntax::all());
    }

    #[test]
    fn derived_paths() {
        let c = base().build().unwrap();
        assert_eq!(c.post_name(), "gradients");
        assert_eq!(c.source_dir(), PathBuf::from("notes"));
        assert_eq!(
            c.draft_path(),
            PathBuf::from("/blogs/mine/blog/_drafts/gradients.md")
        );
    }

    #[test]
    fn bare_notebook_resolves_against_cwd() {
        let c = PublishConfig::builder()
            .notebook("notebook.ipynb")
            .blog_home("/blogs/mine")
            .build()
            .unwrap();
        assert_eq!(c.source_dir(), PathBuf::from("."));
        assert_eq!(
            c.draft_path(),
            PathBuf::from("/blogs/mine/blog/_drafts/notebook.md")
        );
    }

    #[test]
    fn missing_inputs_rejected() {
        assert!(PublishConfig::builder().blog_home("/b").build().is_err());
        assert!(PublishConfig::builder().notebook("a.ipynb").build().is_err());
    }

    #[test]
    fn escaping_dirs_rejected() {
        assert!(base().drafts_dir("/abs/_drafts").build().is_err());
        assert!(base().assets_dir("../outside").build().is_err());
        assert!(base().assets_dir("").build().is_err());
        assert!(base().assets_dir("./static/img").build().is_ok());
    }

    #[test]
    fn empty_syntaxes_rejected() {
        assert!(base().syntaxes(vec![]).build().is_err());
    }

    #[test]
    fn url_prefix_trailing_slash_trimmed() {
        let c = base().asset_url_prefix("/static/img/").build().unwrap();
        assert_eq!(c.asset_url_prefix, "/static/img");
        let c = base().asset_url_prefix("/").build().unwrap();
        assert_eq!(c.asset_url_prefix, "");
    }

    #[test]
    fn relative_url_prefix_rejected() {
        let err = base().asset_url_prefix("assets/img").build().unwrap_err();
        assert!(matches!(err, PublishError::InvalidConfig(ref m) if m.contains("asset_url_prefix")));
        assert!(base().asset_url_prefix("./img").build().is_err());
        assert!(base()
            .asset_url_prefix("https://cdn.example.org/img")
            .build()
            .is_ok());
    }

    #[test]
    fn converter_command_parse() {
        let cmd: ConverterCommand = "jupyter nbconvert  --to markdown".parse().unwrap();
        assert_eq!(cmd, ConverterCommand::default());
        assert_eq!(cmd.to_string(), "jupyter nbconvert --to markdown");
        assert!("   ".parse::<ConverterCommand>().is_err());
    }
}
