//! # nbpublish
//!
//! Publish a Jupyter notebook as a markdown blog draft.
//!
//! ## Pipeline Overview
//!
//! ```text
//! notebook.ipynb
//!  │
//!  ├─ 1. Convert   jupyter nbconvert --to markdown → notebook.md
//!  ├─ 2. Read      load the converted markdown
//!  ├─ 3. Relocate  copy every referenced image into the blog's assets,
//!  │               rewrite the references to their served URLs
//!  └─ 4. Write     <blog home>/blog/_drafts/notebook.md
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use nbpublish::{publish, PublishConfig};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PublishConfig::builder()
//!         .notebook("gradients.ipynb")
//!         .blog_home("../my-blog")
//!         .build()?;
//!     let report = publish(&config).await?;
//!     println!("draft: {}", report.draft_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `nbpublish` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod publish;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConverterCommand, PublishConfig, PublishConfigBuilder, ReferenceSyntax};
pub use error::PublishError;
pub use output::{PublishReport, PublishStats, RelocatedImage, Relocation};
pub use pipeline::nbconvert::{convert_notebook, derive_markdown_path};
pub use pipeline::relocate::{relocate_images, RelocationTarget};
pub use progress::{NoopProgressCallback, ProgressCallback, PublishProgressCallback};
pub use publish::{publish, publish_sync, write_draft};
