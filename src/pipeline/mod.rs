//! Pipeline stages for notebook publishing.
//!
//! ## Data Flow
//!
//! ```text
//! nbconvert ──▶ scan ──▶ relocate
//! (external)   (find)   (copy + rewrite)
//! ```
//!
//! 1. [`nbconvert`]: run the external converter and locate its markdown
//! 2. [`scan`]: find relative image references and their byte spans
//! 3. [`relocate`]: validate, copy into the blog's assets, splice new paths

pub mod nbconvert;
pub mod relocate;
pub mod scan;
