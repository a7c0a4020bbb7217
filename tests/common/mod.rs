//! Shared fixtures: a throwaway blog tree, a notebook directory and a fake
//! converter that needs nothing but `sh`.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Writes `<nb>.md` as a copy of the notebook and logs its argument to
/// `converter.log` next to the script.
const FAKE_NBCONVERT: &str = r#"#!/bin/sh
printf '%s\n' "$1" >> "$(dirname "$0")/converter.log"
cp "$1" "${1%.ipynb}.md"
"#;

pub struct Workspace {
    pub tmp: TempDir,
    pub notebooks: PathBuf,
    pub blog_home: PathBuf,
}

impl Workspace {
    /// A notebook directory plus a blog home with `blog/_drafts` in place.
    pub fn new() -> Self {
        let tmp = TempDir::new().unwrap();
        let notebooks = tmp.path().join("notebooks");
        let blog_home = tmp.path().join("blogs/mine");
        fs::create_dir_all(&notebooks).unwrap();
        fs::create_dir_all(blog_home.join("blog/_drafts")).unwrap();
        fs::write(tmp.path().join("fake-nbconvert.sh"), FAKE_NBCONVERT).unwrap();
        Self {
            tmp,
            notebooks,
            blog_home,
        }
    }

    /// A "notebook" whose converted markdown is `markdown`.
    pub fn notebook(&self, name: &str, markdown: &str) -> PathBuf {
        let path = self.notebooks.join(name);
        fs::write(&path, markdown).unwrap();
        path
    }

    pub fn image(&self, rel: &str, bytes: &[u8]) -> PathBuf {
        let path = self.notebooks.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        path
    }

    /// Converter command line for `--converter`.
    pub fn converter(&self) -> String {
        format!("sh {}", self.tmp.path().join("fake-nbconvert.sh").display())
    }

    /// Arguments the fake converter has been called with, in order.
    pub fn converter_calls(&self) -> Vec<String> {
        fs::read_to_string(self.tmp.path().join("converter.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    pub fn draft(&self, name: &str) -> PathBuf {
        self.blog_home.join("blog/_drafts").join(name)
    }

    pub fn asset(&self, post: &str, file: &str) -> PathBuf {
        self.blog_home.join("blog/assets/img").join(post).join(file)
    }
}

pub fn read(path: &Path) -> Vec<u8> {
    fs::read(path).unwrap_or_else(|e| panic!("reading {}: {e}", path.display()))
}
