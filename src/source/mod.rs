//! Collecting the lines of every source file under a directory.
//!
//! The directory is walked in whatever order the filesystem yields entries, without the
//! usual ignore rules: hidden files, `.gitignore`d paths and dependency directories are
//! all included. Blank lines are dropped since they carry nothing worth printing.

use anyhow::{Context, Result};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    /// File name suffixes (without the dot) that are included, matched case-sensitively
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_extensions() -> Vec<String> {
    [
        "java",
        "py",
        "ts",
        "js",
        "html",
        "css",
        "xml",
        "sql",
        "sh",
        "properties",
        "yml",
        "yaml",
        "json",
    ]
    .map(String::from)
    .to_vec()
}

impl Default for Source {
    fn default() -> Self {
        Source {
            extensions: default_extensions(),
        }
    }
}

/// Lines gathered from a source tree, in walk order.
#[derive(Debug, Default)]
pub struct Collected {
    pub files: Vec<PathBuf>,
    pub lines: Vec<String>,
}

impl Source {
    /// Whether a file named `file_name` ends with one of the allowed extensions.
    pub fn matches(&self, file_name: &str) -> bool {
        self.extensions.iter().any(|ext| {
            file_name
                .strip_suffix(ext.as_str())
                .is_some_and(|stem| stem.ends_with('.'))
        })
    }

    /// Walk `root` and gather the non-blank lines of every matching file.
    pub fn collect(&self, root: &Path) -> Result<Collected> {
        let mut collected = Collected::default();

        let walk = WalkBuilder::new(root).standard_filters(false).build();
        for entry in walk {
            let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            // follows symlinks, so a link to a file counts as a file
            if !entry.path().is_file() {
                continue;
            }
            if !self.matches(&entry.file_name().to_string_lossy()) {
                log::trace!("skipping {}", entry.path().display());
                continue;
            }

            let before = collected.lines.len();
            read_lines(entry.path(), &mut collected.lines)?;
            log::debug!(
                "read {} lines from {}",
                collected.lines.len() - before,
                entry.path().display()
            );
            collected.files.push(entry.into_path());
        }

        log::info!(
            "collected {} lines from {} files under {}",
            collected.lines.len(),
            collected.files.len(),
            root.display()
        );
        Ok(collected)
    }
}

/// Append the non-blank lines of the UTF-8 file at `path` to `lines`.
pub fn read_lines(path: &Path, lines: &mut Vec<String>) -> Result<()> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read '{}' as UTF-8 text", path.display()))?;
    lines.extend(
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(ToString::to_string),
    );
    Ok(())
}
