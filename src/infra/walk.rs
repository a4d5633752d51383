//! Filepath: src/infra/walk.rs
//! Gitignore-aware walker over embedded C/C++ source trees.
//! - Respects .gitignore, .git/info/exclude, and global gitignore
//! - Extra ignore globs (early prune + late filter)
//! - Only yields instrumentable sources (.c/.h/.cc/.cpp/.hpp and friends)
//! - Deterministic ordering for stable tests/CI
//!
//! Backed by ripgrep's `ignore` crate and `globset`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;

/// File extensions considered instrumentable source files.
const SOURCE_EXTENSIONS: &[&str] = &["c", "h", "cc", "cpp", "hpp", "cxx", "hxx", "hh"];

/// Walker yielding every C/C++ source file under a set of roots.
/// Extra globs are applied in two places:
///   1) Early: prune directories during traversal (filter_entry).
///   2) Late: filter out files that still slipped through.
pub struct SourceWalker {
    /// Compiled set of additional ignore patterns
    ignore_patterns: GlobSet,
}

impl SourceWalker {
    /// Build a walker with additional ignore patterns (e.g., "build/**",
    /// "third_party/**"). Patterns match on (relative) paths.
    pub fn new(additional_ignores: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();

        for pattern in additional_ignores {
            builder.add(Glob::new(pattern).with_context(|| format!("bad ignore glob {pattern}"))?);
        }

        Ok(SourceWalker {
            ignore_patterns: builder.build()?,
        })
    }

    /// Collects the source files under `roots` (files or directories) in a
    /// deterministic order. A walk error on any entry fails the whole walk.
    pub fn source_files(&self, roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let mut roots = roots.iter();
        let first = roots
            .next()
            .context("at least one source root is required")?;

        let mut builder = WalkBuilder::new(first);
        for root in roots {
            builder.add(root);
        }

        let patterns = self.ignore_patterns.clone();
        builder.filter_entry(move |entry| {
            // Prune ignored directories early; files get a final check below.
            !patterns.is_match(entry.path())
        });

        let mut files = Vec::new();
        for entry in builder.build() {
            let entry = entry.context("failed to walk source tree")?;
            let path = entry.path();
            if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                continue;
            }
            if !is_source_file(path) || self.ignore_patterns.is_match(path) {
                continue;
            }
            files.push(path.to_path_buf());
        }

        files.sort();
        files.dedup();
        Ok(files)
    }
}

/// True when the path carries one of the instrumentable source extensions.
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            let lower = ext.to_ascii_lowercase();
            SOURCE_EXTENSIONS.contains(&lower.as_str())
        })
}
