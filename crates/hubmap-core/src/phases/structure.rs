//! Phase 1: walk the file tree and select the source files to analyse.

use std::collections::BTreeSet;
use std::path::Path;

use ignore::overrides::{Override, OverrideBuilder};
use walkdir::WalkDir;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;

/// Directory names never descended into.
const DEFAULT_EXCLUDES: &[&str] = &[
    "node_modules",
    ".git",
    "dist",
    "build",
    "out",
    "coverage",
    ".next",
    ".nuxt",
    ".turbo",
    ".cache",
    "storybook-static",
    "bower_components",
    "vendor",
];

/// Source files found under the repository root.
#[derive(Debug, Clone, Default)]
pub struct SourceTree {
    /// Every supported file, used as the resolution universe.
    pub files: BTreeSet<String>,
    /// The subset selected by the include/exclude patterns.
    pub included: BTreeSet<String>,
}

/// Compile include/exclude globs. Includes whitelist, excludes are negated.
fn build_filter(root: &Path, config: &AnalysisConfig) -> Result<Option<Override>, AnalysisError> {
    if config.include_patterns.is_empty() && config.exclude_patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = OverrideBuilder::new(root);
    for pattern in &config.include_patterns {
        builder.add(pattern)?;
    }
    for pattern in &config.exclude_patterns {
        builder.add(&format!("!{pattern}"))?;
    }
    Ok(Some(builder.build()?))
}

fn is_selected(filter: Option<&Override>, root: &Path, rel_path: &str, has_includes: bool) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    let m = filter.matched(root.join(rel_path), false);
    if m.is_ignore() {
        return false;
    }
    // With only excludes, unmatched files stay in.
    m.is_whitelist() || !has_includes
}

/// Run the structure phase.
pub fn run_structure_phase(config: &AnalysisConfig) -> Result<SourceTree, AnalysisError> {
    let root = Path::new(&config.repo_path);
    if !root.is_dir() {
        return Err(AnalysisError::InvalidInput(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    let filter = build_filter(root, config)?;
    let has_includes = !config.include_patterns.is_empty();
    let mut tree = SourceTree::default();
    let mut oversized = 0usize;

    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 || !e.file_type().is_dir() {
                return true;
            }
            let name = e.file_name().to_string_lossy();
            !name.starts_with('.') && !DEFAULT_EXCLUDES.contains(&name.as_ref())
        })
    {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                log::debug!("Skipping unreadable entry: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let abs_path = entry.path();
        let ext = abs_path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        if !config.extensions.iter().any(|e| *e == ext) {
            continue;
        }

        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        if size > config.max_file_size {
            oversized += 1;
            continue;
        }

        let rel_path = abs_path
            .strip_prefix(root)
            .unwrap_or(abs_path)
            .to_string_lossy()
            .replace('\\', "/");

        if is_selected(filter.as_ref(), root, &rel_path, has_includes) {
            tree.included.insert(rel_path.clone());
        }
        tree.files.insert(rel_path);
    }

    log::info!(
        "Structure: {} source files, {} selected ({} over size limit)",
        tree.files.len(),
        tree.included.len(),
        oversized
    );
    Ok(tree)
}
