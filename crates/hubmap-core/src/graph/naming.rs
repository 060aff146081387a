//! Human-readable display names for file paths.
//!
//! A name is the file stem, or the parent directory for `index` barrels.
//! Paths that share a name are qualified with their nearest directories,
//! `Header (pages)` / `Header (widgets)`, adding segments until the name is
//! unique within the set.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

const BARREL_STEM: &str = "index";

fn stem(path: &str) -> &str {
    let file = path.rsplit('/').next().unwrap_or(path);
    Path::new(file)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file)
}

fn dir_segments(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    segments.pop();
    segments
}

/// Name derived from the path alone, before any disambiguation.
pub fn base_name(path: &str) -> String {
    let stem = stem(path);
    if stem == BARREL_STEM {
        if let Some(parent) = dir_segments(path).last() {
            return (*parent).to_string();
        }
    }
    stem.to_string()
}

/// Directories usable as a qualifier, closest first. For barrels the parent
/// directory is already the name, so qualification starts at the grandparent.
fn qualifier_segments(path: &str) -> Vec<&str> {
    let mut segments = dir_segments(path);
    if stem(path) == BARREL_STEM {
        segments.pop();
    }
    segments.reverse();
    segments
}

fn qualifier(segments: &[&str], depth: usize) -> Option<String> {
    if depth > segments.len() {
        return None;
    }
    let mut picked: Vec<&str> = segments[..depth].to_vec();
    picked.reverse();
    Some(picked.join("/"))
}

/// Display name of `path` among `all_paths`.
pub fn display_name(path: &str, all_paths: &[&str]) -> String {
    let base = base_name(path);
    let peers: BTreeSet<&str> = all_paths
        .iter()
        .copied()
        .filter(|p| *p != path && base_name(p) == base)
        .collect();
    if peers.is_empty() {
        return base;
    }

    let own = qualifier_segments(path);
    let peer_segments: Vec<Vec<&str>> = peers.iter().map(|p| qualifier_segments(p)).collect();

    for depth in 1..=own.len() {
        let Some(candidate) = qualifier(&own, depth) else {
            break;
        };
        let clashes = peer_segments
            .iter()
            .any(|segs| qualifier(segs, depth).as_deref() == Some(candidate.as_str()));
        if !clashes {
            return format!("{base} ({candidate})");
        }
    }

    // Same directories all the way up: only the full path tells them apart.
    format!("{base} ({path})")
}

/// Display names for a whole set of paths.
pub fn display_names<'a, I>(paths: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = &'a str>,
{
    let unique: BTreeSet<&str> = paths.into_iter().collect();
    let all: Vec<&str> = unique.iter().copied().collect();

    let mut by_base: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for path in &all {
        by_base.entry(base_name(path)).or_default().push(path);
    }

    let mut names = BTreeMap::new();
    for group in by_base.values() {
        for path in group {
            names.insert((*path).to_string(), display_name(path, group));
        }
    }
    names
}
