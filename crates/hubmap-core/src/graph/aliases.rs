//! Import alias table: explicit aliases plus tsconfig/jsconfig path mappings.

use regex::Regex;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::LazyLock;

use super::paths::{join, normalize_path};

static JSON_COMMENTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"("(?:[^"\\]|\\.)*")|//[^\n]*|/\*(?s:.*?)\*/"#).expect("valid comment regex")
});

static TRAILING_COMMAS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("valid trailing comma regex"));

#[derive(Deserialize)]
struct RawConfig {
    #[serde(rename = "compilerOptions")]
    compiler_options: Option<CompilerOptions>,
}

#[derive(Deserialize)]
struct CompilerOptions {
    #[serde(rename = "baseUrl")]
    base_url: Option<String>,
    paths: Option<HashMap<String, Vec<String>>>,
}

/// One alias pattern and the repo-relative targets it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
struct AliasEntry {
    pattern: String,
    targets: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    /// Sorted longest pattern first.
    entries: Vec<AliasEntry>,
    base_url: Option<String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from explicit `pattern → target` aliases.
    pub fn from_aliases(aliases: &BTreeMap<String, String>) -> Self {
        let mut table = Self::new();
        for (pattern, target) in aliases {
            table.insert(pattern, vec![target.clone()]);
        }
        table
    }

    /// Load the first `tsconfig.json` / `jsconfig.json` in `root` that has
    /// `compilerOptions` and merge its mappings. Explicit aliases already in
    /// the table take precedence.
    pub fn merge_project_config(&mut self, root: &Path) {
        for name in ["tsconfig.json", "jsconfig.json"] {
            let path = root.join(name);
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            let parsed = match Self::parse_project_config(&content) {
                Ok(Some(parsed)) => parsed,
                Ok(None) => {
                    log::debug!("{name} has no compilerOptions");
                    continue;
                }
                Err(e) => {
                    log::warn!("Ignoring unparsable {}: {e}", path.display());
                    continue;
                }
            };

            log::debug!("Loaded {} alias patterns from {}", parsed.entries.len(), name);
            for entry in parsed.entries {
                if !self.entries.iter().any(|e| e.pattern == entry.pattern) {
                    self.insert(&entry.pattern, entry.targets);
                }
            }
            if self.base_url.is_none() {
                self.base_url = parsed.base_url;
            }
            return;
        }
    }

    /// Parse tsconfig-style JSON. Comments and trailing commas are tolerated.
    /// `Ok(None)` when the document has no `compilerOptions`.
    pub fn parse_project_config(content: &str) -> Result<Option<Self>, serde_json::Error> {
        let clean = strip_json_comments(content);
        let clean = TRAILING_COMMAS.replace_all(&clean, "$1");
        let raw: RawConfig = serde_json::from_str(&clean)?;
        let Some(opts) = raw.compiler_options else {
            return Ok(None);
        };

        let base_url = opts.base_url.map(|b| normalize_path(&b));
        let base_for_paths = base_url.clone().unwrap_or_default();

        let mut table = Self::new();
        if let Some(paths) = opts.paths {
            for (pattern, targets) in paths {
                let targets = targets
                    .into_iter()
                    .map(|t| join(&base_for_paths, &t))
                    .collect();
                table.insert(&pattern, targets);
            }
        }
        table.base_url = base_url;
        Ok(Some(table))
    }

    fn insert(&mut self, pattern: &str, targets: Vec<String>) {
        let targets = targets.iter().map(|t| normalize_path(t)).collect();
        self.entries.retain(|e| e.pattern != pattern);
        self.entries.push(AliasEntry {
            pattern: pattern.to_string(),
            targets,
        });
        self.entries.sort_by(|a, b| {
            b.pattern
                .len()
                .cmp(&a.pattern.len())
                .then(a.pattern.cmp(&b.pattern))
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.base_url.is_none()
    }

    /// Repo-relative expansions of a bare specifier, most specific first.
    /// Empty when no alias applies.
    pub fn expand(&self, specifier: &str) -> Vec<String> {
        for entry in &self.entries {
            if let Some(rest) = match_pattern(&entry.pattern, specifier) {
                return entry
                    .targets
                    .iter()
                    .map(|t| substitute(t, rest))
                    .collect();
            }
        }
        match &self.base_url {
            Some(base) => vec![join(base, specifier)],
            None => Vec::new(),
        }
    }
}

/// Match `specifier` against an alias pattern, returning the part the
/// wildcard (or the `/`-prefix) captured.
fn match_pattern<'a>(pattern: &str, specifier: &'a str) -> Option<&'a str> {
    if let Some(prefix) = pattern.strip_suffix('*') {
        return specifier.strip_prefix(prefix);
    }
    if pattern == specifier {
        return Some("");
    }
    specifier
        .strip_prefix(pattern)
        .and_then(|rest| rest.strip_prefix('/'))
}

fn substitute(target: &str, captured: &str) -> String {
    if target.contains('*') {
        normalize_path(&target.replace('*', captured))
    } else if captured.is_empty() {
        target.to_string()
    } else {
        join(target, captured)
    }
}

fn strip_json_comments(input: &str) -> String {
    JSON_COMMENTS
        .replace_all(input, |caps: &regex::Captures| {
            caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default()
        })
        .into_owned()
}
