//! Phase 3: resolve raw import specifiers into the importer graph.

use std::collections::HashSet;
use std::path::Path;

use crate::config::{AnalysisConfig, FileFacts};
use crate::graph::aliases::AliasTable;
use crate::graph::import_graph::ImportGraph;
use crate::graph::paths::{join, normalize_path, parent_dir, to_module_path};

/// Turns a raw import specifier into a file that exists in the repository.
pub trait ImportResolver {
    /// Module paths `raw` may denote, relative to the repo root, with
    /// aliases applied, extension stripped and `/index` collapsed. Empty for
    /// external packages.
    fn normalize(&self, importer: &str, raw: &str) -> Vec<String>;

    /// Source extensions probed during resolution, without the dot.
    fn extensions(&self) -> &[String];

    /// Resolve `raw` against the known file set, trying the literal path,
    /// each extension, then `<path>/index.<ext>`.
    fn resolve(&self, importer: &str, raw: &str, known_files: &HashSet<String>) -> Option<String> {
        self.normalize(importer, raw)
            .iter()
            .find_map(|module| probe(module, self.extensions(), known_files))
    }
}

fn probe(module: &str, extensions: &[String], known_files: &HashSet<String>) -> Option<String> {
    if module.is_empty() {
        return extensions
            .iter()
            .map(|ext| format!("index.{ext}"))
            .find(|c| known_files.contains(c));
    }

    if known_files.contains(module) {
        return Some(module.to_string());
    }

    for ext in extensions {
        let candidate = format!("{module}.{ext}");
        if known_files.contains(&candidate) {
            return Some(candidate);
        }
    }

    for ext in extensions {
        let candidate = format!("{module}/index.{ext}");
        if known_files.contains(&candidate) {
            return Some(candidate);
        }
    }

    None
}

/// Default resolver for JavaScript/TypeScript specifiers.
pub struct ModuleResolver {
    aliases: AliasTable,
    extensions: Vec<String>,
}

impl ModuleResolver {
    pub fn new(aliases: AliasTable, extensions: Vec<String>) -> Self {
        Self {
            aliases,
            extensions,
        }
    }

    /// Aliases from the config, merged with the repo's tsconfig/jsconfig.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let mut aliases = AliasTable::from_aliases(&config.aliases);
        if !config.repo_path.is_empty() {
            aliases.merge_project_config(Path::new(&config.repo_path));
        }
        Self::new(aliases, config.extensions.clone())
    }
}

impl ImportResolver for ModuleResolver {
    fn normalize(&self, importer: &str, raw: &str) -> Vec<String> {
        let spec = raw.split(['?', '#']).next().unwrap_or("").trim();
        if spec.is_empty() || spec.contains(':') {
            return Vec::new();
        }

        let relative = spec.starts_with("./") || spec.starts_with("../");
        let paths = if relative || spec == "." || spec == ".." {
            vec![join(parent_dir(importer), spec)]
        } else if let Some(rooted) = spec.strip_prefix('/') {
            vec![normalize_path(rooted)]
        } else {
            self.aliases.expand(spec)
        };

        paths
            .iter()
            .map(|p| to_module_path(p, &self.extensions))
            .collect()
    }

    fn extensions(&self) -> &[String] {
        &self.extensions
    }
}

/// Build the importer graph from per-file facts. Every fact file becomes a
/// node; unresolvable specifiers are dropped.
pub fn build_import_graph(
    facts: &[FileFacts],
    resolver: &dyn ImportResolver,
    known_files: &HashSet<String>,
) -> ImportGraph {
    let mut graph = ImportGraph::new();
    let mut dropped = 0usize;

    for record in facts {
        let file = normalize_path(&record.file);
        graph.ensure_file(&file);

        for raw in &record.imports {
            match resolver.resolve(&file, raw, known_files) {
                Some(target) => {
                    graph.add_import(&file, &target);
                }
                None => dropped += 1,
            }
        }
    }

    log::info!(
        "Import graph: {} files, {} edges ({} specifiers unresolved)",
        graph.file_count(),
        graph.edge_count(),
        dropped
    );
    graph
}

/// Run the imports phase with the default resolver.
pub fn run_imports_phase(
    config: &AnalysisConfig,
    facts: &[FileFacts],
    known_files: &HashSet<String>,
) -> ImportGraph {
    let resolver = ModuleResolver::from_config(config);
    build_import_graph(facts, &resolver, known_files)
}
