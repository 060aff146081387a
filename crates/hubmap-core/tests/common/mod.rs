//! Shared test helpers for integration tests.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use hubmap_core::config::{AnalysisConfig, AnalysisResult, ComponentUsage, FileFacts};
use hubmap_core::graph::import_graph::ImportGraph;
use hubmap_core::phases::structure::SourceTree;

pub const UI: &str = "@acme/ui";
pub const CHARTS: &str = "@acme/charts";

// ---------------------------------------------------------------------------
// Fixture path resolution
// ---------------------------------------------------------------------------

/// Resolve `tests/fixtures/{name}` relative to the workspace root.
pub fn fixture_path(name: &str) -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    Path::new(manifest_dir)
        .join("../../tests/fixtures")
        .join(name)
        .canonicalize()
        .unwrap_or_else(|_| {
            Path::new(manifest_dir)
                .join("../../tests/fixtures")
                .join(name)
        })
}

pub fn fixture_config(name: &str) -> AnalysisConfig {
    AnalysisConfig {
        repo_path: fixture_path(name).to_string_lossy().to_string(),
        tracked_packages: vec![UI.to_string(), CHARTS.to_string()],
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// Phase runners
// ---------------------------------------------------------------------------

pub struct PhaseResult {
    pub config: AnalysisConfig,
    pub tree: SourceTree,
    pub facts: Vec<FileFacts>,
    pub graph: ImportGraph,
}

/// Run Phase 1 (structure) on a fixture directory.
pub fn run_structure(fixture_name: &str) -> PhaseResult {
    let config = fixture_config(fixture_name);
    let tree = hubmap_core::phases::structure::run_structure_phase(&config)
        .expect("structure phase failed");
    PhaseResult {
        config,
        tree,
        facts: Vec::new(),
        graph: ImportGraph::new(),
    }
}

/// Run Phases 1-2 (structure + parsing).
pub fn run_two_phases(fixture_name: &str) -> PhaseResult {
    let mut r = run_structure(fixture_name);
    r.facts = hubmap_core::phases::parsing::run_parsing_phase(&r.config, &r.tree);
    r
}

/// Run Phases 1-3 (structure + parsing + imports).
pub fn run_three_phases(fixture_name: &str) -> PhaseResult {
    let mut r = run_two_phases(fixture_name);
    let known: HashSet<String> = r.tree.files.iter().cloned().collect();
    r.graph = hubmap_core::phases::imports::run_imports_phase(&r.config, &r.facts, &known);
    r
}

/// Run the whole pipeline on a fixture directory.
pub fn run_fixture(fixture_name: &str) -> AnalysisResult {
    hubmap_core::pipeline::run_pipeline(&fixture_config(fixture_name), None)
        .expect("pipeline failed")
}

// ---------------------------------------------------------------------------
// Fact builders
// ---------------------------------------------------------------------------

/// A facts record importing `imports` (relative to the repo root, as `/x`).
pub fn file(path: &str, imports: &[&str]) -> FileFacts {
    FileFacts {
        file: path.to_string(),
        usage: BTreeMap::new(),
        imports: imports.iter().map(|i| format!("/{i}")).collect(),
    }
}

/// Same as [`file`], plus one used component of `package`.
pub fn target(path: &str, package: &str, imports: &[&str]) -> FileFacts {
    let mut facts = file(path, imports);
    let mut components = BTreeMap::new();
    components.insert(
        "Button".to_string(),
        ComponentUsage {
            imported: 1,
            used: 1,
            props: BTreeMap::new(),
        },
    );
    facts.usage.insert(package.to_string(), components);
    facts
}

pub fn analyze(facts: Vec<FileFacts>, packages: &[&str]) -> AnalysisResult {
    let config = AnalysisConfig {
        tracked_packages: packages.iter().map(|p| p.to_string()).collect(),
        ..Default::default()
    };
    hubmap_core::pipeline::analyze_facts(&config, facts, None).expect("analysis failed")
}

pub fn sorted(items: &[&str]) -> Vec<String> {
    let mut v: Vec<String> = items.iter().map(|s| s.to_string()).collect();
    v.sort();
    v
}
