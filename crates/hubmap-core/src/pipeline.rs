//! Sequential phase orchestrator with timing.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::config::{AnalysisConfig, AnalysisResult, Feature, FileFacts};
use crate::error::AnalysisError;
use crate::graph::import_graph::ImportGraph;
use crate::graph::paths::normalize_path;
use crate::output::{build_intersection_report, build_result};
use crate::phases;
use crate::phases::hubs::HubAnalysis;
use crate::phases::reachability::{tracked_packages, Reachability};
use crate::phases::structure::SourceTree;

/// Phase labels for progress reporting.
const PHASE_LABELS: &[(&str, &str)] = &[
    ("structure", "Mapping file tree"),
    ("parsing", "Extracting imports and component usage"),
    ("imports", "Resolving imports"),
    ("reachability", "Tracing importer chains"),
    ("hubs", "Classifying hubs"),
    ("features", "Mapping features"),
];

/// Progress callback type: (phase_name, label).
pub type ProgressCallback = Box<dyn FnMut(&str, &str)>;

/// Everything the phases produce, filled in as they run.
#[derive(Default)]
struct PipelineState {
    tree: SourceTree,
    facts: Vec<FileFacts>,
    graph: ImportGraph,
    reach: Reachability,
    hubs: HubAnalysis,
    features: Vec<Feature>,
}

type PhaseFn = Box<dyn FnOnce(&AnalysisConfig, &mut PipelineState) -> Result<(), AnalysisError>>;

fn source_phases() -> Vec<(&'static str, PhaseFn)> {
    vec![
        (
            "structure",
            Box::new(|config, state| {
                state.tree = phases::structure::run_structure_phase(config)?;
                Ok(())
            }),
        ),
        (
            "parsing",
            Box::new(|config, state| {
                state.facts = phases::parsing::run_parsing_phase(config, &state.tree);
                Ok(())
            }),
        ),
    ]
}

fn analysis_phases() -> Vec<(&'static str, PhaseFn)> {
    vec![
        (
            "imports",
            Box::new(|config, state| {
                let known: HashSet<String> = state.tree.files.iter().cloned().collect();
                state.graph = phases::imports::run_imports_phase(config, &state.facts, &known);
                Ok(())
            }),
        ),
        (
            "reachability",
            Box::new(|config, state| {
                state.reach = phases::reachability::run_reachability_phase(
                    config,
                    &state.facts,
                    &state.graph,
                );
                Ok(())
            }),
        ),
        (
            "hubs",
            Box::new(|_config, state| {
                state.hubs = phases::hubs::run_hubs_phase(&state.reach);
                Ok(())
            }),
        ),
        (
            "features",
            Box::new(|_config, state| {
                state.features =
                    phases::features::run_features_phase(&state.reach, &mut state.hubs);
                Ok(())
            }),
        ),
    ]
}

fn run_phases(
    config: &AnalysisConfig,
    state: &mut PipelineState,
    phase_fns: Vec<(&'static str, PhaseFn)>,
    progress_callback: &mut Option<ProgressCallback>,
    timings: &mut HashMap<String, f64>,
) -> Result<(), AnalysisError> {
    for (name, phase_fn) in phase_fns {
        if let Some(cb) = progress_callback.as_mut() {
            let label = PHASE_LABELS
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, l)| *l)
                .unwrap_or(name);
            cb(name, label);
        }

        let start = Instant::now();
        phase_fn(config, state)?;
        let elapsed = start.elapsed().as_secs_f64();
        log::debug!("Phase {name} took {:.1} ms", elapsed * 1000.0);
        timings.insert(name.to_string(), elapsed);
    }
    Ok(())
}

fn finish(
    config: &AnalysisConfig,
    state: PipelineState,
    timings: &HashMap<String, f64>,
    total_start: Instant,
) -> AnalysisResult {
    let tracked = tracked_packages(config, &state.facts).len();
    let intersections =
        build_intersection_report(tracked, &state.reach, &state.hubs, state.features);
    let total_ms = total_start.elapsed().as_secs_f64() * 1000.0;
    build_result(config, state.reach.report, intersections, timings, total_ms)
}

/// Execute the full pipeline over the repository at `config.repo_path`.
pub fn run_pipeline(
    config: &AnalysisConfig,
    mut progress_callback: Option<ProgressCallback>,
) -> Result<AnalysisResult, AnalysisError> {
    let mut state = PipelineState::default();
    let mut timings: HashMap<String, f64> = HashMap::new();
    let total_start = Instant::now();

    run_phases(config, &mut state, source_phases(), &mut progress_callback, &mut timings)?;
    run_phases(config, &mut state, analysis_phases(), &mut progress_callback, &mut timings)?;

    Ok(finish(config, state, &timings, total_start))
}

/// Analyse pre-extracted facts. The known-file universe is the set of fact
/// file paths.
pub fn analyze_facts(
    config: &AnalysisConfig,
    facts: Vec<FileFacts>,
    mut progress_callback: Option<ProgressCallback>,
) -> Result<AnalysisResult, AnalysisError> {
    let mut state = PipelineState::default();
    state.tree.files = facts.iter().map(|f| normalize_path(&f.file)).collect();
    state.tree.included = state.tree.files.clone();
    state.facts = facts;

    let mut timings: HashMap<String, f64> = HashMap::new();
    let total_start = Instant::now();
    run_phases(config, &mut state, analysis_phases(), &mut progress_callback, &mut timings)?;

    Ok(finish(config, state, &timings, total_start))
}
