//! Report assembly and JSON input/output.

use std::collections::HashMap;
use std::path::Path;
use std::process::Command;

use chrono::Utc;
use serde_json::Value;

use crate::config::{
    AnalysisConfig, AnalysisResult, DependencyReport, Feature, FileFacts, Hub,
    IntersectionReport, IntersectionStats,
};
use crate::error::AnalysisError;
use crate::phases::hubs::HubAnalysis;
use crate::phases::reachability::Reachability;

/// Try to get the current git commit hash (first 12 chars).
fn get_commit_hash(repo_path: &str) -> Option<String> {
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(repo_path)
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
                Some(hash[..hash.len().min(12)].to_string())
            } else {
                None
            }
        })
}

/// Assemble the intersection report from the last three phases.
pub fn build_intersection_report(
    tracked_packages: usize,
    reach: &Reachability,
    hubs: &HubAnalysis,
    features: Vec<Feature>,
) -> IntersectionReport {
    let mut global_import_hubs: Vec<Hub> = hubs.registry.hubs().cloned().collect();
    global_import_hubs.sort_by(|a, b| {
        b.intersection_count
            .cmp(&a.intersection_count)
            .then(b.chain_count.cmp(&a.chain_count))
            .then(a.name.cmp(&b.name))
    });

    let categories = hubs.categories.clone();
    let stats = IntersectionStats {
        tracked_packages,
        target_files: reach.target_files.len(),
        intersections: reach.intersections.len(),
        hubs: hubs.registry.len(),
        features: features.len(),
        main_hubs: categories.main_hubs.len(),
        intermediate_hubs: categories.intermediate_hubs.len(),
        base_hubs: categories.base_hubs.len(),
        isolated_hubs: categories.isolated_hubs.len(),
    };

    IntersectionReport {
        stats,
        intersection_importers: reach.intersections.iter().cloned().collect(),
        global_import_hubs,
        global_import_hub_by_intersection: hubs.by_intersection.clone(),
        features,
        hub_dependencies: hubs.graph.hub_dependencies(),
        hub_usage: hubs.graph.hub_usage(),
        hub_categories: categories,
    }
}

/// Wrap the reports with run metadata.
pub fn build_result(
    config: &AnalysisConfig,
    dependencies: DependencyReport,
    intersections: IntersectionReport,
    timings: &HashMap<String, f64>,
    total_ms: f64,
) -> AnalysisResult {
    let mut metadata = HashMap::new();

    if !config.repo_path.is_empty() {
        let repo_path = Path::new(&config.repo_path)
            .canonicalize()
            .unwrap_or_else(|_| Path::new(&config.repo_path).to_path_buf());
        metadata.insert(
            "repo_path".to_string(),
            Value::String(repo_path.to_string_lossy().to_string()),
        );
        metadata.insert(
            "commit_hash".to_string(),
            get_commit_hash(&config.repo_path).map_or(Value::Null, Value::String),
        );
    }
    metadata.insert(
        "analysed_at".to_string(),
        Value::String(Utc::now().to_rfc3339()),
    );
    metadata.insert(
        "hubmap_version".to_string(),
        Value::String(env!("CARGO_PKG_VERSION").to_string()),
    );
    metadata.insert(
        "analysis_duration_ms".to_string(),
        serde_json::json!((total_ms * 10.0).round() / 10.0),
    );
    metadata.insert(
        "phase_timings".to_string(),
        serde_json::to_value(timings).unwrap_or_default(),
    );

    AnalysisResult {
        version: "1.0".to_string(),
        metadata,
        dependencies,
        intersections,
    }
}

/// The configured output path, or `<stem>.hubmap.json`.
pub fn output_path_for(config: &AnalysisConfig, stem: &str) -> String {
    config
        .output_path
        .clone()
        .unwrap_or_else(|| format!("{stem}.hubmap.json"))
}

/// Write the analysis result to a JSON file.
pub fn write_output(result: &AnalysisResult, output_path: &str) -> Result<(), AnalysisError> {
    if let Some(parent) = Path::new(output_path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(result)?;
    std::fs::write(output_path, json)?;
    Ok(())
}

/// Parse a facts document: a top-level array of records, or an object
/// holding one under `files`. Malformed records are skipped.
pub fn parse_facts(content: &str) -> Result<Vec<FileFacts>, AnalysisError> {
    let doc: Value = serde_json::from_str(content)?;
    let records = match doc {
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove("files") {
            Some(Value::Array(records)) => records,
            _ => {
                return Err(AnalysisError::InvalidInput(
                    "expected a `files` array".to_string(),
                ))
            }
        },
        _ => {
            return Err(AnalysisError::InvalidInput(
                "expected an array of file records".to_string(),
            ))
        }
    };

    let total = records.len();
    let facts: Vec<FileFacts> = records
        .into_iter()
        .enumerate()
        .filter_map(|(i, record)| match serde_json::from_value::<FileFacts>(record) {
            Ok(f) if !f.file.is_empty() => Some(f),
            Ok(_) => {
                log::warn!("Skipping record {i}: empty file path");
                None
            }
            Err(e) => {
                log::warn!("Skipping record {i}: {e}");
                None
            }
        })
        .collect();
    log::debug!("Read {} of {} fact records", facts.len(), total);
    Ok(facts)
}

pub fn read_facts(path: &Path) -> Result<Vec<FileFacts>, AnalysisError> {
    let content = std::fs::read_to_string(path)?;
    parse_facts(&content)
}
