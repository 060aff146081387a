//! Phase 6: map features (intersection files that are not hubs) onto the
//! hubs their importer chains pass through.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::{DependencyPath, DependencyType, Feature, FeatureHub, HubCategories};
use crate::graph::naming::display_names;
use crate::phases::hubs::{HubAnalysis, HubGraph, HubRegistry};
use crate::phases::reachability::Reachability;

#[derive(Debug, Default)]
struct HubTrace {
    chain_count: usize,
    dependency_type: Option<DependencyType>,
    next_hops: BTreeMap<String, usize>,
}

/// Hubs reached by one feature's chains, keyed by hub path.
///
/// In every chain the first registered hub past the feature itself is a
/// direct dependency and every later one indirect. A hub seen both ways
/// across chains is `Both`.
fn trace_hubs(chains: &[Vec<String>], registry: &HubRegistry) -> BTreeMap<String, HubTrace> {
    let mut traces: BTreeMap<String, HubTrace> = BTreeMap::new();
    for chain in chains {
        let mut first = true;
        for (pos, file) in chain.iter().enumerate().skip(1) {
            if !registry.contains(file) {
                continue;
            }
            let ty = if first {
                DependencyType::Direct
            } else {
                DependencyType::Indirect
            };
            first = false;

            let trace = traces.entry(file.clone()).or_default();
            trace.chain_count += 1;
            trace.dependency_type = Some(match trace.dependency_type {
                Some(seen) => seen.join(ty),
                None => ty,
            });
            if let Some(next) = chain.get(pos + 1) {
                *trace.next_hops.entry(next.clone()).or_insert(0) += 1;
            }
        }
    }
    traces
}

/// Hubs with no hub-to-hub edges that exactly one feature reaches.
pub fn isolated_hubs(features: &[Feature], graph: &HubGraph) -> Vec<String> {
    let mut reached_by: BTreeMap<&str, usize> = BTreeMap::new();
    for feature in features {
        for hub in &feature.hubs {
            *reached_by.entry(hub.path.as_str()).or_insert(0) += 1;
        }
    }
    reached_by
        .into_iter()
        .filter(|(hub, count)| *count == 1 && !graph.has_edges(hub))
        .map(|(hub, _)| hub.to_string())
        .collect()
}

/// Build the feature list. Categories on the feature hubs are filled in
/// from `categories`, which must already hold the isolated hubs to show
/// them.
pub fn map_features(
    reach: &Reachability,
    registry: &HubRegistry,
    categories: &HubCategories,
) -> Vec<Feature> {
    let feature_paths: Vec<&str> = reach
        .intersections
        .iter()
        .map(String::as_str)
        .filter(|f| !registry.contains(f))
        .collect();
    let names = display_names(reach.intersections.iter().map(String::as_str));
    let no_chains: Vec<Vec<String>> = Vec::new();

    let mut features: Vec<Feature> = feature_paths
        .into_iter()
        .map(|path| {
            let packages: Vec<String> = reach
                .intersection_packages
                .get(path)
                .map(|p| p.iter().cloned().collect())
                .unwrap_or_default();
            let chains = reach.intersection_chains.get(path).unwrap_or(&no_chains);

            let mut hubs: Vec<FeatureHub> = trace_hubs(chains, registry)
                .into_iter()
                .filter_map(|(hub_path, trace)| {
                    let hub = registry.get(&hub_path)?;
                    let mut dependency_paths: Vec<DependencyPath> = trace
                        .next_hops
                        .into_iter()
                        .map(|(next, count)| DependencyPath {
                            path: next,
                            count,
                            packages: packages.clone(),
                        })
                        .collect();
                    dependency_paths
                        .sort_by(|a, b| b.count.cmp(&a.count).then(a.path.cmp(&b.path)));
                    Some(FeatureHub {
                        name: hub.name.clone(),
                        chain_count: trace.chain_count,
                        dependency_type: trace.dependency_type?,
                        category: categories.category_of(&hub_path),
                        dependency_paths,
                        path: hub_path,
                    })
                })
                .collect();
            hubs.sort_by(|a, b| b.chain_count.cmp(&a.chain_count).then(a.name.cmp(&b.name)));

            Feature {
                path: path.to_string(),
                name: names.get(path).cloned().unwrap_or_else(|| path.to_string()),
                packages,
                hubs_count: hubs.len(),
                hubs,
            }
        })
        .collect();

    features.sort_by(|a, b| a.name.cmp(&b.name).then(a.path.cmp(&b.path)));
    features
}

/// Run the features phase: map features, settle isolated hubs and stamp
/// categories back onto the registry.
pub fn run_features_phase(reach: &Reachability, hubs: &mut HubAnalysis) -> Vec<Feature> {
    let draft = map_features(reach, &hubs.registry, &hubs.categories);
    hubs.categories.isolated_hubs = isolated_hubs(&draft, &hubs.graph);

    let isolated: BTreeSet<&str> = hubs
        .categories
        .isolated_hubs
        .iter()
        .map(String::as_str)
        .collect();
    let mut features = draft;
    for feature in &mut features {
        for hub in &mut feature.hubs {
            if isolated.contains(hub.path.as_str()) {
                hub.category = Some(crate::config::HubCategory::Isolated);
            }
        }
    }
    hubs.registry.apply_categories(&hubs.categories);

    log::info!(
        "Features: {} mapped, {} isolated hubs",
        features.len(),
        hubs.categories.isolated_hubs.len()
    );
    features
}
