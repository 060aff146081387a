//! Reachability, hub and feature behaviour over hand-built facts.

mod common;

use std::collections::{BTreeMap, HashSet};

use common::*;
use hubmap_core::config::{AnalysisResult, DependencyType, FileFacts, HubCategory};
use hubmap_core::output::parse_facts;

fn importer_counts(facts: &[FileFacts]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = facts.iter().map(|f| (f.file.clone(), 0)).collect();
    for f in facts {
        let unique: HashSet<&String> = f.imports.iter().collect();
        for import in unique {
            let path = import.trim_start_matches('/').to_string();
            if path != f.file {
                *counts.entry(path).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Scenario 4 layout: two features share the hub `H`, one through `M`.
fn layered_facts() -> Vec<FileFacts> {
    vec![
        target("src/t.js", UI, &[]),
        target("src/u.js", UI, &[]),
        file("src/F1.js", &["src/t.js", "src/P.js"]),
        file("src/F2.js", &["src/t.js", "src/P.js"]),
        file("src/P.js", &["src/u.js"]),
        file("src/H.js", &["src/F1.js", "src/M.js"]),
        file("src/K1.js", &["src/F1.js"]),
        file("src/M.js", &["src/F2.js"]),
        file("src/K2.js", &["src/F2.js"]),
    ]
}

fn feature_hub_type(result: &AnalysisResult, feature: &str, hub: &str) -> Option<DependencyType> {
    result
        .intersections
        .features
        .iter()
        .find(|f| f.path == feature)?
        .hubs
        .iter()
        .find(|h| h.path == hub)
        .map(|h| h.dependency_type)
}

#[test]
fn linear_chain_reaches_the_far_importer() {
    let facts = vec![
        target("c.js", UI, &[]),
        file("b.js", &["c.js"]),
        file("a.js", &["b.js"]),
        file("y.js", &["b.js"]),
        file("z.js", &["c.js"]),
        file("x1.js", &["a.js"]),
        file("x2.js", &["a.js"]),
    ];
    let result = analyze(facts, &[UI]);
    let c = &result.dependencies[UI].files["c.js"];
    assert_eq!(c.direct_importers, vec!["b.js"]);
    assert!(c.indirect_importers.contains(&"a.js".to_string()));
    let prefix = ["c.js".to_string(), "b.js".to_string(), "a.js".to_string()];
    assert!(c.import_chains.iter().any(|chain| chain.starts_with(&prefix)));
}

#[test]
fn two_cycle_terminates() {
    let facts = vec![target("x.js", UI, &["y.js"]), file("y.js", &["x.js"])];
    let result = analyze(facts, &[UI]);
    let x = &result.dependencies[UI].files["x.js"];
    assert_eq!(x.import_chains, vec![vec!["x.js", "y.js"]]);
    assert!(x.direct_importers.is_empty());
    assert_eq!(x.depth, 1);
}

#[test]
fn depth_is_capped_but_chains_are_not() {
    let names: Vec<String> = (0..13).map(|i| format!("f{i:02}.js")).collect();
    let mut facts = vec![target(&names[0], UI, &[])];
    for pair in names.windows(2) {
        facts.push(file(&pair[1], &[pair[0].as_str()]));
    }
    let result = analyze(facts, &[UI]);
    let entry = &result.dependencies[UI].files["f00.js"];
    assert_eq!(entry.import_chains, vec![names.clone()]);
    assert_eq!(entry.depth, 10);
}

#[test]
fn same_named_hubs_are_disambiguated() {
    let facts = vec![
        target("t.js", UI, &[]),
        file("F.js", &["t.js", "G.js"]),
        file("G.js", &["t.js"]),
        file("pages/Header.js", &["F.js", "G.js"]),
        file("widgets/Header.js", &["F.js", "G.js"]),
    ];
    let result = analyze(facts, &[UI]);
    let report = &result.intersections;
    assert_eq!(report.intersection_importers, vec!["F.js"]);

    let mut names: Vec<&str> = report
        .global_import_hubs
        .iter()
        .map(|h| h.name.as_str())
        .collect();
    names.sort();
    assert_eq!(names, vec!["Header (pages)", "Header (widgets)"]);

    // One feature, no hub-to-hub edges: both hubs are isolated.
    assert_eq!(
        report.hub_categories.isolated_hubs,
        sorted(&["pages/Header.js", "widgets/Header.js"])
    );
}

#[test]
fn per_feature_direct_and_indirect() {
    let result = analyze(layered_facts(), &[UI]);
    assert_eq!(
        result.intersections.intersection_importers,
        sorted(&["src/F1.js", "src/F2.js"])
    );
    assert_eq!(
        feature_hub_type(&result, "src/F1.js", "src/H.js"),
        Some(DependencyType::Direct)
    );
    assert_eq!(
        feature_hub_type(&result, "src/F2.js", "src/H.js"),
        Some(DependencyType::Indirect)
    );
    assert_eq!(
        feature_hub_type(&result, "src/F2.js", "src/M.js"),
        Some(DependencyType::Direct)
    );
}

#[test]
fn hub_category_ignores_feature_usage() {
    let result = analyze(layered_facts(), &[UI]);
    let categories = &result.intersections.hub_categories;
    assert_eq!(categories.main_hubs, vec!["src/H.js"]);
    assert_eq!(categories.base_hubs, vec!["src/M.js"]);
    assert_eq!(categories.isolated_hubs, sorted(&["src/K1.js", "src/K2.js"]));

    let h = result
        .intersections
        .global_import_hubs
        .iter()
        .find(|h| h.path == "src/H.js")
        .unwrap();
    assert_eq!(h.category, Some(HubCategory::Main));
}

#[test]
fn chains_never_repeat_a_file() {
    let mut facts = layered_facts();
    facts.push(file("src/cycle.js", &["src/H.js"]));
    facts.push(file("src/H2.js", &["src/cycle.js", "src/t.js"]));
    facts[5].imports.push("/src/H2.js".to_string());
    let result = analyze(facts, &[UI]);
    for package in result.dependencies.values() {
        for deps in package.files.values() {
            for chain in &deps.import_chains {
                let unique: HashSet<&String> = chain.iter().collect();
                assert_eq!(unique.len(), chain.len(), "repeated file in {chain:?}");
            }
        }
    }
}

#[test]
fn unpopular_files_are_never_importers() {
    let facts = layered_facts();
    let counts = importer_counts(&facts);
    let result = analyze(facts, &[UI]);
    for package in result.dependencies.values() {
        for deps in package.files.values() {
            for file in deps.direct_importers.iter().chain(&deps.indirect_importers) {
                assert!(counts[file] > 1, "{file} has {} importers", counts[file]);
            }
        }
    }
}

#[test]
fn hub_usage_is_the_transpose() {
    let result = analyze(layered_facts(), &[UI]);
    let report = &result.intersections;
    for (hub, deps) in &report.hub_dependencies {
        for link in &deps.depends_on {
            let users = &report.hub_usage[&link.target].used_by;
            assert!(users
                .iter()
                .any(|u| &u.hub == hub && u.dependency_type == link.dependency_type));
        }
    }
    let forward: usize = report.hub_dependencies.values().map(|d| d.depends_on.len()).sum();
    let backward: usize = report.hub_usage.values().map(|u| u.used_by.len()).sum();
    assert_eq!(forward, backward);
}

#[test]
fn categories_are_exclusive_and_names_unique() {
    let result = analyze(layered_facts(), &[UI]);
    let report = &result.intersections;
    let c = &report.hub_categories;
    let all: Vec<&String> = c
        .main_hubs
        .iter()
        .chain(&c.intermediate_hubs)
        .chain(&c.base_hubs)
        .chain(&c.isolated_hubs)
        .collect();
    let unique: HashSet<&&String> = all.iter().collect();
    assert_eq!(unique.len(), all.len());

    for hub in &c.intermediate_hubs {
        assert!(report.hub_dependencies.contains_key(hub));
        assert!(report.hub_usage.contains_key(hub));
    }

    let names: HashSet<&str> = report
        .global_import_hubs
        .iter()
        .map(|h| h.name.as_str())
        .collect();
    assert_eq!(names.len(), report.global_import_hubs.len());
}

#[test]
fn input_order_does_not_matter() {
    let forward = analyze(layered_facts(), &[UI]);
    let mut reversed_facts = layered_facts();
    reversed_facts.reverse();
    let backward = analyze(reversed_facts, &[UI]);
    assert_eq!(forward.dependencies, backward.dependencies);
    assert_eq!(
        forward.intersections.features,
        backward.intersections.features
    );
}

#[test]
fn untracked_usage_files_are_not_targets() {
    let mut facts = layered_facts();
    facts[0].usage.get_mut(UI).unwrap().get_mut("Button").unwrap().used = 0;
    let result = analyze(facts, &[UI]);
    let files = &result.dependencies[UI].files;
    assert!(!files.contains_key("src/t.js"));
    assert!(files.contains_key("src/u.js"));
}

#[test]
fn tracked_packages_default_to_all_seen() {
    let result = analyze(layered_facts(), &[]);
    assert_eq!(result.intersections.stats.tracked_packages, 1);
    assert!(result.dependencies.contains_key(UI));
}

#[test]
fn facts_document_drives_the_analysis() {
    let doc = r#"{
        "files": [
            {"file": "src/x.js", "usage": {"@acme/ui": {"Button": {"imported": 1, "used": 2}}}, "imports": ["./y"]},
            {"file": "src/y.js", "imports": ["./x"]},
            {"bogus": true}
        ]
    }"#;
    let facts = parse_facts(doc).unwrap();
    assert_eq!(facts.len(), 2);
    let result = analyze(facts, &[UI]);
    assert_eq!(
        result.dependencies[UI].files["src/x.js"].import_chains,
        vec![vec!["src/x.js", "src/y.js"]]
    );
}
