//! Phase 5: hub registry, hub-to-hub dependency typing and categorisation.
//!
//! Hubs are discovered from the importer chains of intersection files: the
//! first hop of every chain is a candidate hub. Because a chain lists a file's
//! successive importers, a hub found later in a chain *depends on* the
//! earlier entries, never the other way round. That inversion lives in
//! [`importer_chain_to_dependency_edges`] and nowhere else.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::{
    DependencyPath, DependencyType, Hub, HubCategories, HubDependencies, HubLink, HubUsage,
    HubUser, IntersectionHub, IntersectionHubs,
};
use crate::graph::naming::display_names;
use crate::phases::reachability::Reachability;

/// The chains of one intersection file that share a first hop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChainGroup {
    pub chain_count: usize,
    pub packages: BTreeSet<String>,
    /// file one step past the hub → occurrences
    pub next_hops: BTreeMap<String, usize>,
}

/// Group an intersection file's chains by their second element.
/// Chains that stop at the file itself have no first hop and are skipped.
pub fn group_chains(
    chains: &[Vec<String>],
    packages: &BTreeSet<String>,
) -> BTreeMap<String, ChainGroup> {
    let mut groups: BTreeMap<String, ChainGroup> = BTreeMap::new();
    for chain in chains {
        let Some(hub) = chain.get(1) else {
            continue;
        };
        let group = groups.entry(hub.clone()).or_default();
        group.chain_count += 1;
        group.packages.extend(packages.iter().cloned());
        if let Some(next) = chain.get(2) {
            *group.next_hops.entry(next.clone()).or_insert(0) += 1;
        }
    }
    groups
}

#[derive(Debug, Default)]
struct HubEntry {
    intersections: BTreeSet<String>,
    chain_count: usize,
    packages: BTreeSet<String>,
    dependency_paths: BTreeMap<String, (usize, BTreeSet<String>)>,
}

/// Accumulates hubs across every intersection file before naming them.
#[derive(Debug, Default)]
pub struct HubRegistryBuilder {
    hubs: BTreeMap<String, HubEntry>,
}

impl HubRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_intersection(&mut self, intersection: &str, groups: &BTreeMap<String, ChainGroup>) {
        for (hub, group) in groups {
            let entry = self.hubs.entry(hub.clone()).or_default();
            entry.intersections.insert(intersection.to_string());
            entry.chain_count += group.chain_count;
            entry.packages.extend(group.packages.iter().cloned());
            for (next, count) in &group.next_hops {
                let (total, packages) = entry.dependency_paths.entry(next.clone()).or_default();
                *total += count;
                packages.extend(group.packages.iter().cloned());
            }
        }
    }

    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }

    /// Freeze the table and assign unique display names.
    pub fn build(self) -> HubRegistry {
        let names = display_names(self.hubs.keys().map(String::as_str));
        let mut hubs = BTreeMap::new();
        let mut by_name = HashMap::new();

        for (path, entry) in self.hubs {
            let name = names.get(&path).cloned().unwrap_or_else(|| path.clone());
            by_name.insert(name.clone(), path.clone());
            let dependency_paths = entry
                .dependency_paths
                .into_iter()
                .map(|(next, (count, packages))| DependencyPath {
                    path: next,
                    count,
                    packages: packages.into_iter().collect(),
                })
                .collect();
            hubs.insert(
                path.clone(),
                Hub {
                    path,
                    name,
                    intersection_count: entry.intersections.len(),
                    intersections: entry.intersections.into_iter().collect(),
                    chain_count: entry.chain_count,
                    packages: entry.packages.into_iter().collect(),
                    dependency_paths,
                    category: None,
                },
            );
        }

        HubRegistry { hubs, by_name }
    }
}

/// Named, deduplicated hubs keyed by path.
#[derive(Debug, Clone, Default)]
pub struct HubRegistry {
    hubs: BTreeMap<String, Hub>,
    by_name: HashMap<String, String>,
}

impl HubRegistry {
    pub fn contains(&self, path: &str) -> bool {
        self.hubs.contains_key(path)
    }

    pub fn get(&self, path: &str) -> Option<&Hub> {
        self.hubs.get(path)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Hub> {
        self.by_name.get(name).and_then(|path| self.hubs.get(path))
    }

    pub fn name_of(&self, path: &str) -> Option<&str> {
        self.hubs.get(path).map(|h| h.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.hubs.keys().map(String::as_str)
    }

    pub fn hubs(&self) -> impl Iterator<Item = &Hub> {
        self.hubs.values()
    }

    /// Stamp each hub with its category.
    pub fn apply_categories(&mut self, categories: &HubCategories) {
        for hub in self.hubs.values_mut() {
            hub.category = categories.category_of(&hub.path);
        }
    }
}

/// Dependency edges implied by one importer chain.
///
/// Returns `(dependent, dependency, type)` triples. Hubs are taken in chain
/// order, the chain's own file included: each hub depends directly on the
/// hub right before it and indirectly on every earlier one.
pub fn importer_chain_to_dependency_edges<F>(
    chain: &[String],
    is_hub: F,
) -> Vec<(String, String, DependencyType)>
where
    F: Fn(&str) -> bool,
{
    let hubs: Vec<&String> = chain.iter().filter(|file| is_hub(file)).collect();
    let mut edges = Vec::new();
    for (i, dependent) in hubs.iter().enumerate().skip(1) {
        for (j, dependency) in hubs[..i].iter().enumerate() {
            let dependency_type = if j + 1 == i {
                DependencyType::Direct
            } else {
                DependencyType::Indirect
            };
            edges.push(((*dependent).clone(), (*dependency).clone(), dependency_type));
        }
    }
    edges
}

/// Hub-to-hub dependency graph and its transpose.
#[derive(Debug, Clone, Default)]
pub struct HubGraph {
    depends_on: BTreeMap<String, BTreeMap<String, DependencyType>>,
    used_by: BTreeMap<String, BTreeMap<String, DependencyType>>,
}

impl HubGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent` depends on `dependency`. Repeated observations
    /// of the same pair join their types.
    pub fn record(&mut self, dependent: &str, dependency: &str, dependency_type: DependencyType) {
        let forward = self
            .depends_on
            .entry(dependent.to_string())
            .or_default()
            .entry(dependency.to_string())
            .or_insert(dependency_type);
        *forward = forward.join(dependency_type);
        let joined = *forward;

        self.used_by
            .entry(dependency.to_string())
            .or_default()
            .insert(dependent.to_string(), joined);
    }

    /// Feed every chain through the dependency transform.
    pub fn from_chains<'a, I>(chains: I, registry: &HubRegistry) -> Self
    where
        I: IntoIterator<Item = &'a Vec<String>>,
    {
        let mut graph = Self::new();
        for chain in chains {
            for (dependent, dependency, ty) in
                importer_chain_to_dependency_edges(chain, |f| registry.contains(f))
            {
                graph.record(&dependent, &dependency, ty);
            }
        }
        graph
    }

    pub fn is_dependency(&self, hub: &str) -> bool {
        self.depends_on.get(hub).is_some_and(|m| !m.is_empty())
    }

    pub fn is_used(&self, hub: &str) -> bool {
        self.used_by.get(hub).is_some_and(|m| !m.is_empty())
    }

    pub fn has_edges(&self, hub: &str) -> bool {
        self.is_dependency(hub) || self.is_used(hub)
    }

    pub fn dependency_type(&self, dependent: &str, dependency: &str) -> Option<DependencyType> {
        self.depends_on.get(dependent)?.get(dependency).copied()
    }

    pub fn edge_count(&self) -> usize {
        self.depends_on.values().map(BTreeMap::len).sum()
    }

    pub fn hub_dependencies(&self) -> BTreeMap<String, HubDependencies> {
        self.depends_on
            .iter()
            .map(|(hub, targets)| {
                let depends_on = targets
                    .iter()
                    .map(|(target, ty)| HubLink {
                        target: target.clone(),
                        dependency_type: *ty,
                    })
                    .collect();
                (hub.clone(), HubDependencies { depends_on })
            })
            .collect()
    }

    pub fn hub_usage(&self) -> BTreeMap<String, HubUsage> {
        self.used_by
            .iter()
            .map(|(target, users)| {
                let used_by = users
                    .iter()
                    .map(|(hub, ty)| HubUser {
                        hub: hub.clone(),
                        dependency_type: *ty,
                    })
                    .collect();
                (target.clone(), HubUsage { used_by })
            })
            .collect()
    }
}

/// Place every hub with hub-to-hub edges into Main, Intermediate or Base.
/// Isolated hubs are decided by the feature mapper.
pub fn categorize(registry: &HubRegistry, graph: &HubGraph) -> HubCategories {
    let mut categories = HubCategories::default();
    for path in registry.paths() {
        match (graph.is_dependency(path), graph.is_used(path)) {
            (true, true) => categories.intermediate_hubs.push(path.to_string()),
            (true, false) => categories.main_hubs.push(path.to_string()),
            (false, true) => categories.base_hubs.push(path.to_string()),
            (false, false) => {}
        }
    }
    categories
}

/// Output of the hubs phase.
#[derive(Debug, Clone, Default)]
pub struct HubAnalysis {
    pub registry: HubRegistry,
    pub graph: HubGraph,
    pub categories: HubCategories,
    /// intersection file → its chain groups
    pub groups: BTreeMap<String, BTreeMap<String, ChainGroup>>,
    pub by_intersection: BTreeMap<String, IntersectionHubs>,
}

/// Run the hubs phase over the reachability output.
pub fn run_hubs_phase(reach: &Reachability) -> HubAnalysis {
    let empty = BTreeSet::new();
    let mut builder = HubRegistryBuilder::new();
    let mut groups = BTreeMap::new();

    for file in &reach.intersections {
        let chains = reach
            .intersection_chains
            .get(file)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let packages = reach.intersection_packages.get(file).unwrap_or(&empty);
        let grouped = group_chains(chains, packages);
        builder.add_intersection(file, &grouped);
        groups.insert(file.clone(), grouped);
    }

    let registry = builder.build();

    let target_chains = reach
        .report
        .values()
        .flat_map(|pkg| pkg.files.values())
        .flat_map(|deps| deps.import_chains.iter());
    let graph = HubGraph::from_chains(target_chains, &registry);
    let categories = categorize(&registry, &graph);

    let intersection_names = display_names(reach.intersections.iter().map(String::as_str));
    let mut by_intersection = BTreeMap::new();
    for (file, grouped) in &groups {
        let mut hubs: Vec<IntersectionHub> = grouped
            .iter()
            .filter_map(|(hub, group)| {
                registry.get(hub).map(|h| IntersectionHub {
                    path: hub.clone(),
                    name: h.name.clone(),
                    chain_count: group.chain_count,
                })
            })
            .collect();
        hubs.sort_by(|a, b| b.chain_count.cmp(&a.chain_count).then(a.name.cmp(&b.name)));
        by_intersection.insert(
            file.clone(),
            IntersectionHubs {
                name: intersection_names.get(file).cloned().unwrap_or_else(|| file.clone()),
                hubs_count: hubs.len(),
                hubs,
            },
        );
    }

    log::info!(
        "Hubs: {} registered, {} hub-to-hub edges ({} main, {} intermediate, {} base)",
        registry.len(),
        graph.edge_count(),
        categories.main_hubs.len(),
        categories.intermediate_hubs.len(),
        categories.base_hubs.len()
    );

    HubAnalysis {
        registry,
        graph,
        categories,
        groups,
        by_intersection,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(files: &[&str]) -> Vec<String> {
        files.iter().map(|s| s.to_string()).collect()
    }

    fn pkgs(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn groups_by_first_hop() {
        let chains = vec![
            chain(&["i", "h1", "x"]),
            chain(&["i", "h1", "y"]),
            chain(&["i", "h2"]),
            chain(&["i"]),
        ];
        let groups = group_chains(&chains, &pkgs(&["ui"]));
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["h1"].chain_count, 2);
        assert_eq!(groups["h1"].next_hops["x"], 1);
        assert_eq!(groups["h2"].chain_count, 1);
        assert!(groups["h2"].next_hops.is_empty());
        assert!(groups["h1"].packages.contains("ui"));
    }

    #[test]
    fn builder_aggregates_across_intersections() {
        let mut builder = HubRegistryBuilder::new();
        builder.add_intersection(
            "a",
            &group_chains(&[chain(&["a", "h", "n"])], &pkgs(&["ui"])),
        );
        builder.add_intersection(
            "b",
            &group_chains(
                &[chain(&["b", "h", "n"]), chain(&["b", "h", "m"])],
                &pkgs(&["charts"]),
            ),
        );
        let registry = builder.build();
        let hub = registry.get("h").unwrap();
        assert_eq!(hub.intersection_count, 2);
        assert_eq!(hub.chain_count, 3);
        assert_eq!(hub.packages, vec!["charts", "ui"]);
        let n = hub.dependency_paths.iter().find(|p| p.path == "n").unwrap();
        assert_eq!(n.count, 2);
        assert_eq!(n.packages, vec!["charts", "ui"]);
    }

    #[test]
    fn registry_names_are_disambiguated_and_reversible() {
        let mut builder = HubRegistryBuilder::new();
        builder.add_intersection(
            "f",
            &group_chains(
                &[
                    chain(&["f", "pages/Header.js"]),
                    chain(&["f", "widgets/Header.js"]),
                ],
                &pkgs(&[]),
            ),
        );
        let registry = builder.build();
        assert_eq!(registry.name_of("pages/Header.js"), Some("Header (pages)"));
        assert_eq!(registry.name_of("widgets/Header.js"), Some("Header (widgets)"));
        assert_eq!(
            registry.get_by_name("Header (widgets)").map(|h| h.path.as_str()),
            Some("widgets/Header.js")
        );
    }

    #[test]
    fn transform_points_later_hubs_at_earlier_ones() {
        let hubs = ["s", "h1", "h2"];
        let edges = importer_chain_to_dependency_edges(&chain(&["s", "x", "h1", "y", "h2"]), |f| {
            hubs.contains(&f)
        });
        assert_eq!(
            edges,
            vec![
                ("h1".to_string(), "s".to_string(), DependencyType::Direct),
                ("h2".to_string(), "s".to_string(), DependencyType::Indirect),
                ("h2".to_string(), "h1".to_string(), DependencyType::Direct),
            ]
        );
    }

    #[test]
    fn transform_ignores_non_hub_start() {
        let edges =
            importer_chain_to_dependency_edges(&chain(&["s", "h1"]), |f| f.starts_with('h'));
        assert!(edges.is_empty());
    }

    #[test]
    fn conflicting_observations_promote_to_both() {
        let mut graph = HubGraph::new();
        graph.record("a", "b", DependencyType::Direct);
        graph.record("a", "b", DependencyType::Indirect);
        assert_eq!(graph.dependency_type("a", "b"), Some(DependencyType::Both));
        let usage = graph.hub_usage();
        assert_eq!(usage["b"].used_by[0].dependency_type, DependencyType::Both);
    }

    #[test]
    fn usage_is_transpose_of_dependencies() {
        let mut graph = HubGraph::new();
        graph.record("a", "b", DependencyType::Direct);
        graph.record("a", "c", DependencyType::Indirect);
        graph.record("b", "c", DependencyType::Direct);
        graph.record("b", "c", DependencyType::Indirect);

        let deps = graph.hub_dependencies();
        let usage = graph.hub_usage();
        for (hub, d) in &deps {
            for link in &d.depends_on {
                assert!(usage[&link.target].used_by.contains(&HubUser {
                    hub: hub.clone(),
                    dependency_type: link.dependency_type,
                }));
            }
        }
        for (target, u) in &usage {
            for user in &u.used_by {
                assert!(deps[&user.hub].depends_on.contains(&HubLink {
                    target: target.clone(),
                    dependency_type: user.dependency_type,
                }));
            }
        }
    }

    #[test]
    fn categories_follow_edge_directions() {
        let mut builder = HubRegistryBuilder::new();
        builder.add_intersection(
            "f",
            &group_chains(
                &[
                    chain(&["f", "base"]),
                    chain(&["f", "mid"]),
                    chain(&["f", "top"]),
                    chain(&["f", "lonely"]),
                ],
                &pkgs(&[]),
            ),
        );
        let registry = builder.build();
        let graph = HubGraph::from_chains(
            [chain(&["t", "base", "mid", "top"])].iter(),
            &registry,
        );
        let categories = categorize(&registry, &graph);
        assert_eq!(categories.base_hubs, vec!["base"]);
        assert_eq!(categories.intermediate_hubs, vec!["mid"]);
        assert_eq!(categories.main_hubs, vec!["top"]);
        assert!(categories.category_of("lonely").is_none());
        for main in &categories.main_hubs {
            assert!(!categories.base_hubs.contains(main));
        }
    }
}
