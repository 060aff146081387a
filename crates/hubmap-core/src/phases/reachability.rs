//! Phase 4: direct/indirect importers and importer chains for every file
//! that uses a tracked package.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use petgraph::graph::NodeIndex;

use crate::config::{
    AnalysisConfig, DependencyReport, FileDependencies, FileFacts, PackageDependencies,
};
use crate::graph::import_graph::ImportGraph;
use crate::graph::paths::normalize_path;

/// A file must be imported by more than this many files to count as a
/// meaningful importer.
pub const POPULARITY_THRESHOLD: usize = 1;

/// Walks the importer graph over interned node indices.
pub struct ChainWalker<'g> {
    graph: &'g ImportGraph,
    /// importers per node, sorted by path
    importers: Vec<Vec<NodeIndex>>,
}

impl<'g> ChainWalker<'g> {
    pub fn new(graph: &'g ImportGraph) -> Self {
        Self {
            graph,
            importers: graph.sorted_importers(),
        }
    }

    fn is_popular(&self, idx: NodeIndex) -> bool {
        self.importers[idx.index()].len() > POPULARITY_THRESHOLD
    }

    fn to_paths(&self, nodes: &[NodeIndex]) -> Vec<String> {
        nodes.iter().map(|&n| self.graph.path(n).to_string()).collect()
    }

    /// Importers of `target` that are themselves imported by more than one file.
    pub fn direct_importers(&self, target: NodeIndex) -> Vec<NodeIndex> {
        self.importers[target.index()]
            .iter()
            .copied()
            .filter(|&imp| self.is_popular(imp))
            .collect()
    }

    /// Files reachable over importer edges from the direct importers of
    /// `target`, keeping only popular ones. The walk itself passes through
    /// unpopular files; `target` is never part of the result.
    pub fn indirect_importers(&self, target: NodeIndex) -> Vec<NodeIndex> {
        let n = self.importers.len();
        let mut reached = vec![false; n];
        let mut expanded = vec![false; n];
        let mut result = Vec::new();
        let mut queue: VecDeque<NodeIndex> = self.direct_importers(target).into();

        while let Some(node) = queue.pop_front() {
            if expanded[node.index()] {
                continue;
            }
            expanded[node.index()] = true;

            for &imp in &self.importers[node.index()] {
                if imp == target || reached[imp.index()] {
                    continue;
                }
                reached[imp.index()] = true;
                if self.is_popular(imp) {
                    result.push(imp);
                }
                queue.push_back(imp);
            }
        }

        result.sort_by(|a, b| self.graph.path(*a).cmp(self.graph.path(*b)));
        result
    }

    /// Every simple importer path starting at `start`.
    ///
    /// Depth-first over an explicit stack. `on_path` marks the current path
    /// and is cleared on backtrack, so sibling branches never prune each
    /// other. A path is emitted when its last file has no importers, when one
    /// of its importers is already on the path, or when `max_hops` is reached.
    pub fn chains(&self, start: NodeIndex, max_hops: Option<usize>) -> Vec<Vec<NodeIndex>> {
        let mut chains = Vec::new();
        let mut on_path = vec![false; self.importers.len()];
        let mut path = vec![start];
        let mut cursors = vec![0usize];
        on_path[start.index()] = true;

        if self.is_chain_end(start, &on_path, 0, max_hops) {
            chains.push(path.clone());
        }

        loop {
            let Some(&node) = path.last() else {
                break;
            };
            let Some(cursor) = cursors.last_mut() else {
                break;
            };
            let hops = path.len() - 1;
            let importers = &self.importers[node.index()];

            let mut next = None;
            if max_hops.map_or(true, |max| hops < max) {
                while *cursor < importers.len() {
                    let candidate = importers[*cursor];
                    *cursor += 1;
                    if !on_path[candidate.index()] {
                        next = Some(candidate);
                        break;
                    }
                }
            }

            match next {
                Some(child) => {
                    on_path[child.index()] = true;
                    path.push(child);
                    cursors.push(0);
                    if self.is_chain_end(child, &on_path, hops + 1, max_hops) {
                        chains.push(path.clone());
                    }
                }
                None => {
                    on_path[node.index()] = false;
                    path.pop();
                    cursors.pop();
                }
            }
        }

        chains
    }

    fn is_chain_end(
        &self,
        node: NodeIndex,
        on_path: &[bool],
        hops: usize,
        max_hops: Option<usize>,
    ) -> bool {
        let importers = &self.importers[node.index()];
        importers.is_empty()
            || max_hops.is_some_and(|max| hops >= max)
            || importers.iter().any(|imp| on_path[imp.index()])
    }

    /// Hops on the longest simple importer path from `start`, capped at
    /// `limit`. Returns as soon as some path reaches `limit`.
    pub fn depth(&self, start: NodeIndex, limit: usize) -> usize {
        let mut on_path = vec![false; self.importers.len()];
        let mut path = vec![start];
        let mut cursors = vec![0usize];
        on_path[start.index()] = true;
        let mut deepest = 0;

        loop {
            let Some(&node) = path.last() else {
                break;
            };
            let Some(cursor) = cursors.last_mut() else {
                break;
            };
            let hops = path.len() - 1;
            deepest = deepest.max(hops);
            if deepest >= limit {
                return limit;
            }

            let importers = &self.importers[node.index()];
            let mut next = None;
            while *cursor < importers.len() {
                let candidate = importers[*cursor];
                *cursor += 1;
                if !on_path[candidate.index()] {
                    next = Some(candidate);
                    break;
                }
            }

            match next {
                Some(child) => {
                    on_path[child.index()] = true;
                    path.push(child);
                    cursors.push(0);
                }
                None => {
                    on_path[node.index()] = false;
                    path.pop();
                    cursors.pop();
                }
            }
        }

        deepest
    }

    /// `chains` rendered as paths. Unknown files yield a single `[path]` chain.
    pub fn chain_paths(&self, path: &str, max_hops: Option<usize>) -> Vec<Vec<String>> {
        match self.graph.index_of(path) {
            Some(idx) => self
                .chains(idx, max_hops)
                .iter()
                .map(|chain| self.to_paths(chain))
                .collect(),
            None => vec![vec![path.to_string()]],
        }
    }
}

/// Output of the reachability phase.
#[derive(Debug, Clone, Default)]
pub struct Reachability {
    pub report: DependencyReport,
    pub target_files: BTreeSet<String>,
    /// Files that are both a direct and an indirect importer somewhere.
    pub intersections: BTreeSet<String>,
    /// intersection file → packages it leads to
    pub intersection_packages: BTreeMap<String, BTreeSet<String>>,
    /// intersection file → its own importer chains
    pub intersection_chains: BTreeMap<String, Vec<Vec<String>>>,
}

/// Packages to follow: the configured ones, or every package in the facts.
pub fn tracked_packages(config: &AnalysisConfig, facts: &[FileFacts]) -> Vec<String> {
    if !config.tracked_packages.is_empty() {
        return config.tracked_packages.clone();
    }
    let found: BTreeSet<&String> = facts.iter().flat_map(|f| f.usage.keys()).collect();
    found.into_iter().cloned().collect()
}

/// Run the reachability phase over the import graph.
pub fn run_reachability_phase(
    config: &AnalysisConfig,
    facts: &[FileFacts],
    graph: &ImportGraph,
) -> Reachability {
    let walker = ChainWalker::new(graph);
    let mut reach = Reachability::default();
    let mut global_direct: BTreeSet<String> = BTreeSet::new();
    let mut global_indirect: BTreeSet<String> = BTreeSet::new();
    let mut packages_of: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut chain_cache: HashMap<NodeIndex, Vec<Vec<String>>> = HashMap::new();
    let depth_limit = config
        .max_chain_depth
        .map_or(config.max_depth, |hops| hops.min(config.max_depth));

    for package in tracked_packages(config, facts) {
        let targets: BTreeSet<String> = facts
            .iter()
            .filter(|f| f.uses_package(&package))
            .map(|f| normalize_path(&f.file))
            .collect();

        let mut files = BTreeMap::new();
        for target in targets {
            let Some(idx) = graph.index_of(&target) else {
                log::debug!("{target} uses {package} but is not in the import graph");
                continue;
            };

            let direct = walker.to_paths(&walker.direct_importers(idx));
            let indirect = walker.to_paths(&walker.indirect_importers(idx));
            let chains = chain_cache
                .entry(idx)
                .or_insert_with(|| walker.chain_paths(&target, config.max_chain_depth))
                .clone();

            let total: BTreeSet<&String> = direct.iter().chain(indirect.iter()).collect();
            for file in &total {
                packages_of
                    .entry((*file).clone())
                    .or_default()
                    .insert(package.clone());
            }
            let depth = walker.depth(idx, depth_limit);

            global_direct.extend(direct.iter().cloned());
            global_indirect.extend(indirect.iter().cloned());
            reach.target_files.insert(target.clone());

            files.insert(
                target,
                FileDependencies {
                    total_importers: total.len(),
                    direct_importers: direct,
                    indirect_importers: indirect,
                    import_chains: chains,
                    depth,
                },
            );
        }

        reach.report.insert(package, PackageDependencies { files });
    }

    reach.intersections = global_direct
        .intersection(&global_indirect)
        .cloned()
        .collect();

    for file in &reach.intersections {
        let chains = walker.chain_paths(file, config.max_chain_depth);
        reach.intersection_chains.insert(file.clone(), chains);
        reach.intersection_packages.insert(
            file.clone(),
            packages_of.get(file).cloned().unwrap_or_default(),
        );
    }

    log::info!(
        "Reachability: {} target files, {} intersection files",
        reach.target_files.len(),
        reach.intersections.len()
    );
    reach
}
