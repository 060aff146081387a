//! In-memory importer graph backed by petgraph::DiGraph.
//!
//! Nodes are repository-relative file paths; the `NodeIndex` doubles as the
//! interned file ID used by the chain walker. Edges point from the importing
//! file to the imported file, so the importers of a file are its incoming
//! neighbours.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub struct ImportGraph {
    graph: DiGraph<String, ()>,
    /// O(1) path → NodeIndex lookup.
    id_index: HashMap<String, NodeIndex>,
}

impl ImportGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            id_index: HashMap::new(),
        }
    }

    /// Get or create the node for `path`.
    pub fn ensure_file(&mut self, path: &str) -> NodeIndex {
        if let Some(&idx) = self.id_index.get(path) {
            idx
        } else {
            let idx = self.graph.add_node(path.to_string());
            self.id_index.insert(path.to_string(), idx);
            idx
        }
    }

    /// Record `importer` as an importer of `imported`.
    ///
    /// Returns false when nothing was added: self-imports and repeated edges
    /// are ignored so the graph stays a set of edges.
    pub fn add_import(&mut self, importer: &str, imported: &str) -> bool {
        if importer == imported {
            return false;
        }
        let from = self.ensure_file(importer);
        let to = self.ensure_file(imported);
        if self.graph.find_edge(from, to).is_some() {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    pub fn index_of(&self, path: &str) -> Option<NodeIndex> {
        self.id_index.get(path).copied()
    }

    pub fn path(&self, idx: NodeIndex) -> &str {
        &self.graph[idx]
    }

    pub fn has_file(&self, path: &str) -> bool {
        self.id_index.contains_key(path)
    }

    pub fn file_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// All file paths, sorted.
    pub fn files(&self) -> Vec<&str> {
        let mut files: Vec<&str> = self.graph.node_weights().map(|p| p.as_str()).collect();
        files.sort_unstable();
        files
    }

    /// Importers of `path`, sorted lexicographically.
    pub fn importers(&self, path: &str) -> Vec<&str> {
        let Some(idx) = self.index_of(path) else {
            return Vec::new();
        };
        let mut importers: Vec<&str> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| self.graph[n].as_str())
            .collect();
        importers.sort_unstable();
        importers
    }

    /// Number of distinct files importing `path`.
    pub fn usage_count(&self, path: &str) -> usize {
        self.index_of(path)
            .map(|idx| self.usage_count_of(idx))
            .unwrap_or(0)
    }

    pub fn usage_count_of(&self, idx: NodeIndex) -> usize {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .count()
    }

    /// Importer lists for every node, indexed by `NodeIndex::index()` and
    /// sorted by path so walks are reproducible.
    pub fn sorted_importers(&self) -> Vec<Vec<NodeIndex>> {
        self.graph
            .node_indices()
            .map(|idx| {
                let mut importers: Vec<NodeIndex> = self
                    .graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .collect();
                importers.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
                importers
            })
            .collect()
    }

    /// The reverse adjacency map: imported file → importers. Files nobody
    /// imports are omitted.
    pub fn file_usages(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut usages: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for edge in self.graph.raw_edges() {
            usages
                .entry(self.graph[edge.target()].clone())
                .or_default()
                .insert(self.graph[edge.source()].clone());
        }
        usages
    }
}

impl Default for ImportGraph {
    fn default() -> Self {
        Self::new()
    }
}
