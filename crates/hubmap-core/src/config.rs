//! Core data types and configuration for hubmap analysis.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// How directly one file reaches another through the importer graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DependencyType {
    Direct,
    Indirect,
    Both,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Indirect => "indirect",
            Self::Both => "both",
        }
    }

    /// Join of two observations of the same pair. Conflicting types become `Both`.
    pub fn join(self, other: Self) -> Self {
        if self == other {
            self
        } else {
            Self::Both
        }
    }
}

impl std::fmt::Display for DependencyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural role of a hub in the hub-to-hub graph.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum HubCategory {
    /// Depends on other hubs, used by none.
    Main,
    /// Depends on other hubs and is used by others.
    Intermediate,
    /// Used by other hubs, depends on none.
    Base,
    /// No hub-to-hub edges, reached by exactly one feature.
    Isolated,
}

impl HubCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "Main",
            Self::Intermediate => "Intermediate",
            Self::Base => "Base",
            Self::Isolated => "Isolated",
        }
    }
}

impl std::fmt::Display for HubCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Input facts
// ---------------------------------------------------------------------------

/// Usage counters for one component of a tracked package inside one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComponentUsage {
    #[serde(default)]
    pub imported: u32,
    #[serde(default)]
    pub used: u32,
    /// prop name → number of elements passing it
    #[serde(default)]
    pub props: BTreeMap<String, u32>,
}

/// component name → usage
pub type PackageUsage = BTreeMap<String, ComponentUsage>;

/// Everything the extraction collaborator knows about one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileFacts {
    pub file: String,
    /// package → component → usage
    #[serde(default)]
    pub usage: BTreeMap<String, PackageUsage>,
    /// Raw import specifiers exactly as written in the source.
    #[serde(default)]
    pub imports: Vec<String>,
}

impl FileFacts {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            ..Default::default()
        }
    }

    /// True when at least one component of `package` is used in this file.
    pub fn uses_package(&self, package: &str) -> bool {
        self.usage
            .get(package)
            .is_some_and(|components| components.values().any(|c| c.used > 0))
    }

    /// package → "has a used component", for every package seen in the file.
    pub fn tracked_usage(&self) -> BTreeMap<String, bool> {
        self.usage
            .keys()
            .map(|pkg| (pkg.clone(), self.uses_package(pkg)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub repo_path: String,
    pub output_path: Option<String>,
    /// Packages whose usage seeds the analysis. Empty means every package
    /// found in the facts.
    #[serde(default)]
    pub tracked_packages: Vec<String>,
    #[serde(default)]
    pub include_patterns: Vec<String>,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    /// alias pattern → repo-relative target, e.g. `@/*` → `src/*`
    #[serde(default)]
    pub aliases: BTreeMap<String, String>,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    /// Hard ceiling on chain hops. `None` walks until roots or cycles.
    #[serde(default)]
    pub max_chain_depth: Option<usize>,
    /// Ceiling for the per-file depth report.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub quiet: bool,
}

fn default_extensions() -> Vec<String> {
    ["js", "jsx", "ts", "tsx", "mjs", "cjs"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_max_depth() -> usize {
    10
}
fn default_max_file_size() -> u64 {
    1_000_000
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            repo_path: String::new(),
            output_path: None,
            tracked_packages: Vec::new(),
            include_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            aliases: BTreeMap::new(),
            extensions: default_extensions(),
            max_chain_depth: None,
            max_depth: default_max_depth(),
            max_file_size: default_max_file_size(),
            verbose: false,
            quiet: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Dependency report
// ---------------------------------------------------------------------------

/// Reachability of one tracked-package file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FileDependencies {
    #[serde(default)]
    pub direct_importers: Vec<String>,
    #[serde(default)]
    pub indirect_importers: Vec<String>,
    #[serde(default)]
    pub total_importers: usize,
    #[serde(default)]
    pub import_chains: Vec<Vec<String>>,
    /// Longest chain in hops, capped at the configured ceiling.
    #[serde(default)]
    pub depth: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PackageDependencies {
    #[serde(default)]
    pub files: BTreeMap<String, FileDependencies>,
}

/// package → per-file reachability
pub type DependencyReport = BTreeMap<String, PackageDependencies>;

// ---------------------------------------------------------------------------
// Intersection report
// ---------------------------------------------------------------------------

/// A file one hop further along some chain through a hub.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DependencyPath {
    pub path: String,
    pub count: usize,
    #[serde(default)]
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hub {
    pub path: String,
    pub name: String,
    pub intersection_count: usize,
    #[serde(default)]
    pub intersections: Vec<String>,
    pub chain_count: usize,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub dependency_paths: Vec<DependencyPath>,
    #[serde(default)]
    pub category: Option<HubCategory>,
}

/// A hub referenced from one intersection file's grouped chains.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntersectionHub {
    pub path: String,
    pub name: String,
    pub chain_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntersectionHubs {
    pub name: String,
    pub hubs_count: usize,
    #[serde(default)]
    pub hubs: Vec<IntersectionHub>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FeatureHub {
    pub path: String,
    pub name: String,
    pub chain_count: usize,
    pub dependency_type: DependencyType,
    #[serde(default)]
    pub category: Option<HubCategory>,
    #[serde(default)]
    pub dependency_paths: Vec<DependencyPath>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub packages: Vec<String>,
    pub hubs_count: usize,
    #[serde(default)]
    pub hubs: Vec<FeatureHub>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HubLink {
    pub target: String,
    #[serde(rename = "type")]
    pub dependency_type: DependencyType,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HubUser {
    pub hub: String,
    #[serde(rename = "type")]
    pub dependency_type: DependencyType,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HubDependencies {
    #[serde(default)]
    pub depends_on: Vec<HubLink>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HubUsage {
    #[serde(default)]
    pub used_by: Vec<HubUser>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HubCategories {
    #[serde(default)]
    pub base_hubs: Vec<String>,
    #[serde(default)]
    pub main_hubs: Vec<String>,
    #[serde(default)]
    pub intermediate_hubs: Vec<String>,
    #[serde(default)]
    pub isolated_hubs: Vec<String>,
}

impl HubCategories {
    /// Category of `path`, if it was placed in one.
    pub fn category_of(&self, path: &str) -> Option<HubCategory> {
        let contains = |list: &Vec<String>| list.iter().any(|p| p == path);
        if contains(&self.main_hubs) {
            Some(HubCategory::Main)
        } else if contains(&self.intermediate_hubs) {
            Some(HubCategory::Intermediate)
        } else if contains(&self.base_hubs) {
            Some(HubCategory::Base)
        } else if contains(&self.isolated_hubs) {
            Some(HubCategory::Isolated)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IntersectionStats {
    pub tracked_packages: usize,
    pub target_files: usize,
    pub intersections: usize,
    pub hubs: usize,
    pub features: usize,
    pub main_hubs: usize,
    pub intermediate_hubs: usize,
    pub base_hubs: usize,
    pub isolated_hubs: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntersectionReport {
    #[serde(default)]
    pub stats: IntersectionStats,
    #[serde(default)]
    pub intersection_importers: Vec<String>,
    #[serde(default)]
    pub global_import_hubs: Vec<Hub>,
    #[serde(default)]
    pub global_import_hub_by_intersection: BTreeMap<String, IntersectionHubs>,
    #[serde(default)]
    pub features: Vec<Feature>,
    #[serde(default)]
    pub hub_dependencies: BTreeMap<String, HubDependencies>,
    #[serde(default)]
    pub hub_usage: BTreeMap<String, HubUsage>,
    #[serde(default)]
    pub hub_categories: HubCategories,
}

/// Result of an analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub dependencies: DependencyReport,
    #[serde(default)]
    pub intersections: IntersectionReport,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for AnalysisResult {
    fn default() -> Self {
        Self {
            version: default_version(),
            metadata: HashMap::new(),
            dependencies: DependencyReport::new(),
            intersections: IntersectionReport::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_type_join() {
        assert_eq!(
            DependencyType::Direct.join(DependencyType::Direct),
            DependencyType::Direct
        );
        assert_eq!(
            DependencyType::Direct.join(DependencyType::Indirect),
            DependencyType::Both
        );
        assert_eq!(
            DependencyType::Both.join(DependencyType::Indirect),
            DependencyType::Both
        );
    }

    #[test]
    fn dependency_type_serializes_lowercase() {
        let link = HubLink {
            target: "src/a.js".to_string(),
            dependency_type: DependencyType::Both,
        };
        let json = serde_json::to_string(&link).unwrap();
        assert!(json.contains("\"type\":\"both\""));
    }

    #[test]
    fn analysis_config_defaults() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.max_depth, 10);
        assert_eq!(cfg.max_chain_depth, None);
        assert_eq!(cfg.max_file_size, 1_000_000);
        assert!(cfg.extensions.contains(&"tsx".to_string()));
    }

    #[test]
    fn facts_uses_package_requires_used_component() {
        let mut facts = FileFacts::new("src/a.js");
        let mut components = PackageUsage::new();
        components.insert(
            "Button".to_string(),
            ComponentUsage {
                imported: 1,
                used: 0,
                props: BTreeMap::new(),
            },
        );
        facts.usage.insert("@acme/ui".to_string(), components);
        assert!(!facts.uses_package("@acme/ui"));

        facts
            .usage
            .get_mut("@acme/ui")
            .unwrap()
            .get_mut("Button")
            .unwrap()
            .used = 2;
        assert!(facts.uses_package("@acme/ui"));
        assert_eq!(facts.tracked_usage().get("@acme/ui"), Some(&true));
        assert!(!facts.uses_package("other"));
    }

    #[test]
    fn facts_missing_fields_default() {
        let facts: FileFacts = serde_json::from_str(r#"{"file":"src/a.js"}"#).unwrap();
        assert!(facts.usage.is_empty());
        assert!(facts.imports.is_empty());
    }

    #[test]
    fn file_dependencies_camel_case() {
        let deps = FileDependencies {
            direct_importers: vec!["a".into()],
            ..Default::default()
        };
        let json = serde_json::to_string(&deps).unwrap();
        assert!(json.contains("directImporters"));
        assert!(json.contains("importChains"));
        assert!(json.contains("totalImporters"));
    }

    #[test]
    fn category_lookup() {
        let categories = HubCategories {
            main_hubs: vec!["m".into()],
            base_hubs: vec!["b".into()],
            ..Default::default()
        };
        assert_eq!(categories.category_of("m"), Some(HubCategory::Main));
        assert_eq!(categories.category_of("b"), Some(HubCategory::Base));
        assert_eq!(categories.category_of("x"), None);
    }

    #[test]
    fn analysis_result_default() {
        let result = AnalysisResult::default();
        assert_eq!(result.version, "1.0");
        assert!(result.dependencies.is_empty());
        assert!(result.intersections.features.is_empty());
    }
}
