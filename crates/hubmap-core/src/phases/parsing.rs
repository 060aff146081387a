//! Phase 2: parse every selected file and extract its facts.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use rayon::prelude::*;

use crate::config::{AnalysisConfig, FileFacts, PackageUsage};
use crate::error::AnalysisError;
use crate::languages::{AnalyserRegistry, ImportStatement, ImportedName, JsxElement};
use crate::phases::structure::SourceTree;

/// Package a specifier belongs to. With no tracked packages every bare
/// specifier maps to its npm package root.
pub fn package_for(specifier: &str, tracked: &[String]) -> Option<String> {
    if tracked.is_empty() {
        return package_root(specifier);
    }
    tracked
        .iter()
        .filter(|pkg| {
            specifier == pkg.as_str()
                || specifier
                    .strip_prefix(pkg.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .max_by_key(|pkg| pkg.len())
        .cloned()
}

/// `@scope/name` or `name` for a bare specifier.
fn package_root(specifier: &str) -> Option<String> {
    if specifier.is_empty()
        || specifier.starts_with('.')
        || specifier.starts_with('/')
        || specifier.contains(':')
    {
        return None;
    }
    let mut parts = specifier.split('/');
    let first = parts.next()?;
    if first.starts_with('@') {
        let second = parts.next().filter(|s| !s.is_empty())?;
        Some(format!("{first}/{second}"))
    } else {
        Some(first.to_string())
    }
}

/// Per-package component usage from a file's imports and JSX elements.
///
/// Named and default bindings count as `imported`. An element counts as
/// `used` when its root name is such a binding (`Form.Item` counts for
/// `Form`) or when it reaches a member through a namespace import
/// (`UI.Button` counts for `Button`).
pub fn component_usage(
    imports: &[ImportStatement],
    elements: &[JsxElement],
    tracked: &[String],
) -> BTreeMap<String, PackageUsage> {
    let mut usage: BTreeMap<String, PackageUsage> = BTreeMap::new();
    let mut locals: HashMap<&str, (String, String)> = HashMap::new();
    let mut namespaces: HashMap<&str, String> = HashMap::new();

    for import in imports {
        let Some(package) = package_for(&import.specifier, tracked) else {
            continue;
        };
        for binding in &import.bindings {
            let component = match &binding.imported {
                ImportedName::Namespace => {
                    namespaces.insert(binding.local.as_str(), package.clone());
                    continue;
                }
                ImportedName::Default => binding.local.clone(),
                ImportedName::Named(name) => name.clone(),
            };
            usage
                .entry(package.clone())
                .or_default()
                .entry(component.clone())
                .or_default()
                .imported += 1;
            locals.insert(binding.local.as_str(), (package.clone(), component));
        }
    }

    for element in elements {
        let mut parts = element.name.split('.');
        let Some(root) = parts.next() else {
            continue;
        };
        let target = match locals.get(root) {
            Some((package, component)) => Some((package.clone(), component.clone())),
            None => namespaces.get(root).and_then(|package| {
                parts
                    .next()
                    .map(|member| (package.clone(), member.to_string()))
            }),
        };
        let Some((package, component)) = target else {
            continue;
        };

        let entry = usage
            .entry(package)
            .or_default()
            .entry(component)
            .or_default();
        entry.used += 1;
        for prop in &element.props {
            *entry.props.entry(prop.clone()).or_insert(0) += 1;
        }
    }

    usage
}

/// Parse one file into facts.
pub fn parse_file(
    registry: &AnalyserRegistry,
    root: &Path,
    rel_path: &str,
    tracked: &[String],
) -> Result<FileFacts, AnalysisError> {
    let ext = Path::new(rel_path)
        .extension()
        .map(|e| e.to_string_lossy().to_string())
        .unwrap_or_default();
    let analyser = registry
        .get_by_extension(&ext)
        .ok_or_else(|| AnalysisError::InvalidInput(format!("no analyser for {rel_path}")))?;

    let source = std::fs::read(root.join(rel_path))?;
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(&analyser.get_language_for_ext(&ext))
        .map_err(|e| AnalysisError::InvalidInput(format!("{rel_path}: {e}")))?;
    let tree = parser
        .parse(&source, None)
        .ok_or_else(|| AnalysisError::InvalidInput(format!("{rel_path}: parse failed")))?;

    let imports = analyser.extract_imports(&tree, &source);
    let elements = analyser.extract_elements(&tree, &source);
    log::debug!(
        "{rel_path} ({}): {} imports, {} JSX elements",
        analyser.language_name(),
        imports.len(),
        elements.len()
    );
    for import in &imports {
        log::trace!("{rel_path}:{} imports {}", import.line, import.specifier);
    }
    for element in &elements {
        log::trace!("{rel_path}:{} renders <{}>", element.line, element.name);
    }

    Ok(FileFacts {
        file: rel_path.to_string(),
        usage: component_usage(&imports, &elements, tracked),
        imports: imports.into_iter().map(|i| i.specifier).collect(),
    })
}

/// Run the parsing phase over the selected files, in parallel.
pub fn run_parsing_phase(config: &AnalysisConfig, tree: &SourceTree) -> Vec<FileFacts> {
    let registry = AnalyserRegistry::new();
    let root = Path::new(&config.repo_path);
    let files: Vec<&String> = tree.included.iter().collect();

    let mut facts: Vec<FileFacts> = files
        .par_iter()
        .filter_map(|rel_path| {
            match parse_file(&registry, root, rel_path, &config.tracked_packages) {
                Ok(facts) => Some(facts),
                Err(e) => {
                    log::warn!("Skipping {rel_path}: {e}");
                    None
                }
            }
        })
        .collect();
    facts.sort_by(|a, b| a.file.cmp(&b.file));

    log::info!("Parsing: {} of {} files extracted", facts.len(), files.len());
    facts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::ImportBinding;

    fn import(specifier: &str, bindings: &[(&str, ImportedName)]) -> ImportStatement {
        ImportStatement {
            specifier: specifier.to_string(),
            bindings: bindings
                .iter()
                .map(|(local, imported)| ImportBinding {
                    local: local.to_string(),
                    imported: imported.clone(),
                })
                .collect(),
            line: 1,
        }
    }

    fn element(name: &str, props: &[&str]) -> JsxElement {
        JsxElement {
            name: name.to_string(),
            props: props.iter().map(|p| p.to_string()).collect(),
            line: 1,
        }
    }

    #[test]
    fn package_matching() {
        let tracked = vec!["@acme/ui".to_string(), "@acme/ui-charts".to_string()];
        assert_eq!(package_for("@acme/ui", &tracked).as_deref(), Some("@acme/ui"));
        assert_eq!(package_for("@acme/ui/Button", &tracked).as_deref(), Some("@acme/ui"));
        assert_eq!(
            package_for("@acme/ui-charts", &tracked).as_deref(),
            Some("@acme/ui-charts")
        );
        assert_eq!(package_for("react", &tracked), None);
    }

    #[test]
    fn untracked_mode_uses_package_roots() {
        assert_eq!(package_for("lodash/merge", &[]).as_deref(), Some("lodash"));
        assert_eq!(package_for("@acme/ui/Button", &[]).as_deref(), Some("@acme/ui"));
        assert_eq!(package_for("./local", &[]), None);
        assert_eq!(package_for("@scope", &[]), None);
    }

    #[test]
    fn named_aliased_and_member_usage() {
        let tracked = vec!["@acme/ui".to_string()];
        let imports = vec![import(
            "@acme/ui",
            &[
                ("Button", ImportedName::Named("Button".into())),
                ("Dialog", ImportedName::Named("Modal".into())),
                ("Form", ImportedName::Named("Form".into())),
            ],
        )];
        let elements = vec![
            element("Button", &["primary", "onClick"]),
            element("Button", &["primary"]),
            element("Dialog", &[]),
            element("Form.Item", &["name"]),
            element("div", &["className"]),
        ];
        let usage = component_usage(&imports, &elements, &tracked);
        let ui = &usage["@acme/ui"];
        assert_eq!(ui["Button"].imported, 1);
        assert_eq!(ui["Button"].used, 2);
        assert_eq!(ui["Button"].props["primary"], 2);
        assert_eq!(ui["Modal"].used, 1);
        assert_eq!(ui["Form"].used, 1);
        assert_eq!(ui["Form"].props["name"], 1);
    }

    #[test]
    fn namespace_usage_counts_members() {
        let tracked = vec!["@acme/ui".to_string()];
        let imports = vec![import("@acme/ui", &[("UI", ImportedName::Namespace)])];
        let elements = vec![element("UI.Card", &["title"]), element("UI", &[])];
        let usage = component_usage(&imports, &elements, &tracked);
        assert_eq!(usage["@acme/ui"]["Card"].used, 1);
        assert_eq!(usage["@acme/ui"]["Card"].imported, 0);
        assert_eq!(usage["@acme/ui"].len(), 1);
    }

    #[test]
    fn imported_but_unused_is_not_usage() {
        let tracked = vec!["@acme/ui".to_string()];
        let imports = vec![import("@acme/ui", &[("Button", ImportedName::Named("Button".into()))])];
        let usage = component_usage(&imports, &[], &tracked);
        let facts = FileFacts {
            file: "a.js".into(),
            usage,
            imports: vec!["@acme/ui".into()],
        };
        assert!(!facts.uses_package("@acme/ui"));
    }

    #[test]
    fn parse_file_extracts_facts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("Page.jsx"),
            "import { Button } from '@acme/ui';\nimport Layout from './Layout';\nexport default () => <Layout><Button size=\"s\" /></Layout>;\n",
        )
        .unwrap();
        let facts = parse_file(
            &AnalyserRegistry::new(),
            dir.path(),
            "Page.jsx",
            &["@acme/ui".to_string()],
        )
        .unwrap();
        assert_eq!(facts.imports, vec!["@acme/ui", "./Layout"]);
        assert!(facts.uses_package("@acme/ui"));
        assert_eq!(facts.usage["@acme/ui"]["Button"].props["size"], 1);
    }
}
