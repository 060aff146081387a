//! Language analyser trait and registry.

use std::collections::HashMap;

use tree_sitter::{Language, Tree};

pub mod typescript;

/// How a local name was bound by an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportedName {
    Default,
    /// `* as local`
    Namespace,
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub local: String,
    pub imported: ImportedName,
}

/// One module reference found in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement {
    /// The specifier exactly as written.
    pub specifier: String,
    pub bindings: Vec<ImportBinding>,
    pub line: usize,
}

/// A JSX opening or self-closing element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsxElement {
    /// Element name as written, e.g. `Button`, `UI.Button`, `Form.Item`.
    pub name: String,
    /// Attribute names, spreads excluded.
    pub props: Vec<String>,
    pub line: usize,
}

/// Trait that all language analysers implement.
pub trait LanguageAnalyser: Send + Sync {
    /// File extensions this analyser handles (e.g. &["ts"]).
    fn extensions(&self) -> &[&str];

    fn language_name(&self) -> &str;

    fn get_language(&self) -> Language;

    /// Override for analysers that parse several dialects.
    fn get_language_for_ext(&self, _ext: &str) -> Language {
        self.get_language()
    }

    /// Static imports, re-exports, `require()` and dynamic `import()`.
    fn extract_imports(&self, tree: &Tree, source: &[u8]) -> Vec<ImportStatement>;

    /// Every JSX element in the file.
    fn extract_elements(&self, tree: &Tree, source: &[u8]) -> Vec<JsxElement>;
}

/// Registry mapping file extensions to analysers.
pub struct AnalyserRegistry {
    analysers: Vec<Box<dyn LanguageAnalyser>>,
    extension_map: HashMap<String, usize>,
}

impl AnalyserRegistry {
    pub fn new() -> Self {
        let analysers: Vec<Box<dyn LanguageAnalyser>> =
            vec![Box::new(typescript::TypeScriptAnalyser::new())];

        let mut extension_map = HashMap::new();
        for (i, analyser) in analysers.iter().enumerate() {
            for ext in analyser.extensions() {
                extension_map.insert(ext.to_string(), i);
            }
        }

        Self {
            analysers,
            extension_map,
        }
    }

    pub fn get_by_extension(&self, ext: &str) -> Option<&dyn LanguageAnalyser> {
        self.extension_map
            .get(ext)
            .map(|&i| self.analysers[i].as_ref())
    }
}

impl Default for AnalyserRegistry {
    fn default() -> Self {
        Self::new()
    }
}
