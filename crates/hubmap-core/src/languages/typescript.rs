//! TypeScript/JavaScript analyser: module references and JSX elements.

use tree_sitter::{Language, Node, Tree};

use super::{ImportBinding, ImportStatement, ImportedName, JsxElement, LanguageAnalyser};

/// Shared analyser for TypeScript, TSX, JavaScript, JSX.
pub struct TypeScriptAnalyser;

impl Default for TypeScriptAnalyser {
    fn default() -> Self {
        Self
    }
}

impl TypeScriptAnalyser {
    pub fn new() -> Self {
        Self
    }

    fn get_ts_language() -> Language {
        tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()
    }

    fn get_tsx_language() -> Language {
        tree_sitter_typescript::LANGUAGE_TSX.into()
    }

    fn get_js_language() -> Language {
        tree_sitter_javascript::LANGUAGE.into()
    }

    fn text<'s>(node: &Node, source: &'s [u8]) -> &'s str {
        node.utf8_text(source).unwrap_or("")
    }

    /// Contents of a string literal, or a template literal without
    /// substitutions.
    fn string_value(node: &Node, source: &[u8]) -> Option<String> {
        match node.kind() {
            "string" => {
                let mut cursor = node.walk();
                let value = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "string_fragment")
                    .map(|c| Self::text(&c, source))
                    .collect::<String>();
                Some(value)
            }
            "template_string" => {
                let mut cursor = node.walk();
                if node
                    .named_children(&mut cursor)
                    .any(|c| c.kind() == "template_substitution")
                {
                    return None;
                }
                Some(Self::text(node, source).trim_matches('`').to_string())
            }
            _ => None,
        }
    }

    fn import_bindings(clause: &Node, source: &[u8]) -> Vec<ImportBinding> {
        let mut bindings = Vec::new();
        let mut cursor = clause.walk();
        for child in clause.named_children(&mut cursor) {
            match child.kind() {
                "identifier" => bindings.push(ImportBinding {
                    local: Self::text(&child, source).to_string(),
                    imported: ImportedName::Default,
                }),
                "namespace_import" => {
                    let mut inner = child.walk();
                    let id = child
                        .named_children(&mut inner)
                        .find(|c| c.kind() == "identifier");
                    if let Some(id) = id {
                        bindings.push(ImportBinding {
                            local: Self::text(&id, source).to_string(),
                            imported: ImportedName::Namespace,
                        });
                    }
                }
                "named_imports" => {
                    let mut inner = child.walk();
                    for spec in child
                        .named_children(&mut inner)
                        .filter(|c| c.kind() == "import_specifier")
                    {
                        let Some(name) = spec.child_by_field_name("name") else {
                            continue;
                        };
                        let imported = Self::text(&name, source).trim_matches(['"', '\'']);
                        let local = spec
                            .child_by_field_name("alias")
                            .map(|a| Self::text(&a, source))
                            .unwrap_or(imported);
                        let imported = if imported == "default" {
                            ImportedName::Default
                        } else {
                            ImportedName::Named(imported.to_string())
                        };
                        bindings.push(ImportBinding {
                            local: local.to_string(),
                            imported,
                        });
                    }
                }
                _ => {}
            }
        }
        bindings
    }

    fn collect_imports(node: &Node, source: &[u8], imports: &mut Vec<ImportStatement>) {
        match node.kind() {
            "import_statement" => {
                if let Some(specifier) = node
                    .child_by_field_name("source")
                    .and_then(|s| Self::string_value(&s, source))
                {
                    let mut cursor = node.walk();
                    let bindings = node
                        .named_children(&mut cursor)
                        .find(|c| c.kind() == "import_clause")
                        .map(|clause| Self::import_bindings(&clause, source))
                        .unwrap_or_default();
                    imports.push(ImportStatement {
                        specifier,
                        bindings,
                        line: node.start_position().row + 1,
                    });
                }
                return;
            }
            "export_statement" => {
                if let Some(specifier) = node
                    .child_by_field_name("source")
                    .and_then(|s| Self::string_value(&s, source))
                {
                    imports.push(ImportStatement {
                        specifier,
                        bindings: Vec::new(),
                        line: node.start_position().row + 1,
                    });
                }
            }
            "call_expression" => {
                if let Some(specifier) = Self::call_specifier(node, source) {
                    imports.push(ImportStatement {
                        specifier,
                        bindings: Vec::new(),
                        line: node.start_position().row + 1,
                    });
                }
            }
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            Self::collect_imports(&child, source, imports);
        }
    }

    /// `require("x")` or `import("x")` with a literal argument.
    fn call_specifier(node: &Node, source: &[u8]) -> Option<String> {
        let callee = node.child_by_field_name("function")?;
        let is_loader = match callee.kind() {
            "import" => true,
            "identifier" => Self::text(&callee, source) == "require",
            _ => false,
        };
        if !is_loader {
            return None;
        }
        let args = node.child_by_field_name("arguments")?;
        let mut cursor = args.walk();
        let first = args.named_children(&mut cursor).next()?;
        Self::string_value(&first, source)
    }

    fn collect_elements(node: &Node, source: &[u8], elements: &mut Vec<JsxElement>) {
        if matches!(node.kind(), "jsx_opening_element" | "jsx_self_closing_element") {
            if let Some(name) = node.child_by_field_name("name") {
                let mut cursor = node.walk();
                let props = node
                    .named_children(&mut cursor)
                    .filter(|c| c.kind() == "jsx_attribute")
                    .filter_map(|attr| {
                        let mut inner = attr.walk();
                        let first = attr.named_children(&mut inner).next()?;
                        Some(Self::text(&first, source).to_string())
                    })
                    .collect();
                elements.push(JsxElement {
                    name: Self::text(&name, source).to_string(),
                    props,
                    line: node.start_position().row + 1,
                });
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            Self::collect_elements(&child, source, elements);
        }
    }
}

impl LanguageAnalyser for TypeScriptAnalyser {
    fn extensions(&self) -> &[&str] {
        &["ts", "tsx", "js", "jsx", "mjs", "cjs"]
    }

    fn language_name(&self) -> &str {
        "TypeScript"
    }

    fn get_language(&self) -> Language {
        Self::get_ts_language()
    }

    fn get_language_for_ext(&self, ext: &str) -> Language {
        match ext {
            "tsx" => Self::get_tsx_language(),
            "js" | "jsx" | "mjs" | "cjs" => Self::get_js_language(),
            _ => Self::get_ts_language(),
        }
    }

    fn extract_imports(&self, tree: &Tree, source: &[u8]) -> Vec<ImportStatement> {
        let mut imports = Vec::new();
        Self::collect_imports(&tree.root_node(), source, &mut imports);
        imports
    }

    fn extract_elements(&self, tree: &Tree, source: &[u8]) -> Vec<JsxElement> {
        let mut elements = Vec::new();
        Self::collect_elements(&tree.root_node(), source, &mut elements);
        elements
    }
}
