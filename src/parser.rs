//! C3 Parser Registry: per-language extraction of a `ParsedStructure`
//! (classes, functions, interfaces, imports), selected by file extension.
//!
//! Generalizes `ast.rs`'s tree-sitter `SymbolKind`/`Symbol`/`FileAst`
//! scaffold from a flat symbol list into the spec's closed `ParsedStructure`
//! record, and `scan.rs`'s per-language import regexes into the regex
//! fallback used for unsupported extensions and when the `treesitter`
//! feature is disabled.

use std::collections::HashSet;

use tracing::debug;

const MAX_METHODS_PER_CLASS: usize = 20;
const MAX_STANDALONE_FUNCTIONS: usize = 30;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParsedClass {
    pub name: String,
    pub methods: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParsedFunction {
    pub name: String,
    pub parameters: Vec<String>,
    pub is_exported: bool,
    pub is_async: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParsedInterface {
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParsedImport {
    pub name: String,
    pub from: String,
    pub alias: Option<String>,
}

/// Closed tagged record returned by every language extractor. Capability
/// languages add is `{parse, supported_extensions}` — no duck-typing.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ParsedStructure {
    pub classes: Vec<ParsedClass>,
    pub functions: Vec<ParsedFunction>,
    pub interfaces: Vec<ParsedInterface>,
    pub imports: Vec<ParsedImport>,
    pub dependencies: Vec<String>,
}

/// Parse `content` (extension `ext`, no leading dot) into a `ParsedStructure`.
/// Failures are caught and downgraded to an empty structure with a debug
/// log — never propagated, per spec §4.3.
pub fn parse(content: &str, ext: &str) -> ParsedStructure {
    #[cfg(feature = "treesitter")]
    {
        if let Some(structure) = treesitter::parse(content, ext) {
            return structure;
        }
    }
    match std::panic::catch_unwind(|| regex_fallback::parse(content, ext)) {
        Ok(structure) => structure,
        Err(_) => {
            debug!(ext, "parser fallback panicked; returning empty structure");
            ParsedStructure::default()
        }
    }
}

/// True if `name` reads as exported under this language's convention:
/// leading uppercase (Go), explicit `export`/`pub` keyword is checked by the
/// caller via `has_export_keyword` (JS/TS/Rust), absence of a `_` prefix
/// (Python).
fn is_exported_by_name_convention(name: &str, ext: &str) -> bool {
    match ext {
        "go" => name.chars().next().is_some_and(|c| c.is_uppercase()),
        "py" | "pyi" => !name.starts_with('_'),
        _ => true,
    }
}

fn cap_methods(methods: Vec<String>) -> Vec<String> {
    methods.into_iter().take(MAX_METHODS_PER_CLASS).collect()
}

fn cap_functions(functions: Vec<ParsedFunction>) -> Vec<ParsedFunction> {
    functions.into_iter().take(MAX_STANDALONE_FUNCTIONS).collect()
}

#[cfg(feature = "treesitter")]
mod treesitter {
    use super::*;
    use tree_sitter::{Language, Node, Parser};

    fn language_for_ext(ext: &str) -> Option<Language> {
        match ext {
            "rs" => Some(tree_sitter_rust::LANGUAGE.into()),
            "ts" | "tsx" => Some(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
            "js" | "jsx" | "mjs" | "cjs" => Some(tree_sitter_javascript::LANGUAGE.into()),
            "py" | "pyi" => Some(tree_sitter_python::LANGUAGE.into()),
            "go" => Some(tree_sitter_go::LANGUAGE.into()),
            "c" | "h" => Some(tree_sitter_c::LANGUAGE.into()),
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Some(tree_sitter_cpp::LANGUAGE.into()),
            "java" => Some(tree_sitter_java::LANGUAGE.into()),
            _ => None,
        }
    }

    fn node_name(node: &Node, source: &[u8]) -> Option<String> {
        node.child_by_field_name("name")
            .and_then(|n| n.utf8_text(source).ok())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn has_export_keyword(node: &Node, source: &[u8]) -> bool {
        let mut n = *node;
        loop {
            let text = n.utf8_text(source).unwrap_or("");
            let first_line = text.lines().next().unwrap_or("");
            if first_line.trim_start().starts_with("export")
                || first_line.trim_start().starts_with("pub ")
                || first_line.trim_start().starts_with("pub(")
            {
                return true;
            }
            match n.parent() {
                Some(p) if p.kind() == "export_statement" => return true,
                _ => return false,
            }
        }
    }

    fn is_async(node: &Node, source: &[u8]) -> bool {
        node.utf8_text(source).unwrap_or("").trim_start().starts_with("async")
    }

    /// Walk top-level declarations; descend into class/impl bodies one level
    /// to collect method names, never deeper (C3's flat-record contract).
    fn walk(root: &Node, source: &[u8], ext: &str) -> ParsedStructure {
        let mut structure = ParsedStructure::default();
        let mut cursor = root.walk();
        for child in root.children(&mut cursor) {
            visit_top_level(&child, source, ext, &mut structure);
        }
        structure.functions = cap_functions(structure.functions);
        for class in &mut structure.classes {
            class.methods = cap_methods(std::mem::take(&mut class.methods));
        }
        structure
    }

    fn visit_top_level(node: &Node, source: &[u8], ext: &str, out: &mut ParsedStructure) {
        match node.kind() {
            "export_statement" => {
                let mut cursor = node.walk();
                for child in node.children(&mut cursor) {
                    visit_top_level(&child, source, ext, out);
                }
            }
            "function_item" | "function_declaration" | "function_definition" => {
                let name = node_name(node, source).unwrap_or_default();
                if name.is_empty() {
                    return;
                }
                out.functions.push(ParsedFunction {
                    is_exported: has_export_keyword(node, source)
                        && is_exported_by_name_convention(&name, ext),
                    is_async: is_async(node, source),
                    parameters: extract_param_names(node, source),
                    name,
                });
            }
            "class_declaration" | "class_definition" | "class_specifier" => {
                let name = node_name(node, source).unwrap_or_default();
                if name.is_empty() {
                    return;
                }
                let methods = collect_methods(node, source);
                out.classes.push(ParsedClass { name, methods });
            }
            "interface_declaration" => {
                if let Some(name) = node_name(node, source) {
                    out.interfaces.push(ParsedInterface { name });
                }
            }
            "struct_item" | "struct_specifier" => {
                // Rust/C structs double as "class"-shaped nodes for the graph.
                if let Some(name) = node_name(node, source) {
                    out.classes.push(ParsedClass { name, methods: Vec::new() });
                }
            }
            "impl_item" => {
                let name = node
                    .child_by_field_name("type")
                    .and_then(|n| n.utf8_text(source).ok())
                    .map(|s| s.trim().to_string());
                if let Some(name) = name {
                    let methods = collect_methods(node, source);
                    if let Some(existing) = out.classes.iter_mut().find(|c| c.name == name) {
                        existing.methods.extend(methods);
                    } else {
                        out.classes.push(ParsedClass { name, methods });
                    }
                }
            }
            "import_statement" | "use_declaration" | "import_declaration" => {
                // Text-level import extraction is handled by the regex pass
                // shared across languages (see `extract_imports`).
            }
            _ => {}
        }
    }

    fn collect_methods(node: &Node, source: &[u8]) -> Vec<String> {
        let mut methods = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if matches!(
                child.kind(),
                "function_item" | "method_definition" | "function_definition" | "method_declaration"
            ) {
                if let Some(name) = node_name(&child, source) {
                    methods.push(name);
                }
            } else if child.kind() == "declaration_list" || child.kind() == "block" || child.kind() == "field_declaration_list" {
                methods.extend(collect_methods(&child, source));
            }
        }
        methods
    }

    fn extract_param_names(node: &Node, source: &[u8]) -> Vec<String> {
        let params = match node.child_by_field_name("parameters") {
            Some(p) => p,
            None => return Vec::new(),
        };
        let mut out = Vec::new();
        let mut cursor = params.walk();
        for child in params.children(&mut cursor) {
            if child.kind().ends_with("parameter") || child.kind() == "identifier" {
                if let Ok(text) = child.utf8_text(source) {
                    out.push(text.trim().to_string());
                }
            }
        }
        out
    }

    pub fn parse(content: &str, ext: &str) -> Option<ParsedStructure> {
        let lang = language_for_ext(ext)?;
        let mut parser = Parser::new();
        parser.set_language(&lang).ok()?;
        let tree = parser.parse(content, None)?;
        let mut structure = walk(&tree.root_node(), content.as_bytes(), ext);
        structure.imports = super::regex_fallback::extract_imports(content, ext);
        structure.dependencies = structure.imports.iter().map(|i| i.from.clone()).collect();
        Some(structure)
    }
}

/// Regex-based extraction, used as the universal fallback and as the import
/// extractor even in tree-sitter builds (tree-sitter's grammars model import
/// syntax too unevenly across languages to be worth a second AST pass for
/// this one field).
mod regex_fallback {
    use super::*;
    use once_cell::sync::Lazy;
    use regex::Regex;

    static RUST_FN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)^\s*(pub(?:\([^)]*\))?\s+)?(async\s+)?fn\s+(\w+)").unwrap());
    static RUST_STRUCT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)^\s*(pub\s+)?struct\s+(\w+)").unwrap());
    static RUST_USE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*use\s+([\w:]+)").unwrap());

    static JS_FN: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?m)^\s*(export\s+)?(default\s+)?(async\s+)?function\s+(\w+)").unwrap()
    });
    static JS_CLASS: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)^\s*(export\s+)?(default\s+)?class\s+(\w+)").unwrap());
    static JS_INTERFACE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)^\s*(export\s+)?interface\s+(\w+)").unwrap());
    static JS_IMPORT: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r#"(?:from\s+['"]([^'"]+)['"]|require\s*\(\s*['"]([^'"]+)['"]\s*\))"#).unwrap()
    });

    static PY_FN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)^\s*(async\s+)?def\s+(\w+)").unwrap());
    static PY_CLASS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^\s*class\s+(\w+)").unwrap());
    static PY_IMPORT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)(?:from\s+([\w.]+)\s+import|^import\s+([\w.]+))").unwrap());

    static GO_FN: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)^func\s+(?:\([^)]*\)\s+)?(\w+)").unwrap());
    static GO_TYPE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)^type\s+(\w+)\s+struct").unwrap());
    static GO_IMPORT: Lazy<Regex> =
        Lazy::new(|| Regex::new(r#"import\s+(?:\(\s*)?"([^"]+)""#).unwrap());

    static CS_USING: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?m)^using\s+(?:static\s+)?([\w.]+)\s*;").unwrap());
    static C_INCLUDE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"#include\s+"([^"]+)""#).unwrap());

    pub fn parse(content: &str, ext: &str) -> ParsedStructure {
        let mut structure = ParsedStructure::default();

        let functions: Vec<ParsedFunction> = match ext {
            "rs" => RUST_FN
                .captures_iter(content)
                .map(|c| ParsedFunction {
                    name: c[3].to_string(),
                    parameters: Vec::new(),
                    is_exported: c.get(1).is_some(),
                    is_async: c.get(2).is_some(),
                })
                .collect(),
            "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" => JS_FN
                .captures_iter(content)
                .map(|c| ParsedFunction {
                    name: c[4].to_string(),
                    parameters: Vec::new(),
                    is_exported: c.get(1).is_some(),
                    is_async: c.get(3).is_some(),
                })
                .collect(),
            "py" | "pyi" => PY_FN
                .captures_iter(content)
                .map(|c| {
                    let name = c[2].to_string();
                    ParsedFunction {
                        is_exported: is_exported_by_name_convention(&name, ext),
                        is_async: c.get(1).is_some(),
                        name,
                        parameters: Vec::new(),
                    }
                })
                .collect(),
            "go" => GO_FN
                .captures_iter(content)
                .map(|c| {
                    let name = c[1].to_string();
                    ParsedFunction {
                        is_exported: is_exported_by_name_convention(&name, ext),
                        is_async: false,
                        name,
                        parameters: Vec::new(),
                    }
                })
                .collect(),
            _ => Vec::new(),
        };
        structure.functions = cap_functions(functions);

        let classes: Vec<ParsedClass> = match ext {
            "rs" => RUST_STRUCT
                .captures_iter(content)
                .map(|c| ParsedClass { name: c[2].to_string(), methods: Vec::new() })
                .collect(),
            "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" => JS_CLASS
                .captures_iter(content)
                .map(|c| ParsedClass { name: c[3].to_string(), methods: Vec::new() })
                .collect(),
            "py" | "pyi" => PY_CLASS
                .captures_iter(content)
                .map(|c| ParsedClass { name: c[1].to_string(), methods: Vec::new() })
                .collect(),
            "go" => GO_TYPE
                .captures_iter(content)
                .map(|c| ParsedClass { name: c[1].to_string(), methods: Vec::new() })
                .collect(),
            _ => Vec::new(),
        };
        structure.classes = classes
            .into_iter()
            .map(|mut c| {
                c.methods = cap_methods(c.methods);
                c
            })
            .collect();

        if matches!(ext, "ts" | "tsx" | "js" | "jsx") {
            structure.interfaces = JS_INTERFACE
                .captures_iter(content)
                .map(|c| ParsedInterface { name: c[2].to_string() })
                .collect();
        }

        structure.imports = extract_imports(content, ext);
        structure.dependencies = structure.imports.iter().map(|i| i.from.clone()).collect();
        structure
    }

    pub fn extract_imports(content: &str, ext: &str) -> Vec<ParsedImport> {
        let mut seen = HashSet::new();
        let mut imports = Vec::new();
        let mut push = |from: String| {
            if seen.insert(from.clone()) {
                imports.push(ParsedImport { name: from.clone(), from, alias: None });
            }
        };

        match ext {
            "rs" => {
                for c in RUST_USE.captures_iter(content) {
                    push(c[1].to_string());
                }
            }
            "js" | "jsx" | "mjs" | "cjs" | "ts" | "tsx" => {
                for c in JS_IMPORT.captures_iter(content) {
                    let from = c.get(1).or_else(|| c.get(2)).map(|m| m.as_str().to_string());
                    if let Some(from) = from {
                        push(from);
                    }
                }
            }
            "py" | "pyi" => {
                for c in PY_IMPORT.captures_iter(content) {
                    let from = c.get(1).or_else(|| c.get(2)).map(|m| m.as_str().to_string());
                    if let Some(from) = from {
                        push(from);
                    }
                }
            }
            "go" => {
                for c in GO_IMPORT.captures_iter(content) {
                    push(c[1].to_string());
                }
            }
            "cs" => {
                for c in CS_USING.captures_iter(content) {
                    let ns = &c[1];
                    if ns.starts_with("System") || ns.starts_with("Unity") {
                        continue;
                    }
                    push(ns.to_string());
                }
            }
            "c" | "h" | "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => {
                for c in C_INCLUDE.captures_iter(content) {
                    push(c[1].to_string());
                }
            }
            _ => {}
        }

        imports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rust_fallback_extracts_function_and_struct() {
        let src = "pub fn greet(name: &str) -> String { name.to_string() }\n\nstruct Config { name: String }\n\nuse crate::util;\n";
        let structure = regex_fallback::parse(src, "rs");
        assert!(structure.functions.iter().any(|f| f.name == "greet" && f.is_exported));
        assert!(structure.classes.iter().any(|c| c.name == "Config"));
        assert!(structure.imports.iter().any(|i| i.from == "crate::util"));
    }

    #[test]
    fn python_export_convention_hides_underscore_names() {
        let src = "def _private():\n    pass\n\ndef public():\n    pass\n";
        let structure = regex_fallback::parse(src, "py");
        let private = structure.functions.iter().find(|f| f.name == "_private").unwrap();
        let public = structure.functions.iter().find(|f| f.name == "public").unwrap();
        assert!(!private.is_exported);
        assert!(public.is_exported);
    }

    #[test]
    fn go_export_convention_is_leading_uppercase() {
        let src = "func Public() {}\nfunc private() {}\n";
        let structure = regex_fallback::parse(src, "go");
        let public = structure.functions.iter().find(|f| f.name == "Public").unwrap();
        let private = structure.functions.iter().find(|f| f.name == "private").unwrap();
        assert!(public.is_exported);
        assert!(!private.is_exported);
    }

    #[test]
    fn csharp_import_skips_system_and_unity_namespaces() {
        let src = "using System;\nusing UnityEngine;\nusing MyGame.Core;\n";
        let imports = regex_fallback::extract_imports(src, "cs");
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].from, "MyGame.Core");
    }

    #[test]
    fn unsupported_extension_yields_empty_structure() {
        let structure = parse("some random text", "md");
        assert!(structure.functions.is_empty());
        assert!(structure.classes.is_empty());
    }

    #[test]
    fn function_cap_is_respected() {
        let mut src = String::new();
        for i in 0..40 {
            src.push_str(&format!("func f{i}() {{}}\n"));
        }
        let structure = regex_fallback::parse(&src, "go");
        assert_eq!(structure.functions.len(), MAX_STANDALONE_FUNCTIONS);
    }
}
