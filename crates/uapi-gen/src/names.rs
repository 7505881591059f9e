//! Original-to-renamed identifier table.
//!
//! Built once per translation unit and read by the macro emitter and by the
//! function pointer spelling rewrite. Entries are inserted in three passes:
//!
//! 1. in-file macro definitions → `UAPI_<name>`
//! 2. enum constants → `UAPI_<name>`
//! 3. global declarations → `uapi_<name>`, overriding the first two
//!
//! Within a pass the last occurrence of a spelling wins.

use rustc_hash::FxHashMap;
use tracing::{debug, warn};
use uapi_ast::{DeclNode, DeclTree, NodeKind};

/// Prefix for renamed declarations (types, typedefs, functions, variables).
pub const DECL_PREFIX: &str = "uapi_";

/// Prefix for renamed macros and enum constants.
pub const MACRO_PREFIX: &str = "UAPI_";

/// Mapping from original identifier to renamed identifier.
#[derive(Debug, Clone, Default)]
pub struct NameMapping {
    names: FxHashMap<String, String>,
}

impl NameMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect every identifier that is renamed in the generated header.
    pub fn build(tree: &DeclTree) -> Self {
        let mut mapping = Self::new();
        let root = tree.root();

        for (_, node) in tree.descendants(root) {
            if node.kind == NodeKind::MacroDefinition && is_named_source(node) {
                mapping.insert_secondary(&node.name, format!("{MACRO_PREFIX}{}", node.name));
            }
        }

        for (id, node) in tree.descendants(root) {
            if node.kind != NodeKind::EnumDecl {
                continue;
            }
            for (_, constant) in tree.children(id) {
                if constant.kind == NodeKind::EnumConstantDecl && !constant.is_anonymous() {
                    mapping.insert_secondary(&constant.name, format!("{MACRO_PREFIX}{}", constant.name));
                }
            }
        }

        for (id, node) in tree.descendants(root) {
            if node.kind.is_declaration() && is_named_source(node) && tree.is_global(id) {
                mapping.insert(&node.name, format!("{DECL_PREFIX}{}", node.name));
            }
        }

        debug!(entries = mapping.len(), "built name mapping");
        mapping
    }

    /// Insert or replace an entry, returning the previous renamed spelling.
    pub fn insert(&mut self, original: &str, renamed: String) -> Option<String> {
        self.names.insert(original.to_string(), renamed)
    }

    fn insert_secondary(&mut self, original: &str, renamed: String) {
        if let Some(previous) = self.insert(original, renamed) {
            warn!(name = original, previous = %previous, "duplicate macro or enum constant name");
        }
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.names.get(original).map(String::as_str)
    }

    /// The renamed spelling, or `original` itself when it is not mapped.
    pub fn rename<'a>(&'a self, original: &'a str) -> &'a str {
        self.get(original).unwrap_or(original)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn is_named_source(node: &DeclNode) -> bool {
    !node.is_anonymous() && !node.is_synthesized()
}
