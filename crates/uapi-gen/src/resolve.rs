//! Type spelling under the renamed convention.

use crate::error::{GenError, Result};
use crate::names::{NameMapping, DECL_PREFIX};
use uapi_ast::{DeclNode, DeclTree, NodeId, NodeKind, TypeInfo};

/// Prints C type references for field, typedef and pointer positions.
#[derive(Clone, Copy)]
pub struct TypeResolver<'a> {
    tree: &'a DeclTree,
    names: &'a NameMapping,
}

impl<'a> TypeResolver<'a> {
    pub fn new(tree: &'a DeclTree, names: &'a NameMapping) -> Self {
        Self { tree, names }
    }

    /// Spell `ty` as a type prefix (the part before the declarator).
    ///
    /// Built-in types keep their original spelling. Declared types get their
    /// tag keyword and, when declared at file scope, the `uapi_` prefix.
    pub fn resolve(&self, ty: &TypeInfo) -> Result<String> {
        if ty.is_function_like() {
            return Ok(rename_identifiers(&ty.spelling, self.names));
        }

        if let Some(pointee) = ty.pointee.as_deref().filter(|_| ty.is_pointer()) {
            let inner = self.resolve(pointee)?;
            let mut out = if inner.ends_with('*') {
                format!("{inner}*")
            } else {
                format!("{inner} *")
            };
            if ty.is_const {
                out.push_str(" const");
            }
            return Ok(out);
        }

        let Some((id, decl)) = self.declaring_node(ty) else {
            return Ok(ty.spelling.clone());
        };

        let mut out = String::new();
        if ty.is_const {
            out.push_str("const ");
        }

        if decl.is_anonymous() {
            let typedef = self
                .naming_typedef(id)
                .ok_or_else(|| GenError::UnrecognizedAnonymousType {
                    spelling: ty.spelling.clone(),
                })?;
            out.push_str(&self.declared_name(typedef));
            return Ok(out);
        }

        if let Some(keyword) = decl.kind.tag_keyword() {
            out.push_str(keyword);
            out.push(' ');
        }
        out.push_str(&self.declared_name(id));
        Ok(out)
    }

    /// The node declaring `ty`, unless it is a built-in.
    pub fn declaring_node(&self, ty: &TypeInfo) -> Option<(NodeId, &'a DeclNode)> {
        let id = ty.declaration?;
        let node = self.tree.get(id)?;
        (!node.is_synthesized()).then_some((id, node))
    }

    /// The typedef that gives the anonymous declaration `id` its name, as
    /// in `typedef struct { ... } pair_t, *pair_p;`.
    pub fn naming_typedef(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.tree[id].parent()?;
        self.tree
            .children(parent)
            .find(|(_, node)| {
                node.kind == NodeKind::TypedefDecl
                    && node
                        .underlying
                        .as_ref()
                        .is_some_and(|ty| !ty.is_pointer() && !ty.is_array() && ty.declaration == Some(id))
            })
            .map(|(typedef, _)| typedef)
    }

    /// Identifier of a declaration as it appears in the generated header.
    pub fn declared_name(&self, id: NodeId) -> String {
        let node = &self.tree[id];
        if self.tree.is_global(id) {
            format!("{DECL_PREFIX}{}", node.name)
        } else {
            node.name.to_string()
        }
    }
}

/// Rename every mapped identifier inside a type spelling, keeping the rest of
/// the text untouched.
pub(crate) fn rename_identifiers(spelling: &str, names: &NameMapping) -> String {
    let mut out = String::with_capacity(spelling.len());
    let mut ident = String::new();

    for c in spelling.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            ident.push(c);
            continue;
        }
        flush_identifier(&mut out, &mut ident, names);
        out.push(c);
    }
    flush_identifier(&mut out, &mut ident, names);
    out
}

fn flush_identifier(out: &mut String, ident: &mut String, names: &NameMapping) {
    if ident.is_empty() {
        return;
    }
    let starts_with_digit = ident.starts_with(|c: char| c.is_ascii_digit());
    if starts_with_digit {
        out.push_str(ident);
    } else {
        out.push_str(names.rename(ident));
    }
    ident.clear();
}

/// Insert `declarator` into a function or function pointer spelling.
///
/// `void (*)(int)` becomes `void (* name)(int)`; `int (int)` becomes
/// `int name(int)`.
pub(crate) fn insert_declarator(spelling: &str, declarator: &str) -> String {
    if let Some(start) = spelling.find("(*") {
        let stars = spelling[start + 1..]
            .chars()
            .take_while(|&c| c == '*')
            .count();
        let at = start + 1 + stars;
        return format!("{} {}{}", &spelling[..at], declarator, &spelling[at..]);
    }

    match spelling.find('(') {
        Some(at) => format!("{}{}{}", &spelling[..at], declarator, &spelling[at..]),
        None => format!("{spelling} {declarator}"),
    }
}
