//! Header assembly: one pass over the translation unit's top-level nodes,
//! wrapped in a preamble and an epilogue.

use std::io;

use crate::emit::DeclEmitter;
use crate::error::Result;
use crate::macros::MacroEmitter;
use crate::names::NameMapping;
use crate::writer::CodeWriter;
use tracing::{debug, info};
use uapi_ast::{DeclNode, DeclTree, NodeKind};

const RULE: &str = "//-----------------------------------------------------------------------------";

/// Boilerplate written before and after the generated declarations.
#[derive(Debug, Clone, Default)]
pub struct Preamble {
    /// Output file name, used for the banner and the include guard
    pub file_name: String,
    /// Arguments the front-end parsed the translation unit with
    pub arguments: Vec<String>,
}

impl Preamble {
    pub fn new(file_name: impl Into<String>, arguments: Vec<String>) -> Self {
        Self {
            file_name: file_name.into(),
            arguments,
        }
    }

    /// `uapi.h` becomes `__UAPI_H_`.
    pub fn guard(&self) -> String {
        let base = self
            .file_name
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(&self.file_name);
        let sanitized: String = base
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
            .collect();
        format!("__{sanitized}_")
    }

    pub fn render(&self, w: &mut CodeWriter) {
        let guard = self.guard();
        w.writeln(RULE);
        w.writeln(&format!("// {}", self.file_name));
        w.writeln("//");
        w.writeln("// Generated by builduapi. Do not edit.");
        if !self.arguments.is_empty() {
            w.writeln("//");
            w.writeln(&format!("// Compiler arguments: {}", self.arguments.join(" ")));
        }
        w.writeln(RULE);
        w.blank_line();
        w.writeln(&format!("#ifndef {guard}"));
        w.writeln(&format!("#define {guard}"));
        w.blank_line();
        w.writeln("#if !defined(__midl) && !defined(__cplusplus)");
        w.writeln("#include <assert.h>");
        w.writeln("#include <stdalign.h>");
        w.writeln("#endif");
        w.blank_line();
    }

    pub fn render_epilogue(&self, w: &mut CodeWriter) {
        w.writeln(RULE);
        w.blank_line();
        w.writeln(&format!("#endif // {}", self.guard()));
    }
}

/// Produces the complete renamed header for a translation unit.
pub struct HeaderGen<'a> {
    tree: &'a DeclTree,
    preamble: Preamble,
    names: NameMapping,
}

impl<'a> HeaderGen<'a> {
    pub fn new(tree: &'a DeclTree, preamble: Preamble) -> Self {
        Self {
            tree,
            preamble,
            names: NameMapping::build(tree),
        }
    }

    pub fn names(&self) -> &NameMapping {
        &self.names
    }

    /// Generate the header text. Nothing is returned unless every top-level
    /// declaration was emitted.
    pub fn generate(&self) -> Result<String> {
        let decls = DeclEmitter::new(self.tree, &self.names);
        let macros = MacroEmitter::new(&self.names);
        let mut w = CodeWriter::new();
        let mut emitted = 0usize;

        self.preamble.render(&mut w);

        for (id, node) in self.tree.children(self.tree.root()) {
            if !is_emitted(node) {
                continue;
            }

            w.writeln(&format!("// {}", node.location));
            match node.kind {
                NodeKind::MacroDefinition => macros.emit(&mut w, node)?,
                NodeKind::EnumDecl => decls.emit(&mut w, id)?,
                _ => {
                    decls.emit(&mut w, id)?;
                    decls.emit_layout_assertion(&mut w, id)?;
                }
            }
            w.blank_line();
            emitted += 1;
        }

        self.preamble.render_epilogue(&mut w);
        info!(
            file = %self.preamble.file_name,
            emitted,
            renamed = self.names.len(),
            "generated header"
        );
        Ok(w.into_string())
    }

    /// Generate the header and write it to `out`.
    pub fn write_to<W: io::Write>(&self, out: &mut W) -> Result<()> {
        let text = self.generate()?;
        out.write_all(text.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

/// Top-level filter: in-file declarations and macros only. Anonymous records
/// are reached through the field or typedef that uses them; anonymous enums
/// still carry constants.
fn is_emitted(node: &DeclNode) -> bool {
    if node.is_synthesized() {
        return false;
    }
    let emittable = matches!(
        node.kind,
        NodeKind::EnumDecl
            | NodeKind::StructDecl
            | NodeKind::UnionDecl
            | NodeKind::TypedefDecl
            | NodeKind::MacroDefinition
    );
    if !emittable {
        return false;
    }
    if node.is_anonymous() && node.kind != NodeKind::EnumDecl {
        debug!(kind = %node.kind, location = %node.location, "skipping anonymous top-level record");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use uapi_ast::{DeclNode, TypeInfo};

    #[test]
    fn test_guard_from_file_name() {
        assert_eq!(Preamble::new("uapi.h", vec![]).guard(), "__UAPI_H_");
        assert_eq!(Preamble::new("out/linux-uapi.h", vec![]).guard(), "__LINUX_UAPI_H_");
    }

    #[test]
    fn test_preamble_lists_arguments() {
        let preamble = Preamble::new("uapi.h", vec!["-x".into(), "c".into(), "-std=c11".into()]);
        let mut w = CodeWriter::new();
        preamble.render(&mut w);
        assert!(w.as_str().contains("// Compiler arguments: -x c -std=c11\n"));
        assert!(w.as_str().contains("#ifndef __UAPI_H_\n#define __UAPI_H_\n"));
    }

    #[test]
    fn test_skips_synthesized_and_unsupported_nodes() {
        let mut tree = DeclTree::new("uapi.c");
        let root = tree.root();
        tree.add(root, DeclNode::macro_definition("__STDC__", "__STDC__ 1"));
        tree.add(root, DeclNode::new(NodeKind::InclusionDirective, "linux/types.h").at("uapi.c", 1));
        tree.add(root, DeclNode::new(NodeKind::MacroExpansion, "FOO").at("uapi.c", 2));
        tree.add(
            root,
            DeclNode::new(NodeKind::FunctionDecl, "ioctl")
                .at("uapi.c", 3)
                .with_type(TypeInfo::new(uapi_ast::TypeKind::Function, "int (int, unsigned long)")),
        );
        tree.add(root, DeclNode::new(NodeKind::StructDecl, "").at("uapi.c", 4));

        let header = HeaderGen::new(&tree, Preamble::new("uapi.h", vec![])).generate().unwrap();
        assert!(!header.contains("__STDC__"));
        assert!(!header.contains("uapi.c:"));
        assert!(header.ends_with("#endif // __UAPI_H_\n"));
    }
}
