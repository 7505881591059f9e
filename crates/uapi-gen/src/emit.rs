//! Declaration emitter for enums, structs, unions, typedefs and fields.
//!
//! Anonymous structs and unions are never emitted on their own; they are
//! written inline wherever a field or typedef uses them, with the closing
//! brace left open for the caller to append the declarator.

use crate::error::{GenError, Result};
use crate::names::{NameMapping, MACRO_PREFIX};
use crate::resolve::{insert_declarator, rename_identifiers, TypeResolver};
use crate::writer::CodeWriter;
use tracing::debug;
use uapi_ast::{DeclNode, DeclTree, NodeId, NodeKind, TypeInfo};

/// Guard that hides layout assertions from IDL-only consumers.
const ASSERTION_GUARD: &str = "#if !defined(__midl)";

/// Writes declarations under the renamed convention.
pub struct DeclEmitter<'a> {
    tree: &'a DeclTree,
    names: &'a NameMapping,
    resolver: TypeResolver<'a>,
}

impl<'a> DeclEmitter<'a> {
    pub fn new(tree: &'a DeclTree, names: &'a NameMapping) -> Self {
        Self {
            tree,
            names,
            resolver: TypeResolver::new(tree, names),
        }
    }

    /// Emit the declaration `id`, dispatching on its kind.
    pub fn emit(&self, w: &mut CodeWriter, id: NodeId) -> Result<()> {
        let node = &self.tree[id];
        debug!(kind = %node.kind, name = %node.name, "emitting declaration");

        match node.kind {
            NodeKind::EnumDecl => self.emit_enum(w, id),
            NodeKind::StructDecl | NodeKind::UnionDecl => self.emit_record(w, id),
            NodeKind::TypedefDecl => self.emit_typedef(w, id),
            NodeKind::FieldDecl => self.emit_field(w, id),
            _ => Err(unexpected("an enum, struct, union, typedef or field", node)),
        }
    }

    /// `enum [uapi_<name> ]{ UAPI_<constant> = <value>, ... };`
    pub fn emit_enum(&self, w: &mut CodeWriter, id: NodeId) -> Result<()> {
        let node = &self.tree[id];
        if node.kind != NodeKind::EnumDecl {
            return Err(unexpected("an enum", node));
        }

        if node.is_anonymous() {
            w.writeln("enum {");
        } else {
            w.writeln(&format!("enum {} {{", self.resolver.declared_name(id)));
        }

        w.indent();
        for (_, constant) in self.tree.children(id) {
            if constant.kind != NodeKind::EnumConstantDecl {
                continue;
            }
            let value = constant.enum_value.unwrap_or_default();
            w.writeln(&format!("{MACRO_PREFIX}{} = {},", constant.name, value));
        }
        w.dedent();
        w.writeln("};");
        Ok(())
    }

    /// A complete struct or union, a forward declaration when the type is
    /// incomplete, or an open anonymous body.
    pub fn emit_record(&self, w: &mut CodeWriter, id: NodeId) -> Result<()> {
        let node = &self.tree[id];
        let keyword = record_keyword(node)?;

        if node.is_anonymous() {
            self.emit_record_body(w, id, "")?;
            w.push_str(" ");
            return Ok(());
        }

        if node.size().is_none() {
            w.writeln(&format!("{} {};", keyword, self.resolver.declared_name(id)));
            return Ok(());
        }

        let alignment = node.ty.as_ref().and_then(|ty| ty.alignment);
        pack_push(w, alignment);
        self.emit_record_body(w, id, "")?;
        w.push_str(";\n");
        pack_pop(w, alignment);
        Ok(())
    }

    /// `typedef <type> uapi_<name>;` in one of four shapes: anonymous
    /// record body, function pointer, array, or plain type.
    pub fn emit_typedef(&self, w: &mut CodeWriter, id: NodeId) -> Result<()> {
        let node = &self.tree[id];
        if node.kind != NodeKind::TypedefDecl {
            return Err(unexpected("a typedef", node));
        }
        let underlying = node.underlying.as_ref().ok_or_else(|| missing_type(node))?;
        let name = self.resolver.declared_name(id);

        if let Some((decl_id, decl)) = self
            .resolver
            .declaring_node(underlying)
            .filter(|(_, decl)| decl.is_anonymous())
        {
            if decl.kind.is_record() {
                let alignment = decl.ty.as_ref().and_then(|ty| ty.alignment);
                pack_push(w, alignment);
                self.emit_record_body(w, decl_id, "typedef ")?;
                w.push_str(&format!(" {name};\n"));
                pack_pop(w, alignment);
                return Ok(());
            }
            if decl.kind == NodeKind::EnumDecl {
                let integer = decl
                    .underlying
                    .as_ref()
                    .map_or("int", |ty| ty.spelling.as_str());
                w.writeln(&format!("typedef {integer} {name};"));
                return Ok(());
            }
            return Err(GenError::UnrecognizedAnonymousType {
                spelling: underlying.spelling.clone(),
            });
        }

        if underlying.is_function_like() {
            let spelling = rename_identifiers(&underlying.spelling, self.names);
            w.writeln(&format!("typedef {};", insert_declarator(&spelling, &name)));
            return Ok(());
        }

        let (element, dims) = underlying.array_dimensions();
        let ty = self.resolver.resolve(element)?;
        let declarator = format!(" {}{}", name, format_dims(&dims));
        w.writeln(&format!("typedef {};", join_declarator(&ty, &declarator)));
        Ok(())
    }

    /// `<type> <name>[<dims>][ : <bits>];`, with anonymous and nested record
    /// types written inline.
    pub fn emit_field(&self, w: &mut CodeWriter, id: NodeId) -> Result<()> {
        let node = &self.tree[id];
        if node.kind != NodeKind::FieldDecl {
            return Err(unexpected("a field", node));
        }
        let ty = node.ty.as_ref().ok_or_else(|| missing_type(node))?;
        let (element, dims) = ty.array_dimensions();
        let dims = format_dims(&dims);
        let bits = node
            .bit_width
            .map(|width| format!(" : {width}"))
            .unwrap_or_default();
        let declarator = if node.is_anonymous() {
            String::new()
        } else {
            format!(" {}{}", node.name, dims)
        };

        if let Some(record) = self.inline_record(id, element) {
            self.emit_record_body(w, record, "")?;
            w.push_str(&format!("{declarator}{bits};\n"));
            return Ok(());
        }

        if element.is_function_like() {
            let spelling = rename_identifiers(&element.spelling, self.names);
            let field = insert_declarator(&spelling, declarator.trim_start());
            w.writeln(&format!("{field}{bits};"));
            return Ok(());
        }

        let ty = self.resolver.resolve(element)?;
        w.writeln(&format!("{}{bits};", join_declarator(&ty, &declarator)));
        Ok(())
    }

    /// Static assertions pinning the front-end computed size and alignment
    /// of a struct, union or typedef. Nothing is written for enums or for
    /// types of unknown size.
    pub fn emit_layout_assertion(&self, w: &mut CodeWriter, id: NodeId) -> Result<()> {
        let node = &self.tree[id];
        let type_name = match node.kind {
            NodeKind::EnumDecl => return Ok(()),
            NodeKind::StructDecl | NodeKind::UnionDecl => {
                if node.is_anonymous() {
                    return Ok(());
                }
                format!("{} {}", record_keyword(node)?, self.resolver.declared_name(id))
            }
            NodeKind::TypedefDecl => self.resolver.declared_name(id),
            _ => return Err(unexpected("a struct, union or typedef", node)),
        };

        let Some(ty) = node.ty.as_ref() else {
            return Ok(());
        };
        let (Some(size), Some(alignment)) = (ty.size, ty.alignment) else {
            return Ok(());
        };

        w.writeln(ASSERTION_GUARD);
        w.writeln(&format!(
            "static_assert(alignof({type_name}) == {alignment}, \"{type_name}: incorrect alignment\");"
        ));
        w.writeln(&format!(
            "static_assert(sizeof({type_name}) == {size}, \"{type_name}: incorrect size\");"
        ));
        w.writeln("#endif");
        Ok(())
    }

    /// `<lead>struct [name ]{ ... }` without a terminator.
    ///
    /// Nested enums are defined in place. Nested records no field embeds by
    /// value are written as members of their own so the tag stays defined.
    fn emit_record_body(&self, w: &mut CodeWriter, id: NodeId, lead: &str) -> Result<()> {
        let node = &self.tree[id];
        let keyword = record_keyword(node)?;

        if node.is_anonymous() {
            w.writeln(&format!("{lead}{keyword} {{"));
        } else {
            let name = self.resolver.declared_name(id);
            w.writeln(&format!("{lead}{keyword} {name} {{"));
        }

        w.indent();
        for (child_id, child) in self.tree.children(id) {
            match child.kind {
                NodeKind::FieldDecl => self.emit_field(w, child_id)?,
                NodeKind::EnumDecl => self.emit_enum(w, child_id)?,
                NodeKind::StructDecl | NodeKind::UnionDecl
                    if !self.has_referencing_field(id, child_id) =>
                {
                    if !child.is_anonymous() && child.size().is_none() {
                        let keyword = record_keyword(child)?;
                        w.writeln(&format!("{keyword} {};", self.resolver.declared_name(child_id)));
                        continue;
                    }
                    self.emit_record_body(w, child_id, "")?;
                    w.push_str(";\n");
                }
                _ => {}
            }
        }
        w.dedent();
        w.write("}");
        Ok(())
    }

    /// The record to write inline for a field of type `element`: anonymous
    /// records, and named records defined inside the field's parent (written
    /// at their first use only).
    fn inline_record(&self, field: NodeId, element: &TypeInfo) -> Option<NodeId> {
        let (record_id, record) = self.resolver.declaring_node(element)?;
        if !record.kind.is_record() || element.is_pointer() {
            return None;
        }
        if record.is_anonymous() {
            return Some(record_id);
        }

        let parent = self.tree[field].parent()?;
        let defined_here = record.parent() == Some(parent) && record.size().is_some();
        let first_use = self.first_referencing_field(parent, record_id) == Some(field);
        (defined_here && first_use).then_some(record_id)
    }

    fn has_referencing_field(&self, parent: NodeId, record: NodeId) -> bool {
        self.first_referencing_field(parent, record).is_some()
    }

    fn first_referencing_field(&self, parent: NodeId, record: NodeId) -> Option<NodeId> {
        self.tree
            .children(parent)
            .filter(|(_, child)| child.kind == NodeKind::FieldDecl)
            .find(|(_, child)| {
                child.ty.as_ref().is_some_and(|ty| {
                    let (element, _) = ty.array_dimensions();
                    !element.is_pointer() && element.declaration == Some(record)
                })
            })
            .map(|(id, _)| id)
    }
}

fn record_keyword(node: &DeclNode) -> Result<&'static str> {
    match node.kind {
        NodeKind::StructDecl => Ok("struct"),
        NodeKind::UnionDecl => Ok("union"),
        _ => Err(unexpected("a struct or union", node)),
    }
}

fn pack_push(w: &mut CodeWriter, alignment: Option<u64>) {
    if let Some(alignment) = alignment {
        w.writeln(&format!("#pragma pack(push, {alignment})"));
    }
}

fn pack_pop(w: &mut CodeWriter, alignment: Option<u64>) {
    if alignment.is_some() {
        w.writeln("#pragma pack(pop)");
    }
}

/// `int x`, but `char *x` rather than `char * x`.
fn join_declarator(ty: &str, declarator: &str) -> String {
    if ty.ends_with('*') {
        format!("{ty}{}", declarator.trim_start())
    } else {
        format!("{ty}{declarator}")
    }
}

fn format_dims(dims: &[Option<u64>]) -> String {
    dims.iter()
        .map(|dim| match dim {
            Some(len) => format!("[{len}]"),
            None => "[]".to_string(),
        })
        .collect()
}

fn unexpected(expected: &'static str, node: &DeclNode) -> GenError {
    GenError::UnexpectedKind {
        expected,
        found: node.kind,
        name: node.name.to_string(),
    }
}

fn missing_type(node: &DeclNode) -> GenError {
    GenError::MissingType {
        name: node.name.to_string(),
        kind: node.kind,
    }
}
