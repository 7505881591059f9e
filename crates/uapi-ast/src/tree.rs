//! Declaration tree representation.
//!
//! The tree is an arena of [`DeclNode`]s rooted at exactly one translation
//! unit. Children are owned top-down by their parent; `parent` links and
//! [`TypeInfo::declaration`] are plain [`NodeId`] lookups into the arena.

use crate::token::Token;
use crate::types::TypeInfo;
use smol_str::SmolStr;
use std::fmt;
use std::ops::Index;

/// Index of a node inside its [`DeclTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn as_u32(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kinds of declaration tree nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Translation unit (root)
    TranslationUnit,
    EnumDecl,
    EnumConstantDecl,
    StructDecl,
    UnionDecl,
    TypedefDecl,
    FieldDecl,
    FunctionDecl,
    VarDecl,
    MacroDefinition,
    MacroExpansion,
    InclusionDirective,
    TypeRef,
    Expression,
    /// Anything the generator has no use for
    Other,
}

impl NodeKind {
    /// Declarations that introduce a renamed (`uapi_`) identifier.
    pub fn is_declaration(self) -> bool {
        matches!(
            self,
            NodeKind::EnumDecl
                | NodeKind::StructDecl
                | NodeKind::UnionDecl
                | NodeKind::TypedefDecl
                | NodeKind::FunctionDecl
                | NodeKind::VarDecl
        )
    }

    /// Struct or union.
    pub fn is_record(self) -> bool {
        matches!(self, NodeKind::StructDecl | NodeKind::UnionDecl)
    }

    /// The C tag keyword for tagged types.
    pub fn tag_keyword(self) -> Option<&'static str> {
        match self {
            NodeKind::StructDecl => Some("struct"),
            NodeKind::UnionDecl => Some("union"),
            NodeKind::EnumDecl => Some("enum"),
            _ => None,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Where a node came from.
///
/// `file == None` marks a node the front-end synthesized (built-in types,
/// predefined macros); such nodes are never emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: Some(file.into()),
            line,
            column,
            offset: 0,
        }
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn is_synthesized(&self) -> bool {
        self.file.is_none()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}:{}", file, self.line, self.column),
            None => f.write_str("<built-in>"),
        }
    }
}

/// A node in the declaration tree.
#[derive(Debug, Clone)]
pub struct DeclNode {
    pub kind: NodeKind,
    /// Display name; empty for anonymous structs, unions and enums
    pub name: SmolStr,
    pub location: SourceLocation,
    /// Type of the declared entity, with the layout computed by the front-end
    pub ty: Option<TypeInfo>,
    /// Aliased type of a typedef, or the integer type of an enum
    pub underlying: Option<TypeInfo>,
    /// Width of a bit-field member
    pub bit_width: Option<u32>,
    /// Value of an enum constant
    pub enum_value: Option<i128>,
    /// Macro definition takes a parameter list
    pub function_like: bool,
    /// Tokens spanning the node's source extent (macro definitions only)
    pub tokens: Vec<Token>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
}

impl DeclNode {
    pub fn new(kind: NodeKind, name: impl Into<SmolStr>) -> Self {
        Self {
            kind,
            name: name.into(),
            location: SourceLocation::default(),
            ty: None,
            underlying: None,
            bit_width: None,
            enum_value: None,
            function_like: false,
            tokens: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    /// An enum constant with its value.
    pub fn enum_constant(name: impl Into<SmolStr>, value: i128) -> Self {
        Self::new(NodeKind::EnumConstantDecl, name).with_value(value)
    }

    /// A macro definition whose extent is `text`, starting with the macro name.
    pub fn macro_definition(name: impl Into<SmolStr>, text: &str) -> Self {
        Self::new(NodeKind::MacroDefinition, name).with_tokens(Token::lex(text))
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    /// Shorthand for a location at the start of `line` in `file`.
    pub fn at(self, file: &str, line: u32) -> Self {
        self.with_location(SourceLocation::new(file, line, 1))
    }

    pub fn with_type(mut self, ty: TypeInfo) -> Self {
        self.ty = Some(ty);
        self
    }

    pub fn with_underlying(mut self, ty: TypeInfo) -> Self {
        self.underlying = Some(ty);
        self
    }

    pub fn with_bit_width(mut self, width: u32) -> Self {
        self.bit_width = Some(width);
        self
    }

    pub fn with_value(mut self, value: i128) -> Self {
        self.enum_value = Some(value);
        self
    }

    pub fn with_tokens(mut self, tokens: Vec<Token>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn function_like(mut self) -> Self {
        self.function_like = true;
        self
    }

    pub fn is_anonymous(&self) -> bool {
        self.name.is_empty()
    }

    pub fn is_synthesized(&self) -> bool {
        self.location.is_synthesized()
    }

    /// Size computed by the front-end; `None` for incomplete types.
    pub fn size(&self) -> Option<u64> {
        self.ty.as_ref().and_then(|ty| ty.size)
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// The tokens of the node's source extent, in order.
    pub fn extent_tokens(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }
}

/// A parsed translation unit.
#[derive(Debug, Clone)]
pub struct DeclTree {
    nodes: Vec<DeclNode>,
}

impl DeclTree {
    /// Create a tree holding only the translation unit root.
    pub fn new(name: impl Into<SmolStr>) -> Self {
        Self {
            nodes: vec![DeclNode::new(NodeKind::TranslationUnit, name)],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append `node` as the last child of `parent`.
    ///
    /// Panics if `parent` does not belong to this tree.
    pub fn add(&mut self, parent: NodeId, mut node: DeclNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        node.parent = Some(parent);
        node.children.clear();
        self.nodes[parent.index()].children.push(id);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&DeclNode> {
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut DeclNode> {
        self.nodes.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Direct children of `id`, in source order.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = (NodeId, &DeclNode)> + '_ {
        self[id].children.iter().map(move |&child| (child, &self[child]))
    }

    /// All transitive children of `id`, depth-first in source order.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self[id].children.clone();
        stack.reverse();
        Descendants { tree: self, stack }
    }

    /// Whether `id` is declared directly in the translation unit.
    pub fn is_global(&self, id: NodeId) -> bool {
        self.get(id).and_then(DeclNode::parent) == Some(self.root())
    }

    /// Indented listing of every in-file node with its type and layout.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_node(&mut out, self.root(), 0);
        out
    }

    fn dump_node(&self, out: &mut String, id: NodeId, depth: usize) {
        let node = &self[id];
        out.push_str(&format!("{:width$}{} `{}`", "", node.kind, node.name, width = depth * 2));
        if id != self.root() {
            out.push_str(&format!(" @ {}", node.location));
        }
        if let Some(ty) = &node.ty {
            out.push_str(&format!(" : {}", ty.spelling));
            if let (Some(size), Some(alignment)) = (ty.size, ty.alignment) {
                out.push_str(&format!(" (size {size}, align {alignment})"));
            }
        }
        if let Some(value) = node.enum_value {
            out.push_str(&format!(" = {value}"));
        }
        if let Some(width) = node.bit_width {
            out.push_str(&format!(" : {width} bits"));
        }
        out.push('\n');

        for &child in &node.children {
            if !self[child].is_synthesized() {
                self.dump_node(out, child, depth + 1);
            }
        }
    }
}

impl Index<NodeId> for DeclTree {
    type Output = DeclNode;

    fn index(&self, id: NodeId) -> &DeclNode {
        &self.nodes[id.index()]
    }
}

/// Depth-first iterator returned by [`DeclTree::descendants`].
pub struct Descendants<'a> {
    tree: &'a DeclTree,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = (NodeId, &'a DeclNode);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        let node = &self.tree[id];
        self.stack.extend(node.children.iter().rev().copied());
        Some((id, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (DeclTree, NodeId, NodeId) {
        let mut tree = DeclTree::new("uapi.c");
        let root = tree.root();
        let outer = tree.add(root, DeclNode::new(NodeKind::StructDecl, "outer").at("a.h", 1));
        let inner = tree.add(outer, DeclNode::new(NodeKind::StructDecl, "").at("a.h", 2));
        tree.add(inner, DeclNode::new(NodeKind::FieldDecl, "x").at("a.h", 3));
        tree.add(outer, DeclNode::new(NodeKind::FieldDecl, "y").at("a.h", 4));
        tree.add(root, DeclNode::new(NodeKind::TypedefDecl, "t").at("a.h", 6));
        (tree, outer, inner)
    }

    #[test]
    fn test_add_links_parent_and_children() {
        let (tree, outer, inner) = sample();
        assert_eq!(tree[inner].parent(), Some(outer));
        assert_eq!(tree[outer].children().len(), 2);
        assert!(tree.is_global(outer));
        assert!(!tree.is_global(inner));
    }

    #[test]
    fn test_descendants_in_source_order() {
        let (tree, _, _) = sample();
        let names: Vec<&str> = tree
            .descendants(tree.root())
            .map(|(_, node)| node.name.as_str())
            .collect();
        assert_eq!(names, vec!["outer", "", "x", "y", "t"]);
    }

    #[test]
    fn test_synthesized_location() {
        let node = DeclNode::new(NodeKind::TypedefDecl, "__builtin_va_list");
        assert!(node.is_synthesized());
        assert_eq!(node.location.to_string(), "<built-in>");

        let node = node.at("linux/types.h", 12);
        assert!(!node.is_synthesized());
        assert_eq!(node.location.to_string(), "linux/types.h:12:1");
    }

    #[test]
    fn test_dump_skips_synthesized() {
        let (mut tree, outer, _) = sample();
        let root = tree.root();
        tree.add(root, DeclNode::macro_definition("__STDC__", "__STDC__ 1"));
        tree.get_mut(outer).unwrap().ty =
            Some(TypeInfo::new(crate::TypeKind::Record, "struct outer").with_layout(8, 4));

        let dump = tree.dump();
        assert!(dump.starts_with("TranslationUnit `uapi.c`\n"));
        assert!(dump.contains("  StructDecl `outer` @ a.h:1:1 : struct outer (size 8, align 4)\n"));
        assert!(dump.contains("      FieldDecl `x` @ a.h:3:1\n"));
        assert!(!dump.contains("__STDC__"));
    }

    #[test]
    fn test_declaration_classification() {
        assert!(NodeKind::TypedefDecl.is_declaration());
        assert!(NodeKind::VarDecl.is_declaration());
        assert!(!NodeKind::FieldDecl.is_declaration());
        assert!(!NodeKind::EnumConstantDecl.is_declaration());
        assert!(!NodeKind::MacroDefinition.is_declaration());
    }
}
