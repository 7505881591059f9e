//! Whole-header generation tests over hand-built declaration trees.

use uapi_ast::{DeclNode, DeclTree, NodeKind, TypeInfo, TypeKind};
use uapi_gen::{generate_header, GenError, HeaderGen, Preamble};

fn preamble() -> Preamble {
    Preamble::new("uapi.h", vec!["-x".to_string(), "c".to_string()])
}

/// enum color, struct point, a typedef of it, and a macro using an enum
/// constant.
fn sample_tree() -> DeclTree {
    let mut tree = DeclTree::new("uapi.c");
    let root = tree.root();

    let color = tree.add(root, DeclNode::new(NodeKind::EnumDecl, "color").at("a.h", 1));
    tree.add(color, DeclNode::enum_constant("RED", 0).at("a.h", 1));
    tree.add(color, DeclNode::enum_constant("GREEN", 1).at("a.h", 1));

    let point = tree.add(root, DeclNode::new(NodeKind::StructDecl, "point").at("a.h", 3));
    tree.get_mut(point).unwrap().ty =
        Some(TypeInfo::declared(TypeKind::Record, "struct point", point).with_layout(8, 4));
    tree.add(point, DeclNode::new(NodeKind::FieldDecl, "x").with_type(TypeInfo::builtin("int", 4)));
    tree.add(point, DeclNode::new(NodeKind::FieldDecl, "y").with_type(TypeInfo::builtin("int", 4)));

    tree.add(
        root,
        DeclNode::new(NodeKind::TypedefDecl, "point_t")
            .at("a.h", 7)
            .with_type(TypeInfo::new(TypeKind::Typedef, "point_t").with_layout(8, 4))
            .with_underlying(TypeInfo::declared(TypeKind::Record, "struct point", point)),
    );

    tree.add(root, DeclNode::macro_definition("ORIGIN_X", "ORIGIN_X (RED + 1)").at("a.h", 9));
    tree
}

#[test]
fn test_full_header() {
    let tree = sample_tree();
    let header = generate_header(&tree, preamble()).unwrap();

    insta::assert_snapshot!(header, @r###"
//-----------------------------------------------------------------------------
// uapi.h
//
// Generated by builduapi. Do not edit.
//
// Compiler arguments: -x c
//-----------------------------------------------------------------------------

#ifndef __UAPI_H_
#define __UAPI_H_

#if !defined(__midl) && !defined(__cplusplus)
#include <assert.h>
#include <stdalign.h>
#endif

// a.h:1:1
enum uapi_color {
    UAPI_RED = 0,
    UAPI_GREEN = 1,
};

// a.h:3:1
#pragma pack(push, 4)
struct uapi_point {
    int x;
    int y;
};
#pragma pack(pop)
#if !defined(__midl)
static_assert(alignof(struct uapi_point) == 4, "struct uapi_point: incorrect alignment");
static_assert(sizeof(struct uapi_point) == 8, "struct uapi_point: incorrect size");
#endif

// a.h:7:1
typedef struct uapi_point uapi_point_t;
#if !defined(__midl)
static_assert(alignof(uapi_point_t) == 4, "uapi_point_t: incorrect alignment");
static_assert(sizeof(uapi_point_t) == 8, "uapi_point_t: incorrect size");
#endif

// a.h:9:1
#define UAPI_ORIGIN_X (UAPI_RED + 1)

//-----------------------------------------------------------------------------

#endif // __UAPI_H_
"###);
}

/// An enum block is never followed by a layout assertion.
#[test]
fn test_enum_has_no_assertion() {
    let mut tree = DeclTree::new("uapi.c");
    let root = tree.root();
    let color = tree.add(root, DeclNode::new(NodeKind::EnumDecl, "color").at("a.h", 1));
    tree.add(color, DeclNode::enum_constant("RED", 0).at("a.h", 1));

    let header = generate_header(&tree, preamble()).unwrap();
    assert!(header.contains("// a.h:1:1\nenum uapi_color {\n    UAPI_RED = 0,\n};\n\n"));
    assert!(!header.contains("static_assert"));
}

#[test]
fn test_anonymous_enum_emitted_anonymous_struct_skipped() {
    let mut tree = DeclTree::new("uapi.c");
    let root = tree.root();
    let anon_enum = tree.add(root, DeclNode::new(NodeKind::EnumDecl, "").at("a.h", 1));
    tree.add(anon_enum, DeclNode::enum_constant("MAX_LEN", 64).at("a.h", 1));
    let anon_struct = tree.add(root, DeclNode::new(NodeKind::StructDecl, "").at("a.h", 3));
    tree.get_mut(anon_struct).unwrap().ty =
        Some(TypeInfo::declared(TypeKind::Record, "struct (unnamed at a.h:3:1)", anon_struct).with_layout(4, 4));
    tree.add(anon_struct, DeclNode::new(NodeKind::FieldDecl, "hidden").with_type(TypeInfo::builtin("int", 4)));

    let header = generate_header(&tree, preamble()).unwrap();
    assert!(header.contains("enum {\n    UAPI_MAX_LEN = 64,\n};\n"));
    assert!(!header.contains("hidden"));
    assert!(!header.contains("a.h:3:1"));
}

#[test]
fn test_macro_renames_declarations_before_enum_constants() {
    let mut tree = DeclTree::new("uapi.c");
    let root = tree.root();
    let bar = tree.add(root, DeclNode::new(NodeKind::TypedefDecl, "BAR").at("a.h", 1));
    tree.get_mut(bar).unwrap().underlying = Some(TypeInfo::builtin("int", 4));
    tree.add(root, DeclNode::macro_definition("FOO", "FOO (BAR + 1)").at("a.h", 2));

    let header = generate_header(&tree, preamble()).unwrap();
    assert!(header.contains("typedef int uapi_BAR;\n"));
    assert!(header.contains("#define UAPI_FOO (uapi_BAR + 1)\n"));
}

/// A failure anywhere aborts the whole header; nothing is written.
#[test]
fn test_failure_writes_nothing() {
    let mut tree = DeclTree::new("uapi.c");
    let root = tree.root();
    let rec = tree.add(root, DeclNode::new(NodeKind::StructDecl, "rec").at("a.h", 1));
    tree.get_mut(rec).unwrap().ty =
        Some(TypeInfo::declared(TypeKind::Record, "struct rec", rec).with_layout(4, 4));
    let anon = tree.add(rec, DeclNode::new(NodeKind::EnumDecl, "").at("a.h", 2));
    tree.add(
        rec,
        DeclNode::new(NodeKind::FieldDecl, "mode")
            .with_type(TypeInfo::declared(TypeKind::Enum, "enum (unnamed at a.h:2:5)", anon)),
    );

    let mut out = Vec::new();
    let err = HeaderGen::new(&tree, preamble()).write_to(&mut out).unwrap_err();
    assert!(matches!(err, GenError::UnrecognizedAnonymousType { .. }));
    assert!(out.is_empty());
}

#[test]
fn test_write_to_matches_generate() {
    let tree = sample_tree();
    let generator = HeaderGen::new(&tree, preamble());
    let mut out = Vec::new();
    generator.write_to(&mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), generator.generate().unwrap());
    assert_eq!(generator.names().get("point_t"), Some("uapi_point_t"));
}

/// `typedef struct { ... } pair_t, *pair_p;`
#[test]
fn test_pointer_typedef_to_anonymous_struct() {
    let mut tree = DeclTree::new("uapi.c");
    let root = tree.root();
    let anon = tree.add(root, DeclNode::new(NodeKind::StructDecl, "").at("a.h", 1));
    tree.get_mut(anon).unwrap().ty =
        Some(TypeInfo::declared(TypeKind::Record, "struct pair_t", anon).with_layout(4, 4));
    tree.add(anon, DeclNode::new(NodeKind::FieldDecl, "a").with_type(TypeInfo::builtin("int", 4)));
    let anon_ty = TypeInfo::declared(TypeKind::Record, "struct pair_t", anon);
    tree.add(
        root,
        DeclNode::new(NodeKind::TypedefDecl, "pair_t")
            .at("a.h", 1)
            .with_type(TypeInfo::new(TypeKind::Typedef, "pair_t").with_layout(4, 4))
            .with_underlying(anon_ty.clone()),
    );
    tree.add(
        root,
        DeclNode::new(NodeKind::TypedefDecl, "pair_p")
            .at("a.h", 1)
            .with_type(TypeInfo::new(TypeKind::Typedef, "pair_p").with_layout(8, 8))
            .with_underlying(TypeInfo::pointer_to(anon_ty)),
    );

    let header = generate_header(&tree, preamble()).unwrap();
    assert!(header.contains("typedef struct {\n    int a;\n} uapi_pair_t;\n"), "{header}");
    assert!(header.contains("typedef uapi_pair_t *uapi_pair_p;\n"), "{header}");
    assert!(header.contains("static_assert(sizeof(uapi_pair_p) == 8,"));
}

/// Constants of an enum defined inside a record stay defined for macros.
#[test]
fn test_nested_enum_constants_defined() {
    let mut tree = DeclTree::new("uapi.c");
    let root = tree.root();
    let s = tree.add(root, DeclNode::new(NodeKind::StructDecl, "s").at("a.h", 1));
    tree.get_mut(s).unwrap().ty =
        Some(TypeInfo::declared(TypeKind::Record, "struct s", s).with_layout(4, 4));
    let mode = tree.add(s, DeclNode::new(NodeKind::EnumDecl, "mode").at("a.h", 1));
    tree.add(mode, DeclNode::enum_constant("MA", 0).at("a.h", 1));
    tree.add(mode, DeclNode::enum_constant("MB", 1).at("a.h", 1));
    tree.add(
        s,
        DeclNode::new(NodeKind::FieldDecl, "m")
            .with_type(TypeInfo::declared(TypeKind::Enum, "enum mode", mode)),
    );
    tree.add(root, DeclNode::macro_definition("USE", "USE MB").at("a.h", 3));

    let header = generate_header(&tree, preamble()).unwrap();
    assert!(header.contains("    enum mode {\n        UAPI_MA = 0,\n        UAPI_MB = 1,\n    };\n"), "{header}");
    assert!(header.contains("    enum mode m;\n"));
    assert!(header.contains("#define UAPI_USE UAPI_MB\n"));
}
