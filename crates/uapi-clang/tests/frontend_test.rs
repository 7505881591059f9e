//! End-to-end tests: C source through libclang into a generated header.

use std::path::Path;

use uapi_ast::NodeKind;
use uapi_build::VirtualFile;
use uapi_clang::ClangParser;
use uapi_gen::{generate_header, Preamble};

fn args() -> Vec<String> {
    vec!["-x".to_string(), "c".to_string()]
}

fn generate(source: &str) -> String {
    let parser = ClangParser::new().expect("Failed to create parser");
    let tree = parser
        .parse_string(source, "uapi.c", &args())
        .expect("Failed to parse");
    generate_header(&tree, Preamble::new("uapi.h", args())).expect("Failed to generate")
}

/// Test a struct with its typedef, an enum and a macro.
#[test]
fn test_generate_header_from_source() {
    let header = generate(
        r#"
#define MAX_POINTS 16

enum color { RED, GREEN };

struct point {
    int x;
    int y;
};

typedef struct point point_t;
        "#,
    );

    assert!(header.contains("#define UAPI_MAX_POINTS 16\n"), "{header}");
    assert!(header.contains("enum uapi_color {\n    UAPI_RED = 0,\n    UAPI_GREEN = 1,\n};\n"));
    assert!(header.contains("#pragma pack(push, 4)\nstruct uapi_point {\n    int x;\n    int y;\n};\n#pragma pack(pop)\n"));
    assert!(header.contains("static_assert(sizeof(struct uapi_point) == 8, \"struct uapi_point: incorrect size\");"));
    assert!(header.contains("typedef struct uapi_point uapi_point_t;\n"));
    assert!(header.contains("static_assert(alignof(uapi_point_t) == 4,"));
}

/// Test that predefined macros never reach the output.
#[test]
fn test_builtin_macros_skipped() {
    let header = generate("#define ONE 1\n");
    assert!(header.contains("#define UAPI_ONE 1\n"));
    assert!(!header.contains("__STDC__"));
    assert!(!header.contains("<built-in>"));
}

/// Test a typedef of an anonymous struct and a pointer field.
#[test]
fn test_anonymous_typedef_and_pointers() {
    let header = generate(
        r#"
typedef struct {
    int val[2];
} fsid_t;

struct node {
    struct node *next;
    fsid_t id;
};
        "#,
    );

    assert!(header.contains("typedef struct {\n    int val[2];\n} uapi_fsid_t;\n"), "{header}");
    assert!(header.contains("    struct uapi_node *next;\n"), "{header}");
    assert!(header.contains("    uapi_fsid_t id;\n"), "{header}");
}

/// Test that a fatal error (missing include) fails the parse.
#[test]
fn test_fatal_diagnostic_is_an_error() {
    let parser = ClangParser::new().expect("Failed to create parser");
    let result = parser.parse_string("#include \"does-not-exist.h\"\n", "uapi.c", &args());
    assert!(result.is_err());
}

/// Test that an overlay replaces a header without touching the disk.
#[test]
fn test_overlay_replaces_header() {
    let parser = ClangParser::new().expect("Failed to create parser");
    let dir = std::env::temp_dir().join("uapi-clang-overlay-test");
    let header = dir.join("types.h");
    let source = dir.join("uapi.c");

    let overlays = vec![
        VirtualFile {
            path: header.clone(),
            contents: "typedef unsigned int __u32;\n".to_string(),
        },
        VirtualFile {
            path: source.clone(),
            contents: format!("#include \"{}\"\n", header.display()),
        },
    ];

    let tree = parser
        .parse_file(Path::new(&source), &args(), &overlays)
        .expect("Failed to parse");
    let typedef = tree
        .children(tree.root())
        .find(|(_, node)| node.kind == NodeKind::TypedefDecl && node.name == "__u32");
    assert!(typedef.is_some());
}
