//! libclang front-end for builduapi.
//!
//! Parses a C translation unit with a detailed preprocessing record and
//! converts the cursors the header generator cares about into a
//! [`uapi_ast::DeclTree`]: records, enums, typedefs, fields, macro
//! definitions, plus the layout libclang computed for every type.

mod parse;

pub use parse::ClangParser;
