//! Error types for header generation.

use miette::Diagnostic;
use thiserror::Error;
use uapi_ast::NodeKind;

/// Result type for header generation.
pub type Result<T> = std::result::Result<T, GenError>;

/// Errors that abort generation of a header.
#[derive(Error, Diagnostic, Debug)]
pub enum GenError {
    /// A kind-specific emitter was handed the wrong node.
    #[error("expected {expected}, found {found} `{name}`")]
    #[diagnostic(code(builduapi::unexpected_kind))]
    UnexpectedKind {
        expected: &'static str,
        found: NodeKind,
        name: String,
    },

    /// An anonymous type that is neither a struct nor a union.
    #[error("anonymous type `{spelling}` is neither a struct nor a union")]
    #[diagnostic(
        code(builduapi::anonymous_type),
        help("anonymous enums can only be emitted at the top level")
    )]
    UnrecognizedAnonymousType { spelling: String },

    /// The front-end left out type information the emitter needs.
    #[error("`{name}` ({kind}) has no type information")]
    #[diagnostic(code(builduapi::missing_type))]
    MissingType { name: String, kind: NodeKind },

    /// Failed to write the generated header.
    #[error("Failed to write header: {0}")]
    #[diagnostic(code(builduapi::io))]
    Io(#[from] std::io::Error),
}
