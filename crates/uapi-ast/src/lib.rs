//! Declaration tree model for the builduapi header generator.
//!
//! The front-end (libclang) builds a [`DeclTree`] once; the generator only
//! ever reads it.
//!
//! # Architecture
//!
//! ```text
//! C source → libclang → DeclTree → renamed C header
//! ```

mod token;
mod tree;
mod types;

pub use token::{Token, TokenKind};
pub use tree::{DeclNode, DeclTree, Descendants, NodeId, NodeKind, SourceLocation};
pub use types::{TypeInfo, TypeKind};
