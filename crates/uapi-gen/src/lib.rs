//! Declaration-tree-to-header transpiler.
//!
//! Walks a parsed [`DeclTree`] and re-emits every enum, struct, union,
//! typedef and macro under the `uapi_`/`UAPI_` naming convention, with
//! static assertions pinning the layout computed by the front-end.
//!
//! # Architecture
//!
//! ```text
//! DeclTree ─┬─ NameMapping::build ──────────────┐
//!           └─ HeaderGen ─┬─ DeclEmitter ─ TypeResolver
//!                         └─ MacroEmitter ──────┘
//! ```

mod emit;
mod error;
mod header;
mod macros;
mod names;
mod resolve;
mod writer;

pub use emit::DeclEmitter;
pub use error::{GenError, Result};
pub use header::{HeaderGen, Preamble};
pub use macros::MacroEmitter;
pub use names::{NameMapping, DECL_PREFIX, MACRO_PREFIX};
pub use resolve::TypeResolver;
pub use writer::CodeWriter;

use uapi_ast::DeclTree;

/// Generate the complete renamed header for `tree`.
pub fn generate_header(tree: &DeclTree, preamble: Preamble) -> Result<String> {
    HeaderGen::new(tree, preamble).generate()
}
