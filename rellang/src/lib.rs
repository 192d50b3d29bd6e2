//! The `rel` language frontend: lexing, parsing, and linking of a declarative
//! schema-and-query description into a resolved intermediate representation.
//!
//! The pipeline is `lexer` -> `parser::tree` -> `parser` (typed AST) ->
//! `transform` -> `ir`. Each stage is a pure function of its input and fails
//! with a position-tagged [`LangError`].

pub mod diagnostics;
pub mod ir;
pub mod lexer;
pub mod metadata;
pub mod parser;
pub mod transform;

pub use diagnostics::{LangError, LangResult};
pub use metadata::SourceMetadata;
pub use parser::parse;
pub use transform::transform;

/// Parses and links a source file in one step.
pub fn compile(meta: &SourceMetadata) -> LangResult<ir::Root> {
    let ast = parser::parse(meta)?;
    transform::transform(&ast, meta)
}
