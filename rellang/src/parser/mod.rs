pub mod ast;
mod parse;
pub mod tree;

pub use parse::parse;
