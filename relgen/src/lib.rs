//! SQL generation for compiled `rel` definitions.
//!
//! Takes the IR produced by `rellang`, builds statements through the `sqlgen`
//! algebra, and renders them for a target [`dialect::Dialect`]. Rendered
//! statements are whitespace-flattened, semicolon-terminated, and carry the
//! dialect's native placeholder syntax.

pub mod dialect;
pub mod sql;
pub mod sqlgen;

use rellang::{ir, LangError, SourceMetadata};
use thiserror::Error;

use crate::{
    dialect::Dialect,
    sqlgen::{compile, render_statement, Hole, Sql},
};

#[derive(Debug, Error)]
pub enum GenError {
    #[error(transparent)]
    Lang(#[from] Box<LangError>),
    #[error("unknown dialect `{0}`")]
    UnknownDialect(String),
}

pub fn dialect_for(name: &str) -> Result<Box<dyn Dialect>, GenError> {
    dialect::from_name(name).ok_or_else(|| GenError::UnknownDialect(name.to_string()))
}

/// Parses and links a source file into IR.
pub fn compile_source(meta: &SourceMetadata) -> Result<ir::Root, GenError> {
    Ok(rellang::compile(meta)?)
}

pub fn render_create(root: &ir::Root, create: &ir::Create, dialect: &dyn Dialect) -> String {
    render_statement(&compile(&sql::insert_sql(root, create, dialect)), dialect)
}

pub fn render_read(root: &ir::Root, read: &ir::Read, dialect: &dyn Dialect) -> String {
    render_statement(&compile(&sql::select_sql(root, read)), dialect)
}

pub fn render_delete(root: &ir::Root, delete: &ir::Delete, dialect: &dyn Dialect) -> String {
    render_statement(&compile(&sql::delete_sql(root, delete)), dialect)
}

/// Builds the update statement tree along with its unfilled SET hole. The
/// caller fills the hole once it knows which columns change, then renders
/// through [`sqlgen::render_statement`].
pub fn build_update(root: &ir::Root, update: &ir::Update, dialect: &dyn Dialect) -> (Sql, Hole) {
    let (built, sets) = sql::update_sql(root, update, dialect);
    (compile(&built), sets)
}

pub fn render_schema(root: &ir::Root, dialect: &dyn Dialect) -> String {
    log::debug!("rendering schema for dialect {}", dialect.name());
    sql::schema_sql(root, dialect)
}
