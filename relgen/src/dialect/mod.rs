//! Target SQL engine profiles. The statement builders are dialect-independent
//! except where these hooks change the shape: RETURNING support, placeholder
//! syntax, column type mapping.

mod postgres;
mod sqlite;

use rellang::ir;

pub use postgres::Postgres;
pub use sqlite::{quote_string, Sqlite3};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Features {
    /// Supports `RETURNING` on INSERT/UPDATE/DELETE.
    pub returning: bool,
    /// Uses numbered placeholders (`$1`) rather than `?`.
    pub positional_arguments: bool,
    /// Has no token for "no limit" and needs an explicit large bound.
    pub no_limit_token: bool,
}

pub trait Dialect {
    fn name(&self) -> &'static str;
    fn features(&self) -> Features;
    /// The implicit row identifier column, if the engine has one.
    fn row_id(&self) -> Option<&'static str>;
    fn column_type(&self, field: &ir::Field) -> String;
    /// Converts generic `?` placeholders into the dialect's native syntax.
    fn rebind(&self, sql: &str) -> String;
    fn argument_prefix(&self) -> &'static str;
    /// Statement to run once per connection, if any.
    fn exec_on_open(&self) -> Option<&'static str>;
}

pub fn from_name(name: &str) -> Option<Box<dyn Dialect>> {
    match name {
        "postgres" => Some(Box::new(Postgres)),
        "sqlite3" => Some(Box::new(Sqlite3)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(from_name("postgres").map(|d| d.name()), Some("postgres"));
        assert_eq!(from_name("sqlite3").map(|d| d.name()), Some("sqlite3"));
        assert!(from_name("oracle").is_none());
    }

    #[test]
    fn test_feature_profiles() {
        assert!(Postgres.features().returning);
        assert!(Postgres.features().positional_arguments);
        assert_eq!(Postgres.argument_prefix(), "$");
        assert_eq!(Postgres.row_id(), None);
        assert_eq!(Postgres.exec_on_open(), None);

        assert!(!Sqlite3.features().returning);
        assert!(Sqlite3.features().no_limit_token);
        assert_eq!(Sqlite3.argument_prefix(), "?");
        assert_eq!(Sqlite3.row_id(), Some("_rowid_"));
        assert_eq!(Sqlite3.exec_on_open(), Some("PRAGMA foreign_keys = ON"));
    }
}
