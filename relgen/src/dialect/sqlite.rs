use rellang::ir::{self, FieldType};

use super::{Dialect, Features};

pub struct Sqlite3;

impl Dialect for Sqlite3 {
    fn name(&self) -> &'static str {
        "sqlite3"
    }

    fn features(&self) -> Features {
        Features {
            returning: false,
            positional_arguments: false,
            no_limit_token: true,
        }
    }

    fn row_id(&self) -> Option<&'static str> {
        Some("_rowid_")
    }

    fn column_type(&self, field: &ir::Field) -> String {
        match field.field_type {
            FieldType::Serial
            | FieldType::Serial64
            | FieldType::Int
            | FieldType::Int64
            | FieldType::Uint
            | FieldType::Uint64
            | FieldType::Bool => "INTEGER".to_string(),
            FieldType::Text => "TEXT".to_string(),
            FieldType::Timestamp | FieldType::Utimestamp => "TIMESTAMP".to_string(),
            FieldType::Float | FieldType::Float64 => "REAL".to_string(),
            FieldType::Blob => "BLOB".to_string(),
            FieldType::Date => "DATE".to_string(),
        }
    }

    fn rebind(&self, sql: &str) -> String {
        sql.to_string()
    }

    fn argument_prefix(&self) -> &'static str {
        "?"
    }

    fn exec_on_open(&self) -> Option<&'static str> {
        Some("PRAGMA foreign_keys = ON")
    }
}

/// Escapes a value for embedding as a single-quoted SQLite string literal.
pub fn quote_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rebind_is_identity() {
        assert_eq!(Sqlite3.rebind("? a ? b ?"), "? a ? b ?");
    }

    #[test]
    fn test_quote_string() {
        assert_eq!(quote_string("it's"), "'it''s'");
        assert_eq!(quote_string("plain"), "'plain'");
    }
}
