use rellang::ir::{self, FieldType};

use super::{Dialect, Features};

pub struct Postgres;

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn features(&self) -> Features {
        Features {
            returning: true,
            positional_arguments: true,
            no_limit_token: false,
        }
    }

    fn row_id(&self) -> Option<&'static str> {
        None
    }

    fn column_type(&self, field: &ir::Field) -> String {
        match field.field_type {
            FieldType::Serial => "serial".to_string(),
            FieldType::Serial64 => "bigserial".to_string(),
            FieldType::Int | FieldType::Uint => "integer".to_string(),
            FieldType::Int64 | FieldType::Uint64 => "bigint".to_string(),
            FieldType::Bool => "boolean".to_string(),
            FieldType::Text => match field.length {
                Some(length) => format!("varchar({length})"),
                None => "text".to_string(),
            },
            FieldType::Timestamp => "timestamp with time zone".to_string(),
            FieldType::Utimestamp => "timestamp".to_string(),
            FieldType::Float => "real".to_string(),
            FieldType::Float64 => "double precision".to_string(),
            FieldType::Blob => "bytea".to_string(),
            FieldType::Date => "date".to_string(),
        }
    }

    /// Rewrites each `?` to `$1`, `$2`, ... in left-to-right order. The
    /// generated SQL never carries `?` inside string literals, so a plain
    /// character scan is enough.
    fn rebind(&self, sql: &str) -> String {
        let mut out = String::with_capacity(sql.len());
        let mut position = 0;
        for ch in sql.chars() {
            if ch == '?' {
                position += 1;
                out.push('$');
                out.push_str(&position.to_string());
            } else {
                out.push(ch);
            }
        }
        out
    }

    fn argument_prefix(&self) -> &'static str {
        "$"
    }

    fn exec_on_open(&self) -> Option<&'static str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_rebind_numbers_left_to_right() {
        assert_eq!(Postgres.rebind("? a ? b ?"), "$1 a $2 b $3");
        assert_eq!(Postgres.rebind("no placeholders"), "no placeholders");
    }
}
