use rellang::ir;

use crate::{dialect::Dialect, sqlgen::Sql};

use super::returning_clause;

/// `INSERT INTO <table>(<cols>) VALUES(<placeholders>)`. Serial columns are
/// database-generated and only included for raw creates; a model with nothing
/// insertable falls back to `DEFAULT VALUES`. Dialects with RETURNING get the
/// full column list back.
pub fn insert_sql(root: &ir::Root, create: &ir::Create, dialect: &dyn Dialect) -> Sql {
    let model = root.model(create.model);
    let fields = root.insertable_fields(create.model, create.raw);

    let mut clauses = Vec::new();
    if fields.is_empty() {
        clauses.push(Sql::literal(format!("INSERT INTO {} DEFAULT VALUES", model.table)));
    } else {
        let columns = fields
            .iter()
            .map(|&fid| root.field(fid).column.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let values = vec!["?"; fields.len()].join(", ");
        clauses.push(Sql::literal(format!(
            "INSERT INTO {}({}) VALUES({})",
            model.table, columns, values
        )));
    }
    if dialect.features().returning {
        clauses.push(returning_clause(root, create.model));
    }
    Sql::literals(" ", clauses)
}
