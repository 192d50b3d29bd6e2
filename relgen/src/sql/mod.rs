//! Statement builders: pure functions from IR query objects to [`Sql`] trees.

mod delete;
mod insert;
mod schema;
mod select;
mod update;

use rellang::ir;

use crate::{
    dialect::quote_string,
    sqlgen::{Condition, Sql},
};

pub use delete::delete_sql;
pub use insert::insert_sql;
pub use schema::schema_sql;
pub use select::select_sql;
pub use update::update_sql;

pub(crate) fn expr_text(root: &ir::Root, expr: &ir::Expr) -> String {
    match expr {
        ir::Expr::Null => "NULL".to_string(),
        ir::Expr::Placeholder => "?".to_string(),
        ir::Expr::String(value) => quote_string(value),
        ir::Expr::Number(value) => value.clone(),
        ir::Expr::Bool(value) => value.to_string(),
        ir::Expr::Field(fid) => root.column_ref(*fid),
        ir::Expr::Lower(inner) => format!("lower({})", expr_text(root, inner)),
    }
}

pub(crate) fn where_text(root: &ir::Root, clause: &ir::Where) -> String {
    // A literal null right side folds into the is-null forms.
    match (&clause.right, clause.op) {
        (ir::Expr::Null, ir::Operator::Eq) => format!("{} is null", expr_text(root, &clause.left)),
        (ir::Expr::Null, ir::Operator::Ne) => format!("{} is not null", expr_text(root, &clause.left)),
        _ => format!(
            "{} {} {}",
            expr_text(root, &clause.left),
            clause.op,
            expr_text(root, &clause.right)
        ),
    }
}

pub(crate) fn where_clause(root: &ir::Root, wheres: &[ir::Where], extra: Vec<String>) -> Option<Sql> {
    let mut conditions: Vec<Sql> = wheres.iter().map(|w| condition_sql(root, w)).collect();
    conditions.extend(extra.into_iter().map(Sql::Literal));
    if conditions.is_empty() {
        None
    } else {
        Some(Sql::literals(
            "",
            vec![Sql::literal("WHERE "), Sql::literals(" AND ", conditions)],
        ))
    }
}

/// An equality test against a placeholder on a nullable column becomes a
/// shared [`Condition`] handle, so the accessor layer can flip it to the
/// is-null form when the supplied argument is null. Everything else is static
/// text.
fn condition_sql(root: &ir::Root, clause: &ir::Where) -> Sql {
    if let (ir::Expr::Field(fid), ir::Operator::Eq | ir::Operator::Ne, ir::Expr::Placeholder) =
        (&clause.left, clause.op, &clause.right)
    {
        if root.field(*fid).nullable {
            let condition = Condition::new(root.field(*fid).name.clone(), root.column_ref(*fid));
            if clause.op == ir::Operator::Ne {
                condition.set_equal(false);
            }
            return Sql::Condition(condition);
        }
    }
    Sql::literal(where_text(root, clause))
}

pub(crate) fn join_clauses(root: &ir::Root, joins: &[ir::Join]) -> Vec<Sql> {
    joins
        .iter()
        .map(|join| {
            let right_table = &root.model(root.field(join.right).model).table;
            Sql::literal(format!(
                "LEFT JOIN {} ON {} = {}",
                right_table,
                root.column_ref(join.left),
                root.column_ref(join.right)
            ))
        })
        .collect()
}

pub(crate) fn column_refs(root: &ir::Root, fields: &[ir::FieldId]) -> String {
    fields
        .iter()
        .map(|&fid| root.column_ref(fid))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `RETURNING <all columns of model>`.
pub(crate) fn returning_clause(root: &ir::Root, model: ir::ModelId) -> Sql {
    Sql::literal(format!("RETURNING {}", column_refs(root, &root.model(model).fields)))
}
