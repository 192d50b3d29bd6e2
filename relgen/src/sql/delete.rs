use rellang::ir;

use crate::sqlgen::Sql;

use super::{join_clauses, where_clause};

/// `DELETE FROM <table> [WHERE ...]`, with the same join-to-subquery strategy
/// as updates when joins are present.
pub fn delete_sql(root: &ir::Root, delete: &ir::Delete) -> Sql {
    let model = root.model(delete.model);

    let mut clauses = vec![Sql::literal(format!("DELETE FROM {}", model.table))];
    if delete.joins.is_empty() {
        if let Some(clause) = where_clause(root, &delete.wheres, Vec::new()) {
            clauses.push(clause);
        }
    } else if let Some(&pk) = model.primary_key.first() {
        let mut inner = vec![Sql::literal(format!(
            "SELECT {} FROM {}",
            root.column_ref(pk),
            model.table
        ))];
        inner.extend(join_clauses(root, &delete.joins));
        if let Some(clause) = where_clause(root, &delete.wheres, Vec::new()) {
            inner.push(clause);
        }
        clauses.push(Sql::literals(
            "",
            vec![
                Sql::literal(format!("WHERE {} IN ( ", root.field(pk).column)),
                Sql::literals(" ", inner),
                Sql::literal(" )"),
            ],
        ));
    }
    Sql::literals(" ", clauses)
}
