use rellang::ir;

use crate::{
    dialect::Dialect,
    sqlgen::{Hole, Sql},
};

use super::{join_clauses, returning_clause, where_clause};

/// `UPDATE <table> SET <hole> [WHERE ...] [RETURNING ...]`.
///
/// The SET list stays an unfilled [`Hole`]: which columns appear depends on
/// which optional arguments the caller supplies at the accessor layer. SQL
/// UPDATE cannot join directly, so an update with joins pins rows through a
/// `pk IN (<select over the join>)` subquery instead; the transformer has
/// already rejected composite keys here.
pub fn update_sql(root: &ir::Root, update: &ir::Update, dialect: &dyn Dialect) -> (Sql, Hole) {
    let model = root.model(update.model);
    let sets = Hole::new("sets");

    let mut clauses = vec![
        Sql::literal(format!("UPDATE {} SET", model.table)),
        Sql::Hole(sets.clone()),
    ];
    if update.joins.is_empty() {
        if let Some(clause) = where_clause(root, &update.wheres, Vec::new()) {
            clauses.push(clause);
        }
    } else if let Some(&pk) = model.primary_key.first() {
        let mut inner = vec![Sql::literal(format!(
            "SELECT {} FROM {}",
            root.column_ref(pk),
            model.table
        ))];
        inner.extend(join_clauses(root, &update.joins));
        if let Some(clause) = where_clause(root, &update.wheres, Vec::new()) {
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
    if dialect.features().returning {
        clauses.push(returning_clause(root, update.model));
    }
    (Sql::literals(" ", clauses), sets)
}
