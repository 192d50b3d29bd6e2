use rellang::ir::{self, View};

use crate::sqlgen::Sql;

use super::{column_refs, join_clauses, where_clause};

/// Builds the SELECT for one IR read, specialized by its view.
pub fn select_sql(root: &ir::Root, read: &ir::Read) -> Sql {
    let from = root.model(read.from);
    // Single-column key guaranteed by the transformer for paged reads.
    let page_key = from.primary_key.first().copied();

    let field_list = match read.view {
        View::Has => "1".to_string(),
        View::Count => "COUNT(*)".to_string(),
        _ => {
            let mut fields: Vec<ir::FieldId> = read
                .selectables
                .iter()
                .flat_map(|s| s.field_refs(root))
                .collect();
            if read.view == View::Paged {
                // The page key rides along so callers can track the boundary.
                if let Some(pk) = page_key {
                    if !fields.contains(&pk) {
                        fields.push(pk);
                    }
                }
            }
            column_refs(root, &fields)
        }
    };

    let mut clauses = vec![
        Sql::literal(format!("SELECT {field_list}")),
        Sql::literal(format!("FROM {}", from.table)),
    ];
    clauses.extend(join_clauses(root, &read.joins));

    let mut extra = Vec::new();
    if read.view == View::Paged {
        if let Some(pk) = page_key {
            extra.push(format!("{} > ?", root.column_ref(pk)));
        }
    }
    if let Some(clause) = where_clause(root, &read.wheres, extra) {
        clauses.push(clause);
    }

    if !read.group_by.is_empty() {
        clauses.push(Sql::literal(format!("GROUP BY {}", column_refs(root, &read.group_by))));
    }

    if read.view == View::Paged {
        if let Some(pk) = page_key {
            clauses.push(Sql::literal(format!("ORDER BY {}", root.column_ref(pk))));
        }
    } else if let Some(order_by) = &read.order_by {
        let direction = if order_by.descending { " DESC" } else { "" };
        clauses.push(Sql::literal(format!(
            "ORDER BY {}{}",
            column_refs(root, &order_by.fields),
            direction
        )));
    }

    match read.view {
        View::Paged => clauses.push(Sql::literal("LIMIT ?")),
        View::LimitOffset => {
            clauses.push(Sql::literal("LIMIT ?"));
            clauses.push(Sql::literal("OFFSET ?"));
        }
        // LIMIT 2 lets the accessor layer tell "too many rows" apart from a
        // normal result when uniqueness was not proven statically.
        View::One | View::Scalar if !read.unique => clauses.push(Sql::literal("LIMIT 2")),
        View::First => clauses.push(Sql::literal("LIMIT 1 OFFSET 0")),
        _ => {}
    }

    let core = Sql::literals(" ", clauses);
    if read.view == View::Has {
        Sql::literals(
            "",
            vec![Sql::literal("SELECT COALESCE(( "), core, Sql::literal(" ), 0)")],
        )
    } else {
        core
    }
}
