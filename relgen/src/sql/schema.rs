use std::collections::HashMap;

use rellang::ir::{self, ModelId, RelationKind};

use crate::dialect::Dialect;

/// Renders the full `CREATE TABLE`/`CREATE INDEX` script, tables ordered so
/// that foreign keys never reference a table that has not been created yet.
pub fn schema_sql(root: &ir::Root, dialect: &dyn Dialect) -> String {
    let mut script = String::new();
    for (position, id) in dependency_order(root).into_iter().enumerate() {
        if position > 0 {
            script.push('\n');
        }
        let model = root.model(id);

        let mut lines = Vec::new();
        for &fid in &model.fields {
            let field = root.field(fid);
            let mut line = format!("\t{} {}", field.column, dialect.column_type(field));
            if !field.nullable {
                line.push_str(" NOT NULL");
            }
            if let Some(default) = &field.sql_default {
                line.push_str(&format!(" DEFAULT {default}"));
            }
            if let Some(relation) = &field.relation {
                let target = root.field(relation.field);
                line.push_str(&format!(
                    " REFERENCES {}( {} )",
                    root.model(target.model).table,
                    target.column
                ));
                match relation.kind {
                    RelationKind::Cascade => line.push_str(" ON DELETE CASCADE"),
                    RelationKind::SetNull => line.push_str(" ON DELETE SET NULL"),
                    RelationKind::Restrict => {}
                }
            }
            lines.push(line);
        }
        lines.push(format!("\tPRIMARY KEY ( {} )", columns(root, &model.primary_key)));
        for tuple in &model.unique {
            lines.push(format!("\tUNIQUE ( {} )", columns(root, tuple)));
        }

        script.push_str(&format!("CREATE TABLE {} (\n{}\n);\n", model.table, lines.join(",\n")));

        for index in &model.indexes {
            let unique = if index.unique { "UNIQUE " } else { "" };
            script.push_str(&format!(
                "CREATE {}INDEX {} ON {} ( {} );\n",
                unique,
                index.name,
                model.table,
                columns(root, &index.fields)
            ));
        }
    }
    script
}

fn columns(root: &ir::Root, fields: &[ir::FieldId]) -> String {
    fields
        .iter()
        .map(|&fid| root.field(fid).column.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Orders models by relation depth (no relations first), ties broken by table
/// name. Depth recursion marks a model before descending so self- and mutual
/// references terminate.
fn dependency_order(root: &ir::Root) -> Vec<ModelId> {
    let mut memo: HashMap<ModelId, usize> = HashMap::new();
    let mut ids: Vec<ModelId> = root.models().map(|(id, _)| id).collect();
    for &id in &ids {
        depth(root, id, &mut memo);
    }
    ids.sort_by(|&a, &b| {
        memo[&a]
            .cmp(&memo[&b])
            .then_with(|| root.model(a).table.cmp(&root.model(b).table))
    });
    ids
}

fn depth(root: &ir::Root, id: ModelId, memo: &mut HashMap<ModelId, usize>) -> usize {
    if let Some(&known) = memo.get(&id) {
        return known;
    }
    memo.insert(id, 0);
    let computed = root
        .model(id)
        .fields
        .iter()
        .filter_map(|&fid| root.field(fid).relation.as_ref())
        .map(|relation| depth(root, root.field(relation.field).model, memo) + 1)
        .max()
        .unwrap_or(0);
    memo.insert(id, computed);
    computed
}
