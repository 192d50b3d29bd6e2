use std::collections::{HashMap, HashSet};

use crate::{
    diagnostics::LangResult,
    ir::{self, FieldId, ModelId},
    lexer::Span,
    parser::ast::{self, get, FieldType, RelationKind, Spanned},
};

use super::{pluralize, Transformer};

impl Transformer<'_> {
    /// Pass 1: allocate every model and field so later references, including
    /// forward ones, resolve to a stable id.
    pub(super) fn declare_models(&mut self, ast: &ast::Root) -> LangResult {
        let mut tables: HashMap<String, Span> = HashMap::new();
        for model in &ast.models {
            let id = ModelId(self.root.models.len());
            if let Some(prev) = self.lookup.declare_model(&model.name.value, id, model.name.span) {
                let prev_span = self.lookup.model_span(prev);
                return Err(self.err_related(
                    model.name.span,
                    format!("model {} previously defined at line {}", model.name.value, prev_span.lines.0),
                    prev_span,
                    "first defined here",
                ));
            }

            let (table, table_span) = match &model.table {
                Some(table) => (table.value.clone(), table.span),
                None => (pluralize(&model.name.value), model.name.span),
            };
            if let Some(&prev) = tables.get(&table) {
                return Err(self.err_related(
                    table_span,
                    format!("table {table} previously used at line {}", prev.lines.0),
                    prev,
                    "first used here",
                ));
            }
            tables.insert(table.clone(), table_span);

            let mut field_ids = Vec::new();
            let mut columns: HashMap<String, Span> = HashMap::new();
            for field in &model.fields {
                let fid = FieldId(self.root.fields.len());
                if let Some(prev) = self.lookup.declare_field(id, &field.name.value, fid, field.name.span) {
                    let prev_span = self.lookup.field_span(prev);
                    return Err(self.err_related(
                        field.name.span,
                        format!("field {} previously defined at line {}", field.name.value, prev_span.lines.0),
                        prev_span,
                        "first defined here",
                    ));
                }

                let (column, column_span) = match &field.column {
                    Some(column) => (column.value.clone(), column.span),
                    None => (field.name.value.clone(), field.name.span),
                };
                if let Some(&prev) = columns.get(&column) {
                    return Err(self.err_related(
                        column_span,
                        format!("column {column} previously used at line {}", prev.lines.0),
                        prev,
                        "first used here",
                    ));
                }
                columns.insert(column.clone(), column_span);

                let auto_update = get(&field.auto_update);
                self.root.fields.push(ir::Field {
                    model: id,
                    name: field.name.value.clone(),
                    column,
                    // Relation fields get their real type in the resolve pass.
                    field_type: field.field_type.as_ref().map(|t| t.value).unwrap_or(FieldType::Int),
                    relation: None,
                    nullable: get(&field.nullable),
                    updatable: get(&field.updatable) || auto_update,
                    auto_insert: get(&field.auto_insert),
                    auto_update,
                    length: field.length.as_ref().map(|l| l.value),
                    default_value: field.default_value.as_ref().map(|d| d.value.clone()),
                    sql_default: field.sql_default.as_ref().map(|d| d.value.clone()),
                });
                field_ids.push(fid);
            }

            self.root.models.push(ir::Model {
                name: model.name.value.clone(),
                table,
                fields: field_ids,
                primary_key: Vec::new(),
                unique: Vec::new(),
                indexes: Vec::new(),
            });
        }
        Ok(())
    }

    /// Pass 2: type relation fields, then resolve keys, unique tuples, and
    /// indexes against the declared names.
    pub(super) fn resolve_models(&mut self, ast: &ast::Root) -> LangResult {
        self.resolve_relations(ast)?;

        let mut index_names: HashMap<String, Span> = HashMap::new();
        for (model_idx, model) in ast.models.iter().enumerate() {
            let id = ModelId(model_idx);

            let Some(key) = &model.primary_key else {
                return Err(self.err(model.name.span, format!("model {} has no primary key", model.name.value)));
            };
            let mut primary_key = Vec::new();
            for name in &key.value {
                let fid = self.resolve_model_field(id, name)?;
                let field = self.root.field(fid);
                if field.nullable {
                    return Err(self.err(name.span, format!("primary key field {} cannot be nullable", name.value)));
                }
                if field.updatable {
                    return Err(self.err(name.span, format!("primary key field {} cannot be updatable", name.value)));
                }
                primary_key.push(fid);
            }
            self.root.models[model_idx].primary_key = primary_key;

            for tuple in &model.unique {
                let mut ids = Vec::new();
                for name in &tuple.value {
                    ids.push(self.resolve_model_field(id, name)?);
                }
                self.root.models[model_idx].unique.push(ids);
            }

            for index in &model.indexes {
                let Some(fields) = &index.fields else {
                    return Err(self.err(index.span, "index requires fields"));
                };
                let mut ids = Vec::new();
                for name in &fields.value {
                    ids.push(self.resolve_model_field(id, name)?);
                }
                let unique = get(&index.unique);
                let name = match &index.name {
                    Some(name) => name.value.clone(),
                    None => {
                        let table = &self.root.models[model_idx].table;
                        let columns: Vec<&str> = ids.iter().map(|&f| self.root.field(f).column.as_str()).collect();
                        let kind = if unique { "unique_index" } else { "index" };
                        format!("{}_{}_{}", table, columns.join("_"), kind)
                    }
                };
                if let Some(&prev) = index_names.get(&name) {
                    return Err(self.err_related(
                        index.span,
                        format!("index {name} previously defined at line {}", prev.lines.0),
                        prev,
                        "first defined here",
                    ));
                }
                index_names.insert(name.clone(), index.span);
                self.root.models[model_idx].indexes.push(ir::Index {
                    name,
                    fields: ids,
                    unique,
                });
            }
        }
        Ok(())
    }

    /// Relation fields take their type from the target field through
    /// `as_link`, so a chain of relations resolves iteratively: each round
    /// types the fields whose target is already typed, and a round with no
    /// progress means the chain is circular.
    fn resolve_relations(&mut self, ast: &ast::Root) -> LangResult {
        let mut pending: Vec<(FieldId, &ast::Field, &ast::FieldRef)> = Vec::new();
        let mut cursor = 0usize;
        for model in &ast.models {
            for field in &model.fields {
                let fid = FieldId(cursor);
                cursor += 1;
                if let Some(relation) = &field.relation {
                    pending.push((fid, field, relation));
                }
            }
        }

        let mut untyped: HashSet<FieldId> = pending.iter().map(|(id, _, _)| *id).collect();
        while !pending.is_empty() {
            let before = pending.len();
            let mut remaining = Vec::new();
            for (fid, field, relation) in pending {
                let target_model = self
                    .lookup
                    .model(&relation.model)
                    .ok_or_else(|| self.err(relation.span, format!("model {} is not defined", relation.model)))?;
                let Some(target_name) = &relation.field else {
                    return Err(self.err(relation.span, "expected model.field reference"));
                };
                let target = self.lookup.field(target_model, target_name).ok_or_else(|| {
                    self.err(
                        relation.span,
                        format!("field {target_name} is not defined on model {}", relation.model),
                    )
                })?;
                if untyped.contains(&target) {
                    remaining.push((fid, field, relation));
                    continue;
                }

                let kind = field.relation_kind.as_ref().map(|k| k.value).unwrap_or_default();
                if kind == RelationKind::SetNull && !self.root.field(fid).nullable {
                    let span = field.relation_kind.as_ref().map(|k| k.span).unwrap_or(relation.span);
                    return Err(self.err(span, "setnull relationships must be nullable"));
                }
                let field_type = self.root.field(target).field_type.as_link();
                self.root.fields[fid.0].field_type = field_type;
                self.root.fields[fid.0].relation = Some(ir::Relation { field: target, kind });
                untyped.remove(&fid);
            }
            if remaining.len() == before {
                let (_, _, relation) = &remaining[0];
                return Err(self.err(relation.span, format!("circular relation through {relation}")));
            }
            pending = remaining;
        }
        Ok(())
    }

    pub(super) fn resolve_model_field(&self, model: ModelId, name: &Spanned<String>) -> LangResult<FieldId> {
        self.lookup.field(model, &name.value).ok_or_else(|| {
            self.err(
                name.span,
                format!("field {} is not defined on model {}", name.value, self.root.model(model).name),
            )
        })
    }
}
