use crate::{
    diagnostics::LangResult,
    ir::{self, FieldId, ModelId, Operator, Selectable, View},
    lexer::Span,
    parser::ast::{self, get},
};

use super::{pluralize, Transformer};

impl Transformer<'_> {
    pub(super) fn resolve_queries(&mut self, ast: &ast::Root) -> LangResult {
        for create in &ast.creates {
            self.resolve_create(create)?;
        }
        for read in &ast.reads {
            self.resolve_read(read)?;
        }
        for update in &ast.updates {
            self.resolve_update(update)?;
        }
        for delete in &ast.deletes {
            self.resolve_delete(delete)?;
        }
        Ok(())
    }

    fn resolve_create(&mut self, create: &ast::Create) -> LangResult {
        let model = self.resolve_model_name(&create.model.value, create.model.span)?;
        let suffix = match &create.suffix {
            Some(suffix) => suffix.value.clone(),
            None => vec![create.model.value.clone()],
        };
        let create_ir = ir::Create {
            span: create.span,
            model,
            raw: get(&create.raw),
            suffix,
        };
        self.claim_signature("create", create_ir.signature(), create.span)?;
        self.root.creates.push(create_ir);
        Ok(())
    }

    fn resolve_read(&mut self, read: &ast::Read) -> LangResult {
        let Some(select) = &read.select else {
            return Err(self.err(read.span, "read requires a select"));
        };

        let mut selectables = Vec::new();
        for reference in &select.value {
            let selectable = match &reference.field {
                None => Selectable::Model(self.resolve_model_name(&reference.model, reference.span)?),
                Some(_) => Selectable::Field(self.resolve_field_ref(reference)?),
            };
            selectables.push(selectable);
        }
        let from = selectables[0].model_of(&self.root);

        let (scope, joins) = self.resolve_joins(from, &read.joins)?;
        for (selectable, reference) in selectables.iter().zip(&select.value) {
            let model = selectable.model_of(&self.root);
            if !scope.contains(&model) {
                return Err(self.err(
                    reference.span,
                    format!("model {} is not joined into this query", self.root.model(model).name),
                ));
            }
        }

        let wheres = self.resolve_wheres(&scope, &read.wheres)?;

        let order_by = match &read.order_by {
            Some(order_by) => {
                let mut fields = Vec::new();
                for reference in &order_by.fields {
                    let fid = self.resolve_field_ref(reference)?;
                    self.check_scope(&scope, fid, reference.span)?;
                    fields.push(fid);
                }
                Some(ir::OrderBy {
                    descending: order_by.descending,
                    fields,
                })
            }
            None => None,
        };

        let mut group_by = Vec::new();
        if let Some(refs) = &read.group_by {
            for reference in &refs.value {
                let fid = self.resolve_field_ref(reference)?;
                self.check_scope(&scope, fid, reference.span)?;
                group_by.push(fid);
            }
        }

        let unique = self.query_unique(&scope, &joins, &wheres);
        let suffix = match &read.suffix {
            Some(suffix) => suffix.value.clone(),
            None => self.default_read_suffix(&selectables, &wheres, unique),
        };

        // One IR read per requested view; with no view the declaration reads
        // one row when uniqueness is proven and all rows otherwise.
        let views: Vec<(View, Span)> = if read.views.is_empty() {
            let view = if unique { View::One } else { View::All };
            vec![(view, read.span)]
        } else {
            read.views.iter().map(|v| (v.value, v.span)).collect()
        };

        for (view, view_span) in views {
            match view {
                View::Paged => {
                    if let Some(order_by) = &read.order_by {
                        return Err(self.err(order_by.span, "cannot page a query with an explicit orderby"));
                    }
                    if self.root.model(from).primary_key.len() > 1 {
                        return Err(self.err(
                            view_span,
                            format!("cannot page model {} with a composite primary key", self.root.model(from).name),
                        ));
                    }
                    if unique {
                        return Err(self.err(view_span, "cannot page a query that returns at most one row"));
                    }
                }
                View::LimitOffset => {
                    if unique {
                        return Err(self.err(view_span, "cannot limit a query that returns at most one row"));
                    }
                }
                _ => {}
            }

            let read_ir = ir::Read {
                span: read.span,
                suffix: suffix.clone(),
                selectables: selectables.clone(),
                from,
                joins: joins.clone(),
                wheres: wheres.clone(),
                order_by: order_by.clone(),
                group_by: group_by.clone(),
                view,
                unique,
            };
            self.claim_signature("read", read_ir.signature(), read.span)?;
            self.root.reads.push(read_ir);
        }
        Ok(())
    }

    fn resolve_update(&mut self, update: &ast::Update) -> LangResult {
        let model = self.resolve_model_name(&update.model.value, update.model.span)?;
        let (scope, joins) = self.resolve_joins(model, &update.joins)?;
        let wheres = self.resolve_wheres(&scope, &update.wheres)?;
        if !joins.is_empty() && self.root.model(model).primary_key.len() > 1 {
            return Err(self.err(
                update.span,
                format!(
                    "cannot update model {} through joins: its primary key spans multiple columns",
                    self.root.model(model).name
                ),
            ));
        }
        if self.root.updatable_fields(model).is_empty() {
            return Err(self.err(
                update.model.span,
                format!("model {} has no updatable fields", self.root.model(model).name),
            ));
        }
        let suffix = match &update.suffix {
            Some(suffix) => suffix.value.clone(),
            None => self.default_write_suffix(model, &wheres),
        };
        let update_ir = ir::Update {
            span: update.span,
            model,
            joins,
            wheres,
            suffix,
        };
        self.claim_signature("update", update_ir.signature(), update.span)?;
        self.root.updates.push(update_ir);
        Ok(())
    }

    fn resolve_delete(&mut self, delete: &ast::Delete) -> LangResult {
        let model = self.resolve_model_name(&delete.model.value, delete.model.span)?;
        let (scope, joins) = self.resolve_joins(model, &delete.joins)?;
        let wheres = self.resolve_wheres(&scope, &delete.wheres)?;
        if !joins.is_empty() && self.root.model(model).primary_key.len() > 1 {
            return Err(self.err(
                delete.span,
                format!(
                    "cannot delete from model {} through joins: its primary key spans multiple columns",
                    self.root.model(model).name
                ),
            ));
        }
        let suffix = match &delete.suffix {
            Some(suffix) => suffix.value.clone(),
            None => self.default_write_suffix(model, &wheres),
        };
        let delete_ir = ir::Delete {
            span: delete.span,
            model,
            joins,
            wheres,
            suffix,
        };
        self.claim_signature("delete", delete_ir.signature(), delete.span)?;
        self.root.deletes.push(delete_ir);
        Ok(())
    }

    // -- shared resolution helpers --

    fn resolve_model_name(&self, name: &str, span: Span) -> LangResult<ModelId> {
        self.lookup
            .model(name)
            .ok_or_else(|| self.err(span, format!("model {name} is not defined")))
    }

    fn resolve_field_ref(&self, reference: &ast::FieldRef) -> LangResult<FieldId> {
        let model = self.resolve_model_name(&reference.model, reference.span)?;
        let Some(field) = &reference.field else {
            return Err(self.err(reference.span, "expected model.field reference"));
        };
        self.lookup.field(model, field).ok_or_else(|| {
            self.err(
                reference.span,
                format!("field {field} is not defined on model {}", reference.model),
            )
        })
    }

    fn check_scope(&self, scope: &[ModelId], fid: FieldId, span: Span) -> LangResult {
        let model = self.root.field(fid).model;
        if scope.contains(&model) {
            Ok(())
        } else {
            Err(self.err(
                span,
                format!("model {} is not joined into this query", self.root.model(model).name),
            ))
        }
    }

    /// Walks joins left to right: the left side must already be in scope and
    /// the right side brings its model into scope.
    fn resolve_joins(&self, from: ModelId, joins: &[ast::Join]) -> LangResult<(Vec<ModelId>, Vec<ir::Join>)> {
        let mut scope = vec![from];
        let mut resolved = Vec::new();
        for join in joins {
            let left = self.resolve_field_ref(&join.left)?;
            self.check_scope(&scope, left, join.left.span)?;
            let right = self.resolve_field_ref(&join.right)?;
            let right_model = self.root.field(right).model;
            if !scope.contains(&right_model) {
                scope.push(right_model);
            }
            resolved.push(ir::Join { left, right });
        }
        Ok((scope, resolved))
    }

    fn resolve_wheres(&self, scope: &[ModelId], wheres: &[ast::Where]) -> LangResult<Vec<ir::Where>> {
        wheres
            .iter()
            .map(|w| {
                Ok(ir::Where {
                    left: self.resolve_expr(scope, &w.left)?,
                    op: w.op.value,
                    right: self.resolve_expr(scope, &w.right)?,
                })
            })
            .collect()
    }

    fn resolve_expr(&self, scope: &[ModelId], expr: &ast::Expr) -> LangResult<ir::Expr> {
        Ok(match &expr.kind {
            ast::ExprKind::Null => ir::Expr::Null,
            ast::ExprKind::Placeholder => ir::Expr::Placeholder,
            ast::ExprKind::StringLit(s) => ir::Expr::String(s.clone()),
            ast::ExprKind::NumberLit(n) => ir::Expr::Number(n.clone()),
            ast::ExprKind::BoolLit(b) => ir::Expr::Bool(*b),
            ast::ExprKind::FieldRef(reference) => {
                let fid = self.resolve_field_ref(reference)?;
                self.check_scope(scope, fid, reference.span)?;
                ir::Expr::Field(fid)
            }
            ast::ExprKind::FuncCall { name, args } if name == "lower" && args.len() == 1 => {
                ir::Expr::Lower(Box::new(self.resolve_expr(scope, &args[0])?))
            }
            ast::ExprKind::FuncCall { name, .. } => {
                return Err(self.err(expr.span, format!("unknown function `{name}`")));
            }
        })
    }

    // -- uniqueness analysis --

    /// Whether the query can return at most one row. Equality clauses pin
    /// fields to constants; pinning then propagates across joins: once one
    /// side of a join is proven unique, the other side's join column is pinned
    /// too. The query is unique when every model in scope is pinned down to a
    /// full primary key or unique tuple.
    fn query_unique(&self, scope: &[ModelId], joins: &[ir::Join], wheres: &[ir::Where]) -> bool {
        let mut pinned: Vec<FieldId> = Vec::new();
        for clause in wheres {
            if clause.op != Operator::Eq {
                continue;
            }
            if let ir::Expr::Field(fid) = clause.left {
                if !matches!(clause.right, ir::Expr::Field(_)) {
                    pinned.push(fid);
                }
            }
            if let ir::Expr::Field(fid) = clause.right {
                if !matches!(clause.left, ir::Expr::Field(_)) {
                    pinned.push(fid);
                }
            }
        }

        loop {
            let mut changed = false;
            for join in joins {
                let left_model = self.root.field(join.left).model;
                let right_model = self.root.field(join.right).model;
                if self.root.pins_unique(right_model, &pinned) && !pinned.contains(&join.left) {
                    pinned.push(join.left);
                    changed = true;
                }
                if self.root.pins_unique(left_model, &pinned) && !pinned.contains(&join.right) {
                    pinned.push(join.right);
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        scope.iter().all(|&model| self.root.pins_unique(model, &pinned))
    }

    // -- suffix defaulting --

    /// Selected names are pluralized when the read can return more than one
    /// row, so `user_by_id` reads one user and `users_by_age` reads many.
    fn default_read_suffix(&self, selectables: &[Selectable], wheres: &[ir::Where], unique: bool) -> Vec<String> {
        let mut parts = Vec::new();
        for selectable in selectables {
            match selectable {
                Selectable::Model(id) => {
                    let name = &self.root.model(*id).name;
                    parts.push(if unique { name.clone() } else { pluralize(name) });
                }
                Selectable::Field(id) => {
                    let field = self.root.field(*id);
                    let model = &self.root.model(field.model).name;
                    let name = if unique { field.name.clone() } else { pluralize(&field.name) };
                    parts.push(format!("{model}_{name}"));
                }
            }
        }
        self.push_where_suffix(&mut parts, wheres);
        parts
    }

    fn default_write_suffix(&self, model: ModelId, wheres: &[ir::Where]) -> Vec<String> {
        let mut parts = vec![self.root.model(model).name.clone()];
        self.push_where_suffix(&mut parts, wheres);
        parts
    }

    fn push_where_suffix(&self, parts: &mut Vec<String>, wheres: &[ir::Where]) {
        let mut first = true;
        for clause in wheres {
            let Some(name) = self.expr_field_name(&clause.left) else {
                continue;
            };
            parts.push(if first { "by".to_string() } else { "and".to_string() });
            first = false;
            match clause.op.suffix() {
                Some(op) => parts.push(format!("{name}_{op}")),
                None => parts.push(name),
            }
        }
    }

    fn expr_field_name(&self, expr: &ir::Expr) -> Option<String> {
        match expr {
            ir::Expr::Field(fid) => Some(self.root.field(*fid).name.clone()),
            ir::Expr::Lower(inner) => self.expr_field_name(inner),
            _ => None,
        }
    }
}
