use crate::{
    diagnostics::{LangError, LangResult},
    lexer::{Scanner, Span, Token, TokenKind},
    metadata::SourceMetadata,
    parser::{
        ast::{self, Expr, ExprKind, FieldRef, FieldType, Operator, RelationKind, Spanned, View},
        tree::{self, ListNode, Node, TupleNode},
    },
};

/// Parses DSL source into a typed AST.
pub fn parse(meta: &SourceMetadata) -> LangResult<ast::Root> {
    let mut scanner = Scanner::new(meta)?;
    let root = tree::scan_root(&mut scanner)?;
    log::debug!("scanned {} top-level tuples from {}", root.tuples.len(), meta.file_name);
    Parser { meta }.parse_root(&root)
}

struct Parser<'a> {
    meta: &'a SourceMetadata<'a>,
}

/// Cursor over a single tuple's nodes.
struct Tup<'a> {
    nodes: &'a [Node],
    pos: usize,
    span: Span,
}

impl<'a> Tup<'a> {
    fn new(tuple: &'a TupleNode) -> Self {
        Self {
            nodes: &tuple.nodes,
            pos: 0,
            span: tuple.span,
        }
    }

    fn peek(&self) -> Option<&'a Node> {
        self.nodes.get(self.pos)
    }

    fn peek_token(&self) -> Option<&'a Token> {
        match self.peek() {
            Some(Node::Token(token)) => Some(token),
            _ => None,
        }
    }

    fn next(&mut self) -> Option<&'a Node> {
        let node = self.nodes.get(self.pos);
        if node.is_some() {
            self.pos += 1;
        }
        node
    }

    /// Span for "the next thing here", for error reporting at end of tuple.
    fn here(&self) -> Span {
        self.peek().map(|n| n.span()).unwrap_or(self.span)
    }
}

impl<'a> Parser<'a> {
    fn err(&self, span: Span, message: impl Into<String>) -> Box<LangError> {
        Box::new(LangError::error(
            self.meta.file_name,
            self.meta.contents,
            span,
            message,
            None::<String>,
            Some("ESyntax"),
        ))
    }

    fn previously_defined(&self, span: Span, what: &str, prev: Span) -> Box<LangError> {
        Box::new(
            LangError::error(
                self.meta.file_name,
                self.meta.contents,
                span,
                format!("{what} previously defined at line {}", prev.lines.0),
                None::<String>,
                Some("EPreviouslyDefined"),
            )
            .with_related(prev, format!("{what} first defined here")),
        )
    }

    fn check_unset<T>(&self, opt: &Option<Spanned<T>>, span: Span, what: &str) -> LangResult<()> {
        match opt {
            Some(prev) => Err(self.previously_defined(span, what, prev.span)),
            None => Ok(()),
        }
    }

    fn parse_root(&self, root: &ListNode) -> LangResult<ast::Root> {
        let mut out = ast::Root::default();
        for tuple in &root.tuples {
            let mut tup = Tup::new(tuple);
            let keyword = self.ident(&mut tup)?;
            match keyword.value.as_str() {
                "model" => out.models.push(self.parse_model(&mut tup, tuple.span)?),
                "create" => out.creates.push(self.parse_create(&mut tup, tuple.span)?),
                "read" => out.reads.push(self.parse_read(&mut tup, tuple.span)?),
                "update" => out.updates.push(self.parse_update(&mut tup, tuple.span)?),
                "delete" => out.deletes.push(self.parse_delete(&mut tup, tuple.span)?),
                other => {
                    return Err(self.err(
                        keyword.span,
                        format!("expected one of {{model, create, read, update, delete}}; got `{other}`"),
                    ));
                }
            }
        }
        Ok(out)
    }

    // -- primitives over the tuple cursor --

    fn ident(&self, tup: &mut Tup) -> LangResult<Spanned<String>> {
        match tup.next() {
            Some(Node::Token(token)) if token.kind == TokenKind::Ident => {
                Ok(Spanned::new(token.text.to_lowercase(), token.span))
            }
            Some(node) => Err(self.err(node.span(), "expected identifier")),
            None => Err(self.err(tup.span, "expected identifier; got end of line")),
        }
    }

    fn token<'t>(&self, tup: &mut Tup<'t>, kind: TokenKind) -> LangResult<&'t Token> {
        match tup.next() {
            Some(Node::Token(token)) if token.kind == kind => Ok(token),
            Some(node) => Err(self.err(node.span(), format!("expected {kind}"))),
            None => Err(self.err(tup.span, format!("expected {kind}; got end of line"))),
        }
    }

    fn list<'t>(&self, tup: &mut Tup<'t>) -> LangResult<&'t ListNode> {
        match tup.next() {
            Some(Node::List(list)) => Ok(list),
            Some(node) => Err(self.err(node.span(), "expected (")),
            None => Err(self.err(tup.span, "expected (; got end of line")),
        }
    }

    fn opt_list<'t>(&self, tup: &mut Tup<'t>) -> Option<&'t ListNode> {
        match tup.peek() {
            Some(Node::List(list)) => {
                tup.pos += 1;
                Some(list)
            }
            _ => None,
        }
    }

    fn done(&self, tup: &mut Tup) -> LangResult<()> {
        match tup.peek() {
            Some(node) => Err(self.err(node.span(), "unexpected trailing input")),
            None => Ok(()),
        }
    }

    /// One or more identifiers to the end of the tuple.
    fn ident_list(&self, tup: &mut Tup, what: &str) -> LangResult<Vec<Spanned<String>>> {
        let mut names = Vec::new();
        while tup.peek().is_some() {
            names.push(self.ident(tup)?);
        }
        if names.is_empty() {
            return Err(self.err(tup.span, format!("{what} requires at least one field")));
        }
        Ok(names)
    }

    /// A bare literal value, kept as its source text.
    fn literal_value(&self, tup: &mut Tup) -> LangResult<Spanned<String>> {
        match tup.next() {
            Some(Node::Token(token))
                if matches!(
                    token.kind,
                    TokenKind::String | TokenKind::Int | TokenKind::Float | TokenKind::Ident
                ) =>
            {
                Ok(Spanned::new(token.text.clone(), token.span))
            }
            Some(node) => Err(self.err(node.span(), "expected a literal value")),
            None => Err(self.err(tup.span, "expected a literal value; got end of line")),
        }
    }

    fn field_ref(&self, tup: &mut Tup) -> LangResult<FieldRef> {
        let model = self.ident(tup)?;
        let mut span = model.span;
        let mut field = None;
        if tup.peek_token().map(|t| t.kind) == Some(TokenKind::Dot) {
            tup.pos += 1;
            let name = self.ident(tup)?;
            span = span.merge(&name.span);
            field = Some(name.value);
        }
        Ok(FieldRef {
            span,
            model: model.value,
            field,
        })
    }

    fn full_field_ref(&self, tup: &mut Tup) -> LangResult<FieldRef> {
        let fr = self.field_ref(tup)?;
        if fr.field.is_none() {
            return Err(self.err(fr.span, "expected model.field reference"));
        }
        Ok(fr)
    }

    // -- models --

    fn parse_model(&self, tup: &mut Tup, span: Span) -> LangResult<ast::Model> {
        let name = self.ident(tup)?;
        let body = self.list(tup)?;
        self.done(tup)?;

        let mut model = ast::Model {
            span,
            name,
            table: None,
            fields: Vec::new(),
            primary_key: None,
            unique: Vec::new(),
            indexes: Vec::new(),
        };

        for tuple in &body.tuples {
            let mut tup = Tup::new(tuple);
            let keyword = self.ident(&mut tup)?;
            match keyword.value.as_str() {
                "table" => {
                    self.check_unset(&model.table, keyword.span, "table")?;
                    let table = self.ident(&mut tup)?;
                    self.done(&mut tup)?;
                    model.table = Some(table);
                }
                "field" => model.fields.push(self.parse_field(&mut tup, tuple.span)?),
                "key" => {
                    self.check_unset(&model.primary_key, keyword.span, "key")?;
                    let names = self.ident_list(&mut tup, "key")?;
                    model.primary_key = Some(Spanned::new(names, tuple.span));
                }
                "unique" => {
                    let names = self.ident_list(&mut tup, "unique")?;
                    model.unique.push(Spanned::new(names, tuple.span));
                }
                "index" => model.indexes.push(self.parse_index(&mut tup, tuple.span)?),
                other => {
                    return Err(self.err(
                        keyword.span,
                        format!("expected one of {{table, field, key, unique, index}}; got `{other}`"),
                    ));
                }
            }
        }
        Ok(model)
    }

    fn parse_field(&self, tup: &mut Tup, span: Span) -> LangResult<ast::Field> {
        let name = self.ident(tup)?;

        let mut field = ast::Field {
            span,
            name,
            column: None,
            field_type: None,
            relation: None,
            relation_kind: None,
            nullable: None,
            updatable: None,
            auto_insert: None,
            auto_update: None,
            length: None,
            default_value: None,
            sql_default: None,
        };

        // The type slot is either a type keyword or a model.field relation
        // reference; the dot decides which.
        let type_ident = self.ident(tup)?;
        if tup.peek_token().map(|t| t.kind) == Some(TokenKind::Dot) {
            tup.pos += 1;
            let target = self.ident(tup)?;
            field.relation = Some(FieldRef {
                span: type_ident.span.merge(&target.span),
                model: type_ident.value,
                field: Some(target.value),
            });
        } else {
            match FieldType::from_keyword(&type_ident.value) {
                Some(field_type) => field.field_type = Some(Spanned::new(field_type, type_ident.span)),
                None => {
                    return Err(self.err(
                        type_ident.span,
                        format!("expected a field type or model.field reference; got `{}`", type_ident.value),
                    ));
                }
            }
        }

        if let Some(attrs) = self.opt_list(tup) {
            for tuple in &attrs.tuples {
                let mut tup = Tup::new(tuple);
                let keyword = self.ident(&mut tup)?;
                match keyword.value.as_str() {
                    "column" => {
                        self.check_unset(&field.column, keyword.span, "column")?;
                        let column = self.ident(&mut tup)?;
                        field.column = Some(column);
                    }
                    "nullable" => {
                        self.check_unset(&field.nullable, keyword.span, "nullable")?;
                        field.nullable = Some(Spanned::new(true, keyword.span));
                    }
                    "updatable" => {
                        self.check_unset(&field.updatable, keyword.span, "updatable")?;
                        field.updatable = Some(Spanned::new(true, keyword.span));
                    }
                    "autoinsert" => {
                        self.check_unset(&field.auto_insert, keyword.span, "autoinsert")?;
                        field.auto_insert = Some(Spanned::new(true, keyword.span));
                    }
                    "autoupdate" => {
                        self.check_unset(&field.auto_update, keyword.span, "autoupdate")?;
                        field.auto_update = Some(Spanned::new(true, keyword.span));
                    }
                    "length" => {
                        self.check_unset(&field.length, keyword.span, "length")?;
                        let token = self.token(&mut tup, TokenKind::Int)?;
                        let value = token
                            .text
                            .parse::<i64>()
                            .map_err(|_| self.err(token.span, format!("invalid length `{}`", token.text)))?;
                        field.length = Some(Spanned::new(value, token.span));
                    }
                    "default" => {
                        self.check_unset(&field.default_value, keyword.span, "default")?;
                        field.default_value = Some(self.literal_value(&mut tup)?);
                    }
                    "sqldefault" => {
                        self.check_unset(&field.sql_default, keyword.span, "sqldefault")?;
                        field.sql_default = Some(self.literal_value(&mut tup)?);
                    }
                    kind @ ("setnull" | "cascade" | "restrict") => {
                        if field.relation.is_none() {
                            return Err(self.err(keyword.span, format!("`{kind}` is only valid on relation fields")));
                        }
                        self.check_unset(&field.relation_kind, keyword.span, "relation kind")?;
                        let value = match kind {
                            "setnull" => RelationKind::SetNull,
                            "cascade" => RelationKind::Cascade,
                            _ => RelationKind::Restrict,
                        };
                        field.relation_kind = Some(Spanned::new(value, keyword.span));
                    }
                    other => {
                        return Err(self.err(
                            keyword.span,
                            format!(
                                "expected one of {{column, nullable, updatable, autoinsert, autoupdate, length, \
                                 default, sqldefault, setnull, cascade, restrict}}; got `{other}`"
                            ),
                        ));
                    }
                }
                self.done(&mut tup)?;
            }
        }
        self.done(tup)?;
        Ok(field)
    }

    fn parse_index(&self, tup: &mut Tup, span: Span) -> LangResult<ast::Index> {
        let body = self.list(tup)?;
        self.done(tup)?;

        let mut index = ast::Index {
            span,
            name: None,
            fields: None,
            unique: None,
        };
        for tuple in &body.tuples {
            let mut tup = Tup::new(tuple);
            let keyword = self.ident(&mut tup)?;
            match keyword.value.as_str() {
                "name" => {
                    self.check_unset(&index.name, keyword.span, "name")?;
                    index.name = Some(self.ident(&mut tup)?);
                }
                "fields" => {
                    self.check_unset(&index.fields, keyword.span, "fields")?;
                    let names = self.ident_list(&mut tup, "fields")?;
                    index.fields = Some(Spanned::new(names, tuple.span));
                }
                "unique" => {
                    self.check_unset(&index.unique, keyword.span, "unique")?;
                    index.unique = Some(Spanned::new(true, keyword.span));
                }
                other => {
                    return Err(self.err(keyword.span, format!("expected one of {{name, fields, unique}}; got `{other}`")));
                }
            }
            self.done(&mut tup)?;
        }
        Ok(index)
    }

    // -- queries --

    fn parse_create(&self, tup: &mut Tup, span: Span) -> LangResult<ast::Create> {
        let model = self.ident(tup)?;
        let mut create = ast::Create {
            span,
            model,
            raw: None,
            suffix: None,
        };
        if let Some(body) = self.opt_list(tup) {
            for tuple in &body.tuples {
                let mut tup = Tup::new(tuple);
                let keyword = self.ident(&mut tup)?;
                match keyword.value.as_str() {
                    "raw" => {
                        self.check_unset(&create.raw, keyword.span, "raw")?;
                        create.raw = Some(Spanned::new(true, keyword.span));
                    }
                    "suffix" => {
                        self.check_unset(&create.suffix, keyword.span, "suffix")?;
                        let parts = self.ident_list(&mut tup, "suffix")?;
                        create.suffix = Some(Spanned::new(parts.into_iter().map(|p| p.value).collect(), tuple.span));
                    }
                    other => {
                        return Err(self.err(keyword.span, format!("expected one of {{raw, suffix}}; got `{other}`")));
                    }
                }
                self.done(&mut tup)?;
            }
        }
        self.done(tup)?;
        Ok(create)
    }

    fn parse_read(&self, tup: &mut Tup, span: Span) -> LangResult<ast::Read> {
        let mut read = ast::Read {
            span,
            views: Vec::new(),
            select: None,
            joins: Vec::new(),
            wheres: Vec::new(),
            order_by: None,
            group_by: None,
            suffix: None,
        };

        // View tokens are bare identifiers terminated by the body list.
        while tup.peek_token().is_some() {
            let view_ident = self.ident(tup)?;
            let Some(view) = View::from_keyword(&view_ident.value) else {
                return Err(self.err(
                    view_ident.span,
                    format!(
                        "expected one of {{all, paged, count, has, limitoffset, scalar, one, first}}; got `{}`",
                        view_ident.value
                    ),
                ));
            };
            if let Some(prev) = read.views.iter().find(|v| v.value == view) {
                return Err(self.previously_defined(view_ident.span, &format!("view {view}"), prev.span));
            }
            read.views.push(Spanned::new(view, view_ident.span));
        }

        let body = self.list(tup)?;
        self.done(tup)?;

        for tuple in &body.tuples {
            let mut tup = Tup::new(tuple);
            let keyword = self.ident(&mut tup)?;
            match keyword.value.as_str() {
                "select" => {
                    self.check_unset(&read.select, keyword.span, "select")?;
                    let mut refs = Vec::new();
                    while tup.peek().is_some() {
                        refs.push(self.field_ref(&mut tup)?);
                    }
                    if refs.is_empty() {
                        return Err(self.err(tuple.span, "select requires at least one model or field"));
                    }
                    read.select = Some(Spanned::new(refs, tuple.span));
                }
                "where" => read.wheres.push(self.parse_where(&mut tup, tuple.span)?),
                "join" => read.joins.push(self.parse_join(&mut tup, tuple.span)?),
                "orderby" => {
                    if let Some(prev) = &read.order_by {
                        return Err(self.previously_defined(keyword.span, "orderby", prev.span));
                    }
                    read.order_by = Some(self.parse_order_by(&mut tup, tuple.span)?);
                }
                "groupby" => {
                    self.check_unset(&read.group_by, keyword.span, "groupby")?;
                    let mut refs = Vec::new();
                    while tup.peek().is_some() {
                        refs.push(self.full_field_ref(&mut tup)?);
                    }
                    if refs.is_empty() {
                        return Err(self.err(tuple.span, "groupby requires at least one field"));
                    }
                    read.group_by = Some(Spanned::new(refs, tuple.span));
                }
                "suffix" => {
                    self.check_unset(&read.suffix, keyword.span, "suffix")?;
                    let parts = self.ident_list(&mut tup, "suffix")?;
                    read.suffix = Some(Spanned::new(parts.into_iter().map(|p| p.value).collect(), tuple.span));
                }
                other => {
                    return Err(self.err(
                        keyword.span,
                        format!("expected one of {{select, where, join, orderby, groupby, suffix}}; got `{other}`"),
                    ));
                }
            }
        }
        Ok(read)
    }

    fn parse_update(&self, tup: &mut Tup, span: Span) -> LangResult<ast::Update> {
        let (model, joins, wheres, suffix) = self.parse_write_body(tup)?;
        Ok(ast::Update {
            span,
            model,
            joins,
            wheres,
            suffix,
        })
    }

    fn parse_delete(&self, tup: &mut Tup, span: Span) -> LangResult<ast::Delete> {
        let (model, joins, wheres, suffix) = self.parse_write_body(tup)?;
        Ok(ast::Delete {
            span,
            model,
            joins,
            wheres,
            suffix,
        })
    }

    #[allow(clippy::type_complexity)]
    fn parse_write_body(
        &self,
        tup: &mut Tup,
    ) -> LangResult<(Spanned<String>, Vec<ast::Join>, Vec<ast::Where>, Option<Spanned<Vec<String>>>)> {
        let model = self.ident(tup)?;
        let body = self.list(tup)?;
        self.done(tup)?;

        let mut joins = Vec::new();
        let mut wheres = Vec::new();
        let mut suffix: Option<Spanned<Vec<String>>> = None;
        for tuple in &body.tuples {
            let mut tup = Tup::new(tuple);
            let keyword = self.ident(&mut tup)?;
            match keyword.value.as_str() {
                "where" => wheres.push(self.parse_where(&mut tup, tuple.span)?),
                "join" => joins.push(self.parse_join(&mut tup, tuple.span)?),
                "suffix" => {
                    self.check_unset(&suffix, keyword.span, "suffix")?;
                    let parts = self.ident_list(&mut tup, "suffix")?;
                    suffix = Some(Spanned::new(parts.into_iter().map(|p| p.value).collect(), tuple.span));
                }
                other => {
                    return Err(self.err(keyword.span, format!("expected one of {{where, join, suffix}}; got `{other}`")));
                }
            }
        }
        Ok((model, joins, wheres, suffix))
    }

    fn parse_join(&self, tup: &mut Tup, span: Span) -> LangResult<ast::Join> {
        let left = self.full_field_ref(tup)?;
        self.token(tup, TokenKind::Equal)?;
        let right = self.full_field_ref(tup)?;
        self.done(tup)?;
        Ok(ast::Join { span, left, right })
    }

    fn parse_order_by(&self, tup: &mut Tup, span: Span) -> LangResult<ast::OrderBy> {
        let direction = self.ident(tup)?;
        let descending = match direction.value.as_str() {
            "asc" => false,
            "desc" => true,
            other => {
                return Err(self.err(direction.span, format!("expected one of {{asc, desc}}; got `{other}`")));
            }
        };
        let mut fields = Vec::new();
        while tup.peek().is_some() {
            fields.push(self.full_field_ref(tup)?);
        }
        if fields.is_empty() {
            return Err(self.err(span, "orderby requires at least one field"));
        }
        Ok(ast::OrderBy {
            span,
            descending,
            fields,
        })
    }

    fn parse_where(&self, tup: &mut Tup, span: Span) -> LangResult<ast::Where> {
        let left = self.parse_expr(tup)?;
        let op = self.parse_operator(tup)?;
        let right = self.parse_expr(tup)?;
        self.done(tup)?;
        Ok(ast::Where { span, left, op, right })
    }

    fn parse_operator(&self, tup: &mut Tup) -> LangResult<Spanned<Operator>> {
        let here = tup.here();
        let Some(token) = tup.peek_token() else {
            return Err(self.err(here, "expected an operator"));
        };
        let start = token.span;
        tup.pos += 1;
        let (op, span) = match token.kind {
            TokenKind::Equal => (Operator::Eq, start),
            TokenKind::Bang => {
                let eq = self.token(tup, TokenKind::Equal)?;
                (Operator::Ne, start.merge(&eq.span))
            }
            TokenKind::LAngle => match tup.peek_token().map(|t| t.kind) {
                Some(TokenKind::Equal) => {
                    let eq = self.token(tup, TokenKind::Equal)?;
                    (Operator::Le, start.merge(&eq.span))
                }
                _ => (Operator::Lt, start),
            },
            TokenKind::RAngle => match tup.peek_token().map(|t| t.kind) {
                Some(TokenKind::Equal) => {
                    let eq = self.token(tup, TokenKind::Equal)?;
                    (Operator::Ge, start.merge(&eq.span))
                }
                _ => (Operator::Gt, start),
            },
            TokenKind::Ident if token.text.eq_ignore_ascii_case("like") => (Operator::Like, start),
            _ => return Err(self.err(start, format!("expected an operator; got {}", token.kind))),
        };
        Ok(Spanned::new(op, span))
    }

    fn parse_expr(&self, tup: &mut Tup) -> LangResult<Expr> {
        let here = tup.here();
        match tup.peek() {
            Some(Node::Token(token)) => match token.kind {
                TokenKind::Question => {
                    tup.pos += 1;
                    Ok(Expr {
                        span: token.span,
                        kind: ExprKind::Placeholder,
                    })
                }
                TokenKind::String => {
                    tup.pos += 1;
                    Ok(Expr {
                        span: token.span,
                        kind: ExprKind::StringLit(token.text.clone()),
                    })
                }
                TokenKind::Int | TokenKind::Float => {
                    tup.pos += 1;
                    Ok(Expr {
                        span: token.span,
                        kind: ExprKind::NumberLit(token.text.clone()),
                    })
                }
                TokenKind::Ident => match token.text.to_lowercase().as_str() {
                    "null" => {
                        tup.pos += 1;
                        Ok(Expr {
                            span: token.span,
                            kind: ExprKind::Null,
                        })
                    }
                    "true" | "false" => {
                        let value = token.text.eq_ignore_ascii_case("true");
                        tup.pos += 1;
                        Ok(Expr {
                            span: token.span,
                            kind: ExprKind::BoolLit(value),
                        })
                    }
                    _ => self.parse_ref_or_call(tup),
                },
                _ => Err(self.err(token.span, format!("expected an expression; got {}", token.kind))),
            },
            Some(Node::List(list)) => Err(self.err(list.span, "expected an expression; got (")),
            None => Err(self.err(here, "expected an expression")),
        }
    }

    fn parse_ref_or_call(&self, tup: &mut Tup) -> LangResult<Expr> {
        let name = self.ident(tup)?;
        match tup.peek() {
            Some(Node::List(args)) => {
                tup.pos += 1;
                // The only function currently accepted is lower/1.
                if name.value != "lower" {
                    return Err(self.err(name.span, format!("unknown function `{}`", name.value)));
                }
                let mut parsed = Vec::new();
                for arg in &args.tuples {
                    let mut arg_tup = Tup::new(arg);
                    let expr = self.parse_expr(&mut arg_tup)?;
                    self.done(&mut arg_tup)?;
                    parsed.push(expr);
                }
                if parsed.len() != 1 {
                    return Err(self.err(args.span, "lower takes exactly one argument"));
                }
                Ok(Expr {
                    span: name.span.merge(&args.span),
                    kind: ExprKind::FuncCall {
                        name: name.value,
                        args: parsed,
                    },
                })
            }
            _ => {
                let mut span = name.span;
                let mut field = None;
                if tup.peek_token().map(|t| t.kind) == Some(TokenKind::Dot) {
                    tup.pos += 1;
                    let f = self.ident(tup)?;
                    span = span.merge(&f.span);
                    field = Some(f.value);
                }
                if field.is_none() {
                    return Err(self.err(name.span, format!("expected model.field reference; got `{}`", name.value)));
                }
                Ok(Expr {
                    span,
                    kind: ExprKind::FieldRef(FieldRef {
                        span,
                        model: name.value,
                        field,
                    }),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn parse_src(src: &str) -> LangResult<ast::Root> {
        let meta = SourceMetadata {
            file_name: "test.rel",
            contents: src,
        };
        parse(&meta)
    }

    #[test]
    fn test_parse_model_basic() {
        let src = indoc! {r#"
            model user (
                key id
                field id serial ( autoinsert )
                field email text
            )
        "#};
        let root = parse_src(src).unwrap();
        assert_eq!(root.models.len(), 1);
        let model = &root.models[0];
        assert_eq!(model.name.value, "user");
        assert_eq!(model.fields.len(), 2);
        assert_eq!(model.fields[0].name.value, "id");
        assert_eq!(model.fields[0].field_type.as_ref().unwrap().value, FieldType::Serial);
        assert!(ast::get(&model.fields[0].auto_insert));
        assert_eq!(model.fields[1].name.value, "email");
        let key = model.primary_key.as_ref().unwrap();
        assert_eq!(key.value.len(), 1);
        assert_eq!(key.value[0].value, "id");
    }

    #[test]
    fn test_parse_relation_field() {
        let src = indoc! {r#"
            model post (
                key id
                field id serial
                field author user.id ( setnull, nullable )
            )
        "#};
        let root = parse_src(src).unwrap();
        let field = &root.models[0].fields[1];
        let relation = field.relation.as_ref().unwrap();
        assert_eq!(relation.model, "user");
        assert_eq!(relation.field.as_deref(), Some("id"));
        assert_eq!(ast::get(&field.relation_kind), RelationKind::SetNull);
        assert!(ast::get(&field.nullable));
    }

    #[test]
    fn test_parse_duplicate_attribute() {
        let src = indoc! {r#"
            model user (
                key id
                field id serial ( nullable, nullable )
            )
        "#};
        let err = parse_src(src).unwrap_err();
        assert!(err.message.contains("previously defined"), "{}", err.message);
    }

    #[test]
    fn test_parse_read_with_views_and_where() {
        let src = indoc! {r#"
            read all count (
                select user
                where user.id = ?
            )
        "#};
        let root = parse_src(src).unwrap();
        let read = &root.reads[0];
        let views: Vec<View> = read.views.iter().map(|v| v.value).collect();
        assert_eq!(views, vec![View::All, View::Count]);
        let select = read.select.as_ref().unwrap();
        assert_eq!(select.value[0].model, "user");
        assert_eq!(select.value[0].field, None);
        assert_eq!(read.wheres.len(), 1);
        let w = &read.wheres[0];
        assert_eq!(w.op.value, Operator::Eq);
        assert!(matches!(w.right.kind, ExprKind::Placeholder));
        match &w.left.kind {
            ExprKind::FieldRef(fr) => {
                assert_eq!(fr.model, "user");
                assert_eq!(fr.field.as_deref(), Some("id"));
            }
            other => panic!("expected field ref, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_two_token_operators() {
        let src = "read all ( select user, where user.age >= ? )";
        let root = parse_src(src).unwrap();
        assert_eq!(root.reads[0].wheres[0].op.value, Operator::Ge);
    }

    #[test]
    fn test_parse_func_call() {
        let src = "read all ( select user, where lower(user.email) = ? )";
        let root = parse_src(src).unwrap();
        match &root.reads[0].wheres[0].left.kind {
            ExprKind::FuncCall { name, args } => {
                assert_eq!(name, "lower");
                assert_eq!(args.len(), 1);
            }
            other => panic!("expected func call, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_unknown_func_rejected() {
        let src = "read all ( select user, where upper(user.email) = ? )";
        let err = parse_src(src).unwrap_err();
        assert!(err.message.contains("unknown function"), "{}", err.message);
    }

    #[test]
    fn test_parse_unknown_keyword() {
        let err = parse_src("frobnicate user ( )").unwrap_err();
        assert!(err.message.contains("expected one of"), "{}", err.message);
    }

    #[test]
    fn test_parse_update_and_delete() {
        let src = indoc! {r#"
            update user ( where user.id = ? )
            delete user ( where user.id = ? )
        "#};
        let root = parse_src(src).unwrap();
        assert_eq!(root.updates.len(), 1);
        assert_eq!(root.deletes.len(), 1);
        assert_eq!(root.updates[0].model.value, "user");
        assert_eq!(root.deletes[0].wheres.len(), 1);
    }

    #[test]
    fn test_parse_index_block() {
        let src = indoc! {r#"
            model user (
                key id
                field id serial
                field email text
                index ( name email_idx, fields email, unique )
            )
        "#};
        let root = parse_src(src).unwrap();
        let index = &root.models[0].indexes[0];
        assert_eq!(index.name.as_ref().unwrap().value, "email_idx");
        assert_eq!(index.fields.as_ref().unwrap().value[0].value, "email");
        assert!(ast::get(&index.unique));
    }

    #[test]
    fn test_parse_names_lowercased() {
        let root = parse_src("model User ( key Id\n field Id serial )").unwrap();
        assert_eq!(root.models[0].name.value, "user");
        assert_eq!(root.models[0].fields[0].name.value, "id");
    }
}
