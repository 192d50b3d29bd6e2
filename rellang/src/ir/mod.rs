//! The resolved intermediate representation.
//!
//! Models and fields live in arenas owned by [`Root`] and reference each other
//! through [`ModelId`]/[`FieldId`] indices, so cyclic relations between models
//! need no shared ownership. The transformer builds the arenas in two passes
//! (declare, then resolve) and the result is immutable afterwards.

use crate::lexer::Span;

pub use crate::parser::ast::{FieldType, Operator, RelationKind, View};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModelId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldId(pub(crate) usize);

#[derive(Debug, Default)]
pub struct Root {
    pub(crate) models: Vec<Model>,
    pub(crate) fields: Vec<Field>,
    pub creates: Vec<Create>,
    pub reads: Vec<Read>,
    pub updates: Vec<Update>,
    pub deletes: Vec<Delete>,
}

impl Root {
    pub fn model(&self, id: ModelId) -> &Model {
        &self.models[id.0]
    }

    pub fn field(&self, id: FieldId) -> &Field {
        &self.fields[id.0]
    }

    pub fn models(&self) -> impl Iterator<Item = (ModelId, &Model)> {
        self.models.iter().enumerate().map(|(i, m)| (ModelId(i), m))
    }

    /// The `table.column` form used everywhere in generated SQL.
    pub fn column_ref(&self, id: FieldId) -> String {
        let field = self.field(id);
        format!("{}.{}", self.model(field.model).table, field.column)
    }

    /// Columns written by an INSERT. Serial columns are generated by the
    /// database and excluded unless the insert is raw.
    pub fn insertable_fields(&self, model: ModelId, raw: bool) -> Vec<FieldId> {
        self.model(model)
            .fields
            .iter()
            .copied()
            .filter(|&id| raw || !self.field(id).field_type.is_serial())
            .collect()
    }

    pub fn updatable_fields(&self, model: ModelId) -> Vec<FieldId> {
        self.model(model)
            .fields
            .iter()
            .copied()
            .filter(|&id| self.field(id).updatable)
            .collect()
    }

    /// Whether pinning `pinned` to constants guarantees at most one row of
    /// `model`: the pinned set must cover the whole primary key or a whole
    /// declared unique tuple.
    pub fn pins_unique(&self, model: ModelId, pinned: &[FieldId]) -> bool {
        let model = self.model(model);
        let covers = |tuple: &[FieldId]| !tuple.is_empty() && tuple.iter().all(|id| pinned.contains(id));
        covers(&model.primary_key) || model.unique.iter().any(|tuple| covers(tuple))
    }
}

#[derive(Debug)]
pub struct Model {
    pub name: String,
    pub table: String,
    pub fields: Vec<FieldId>,
    pub primary_key: Vec<FieldId>,
    pub unique: Vec<Vec<FieldId>>,
    pub indexes: Vec<Index>,
}

#[derive(Debug)]
pub struct Index {
    pub name: String,
    pub fields: Vec<FieldId>,
    pub unique: bool,
}

#[derive(Debug)]
pub struct Field {
    pub model: ModelId,
    pub name: String,
    pub column: String,
    pub field_type: FieldType,
    pub relation: Option<Relation>,
    pub nullable: bool,
    pub updatable: bool,
    pub auto_insert: bool,
    pub auto_update: bool,
    pub length: Option<i64>,
    pub default_value: Option<String>,
    pub sql_default: Option<String>,
}

#[derive(Debug)]
pub struct Relation {
    pub field: FieldId,
    pub kind: RelationKind,
}

/// A selected output item of a read: a whole model's columns or one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selectable {
    Model(ModelId),
    Field(FieldId),
}

impl Selectable {
    pub fn model_of(self, root: &Root) -> ModelId {
        match self {
            Selectable::Model(id) => id,
            Selectable::Field(id) => root.field(id).model,
        }
    }

    /// The fields this selectable expands to, in declaration order.
    pub fn field_refs(self, root: &Root) -> Vec<FieldId> {
        match self {
            Selectable::Model(id) => root.model(id).fields.clone(),
            Selectable::Field(id) => vec![id],
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Null,
    Placeholder,
    String(String),
    Number(String),
    Bool(bool),
    Field(FieldId),
    Lower(Box<Expr>),
}

impl Expr {
    pub fn has_placeholder(&self) -> bool {
        match self {
            Expr::Placeholder => true,
            Expr::Lower(inner) => inner.has_placeholder(),
            _ => false,
        }
    }

    pub fn nullable(&self, root: &Root) -> bool {
        match self {
            Expr::Null => true,
            Expr::Field(id) => root.field(*id).nullable,
            Expr::Lower(inner) => inner.nullable(root),
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Where {
    pub left: Expr,
    pub op: Operator,
    pub right: Expr,
}

#[derive(Debug, Clone, Copy)]
pub struct Join {
    pub left: FieldId,
    pub right: FieldId,
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub descending: bool,
    pub fields: Vec<FieldId>,
}

#[derive(Debug)]
pub struct Read {
    pub span: Span,
    pub suffix: Vec<String>,
    pub selectables: Vec<Selectable>,
    pub from: ModelId,
    pub joins: Vec<Join>,
    pub wheres: Vec<Where>,
    pub order_by: Option<OrderBy>,
    pub group_by: Vec<FieldId>,
    pub view: View,
    /// Proven by uniqueness analysis to return at most one row.
    pub unique: bool,
}

impl Read {
    pub fn signature(&self) -> String {
        format!("read.{}.{}", self.suffix.join("_"), self.view)
    }
}

#[derive(Debug)]
pub struct Create {
    pub span: Span,
    pub model: ModelId,
    pub raw: bool,
    pub suffix: Vec<String>,
}

impl Create {
    pub fn signature(&self) -> String {
        format!("create.{}", self.suffix.join("_"))
    }
}

#[derive(Debug)]
pub struct Update {
    pub span: Span,
    pub model: ModelId,
    pub joins: Vec<Join>,
    pub wheres: Vec<Where>,
    pub suffix: Vec<String>,
}

impl Update {
    pub fn signature(&self) -> String {
        format!("update.{}", self.suffix.join("_"))
    }
}

#[derive(Debug)]
pub struct Delete {
    pub span: Span,
    pub model: ModelId,
    pub joins: Vec<Join>,
    pub wheres: Vec<Where>,
    pub suffix: Vec<String>,
}

impl Delete {
    pub fn signature(&self) -> String {
        format!("delete.{}", self.suffix.join("_"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_with_field(nullable: bool) -> Root {
        let mut root = Root::default();
        root.models.push(Model {
            name: "user".to_string(),
            table: "users".to_string(),
            fields: vec![FieldId(0)],
            primary_key: vec![FieldId(0)],
            unique: Vec::new(),
            indexes: Vec::new(),
        });
        root.fields.push(Field {
            model: ModelId(0),
            name: "id".to_string(),
            column: "id".to_string(),
            field_type: FieldType::Serial,
            relation: None,
            nullable,
            updatable: false,
            auto_insert: false,
            auto_update: false,
            length: None,
            default_value: None,
            sql_default: None,
        });
        root
    }

    #[test]
    fn test_expr_has_placeholder() {
        assert!(Expr::Placeholder.has_placeholder());
        assert!(Expr::Lower(Box::new(Expr::Placeholder)).has_placeholder());
        assert!(!Expr::Field(FieldId(0)).has_placeholder());
    }

    #[test]
    fn test_expr_nullable_follows_field() {
        let root = root_with_field(true);
        assert!(Expr::Field(FieldId(0)).nullable(&root));
        assert!(Expr::Lower(Box::new(Expr::Field(FieldId(0)))).nullable(&root));
        assert!(Expr::Null.nullable(&root));
        assert!(!Expr::Placeholder.nullable(&root));
        let root = root_with_field(false);
        assert!(!Expr::Field(FieldId(0)).nullable(&root));
    }

    #[test]
    fn test_pins_unique_requires_full_cover() {
        let root = root_with_field(false);
        assert!(root.pins_unique(ModelId(0), &[FieldId(0)]));
        assert!(!root.pins_unique(ModelId(0), &[]));
    }

    #[test]
    fn test_column_ref() {
        let root = root_with_field(false);
        assert_eq!(root.column_ref(FieldId(0)), "users.id");
    }
}
