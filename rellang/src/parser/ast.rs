use core::fmt;

use crate::lexer::Span;

/// A value paired with the source span it was written at. Optional attributes
/// are `Option<Spanned<T>>` so "unset" stays distinguishable from "set to the
/// zero value", which is what duplicate-attribute detection needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
}

/// Reads an optional attribute, defaulting to the type's zero value.
pub fn get<T: Default + Clone>(opt: &Option<Spanned<T>>) -> T {
    opt.as_ref().map(|s| s.value.clone()).unwrap_or_default()
}

#[derive(Debug, Default)]
pub struct Root {
    pub models: Vec<Model>,
    pub creates: Vec<Create>,
    pub reads: Vec<Read>,
    pub updates: Vec<Update>,
    pub deletes: Vec<Delete>,
}

#[derive(Debug)]
pub struct Model {
    pub span: Span,
    pub name: Spanned<String>,
    pub table: Option<Spanned<String>>,
    pub fields: Vec<Field>,
    pub primary_key: Option<Spanned<Vec<Spanned<String>>>>,
    pub unique: Vec<Spanned<Vec<Spanned<String>>>>,
    pub indexes: Vec<Index>,
}

#[derive(Debug)]
pub struct Index {
    pub span: Span,
    pub name: Option<Spanned<String>>,
    pub fields: Option<Spanned<Vec<Spanned<String>>>>,
    pub unique: Option<Spanned<bool>>,
}

#[derive(Debug)]
pub struct Field {
    pub span: Span,
    pub name: Spanned<String>,
    pub column: Option<Spanned<String>>,
    /// Exactly one of `field_type` and `relation` is set; the grammar slot is
    /// shared and the transformer resolves relations into concrete types.
    pub field_type: Option<Spanned<FieldType>>,
    pub relation: Option<FieldRef>,
    pub relation_kind: Option<Spanned<RelationKind>>,
    pub nullable: Option<Spanned<bool>>,
    pub updatable: Option<Spanned<bool>>,
    pub auto_insert: Option<Spanned<bool>>,
    pub auto_update: Option<Spanned<bool>>,
    pub length: Option<Spanned<i64>>,
    /// Code-level default supplied by the accessor layer.
    pub default_value: Option<Spanned<String>>,
    /// Default emitted into the column DDL.
    pub sql_default: Option<Spanned<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Serial,
    Serial64,
    Int,
    Int64,
    Uint,
    Uint64,
    Bool,
    Text,
    Timestamp,
    Utimestamp,
    Float,
    Float64,
    Blob,
    Date,
}

impl FieldType {
    pub fn from_keyword(keyword: &str) -> Option<FieldType> {
        Some(match keyword {
            "serial" => FieldType::Serial,
            "serial64" => FieldType::Serial64,
            "int" => FieldType::Int,
            "int64" => FieldType::Int64,
            "uint" => FieldType::Uint,
            "uint64" => FieldType::Uint64,
            "bool" => FieldType::Bool,
            "text" => FieldType::Text,
            "timestamp" => FieldType::Timestamp,
            "utimestamp" => FieldType::Utimestamp,
            "float" => FieldType::Float,
            "float64" => FieldType::Float64,
            "blob" => FieldType::Blob,
            "date" => FieldType::Date,
            _ => return None,
        })
    }

    /// The type a field takes when it links to a field of this type through a
    /// relation: serial types demote to their plain integer equivalents.
    pub fn as_link(self) -> FieldType {
        match self {
            FieldType::Serial => FieldType::Int,
            FieldType::Serial64 => FieldType::Int64,
            other => other,
        }
    }

    pub fn is_serial(self) -> bool {
        matches!(self, FieldType::Serial | FieldType::Serial64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelationKind {
    #[default]
    Restrict,
    Cascade,
    SetNull,
}

/// A `model` or `model.field` reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRef {
    pub span: Span,
    pub model: String,
    pub field: Option<String>,
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}.{}", self.model, field),
            None => write!(f, "{}", self.model),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum View {
    All,
    LimitOffset,
    Paged,
    Count,
    Has,
    Scalar,
    One,
    First,
}

impl View {
    pub fn from_keyword(keyword: &str) -> Option<View> {
        Some(match keyword {
            "all" => View::All,
            "limitoffset" => View::LimitOffset,
            "paged" => View::Paged,
            "count" => View::Count,
            "has" => View::Has,
            "scalar" => View::Scalar,
            "one" => View::One,
            "first" => View::First,
            _ => return None,
        })
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            View::All => "all",
            View::LimitOffset => "limitoffset",
            View::Paged => "paged",
            View::Count => "count",
            View::Has => "has",
            View::Scalar => "scalar",
            View::One => "one",
            View::First => "first",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
}

impl Operator {
    /// The suffix fragment this operator contributes to a defaulted query
    /// name; equality contributes nothing.
    pub fn suffix(self) -> Option<&'static str> {
        match self {
            Operator::Eq => None,
            Operator::Ne => Some("not"),
            Operator::Lt => Some("less"),
            Operator::Le => Some("less_or_equal"),
            Operator::Gt => Some("greater"),
            Operator::Ge => Some("greater_or_equal"),
            Operator::Like => Some("like"),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
        };
        write!(f, "{op}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Null,
    Placeholder,
    StringLit(String),
    NumberLit(String),
    BoolLit(bool),
    FieldRef(FieldRef),
    FuncCall { name: String, args: Vec<Expr> },
}

#[derive(Debug, Clone)]
pub struct Where {
    pub span: Span,
    pub left: Expr,
    pub op: Spanned<Operator>,
    pub right: Expr,
}

#[derive(Debug, Clone)]
pub struct Join {
    pub span: Span,
    pub left: FieldRef,
    pub right: FieldRef,
}

#[derive(Debug)]
pub struct OrderBy {
    pub span: Span,
    pub descending: bool,
    pub fields: Vec<FieldRef>,
}

#[derive(Debug)]
pub struct Read {
    pub span: Span,
    pub views: Vec<Spanned<View>>,
    pub select: Option<Spanned<Vec<FieldRef>>>,
    pub joins: Vec<Join>,
    pub wheres: Vec<Where>,
    pub order_by: Option<OrderBy>,
    pub group_by: Option<Spanned<Vec<FieldRef>>>,
    pub suffix: Option<Spanned<Vec<String>>>,
}

#[derive(Debug)]
pub struct Create {
    pub span: Span,
    pub model: Spanned<String>,
    pub raw: Option<Spanned<bool>>,
    pub suffix: Option<Spanned<Vec<String>>>,
}

#[derive(Debug)]
pub struct Update {
    pub span: Span,
    pub model: Spanned<String>,
    pub joins: Vec<Join>,
    pub wheres: Vec<Where>,
    pub suffix: Option<Spanned<Vec<String>>>,
}

#[derive(Debug)]
pub struct Delete {
    pub span: Span,
    pub model: Spanned<String>,
    pub joins: Vec<Join>,
    pub wheres: Vec<Where>,
    pub suffix: Option<Spanned<Vec<String>>>,
}
