//! A small algebra of SQL fragments.
//!
//! Statements are built as trees of [`Sql`] nodes, folded into a normal form
//! by [`compile`], and rendered to text. [`Hole`] and [`Condition`] are shared
//! handles whose contents can change after the tree is built, which is how the
//! one runtime-dynamic piece of SQL (an UPDATE's SET list) and nullable
//! equality arguments are expressed.

mod compile;
mod equal;

use std::{cell::RefCell, rc::Rc};

use crate::dialect::Dialect;

pub use compile::compile;
pub use equal::equal;

#[derive(Debug, Clone)]
pub enum Sql {
    Literal(String),
    Literals(Literals),
    Hole(Hole),
    Condition(Condition),
}

#[derive(Debug, Clone)]
pub struct Literals {
    pub join: String,
    pub sqls: Vec<Sql>,
}

impl Sql {
    pub fn literal(text: impl Into<String>) -> Sql {
        Sql::Literal(text.into())
    }

    pub fn literals(join: impl Into<String>, sqls: Vec<Sql>) -> Sql {
        Sql::Literals(Literals {
            join: join.into(),
            sqls,
        })
    }

    /// Structural render; no whitespace normalization or placeholder rebind.
    pub fn render(&self) -> String {
        match self {
            Sql::Literal(text) => text.clone(),
            Sql::Literals(literals) => literals
                .sqls
                .iter()
                .map(Sql::render)
                .collect::<Vec<_>>()
                .join(&literals.join),
            Sql::Hole(hole) => hole.render(),
            Sql::Condition(condition) => condition.render(),
        }
    }
}

#[derive(Debug)]
struct HoleInner {
    name: String,
    filled: Option<Sql>,
}

/// A fill-in-later placeholder. Clones share the same slot, so filling any
/// clone fills them all; equality is handle identity, never content.
#[derive(Debug, Clone)]
pub struct Hole(Rc<RefCell<HoleInner>>);

impl Hole {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(HoleInner {
            name: name.into(),
            filled: None,
        })))
    }

    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    pub fn fill(&self, sql: Sql) {
        self.0.borrow_mut().filled = Some(sql);
    }

    fn render(&self) -> String {
        self.0.borrow().filled.as_ref().map(Sql::render).unwrap_or_default()
    }

    pub(crate) fn same(&self, other: &Hole) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

#[derive(Debug)]
struct ConditionInner {
    name: String,
    field: String,
    equal: bool,
    null: bool,
}

/// A toggleable comparison: `<field> = ?`, `!= ?`, `is null`, `is not null`.
/// Like [`Hole`], clones share state and compare by identity.
#[derive(Debug, Clone)]
pub struct Condition(Rc<RefCell<ConditionInner>>);

impl Condition {
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(ConditionInner {
            name: name.into(),
            field: field.into(),
            equal: true,
            null: false,
        })))
    }

    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    pub fn set_equal(&self, equal: bool) {
        self.0.borrow_mut().equal = equal;
    }

    pub fn set_null(&self, null: bool) {
        self.0.borrow_mut().null = null;
    }

    fn render(&self) -> String {
        let inner = self.0.borrow();
        let op = match (inner.equal, inner.null) {
            (true, false) => "= ?",
            (false, false) => "!= ?",
            (true, true) => "is null",
            (false, true) => "is not null",
        };
        if inner.field.is_empty() {
            op.to_string()
        } else {
            format!("{} {}", inner.field, op)
        }
    }

    pub(crate) fn same(&self, other: &Condition) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// Final, dialect-aware render of a whole statement: whitespace is flattened,
/// a terminating `;` is appended, and placeholders are rebound to the
/// dialect's native syntax.
pub fn render_statement(sql: &Sql, dialect: &dyn Dialect) -> String {
    let flattened = flatten(&sql.render());
    dialect.rebind(&format!("{flattened};"))
}

/// Collapses every run of whitespace to a single space and trims the ends.
fn flatten(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{Postgres, Sqlite3};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_literals() {
        let sql = Sql::literals(" ", vec![Sql::literal("SELECT 1"), Sql::literal("FROM users")]);
        assert_eq!(sql.render(), "SELECT 1 FROM users");
    }

    #[test]
    fn test_hole_renders_empty_until_filled() {
        let hole = Hole::new("sets");
        assert_eq!(hole.name(), "sets");
        let sql = Sql::literals(" ", vec![Sql::literal("UPDATE users SET"), Sql::Hole(hole.clone())]);
        assert_eq!(sql.render(), "UPDATE users SET ");
        hole.fill(Sql::literal("name = ?"));
        assert_eq!(sql.render(), "UPDATE users SET name = ?");
    }

    #[test]
    fn test_condition_forms() {
        let cond = Condition::new("name", "users.name");
        assert_eq!(cond.name(), "name");
        assert_eq!(cond.render(), "users.name = ?");
        cond.set_equal(false);
        assert_eq!(cond.render(), "users.name != ?");
        cond.set_null(true);
        assert_eq!(cond.render(), "users.name is not null");
        cond.set_equal(true);
        assert_eq!(cond.render(), "users.name is null");
    }

    #[test]
    fn test_render_statement_flattens_and_terminates() {
        let sql = Sql::literal("SELECT  1\n\tFROM users ");
        assert_eq!(render_statement(&sql, &Sqlite3), "SELECT 1 FROM users;");
    }

    #[test]
    fn test_render_statement_rebinds() {
        let sql = Sql::literal("SELECT * FROM users WHERE id = ? AND age > ?");
        assert_eq!(
            render_statement(&sql, &Postgres),
            "SELECT * FROM users WHERE id = $1 AND age > $2;"
        );
    }
}
