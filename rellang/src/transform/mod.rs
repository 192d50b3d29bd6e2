//! Links the AST into the IR: resolves cross-references, applies defaults,
//! validates invariants, and expands each `read` into one IR read per view.

mod lookup;
mod models;
mod queries;

use std::collections::HashMap;

use crate::{
    diagnostics::{LangError, LangResult},
    ir,
    lexer::Span,
    metadata::SourceMetadata,
    parser::ast,
};

use lookup::Lookup;

/// Pure function from AST to IR; no state survives the call.
pub fn transform(ast: &ast::Root, meta: &SourceMetadata) -> LangResult<ir::Root> {
    let mut xform = Transformer {
        meta,
        lookup: Lookup::default(),
        root: ir::Root::default(),
        signatures: HashMap::new(),
    };
    xform.declare_models(ast)?;
    xform.resolve_models(ast)?;
    log::debug!("resolved {} models", xform.root.models.len());
    xform.resolve_queries(ast)?;
    log::debug!(
        "expanded queries: {} creates, {} reads, {} updates, {} deletes",
        xform.root.creates.len(),
        xform.root.reads.len(),
        xform.root.updates.len(),
        xform.root.deletes.len()
    );
    Ok(xform.root)
}

struct Transformer<'a> {
    meta: &'a SourceMetadata<'a>,
    lookup: Lookup,
    root: ir::Root,
    /// Query signature -> span of the declaration that produced it.
    signatures: HashMap<String, Span>,
}

impl Transformer<'_> {
    fn err(&self, span: Span, message: impl Into<String>) -> Box<LangError> {
        Box::new(LangError::error(
            self.meta.file_name,
            self.meta.contents,
            span,
            message,
            None::<String>,
            Some("ESemantic"),
        ))
    }

    fn err_related(&self, span: Span, message: impl Into<String>, prev: Span, label: impl Into<String>) -> Box<LangError> {
        Box::new(
            LangError::error(
                self.meta.file_name,
                self.meta.contents,
                span,
                message,
                None::<String>,
                Some("ESemantic"),
            )
            .with_related(prev, label),
        )
    }

    /// Records a query signature, rejecting a second declaration that
    /// produces the same one.
    fn claim_signature(&mut self, kind: &str, signature: String, span: Span) -> LangResult {
        if let Some(&prev) = self.signatures.get(&signature) {
            return Err(self.err_related(
                span,
                format!("duplicate {kind} previously defined at line {}", prev.lines.0),
                prev,
                format!("{kind} first defined here"),
            ));
        }
        self.signatures.insert(signature, span);
        Ok(())
    }
}

/// Default table name for a model.
fn pluralize(name: &str) -> String {
    if name.ends_with('s') || name.ends_with('x') || name.ends_with('z') || name.ends_with("ch") || name.ends_with("sh") {
        format!("{name}es")
    } else if name.ends_with('y') && !name.ends_with("ay") && !name.ends_with("ey") && !name.ends_with("oy") && !name.ends_with("uy") {
        format!("{}ies", &name[..name.len() - 1])
    } else {
        format!("{name}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ir::{FieldType, View},
        parser,
    };
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn compile(src: &str) -> LangResult<ir::Root> {
        let meta = SourceMetadata {
            file_name: "test.rel",
            contents: src,
        };
        let ast = parser::parse(&meta)?;
        transform(&ast, &meta)
    }

    #[test]
    fn test_model_defaults() {
        let root = compile(indoc! {r#"
            model user (
                field id serial ( autoinsert )
                key id
            )
        "#})
        .unwrap();
        let (id, model) = root.models().next().unwrap();
        assert_eq!(model.name, "user");
        assert_eq!(model.table, "users");
        assert_eq!(model.primary_key.len(), 1);
        let pk = root.field(model.primary_key[0]);
        assert_eq!(pk.name, "id");
        assert!(pk.auto_insert);
        assert_eq!(pk.field_type, FieldType::Serial);
        assert!(pk.relation.is_none());
        assert_eq!(pk.model, id);
    }

    #[test]
    fn test_primary_key_invariant() {
        let root = compile(indoc! {r#"
            model user (
                field id serial
                field name text ( updatable )
                key id
            )
        "#})
        .unwrap();
        for (_, model) in root.models() {
            assert!(!model.primary_key.is_empty());
            for &fid in &model.primary_key {
                assert!(!root.field(fid).nullable);
                assert!(!root.field(fid).updatable);
            }
        }
    }

    #[test]
    fn test_missing_primary_key() {
        let err = compile("model user ( field id serial )").unwrap_err();
        assert!(err.message.contains("no primary key"), "{}", err.message);
    }

    #[test]
    fn test_nullable_primary_key_rejected() {
        let err = compile(indoc! {r#"
            model user (
                field id int ( nullable )
                key id
            )
        "#})
        .unwrap_err();
        assert!(err.message.contains("cannot be nullable"), "{}", err.message);
    }

    #[test]
    fn test_relation_link_type() {
        let root = compile(indoc! {r#"
            model post (
                field id serial
                field author user.id
                key id
            )
            model user (
                field id serial
                key id
            )
        "#})
        .unwrap();
        let post = root.models().find(|(_, m)| m.name == "post").unwrap().1;
        let author = root.field(post.fields[1]);
        // Serial demotes to a plain integer through the link.
        assert_eq!(author.field_type, FieldType::Int);
        let relation = author.relation.as_ref().unwrap();
        assert_eq!(root.field(relation.field).name, "id");
    }

    #[test]
    fn test_setnull_requires_nullable() {
        let err = compile(indoc! {r#"
            model user (
                field id serial
                key id
            )
            model post (
                field id serial
                field author user.id ( setnull )
                key id
            )
        "#})
        .unwrap_err();
        assert_eq!(err.message, "setnull relationships must be nullable");
    }

    #[test]
    fn test_default_read_suffix() {
        let root = compile(indoc! {r#"
            model user (
                field id serial
                key id
            )
            read all (
                select user
                where user.id = ?
            )
        "#})
        .unwrap();
        assert_eq!(root.reads.len(), 1);
        assert_eq!(root.reads[0].suffix, vec!["user", "by", "id"]);
        assert!(root.reads[0].unique);
    }

    #[test]
    fn test_operator_suffix() {
        let root = compile(indoc! {r#"
            model user (
                field id serial
                field age int
                key id
            )
            read all (
                select user
                where user.age >= ?
            )
        "#})
        .unwrap();
        assert_eq!(root.reads[0].suffix, vec!["users", "by", "age_greater_or_equal"]);
        assert!(!root.reads[0].unique);
    }

    #[test]
    fn test_default_suffix_plurality_follows_uniqueness() {
        let root = compile(indoc! {r#"
            model user (
                field id serial
                field name text
                key id
            )
            read (
                select user
                where user.id = ?
            )
            read (
                select user
                where user.name = ?
            )
        "#})
        .unwrap();
        assert_eq!(root.reads[0].suffix, vec!["user", "by", "id"]);
        assert_eq!(root.reads[1].suffix, vec!["users", "by", "name"]);
    }

    #[test]
    fn test_limitoffset_on_unique_read_rejected() {
        let err = compile(indoc! {r#"
            model user (
                field id serial
                key id
            )
            read limitoffset (
                select user
                where user.id = ?
            )
        "#})
        .unwrap_err();
        assert!(err.message.contains("cannot limit"), "{}", err.message);
    }

    #[test]
    fn test_write_through_join_requires_single_column_key() {
        let models = indoc! {r#"
            model user (
                field id serial
                key id
            )
            model membership (
                field user_id user.id
                field group_id int
                field role text ( updatable )
                key user_id group_id
            )
        "#};
        let err = compile(&format!(
            "{models}update membership (\n    join membership.user_id = user.id\n    where user.id = ?\n)\n"
        ))
        .unwrap_err();
        assert!(err.message.contains("cannot update"), "{}", err.message);
        assert!(err.message.contains("spans multiple columns"), "{}", err.message);

        let err = compile(&format!(
            "{models}delete membership (\n    join membership.user_id = user.id\n    where user.id = ?\n)\n"
        ))
        .unwrap_err();
        assert!(err.message.contains("cannot delete"), "{}", err.message);
    }

    #[test]
    fn test_view_expansion() {
        let root = compile(indoc! {r#"
            model user (
                field id serial
                field name text
                key id
            )
            read all count paged (
                select user
                where user.name = ?
            )
        "#})
        .unwrap();
        assert_eq!(root.reads.len(), 3);
        let views: Vec<View> = root.reads.iter().map(|r| r.view).collect();
        assert_eq!(views, vec![View::All, View::Count, View::Paged]);
        let mut signatures: Vec<String> = root.reads.iter().map(|r| r.signature()).collect();
        signatures.dedup();
        assert_eq!(signatures.len(), 3);
    }

    #[test]
    fn test_paged_with_orderby_rejected() {
        let err = compile(indoc! {r#"
            model user (
                field id serial
                field name text
                key id
            )
            read paged (
                select user
                orderby asc user.name
            )
        "#})
        .unwrap_err();
        assert!(err.message.contains("cannot page"), "{}", err.message);
    }

    #[test]
    fn test_duplicate_create_rejected() {
        let err = compile(indoc! {r#"
            model user (
                field id serial
                key id
            )
            create user ( )
            create user ( )
        "#})
        .unwrap_err();
        assert!(err.message.contains("duplicate create"), "{}", err.message);
        assert!(err.related.is_some());
    }

    #[test]
    fn test_join_scope() {
        let err = compile(indoc! {r#"
            model user (
                field id serial
                key id
            )
            model post (
                field id serial
                field author user.id
                key id
            )
            read all (
                select user
                where post.id = ?
            )
        "#})
        .unwrap_err();
        assert!(err.message.contains("not joined"), "{}", err.message);

        let root = compile(indoc! {r#"
            model user (
                field id serial
                key id
            )
            model post (
                field id serial
                field author user.id
                key id
            )
            read all (
                select post
                join post.author = user.id
                where user.id = ?
            )
        "#})
        .unwrap();
        assert_eq!(root.reads[0].joins.len(), 1);
    }

    #[test]
    fn test_join_uniqueness_propagates() {
        let root = compile(indoc! {r#"
            model user (
                field id serial
                key id
            )
            model profile (
                field id serial
                field owner user.id
                key id
                unique owner
            )
            read one (
                select profile
                join profile.owner = user.id
                where user.id = ?
            )
        "#})
        .unwrap();
        assert!(root.reads[0].unique);
    }

    #[test]
    fn test_duplicate_table_rejected() {
        let err = compile(indoc! {r#"
            model user (
                field id serial
                key id
            )
            model person (
                table users
                field id serial
                key id
            )
        "#})
        .unwrap_err();
        assert!(err.message.contains("table users"), "{}", err.message);
    }

    #[test]
    fn test_default_index_name() {
        let root = compile(indoc! {r#"
            model user (
                field id serial
                field email text
                key id
                index ( fields email, unique )
            )
        "#})
        .unwrap();
        let model = root.models().next().unwrap().1;
        assert_eq!(model.indexes[0].name, "users_email_unique_index");
        assert!(model.indexes[0].unique);
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
    }
}
