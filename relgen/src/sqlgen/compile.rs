//! Constant folding.
//!
//! A single bottom-up pass restores the normal form: children are compiled
//! first, same-join nested `Literals` are hoisted into their parent, and each
//! run of adjacent `Literal` children collapses into one `Literal` with the
//! join rendered between them. Two variants of structure plus two opaque
//! leaves means one pass suffices; no fixpoint iteration is needed.

use super::{Literals, Sql};

pub fn compile(sql: &Sql) -> Sql {
    match sql {
        Sql::Literals(literals) => {
            let mut folded: Vec<Sql> = Vec::new();
            for child in &literals.sqls {
                match compile(child) {
                    Sql::Literals(inner) if inner.join == literals.join => {
                        for grandchild in inner.sqls {
                            push_merged(&mut folded, grandchild, &literals.join);
                        }
                    }
                    other => push_merged(&mut folded, other, &literals.join),
                }
            }
            if folded.len() == 1 {
                if let Some(single) = folded.pop() {
                    return single;
                }
            }
            Sql::Literals(Literals {
                join: literals.join.clone(),
                sqls: folded,
            })
        }
        other => other.clone(),
    }
}

fn push_merged(out: &mut Vec<Sql>, sql: Sql, join: &str) {
    if let (Some(Sql::Literal(prev)), Sql::Literal(next)) = (out.last_mut(), &sql) {
        prev.push_str(join);
        prev.push_str(next);
        return;
    }
    out.push(sql);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlgen::{equal, Hole};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compile_merges_adjacent_literals() {
        let sql = Sql::literals(" ", vec![Sql::literal("SELECT"), Sql::literal("1")]);
        let compiled = compile(&sql);
        assert!(matches!(&compiled, Sql::Literal(text) if text == "SELECT 1"));
    }

    #[test]
    fn test_compile_preserves_render() {
        let hole = Hole::new("sets");
        hole.fill(Sql::literal("a = ?"));
        let sql = Sql::literals(
            " ",
            vec![
                Sql::literal("UPDATE users"),
                Sql::literal("SET"),
                Sql::Hole(hole),
                Sql::literals(" ", vec![Sql::literal("WHERE"), Sql::literal("id = ?")]),
            ],
        );
        assert_eq!(compile(&sql).render(), sql.render());
    }

    #[test]
    fn test_compile_is_idempotent() {
        let sql = Sql::literals(
            ", ",
            vec![
                Sql::literal("a"),
                Sql::literal("b"),
                Sql::Hole(Hole::new("h")),
                Sql::literal("c"),
            ],
        );
        let once = compile(&sql);
        let twice = compile(&once);
        assert!(equal(&once, &twice));
    }

    #[test]
    fn test_normal_form() {
        let sql = Sql::literals(
            " ",
            vec![
                Sql::literal("a"),
                Sql::literals(" ", vec![Sql::literal("b"), Sql::Hole(Hole::new("h")), Sql::literal("c")]),
                Sql::literal("d"),
            ],
        );
        let Sql::Literals(folded) = compile(&sql) else {
            panic!("expected literals");
        };
        // Same-join nesting is hoisted and literal runs are merged, so no
        // child is a Literals and no two adjacent children are Literals.
        for pair in folded.sqls.windows(2) {
            assert!(!matches!((&pair[0], &pair[1]), (Sql::Literal(_), Sql::Literal(_))));
        }
        for child in &folded.sqls {
            assert!(!matches!(child, Sql::Literals(_)));
        }
        assert_eq!(Sql::Literals(folded).render(), sql.render());
    }
}
