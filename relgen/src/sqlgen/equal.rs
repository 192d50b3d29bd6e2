use super::Sql;

/// Structural equality for literals, identity for the shared handles: two
/// distinct holes are never equal, even with the same name.
pub fn equal(a: &Sql, b: &Sql) -> bool {
    match (a, b) {
        (Sql::Literal(x), Sql::Literal(y)) => x == y,
        (Sql::Literals(x), Sql::Literals(y)) => {
            x.join == y.join && x.sqls.len() == y.sqls.len() && x.sqls.iter().zip(&y.sqls).all(|(a, b)| equal(a, b))
        }
        (Sql::Hole(x), Sql::Hole(y)) => x.same(y),
        (Sql::Condition(x), Sql::Condition(y)) => x.same(y),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlgen::Hole;

    #[test]
    fn test_literal_equality_is_by_value() {
        assert!(equal(&Sql::literal("a"), &Sql::literal("a")));
        assert!(!equal(&Sql::literal("a"), &Sql::literal("b")));
    }

    #[test]
    fn test_hole_equality_is_by_identity() {
        let hole = Hole::new("h");
        assert!(equal(&Sql::Hole(hole.clone()), &Sql::Hole(hole.clone())));
        assert!(!equal(&Sql::Hole(hole), &Sql::Hole(Hole::new("h"))));
    }

    #[test]
    fn test_literals_compare_join_and_children() {
        let a = Sql::literals(" ", vec![Sql::literal("x"), Sql::literal("y")]);
        let b = Sql::literals(" ", vec![Sql::literal("x"), Sql::literal("y")]);
        let c = Sql::literals(", ", vec![Sql::literal("x"), Sql::literal("y")]);
        assert!(equal(&a, &b));
        assert!(!equal(&a, &c));
        assert!(!equal(&a, &Sql::literal("x y")));
    }
}
