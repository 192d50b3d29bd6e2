//! Grammar-agnostic tuple tree.
//!
//! The token stream is grouped into a `list(tuple(...), ...)` shape before any
//! DSL keyword is interpreted: a list is a parenthesized sequence of tuples, a
//! tuple is a run of tokens (and nested lists) terminated by a comma — which
//! the lexer synthesizes at line breaks — or by the end of the enclosing list.

use crate::{
    diagnostics::LangResult,
    lexer::{Scanner, Span, Token, TokenKind},
};

#[derive(Debug, Clone)]
pub enum Node {
    Token(Token),
    List(ListNode),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::Token(token) => token.span,
            Node::List(list) => list.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TupleNode {
    pub nodes: Vec<Node>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ListNode {
    pub tuples: Vec<TupleNode>,
    pub span: Span,
}

/// Parses the whole token stream as a list whose parens are implicit.
pub fn scan_root(scanner: &mut Scanner) -> LangResult<ListNode> {
    let start = scanner.peek().span;
    let mut tuples = Vec::new();
    loop {
        match scanner.peek().kind {
            TokenKind::Eof => break,
            TokenKind::Comma => {
                scanner.scan();
            }
            TokenKind::CloseParen => {
                let got = scanner.peek().clone();
                return Err(scanner.err(got.span, "unexpected )".to_string()));
            }
            _ => tuples.push(scan_tuple(scanner)?),
        }
    }
    let span = tuples.iter().fold(start, |acc, t| acc.merge(&t.span));
    Ok(ListNode { tuples, span })
}

/// Parses a parenthesized list; the open paren has already been consumed.
fn scan_list(scanner: &mut Scanner, open_span: Span) -> LangResult<ListNode> {
    let mut tuples = Vec::new();
    loop {
        match scanner.peek().kind {
            TokenKind::CloseParen => {
                let close = scanner.scan();
                let span = open_span.merge(&close.span);
                return Ok(ListNode { tuples, span });
            }
            TokenKind::Comma => {
                scanner.scan();
            }
            TokenKind::Eof => {
                let got = scanner.peek().clone();
                return Err(scanner.err(got.span, "expected ); got end of file".to_string()));
            }
            _ => tuples.push(scan_tuple(scanner)?),
        }
    }
}

/// Accumulates nodes until a comma (consumed) or the end of the enclosing
/// list (left for the caller).
fn scan_tuple(scanner: &mut Scanner) -> LangResult<TupleNode> {
    let start = scanner.peek().span;
    let mut nodes = Vec::new();
    loop {
        match scanner.peek().kind {
            TokenKind::Comma => {
                scanner.scan();
                break;
            }
            TokenKind::CloseParen | TokenKind::Eof => break,
            TokenKind::OpenParen => {
                let open = scanner.scan();
                nodes.push(Node::List(scan_list(scanner, open.span)?));
            }
            _ => nodes.push(Node::Token(scanner.scan())),
        }
    }
    let span = nodes.iter().fold(start, |acc, n| acc.merge(&n.span()));
    Ok(TupleNode { nodes, span })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::SourceMetadata;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> LangResult<ListNode> {
        let meta = SourceMetadata {
            file_name: "test.rel",
            contents: src,
        };
        let mut scanner = Scanner::new(&meta)?;
        scan_root(&mut scanner)
    }

    fn ident_texts(tuple: &TupleNode) -> Vec<String> {
        tuple
            .nodes
            .iter()
            .filter_map(|n| match n {
                Node::Token(t) => Some(t.text.clone()),
                Node::List(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_root_is_implicit_list() {
        let root = parse("a b\nc d").unwrap();
        assert_eq!(root.tuples.len(), 2);
        assert_eq!(ident_texts(&root.tuples[0]), vec!["a", "b"]);
        assert_eq!(ident_texts(&root.tuples[1]), vec!["c", "d"]);
    }

    #[test]
    fn test_nested_list_inside_tuple() {
        let src = "field foo int ( nullable, updatable )";
        let root = parse(src).unwrap();
        assert_eq!(root.tuples.len(), 1);
        let tuple = &root.tuples[0];
        assert_eq!(ident_texts(tuple), vec!["field", "foo", "int"]);
        let Node::List(list) = tuple.nodes.last().unwrap() else {
            panic!("expected trailing list");
        };
        assert_eq!(list.tuples.len(), 2);
        assert_eq!(ident_texts(&list.tuples[0]), vec!["nullable"]);
        assert_eq!(ident_texts(&list.tuples[1]), vec!["updatable"]);
    }

    #[test]
    fn test_multiline_block() {
        let src = indoc! {r#"
            model user (
                field id serial

                key id
            )
        "#};
        let root = parse(src).unwrap();
        assert_eq!(root.tuples.len(), 1);
        let Node::List(body) = root.tuples[0].nodes.last().unwrap() else {
            panic!("expected model body list");
        };
        // The blank line must not produce an empty tuple.
        assert_eq!(body.tuples.len(), 2);
        assert_eq!(ident_texts(&body.tuples[0]), vec!["field", "id", "serial"]);
        assert_eq!(ident_texts(&body.tuples[1]), vec!["key", "id"]);
    }

    #[test]
    fn test_empty_list() {
        let root = parse("create user ( )").unwrap();
        let Node::List(list) = root.tuples[0].nodes.last().unwrap() else {
            panic!("expected list");
        };
        assert!(list.tuples.is_empty());
    }

    #[test]
    fn test_unbalanced_parens() {
        let err = parse("model user (").unwrap_err();
        assert!(err.message.contains("expected )"), "{}", err.message);
        let err = parse("model user )").unwrap_err();
        assert!(err.message.contains("unexpected )"), "{}", err.message);
    }
}
