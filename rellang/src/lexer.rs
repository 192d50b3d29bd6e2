use core::fmt;

use crate::{
    diagnostics::{LangError, LangResult},
    metadata::SourceMetadata,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Int,
    Float,
    String,
    Dot,
    Comma,
    Equal,
    LAngle,
    RAngle,
    Bang,
    Question,
    OpenParen,
    CloseParen,
    Eof,
    Error,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident => write!(f, "identifier"),
            TokenKind::Int => write!(f, "integer"),
            TokenKind::Float => write!(f, "float"),
            TokenKind::String => write!(f, "string"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Equal => write!(f, "="),
            TokenKind::LAngle => write!(f, "<"),
            TokenKind::RAngle => write!(f, ">"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::Question => write!(f, "?"),
            TokenKind::OpenParen => write!(f, "("),
            TokenKind::CloseParen => write!(f, ")"),
            TokenKind::Eof => write!(f, "end of file"),
            TokenKind::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub chars: (usize, usize),
    pub lines: (usize, usize),
    pub cols: (usize, usize),
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} → {}:{}", self.lines.0, self.cols.0, self.lines.1, self.cols.1)
    }
}

impl Span {
    pub fn new(chars: (usize, usize), lines: (usize, usize), cols: (usize, usize)) -> Self {
        Self { chars, lines, cols }
    }

    /// Creates a union span from the minimum start to the maximum end.
    pub fn merge(&self, other: &Span) -> Span {
        let (start_char, start_line, start_col) = if self.chars.0 <= other.chars.0 {
            (self.chars.0, self.lines.0, self.cols.0)
        } else {
            (other.chars.0, other.lines.0, other.cols.0)
        };
        let (end_char, end_line, end_col) = if self.chars.1 >= other.chars.1 {
            (self.chars.1, self.lines.1, self.cols.1)
        } else {
            (other.chars.1, other.lines.1, other.cols.1)
        };
        Span {
            chars: (start_char, end_char),
            lines: (start_line, end_line),
            cols: (start_col, end_col),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
}

pub struct Lexer<'a> {
    src: &'a str,
    bytes: &'a [u8],
    i: usize,
    line: usize,
    col: usize,
    last: Option<TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            i: 0,
            line: 1,
            col: 1,
            last: None,
        }
    }

    pub fn lex(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }

    /// Whether a synthesized comma should be emitted at a line break. Suppressed
    /// right after a comma or an open paren so blank lines and lines directly
    /// following `(` do not produce empty tuples.
    fn wants_comma(&self) -> bool {
        !matches!(self.last, None | Some(TokenKind::Comma) | Some(TokenKind::OpenParen))
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            while !self.at_end() && matches!(self.peek(), b' ' | b'\t' | b'\r') {
                self.advance();
            }
            let sp = self.span_start();

            if self.at_end() {
                if self.wants_comma() {
                    return self.make(TokenKind::Comma, ",", sp);
                }
                return self.make(TokenKind::Eof, "", sp);
            }

            let c1 = self.peek();
            let c2 = self.peek_n(1);

            match c1 {
                b'\n' => {
                    self.advance();
                    if self.wants_comma() {
                        return self.make(TokenKind::Comma, ",", sp);
                    }
                    continue;
                }
                b'/' if c2 == b'/' => {
                    // Line comment. The newline is left in place so comma
                    // synthesis still sees the line break.
                    while !self.at_end() && self.peek() != b'\n' {
                        self.advance();
                    }
                    continue;
                }
                b'.' => {
                    self.advance();
                    return self.make(TokenKind::Dot, ".", sp);
                }
                b',' => {
                    self.advance();
                    return self.make(TokenKind::Comma, ",", sp);
                }
                b'=' => {
                    self.advance();
                    return self.make(TokenKind::Equal, "=", sp);
                }
                b'<' => {
                    self.advance();
                    return self.make(TokenKind::LAngle, "<", sp);
                }
                b'>' => {
                    self.advance();
                    return self.make(TokenKind::RAngle, ">", sp);
                }
                b'!' => {
                    self.advance();
                    return self.make(TokenKind::Bang, "!", sp);
                }
                b'?' => {
                    self.advance();
                    return self.make(TokenKind::Question, "?", sp);
                }
                b'(' => {
                    self.advance();
                    return self.make(TokenKind::OpenParen, "(", sp);
                }
                b')' => {
                    self.advance();
                    return self.make(TokenKind::CloseParen, ")", sp);
                }
                b'"' => {
                    return self.scan_string(sp);
                }
                b'0'..=b'9' => {
                    return self.scan_number(sp);
                }
                _ if Self::is_id_start(c1) => {
                    return self.scan_ident(sp);
                }
                _ => {
                    let start = self.i;
                    self.advance();
                    let text = self.src[start..self.i].to_string();
                    return self.make_owned(TokenKind::Error, text, sp);
                }
            }
        }
    }

    fn scan_number(&mut self, sp: Span) -> Token {
        let start = self.i;
        while !self.at_end() && self.peek().is_ascii_digit() {
            self.advance();
        }
        let mut kind = TokenKind::Int;
        if !self.at_end() && self.peek() == b'.' && self.peek_n(1).is_ascii_digit() {
            kind = TokenKind::Float;
            self.advance(); // '.'
            while !self.at_end() && self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        let text = self.src[start..self.i].to_string();
        self.make_owned(kind, text, sp)
    }

    fn scan_ident(&mut self, sp: Span) -> Token {
        let start = self.i;
        self.advance();
        while !self.at_end() && Self::is_id_cont(self.peek()) {
            self.advance();
        }
        let text = self.src[start..self.i].to_string();
        self.make_owned(TokenKind::Ident, text, sp)
    }

    fn scan_string(&mut self, sp: Span) -> Token {
        self.advance(); // opening quote
        let mut out = String::new();
        loop {
            if self.at_end() || self.peek() == b'\n' {
                // Unterminated string
                return self.make_owned(TokenKind::Error, out, sp);
            }
            match self.peek() {
                b'"' => {
                    self.advance();
                    return self.make_owned(TokenKind::String, out, sp);
                }
                b'\\' => {
                    self.advance();
                    let escaped = if self.at_end() { 0 } else { self.peek() };
                    match escaped {
                        b'n' => out.push('\n'),
                        b't' => out.push('\t'),
                        b'"' => out.push('"'),
                        b'\\' => out.push('\\'),
                        other => {
                            out.push('\\');
                            out.push(other as char);
                        }
                    }
                    self.advance();
                }
                _ => {
                    let start = self.i;
                    while !self.at_end() && !matches!(self.peek(), b'"' | b'\\' | b'\n') {
                        self.advance();
                    }
                    out.push_str(&self.src[start..self.i]);
                }
            }
        }
    }

    #[inline]
    fn at_end(&self) -> bool {
        self.i >= self.bytes.len()
    }

    #[inline]
    fn peek(&self) -> u8 {
        *self.bytes.get(self.i).unwrap_or(&0)
    }

    #[inline]
    fn peek_n(&self, n: usize) -> u8 {
        *self.bytes.get(self.i + n).unwrap_or(&0)
    }

    fn advance(&mut self) -> Option<u8> {
        let c = *self.bytes.get(self.i)?;
        self.i += 1;
        if c == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn span_start(&self) -> Span {
        Span {
            chars: (self.i, self.i),
            lines: (self.line, self.line),
            cols: (self.col, self.col),
        }
    }

    fn make(&mut self, kind: TokenKind, text: &str, start_span: Span) -> Token {
        self.make_owned(kind, text.to_string(), start_span)
    }

    fn make_owned(&mut self, kind: TokenKind, text: String, start_span: Span) -> Token {
        if kind != TokenKind::Eof {
            self.last = Some(kind);
        }
        let span = Span {
            chars: (start_span.chars.0, self.i),
            lines: (start_span.lines.0, self.line),
            cols: (start_span.cols.0, self.col),
        };
        Token { kind, text, span }
    }

    #[inline]
    fn is_id_start(c: u8) -> bool {
        c.is_ascii_alphabetic() || c == b'_'
    }

    #[inline]
    fn is_id_cont(c: u8) -> bool {
        c.is_ascii_alphanumeric() || c == b'_'
    }
}

/// Cursor over a token stream with single-token lookahead, used by the tuple
/// tree parser. Construction fails if the lexer recorded any illegal tokens.
#[derive(Debug)]
pub struct Scanner<'a> {
    meta: &'a SourceMetadata<'a>,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(meta: &'a SourceMetadata<'a>) -> LangResult<Self> {
        let tokens = Lexer::new(meta.contents).lex();
        if let Some(bad) = tokens.iter().find(|t| t.kind == TokenKind::Error) {
            return Err(Box::new(LangError::error(
                meta.file_name,
                meta.contents,
                bad.span,
                format!("illegal token `{}`", bad.text),
                None::<String>,
                Some("EIllegalToken"),
            )));
        }
        Ok(Self { meta, tokens, pos: 0 })
    }

    pub fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof.
        self.tokens.get(self.pos).unwrap_or_else(|| self.tokens.last().expect("token stream has Eof"))
    }

    pub fn scan(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    pub fn scan_if(&mut self, kind: TokenKind) -> Option<Token> {
        if self.peek().kind == kind {
            Some(self.scan())
        } else {
            None
        }
    }

    pub fn scan_exact(&mut self, kind: TokenKind) -> LangResult<Token> {
        let got = self.peek().clone();
        if got.kind == kind {
            Ok(self.scan())
        } else {
            Err(self.err(got.span, format!("expected {}; got {}", kind, got.kind)))
        }
    }

    pub fn scan_one_of(&mut self, kinds: &[TokenKind]) -> LangResult<Token> {
        let got = self.peek().clone();
        if kinds.contains(&got.kind) {
            Ok(self.scan())
        } else {
            let expected = kinds.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(", ");
            Err(self.err(got.span, format!("expected one of {{{}}}; got {}", expected, got.kind)))
        }
    }

    pub fn err(&self, span: Span, message: impl Into<String>) -> Box<LangError> {
        Box::new(LangError::error(
            self.meta.file_name,
            self.meta.contents,
            span,
            message,
            None::<String>,
            Some("ESyntax"),
        ))
    }

    pub fn metadata(&self) -> &'a SourceMetadata<'a> {
        self.meta
    }
}

/// Find the first occurrence of `pattern` in `src` and return its `Span`.
/// Meant to be used only in tests; if the pattern contains capturing groups
/// it is treated as a regex, otherwise it is matched literally.
pub fn span_of(src: &str, pattern: &str) -> Option<Span> {
    let re = if pattern.contains('(') && pattern.contains(')') {
        regex::Regex::new(pattern).unwrap()
    } else {
        regex::Regex::new(&regex::escape(pattern)).unwrap()
    };
    let bytes = src.as_bytes();

    let cap = re.captures(src)?;
    let m = cap.get(1).or_else(|| cap.get(0)).unwrap();
    let (start, end) = (m.start(), m.end());

    let mut line = 1;
    let mut col = 1;
    for &b in &bytes[..start] {
        if b == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    let (line_start, col_start) = (line, col);
    for &b in &bytes[start..end] {
        if b == b'\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }

    Some(Span::new((start, end), (line_start, line), (col_start, col)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).lex().iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_lexer_basic_model() {
        let src = indoc! {r#"
            model user (
                field id serial
            )
        "#};
        use TokenKind::*;
        assert_eq!(
            kinds(src),
            vec![
                Ident, Ident, OpenParen, // `model user (` — no comma after open paren
                Ident, Ident, Ident, Comma, // `field id serial` + line-break comma
                CloseParen, Comma, // `)` + line-break comma
                Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_comma_synthesis_rules() {
        // Blank lines and lines directly after `(` must not produce commas.
        let src = "a (\n\n b\n)\n";
        use TokenKind::*;
        assert_eq!(kinds(src), vec![Ident, OpenParen, Ident, Comma, CloseParen, Comma, Eof]);
    }

    #[test]
    fn test_lexer_comma_at_eof_without_newline() {
        use TokenKind::*;
        assert_eq!(kinds("a b"), vec![Ident, Ident, Comma, Eof]);
        assert_eq!(kinds(""), vec![Eof]);
        assert_eq!(kinds("\n\n"), vec![Eof]);
    }

    #[test]
    fn test_lexer_explicit_comma_not_doubled() {
        use TokenKind::*;
        assert_eq!(kinds("a,\nb"), vec![Ident, Comma, Ident, Comma, Eof]);
    }

    #[test]
    fn test_lexer_operators_and_exprs() {
        let src = "where user.id <= ?";
        use TokenKind::*;
        assert_eq!(kinds(src), vec![Ident, Ident, Dot, Ident, LAngle, Equal, Question, Comma, Eof]);
    }

    #[test]
    fn test_lexer_numbers() {
        let tokens = Lexer::new("42 3.25").lex();
        assert_eq!(tokens[0].kind, TokenKind::Int);
        assert_eq!(tokens[0].text, "42");
        assert_eq!(tokens[1].kind, TokenKind::Float);
        assert_eq!(tokens[1].text, "3.25");
    }

    #[test]
    fn test_lexer_strings() {
        let tokens = Lexer::new(r#""hello \"world\"\n""#).lex();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text, "hello \"world\"\n");
    }

    #[test]
    fn test_lexer_comment_keeps_line_break() {
        let src = "a // trailing note\nb";
        use TokenKind::*;
        assert_eq!(kinds(src), vec![Ident, Comma, Ident, Comma, Eof]);
    }

    #[test]
    fn test_lexer_illegal_token() {
        let tokens = Lexer::new("field id $").lex();
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Error && t.text == "$"));
    }

    #[test]
    fn test_lexer_spans() {
        let src = indoc! {r#"
            model user (
                field id serial
            )
        "#};
        let tokens = Lexer::new(src).lex();
        assert_eq!(tokens[0].span, span_of(src, "model").unwrap());
        assert_eq!(tokens[1].span, span_of(src, "user").unwrap());
        assert_eq!(tokens[3].span, span_of(src, "field").unwrap());
        assert_eq!(tokens[4].span, span_of(src, "id").unwrap());
        assert_eq!(tokens[5].span, span_of(src, "serial").unwrap());
    }

    #[test]
    fn test_scanner_expected_errors() {
        let meta = SourceMetadata {
            file_name: "test.rel",
            contents: "model user",
        };
        let mut scanner = Scanner::new(&meta).unwrap();
        assert_eq!(scanner.scan_exact(TokenKind::Ident).unwrap().text, "model");
        let err = scanner.scan_exact(TokenKind::OpenParen).unwrap_err();
        assert!(err.message.contains("expected (; got identifier"), "{}", err.message);
    }

    #[test]
    fn test_scanner_rejects_illegal_tokens() {
        let meta = SourceMetadata {
            file_name: "test.rel",
            contents: "model ^user",
        };
        let err = Scanner::new(&meta).unwrap_err();
        assert!(err.message.contains("illegal token"));
    }
}
