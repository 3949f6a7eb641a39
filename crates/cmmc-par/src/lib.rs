//! cmmc-par - Recursive-descent parser.
//!
//! The grammar is LL(1) with ε-productions, except for three spots that
//! need a second token of lookahead: factor-start, the assignment-vs-call
//! decision (`peek(2)` is `=` vs `(`), and recognizing `main` behind an
//! optional return type. Each production is a method returning
//! `(ok, Node)`; callers compose the children into their own node, so the
//! resulting tree preserves the production structure verbatim, ε leaves
//! included.
//!
//! Error policy: a missing token is reported with its position and the
//! production's name, the offending token is consumed, and parsing
//! continues toward the production's sentinel. The parser never panics and
//! always returns a best-effort tree; the caller inspects the handler to
//! decide whether the tree may feed the analyzer.

pub mod cst;
mod expr;
mod items;
mod stmt;

pub use cst::{dump_tree, CstKind, Node};

use cmmc_lex::{Token, TokenKind};
use cmmc_util::{Handler, Pos};

/// Parses a comment-free token list into a syntax tree.
///
/// # Examples
///
/// ```
/// use cmmc_lex::{strip_comments, tokenize};
/// use cmmc_par::parse;
/// use cmmc_util::Handler;
///
/// let handler = Handler::new();
/// let tokens = strip_comments(tokenize("main() { return; }", &handler));
/// let tree = parse(tokens, &handler);
/// assert!(!handler.has_errors());
/// assert_eq!(tree.label(), "<program>");
/// ```
pub fn parse(tokens: Vec<Token>, handler: &Handler) -> Node {
    Parser::new(tokens, handler).program()
}

/// The parser state: a token list, a cursor into it, and the error sink.
pub struct Parser<'a> {
    tokens: Vec<Token>,
    index: usize,
    handler: &'a Handler,
    eof: Token,
}

impl<'a> Parser<'a> {
    /// Creates a parser over a comment-free token list.
    pub fn new(tokens: Vec<Token>, handler: &'a Handler) -> Self {
        let eof_pos = tokens
            .last()
            .map(|t| t.pos)
            .unwrap_or(Pos::start());
        Self {
            tokens,
            index: 0,
            handler,
            eof: Token::eof(eof_pos),
        }
    }

    /// Looks `n` tokens ahead (1-based, like a textbook `peek`).
    pub(crate) fn peek(&self, n: usize) -> &Token {
        self.tokens.get(self.index + n - 1).unwrap_or(&self.eof)
    }

    /// Consumes and returns the next token; at the end, returns EOF
    /// without advancing.
    pub(crate) fn next(&mut self) -> Token {
        match self.tokens.get(self.index) {
            Some(tok) => {
                self.index += 1;
                tok.clone()
            },
            None => self.eof.clone(),
        }
    }

    /// Steps one token back.
    pub(crate) fn backup(&mut self) {
        if self.index > 0 {
            self.index -= 1;
        }
    }

    /// True when the next token has the given kind.
    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.peek(1).kind == kind
    }

    /// Consumes the next token if it has the given kind.
    pub(crate) fn accept(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.next())
        } else {
            None
        }
    }

    /// Consumes one token. If it has the expected kind, a terminal node is
    /// returned; otherwise the mismatch is reported against `node_name`
    /// and `None` comes back. Either way the token is gone, which is what
    /// moves the parser toward the production's sentinel.
    pub(crate) fn expect(
        &mut self,
        kind: TokenKind,
        node_name: &str,
        what: &str,
    ) -> Option<Node> {
        let token = self.next();
        if token.kind == kind {
            Some(Node::terminal(token))
        } else {
            self.error(&token, node_name, &format!("missing {}", what));
            None
        }
    }

    /// Reports a parse error anchored to `token`.
    pub(crate) fn error(&self, token: &Token, node_name: &str, message: &str) {
        self.handler.report(
            token.pos,
            token.kind.code(),
            token.lexeme.clone(),
            format!("{}: {}", node_name, message),
        );
    }

    /// True once only EOF remains.
    pub(crate) fn is_finished(&self) -> bool {
        self.at(TokenKind::Eof)
    }

    /// Current cursor position, used by loops to guarantee progress during
    /// error recovery.
    pub(crate) fn cursor(&self) -> usize {
        self.index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmmc_lex::{strip_comments, tokenize};

    fn parse_src(source: &str) -> (Node, Handler) {
        let lex_handler = Handler::new();
        let tokens = strip_comments(tokenize(source, &lex_handler));
        assert!(!lex_handler.has_errors(), "lex errors in test source");
        let handler = Handler::new();
        let tree = parse(tokens, &handler);
        (tree, handler)
    }

    #[test]
    fn test_minimal_program() {
        let (tree, handler) = parse_src("main() { }");
        assert!(!handler.has_errors(), "{}", handler.render());
        assert_eq!(tree.kind, CstKind::Program);
    }

    #[test]
    fn test_main_with_return_type() {
        let (_, handler) = parse_src("int main() { return 0; }");
        assert!(!handler.has_errors(), "{}", handler.render());
    }

    #[test]
    fn test_declarations_before_main() {
        let src = "const int A = 1, B = A + 2;\n\
                   var int x, y = 3;\n\
                   int f(int x);\n\
                   main() { }\n\
                   int f(int x) { return x + 1; }";
        let (tree, handler) = parse_src(src);
        assert!(!handler.has_errors(), "{}", handler.render());
        // program children: decl-stmts, main, (, ), compound, func-block
        assert!(tree.children.len() >= 6);
    }

    #[test]
    fn test_control_statements() {
        let src = "main() {\n\
                     var int i, s;\n\
                     s = 0;\n\
                     for (i = 0; i < 10; i = i + 1) { s = s + i; }\n\
                     while (s > 0) { s = s - 1; }\n\
                     do { s = s + 1; } while (s < 5);\n\
                     if (s == 5) { s = 0; } else { s = 1; }\n\
                     return;\n\
                   }";
        let (_, handler) = parse_src(src);
        assert!(!handler.has_errors(), "{}", handler.render());
    }

    #[test]
    fn test_if_else_if_chain() {
        let src = "main() { var int a; if (a > 0) { a = 1; } else if (a < 0) { a = 2; } else { a = 3; } }";
        let (_, handler) = parse_src(src);
        assert!(!handler.has_errors(), "{}", handler.render());
    }

    #[test]
    fn test_missing_semicolon_reported_and_recovered() {
        let (tree, handler) = parse_src("main() { var int x = 1 }");
        assert!(handler.has_errors());
        assert_eq!(tree.kind, CstKind::Program);
    }

    #[test]
    fn test_missing_main_reported() {
        let (_, handler) = parse_src("var int x;");
        assert!(handler.has_errors());
    }

    #[test]
    fn test_call_vs_assign_disambiguation() {
        let src = "main() { f(1, 2); x = f(3); }";
        let (_, handler) = parse_src(src);
        // undefined names are a semantic matter; the parse itself is clean
        assert!(!handler.has_errors(), "{}", handler.render());
    }

    #[test]
    fn test_tree_dump_contains_epsilon() {
        let (tree, _) = parse_src("main() { }");
        let dump = dump_tree(&tree);
        assert!(dump.contains("<program>"));
        assert!(dump.contains("ε"));
    }

    #[test]
    fn test_nested_parens_in_condition() {
        let src = "main() { var int a, b; if ((a > 0 || b > 0) && a < 9) { a = 1; } }";
        let (_, handler) = parse_src(src);
        assert!(!handler.has_errors(), "{}", handler.render());
    }
}
