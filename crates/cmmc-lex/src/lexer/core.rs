//! Core lexer implementation.

use cmmc_util::{Handler, Pos};

use crate::cursor::Cursor;
use crate::token::{Token, TokenKind};

/// The lexer: a byte-at-a-time state machine over a [`Cursor`].
///
/// `next_token` skips whitespace, remembers the start position, then
/// dispatches on the first character. Malformed input produces `Illegal`
/// tokens and a diagnostic, never a panic; the stream always terminates in
/// an `Eof` token.
pub struct Lexer<'a> {
    pub(crate) cursor: Cursor,
    pub(crate) handler: &'a Handler,
    /// Position where the current token started.
    pub(crate) token_pos: Pos,
    /// Set once `Eof` has been produced, so iteration terminates.
    finished: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over the given source.
    pub fn new(source: &str, handler: &'a Handler) -> Self {
        Self {
            cursor: Cursor::new(source),
            handler,
            token_pos: Pos::start(),
            finished: false,
        }
    }

    /// Returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        self.token_pos = self.cursor.pos();
        if self.cursor.is_at_end() {
            return Token::eof(self.token_pos);
        }

        let c = self.cursor.peek();
        match c {
            '{' => self.single(TokenKind::LBrace),
            '}' => self.single(TokenKind::RBrace),
            ';' => self.single(TokenKind::Semicolon),
            ',' => self.single(TokenKind::Comma),
            '(' => self.single(TokenKind::LParen),
            ')' => self.single(TokenKind::RParen),
            '[' => self.single(TokenKind::LBracket),
            ']' => self.single(TokenKind::RBracket),
            '.' => self.single(TokenKind::Dot),
            '+' => self.lex_plus(),
            '-' => self.lex_minus(),
            '*' => self.lex_star(),
            '%' => self.lex_percent(),
            '=' => self.lex_equals(),
            '!' => self.lex_bang(),
            '<' => self.lex_less(),
            '>' => self.lex_greater(),
            '&' => self.lex_ampersand(),
            '|' => self.lex_pipe(),
            '/' => self.lex_slash(),
            '\'' => self.lex_char(),
            '"' => self.lex_string(),
            c if c.is_ascii_digit() => self.lex_number(),
            c if is_ident_start(c) => self.lex_identifier(),
            c => {
                self.cursor.advance();
                self.report_illegal(&c.to_string(), format!("unknown character '{}'", c));
                self.make_token(TokenKind::Illegal, c.to_string())
            },
        }
    }

    /// Skips spaces, tabs, carriage returns and newlines. Line accounting
    /// happens in the cursor.
    fn skip_whitespace(&mut self) {
        while matches!(self.cursor.peek(), ' ' | '\t' | '\r' | '\n') {
            self.cursor.advance();
        }
    }

    /// Consumes one character and builds a token from it.
    fn single(&mut self, kind: TokenKind) -> Token {
        let c = self.cursor.advance().unwrap_or('\0');
        self.make_token(kind, c.to_string())
    }

    /// Builds a token at the remembered start position.
    pub(crate) fn make_token(&self, kind: TokenKind, lexeme: impl Into<String>) -> Token {
        Token::new(self.token_pos, kind, lexeme)
    }

    /// Reports a lexical error for a malformed lexeme.
    pub(crate) fn report_illegal(&self, lexeme: &str, message: impl Into<String>) {
        self.handler
            .report(self.token_pos, TokenKind::Illegal.code(), lexeme, message);
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    /// Yields tokens up to and including the final `Eof`.
    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.kind == TokenKind::Eof {
            self.finished = true;
        }
        Some(token)
    }
}

/// First character of an identifier.
pub(crate) fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

/// Continuation character of an identifier.
pub(crate) fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let handler = Handler::new();
        let mut lexer = Lexer::new(source, &handler);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token();
            let done = tok.kind == TokenKind::Eof;
            out.push(tok.kind);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn test_empty_source_is_eof() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   \t\n"), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_delimiters() {
        assert_eq!(
            kinds("{};,()"),
            vec![
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Semicolon,
                TokenKind::Comma,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_statement() {
        assert_eq!(
            kinds("var int x = 42;"),
            vec![
                TokenKind::KwVar,
                TokenKind::KwInt,
                TokenKind::Identifier,
                TokenKind::Assign,
                TokenKind::Integer,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_unknown_character_is_illegal() {
        let handler = Handler::new();
        let mut lexer = Lexer::new("#", &handler);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Illegal);
        assert!(handler.has_errors());
    }

    #[test]
    fn test_positions() {
        let handler = Handler::new();
        let mut lexer = Lexer::new("a\n  b", &handler);
        let a = lexer.next_token();
        let b = lexer.next_token();
        assert_eq!(a.pos, Pos::new(1, 0));
        assert_eq!(b.pos, Pos::new(2, 2));
    }

    #[test]
    fn test_iterator_ends_after_eof() {
        let handler = Handler::new();
        let lexer = Lexer::new("x", &handler);
        let tokens: Vec<_> = lexer.collect();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[1].kind, TokenKind::Eof);
    }
}
