//! Division vs comment disambiguation.
//!
//! `//` starts a line comment terminated by a newline (which is not
//! consumed, so line accounting stays in the whitespace skipper); `/*`
//! starts a block comment terminated by `*/`; a bare `/` is division,
//! `/=` the compound assignment. Comment tokens survive to the token dump
//! and are filtered by the driver before parsing.

use crate::token::{Token, TokenKind};
use crate::Lexer;

impl Lexer<'_> {
    /// Lexes a token starting with `/`.
    pub(crate) fn lex_slash(&mut self) -> Token {
        self.cursor.advance(); // '/'
        match self.cursor.peek() {
            '/' => {
                let mut text = String::from("/");
                text.push(self.cursor.advance().unwrap());
                while !self.cursor.is_at_end() && self.cursor.peek() != '\n' {
                    text.push(self.cursor.advance().unwrap());
                }
                self.make_token(TokenKind::LineComment, text)
            },
            '*' => {
                let mut text = String::from("/");
                text.push(self.cursor.advance().unwrap());
                loop {
                    if self.cursor.is_at_end() {
                        self.report_illegal(&text, "unterminated block comment");
                        return self.make_token(TokenKind::Illegal, text);
                    }
                    let c = self.cursor.advance().unwrap();
                    text.push(c);
                    if c == '*' && self.cursor.peek() == '/' {
                        text.push(self.cursor.advance().unwrap());
                        return self.make_token(TokenKind::BlockComment, text);
                    }
                }
            },
            '=' => {
                self.cursor.advance();
                self.make_token(TokenKind::SlashEq, "/=")
            },
            _ => self.make_token(TokenKind::Slash, "/"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmmc_util::Handler;

    fn lex_all(source: &str) -> Vec<Token> {
        let handler = Handler::new();
        Lexer::new(source, &handler).collect()
    }

    #[test]
    fn test_division() {
        let toks = lex_all("a / b");
        assert_eq!(toks[1].kind, TokenKind::Slash);
    }

    #[test]
    fn test_line_comment_stops_at_newline() {
        let toks = lex_all("a // note\nb");
        assert_eq!(toks[0].kind, TokenKind::Identifier);
        assert_eq!(toks[1].kind, TokenKind::LineComment);
        assert_eq!(toks[1].lexeme, "// note");
        assert_eq!(toks[2].kind, TokenKind::Identifier);
        assert_eq!(toks[2].pos.line, 2);
    }

    #[test]
    fn test_block_comment() {
        let toks = lex_all("a /* x\ny */ b");
        assert_eq!(toks[1].kind, TokenKind::BlockComment);
        assert_eq!(toks[2].lexeme, "b");
    }

    #[test]
    fn test_unterminated_block_comment() {
        let handler = Handler::new();
        let mut lexer = Lexer::new("/* oops", &handler);
        let tok = lexer.next_token();
        assert_eq!(tok.kind, TokenKind::Illegal);
        assert!(handler.has_errors());
    }

    #[test]
    fn test_line_comment_at_eof() {
        let toks = lex_all("// last line");
        assert_eq!(toks[0].kind, TokenKind::LineComment);
        assert_eq!(toks[1].kind, TokenKind::Eof);
    }
}
