//! Operator lexing.
//!
//! Every multi-character operator is recognized with one character of
//! lookahead off its first character.

use crate::token::{Token, TokenKind};
use crate::Lexer;

impl Lexer<'_> {
    pub(crate) fn lex_plus(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('+') {
            self.make_token(TokenKind::PlusPlus, "++")
        } else if self.cursor.match_char('=') {
            self.make_token(TokenKind::PlusEq, "+=")
        } else {
            self.make_token(TokenKind::Plus, "+")
        }
    }

    pub(crate) fn lex_minus(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('-') {
            self.make_token(TokenKind::MinusMinus, "--")
        } else if self.cursor.match_char('=') {
            self.make_token(TokenKind::MinusEq, "-=")
        } else {
            self.make_token(TokenKind::Minus, "-")
        }
    }

    pub(crate) fn lex_star(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            self.make_token(TokenKind::StarEq, "*=")
        } else {
            self.make_token(TokenKind::Star, "*")
        }
    }

    pub(crate) fn lex_percent(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            self.make_token(TokenKind::PercentEq, "%=")
        } else {
            self.make_token(TokenKind::Percent, "%")
        }
    }

    pub(crate) fn lex_equals(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            self.make_token(TokenKind::EqEq, "==")
        } else {
            self.make_token(TokenKind::Assign, "=")
        }
    }

    pub(crate) fn lex_bang(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            self.make_token(TokenKind::Ne, "!=")
        } else {
            self.make_token(TokenKind::Bang, "!")
        }
    }

    pub(crate) fn lex_less(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            self.make_token(TokenKind::Le, "<=")
        } else {
            self.make_token(TokenKind::Lt, "<")
        }
    }

    pub(crate) fn lex_greater(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('=') {
            self.make_token(TokenKind::Ge, ">=")
        } else {
            self.make_token(TokenKind::Gt, ">")
        }
    }

    pub(crate) fn lex_ampersand(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('&') {
            self.make_token(TokenKind::AndAnd, "&&")
        } else if self.cursor.match_char('=') {
            self.make_token(TokenKind::AmpEq, "&=")
        } else {
            self.make_token(TokenKind::Amp, "&")
        }
    }

    pub(crate) fn lex_pipe(&mut self) -> Token {
        self.cursor.advance();
        if self.cursor.match_char('|') {
            self.make_token(TokenKind::OrOr, "||")
        } else if self.cursor.match_char('=') {
            self.make_token(TokenKind::PipeEq, "|=")
        } else {
            self.make_token(TokenKind::Pipe, "|")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmmc_util::Handler;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let handler = Handler::new();
        Lexer::new(source, &handler)
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_compound_assignment_operators() {
        assert_eq!(
            kinds("+= -= *= /= %="),
            vec![
                TokenKind::PlusEq,
                TokenKind::MinusEq,
                TokenKind::StarEq,
                TokenKind::SlashEq,
                TokenKind::PercentEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(
            kinds("< <= > >= == !="),
            vec![
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Gt,
                TokenKind::Ge,
                TokenKind::EqEq,
                TokenKind::Ne,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_logical_and_bitwise() {
        assert_eq!(
            kinds("&& || & | &= |="),
            vec![
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Amp,
                TokenKind::Pipe,
                TokenKind::AmpEq,
                TokenKind::PipeEq,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_increment_decrement() {
        assert_eq!(
            kinds("++ -- + -"),
            vec![
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::Plus,
                TokenKind::Minus,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_adjacent_operators_split_greedily() {
        // `a<=b` : identifier, <=, identifier
        assert_eq!(
            kinds("a<=b"),
            vec![
                TokenKind::Identifier,
                TokenKind::Le,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }
}
