//! Identifier and keyword lexing.

use crate::lexer::core::is_ident_continue;
use crate::token::{Token, TokenKind};
use crate::Lexer;

impl Lexer<'_> {
    /// Lexes `[A-Za-z_][A-Za-z0-9_]*` and resolves keywords.
    ///
    /// The final lexeme is looked up in the keyword table; on a hit the
    /// keyword kind wins, otherwise the token is an identifier.
    pub(crate) fn lex_identifier(&mut self) -> Token {
        let mut text = String::new();
        while let Some(c) = self.cursor.advance() {
            if is_ident_continue(c) {
                text.push(c);
            } else {
                self.cursor.backup();
                break;
            }
        }

        match TokenKind::keyword(&text) {
            Some(kind) => self.make_token(kind, text),
            None => self.make_token(TokenKind::Identifier, text),
        }
    }
}
