//! Numeric literal lexing.
//!
//! A leading `0` opens base selection: `0b`/`0B` binary, `0x`/`0X` hex,
//! `0` followed by an octal digit octal, `0.` a decimal fraction, bare `0`
//! the integer zero. Any other leading digit starts a decimal number, with
//! an optional fraction and an optional `e`/`E` exponent (hex numbers use
//! `p`/`P`). Malformed forms produce an `Illegal` token carrying the
//! best-effort lexeme; the delimiter that terminated the scan is pushed
//! back so the caller sees it again.

use crate::lexer::core::is_ident_continue;
use crate::token::{Token, TokenKind};
use crate::Lexer;

impl Lexer<'_> {
    /// Lexes a numeric literal. The cursor sits on the first digit.
    pub(crate) fn lex_number(&mut self) -> Token {
        let mut text = String::new();
        let first = self.cursor.advance().unwrap_or('\0');
        text.push(first);

        if first == '0' {
            match self.cursor.peek() {
                'b' | 'B' => {
                    text.push(self.cursor.advance().unwrap());
                    return self.lex_radix(text, 2, TokenKind::Bin);
                },
                'x' | 'X' => {
                    text.push(self.cursor.advance().unwrap());
                    return self.lex_radix(text, 16, TokenKind::Hex);
                },
                '0'..='7' => {
                    self.collect_digits(&mut text, 8);
                    return self.finish_number(text, TokenKind::Oct);
                },
                '.' | 'e' | 'E' => {
                    // falls through to the decimal path below
                },
                _ => return self.finish_number(text, TokenKind::Integer),
            }
        } else {
            self.collect_digits(&mut text, 10);
        }

        // Optional fraction: only when a digit follows the dot, so that
        // `f(1).x` style input does not swallow the dot.
        let mut kind = TokenKind::Integer;
        if self.cursor.peek() == '.' && self.cursor.peek_at(1).is_ascii_digit() {
            text.push(self.cursor.advance().unwrap());
            self.collect_digits(&mut text, 10);
            kind = TokenKind::FloatNumber;
        }

        // Optional exponent: e|E, optional sign, then at least one digit.
        if matches!(self.cursor.peek(), 'e' | 'E') {
            text.push(self.cursor.advance().unwrap());
            if matches!(self.cursor.peek(), '+' | '-') {
                text.push(self.cursor.advance().unwrap());
            }
            if !self.cursor.peek().is_ascii_digit() {
                self.report_illegal(&text, "exponent has no digits");
                return self.make_token(TokenKind::Illegal, text);
            }
            self.collect_digits(&mut text, 10);
            kind = TokenKind::Exponent;
        }

        self.finish_number(text, kind)
    }

    /// Lexes the digit run of a based literal (`0b…`, `0x…`), including a
    /// hex binary exponent `p`/`P`.
    fn lex_radix(&mut self, mut text: String, radix: u32, kind: TokenKind) -> Token {
        let before = text.len();
        self.collect_digits(&mut text, radix);
        if text.len() == before {
            self.report_illegal(&text, format!("no digits after base-{} prefix", radix));
            return self.make_token(TokenKind::Illegal, text);
        }

        if radix == 16 && matches!(self.cursor.peek(), 'p' | 'P') {
            text.push(self.cursor.advance().unwrap());
            if matches!(self.cursor.peek(), '+' | '-') {
                text.push(self.cursor.advance().unwrap());
            }
            if !self.cursor.peek().is_ascii_digit() {
                self.report_illegal(&text, "exponent has no digits");
                return self.make_token(TokenKind::Illegal, text);
            }
            self.collect_digits(&mut text, 10);
            return self.finish_number(text, TokenKind::Exponent);
        }

        self.finish_number(text, kind)
    }

    /// Collects characters that are digits in `radix`, using the cursor's
    /// look-back to leave the terminating delimiter unconsumed.
    fn collect_digits(&mut self, text: &mut String, radix: u32) {
        while let Some(c) = self.cursor.advance() {
            if c.is_digit(radix) {
                text.push(c);
            } else {
                self.cursor.backup();
                break;
            }
        }
    }

    /// Final validity check: a number must terminate at whitespace, an
    /// operator or punctuation. An identifier character glued to the end
    /// (e.g. `12ab`, `0o19`) turns the whole run into `Illegal`.
    fn finish_number(&mut self, mut text: String, kind: TokenKind) -> Token {
        if is_ident_continue(self.cursor.peek()) || self.cursor.peek().is_ascii_digit() {
            while let Some(c) = self.cursor.advance() {
                if is_ident_continue(c) {
                    text.push(c);
                } else {
                    self.cursor.backup();
                    break;
                }
            }
            self.report_illegal(&text, "malformed number");
            return self.make_token(TokenKind::Illegal, text);
        }
        self.make_token(kind, text)
    }
}
