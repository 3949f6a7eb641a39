//! Character and string literal lexing.
//!
//! Both literal forms accept the escape set `\n \r \t \' \" \\ \0`. A raw
//! newline inside either form, or an unterminated literal, yields `Illegal`
//! with the text read so far as the best-effort lexeme.

use crate::token::{Token, TokenKind};
use crate::Lexer;

/// Escape characters legal after a backslash.
fn is_escape(c: char) -> bool {
    matches!(c, 'n' | 'r' | 't' | '\'' | '"' | '\\' | '0')
}

impl Lexer<'_> {
    /// Lexes `'c'` with exactly one plain or escaped character inside.
    pub(crate) fn lex_char(&mut self) -> Token {
        let mut text = String::new();
        text.push(self.cursor.advance().unwrap_or('\0')); // opening quote

        match self.cursor.peek() {
            '\0' | '\n' => {
                self.report_illegal(&text, "newline in character literal");
                return self.make_token(TokenKind::Illegal, text);
            },
            '\\' => {
                text.push(self.cursor.advance().unwrap());
                let esc = self.cursor.peek();
                if is_escape(esc) {
                    text.push(self.cursor.advance().unwrap());
                } else {
                    if esc != '\0' && esc != '\n' {
                        text.push(self.cursor.advance().unwrap());
                    }
                    self.report_illegal(&text, format!("unknown escape '\\{}'", esc));
                    return self.make_token(TokenKind::Illegal, text);
                }
            },
            '\'' => {
                text.push(self.cursor.advance().unwrap());
                self.report_illegal(&text, "empty character literal");
                return self.make_token(TokenKind::Illegal, text);
            },
            _ => text.push(self.cursor.advance().unwrap()),
        }

        if self.cursor.peek() == '\'' {
            text.push(self.cursor.advance().unwrap());
            self.make_token(TokenKind::Character, text)
        } else {
            self.report_illegal(&text, "unterminated character literal");
            self.make_token(TokenKind::Illegal, text)
        }
    }

    /// Lexes `"…"` with the same escape set.
    pub(crate) fn lex_string(&mut self) -> Token {
        let mut text = String::new();
        text.push(self.cursor.advance().unwrap_or('\0')); // opening quote

        loop {
            match self.cursor.peek() {
                '\0' | '\n' => {
                    self.report_illegal(&text, "newline in string literal");
                    return self.make_token(TokenKind::Illegal, text);
                },
                '"' => {
                    text.push(self.cursor.advance().unwrap());
                    return self.make_token(TokenKind::Stringer, text);
                },
                '\\' => {
                    text.push(self.cursor.advance().unwrap());
                    let esc = self.cursor.peek();
                    if is_escape(esc) {
                        text.push(self.cursor.advance().unwrap());
                    } else {
                        if esc != '\0' && esc != '\n' {
                            text.push(self.cursor.advance().unwrap());
                        }
                        self.report_illegal(&text, format!("unknown escape '\\{}'", esc));
                        return self.make_token(TokenKind::Illegal, text);
                    }
                },
                _ => text.push(self.cursor.advance().unwrap()),
            }
        }
    }
}

/// Decodes the payload of a character literal lexeme (quotes included).
///
/// Returns `None` for lexemes that are not a well-formed char literal.
pub fn decode_char(lexeme: &str) -> Option<char> {
    let inner = lexeme.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    let c = match chars.next()? {
        '\\' => match chars.next()? {
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            '0' => '\0',
            other => other,
        },
        plain => plain,
    };
    if chars.next().is_some() {
        return None;
    }
    Some(c)
}
