//! cmmc-lex - Lexical analyzer.
//!
//! Transforms a source string into a finite token sequence ending in `Eof`.
//! The lexer is a direct-coded state machine: each token category has its
//! own small DFA (numbers with base selection and exponents, identifiers
//! with keyword lookup, char/string literals with escapes, `/` vs the two
//! comment forms, operators with one-character lookahead).
//!
//! Malformed input never stops the lexer: it produces an `Illegal` token
//! carrying the best-effort lexeme, reports a diagnostic into the caller's
//! [`Handler`], and continues at the next character. Comments are real
//! tokens with their own kind-codes; the driver filters them out before
//! parsing.
//!
//! # Examples
//!
//! ```
//! use cmmc_lex::{tokenize, TokenKind};
//! use cmmc_util::Handler;
//!
//! let handler = Handler::new();
//! let tokens = tokenize("var int x = 0x1F;", &handler);
//! assert!(!handler.has_errors());
//! assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
//! ```

pub mod cursor;
mod lexer;
pub mod token;

pub use lexer::{decode_char, Lexer};
pub use token::{Token, TokenKind};

use cmmc_util::Handler;

/// Lexes a whole source string into a token list ending in `Eof`.
///
/// Errors accumulate into `handler`; the returned list is complete either
/// way.
pub fn tokenize(source: &str, handler: &Handler) -> Vec<Token> {
    Lexer::new(source, handler).collect()
}

/// Removes comment tokens. Later stages never see them.
pub fn strip_comments(tokens: Vec<Token>) -> Vec<Token> {
    tokens.into_iter().filter(|t| !t.kind.is_comment()).collect()
}

/// Renders the token dump: one `line:col  kind-code  lexeme` line per token.
pub fn dump_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    for tok in tokens {
        out.push_str(&format!("{}  {}  {}\n", tok.pos, tok.kind.code(), tok.lexeme));
    }
    out
}

#[cfg(test)]
mod edge_cases;

#[cfg(test)]
mod tests {
    use super::*;
    use cmmc_util::Handler;

    #[test]
    fn test_tokenize_ends_in_eof() {
        let handler = Handler::new();
        let tokens = tokenize("int f();", &handler);
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }

    #[test]
    fn test_strip_comments() {
        let handler = Handler::new();
        let tokens = tokenize("a // c\n/* d */ b", &handler);
        let stripped = strip_comments(tokens);
        let kinds: Vec<_> = stripped.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Identifier, TokenKind::Identifier, TokenKind::Eof]
        );
    }

    #[test]
    fn test_dump_format() {
        let handler = Handler::new();
        let tokens = tokenize("x=1;", &handler);
        let dump = dump_tokens(&tokens);
        let lines: Vec<_> = dump.lines().collect();
        assert_eq!(lines[0], "1:0  700  x");
        assert_eq!(lines[1], "1:1  230  =");
        assert_eq!(lines[2], "1:2  400  1");
        assert_eq!(lines[3], "1:3  303  ;");
        assert_eq!(lines[4], "1:4  -1  ");
    }

    #[test]
    fn test_errors_do_not_stop_lexing() {
        let handler = Handler::new();
        let tokens = tokenize("x # y", &handler);
        assert!(handler.has_errors());
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::Illegal,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }
}
