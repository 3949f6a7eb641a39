//! Edge-case tests for the lexer.

use crate::{tokenize, TokenKind};
use cmmc_util::Handler;
use proptest::prelude::*;

fn kinds(source: &str) -> Vec<TokenKind> {
    let handler = Handler::new();
    tokenize(source, &handler).iter().map(|t| t.kind).collect()
}

#[test]
fn test_whole_program() {
    let src = "const int MAX = 10;\n\
               int add(int, int);\n\
               main() {\n\
                   var int i;\n\
                   for (i = 0; i < MAX; i = i + 1) { }\n\
                   return;\n\
               }\n\
               int add(int a, int b) { return a + b; }\n";
    let handler = Handler::new();
    let tokens = tokenize(src, &handler);
    assert!(!handler.has_errors());
    assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    // 'main' must have lexed as a keyword, not an identifier.
    assert!(tokens.iter().any(|t| t.kind == TokenKind::KwMain));
}

#[test]
fn test_operators_glued_to_numbers() {
    assert_eq!(
        kinds("1+2"),
        vec![
            TokenKind::Integer,
            TokenKind::Plus,
            TokenKind::Integer,
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_minus_then_number_is_two_tokens() {
    // Negation is resolved by the parser, not the lexer.
    assert_eq!(
        kinds("-5"),
        vec![TokenKind::Minus, TokenKind::Integer, TokenKind::Eof]
    );
}

#[test]
fn test_comment_between_tokens() {
    assert_eq!(
        kinds("a/*x*/=1;"),
        vec![
            TokenKind::Identifier,
            TokenKind::BlockComment,
            TokenKind::Assign,
            TokenKind::Integer,
            TokenKind::Semicolon,
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_crlf_line_endings() {
    let handler = Handler::new();
    let tokens = tokenize("a\r\nb", &handler);
    assert_eq!(tokens[1].pos.line, 2);
}

#[test]
fn test_many_errors_accumulate() {
    let handler = Handler::new();
    let _ = tokenize("# $ ?", &handler);
    assert_eq!(handler.error_count(), 3);
}

#[test]
fn test_division_chain() {
    assert_eq!(
        kinds("a/b/c"),
        vec![
            TokenKind::Identifier,
            TokenKind::Slash,
            TokenKind::Identifier,
            TokenKind::Slash,
            TokenKind::Identifier,
            TokenKind::Eof
        ]
    );
}

proptest! {
    /// Any well-formed identifier that is not a keyword lexes to a single
    /// Identifier token with an unchanged lexeme.
    #[test]
    fn prop_identifier_roundtrip(name in "[a-zA-Z_][a-zA-Z0-9_]{0,16}") {
        prop_assume!(TokenKind::keyword(&name).is_none());
        let handler = Handler::new();
        let tokens = tokenize(&name, &handler);
        prop_assert_eq!(tokens.len(), 2);
        prop_assert_eq!(tokens[0].kind, TokenKind::Identifier);
        prop_assert_eq!(&tokens[0].lexeme, &name);
        prop_assert!(!handler.has_errors());
    }

    /// Any decimal integer literal survives the round trip.
    #[test]
    fn prop_decimal_roundtrip(n in 0u64..=u64::MAX / 2) {
        let text = n.to_string();
        let handler = Handler::new();
        let tokens = tokenize(&text, &handler);
        prop_assert_eq!(tokens[0].kind, TokenKind::Integer);
        prop_assert_eq!(&tokens[0].lexeme, &text);
    }

    /// Lexing arbitrary input never panics and always terminates in Eof.
    #[test]
    fn prop_never_panics(input in "\\PC{0,64}") {
        let handler = Handler::new();
        let tokens = tokenize(&input, &handler);
        prop_assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
    }
}
