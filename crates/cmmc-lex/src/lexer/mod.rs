//! Lexer module.
//!
//! The implementation is split into focused pieces:
//! - `core` - the `Lexer` struct and dispatch
//! - `identifier` - identifiers and the keyword table
//! - `number` - numeric literals (bases, fractions, exponents)
//! - `string` - character and string literals with escapes
//! - `operator` - one- and two-character operators
//! - `comment` - division vs line/block comments

mod comment;
mod core;
mod identifier;
mod number;
mod operator;
mod string;

pub use core::Lexer;
pub use string::decode_char;
