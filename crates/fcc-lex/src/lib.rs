//! fcc-lex - Lexical analysis.
//!
//! Transforms a byte-oriented source stream into a token stream. Tokens
//! carry their source position, the original source text, and a decoded
//! value (integer, float, identifier text, or string bytes). Errors go to
//! the shared [`fcc_util::Handler`]; an error token ends the stream.

pub mod lexer;
pub mod reader;
pub mod token;

pub use lexer::Lexer;
pub use reader::Reader;
pub use token::{Token, TokenKind, TokenValue};
