//! Lexer for the Rye scripting language.
//!
//! Turns raw source bytes into a [`TokenStream`] or a single positioned
//! [`ParseError`]. The scanner works on one line at a time, resolves
//! punctuators by longest match, decodes string escapes, merges contiguous
//! sign punctuators into numeric literals where the grammar allows it, and
//! evaluates integer and real literals exactly.

mod error;
mod reader;
mod scan;
mod stream;
mod token;

pub use error::{ParseError, ParseErrorCode};
pub use stream::{LexerOptions, TokenStream, lex};
pub use token::{Keyword, Punctuator, Token, TokenPayload};
