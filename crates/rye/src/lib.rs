//! Embeddable core of the Rye scripting language.
//!
//! Re-exports the lexer and the runtime so embedders depend on one crate:
//! feed source bytes to [`lex`], allocate [`Variable`] cells from a
//! [`GarbageCollector`], and build [`Value`]s over them.

pub mod diagnostics;

pub use rye_lexer::{
    Keyword, LexerOptions, ParseError, ParseErrorCode, Punctuator, Token, TokenPayload,
    TokenStream, lex,
};
pub use rye_runtime::{
    Closure, GENERATION_COUNT, GarbageCollector, Generation, ObjectMap, Value, VarRef, Variable,
};
