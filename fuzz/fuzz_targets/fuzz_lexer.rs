#![no_main]

use libfuzzer_sys::fuzz_target;
use rye_lexer::{LexerOptions, lex};

fuzz_target!(|data: &[u8]| {
    // The lexer must return a stream or a structured error for any input;
    // a panic is a bug. Exercise each single-quote mode.
    let _ = lex(data, "fuzz_input", &LexerOptions::default());
    let escapable = LexerOptions {
        escapable_single_quote_string: true,
        integer_as_real: true,
        ..Default::default()
    };
    let _ = lex(data, "fuzz_input", &escapable);
});
