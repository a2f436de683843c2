//! Compact, rustc-like diagnostics printed to stderr.
//!
//! Intentionally lightweight: a red "error:" header, the file position, the
//! offending source line and a caret run under the reported span.

use rye_lexer::ParseError;

const RED: &str = "\x1b[31m";
const BLUE: &str = "\x1b[34m";
const RESET: &str = "\x1b[0m";

/// Print a plain error with an optional note.
pub fn report_error(file: Option<&str>, message: &str, note: Option<&str>) {
    if let Some(path) = file {
        eprintln!("{}error{}: {}", RED, RESET, message);
        eprintln!("  --> {}", path);
    } else {
        eprintln!("{}error{}: {}", RED, RESET, message);
    }
    if let Some(note) = note {
        eprintln!("{}note{}: {}", BLUE, RESET, note);
    }
}

/// Print a lexer error against its source text, with a caret marking the
/// reported span.
pub fn report_parse_error(file: &str, source: &[u8], err: &ParseError) {
    eprintln!("{}error{}: {}", RED, RESET, err.code);
    eprintln!("  --> {}:{}:{}", file, err.line, err.offset + 1);

    if err.line == 0 {
        return;
    }
    let Some(line) = source.split(|&b| b == b'\n').nth(err.line as usize - 1) else {
        return;
    };
    eprintln!("{:4} | {}", err.line, String::from_utf8_lossy(line));

    let mut caret = String::new();
    for _ in 0..err.offset.min(line.len()) {
        caret.push(' ');
    }
    for _ in 0..err.length.max(1) {
        caret.push('^');
    }
    eprintln!("     | {}", caret);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rye_lexer::{LexerOptions, lex};

    #[test]
    fn parse_errors_do_not_panic_on_edge_positions() {
        // A zero-position pseudo error and an error past the line end must
        // both render without panicking.
        let source = b"var x = \"abc";
        let err = lex(source, "edge.rye", &LexerOptions::default()).unwrap_err();
        report_parse_error("edge.rye", source, &err);
        report_parse_error("edge.rye", b"", &err);
        report_error(Some("edge.rye"), "boom", Some("context"));
        report_error(None, "boom", None);
    }
}
