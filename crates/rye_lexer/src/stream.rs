//! The token stream and its loader.

use std::rc::Rc;

use crate::error::{ParseError, ParseErrorCode};
use crate::reader::{LineReader, Tack};
use crate::scan;
use crate::token::Token;

/// Recognized lexer configuration.
#[derive(Clone, Copy, Debug, Default)]
pub struct LexerOptions {
    /// Treat otherwise-reserved words as plain identifiers.
    pub keyword_as_identifier: bool,
    /// Force every numeric literal to become a real.
    pub integer_as_real: bool,
    /// Interpret `'...'` with the same escape rules as `"..."`. When off,
    /// `'...'` is a raw byte literal terminated by the next `'`.
    pub escapable_single_quote_string: bool,
}

#[derive(Debug)]
enum StreamState {
    Empty,
    Error(ParseError),
    /// Tokens in reverse source order, so the next token is the last element
    /// and `pop` is O(1).
    Success(Vec<Token>),
}

/// A lexed token sequence, or the error that prevented one.
///
/// The stream is in one of three states: empty (nothing loaded yet), error
/// (the last load failed and the error is retained), or success. In the empty
/// and error states `peek`/`pop` return `None` and the stream reports itself
/// empty.
#[derive(Debug)]
pub struct TokenStream {
    stor: StreamState,
}

impl Default for TokenStream {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStream {
    pub fn new() -> Self {
        Self {
            stor: StreamState::Empty,
        }
    }

    /// Tokenizes `source` and replaces the stream contents. On failure the
    /// stream transitions to the error state and retains the error.
    pub fn load(
        &mut self,
        source: &[u8],
        file: &str,
        options: &LexerOptions,
    ) -> Result<(), ParseError> {
        self.stor = StreamState::Empty;
        match do_load(source, file, options) {
            Ok(mut seq) => {
                seq.reverse();
                self.stor = StreamState::Success(seq);
                Ok(())
            }
            Err(err) => {
                self.stor = StreamState::Error(err);
                Err(err)
            }
        }
    }

    pub fn clear(&mut self) {
        self.stor = StreamState::Empty;
    }

    /// The status of the last load: `no_data_loaded` when nothing has been
    /// loaded, the stored error after a failed load, `success` otherwise.
    pub fn parser_error(&self) -> ParseError {
        match &self.stor {
            StreamState::Empty => ParseError::new(0, 0, 0, ParseErrorCode::NoDataLoaded),
            StreamState::Error(err) => *err,
            StreamState::Success(_) => ParseError::new(0, 0, 0, ParseErrorCode::Success),
        }
    }

    pub fn is_empty(&self) -> bool {
        match &self.stor {
            StreamState::Empty | StreamState::Error(_) => true,
            StreamState::Success(seq) => seq.is_empty(),
        }
    }

    /// The next token without consuming it.
    pub fn peek(&self) -> Option<&Token> {
        match &self.stor {
            StreamState::Success(seq) => seq.last(),
            _ => None,
        }
    }

    /// Consumes and returns the next token.
    pub fn pop(&mut self) -> Option<Token> {
        match &mut self.stor {
            StreamState::Success(seq) => seq.pop(),
            _ => None,
        }
    }
}

/// Tokenizes `source`, returning a ready stream or the first error.
pub fn lex(source: &[u8], file: &str, options: &LexerOptions) -> Result<TokenStream, ParseError> {
    let mut stream = TokenStream::new();
    stream.load(source, file, options)?;
    Ok(stream)
}

/// Validates one line as UTF-8 without embedded NUL.
fn validate_line(reader: &LineReader<'_>) -> Result<(), ParseError> {
    let data = reader.data();
    if let Err(err) = std::str::from_utf8(data) {
        let length = err.error_len().unwrap_or(data.len() - err.valid_up_to());
        return Err(ParseError::new(
            reader.line(),
            err.valid_up_to(),
            length,
            ParseErrorCode::Utf8SequenceInvalid,
        ));
    }
    if let Some(pos) = data.iter().position(|&b| b == 0) {
        return Err(ParseError::new(
            reader.line(),
            pos,
            1,
            ParseErrorCode::NullCharacterDisallowed,
        ));
    }
    Ok(())
}

fn do_load(source: &[u8], file: &str, options: &LexerOptions) -> Result<Vec<Token>, ParseError> {
    let file: Rc<str> = Rc::from(file);
    let mut seq = Vec::new();
    // Position of an unterminated block comment, if one is open.
    let mut bcomm = Tack::default();
    let mut reader = LineReader::new(source);
    while reader.advance() {
        // Discard the first line if it looks like a shebang.
        if reader.line() == 1 && reader.data().starts_with(b"#!") {
            continue;
        }
        validate_line(&reader)?;
        while reader.avail() != 0 {
            if bcomm.is_set() {
                // Inside a block comment: search for its terminator; the rest
                // of the line is not tokenized.
                let data = reader.data();
                match data.windows(2).position(|w| w == b"*/") {
                    None => {
                        reader.consume(reader.avail());
                        break;
                    }
                    Some(pos) => {
                        bcomm.clear();
                        reader.consume(pos + 2);
                        continue;
                    }
                }
            }
            let head = reader.peek(0);
            if b" \t\x0B\x0C\r\n".contains(&head) {
                reader.consume(1);
                continue;
            }
            if head == b'/' {
                let next = reader.peek(1);
                if next == b'/' {
                    // Line comment: discard the rest of the line.
                    reader.consume(reader.avail());
                    break;
                }
                if next == b'*' {
                    bcomm.set(&reader, 2);
                    reader.consume(2);
                    continue;
                }
            }
            let token_got = scan::accept_punctuator(&mut seq, &mut reader, &file)
                || scan::accept_string_literal(&mut seq, &mut reader, &file, b'"', true)?
                || scan::accept_string_literal(
                    &mut seq,
                    &mut reader,
                    &file,
                    b'\'',
                    options.escapable_single_quote_string,
                )?
                || scan::accept_identifier_or_keyword(
                    &mut seq,
                    &mut reader,
                    &file,
                    options.keyword_as_identifier,
                )
                || scan::accept_numeric_literal(
                    &mut seq,
                    &mut reader,
                    &file,
                    options.integer_as_real,
                )?;
            if !token_got {
                return Err(ParseError::new(
                    reader.line(),
                    reader.offset(),
                    1,
                    ParseErrorCode::TokenCharacterUnrecognized,
                ));
            }
        }
    }
    if bcomm.is_set() {
        // A block comment may straddle multiple lines; report the opening.
        return Err(ParseError::new(
            bcomm.line(),
            bcomm.offset(),
            bcomm.length(),
            ParseErrorCode::BlockCommentUnclosed,
        ));
    }
    Ok(seq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenPayload;

    #[test]
    fn fresh_stream_reports_no_data() {
        let stream = TokenStream::new();
        assert!(stream.is_empty());
        assert_eq!(stream.parser_error().code, ParseErrorCode::NoDataLoaded);
        assert!(stream.peek().is_none());
    }

    #[test]
    fn successful_load_reports_success() {
        let stream = lex(b"1", "test", &LexerOptions::default()).unwrap();
        assert_eq!(stream.parser_error().code, ParseErrorCode::Success);
        assert!(!stream.is_empty());
    }

    #[test]
    fn failed_load_retains_the_error_and_reads_as_empty() {
        let mut stream = TokenStream::new();
        let err = stream
            .load(b"\"unterminated", "test", &LexerOptions::default())
            .unwrap_err();
        assert_eq!(err.code, ParseErrorCode::StringLiteralUnclosed);
        assert_eq!(stream.parser_error(), err);
        assert!(stream.is_empty());
        assert!(stream.peek().is_none());
        assert!(stream.pop().is_none());
    }

    #[test]
    fn clear_resets_to_empty() {
        let mut stream = lex(b"1 2", "test", &LexerOptions::default()).unwrap();
        assert!(!stream.is_empty());
        stream.clear();
        assert!(stream.is_empty());
        assert_eq!(stream.parser_error().code, ParseErrorCode::NoDataLoaded);
    }

    #[test]
    fn tokens_come_out_in_source_order() {
        let mut stream = lex(b"var x ;", "test", &LexerOptions::default()).unwrap();
        let first = stream.pop().unwrap();
        assert!(matches!(first.payload, TokenPayload::Keyword(_)));
        let second = stream.pop().unwrap();
        assert_eq!(second.payload, TokenPayload::Identifier("x".to_string()));
        let third = stream.pop().unwrap();
        assert!(third.is_punctuator());
        assert!(stream.pop().is_none());
    }
}
