//! Token definitions and the static grammar tables.
//!
//! The punctuator and keyword tables are stored sorted by lexeme so the
//! scanner can resolve the longest match by walking a first-byte range
//! backwards.

use std::fmt;
use std::rc::Rc;

/// Reserved words of the language.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Abs,
    Ceil,
    Floor,
    Fma,
    Iceil,
    Ifloor,
    Iround,
    Isinf,
    Isnan,
    Itrunc,
    Round,
    Signb,
    Sqrt,
    Trunc,
    And,
    Assert,
    Break,
    Case,
    Catch,
    Const,
    Continue,
    Default,
    Defer,
    Do,
    Each,
    Else,
    False,
    For,
    Func,
    If,
    Infinity,
    Lengthof,
    Nan,
    Not,
    Null,
    Or,
    Return,
    Switch,
    This,
    Throw,
    True,
    Try,
    Typeof,
    Unset,
    Var,
    While,
}

/// Keyword table, sorted by lexeme.
pub(crate) static KEYWORDS: &[(&str, Keyword)] = &[
    ("__abs", Keyword::Abs),
    ("__ceil", Keyword::Ceil),
    ("__floor", Keyword::Floor),
    ("__fma", Keyword::Fma),
    ("__iceil", Keyword::Iceil),
    ("__ifloor", Keyword::Ifloor),
    ("__iround", Keyword::Iround),
    ("__isinf", Keyword::Isinf),
    ("__isnan", Keyword::Isnan),
    ("__itrunc", Keyword::Itrunc),
    ("__round", Keyword::Round),
    ("__signb", Keyword::Signb),
    ("__sqrt", Keyword::Sqrt),
    ("__trunc", Keyword::Trunc),
    ("and", Keyword::And),
    ("assert", Keyword::Assert),
    ("break", Keyword::Break),
    ("case", Keyword::Case),
    ("catch", Keyword::Catch),
    ("const", Keyword::Const),
    ("continue", Keyword::Continue),
    ("default", Keyword::Default),
    ("defer", Keyword::Defer),
    ("do", Keyword::Do),
    ("each", Keyword::Each),
    ("else", Keyword::Else),
    ("false", Keyword::False),
    ("for", Keyword::For),
    ("func", Keyword::Func),
    ("if", Keyword::If),
    ("infinity", Keyword::Infinity),
    ("lengthof", Keyword::Lengthof),
    ("nan", Keyword::Nan),
    ("not", Keyword::Not),
    ("null", Keyword::Null),
    ("or", Keyword::Or),
    ("return", Keyword::Return),
    ("switch", Keyword::Switch),
    ("this", Keyword::This),
    ("throw", Keyword::Throw),
    ("true", Keyword::True),
    ("try", Keyword::Try),
    ("typeof", Keyword::Typeof),
    ("unset", Keyword::Unset),
    ("var", Keyword::Var),
    ("while", Keyword::While),
];

impl Keyword {
    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, kw)| *kw == self)
            .map(|(text, _)| *text)
            .unwrap_or("")
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operators and delimiters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Punctuator {
    Not,              // !
    NotEq,            // !=
    Percent,          // %
    PercentEq,        // %=
    Amp,              // &
    AmpAmp,           // &&
    AmpAmpEq,         // &&=
    AmpEq,            // &=
    LeftParen,        // (
    RightParen,       // )
    Star,             // *
    StarEq,           // *=
    Plus,             // +
    PlusPlus,         // ++
    PlusEq,           // +=
    Comma,            // ,
    Minus,            // -
    MinusMinus,       // --
    MinusEq,          // -=
    Dot,              // .
    DotDotDot,        // ...
    Slash,            // /
    SlashEq,          // /=
    Colon,            // :
    Semicolon,        // ;
    Lt,               // <
    LtLt,             // <<
    LtLtLt,           // <<<
    LtLtLtEq,         // <<<=
    LtLtEq,           // <<=
    LtEq,             // <=
    Spaceship,        // <=>
    Eq,               // =
    EqEq,             // ==
    Gt,               // >
    GtEq,             // >=
    GtGt,             // >>
    GtGtEq,           // >>=
    GtGtGt,           // >>>
    GtGtGtEq,         // >>>=
    Question,         // ?
    QuestionEq,       // ?=
    DoubleQuestion,   // ??
    DoubleQuestionEq, // ??=
    LeftBracket,      // [
    RightBracket,     // ]
    Caret,            // ^
    CaretEq,          // ^=
    LeftBrace,        // {
    Pipe,             // |
    PipeEq,           // |=
    PipePipe,         // ||
    PipePipeEq,       // ||=
    RightBrace,       // }
    Tilde,            // ~
}

/// Punctuator table, sorted by lexeme. For two adjacent entries X and Y,
/// X may be a prefix of Y, so the scanner walks a first-byte range backwards
/// to find the longest match first.
pub(crate) static PUNCTUATORS: &[(&str, Punctuator)] = &[
    ("!", Punctuator::Not),
    ("!=", Punctuator::NotEq),
    ("%", Punctuator::Percent),
    ("%=", Punctuator::PercentEq),
    ("&", Punctuator::Amp),
    ("&&", Punctuator::AmpAmp),
    ("&&=", Punctuator::AmpAmpEq),
    ("&=", Punctuator::AmpEq),
    ("(", Punctuator::LeftParen),
    (")", Punctuator::RightParen),
    ("*", Punctuator::Star),
    ("*=", Punctuator::StarEq),
    ("+", Punctuator::Plus),
    ("++", Punctuator::PlusPlus),
    ("+=", Punctuator::PlusEq),
    (",", Punctuator::Comma),
    ("-", Punctuator::Minus),
    ("--", Punctuator::MinusMinus),
    ("-=", Punctuator::MinusEq),
    (".", Punctuator::Dot),
    ("...", Punctuator::DotDotDot),
    ("/", Punctuator::Slash),
    ("/=", Punctuator::SlashEq),
    (":", Punctuator::Colon),
    (";", Punctuator::Semicolon),
    ("<", Punctuator::Lt),
    ("<<", Punctuator::LtLt),
    ("<<<", Punctuator::LtLtLt),
    ("<<<=", Punctuator::LtLtLtEq),
    ("<<=", Punctuator::LtLtEq),
    ("<=", Punctuator::LtEq),
    ("<=>", Punctuator::Spaceship),
    ("=", Punctuator::Eq),
    ("==", Punctuator::EqEq),
    (">", Punctuator::Gt),
    (">=", Punctuator::GtEq),
    (">>", Punctuator::GtGt),
    (">>=", Punctuator::GtGtEq),
    (">>>", Punctuator::GtGtGt),
    (">>>=", Punctuator::GtGtGtEq),
    ("?", Punctuator::Question),
    ("?=", Punctuator::QuestionEq),
    ("??", Punctuator::DoubleQuestion),
    ("??=", Punctuator::DoubleQuestionEq),
    ("[", Punctuator::LeftBracket),
    ("]", Punctuator::RightBracket),
    ("^", Punctuator::Caret),
    ("^=", Punctuator::CaretEq),
    ("{", Punctuator::LeftBrace),
    ("|", Punctuator::Pipe),
    ("|=", Punctuator::PipeEq),
    ("||", Punctuator::PipePipe),
    ("||=", Punctuator::PipePipeEq),
    ("}", Punctuator::RightBrace),
    ("~", Punctuator::Tilde),
];

impl Punctuator {
    pub fn as_str(self) -> &'static str {
        PUNCTUATORS
            .iter()
            .find(|(_, p)| *p == self)
            .map(|(text, _)| *text)
            .unwrap_or("")
    }
}

impl fmt::Display for Punctuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The payload of a token.
#[derive(Clone, Debug, PartialEq)]
pub enum TokenPayload {
    Keyword(Keyword),
    Punctuator(Punctuator),
    Identifier(String),
    /// Decoded bytes; escape sequences have already been processed where
    /// applicable. Not necessarily valid UTF-8.
    StringLiteral(Vec<u8>),
    IntegerLiteral(i64),
    RealLiteral(f64),
}

/// A single token with its source position.
///
/// `offset` is the 0-based byte offset within `line`; `length` is the byte
/// length of the lexeme. Adjacent tokens on one line never overlap.
#[derive(Clone, Debug)]
pub struct Token {
    pub file: Rc<str>,
    pub line: u32,
    pub offset: usize,
    pub length: usize,
    pub payload: TokenPayload,
}

impl Token {
    pub fn is_keyword(&self) -> bool {
        matches!(self.payload, TokenPayload::Keyword(_))
    }

    pub fn as_keyword(&self) -> Option<Keyword> {
        match self.payload {
            TokenPayload::Keyword(kw) => Some(kw),
            _ => None,
        }
    }

    pub fn is_punctuator(&self) -> bool {
        matches!(self.payload, TokenPayload::Punctuator(_))
    }

    pub fn as_punctuator(&self) -> Option<Punctuator> {
        match self.payload {
            TokenPayload::Punctuator(p) => Some(p),
            _ => None,
        }
    }
}

fn write_escaped_string(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("\"")?;
    for &b in bytes {
        match b {
            b'"' => f.write_str("\\\"")?,
            b'\\' => f.write_str("\\\\")?,
            0x07 => f.write_str("\\a")?,
            0x08 => f.write_str("\\b")?,
            0x0C => f.write_str("\\f")?,
            b'\n' => f.write_str("\\n")?,
            b'\r' => f.write_str("\\r")?,
            b'\t' => f.write_str("\\t")?,
            0x0B => f.write_str("\\v")?,
            0x00 => f.write_str("\\0")?,
            0x1A => f.write_str("\\Z")?,
            0x1B => f.write_str("\\e")?,
            0x20..=0x7E => write!(f, "{}", b as char)?,
            _ => write!(f, "\\x{:02X}", b)?,
        }
    }
    f.write_str("\"")
}

impl fmt::Display for TokenPayload {
    /// Prints a canonical lexeme: lexing the output reproduces the payload.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenPayload::Keyword(kw) => write!(f, "{}", kw),
            TokenPayload::Punctuator(p) => write!(f, "{}", p),
            TokenPayload::Identifier(name) => f.write_str(name),
            TokenPayload::StringLiteral(bytes) => write_escaped_string(f, bytes),
            TokenPayload::IntegerLiteral(value) => write!(f, "{}", value),
            TokenPayload::RealLiteral(value) => {
                if value.is_nan() {
                    f.write_str("nan")
                } else if value.is_infinite() {
                    f.write_str(if *value < 0.0 { "-infinity" } else { "infinity" })
                } else {
                    // Shortest round-trip form, forced to carry a fraction so
                    // it lexes back as a real (`1e-5` alone would read as an
                    // integer literal with a negative exponent).
                    let mut text = format!("{:?}", value);
                    if !text.contains('.') {
                        match text.find(['e', 'E']) {
                            Some(pos) => text.insert_str(pos, ".0"),
                            None => text.push_str(".0"),
                        }
                    }
                    f.write_str(&text)
                }
            }
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.payload)
    }
}
