//! Token acceptors.
//!
//! Each `accept_*` function inspects the unconsumed bytes of the current line
//! and either emits one token (consuming its bytes), reports that it does not
//! apply, or fails with a positioned [`ParseError`]. The scanner tries them in
//! a fixed order; the first that applies wins.

use std::rc::Rc;

use crate::error::{ParseError, ParseErrorCode};
use crate::reader::LineReader;
use crate::token::{KEYWORDS, Keyword, PUNCTUATORS, Punctuator, Token, TokenPayload};

fn error_at(reader: &LineReader<'_>, length: usize, code: ParseErrorCode) -> ParseError {
    ParseError::new(reader.line(), reader.offset(), length, code)
}

fn push_token(
    seq: &mut Vec<Token>,
    reader: &mut LineReader<'_>,
    file: &Rc<str>,
    length: usize,
    payload: TokenPayload,
) {
    seq.push(Token {
        file: file.clone(),
        line: reader.line(),
        offset: reader.offset(),
        length,
        payload,
    });
    reader.consume(length);
}

/// Appends the UTF-8 encoding of `cp` to `out`. Fails for surrogates and code
/// points above 0x10FFFF.
pub(crate) fn utf8_encode(out: &mut Vec<u8>, cp: u32) -> bool {
    match char::from_u32(cp) {
        Some(c) => {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            true
        }
        None => false,
    }
}

fn base_digit(b: u8, base: u32) -> Option<u32> {
    let value = match b {
        b'0'..=b'9' => (b - b'0') as u32,
        b'a'..=b'f' => (b - b'a' + 10) as u32,
        b'A'..=b'F' => (b - b'A' + 10) as u32,
        _ => return None,
    };
    (value < base).then_some(value)
}

/// A digit of the given base, or the `` ` `` separator.
fn is_literal_digit(b: u8, base: u32) -> bool {
    b == b'`' || base_digit(b, base).is_some()
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_'
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

pub(crate) fn accept_punctuator(
    seq: &mut Vec<Token>,
    reader: &mut LineReader<'_>,
    file: &Rc<str>,
) -> bool {
    const PUNCT_CHARS: &[u8] = b"!%&()*+,-./:;<=>?[]^{|}~";
    let data = reader.data();
    let Some(&first) = data.first() else {
        return false;
    };
    if !PUNCT_CHARS.contains(&first) {
        return false;
    }
    // Entries sharing a first byte are sorted with prefixes in front, so the
    // range is walked backwards: the first entry that matches is the longest.
    let lo = PUNCTUATORS.partition_point(|(text, _)| text.as_bytes()[0] < first);
    let hi = PUNCTUATORS.partition_point(|(text, _)| text.as_bytes()[0] <= first);
    for &(text, punct) in PUNCTUATORS[lo..hi].iter().rev() {
        if data.starts_with(text.as_bytes()) {
            push_token(seq, reader, file, text.len(), TokenPayload::Punctuator(punct));
            return true;
        }
    }
    // Every byte in PUNCT_CHARS has a one-byte entry in the table.
    unreachable!("punctuator `{}` is unhandled", first as char);
}

pub(crate) fn accept_string_literal(
    seq: &mut Vec<Token>,
    reader: &mut LineReader<'_>,
    file: &Rc<str>,
    head: u8,
    escapable: bool,
) -> Result<bool, ParseError> {
    let bptr = reader.data();
    if bptr.first() != Some(&head) {
        return Ok(false);
    }
    let mut tlen = 1usize;
    let mut value = Vec::new();
    if escapable {
        loop {
            let qavail = reader.avail() - tlen;
            if qavail == 0 {
                return Err(error_at(
                    reader,
                    reader.avail(),
                    ParseErrorCode::StringLiteralUnclosed,
                ));
            }
            let mut next = bptr[tlen];
            tlen += 1;
            if next == head {
                break;
            }
            if next != b'\\' {
                value.push(next);
                continue;
            }
            if qavail < 2 {
                return Err(error_at(
                    reader,
                    reader.avail(),
                    ParseErrorCode::EscapeSequenceIncomplete,
                ));
            }
            next = bptr[tlen];
            tlen += 1;
            let mut xcnt = 0usize;
            match next {
                b'\'' | b'"' | b'\\' | b'?' => value.push(next),
                b'a' => value.push(0x07),
                b'b' => value.push(0x08),
                b'f' => value.push(0x0C),
                b'n' => value.push(b'\n'),
                b'r' => value.push(b'\r'),
                b't' => value.push(b'\t'),
                b'v' => value.push(0x0B),
                b'0' => value.push(0x00),
                b'Z' => value.push(0x1A),
                b'e' => value.push(0x1B),
                b'x' | b'u' | b'U' => {
                    xcnt = match next {
                        b'x' => 2,
                        b'u' => 4,
                        _ => 6,
                    };
                    if qavail < xcnt + 2 {
                        return Err(error_at(
                            reader,
                            reader.avail(),
                            ParseErrorCode::EscapeSequenceIncomplete,
                        ));
                    }
                    let mut cp: u32 = 0;
                    for i in tlen..tlen + xcnt {
                        let Some(d) = base_digit(bptr[i], 16) else {
                            return Err(error_at(
                                reader,
                                i + 1,
                                ParseErrorCode::EscapeSequenceInvalidHex,
                            ));
                        };
                        cp = cp * 16 + d;
                    }
                    if next == b'x' {
                        // A byte written verbatim; may form invalid UTF-8.
                        value.push(cp as u8);
                    } else if !utf8_encode(&mut value, cp) {
                        return Err(error_at(
                            reader,
                            tlen + xcnt,
                            ParseErrorCode::EscapeUtfCodePointInvalid,
                        ));
                    }
                }
                _ => {
                    return Err(error_at(reader, tlen, ParseErrorCode::EscapeSequenceUnknown));
                }
            }
            tlen += xcnt;
        }
    } else {
        // Raw form: bytes are copied verbatim up to the next quote, with no
        // escape processing whatever.
        match bptr[1..].iter().position(|&b| b == head) {
            None => {
                return Err(error_at(
                    reader,
                    reader.avail(),
                    ParseErrorCode::StringLiteralUnclosed,
                ));
            }
            Some(pos) => {
                value.extend_from_slice(&bptr[1..1 + pos]);
                tlen = pos + 2;
            }
        }
    }
    push_token(seq, reader, file, tlen, TokenPayload::StringLiteral(value));
    Ok(true)
}

pub(crate) fn accept_identifier_or_keyword(
    seq: &mut Vec<Token>,
    reader: &mut LineReader<'_>,
    file: &Rc<str>,
    keyword_as_identifier: bool,
) -> bool {
    let bptr = reader.data();
    let Some(&first) = bptr.first() else {
        return false;
    };
    if !is_name_start(first) {
        return false;
    }
    let tlen = bptr
        .iter()
        .position(|&b| !is_name_char(b))
        .unwrap_or(bptr.len());
    let text = &bptr[..tlen];
    if !keyword_as_identifier
        && let Ok(found) = KEYWORDS.binary_search_by(|(kw, _)| kw.as_bytes().cmp(text))
    {
        let keyword = KEYWORDS[found].1;
        push_token(seq, reader, file, tlen, TokenPayload::Keyword(keyword));
        return true;
    }
    // Name characters are ASCII, so the bytes are valid UTF-8.
    let name = String::from_utf8_lossy(text).into_owned();
    push_token(seq, reader, file, tlen, TokenPayload::Identifier(name));
    true
}

/// Decides whether a `+`/`-` punctuator just before the numeric literal being
/// scanned should be absorbed into it. The sign must be contiguous with the
/// digits on the same line, and the token before the sign must not terminate
/// an expression: merging happens at the start of input, after an
/// infix-eligible punctuator, or after a keyword that does not denote a value.
fn check_mergeability(seq: &[Token], reader: &LineReader<'_>) -> Option<Punctuator> {
    let last = seq.last()?;
    if last.line != reader.line() {
        return None;
    }
    if last.offset + last.length != reader.offset() {
        return None;
    }
    let sign = match last.as_punctuator()? {
        p @ (Punctuator::Plus | Punctuator::Minus) => p,
        _ => return None,
    };
    let Some(prev) = seq.len().checked_sub(2).map(|i| &seq[i]) else {
        return Some(sign);
    };
    if let Some(kw) = prev.as_keyword() {
        let denotes_value = matches!(
            kw,
            Keyword::Null
                | Keyword::True
                | Keyword::False
                | Keyword::Nan
                | Keyword::Infinity
                | Keyword::This
        );
        return (!denotes_value).then_some(sign);
    }
    if let Some(p) = prev.as_punctuator() {
        let terminates = matches!(
            p,
            Punctuator::PlusPlus
                | Punctuator::MinusMinus
                | Punctuator::RightParen
                | Punctuator::RightBracket
                | Punctuator::RightBrace
        );
        return (!terminates).then_some(sign);
    }
    None
}

/// Removes the absorbed sign token (if any), rewinds the reader to its start
/// and returns the length of the merged literal.
fn finish_merge(
    seq: &mut Vec<Token>,
    reader: &mut LineReader<'_>,
    merged: Option<Punctuator>,
    end: usize,
) -> usize {
    let end_abs = reader.offset() + end;
    if merged.is_some()
        && let Some(sign) = seq.pop()
    {
        reader.rewind(sign.offset);
    }
    end_abs - reader.offset()
}

/// 2^e as an f64, exact for e in [-1022, 1023].
fn pow2(e: i32) -> f64 {
    f64::from_bits(((e + 1023) as u64) << 52)
}

/// x * 2^e without spurious overflow or underflow on intermediate steps.
fn ldexp(mut x: f64, mut e: i32) -> f64 {
    while e > 1023 {
        x *= pow2(1023);
        if x.is_infinite() {
            return x;
        }
        e -= 1023;
    }
    while e < -1022 {
        x *= pow2(-1022);
        if x == 0.0 {
            return x;
        }
        e += 1022;
    }
    x * pow2(e)
}

/// x * 10^e in range-limited steps.
fn scale10(mut x: f64, mut e: i32) -> f64 {
    while e > 288 {
        x *= 1e288;
        if x.is_infinite() {
            return x;
        }
        e -= 288;
    }
    while e < -288 {
        x *= 1e-288;
        if x == 0.0 {
            return x;
        }
        e += 288;
    }
    x * 10f64.powi(e)
}

/// Correctly-rounded value of a decimal mantissa with a decimal exponent,
/// via the standard library's float parser.
fn decimal_literal_value(intg: &[u32], frac: &[u32], dec_exp: i32) -> f64 {
    let mut text = String::with_capacity(intg.len() + frac.len() + 8);
    for &d in intg {
        text.push((b'0' + d as u8) as char);
    }
    if text.is_empty() {
        text.push('0');
    }
    if !frac.is_empty() {
        text.push('.');
        for &d in frac {
            text.push((b'0' + d as u8) as char);
        }
    }
    if dec_exp != 0 {
        text.push('e');
        text.push_str(&dec_exp.to_string());
    }
    text.parse::<f64>().unwrap_or(f64::INFINITY)
}

/// Value of a base-2 or base-16 mantissa: an integer mantissa of up to 128
/// bits plus a binary scale, rounded once when converted to f64. Digits past
/// the 128-bit window only contribute to the scale.
fn radix_literal_value(intg: &[u32], frac: &[u32], rbase: u32) -> f64 {
    let bits = if rbase == 16 { 4u32 } else { 1u32 };
    let mut mant: u128 = 0;
    let mut scale: i32 = 0;
    for &d in intg {
        if mant >> (128 - bits) != 0 {
            scale += bits as i32;
        } else {
            mant = (mant << bits) | d as u128;
        }
    }
    for &d in frac {
        if mant >> (128 - bits) != 0 {
            break;
        }
        mant = (mant << bits) | d as u128;
        scale -= bits as i32;
    }
    ldexp(mant as f64, scale)
}

pub(crate) fn accept_numeric_literal(
    seq: &mut Vec<Token>,
    reader: &mut LineReader<'_>,
    file: &Rc<str>,
    integer_as_real: bool,
) -> Result<bool, ParseError> {
    let bptr = reader.data();
    let Some(&first) = bptr.first() else {
        return Ok(false);
    };
    if base_digit(first, 10).is_none() {
        return Ok(false);
    }
    let avail = bptr.len();
    let at = |i: usize| bptr.get(i).copied().unwrap_or(0);
    let scan_digits = |mut i: usize, base: u32| {
        while i < avail && is_literal_digit(at(i), base) {
            i += 1;
        }
        i
    };

    let merged = check_mergeability(seq, reader);
    let rneg = merged == Some(Punctuator::Minus);

    // Base prefix.
    let mut rbase: u32 = 10;
    let mut bintg = 0usize;
    if at(0) == b'0' {
        match at(1) {
            b'B' | b'b' => {
                bintg = 2;
                rbase = 2;
            }
            b'X' | b'x' => {
                bintg = 2;
                rbase = 16;
            }
            _ => {}
        }
    }

    // Integral part (required).
    let eintg = scan_digits(bintg, rbase);
    if eintg == bintg {
        return Err(error_at(reader, eintg, ParseErrorCode::NumericLiteralIncomplete));
    }

    // Fractional part (optional).
    let (bfrac, efrac);
    if at(eintg) == b'.' {
        bfrac = eintg + 1;
        efrac = scan_digits(bfrac, rbase);
        if efrac == bfrac {
            return Err(error_at(reader, efrac, ParseErrorCode::NumericLiteralIncomplete));
        }
    } else {
        bfrac = eintg;
        efrac = eintg;
    }

    // Exponent part (optional): `e`/`E` scales by 10, `p`/`P` scales by 2.
    let mut pbase: u32 = 0;
    let mut pneg = false;
    let mut bexp = efrac;
    let mut eexp = efrac;
    match at(efrac) {
        b'E' | b'e' => {
            bexp += 1;
            pbase = 10;
        }
        b'P' | b'p' => {
            bexp += 1;
            pbase = 2;
        }
        _ => {}
    }
    if bexp != efrac {
        match at(bexp) {
            b'+' => bexp += 1,
            b'-' => {
                bexp += 1;
                pneg = true;
            }
            _ => {}
        }
        eexp = scan_digits(bexp, 10);
        if eexp == bexp {
            return Err(error_at(reader, eexp, ParseErrorCode::NumericLiteralIncomplete));
        }
    }

    // Alphabetic suffixes are reserved.
    if eexp != avail {
        let mut bsfx = eexp;
        while bsfx < avail && (at(bsfx).is_ascii_alphabetic() || at(bsfx) == b'_') {
            bsfx += 1;
        }
        if bsfx != eexp {
            return Err(error_at(
                reader,
                bsfx,
                ParseErrorCode::NumericLiteralSuffixDisallowed,
            ));
        }
    }

    // Exponent value.
    let mut exp: i32 = 0;
    for i in bexp..eexp {
        let Some(d) = base_digit(at(i), 10) else {
            continue;
        };
        let bound = (0x7FFF_FFFF - d as i32) / 10;
        if exp > bound {
            return Err(error_at(
                reader,
                eexp,
                ParseErrorCode::NumericLiteralExponentOverflow,
            ));
        }
        exp = exp * 10 + d as i32;
    }
    if pneg {
        exp = -exp;
    }

    if !integer_as_real && bfrac == efrac {
        // Integer literal.
        if exp < 0 {
            return Err(error_at(
                reader,
                eexp,
                ParseErrorCode::IntegerLiteralExponentNegative,
            ));
        }
        let mut value: u64 = 0;
        for i in bintg..eintg {
            let Some(d) = base_digit(at(i), rbase) else {
                continue;
            };
            // The bound admits `0x1p63`; the sign check below rejects it when
            // no minus was merged.
            let bound = (0x8000_0000_0000_0000u64 - d as u64) / rbase as u64;
            if value > bound {
                return Err(error_at(reader, eexp, ParseErrorCode::IntegerLiteralOverflow));
            }
            value = value * rbase as u64 + d as u64;
        }
        if value != 0 && pbase >= 2 {
            for _ in 0..exp {
                let bound = 0x8000_0000_0000_0000u64 / pbase as u64;
                if value > bound {
                    return Err(error_at(reader, eexp, ParseErrorCode::IntegerLiteralOverflow));
                }
                value *= pbase as u64;
            }
        }
        if value == 0x8000_0000_0000_0000 && !rneg {
            return Err(error_at(reader, eexp, ParseErrorCode::IntegerLiteralOverflow));
        }
        let signed = if rneg {
            (value as i64).wrapping_neg()
        } else {
            value as i64
        };
        let tlen = finish_merge(seq, reader, merged, eexp);
        push_token(seq, reader, file, tlen, TokenPayload::IntegerLiteral(signed));
        return Ok(true);
    }

    // Real literal.
    let mut intg_digits = Vec::with_capacity(eintg - bintg);
    let mut frac_digits = Vec::with_capacity(efrac - bfrac);
    let mut nonzero = false;
    for i in bintg..eintg {
        if let Some(d) = base_digit(at(i), rbase) {
            intg_digits.push(d);
            nonzero |= d != 0;
        }
    }
    for i in bfrac..efrac {
        if let Some(d) = base_digit(at(i), rbase) {
            frac_digits.push(d);
            nonzero |= d != 0;
        }
    }
    let mut value = if rbase == 10 {
        let dec_exp = if pbase == 10 { exp } else { 0 };
        let parsed = decimal_literal_value(&intg_digits, &frac_digits, dec_exp);
        if pbase == 2 { ldexp(parsed, exp) } else { parsed }
    } else {
        let parsed = radix_literal_value(&intg_digits, &frac_digits, rbase);
        match pbase {
            2 => ldexp(parsed, exp),
            10 => scale10(parsed, exp),
            _ => parsed,
        }
    };
    if value.is_infinite() {
        return Err(error_at(reader, eexp, ParseErrorCode::RealLiteralOverflow));
    }
    if value == 0.0 && nonzero {
        return Err(error_at(reader, eexp, ParseErrorCode::RealLiteralUnderflow));
    }
    if rneg {
        value = -value;
    }
    let tlen = finish_merge(seq, reader, merged, eexp);
    push_token(seq, reader, file, tlen, TokenPayload::RealLiteral(value));
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_encode_rejects_surrogates_and_huge_code_points() {
        let mut out = Vec::new();
        assert!(!utf8_encode(&mut out, 0xD800));
        assert!(!utf8_encode(&mut out, 0xDFFF));
        assert!(!utf8_encode(&mut out, 0x110000));
        assert!(out.is_empty());
        assert!(utf8_encode(&mut out, 0x4E2D));
        assert_eq!(out, [0xE4, 0xB8, 0xAD]);
    }

    #[test]
    fn ldexp_avoids_intermediate_saturation() {
        assert_eq!(ldexp(1.0, 10), 1024.0);
        assert_eq!(ldexp(8.0, -3), 1.0);
        // 2^1024 * 2^-1 stays finite even though 2^1024 alone does not.
        assert!(ldexp(pow2(1000), -2000).is_finite());
        assert!(ldexp(1.0, 2000).is_infinite());
        assert_eq!(ldexp(1.0, -3000), 0.0);
    }

    #[test]
    fn decimal_value_is_correctly_rounded() {
        assert_eq!(decimal_literal_value(&[1], &[2, 5], 0), 1.25);
        assert_eq!(decimal_literal_value(&[1], &[], 3), 1000.0);
        assert_eq!(decimal_literal_value(&[1], &[1], -1), 0.11);
    }

    #[test]
    fn radix_value_handles_integral_and_fraction() {
        // 0x1.8 == 1.5
        assert_eq!(radix_literal_value(&[1], &[8], 16), 1.5);
        // 0b10.01 == 2.25
        assert_eq!(radix_literal_value(&[1, 0], &[0, 1], 2), 2.25);
        assert_eq!(radix_literal_value(&[0xF, 0xF], &[], 16), 255.0);
    }
}
