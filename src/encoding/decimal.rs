//! # Exact Decimal Text for f64
//!
//! [`format_decimal`] writes the shortest plain decimal text (no exponent)
//! that parses back to the identical `f64`; [`parse_decimal`] is the matching
//! parser. For every finite `d`:
//!
//! ```text
//! parse_decimal(format_decimal(d)).to_bits() == d.to_bits()
//! ```
//!
//! ## Tokens
//!
//! | Value        | Text          |
//! |--------------|---------------|
//! | NaN          | `NaN`         |
//! | +infinity    | `Infinity`    |
//! | -infinity    | `-Infinity`   |
//! | +0.0 / -0.0  | `0` / `-0`    |
//!
//! ## Digit Generation
//!
//! The value is decomposed into `m * 2^e` with `m` odd.
//!
//! - `e >= 0`: the value is the integer `m << e`, exact in a `u128` up to
//!   `2^127`. Candidates keep the leading `k` digits, rounded down and up.
//! - `e < 0`: the integer part is `m >> -e`. Fraction digits come from the
//!   remainder `r / 2^p` by repeated ×5 scaling, never by division:
//!
//! ```text
//! r *= 5; p -= 1;          // r / 2^p is now ten times the old fraction
//! digit = r >> p;          // next decimal digit
//! r &= (1 << p) - 1;       // keep the fraction
//! ```
//!
//!   While `p` is too large for the remainder to fit, `r` is halved together
//!   with `p`; only values far below `1e-20` go through that inexact step.
//!
//! After each digit, the truncated text and the text one unit higher in the
//! last place are parsed back. The first one that reproduces the original bits
//! is emitted, so the output is as short as any text that round-trips. If 17
//! significant digits pass without a match (or the value is beyond `2^127`)
//! the standard library's shortest round-trip formatting is used instead.
//!
//! ## Parsing
//!
//! Digits accumulate into a `u64` with a count of decimal places. When the
//! accumulated value is at most `2^53` and there are at most 22 decimal
//! places, the result is `(value / 5^places) * 2^-places`: one correctly
//! rounded division followed by an exact power-of-two scale. Everything else
//! is handed to the standard library's correctly rounded parser.

use eyre::{bail, Result, WrapErr};
use smallvec::SmallVec;

use super::integer::{format_i64, MAX_I64_TEXT};
use crate::bytes::{StreamingInput, StreamingOutput};
use crate::config::{MAX_EXACT_POW10, MAX_SIGNIFICANT_DIGITS};
use crate::error::BytesError;

pub type DecimalBuf = SmallVec<[u8; 32]>;

/// Largest binary exponent whose integer value still fits a `u128`.
const MAX_INTEGER_SHIFT: i32 = 74;

/// Remainders at or above this bound are halved before the next ×5 step.
const SCALE_LIMIT_BITS: u32 = 125;

/// Upper bound on fraction digits; the smallest subnormal needs 1074.
const MAX_FRACTION_DIGITS: usize = 1100;

const POW5: [u64; MAX_EXACT_POW10 + 1] = {
    let mut table = [1u64; MAX_EXACT_POW10 + 1];
    let mut i = 1;
    while i <= MAX_EXACT_POW10 {
        table[i] = table[i - 1] * 5;
        i += 1;
    }
    table
};

/// Writes the shortest plain decimal text for `value` into `out`, replacing
/// its contents.
///
/// Integers above `2^127`, and values whose digits find no round-trip match
/// within 17 significant digits, are written with `f64`'s `Display` instead.
/// That text is also shortest and exponent-free. Halving of the remainder
/// only applies to fractions far below `1e-20` that stay on the exact path.
pub fn format_decimal(value: f64, out: &mut DecimalBuf) {
    out.clear();
    if value.is_nan() {
        out.extend_from_slice(b"NaN");
        return;
    }
    if value.is_sign_negative() {
        out.push(b'-');
    }

    let magnitude = value.abs();
    if magnitude.is_infinite() {
        out.extend_from_slice(b"Infinity");
        return;
    }
    if magnitude == 0.0 {
        out.push(b'0');
        return;
    }

    let mut digits = DecimalBuf::new();
    if shortest_digits(magnitude, &mut digits) {
        out.extend_from_slice(&digits);
    } else {
        out.extend_from_slice(magnitude.to_string().as_bytes());
    }
}

pub fn to_decimal_string(value: f64) -> String {
    let mut buf = DecimalBuf::new();
    format_decimal(value, &mut buf);
    buf.iter().map(|b| *b as char).collect()
}

pub fn append_f64<O: StreamingOutput + ?Sized>(out: &mut O, value: f64) -> Result<()> {
    let mut buf = DecimalBuf::new();
    format_decimal(value, &mut buf);
    out.write_bytes(&buf)
}

fn shortest_digits(value: f64, out: &mut DecimalBuf) -> bool {
    let bits = value.to_bits();
    let biased = ((bits >> 52) & 0x7FF) as i32;
    let fraction = bits & ((1u64 << 52) - 1);

    let (mut mantissa, mut exp2) = if biased == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), biased - 1075)
    };
    let zeros = mantissa.trailing_zeros();
    mantissa >>= zeros;
    exp2 += zeros as i32;

    if exp2 >= 0 {
        if exp2 > MAX_INTEGER_SHIFT {
            return false;
        }
        integer_digits(value, (mantissa as u128) << exp2, out)
    } else {
        fraction_digits(value, mantissa, exp2.unsigned_abs(), out)
    }
}

fn round_trips(value: f64, text: &[u8]) -> bool {
    parse_decimal(text).is_ok_and(|parsed| parsed.to_bits() == value.to_bits())
}

fn integer_digits(value: f64, n: u128, out: &mut DecimalBuf) -> bool {
    let mut len = 1u32;
    while len < 39 && 10u128.pow(len) <= n {
        len += 1;
    }

    let mut candidate = DecimalBuf::new();
    for k in 1..=len.min(MAX_SIGNIFICANT_DIGITS as u32) {
        let zeros = len - k;
        let scale = 10u128.pow(zeros);
        let lower = n / scale;
        let rest = n - lower * scale;

        let order = if rest * 2 > scale {
            [lower + 1, lower]
        } else {
            [lower, lower + 1]
        };
        for leading in order {
            candidate.clear();
            push_integer(leading as u64, &mut candidate);
            candidate.extend(std::iter::repeat(b'0').take(zeros as usize));
            if round_trips(value, &candidate) {
                out.extend_from_slice(&candidate);
                return true;
            }
        }
    }
    false
}

fn fraction_digits(value: f64, mantissa: u64, exp: u32, out: &mut DecimalBuf) -> bool {
    let mut p = exp;
    let (integer, mut rem) = if p < 64 {
        (mantissa >> p, (mantissa & ((1u64 << p) - 1)) as u128)
    } else {
        (0, mantissa as u128)
    };

    let mut candidate = DecimalBuf::new();
    if integer > 0 {
        for t in [integer, integer + 1] {
            fixed_point(t, 0, &mut candidate);
            if round_trips(value, &candidate) {
                out.extend_from_slice(&candidate);
                return true;
            }
        }
    }

    let mut scaled = integer;
    let mut significant = if integer == 0 {
        0
    } else {
        integer.ilog10() as usize + 1
    };

    for k in 1..=MAX_FRACTION_DIGITS {
        if p == 0 {
            return false;
        }
        while p > SCALE_LIMIT_BITS && rem >= 1u128 << SCALE_LIMIT_BITS {
            rem >>= 1;
            p -= 1;
        }

        rem *= 5;
        p -= 1;
        let digit = if p >= 128 {
            0
        } else {
            let digit = (rem >> p) as u64;
            rem &= (1u128 << p) - 1;
            digit
        };

        scaled = match scaled.checked_mul(10).and_then(|s| s.checked_add(digit)) {
            Some(s) => s,
            None => return false,
        };
        if significant > 0 || digit != 0 {
            significant += 1;
        }
        if significant > MAX_SIGNIFICANT_DIGITS {
            return false;
        }

        let round_up_first = p > 0 && p < 128 && rem > (1u128 << (p - 1));
        let order = if round_up_first {
            [scaled + 1, scaled]
        } else {
            [scaled, scaled + 1]
        };
        for t in order {
            if t == 0 {
                continue;
            }
            fixed_point(t, k, &mut candidate);
            if round_trips(value, &candidate) {
                out.extend_from_slice(&candidate);
                return true;
            }
        }
    }
    false
}

fn push_integer(value: u64, buf: &mut DecimalBuf) {
    let mut text = [0u8; MAX_I64_TEXT];
    let start = format_i64(value as i64, &mut text);
    buf.extend_from_slice(&text[start..]);
}

/// Writes `t / 10^k` as plain decimal text without trailing fraction zeros.
fn fixed_point(t: u64, k: usize, buf: &mut DecimalBuf) {
    buf.clear();
    let mut text = [0u8; MAX_I64_TEXT];
    let start = format_i64(t as i64, &mut text);
    let digits = &text[start..];

    if k == 0 {
        buf.extend_from_slice(digits);
        return;
    }

    if digits.len() > k {
        let split = digits.len() - k;
        buf.extend_from_slice(&digits[..split]);
        buf.push(b'.');
        buf.extend_from_slice(&digits[split..]);
    } else {
        buf.extend_from_slice(b"0.");
        buf.extend(std::iter::repeat(b'0').take(k - digits.len()));
        buf.extend_from_slice(digits);
    }

    while buf.last() == Some(&b'0') {
        buf.pop();
    }
    if buf.last() == Some(&b'.') {
        buf.pop();
    }
}

/// Parses a whole token as written by [`format_decimal`].
///
/// The exact path covers at most 2^53 accumulated digits and at most 22
/// decimal places. Longer or larger inputs go to `str::parse::<f64>`, which
/// is correctly rounded.
pub fn parse_decimal(text: &[u8]) -> Result<f64> {
    parse_token(text, 0)
}

fn parse_token(text: &[u8], base: usize) -> Result<f64> {
    let (negative, body, sign_len) = match text.first() {
        Some(b'-') => (true, &text[1..], 1),
        Some(b'+') => (false, &text[1..], 1),
        _ => (false, text, 0),
    };

    match body {
        b"NaN" => return Ok(f64::NAN),
        b"Infinity" => {
            return Ok(if negative {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            })
        }
        _ => {}
    }

    let mut value: u64 = 0;
    let mut exact = true;
    let mut digits = 0usize;
    let mut decimal_places: Option<usize> = None;

    for (i, &byte) in body.iter().enumerate() {
        match byte {
            b'0'..=b'9' => {
                digits += 1;
                match value
                    .checked_mul(10)
                    .and_then(|v| v.checked_add((byte - b'0') as u64))
                {
                    Some(v) => value = v,
                    None => exact = false,
                }
                if let Some(places) = decimal_places.as_mut() {
                    *places += 1;
                }
            }
            b'.' if decimal_places.is_none() => decimal_places = Some(0),
            _ => bail!(BytesError::malformed(
                base + sign_len + i,
                format!("unexpected byte 0x{:02X} in number", byte)
            )),
        }
    }

    if digits == 0 {
        bail!(BytesError::malformed(base, "number has no digits"));
    }

    let places = decimal_places.unwrap_or(0);
    let magnitude = if exact && value <= 1u64 << 53 && places <= MAX_EXACT_POW10 {
        scale_down(value as f64, places)
    } else {
        // body holds only ASCII digits and at most one '.', both of which the
        // standard parser accepts.
        let ascii = std::str::from_utf8(body)
            .wrap_err_with(|| format!("number at byte {} is not ASCII", base))?;
        ascii
            .parse::<f64>()
            .wrap_err_with(|| format!("failed to parse number at byte {}", base))?
    };

    Ok(if negative { -magnitude } else { magnitude })
}

/// `value / 10^places` as `(value / 5^places) * 2^-places`.
#[inline]
fn scale_down(value: f64, places: usize) -> f64 {
    if places == 0 {
        return value;
    }
    let quotient = value / POW5[places] as f64;
    let power_of_two = f64::from_bits(((1023 - places) as u64) << 52);
    quotient * power_of_two
}

/// Reads a number token and parses it. The byte that ends the token is
/// consumed.
pub fn parse_f64<I: StreamingInput + ?Sized>(input: &mut I) -> Result<f64> {
    let position = input.position();
    let mut token = DecimalBuf::new();
    let mut word = false;

    while input.remaining() > 0 {
        let byte = input.read_u8()?;
        let accept = match byte {
            b'-' | b'+' => token.is_empty(),
            b'0'..=b'9' | b'.' => !word,
            b'A'..=b'Z' | b'a'..=b'z' => {
                if token.iter().all(|c| *c == b'-' || *c == b'+') {
                    word = true;
                }
                word
            }
            _ => false,
        };
        if !accept {
            break;
        }
        token.push(byte);
    }

    parse_token(&token, position)
}
