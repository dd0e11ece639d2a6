//! The 75-symbol rank alphabet and base-75 arithmetic over it.
//!
//! # Alphabet
//! Digits are the contiguous ASCII range `'0'..='z'`.  A symbol's digit value
//! is its offset from [`MINIMUM`], so byte order and numeric order agree and
//! a plain byte comparison of two digit strings is a numeric comparison of
//! equal-length numerals.
//!
//! # Keyspace
//! A rank holds at most [`RANK_LENGTH`] digits, i.e. [`KEYSPACE`] distinct
//! full-length positions.  The canonical key string adds a bucket digit and
//! a `|` separator, for [`KEY_LENGTH`] bytes at most.

use crate::key::KeyError;

// ── Frozen constants ────────────────────────────────────────────────────────

/// Lowest digit symbol (value 0).
pub const MINIMUM:  u8 = b'0';
/// Seed digit for default keys (value 37).
pub const MIDPOINT: u8 = b'U';
/// Highest digit symbol (value 74).
pub const MAXIMUM:  u8 = b'z';

/// Number of symbols in the alphabet.
pub const BASE: u64 = (MAXIMUM - MINIMUM) as u64 + 1;

/// Maximum number of digits after the separator.
pub const RANK_LENGTH: usize = 6;
/// Maximum length of the canonical string `"0|aaaaaa"`.
pub const KEY_LENGTH:  usize = RANK_LENGTH + 2;

/// Number of distinct full-length ranks (`75^6`).
pub const KEYSPACE: u64 = BASE.pow(RANK_LENGTH as u32);

/// Separator between the bucket digit and the rank digits.
pub const SEPARATOR: u8 = b'|';

// ── Symbol <-> value ────────────────────────────────────────────────────────

/// `true` if `b` is one of the 75 digit symbols.
#[inline]
pub fn is_digit(b: u8) -> bool {
    (MINIMUM..=MAXIMUM).contains(&b)
}

/// Digit value of a symbol, or `None` if it is outside the alphabet.
#[inline]
pub fn value_of(b: u8) -> Option<u8> {
    is_digit(b).then(|| b - MINIMUM)
}

/// Symbol for a digit value.  Values above 74 saturate to [`MAXIMUM`].
#[inline]
pub fn symbol(value: u8) -> u8 {
    MINIMUM + value.min((BASE - 1) as u8)
}

// ── Radix conversion ────────────────────────────────────────────────────────

/// Interpret `digits` as a base-75 numeral, most significant digit first.
///
/// An empty slice decodes to zero.  Fails with [`KeyError::InvalidDigit`] on
/// a byte outside the alphabet and [`KeyError::Overflow`] if the numeral
/// does not fit in a `u64`.
pub fn decode(digits: &[u8]) -> Result<u64, KeyError> {
    let mut acc: u64 = 0;
    for &b in digits {
        let v = value_of(b).ok_or(KeyError::InvalidDigit(b))?;
        acc = acc
            .checked_mul(BASE)
            .and_then(|a| a.checked_add(u64::from(v)))
            .ok_or(KeyError::Overflow)?;
    }
    Ok(acc)
}

/// Decode digits already known to be in the alphabet and at most
/// [`RANK_LENGTH`] long.  Cannot overflow: `75^6` fits easily in a `u64`.
pub(crate) fn decode_valid(digits: &[u8]) -> u64 {
    digits
        .iter()
        .fold(0u64, |acc, &b| acc * BASE + u64::from(b - MINIMUM))
}

/// Inverse of [`decode`].  Zero encodes to a single [`MINIMUM`]; no leading
/// padding is ever produced, so the output has no fixed upper length.
pub fn encode(mut value: u64) -> Vec<u8> {
    if value == 0 {
        return vec![MINIMUM];
    }
    let mut out = Vec::with_capacity(RANK_LENGTH);
    while value > 0 {
        out.push(MINIMUM + (value % BASE) as u8);
        value /= BASE;
    }
    out.reverse();
    out
}

/// Digits for a fractional position in the keyspace.
///
/// Extracts up to [`RANK_LENGTH`] base-75 digits greedily, stopping early
/// once the remaining fraction is exactly zero, so coarse positions yield
/// short ranks.  `f` is clamped into `[0, 1]`; NaN is treated as 0.  The
/// integer part at each step is clamped to the last symbol to absorb
/// floating point rounding near 1.
pub fn fractional_digits(f: f64) -> Vec<u8> {
    let mut f = if f.is_nan() { 0.0 } else { f.clamp(0.0, 1.0) };
    let base = BASE as f64;
    let mut out = Vec::with_capacity(RANK_LENGTH);

    for _ in 0..RANK_LENGTH {
        f *= base;
        let index = (f as u64).min(BASE - 1);
        out.push(MINIMUM + index as u8);
        f -= index as f64;
        if f <= 0.0 {
            break;
        }
    }
    out
}
