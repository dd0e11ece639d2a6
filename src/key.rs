//! Rank keys: immutable, byte-comparable positions in a bucketed keyspace.
//!
//! # Canonical form
//! A key is stored and compared as its canonical string `"<bucket>|<rank>"`,
//! e.g. `"1|aU"`.  The bucket is a single ASCII digit `0`-`2`; the rank is
//! 0 to 6 alphabet symbols (see [`crate::alphabet`]).  Ordering is plain
//! byte order of that string: bucket first, then rank, with a shorter rank
//! sorting before any longer rank it prefixes.
//!
//! # Failure contract
//! Every operation that can run out of keyspace returns `Option<Key>`.
//! `None` means "no 6-digit key satisfies the request"; the caller must
//! rebalance.  A `Key` value never holds more than 6 rank digits.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::alphabet::{
    self, BASE, KEY_LENGTH, MAXIMUM, MIDPOINT, MINIMUM, RANK_LENGTH, SEPARATOR,
};

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyError {
    #[error("Invalid rank digit 0x{0:02x} (allowed: '0'..='z')")]
    InvalidDigit(u8),
    #[error("Invalid key length: {0}")]
    InvalidLength(usize),
    #[error("Invalid bucket: {0} (expected 0, 1 or 2)")]
    InvalidBucket(u8),
    #[error("Expected '|' after the bucket digit, found 0x{0:02x}")]
    InvalidSeparator(u8),
    #[error("Rank value does not fit in 64 bits")]
    Overflow,
}

// ── Bucket ───────────────────────────────────────────────────────────────────

/// One of three independent ranked spaces sharing a column.
///
/// Buckets sort before ranks, so every key in bucket 0 precedes every key in
/// bucket 1.  Out-of-range values are rejected, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Bucket(u8);

impl Bucket {
    pub const ZERO: Bucket = Bucket(0);
    pub const ONE:  Bucket = Bucket(1);
    pub const TWO:  Bucket = Bucket(2);

    pub const fn new(value: u8) -> Result<Self, KeyError> {
        if value <= 2 {
            Ok(Bucket(value))
        } else {
            Err(KeyError::InvalidBucket(value))
        }
    }

    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// The ASCII digit written in front of the separator.
    #[inline]
    pub const fn ascii(self) -> u8 {
        b'0' + self.0
    }

    fn from_ascii(b: u8) -> Result<Self, KeyError> {
        if b.is_ascii_digit() {
            Bucket::new(b - b'0')
        } else {
            Err(KeyError::InvalidBucket(b))
        }
    }
}

impl TryFrom<u8> for Bucket {
    type Error = KeyError;
    fn try_from(value: u8) -> Result<Self, KeyError> {
        Bucket::new(value)
    }
}

impl From<Bucket> for u8 {
    fn from(b: Bucket) -> u8 {
        b.0
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Key ──────────────────────────────────────────────────────────────────────

/// Well-known keys in bucket 0.
pub const BOTTOM: Key = Key::bottom(Bucket::ZERO);
pub const TOP:    Key = Key::top(Bucket::ZERO);
pub const MIDDLE: Key = Key::middle(Bucket::ZERO);

/// A rank key.  `Copy`, immutable, at most [`KEY_LENGTH`] bytes inline.
#[derive(Clone, Copy)]
pub struct Key {
    /// Canonical bytes; everything past `len` is zero.
    raw: [u8; KEY_LENGTH],
    len: u8,
}

impl Key {
    // ── Constructors ─────────────────────────────────────────────────────────

    const fn filled(bucket: Bucket, symbol: u8, count: usize) -> Key {
        let mut raw = [0u8; KEY_LENGTH];
        raw[0] = bucket.ascii();
        raw[1] = SEPARATOR;
        let mut i = 0;
        while i < count {
            raw[2 + i] = symbol;
            i += 1;
        }
        Key { raw, len: (2 + count) as u8 }
    }

    /// Shortest, lowest key of a bucket: `"b|0"`.
    pub const fn bottom(bucket: Bucket) -> Key {
        Key::filled(bucket, MINIMUM, 1)
    }

    /// Longest, highest key of a bucket: `"b|zzzzzz"`.
    pub const fn top(bucket: Bucket) -> Key {
        Key::filled(bucket, MAXIMUM, RANK_LENGTH)
    }

    /// Mid-valued seed key: `"b|UUUUUU"`.
    pub const fn middle(bucket: Bucket) -> Key {
        Key::filled(bucket, MIDPOINT, RANK_LENGTH)
    }

    /// Build a key from digits already known to be in the alphabet.
    /// Anything past [`RANK_LENGTH`] is dropped.
    fn assemble(bucket: Bucket, digits: &[u8]) -> Key {
        let n = digits.len().min(RANK_LENGTH);
        let mut raw = [0u8; KEY_LENGTH];
        raw[0] = bucket.ascii();
        raw[1] = SEPARATOR;
        raw[2..2 + n].copy_from_slice(&digits[..n]);
        Key { raw, len: (2 + n) as u8 }
    }

    /// Like [`Key::assemble`] but refuses ranks that are too long.
    fn bounded(bucket: Bucket, digits: &[u8]) -> Option<Key> {
        (digits.len() <= RANK_LENGTH).then(|| Key::assemble(bucket, digits))
    }

    /// Validate `digits` and attach them to `bucket`.
    pub fn from_parts(bucket: Bucket, digits: &[u8]) -> Result<Key, KeyError> {
        if digits.len() > RANK_LENGTH {
            return Err(KeyError::InvalidLength(digits.len()));
        }
        if let Some(&bad) = digits.iter().find(|&&b| !alphabet::is_digit(b)) {
            return Err(KeyError::InvalidDigit(bad));
        }
        Ok(Key::assemble(bucket, digits))
    }

    /// Parse a canonical key string such as `"1|aU"`.
    pub fn parse(s: &str) -> Result<Key, KeyError> {
        Key::parse_bytes(s.as_bytes())
    }

    pub fn parse_bytes(bytes: &[u8]) -> Result<Key, KeyError> {
        if bytes.len() < 2 || bytes.len() > KEY_LENGTH {
            return Err(KeyError::InvalidLength(bytes.len()));
        }
        let bucket = Bucket::from_ascii(bytes[0])?;
        if bytes[1] != SEPARATOR {
            return Err(KeyError::InvalidSeparator(bytes[1]));
        }
        Key::from_parts(bucket, &bytes[2..])
    }

    /// Key for a fractional position `f` in `[0, 1)` of the keyspace.
    ///
    /// Never fails; out-of-range inputs are clamped
    /// (see [`alphabet::fractional_digits`]).
    pub fn at_fraction(bucket: Bucket, f: f64) -> Key {
        Key::assemble(bucket, &alphabet::fractional_digits(f))
    }

    /// A key at a uniformly random position of the bucket's keyspace.
    pub fn random(bucket: Bucket) -> Key {
        Key::at_fraction(bucket, rand::random::<f64>())
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.raw[..self.len as usize]
    }

    pub fn as_str(&self) -> &str {
        // Every stored byte is ASCII.
        std::str::from_utf8(self.as_bytes()).unwrap_or_default()
    }

    #[inline]
    pub fn bucket(&self) -> Bucket {
        Bucket(self.raw[0] - b'0')
    }

    /// The rank digits after the separator.
    #[inline]
    pub fn digits(&self) -> &[u8] {
        &self.raw[2..self.len as usize]
    }

    /// Number of rank digits.
    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize - 2
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The rank read as a base-75 integer.
    pub fn value(&self) -> u64 {
        alphabet::decode_valid(self.digits())
    }

    /// Same rank, different bucket.
    pub fn with_bucket(&self, bucket: Bucket) -> Key {
        let mut k = *self;
        k.raw[0] = bucket.ascii();
        k
    }

    // ── Midpoint ─────────────────────────────────────────────────────────────

    /// A short key strictly between `self` and `other`.
    ///
    /// Argument order does not matter.  The result takes the bucket of the
    /// lower key.  Returns `None` when no rank of at most 6 digits fits
    /// between the two, meaning the neighbours must be rebalanced.
    pub fn between(&self, other: &Key) -> Option<Key> {
        if self > other {
            return other.between(self);
        }

        let low  = self.digits();
        let high = other.digits();
        let top  = (BASE - 1) as u8;

        // Digit values, not symbols.  Terminates by position max(len)+1 at
        // the latest, where the padding digits are 0 and 74.
        let mut rank: Vec<u8> = Vec::with_capacity(RANK_LENGTH + 1);
        let mut below = false;
        for i in 0.. {
            let prev = low.get(i).map_or(0, |b| b - MINIMUM);
            let next = match high.get(i) {
                Some(b) if !below || b - MINIMUM >= prev => b - MINIMUM,
                _ => top,
            };

            if prev == next {
                rank.push(prev);
                continue;
            }

            let mid = (prev + next) / 2;
            if mid == prev || mid == next {
                // Adjacent digits: keep the low digit and split further down.
                // The prefix is now below `high`, so a later digit of `high`
                // smaller than the low digit no longer bounds the result.
                rank.push(prev);
                below |= prev < next;
                continue;
            }

            rank.push(mid);
            break;
        }

        let candidate: Vec<u8> = rank.into_iter().map(alphabet::symbol).collect();

        if candidate.len() > RANK_LENGTH {
            tracing::trace!(low = %self, high = %other, digits = candidate.len(), "midpoint too long");
            return None;
        }
        if candidate.as_slice() >= high {
            tracing::trace!(low = %self, high = %other, "no rank below the upper bound");
            return None;
        }

        Some(Key::assemble(self.bucket(), &candidate))
    }

    // ── Offsets ──────────────────────────────────────────────────────────────

    /// Move the rank by a signed numeric distance.
    ///
    /// This is arithmetic on the rank's integer value.  Results are
    /// re-encoded without leading padding, so offsets preserve byte order
    /// only between ranks of equal length.  `None` if the result is negative
    /// or needs more than 6 digits.
    pub fn offset(&self, distance: i64) -> Option<Key> {
        if distance >= 0 {
            self.after(distance.unsigned_abs())
        } else {
            self.before(distance.unsigned_abs())
        }
    }

    pub fn after(&self, distance: u64) -> Option<Key> {
        let next = self.value().checked_add(distance)?;
        Key::bounded(self.bucket(), &alphabet::encode(next))
    }

    pub fn before(&self, distance: u64) -> Option<Key> {
        let next = self.value().checked_sub(distance)?;
        Key::bounded(self.bucket(), &alphabet::encode(next))
    }
}

// ── Ordering & identity ──────────────────────────────────────────────────────

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Key {}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl Default for Key {
    fn default() -> Self {
        MIDDLE
    }
}

// ── Text adapters ────────────────────────────────────────────────────────────

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:?})", self.as_str())
    }
}

impl FromStr for Key {
    type Err = KeyError;
    fn from_str(s: &str) -> Result<Self, KeyError> {
        Key::parse(s)
    }
}

impl TryFrom<&str> for Key {
    type Error = KeyError;
    fn try_from(s: &str) -> Result<Self, KeyError> {
        Key::parse(s)
    }
}

impl TryFrom<&[u8]> for Key {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, KeyError> {
        Key::parse_bytes(bytes)
    }
}

// ── Serde ────────────────────────────────────────────────────────────────────

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

struct KeyVisitor;

impl<'de> Visitor<'de> for KeyVisitor {
    type Value = Key;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a rank key string such as \"0|aU\"")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Key, E> {
        Key::parse(v).map_err(E::custom)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Key, E> {
        Key::parse_bytes(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(KeyVisitor)
    }
}
