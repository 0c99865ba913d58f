//! Dense position key for ordered task lists.
//!
//! # Responsibility
//! - Define the comparable key type that orders tasks within a job.
//! - Validate external key representations on parse and deserialize.
//!
//! # Invariants
//! - Keys are non-empty strings over the base-36 digit alphabet `0-9a-z`.
//! - Keys never end with the minimum digit `0`.
//! - Lexicographic byte order on canonical keys equals fractional order.
//!
//! # See also
//! - docs/architecture/ordering.md

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Digit alphabet for position keys, ordered by byte value.
pub(crate) const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Number of distinct digits in the key alphabet.
pub(crate) const BASE: usize = DIGITS.len();

/// Smallest digit. Canonical keys never end with it, so that a key
/// strictly between any two keys stays representable by appending digits.
pub(crate) const MIN_DIGIT: u8 = b'0';

/// Errors from parsing an external position key representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionKeyError {
    /// Key string is empty.
    Empty,
    /// Key contains a character outside `0-9a-z`.
    InvalidDigit(char),
    /// Key ends with `0`, which is not a canonical form.
    TrailingMinDigit,
}

impl Display for PositionKeyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "position key must not be empty"),
            Self::InvalidDigit(digit) => {
                write!(f, "invalid position key digit `{digit}`; expected 0-9a-z")
            }
            Self::TrailingMinDigit => write!(f, "position key must not end with digit `0`"),
        }
    }
}

impl Error for PositionKeyError {}

/// Orderable position of one task within one job list.
///
/// Keys form a dense order: between any two unequal keys another key is
/// computable, so inserting between neighbors never renumbers the rest of
/// the list. A key is assigned once and replaced (never edited in place)
/// when its task moves.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PositionKey(String);

impl PositionKey {
    /// Parses an external key representation, rejecting non-canonical input.
    pub fn parse(value: &str) -> Result<Self, PositionKeyError> {
        if value.is_empty() {
            return Err(PositionKeyError::Empty);
        }
        for ch in value.chars() {
            if !ch.is_ascii() || digit_index(ch as u8).is_none() {
                return Err(PositionKeyError::InvalidDigit(ch));
            }
        }
        if value.as_bytes()[value.len() - 1] == MIN_DIGIT {
            return Err(PositionKeyError::TrailingMinDigit);
        }
        Ok(Self(value.to_string()))
    }

    /// Returns the canonical string representation.
    ///
    /// `parse(as_str())` round-trips to a key comparing identically
    /// against every other key.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of digits. Grows as insertions subdivide the same boundary
    /// and shrinks back after a rebalance.
    pub fn digits(&self) -> usize {
        self.0.len()
    }

    /// Builds a key from digit bytes produced by the allocator.
    pub(crate) fn from_digit_bytes(digits: Vec<u8>) -> Self {
        debug_assert!(!digits.is_empty());
        debug_assert!(digits.last() != Some(&MIN_DIGIT));
        Self(digits.into_iter().map(char::from).collect())
    }

    pub(crate) fn digit_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

/// Maps one alphabet byte to its digit value, `None` outside the alphabet.
pub(crate) fn digit_index(digit: u8) -> Option<usize> {
    match digit {
        b'0'..=b'9' => Some((digit - b'0') as usize),
        b'a'..=b'z' => Some((digit - b'a') as usize + 10),
        _ => None,
    }
}

impl Display for PositionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PositionKey {
    type Err = PositionKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl Serialize for PositionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PositionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        PositionKey::parse(&value).map_err(D::Error::custom)
    }
}
