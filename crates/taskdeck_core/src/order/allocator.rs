//! Position key allocation between, before, and after existing keys.
//!
//! # Responsibility
//! - Compute a fresh key for every insert/append/move without touching
//!   the keys of unrelated tasks.
//! - Provide evenly spaced replacement keys for full-list rebalancing.
//!
//! # Invariants
//! - `key_between` output is canonical and strictly inside its bounds.
//! - Identical bounds always produce the identical key.
//! - Running out of room between two keys extends precision by appending
//!   digits; it is never surfaced as an error.

use crate::model::position::{digit_index, PositionKey, BASE, DIGITS, MIN_DIGIT};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Keys longer than this many digits trigger a rebalance by default.
const DEFAULT_MAX_KEY_DIGITS: usize = 24;

/// Errors from position allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocatorError {
    /// `low` does not sort strictly before `high`. This is a caller
    /// contract violation, not a runtime condition.
    InvertedBounds {
        low: PositionKey,
        high: PositionKey,
    },
}

impl Display for AllocatorError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvertedBounds { low, high } => write!(
                f,
                "position bounds are inverted: `{low}` must sort strictly before `{high}`"
            ),
        }
    }
}

impl Error for AllocatorError {}

/// Returns the key seeding an empty list.
///
/// Sits in the middle of the key space so both directions keep maximal
/// headroom for future inserts.
pub fn first_key() -> PositionKey {
    PositionKey::from_digit_bytes(midpoint(&[], None))
}

/// Returns a key sorting strictly after `low`, used for appending.
pub fn key_after(low: &PositionKey) -> PositionKey {
    PositionKey::from_digit_bytes(midpoint(low.digit_bytes(), None))
}

/// Computes a key strictly between two optional bounds.
///
/// `None` bounds stand for the open ends of the key space:
/// `(None, None)` seeds an empty list, `(Some, None)` appends at the end,
/// `(None, Some)` inserts before the current head. The result lands at
/// the rounded midpoint of the available digit range, so repeated
/// subdivision at one boundary degrades as slowly as possible.
///
/// # Errors
/// - `InvertedBounds` when both bounds are given and `low >= high`.
pub fn key_between(
    low: Option<&PositionKey>,
    high: Option<&PositionKey>,
) -> Result<PositionKey, AllocatorError> {
    if let (Some(low), Some(high)) = (low, high) {
        if low >= high {
            return Err(AllocatorError::InvertedBounds {
                low: low.clone(),
                high: high.clone(),
            });
        }
    }
    let low_digits = low.map_or(&[][..], PositionKey::digit_bytes);
    let high_digits = high.map(PositionKey::digit_bytes);
    Ok(PositionKey::from_digit_bytes(midpoint(
        low_digits,
        high_digits,
    )))
}

/// Returns `count` evenly spaced canonical keys in ascending order.
///
/// Used by rebalancing to reset key lengths across a whole list. Keys use
/// the shortest digit length that fits `count` distinct interior values.
pub fn spread(count: usize) -> Vec<PositionKey> {
    if count == 0 {
        return Vec::new();
    }
    let slots = count as u128 + 1;
    let mut span: u128 = BASE as u128;
    let mut digits = 1usize;
    while span < slots {
        span *= BASE as u128;
        digits += 1;
    }
    (1..=count as u128)
        .map(|index| encode_fraction(index * span / slots, digits))
        .collect()
}

/// Policy deciding when a list should be rebalanced.
///
/// Rebalancing is a hygiene bound on key growth, not a correctness
/// requirement; allocation keeps working at any key length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebalancePolicy {
    /// Assigned keys longer than this many digits trigger a rebalance.
    pub max_key_digits: usize,
}

impl Default for RebalancePolicy {
    fn default() -> Self {
        Self {
            max_key_digits: DEFAULT_MAX_KEY_DIGITS,
        }
    }
}

impl RebalancePolicy {
    /// Returns whether assigning `key` should trigger a rebalance.
    pub fn needs_rebalance(&self, key: &PositionKey) -> bool {
        key.digits() > self.max_key_digits
    }
}

/// Computes the canonical digit string strictly between `low` and `high`.
///
/// `low = []` stands for the bottom of the key space, `high = None` for
/// the top. Precondition (upheld by callers): `low` sorts strictly before
/// `high` when both are present, and both are canonical.
fn midpoint(low: &[u8], high: Option<&[u8]>) -> Vec<u8> {
    if let Some(high) = high {
        // A shared prefix is kept verbatim; the midpoint is computed on
        // the remainder. `low` is padded with the minimum digit, which
        // also absorbs `high` values starting with `0`.
        let mut shared = 0;
        while shared < high.len()
            && low.get(shared).copied().unwrap_or(MIN_DIGIT) == high[shared]
        {
            shared += 1;
        }
        if shared > 0 {
            let rest_low = &low[shared.min(low.len())..];
            let mut key = high[..shared].to_vec();
            key.extend(midpoint(rest_low, Some(&high[shared..])));
            return key;
        }
    }

    let low_digit = low.first().and_then(|&digit| digit_index(digit)).unwrap_or(0);
    let high_digit = high.map_or(BASE, |high| {
        high.first().and_then(|&digit| digit_index(digit)).unwrap_or(BASE)
    });

    if high_digit - low_digit > 1 {
        // Room at this length: take the rounded middle digit.
        let mid = (low_digit + high_digit + 1) / 2;
        return vec![DIGITS[mid]];
    }

    match high {
        // The bounding digits are consecutive and `high` has spare
        // digits: its first digit alone sorts strictly between.
        Some(high) if high.len() > 1 => high[..1].to_vec(),
        // No room at this length: keep `low`'s digit and subdivide the
        // space below the next boundary.
        _ => {
            let rest_low = if low.is_empty() { &[][..] } else { &low[1..] };
            let mut key = vec![DIGITS[low_digit]];
            key.extend(midpoint(rest_low, None));
            key
        }
    }
}

/// Encodes `value` as `digits` base-36 digits and trims trailing zeros.
fn encode_fraction(mut value: u128, digits: usize) -> PositionKey {
    let mut encoded = vec![MIN_DIGIT; digits];
    for slot in (0..digits).rev() {
        encoded[slot] = DIGITS[(value % BASE as u128) as usize];
        value /= BASE as u128;
    }
    while encoded.last() == Some(&MIN_DIGIT) {
        encoded.pop();
    }
    PositionKey::from_digit_bytes(encoded)
}
