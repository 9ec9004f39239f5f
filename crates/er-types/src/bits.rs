//! Fixed-width 4096-bit flag vectors.
//!
//! A [`BitVector`] is a 4096-bit unsigned integer interpreted as 4096
//! independent flags. Its canonical wire form is 512 bytes, most-significant
//! byte first: byte 0 holds bits 4088..4095 and byte 511 holds bits 0..7.
//! A legacy lowercase hex rendering of the same integer is still accepted on
//! the read path.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor};

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// Number of flags in a vector.
pub const FLAG_BITS: usize = 4096;

/// Length of the canonical big-endian encoding.
pub const FLAG_BYTES: usize = FLAG_BITS / 8;

/// Longest legacy hex string (without leading zeros) that fits in 4096 bits.
const MAX_HEX_DIGITS: usize = FLAG_BYTES * 2;

const WORDS: usize = FLAG_BITS / 64;

/// A validated bit position in `0..4096`.
///
/// Holding a `Bit` proves the range check already happened, so key
/// construction and index maintenance never need to re-validate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Bit(u16);

impl Bit {
    /// Validate a raw position.
    pub fn new(index: usize) -> TypeResult<Self> {
        if index >= FLAG_BITS {
            return Err(TypeError::BitOutOfRange(index));
        }
        Ok(Self(index as u16))
    }

    /// The position as a `usize`.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Iterate every valid position, ascending.
    pub fn all() -> impl Iterator<Item = Bit> {
        (0..FLAG_BITS as u16).map(Bit)
    }
}

impl TryFrom<usize> for Bit {
    type Error = TypeError;

    fn try_from(index: usize) -> TypeResult<Self> {
        Self::new(index)
    }
}

impl From<Bit> for usize {
    fn from(bit: Bit) -> usize {
        bit.index()
    }
}

impl fmt::Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Boolean combinators for [`BitVector::combine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BitOp {
    And,
    Or,
    Xor,
}

/// A 4096-bit flag vector.
///
/// Stored as 64 little-endian `u64` words: bit `i` lives in
/// `words[i / 64]` at position `i % 64`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitVector {
    words: [u64; WORDS],
}

impl BitVector {
    /// An all-zero vector.
    pub fn new() -> Self {
        Self { words: [0; WORDS] }
    }

    /// Build a vector with every listed position set.
    ///
    /// All positions are validated before anything is set, so an
    /// out-of-range entry never yields a partially built vector.
    pub fn from_bits<I>(bits: I) -> TypeResult<Self>
    where
        I: IntoIterator<Item = usize>,
    {
        let mut out = Self::new();
        for index in bits {
            out.insert(Bit::new(index)?);
        }
        Ok(out)
    }

    /// Set the flag at `index`.
    pub fn set(&mut self, index: usize) -> TypeResult<()> {
        self.insert(Bit::new(index)?);
        Ok(())
    }

    /// Clear the flag at `index`.
    pub fn clear(&mut self, index: usize) -> TypeResult<()> {
        self.remove(Bit::new(index)?);
        Ok(())
    }

    /// Test the flag at `index`.
    pub fn test(&self, index: usize) -> TypeResult<bool> {
        Ok(self.contains(Bit::new(index)?))
    }

    /// Set an already validated position.
    pub fn insert(&mut self, bit: Bit) {
        let i = bit.index();
        self.words[i / 64] |= 1u64 << (i % 64);
    }

    /// Clear an already validated position.
    pub fn remove(&mut self, bit: Bit) {
        let i = bit.index();
        self.words[i / 64] &= !(1u64 << (i % 64));
    }

    /// Test an already validated position.
    pub fn contains(&self, bit: Bit) -> bool {
        let i = bit.index();
        self.words[i / 64] & (1u64 << (i % 64)) != 0
    }

    /// Clear every flag.
    pub fn reset(&mut self) {
        self.words = [0; WORDS];
    }

    /// Returns `true` if no flag is set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Number of set flags.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Combine with another vector, producing a new one.
    pub fn combine(&self, other: &BitVector, op: BitOp) -> BitVector {
        let mut out = Self::new();
        for (i, slot) in out.words.iter_mut().enumerate() {
            let (a, b) = (self.words[i], other.words[i]);
            *slot = match op {
                BitOp::And => a & b,
                BitOp::Or => a | b,
                BitOp::Xor => a ^ b,
            };
        }
        out
    }

    /// Set positions in ascending numeric order.
    ///
    /// Scans from the least-significant end, so the result is sorted; the
    /// index delta and every display of flags rely on that ordering.
    pub fn set_bits(&self) -> Vec<Bit> {
        let mut bits = Vec::with_capacity(self.count_ones());
        for (w, word) in self.words.iter().enumerate() {
            let mut rest = *word;
            while rest != 0 {
                let offset = rest.trailing_zeros() as usize;
                bits.push(Bit((w * 64 + offset) as u16));
                rest &= rest - 1;
            }
        }
        bits
    }

    // -----------------------------------------------------------------------
    // Canonical binary form
    // -----------------------------------------------------------------------

    /// Encode as 512 bytes, most-significant byte first.
    pub fn to_bytes_be(&self) -> [u8; FLAG_BYTES] {
        let mut out = [0u8; FLAG_BYTES];
        for k in 0..FLAG_BYTES {
            let byte = (self.words[k / 8] >> ((k % 8) * 8)) as u8;
            out[FLAG_BYTES - 1 - k] = byte;
        }
        out
    }

    /// Decode from exactly 512 big-endian bytes.
    pub fn from_bytes_be(data: &[u8]) -> TypeResult<Self> {
        if data.len() != FLAG_BYTES {
            return Err(TypeError::InvalidLength {
                expected: FLAG_BYTES,
                actual: data.len(),
            });
        }
        let mut out = Self::new();
        for k in 0..FLAG_BYTES {
            let byte = data[FLAG_BYTES - 1 - k] as u64;
            out.words[k / 8] |= byte << ((k % 8) * 8);
        }
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Legacy hex form
    // -----------------------------------------------------------------------

    /// Lowercase hex of the integer value without leading zeros (`"0"` when empty).
    pub fn to_hex(&self) -> String {
        let full = hex::encode(self.to_bytes_be());
        let trimmed = full.trim_start_matches('0');
        if trimmed.is_empty() {
            "0".to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Parse a legacy hex value.
    ///
    /// Accepts an optional `0x`/`0X` prefix, either case, and embedded
    /// whitespace. Values wider than 4096 bits are rejected.
    pub fn from_hex(input: &str) -> TypeResult<Self> {
        let trimmed = input.trim_start();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let mut digits = String::with_capacity(body.len());
        for ch in body.chars() {
            if ch.is_whitespace() {
                continue;
            }
            if !ch.is_ascii_hexdigit() {
                return Err(TypeError::InvalidHex(format!("invalid character {ch:?}")));
            }
            digits.push(ch.to_ascii_lowercase());
        }

        let significant = digits.trim_start_matches('0');
        if significant.len() > MAX_HEX_DIGITS {
            return Err(TypeError::InvalidHex(format!(
                "{} significant digits exceed 4096 bits",
                significant.len()
            )));
        }

        let mut padded = "0".repeat(MAX_HEX_DIGITS - significant.len());
        padded.push_str(significant);
        let bytes = hex::decode(&padded).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_bytes_be(&bytes)
    }
}

impl Default for BitVector {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits: Vec<usize> = self.set_bits().into_iter().map(Bit::index).collect();
        f.debug_struct("BitVector").field("set", &bits).finish()
    }
}

impl BitAnd for &BitVector {
    type Output = BitVector;

    fn bitand(self, rhs: &BitVector) -> BitVector {
        self.combine(rhs, BitOp::And)
    }
}

impl BitOr for &BitVector {
    type Output = BitVector;

    fn bitor(self, rhs: &BitVector) -> BitVector {
        self.combine(rhs, BitOp::Or)
    }
}

impl BitXor for &BitVector {
    type Output = BitVector;

    fn bitxor(self, rhs: &BitVector) -> BitVector {
        self.combine(rhs, BitOp::Xor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn indices(v: &BitVector) -> Vec<usize> {
        v.set_bits().into_iter().map(Bit::index).collect()
    }

    // -----------------------------------------------------------------------
    // Bit validation
    // -----------------------------------------------------------------------

    #[test]
    fn bit_range_is_enforced() {
        assert!(Bit::new(0).is_ok());
        assert!(Bit::new(4095).is_ok());
        assert_eq!(Bit::new(4096), Err(TypeError::BitOutOfRange(4096)));
    }

    #[test]
    fn bit_deserialize_validates() {
        let ok: Bit = serde_json::from_str("42").unwrap();
        assert_eq!(ok.index(), 42);
        assert!(serde_json::from_str::<Bit>("4096").is_err());
    }

    #[test]
    fn set_clear_test() {
        let mut v = BitVector::new();
        v.set(42).unwrap();
        assert!(v.test(42).unwrap());
        assert!(!v.test(41).unwrap());
        v.clear(42).unwrap();
        assert!(!v.test(42).unwrap());
        assert!(v.is_empty());
    }

    #[test]
    fn out_of_range_calls_fail() {
        let mut v = BitVector::new();
        assert!(v.set(4096).is_err());
        assert!(v.clear(10_000).is_err());
        assert!(v.test(4096).is_err());
    }

    #[test]
    fn from_bits_is_all_or_nothing() {
        let err = BitVector::from_bits([1, 2, 4096]).unwrap_err();
        assert_eq!(err, TypeError::BitOutOfRange(4096));
    }

    // -----------------------------------------------------------------------
    // Encoding layout
    // -----------------------------------------------------------------------

    #[test]
    fn byte_layout_is_big_endian() {
        let v = BitVector::from_bits([0, 9, 4095]).unwrap();
        let bytes = v.to_bytes_be();
        assert_eq!(bytes[511], 0b0000_0001);
        assert_eq!(bytes[510], 0b0000_0010);
        assert_eq!(bytes[0], 0b1000_0000);
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        let err = BitVector::from_bytes_be(&[0u8; 511]).unwrap_err();
        assert_eq!(err, TypeError::InvalidLength { expected: 512, actual: 511 });
    }

    #[test]
    fn hex_of_zero_is_zero() {
        assert_eq!(BitVector::new().to_hex(), "0");
        assert!(BitVector::from_hex("").unwrap().is_empty());
    }

    #[test]
    fn hex_matches_integer_value() {
        let v = BitVector::from_bits([0, 4, 8]).unwrap();
        assert_eq!(v.to_hex(), "111");
        let top = BitVector::from_bits([4095]).unwrap();
        assert_eq!(top.to_hex().len(), 1024);
        assert!(top.to_hex().starts_with('8'));
    }

    #[test]
    fn hex_accepts_prefix_case_and_whitespace() {
        let v = BitVector::from_hex("0xFF 00").unwrap();
        assert_eq!(indices(&v), (8..16).collect::<Vec<_>>());
    }

    #[test]
    fn hex_rejects_garbage_and_overflow() {
        assert!(matches!(BitVector::from_hex("12g4"), Err(TypeError::InvalidHex(_))));
        let too_wide = format!("1{}", "0".repeat(1024));
        assert!(matches!(BitVector::from_hex(&too_wide), Err(TypeError::InvalidHex(_))));
        let leading_zeros = format!("{}1", "0".repeat(2000));
        assert_eq!(indices(&BitVector::from_hex(&leading_zeros).unwrap()), vec![0]);
    }

    // -----------------------------------------------------------------------
    // Combinators
    // -----------------------------------------------------------------------

    #[test]
    fn combine_ops() {
        let a = BitVector::from_bits([1, 2, 3]).unwrap();
        let b = BitVector::from_bits([2, 4]).unwrap();
        assert_eq!(indices(&(&a & &b)), vec![2]);
        assert_eq!(indices(&(&a | &b)), vec![1, 2, 3, 4]);
        assert_eq!(indices(&(&a ^ &b)), vec![1, 3, 4]);
    }

    #[test]
    fn debug_lists_set_positions() {
        let v = BitVector::from_bits([7, 1]).unwrap();
        assert_eq!(format!("{v:?}"), "BitVector { set: [1, 7] }");
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn bytes_round_trip(bits in proptest::collection::btree_set(0usize..4096, 0..200)) {
            let v = BitVector::from_bits(bits.iter().copied()).unwrap();
            let back = BitVector::from_bytes_be(&v.to_bytes_be()).unwrap();
            let expected: Vec<usize> = bits.into_iter().collect();
            prop_assert_eq!(indices(&back), expected);
            prop_assert_eq!(back, v);
        }

        #[test]
        fn hex_round_trip(bits in proptest::collection::btree_set(0usize..4096, 0..200)) {
            let v = BitVector::from_bits(bits).unwrap();
            prop_assert_eq!(BitVector::from_hex(&v.to_hex()).unwrap(), v);
        }

        #[test]
        fn set_bits_is_strictly_ascending(bits in proptest::collection::vec(0usize..4096, 0..300)) {
            let v = BitVector::from_bits(bits).unwrap();
            let out = indices(&v);
            prop_assert!(out.windows(2).all(|w| w[0] < w[1]));
            prop_assert_eq!(out.len(), v.count_ones());
        }

        #[test]
        fn xor_is_symmetric_difference(
            a in proptest::collection::btree_set(0usize..4096, 0..100),
            b in proptest::collection::btree_set(0usize..4096, 0..100),
        ) {
            let va = BitVector::from_bits(a.iter().copied()).unwrap();
            let vb = BitVector::from_bits(b.iter().copied()).unwrap();
            let expected: Vec<usize> = a.symmetric_difference(&b).copied().collect();
            prop_assert_eq!(indices(&(&va ^ &vb)), expected);
        }
    }
}
