//! The 15-bit machine word.
//!
//! Every value the machine computes with is a [`Word`]: an unsigned
//! integer in 0..=32767. Arithmetic reduces modulo 32768 and bitwise NOT
//! is one's-complement over the low 15 bits (`32767 - b`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 15-bit unsigned machine word.
///
/// Used for:
/// - Register contents and stack entries
/// - Memory addresses (the address space is exactly one word wide)
/// - Literal operand values
///
/// Value range: 0 to 32,767.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Word(u16);

impl Word {
    /// Number of value bits in a word.
    pub const BITS: u32 = 15;

    /// Maximum value: 32,767.
    pub const MAX: u16 = (1 << Self::BITS) - 1;

    /// The arithmetic modulus: 32,768.
    pub const MODULUS: u32 = 1 << Self::BITS;

    /// The zero word.
    #[inline]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Create a word from a value already known to be in range.
    ///
    /// # Panics
    /// Panics if `value > 32767`.
    #[inline]
    pub fn new(value: u16) -> Self {
        assert!(
            value <= Self::MAX,
            "value {} out of range for Word (0-{})",
            value,
            Self::MAX
        );
        Self(value)
    }

    /// Create a word from an arbitrary 16-bit value, reducing it modulo
    /// 32768 by discarding the top bit.
    #[inline]
    pub const fn from_raw(value: u16) -> Self {
        Self(value & Self::MAX)
    }

    /// The underlying value.
    #[inline]
    pub const fn get(self) -> u16 {
        self.0
    }

    /// The word as a memory or register index.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Modular addition: `(self + rhs) mod 32768`.
    #[inline]
    pub const fn wrapping_add(self, rhs: Self) -> Self {
        // The sum of two 15-bit values fits in u16.
        Self((self.0 + rhs.0) & Self::MAX)
    }

    /// Modular multiplication: `(self * rhs) mod 32768`.
    #[inline]
    pub const fn wrapping_mul(self, rhs: Self) -> Self {
        Self(((self.0 as u32 * rhs.0 as u32) % Self::MODULUS) as u16)
    }

    /// Remainder, or `None` when the divisor is zero.
    #[inline]
    pub fn checked_rem(self, rhs: Self) -> Option<Self> {
        if rhs.0 == 0 {
            None
        } else {
            Some(Self(self.0 % rhs.0))
        }
    }

    /// The word at `self + n`, wrapping modulo 32768. Used for program
    /// counter advancement.
    #[inline]
    pub const fn offset(self, n: u16) -> Self {
        Self::from_raw(self.0.wrapping_add(n))
    }

    /// The character whose Unicode code point is this word.
    ///
    /// Every 15-bit value is a valid scalar value (the surrogate range
    /// starts at 0xD800), so this cannot actually fall back.
    #[inline]
    pub fn to_char(self) -> char {
        char::from_u32(self.0 as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
    }
}

impl std::ops::BitAnd for Word {
    type Output = Word;

    #[inline]
    fn bitand(self, rhs: Self) -> Word {
        Word(self.0 & rhs.0)
    }
}

impl std::ops::BitOr for Word {
    type Output = Word;

    #[inline]
    fn bitor(self, rhs: Self) -> Word {
        Word(self.0 | rhs.0)
    }
}

impl std::ops::Not for Word {
    type Output = Word;

    /// 15-bit one's complement: `!b == 32767 - b`.
    #[inline]
    fn not(self) -> Word {
        Word(!self.0 & Self::MAX)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({})", self.0)
    }
}
