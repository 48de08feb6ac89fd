//! The register file.
//!
//! Eight general-purpose 15-bit registers, indexed 0..=7. Operand
//! encodings 32768..=32775 name them.

use crate::word::Word;
use serde::{Deserialize, Serialize};

/// Number of general-purpose registers.
pub const NUM_REGISTERS: usize = 8;

/// The register file: 8 words, zero-initialized.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Registers {
    r: [Word; NUM_REGISTERS],
}

impl Registers {
    /// Create a register file with all registers zeroed.
    pub fn new() -> Self {
        Self {
            r: [Word::zero(); NUM_REGISTERS],
        }
    }

    /// Reset all registers to zero.
    pub fn reset(&mut self) {
        self.r = [Word::zero(); NUM_REGISTERS];
    }

    /// Read register `n`.
    ///
    /// # Panics
    /// Panics if `n >= 8`. The decoder only ever produces indices in
    /// range, so this fires only on misuse of the API.
    #[inline]
    pub fn get(&self, n: usize) -> Word {
        self.r[n]
    }

    /// Write register `n`.
    ///
    /// # Panics
    /// Panics if `n >= 8`.
    #[inline]
    pub fn set(&mut self, n: usize, value: Word) {
        self.r[n] = value;
    }

    /// All register contents, in index order.
    pub fn as_slice(&self) -> &[Word; NUM_REGISTERS] {
        &self.r
    }
}
