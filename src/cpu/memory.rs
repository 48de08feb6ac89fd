//! Flat word-addressable memory.
//!
//! Memory is a fixed array of 32,768 sixteen-bit cells, one per possible
//! `Word` address, all zero-initialized. Cells hold raw encodings rather
//! than machine words: operand words in 32768..=32775 (register
//! references) live in memory alongside plain values, so a cell spans the
//! full 16-bit range. Value reads (`rmem`) reduce the cell modulo 32768.
//!
//! Because the address space is exactly one word wide, every address a
//! program can compute is valid and unwritten memory reads as zero.

use crate::word::Word;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The number of memory cells: one per 15-bit address.
pub const MEMORY_SIZE: usize = 1 << Word::BITS;

/// Machine memory: 32,768 raw 16-bit cells.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    cells: Vec<u16>,
}

impl Memory {
    /// Create a memory with all cells zeroed.
    pub fn new() -> Self {
        Self {
            cells: vec![0; MEMORY_SIZE],
        }
    }

    /// Read the raw cell at `addr`.
    #[inline]
    pub fn read(&self, addr: Word) -> u16 {
        self.cells[addr.index()]
    }

    /// Read the cell at `addr` as a machine word, reducing modulo 32768.
    #[inline]
    pub fn read_word(&self, addr: Word) -> Word {
        Word::from_raw(self.cells[addr.index()])
    }

    /// Write a raw cell.
    #[inline]
    pub fn write(&mut self, addr: Word, value: u16) {
        self.cells[addr.index()] = value;
    }

    /// Write a machine word.
    #[inline]
    pub fn write_word(&mut self, addr: Word, value: Word) {
        self.cells[addr.index()] = value.get();
    }

    /// Clear all memory to zeros.
    pub fn clear(&mut self) {
        self.cells.fill(0);
    }

    /// Load a program image into memory starting at address 0.
    pub fn load_image(&mut self, words: &[u16]) -> Result<(), MemoryError> {
        if words.len() > MEMORY_SIZE {
            return Err(MemoryError::ImageTooLarge {
                size: words.len(),
                capacity: MEMORY_SIZE,
            });
        }
        self.cells[..words.len()].copy_from_slice(words);
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Only summarize; 32k cells are too many to print.
        let non_zero = self.cells.iter().filter(|&&c| c != 0).count();
        f.debug_struct("Memory")
            .field("non_zero_cells", &non_zero)
            .field("total_cells", &MEMORY_SIZE)
            .finish()
    }
}

/// Errors that can occur while populating memory.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("image of {size} words exceeds memory capacity of {capacity}")]
    ImageTooLarge { size: usize, capacity: usize },
}
