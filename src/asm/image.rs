//! Binary program image format.
//!
//! An image is a flat sequence of little-endian 16-bit words: word `i`
//! occupies bytes `2i` and `2i+1` and is loaded at address `i`.

use crate::cpu::memory::MEMORY_SIZE;
use std::path::Path;
use thiserror::Error;

/// A loaded program image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    /// The raw words, in address order from 0.
    pub words: Vec<u16>,
    /// Size of the source file in bytes.
    pub bytes_read: usize,
}

impl Image {
    /// Number of words in the image.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Parse raw image bytes into words.
pub fn parse_image(bytes: &[u8]) -> Result<Image, ImageError> {
    if bytes.len() % 2 != 0 {
        return Err(ImageError::TruncatedWord {
            offset: bytes.len() - 1,
        });
    }

    let words: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    if words.len() > MEMORY_SIZE {
        return Err(ImageError::TooLarge {
            words: words.len(),
            capacity: MEMORY_SIZE,
        });
    }

    Ok(Image {
        words,
        bytes_read: bytes.len(),
    })
}

/// Load a program image from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Image, ImageError> {
    let bytes = std::fs::read(path.as_ref()).map_err(|e| ImageError::Io(e.to_string()))?;
    parse_image(&bytes)
}

/// Errors that can occur while loading an image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("image ends with a truncated word at byte offset {offset}")]
    TruncatedWord { offset: usize },

    #[error("image of {words} words exceeds memory capacity of {capacity}")]
    TooLarge { words: usize, capacity: usize },
}
