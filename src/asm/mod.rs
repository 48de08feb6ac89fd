//! Program image tooling.
//!
//! This module provides:
//! - The binary image loader (little-endian 16-bit words)
//! - A disassembler (image -> readable listing)

pub mod disasm;
pub mod image;

pub use disasm::{disassemble, list_instruction, ListedInstruction};
pub use image::{load_image, parse_image, Image, ImageError};
