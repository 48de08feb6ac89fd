//! # Synacor VM
//!
//! A virtual machine for the Synacor challenge architecture: 15-bit
//! words, eight general registers, an unbounded stack, a flat
//! word-addressable memory, and a 22-opcode instruction set.

pub mod asm;
pub mod console;
pub mod cpu;
pub mod word;

// Re-export commonly used types
pub use asm::{disassemble, load_image, parse_image, Image, ImageError};
pub use console::{Console, ScriptedConsole, StdConsole};
pub use cpu::{
    Cpu, CpuError, CpuState, Fault, FaultKind, Instruction, Memory, Registers, Snapshot,
};
pub use word::Word;
