//! The virtual machine core.
//!
//! This module implements the complete architecture:
//! - 32,768 sixteen-bit memory cells, word-addressed
//! - 8 general registers and an unbounded value/call stack
//! - a 22-opcode instruction set over 15-bit words

pub mod decode;
pub mod execute;
pub mod memory;
pub mod registers;

pub use decode::{decode, DecodeError, Instruction, Operand, Target};
pub use execute::{Cpu, CpuError, CpuState, Fault, FaultKind, Snapshot};
pub use memory::{Memory, MemoryError, MEMORY_SIZE};
pub use registers::{Registers, NUM_REGISTERS};
