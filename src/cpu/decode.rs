//! Operand classification and instruction decoding.
//!
//! A raw 16-bit value is interpreted by range:
//! - 0..=32767: a literal value
//! - 32768..=32775: a reference to register 0..=7
//! - 32776..=65535: invalid
//!
//! Operands decode in one of two modes. Value mode ([`Operand`]) is used
//! for sources: a register reference stands for the register's content.
//! Raw mode ([`Target`]) is used for write destinations: a register
//! reference names the register itself and anything below the register
//! range is a memory address, never a literal.

use crate::cpu::memory::Memory;
use crate::cpu::registers::{Registers, NUM_REGISTERS};
use crate::word::Word;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw encoding of register 0.
pub const REGISTER_BASE: u16 = 32768;

/// Raw encoding of register 7, the highest valid operand value.
pub const REGISTER_TOP: u16 = REGISTER_BASE + NUM_REGISTERS as u16 - 1;

/// A source operand, decoded in value mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
    /// The value itself.
    Literal(Word),
    /// The content of register 0..=7.
    Register(usize),
}

impl Operand {
    /// Classify a raw operand word.
    pub fn decode(raw: u16) -> Result<Self, DecodeError> {
        match raw {
            0..=32767 => Ok(Operand::Literal(Word::new(raw))),
            REGISTER_BASE..=REGISTER_TOP => {
                Ok(Operand::Register((raw - REGISTER_BASE) as usize))
            }
            _ => Err(DecodeError::InvalidOperand(raw)),
        }
    }

    /// Resolve to a value against the current register file.
    #[inline]
    pub fn resolve(self, regs: &Registers) -> Word {
        match self {
            Operand::Literal(w) => w,
            Operand::Register(n) => regs.get(n),
        }
    }
}

/// A write destination, decoded in raw mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Target {
    /// Register 0..=7.
    Register(usize),
    /// A memory cell.
    Memory(Word),
}

impl Target {
    /// Classify a raw destination word.
    pub fn decode(raw: u16) -> Result<Self, DecodeError> {
        match raw {
            0..=32767 => Ok(Target::Memory(Word::new(raw))),
            REGISTER_BASE..=REGISTER_TOP => {
                Ok(Target::Register((raw - REGISTER_BASE) as usize))
            }
            _ => Err(DecodeError::InvalidOperand(raw)),
        }
    }

    /// Decode a destination that must name a register (`set`). A memory
    /// destination here is a malformed program.
    pub fn decode_register(raw: u16) -> Result<usize, DecodeError> {
        match Self::decode(raw)? {
            Target::Register(n) => Ok(n),
            Target::Memory(_) => Err(DecodeError::InvalidOperand(raw)),
        }
    }
}

/// A decoded instruction, one variant per opcode 0..=21.
///
/// Operand names follow the ISA convention: `a`, `b`, `c` are the first,
/// second and third operand words; `dest` marks an operand decoded in
/// raw/destination mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// `halt`: stop execution.
    Halt,
    /// `set a b`: register `a` := value(b).
    Set { dest: usize, b: Operand },
    /// `push a`: push value(a).
    Push { a: Operand },
    /// `pop a`: dest(a) := popped value.
    Pop { dest: Target },
    /// `eq a b c`: dest(a) := 1 if value(b) == value(c) else 0.
    Eq { dest: Target, b: Operand, c: Operand },
    /// `gt a b c`: dest(a) := 1 if value(b) > value(c) else 0.
    Gt { dest: Target, b: Operand, c: Operand },
    /// `jmp a`: pc := value(a).
    Jmp { a: Operand },
    /// `jt a b`: pc := value(b) if value(a) != 0.
    Jt { a: Operand, b: Operand },
    /// `jf a b`: pc := value(b) if value(a) == 0.
    Jf { a: Operand, b: Operand },
    /// `add a b c`: dest(a) := (value(b) + value(c)) mod 32768.
    Add { dest: Target, b: Operand, c: Operand },
    /// `mult a b c`: dest(a) := (value(b) * value(c)) mod 32768.
    Mult { dest: Target, b: Operand, c: Operand },
    /// `mod a b c`: dest(a) := value(b) mod value(c).
    Mod { dest: Target, b: Operand, c: Operand },
    /// `and a b c`: dest(a) := value(b) AND value(c).
    And { dest: Target, b: Operand, c: Operand },
    /// `or a b c`: dest(a) := value(b) OR value(c).
    Or { dest: Target, b: Operand, c: Operand },
    /// `not a b`: dest(a) := 32767 - value(b).
    Not { dest: Target, b: Operand },
    /// `rmem a b`: dest(a) := memory[value(b)].
    Rmem { dest: Target, b: Operand },
    /// `wmem a b`: memory[value(a)] := value(b).
    Wmem { a: Operand, b: Operand },
    /// `call a`: push pc + 2, then pc := value(a).
    Call { a: Operand },
    /// `ret`: pc := popped value.
    Ret,
    /// `out a`: write the character with code point value(a).
    Out { a: Operand },
    /// `in a`: dest(a) := next input word.
    In { dest: Target },
    /// `noop`: advance pc by 1.
    Noop,
}

impl Instruction {
    /// Instruction width in words, including the opcode word itself.
    pub const fn width(&self) -> u16 {
        match self {
            Instruction::Halt | Instruction::Ret | Instruction::Noop => 1,
            Instruction::Push { .. }
            | Instruction::Pop { .. }
            | Instruction::Jmp { .. }
            | Instruction::Call { .. }
            | Instruction::Out { .. }
            | Instruction::In { .. } => 2,
            Instruction::Set { .. }
            | Instruction::Jt { .. }
            | Instruction::Jf { .. }
            | Instruction::Not { .. }
            | Instruction::Rmem { .. }
            | Instruction::Wmem { .. } => 3,
            Instruction::Eq { .. }
            | Instruction::Gt { .. }
            | Instruction::Add { .. }
            | Instruction::Mult { .. }
            | Instruction::Mod { .. }
            | Instruction::And { .. }
            | Instruction::Or { .. } => 4,
        }
    }
}

/// Width in words of an opcode number, `None` for unrecognized opcodes.
///
/// This is the static opcode table view used by the disassembler, which
/// must keep walking past operand words it cannot fully decode.
pub const fn opcode_width(opcode: u16) -> Option<u16> {
    Some(match opcode {
        0 | 18 | 21 => 1,
        2 | 3 | 6 | 17 | 19 | 20 => 2,
        1 | 7 | 8 | 14 | 15 | 16 => 3,
        4 | 5 | 9 | 10 | 11 | 12 | 13 => 4,
        _ => return None,
    })
}

/// Mnemonic of an opcode number, `None` for unrecognized opcodes.
pub const fn mnemonic(opcode: u16) -> Option<&'static str> {
    Some(match opcode {
        0 => "halt",
        1 => "set",
        2 => "push",
        3 => "pop",
        4 => "eq",
        5 => "gt",
        6 => "jmp",
        7 => "jt",
        8 => "jf",
        9 => "add",
        10 => "mult",
        11 => "mod",
        12 => "and",
        13 => "or",
        14 => "not",
        15 => "rmem",
        16 => "wmem",
        17 => "call",
        18 => "ret",
        19 => "out",
        20 => "in",
        21 => "noop",
        _ => return None,
    })
}

/// Decode the instruction at `pc`.
///
/// Reads the opcode word and as many operand words as the opcode needs,
/// validating every operand encoding. Decoding is pure: it never touches
/// registers or mutates memory.
pub fn decode(mem: &Memory, pc: Word) -> Result<Instruction, DecodeError> {
    let opcode = mem.read(pc);
    let a = mem.read(pc.offset(1));
    let b = mem.read(pc.offset(2));
    let c = mem.read(pc.offset(3));

    let instr = match opcode {
        0 => Instruction::Halt,
        1 => Instruction::Set {
            dest: Target::decode_register(a)?,
            b: Operand::decode(b)?,
        },
        2 => Instruction::Push {
            a: Operand::decode(a)?,
        },
        3 => Instruction::Pop {
            dest: Target::decode(a)?,
        },
        4 => Instruction::Eq {
            dest: Target::decode(a)?,
            b: Operand::decode(b)?,
            c: Operand::decode(c)?,
        },
        5 => Instruction::Gt {
            dest: Target::decode(a)?,
            b: Operand::decode(b)?,
            c: Operand::decode(c)?,
        },
        6 => Instruction::Jmp {
            a: Operand::decode(a)?,
        },
        7 => Instruction::Jt {
            a: Operand::decode(a)?,
            b: Operand::decode(b)?,
        },
        8 => Instruction::Jf {
            a: Operand::decode(a)?,
            b: Operand::decode(b)?,
        },
        9 => Instruction::Add {
            dest: Target::decode(a)?,
            b: Operand::decode(b)?,
            c: Operand::decode(c)?,
        },
        10 => Instruction::Mult {
            dest: Target::decode(a)?,
            b: Operand::decode(b)?,
            c: Operand::decode(c)?,
        },
        11 => Instruction::Mod {
            dest: Target::decode(a)?,
            b: Operand::decode(b)?,
            c: Operand::decode(c)?,
        },
        12 => Instruction::And {
            dest: Target::decode(a)?,
            b: Operand::decode(b)?,
            c: Operand::decode(c)?,
        },
        13 => Instruction::Or {
            dest: Target::decode(a)?,
            b: Operand::decode(b)?,
            c: Operand::decode(c)?,
        },
        14 => Instruction::Not {
            dest: Target::decode(a)?,
            b: Operand::decode(b)?,
        },
        15 => Instruction::Rmem {
            dest: Target::decode(a)?,
            b: Operand::decode(b)?,
        },
        16 => Instruction::Wmem {
            a: Operand::decode(a)?,
            b: Operand::decode(b)?,
        },
        17 => Instruction::Call {
            a: Operand::decode(a)?,
        },
        18 => Instruction::Ret,
        19 => Instruction::Out {
            a: Operand::decode(a)?,
        },
        20 => Instruction::In {
            dest: Target::decode(a)?,
        },
        21 => Instruction::Noop,
        _ => return Err(DecodeError::InvalidOpcode(opcode)),
    };

    Ok(instr)
}

/// Errors that can occur during instruction decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DecodeError {
    #[error("invalid opcode {0}")]
    InvalidOpcode(u16),

    #[error("invalid operand {0}")]
    InvalidOperand(u16),
}
