//! Disassembler for program images.
//!
//! Produces a human-readable listing: one line per instruction with the
//! raw word encoding and a mnemonic form. Register operands render as
//! `R0`..`R7`, literals as decimal. Listing is pure and never touches
//! machine state; unknown opcodes render as `???` and advance one word
//! so the walk can continue.

use crate::cpu::decode::{mnemonic, opcode_width, REGISTER_BASE, REGISTER_TOP};
use crate::cpu::memory::{Memory, MEMORY_SIZE};
use crate::word::Word;

/// One listed instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedInstruction {
    /// Address of the opcode word.
    pub addr: Word,
    /// Width in words; the next instruction starts at `addr + width`.
    pub width: u16,
    /// The raw encoding, e.g. `"9 32768 4 5"`.
    pub raw: String,
    /// The mnemonic form, e.g. `"add R0 4 5"`.
    pub text: String,
}

impl ListedInstruction {
    /// Address of the following instruction (not wrapped; may be 32768
    /// when the listed instruction ends the address space).
    pub fn next_addr(&self) -> u32 {
        self.addr.get() as u32 + self.width as u32
    }
}

/// List the single instruction at `addr`.
pub fn list_instruction(mem: &Memory, addr: Word) -> ListedInstruction {
    let opcode = mem.read(addr);

    let Some(width) = opcode_width(opcode) else {
        return ListedInstruction {
            addr,
            width: 1,
            raw: opcode.to_string(),
            text: "???".to_string(),
        };
    };

    let operands: Vec<u16> = (1..width).map(|i| mem.read(addr.offset(i))).collect();

    let mut raw = opcode.to_string();
    for &op in &operands {
        raw.push(' ');
        raw.push_str(&op.to_string());
    }

    let mut text = mnemonic(opcode).unwrap_or("???").to_string();
    for (i, &op) in operands.iter().enumerate() {
        text.push(' ');
        if opcode == 19 && i == 0 && op <= Word::MAX {
            // A literal `out` operand reads better as the character it
            // prints.
            text.push_str(&format!("{:?}", Word::new(op).to_char()));
        } else {
            text.push_str(&format_operand(op));
        }
    }

    ListedInstruction {
        addr,
        width,
        raw,
        text,
    }
}

/// Render one raw operand word.
fn format_operand(raw: u16) -> String {
    match raw {
        0..=32767 => raw.to_string(),
        REGISTER_BASE..=REGISTER_TOP => format!("R{}", raw - REGISTER_BASE),
        _ => format!("?{}", raw),
    }
}

/// Disassemble `words` words of memory starting at `start`.
pub fn disassemble(mem: &Memory, start: Word, words: usize) -> String {
    let mut output = String::new();
    let end = (start.index() + words).min(MEMORY_SIZE);
    let mut cursor = start.index();

    while cursor < end {
        let line = list_instruction(mem, Word::new(cursor as u16));
        output.push_str(&format!(
            "{:05}: {:<20} {}\n",
            line.addr.get(),
            line.raw,
            line.text
        ));
        cursor += line.width as usize;
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_with(words: &[u16]) -> Memory {
        let mut mem = Memory::new();
        mem.load_image(words).unwrap();
        mem
    }

    #[test]
    fn test_listing_advances_by_declared_width() {
        // Every opcode must advance exactly its table width, even with
        // operand encodings the executor would reject.
        for opcode in 0u16..=21 {
            let mem = memory_with(&[opcode, 32768, 32769, 32770]);
            let line = list_instruction(&mem, Word::zero());
            assert_eq!(
                Some(line.width),
                opcode_width(opcode),
                "opcode {opcode}"
            );
            assert_eq!(line.next_addr(), line.width as u32);
        }
    }

    #[test]
    fn test_unknown_opcode_lists_as_unknown() {
        let mem = memory_with(&[22]);
        let line = list_instruction(&mem, Word::zero());
        assert_eq!(line.width, 1);
        assert_eq!(line.text, "???");
        assert_eq!(line.raw, "22");
    }

    #[test]
    fn test_register_and_literal_rendering() {
        let mem = memory_with(&[9, 32768, 4, 32775]);
        let line = list_instruction(&mem, Word::zero());
        assert_eq!(line.raw, "9 32768 4 32775");
        assert_eq!(line.text, "add R0 4 R7");
    }

    #[test]
    fn test_out_literal_renders_as_character() {
        let mem = memory_with(&[19, 10]);
        let line = list_instruction(&mem, Word::zero());
        assert_eq!(line.text, "out '\\n'");
    }

    #[test]
    fn test_out_register_renders_as_register() {
        let mem = memory_with(&[19, 32770]);
        let line = list_instruction(&mem, Word::zero());
        assert_eq!(line.text, "out R2");
    }

    #[test]
    fn test_invalid_operand_is_marked() {
        let mem = memory_with(&[6, 40000]);
        let line = list_instruction(&mem, Word::zero());
        assert_eq!(line.text, "jmp ?40000");
    }

    #[test]
    fn test_disassemble_walks_whole_program() {
        // set R0, 3 / out R0 / halt
        let program = [1, 32768, 3, 19, 32768, 0];
        let mem = memory_with(&program);
        let listing = disassemble(&mem, Word::zero(), program.len());
        let lines: Vec<&str> = listing.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("00000:"));
        assert!(lines[0].ends_with("set R0 3"));
        assert!(lines[1].starts_with("00003:"));
        assert!(lines[2].ends_with("halt"));
    }
}
