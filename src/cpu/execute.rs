//! The fetch-decode-execute engine.
//!
//! [`Cpu`] owns the machine state (registers, stack, memory, program
//! counter) and drives it one instruction at a time. Each step is atomic:
//! an instruction either applies all of its effects and yields the next
//! program counter, or the machine transitions to `Faulted` with the
//! fault kind and the faulting address, leaving the step's effects
//! unapplied.

use crate::console::Console;
use crate::cpu::decode::{self, DecodeError, Instruction, Operand, Target};
use crate::cpu::memory::{Memory, MemoryError};
use crate::cpu::registers::Registers;
use crate::word::Word;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Engine execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// Executing instructions.
    Running,
    /// Stopped by the `halt` opcode (terminal).
    Halted,
    /// Stopped by a fatal fault (terminal).
    Faulted,
}

/// The machine: registers, stack, memory, program counter, and the
/// console it performs `in`/`out` against.
pub struct Cpu<C> {
    /// The register file.
    pub regs: Registers,
    /// Main memory.
    pub mem: Memory,
    /// The value and call-return stack.
    pub stack: Vec<Word>,
    /// Address of the next instruction to fetch.
    pub pc: Word,
    /// Current execution state.
    pub state: CpuState,
    /// Instructions executed so far.
    pub cycles: u64,
    console: C,
    last_fault: Option<Fault>,
}

impl<C: Console> Cpu<C> {
    /// Create a machine with zeroed state, wired to the given console.
    pub fn new(console: C) -> Self {
        Self {
            regs: Registers::new(),
            mem: Memory::new(),
            stack: Vec::new(),
            pc: Word::zero(),
            state: CpuState::Running,
            cycles: 0,
            console,
            last_fault: None,
        }
    }

    /// Reset everything except the console.
    pub fn reset(&mut self) {
        self.regs.reset();
        self.mem.clear();
        self.stack.clear();
        self.pc = Word::zero();
        self.state = CpuState::Running;
        self.cycles = 0;
        self.last_fault = None;
    }

    /// Load a program image at address 0.
    pub fn load_image(&mut self, words: &[u16]) -> Result<(), MemoryError> {
        self.mem.load_image(words)
    }

    /// Execute a single instruction.
    ///
    /// Returns the instruction that was executed. On a fault the machine
    /// transitions to [`CpuState::Faulted`] and the error carries the
    /// fault kind and the faulting program counter.
    pub fn step(&mut self) -> Result<Instruction, CpuError> {
        if self.state != CpuState::Running {
            return Err(CpuError::NotRunning(self.state));
        }

        let pc = self.pc;
        let instr = match decode::decode(&self.mem, pc) {
            Ok(instr) => instr,
            Err(e) => return Err(self.fault(pc, e.into())),
        };

        if let Err(e) = self.execute(instr) {
            return Err(match e {
                StepError::Fault(kind) => self.fault(pc, kind),
                StepError::Io(source) => {
                    self.state = CpuState::Faulted;
                    CpuError::Io { pc, source }
                }
            });
        }

        self.cycles += 1;
        Ok(instr)
    }

    /// Run until halt or fault.
    ///
    /// Returns the number of instructions executed.
    pub fn run(&mut self) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;

        while self.state == CpuState::Running {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Run for at most `max_cycles` instructions.
    pub fn run_limited(&mut self, max_cycles: u64) -> Result<u64, CpuError> {
        let start_cycles = self.cycles;
        let limit = self.cycles + max_cycles;

        while self.state == CpuState::Running && self.cycles < limit {
            self.step()?;
        }

        Ok(self.cycles - start_cycles)
    }

    /// Apply one decoded instruction, updating the program counter.
    fn execute(&mut self, instr: Instruction) -> Result<(), StepError> {
        // Fall-through target; jump opcodes override it.
        let next = self.pc.offset(instr.width());

        match instr {
            Instruction::Halt => {
                self.state = CpuState::Halted;
                self.pc = next;
            }

            Instruction::Set { dest, b } => {
                let value = self.value(b);
                self.regs.set(dest, value);
                self.pc = next;
            }

            Instruction::Push { a } => {
                let value = self.value(a);
                self.stack.push(value);
                self.pc = next;
            }

            Instruction::Pop { dest } => {
                let value = self.pop()?;
                self.write(dest, value);
                self.pc = next;
            }

            Instruction::Eq { dest, b, c } => {
                let result = self.value(b) == self.value(c);
                self.write(dest, Word::new(result as u16));
                self.pc = next;
            }

            Instruction::Gt { dest, b, c } => {
                let result = self.value(b) > self.value(c);
                self.write(dest, Word::new(result as u16));
                self.pc = next;
            }

            Instruction::Jmp { a } => {
                self.pc = self.value(a);
            }

            Instruction::Jt { a, b } => {
                self.pc = if !self.value(a).is_zero() {
                    self.value(b)
                } else {
                    next
                };
            }

            Instruction::Jf { a, b } => {
                self.pc = if self.value(a).is_zero() {
                    self.value(b)
                } else {
                    next
                };
            }

            Instruction::Add { dest, b, c } => {
                let result = self.value(b).wrapping_add(self.value(c));
                self.write(dest, result);
                self.pc = next;
            }

            Instruction::Mult { dest, b, c } => {
                let result = self.value(b).wrapping_mul(self.value(c));
                self.write(dest, result);
                self.pc = next;
            }

            Instruction::Mod { dest, b, c } => {
                let result = self
                    .value(b)
                    .checked_rem(self.value(c))
                    .ok_or(FaultKind::DivideByZero)?;
                self.write(dest, result);
                self.pc = next;
            }

            Instruction::And { dest, b, c } => {
                let result = self.value(b) & self.value(c);
                self.write(dest, result);
                self.pc = next;
            }

            Instruction::Or { dest, b, c } => {
                let result = self.value(b) | self.value(c);
                self.write(dest, result);
                self.pc = next;
            }

            Instruction::Not { dest, b } => {
                let result = !self.value(b);
                self.write(dest, result);
                self.pc = next;
            }

            Instruction::Rmem { dest, b } => {
                let addr = self.value(b);
                let value = self.mem.read_word(addr);
                self.write(dest, value);
                self.pc = next;
            }

            Instruction::Wmem { a, b } => {
                let addr = self.value(a);
                let value = self.value(b);
                self.mem.write_word(addr, value);
                self.pc = next;
            }

            Instruction::Call { a } => {
                // `next` is pc + 2, the return address.
                self.stack.push(next);
                self.pc = self.value(a);
            }

            Instruction::Ret => {
                self.pc = self.pop()?;
            }

            Instruction::Out { a } => {
                let value = self.value(a);
                self.console.output_word(value)?;
                self.pc = next;
            }

            Instruction::In { dest } => {
                let value = self.console.input_word()?;
                self.write(dest, value);
                self.pc = next;
            }

            Instruction::Noop => {
                self.pc = next;
            }
        }

        Ok(())
    }

    /// Resolve a source operand against the current registers.
    #[inline]
    fn value(&self, op: Operand) -> Word {
        op.resolve(&self.regs)
    }

    /// Write to a resolved destination.
    #[inline]
    fn write(&mut self, target: Target, value: Word) {
        match target {
            Target::Register(n) => self.regs.set(n, value),
            Target::Memory(addr) => self.mem.write_word(addr, value),
        }
    }

    #[inline]
    fn pop(&mut self) -> Result<Word, FaultKind> {
        self.stack.pop().ok_or(FaultKind::StackUnderflow)
    }

    /// Transition to Faulted and build the error for the caller.
    fn fault(&mut self, pc: Word, kind: FaultKind) -> CpuError {
        let fault = Fault { pc, kind };
        self.state = CpuState::Faulted;
        self.last_fault = Some(fault);
        CpuError::Fault(fault)
    }

    /// The fault that stopped the machine, if any.
    pub fn last_fault(&self) -> Option<Fault> {
        self.last_fault
    }

    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    /// A serializable snapshot of the machine's registers, stack, and
    /// control state. Memory is omitted; it is 32k cells.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state,
            pc: self.pc,
            registers: self.regs.clone(),
            stack: self.stack.clone(),
            cycles: self.cycles,
            fault: self.last_fault,
        }
    }
}

impl<C> std::fmt::Debug for Cpu<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("pc", &self.pc)
            .field("cycles", &self.cycles)
            .field("regs", &self.regs)
            .field("stack_depth", &self.stack.len())
            .finish()
    }
}

/// Snapshot of machine state for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: CpuState,
    pub pc: Word,
    pub registers: Registers,
    pub stack: Vec<Word>,
    pub cycles: u64,
    pub fault: Option<Fault>,
}

/// The fatal fault conditions of the instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum FaultKind {
    #[error("invalid opcode {0}")]
    InvalidOpcode(u16),

    #[error("invalid operand {0}")]
    InvalidOperand(u16),

    #[error("stack underflow")]
    StackUnderflow,

    #[error("mod with zero divisor")]
    DivideByZero,
}

impl From<DecodeError> for FaultKind {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::InvalidOpcode(op) => FaultKind::InvalidOpcode(op),
            DecodeError::InvalidOperand(raw) => FaultKind::InvalidOperand(raw),
        }
    }
}

/// A fault together with the address of the instruction that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("fault at address {pc}: {kind}")]
pub struct Fault {
    pub pc: Word,
    pub kind: FaultKind,
}

/// Errors surfaced by [`Cpu::step`] and the run loops.
#[derive(Debug, Error)]
pub enum CpuError {
    #[error("cpu not running: {0:?}")]
    NotRunning(CpuState),

    #[error(transparent)]
    Fault(#[from] Fault),

    #[error("console i/o error at address {pc}: {source}")]
    Io {
        pc: Word,
        source: std::io::Error,
    },
}

/// Why a single execute call stopped short; internal to the step loop.
enum StepError {
    Fault(FaultKind),
    Io(std::io::Error),
}

impl From<FaultKind> for StepError {
    fn from(kind: FaultKind) -> Self {
        StepError::Fault(kind)
    }
}

impl From<std::io::Error> for StepError {
    fn from(e: std::io::Error) -> Self {
        StepError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedConsole;

    fn cpu_with(program: &[u16]) -> Cpu<ScriptedConsole> {
        let mut cpu = Cpu::new(ScriptedConsole::new());
        cpu.load_image(program).unwrap();
        cpu
    }

    fn expect_fault(result: Result<u64, CpuError>) -> Fault {
        match result {
            Err(CpuError::Fault(fault)) => fault,
            other => panic!("expected fault, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_halt() {
        let mut cpu = cpu_with(&[0]);
        let executed = cpu.run().unwrap();
        assert_eq!(executed, 1);
        assert!(cpu.is_halted());
    }

    #[test]
    fn test_step_after_halt_is_an_error() {
        let mut cpu = cpu_with(&[0]);
        cpu.run().unwrap();
        assert!(matches!(
            cpu.step(),
            Err(CpuError::NotRunning(CpuState::Halted))
        ));
    }

    #[test]
    fn test_set_out_halt() {
        // set R0, 3 / out R0 / halt
        let mut cpu = cpu_with(&[1, 32768, 3, 19, 32768, 0]);
        cpu.run().unwrap();
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.get(0).get(), 3);
        assert_eq!(cpu.console.output(), "\u{3}");
    }

    #[test]
    fn test_add_into_register_then_out() {
        // add R0, 4, 5 / out R0 — prints the character with code point 9.
        let mut cpu = cpu_with(&[9, 32768, 4, 5, 19, 32768, 0]);
        cpu.run().unwrap();
        assert_eq!(cpu.regs.get(0).get(), 9);
        assert_eq!(cpu.console.output(), "\t");
    }

    #[test]
    fn test_add_wraps_modulo() {
        // add R1, 32767, 2 == 1
        let mut cpu = cpu_with(&[9, 32769, 32767, 2, 0]);
        cpu.run().unwrap();
        assert_eq!(cpu.regs.get(1).get(), 1);
    }

    #[test]
    fn test_mult_and_mod() {
        // mult R0, 300, 200 / mod R1, 17, 5
        let mut cpu = cpu_with(&[10, 32768, 300, 200, 11, 32769, 17, 5, 0]);
        cpu.run().unwrap();
        assert_eq!(cpu.regs.get(0).get(), 60000 % 32768);
        assert_eq!(cpu.regs.get(1).get(), 2);
    }

    #[test]
    fn test_mod_by_zero_faults() {
        let mut cpu = cpu_with(&[11, 32768, 17, 0, 0]);
        let fault = expect_fault(cpu.run());
        assert_eq!(fault.kind, FaultKind::DivideByZero);
        assert_eq!(fault.pc, Word::zero());
        assert_eq!(cpu.state, CpuState::Faulted);
        // The destination register is untouched.
        assert!(cpu.regs.get(0).is_zero());
    }

    #[test]
    fn test_eq_gt() {
        // eq R0, 7, 7 / gt R1, 8, 3 / gt R2, 3, 8
        let mut cpu = cpu_with(&[
            4, 32768, 7, 7, //
            5, 32769, 8, 3, //
            5, 32770, 3, 8, //
            0,
        ]);
        cpu.run().unwrap();
        assert_eq!(cpu.regs.get(0).get(), 1);
        assert_eq!(cpu.regs.get(1).get(), 1);
        assert_eq!(cpu.regs.get(2).get(), 0);
    }

    #[test]
    fn test_not_twice_is_identity() {
        // set R0, 12345 / not R0, R0 / not R0, R0
        let mut cpu = cpu_with(&[1, 32768, 12345, 14, 32768, 32768, 14, 32768, 32768, 0]);
        cpu.run().unwrap();
        assert_eq!(cpu.regs.get(0).get(), 12345);
    }

    #[test]
    fn test_jmp_skips() {
        // jmp 3 / halt(unreached data 9999 would fault) / set R0, 1 / halt
        let mut cpu = cpu_with(&[6, 3, 9999, 1, 32768, 1, 0]);
        cpu.run().unwrap();
        assert_eq!(cpu.regs.get(0).get(), 1);
    }

    #[test]
    fn test_jt_jf() {
        // jt 1, 5 / (data) / jf 0, 8 / (data) / halt
        let mut cpu = cpu_with(&[7, 1, 5, 9999, 9999, 8, 0, 8, 0]);
        cpu.run().unwrap();
        assert!(cpu.is_halted());
        assert_eq!(cpu.cycles, 3);
    }

    #[test]
    fn test_jt_falls_through_on_zero() {
        // jt 0, 100 / halt
        let mut cpu = cpu_with(&[7, 0, 100, 0]);
        cpu.run().unwrap();
        assert!(cpu.is_halted());
        assert_eq!(cpu.cycles, 2);
    }

    #[test]
    fn test_push_pop_lifo() {
        // push 11 / push 22 / pop R0 / pop R1 / halt
        let mut cpu = cpu_with(&[2, 11, 2, 22, 3, 32768, 3, 32769, 0]);
        cpu.run().unwrap();
        assert_eq!(cpu.regs.get(0).get(), 22);
        assert_eq!(cpu.regs.get(1).get(), 11);
        assert!(cpu.stack.is_empty());
    }

    #[test]
    fn test_pop_empty_stack_faults() {
        let mut cpu = cpu_with(&[3, 32768, 0]);
        let fault = expect_fault(cpu.run());
        assert_eq!(fault.kind, FaultKind::StackUnderflow);
        assert_eq!(fault.pc, Word::zero());
    }

    #[test]
    fn test_pop_into_memory_destination() {
        // push 42 / pop [100] / rmem R0, 100 / halt
        let mut cpu = cpu_with(&[2, 42, 3, 100, 15, 32768, 100, 0]);
        cpu.run().unwrap();
        assert_eq!(cpu.regs.get(0).get(), 42);
    }

    #[test]
    fn test_call_then_ret_resumes_after_call() {
        // 0: call 4
        // 2: halt            <- resumed here, call_pc + 2
        // 3: (data)
        // 4: set R0, 1
        // 7: ret
        let mut cpu = cpu_with(&[17, 4, 0, 9999, 1, 32768, 1, 18]);
        cpu.run().unwrap();
        assert!(cpu.is_halted());
        assert_eq!(cpu.regs.get(0).get(), 1);
        assert!(cpu.stack.is_empty());
    }

    #[test]
    fn test_ret_on_empty_stack_faults() {
        // ret as the very first instruction must not fall through.
        let mut cpu = cpu_with(&[18, 0]);
        let fault = expect_fault(cpu.run());
        assert_eq!(fault.kind, FaultKind::StackUnderflow);
        assert_eq!(fault.pc, Word::zero());
        assert_eq!(cpu.state, CpuState::Faulted);
    }

    #[test]
    fn test_invalid_opcode_faults_with_address() {
        // noop / opcode 22
        let mut cpu = cpu_with(&[21, 22]);
        let fault = expect_fault(cpu.run());
        assert_eq!(fault.kind, FaultKind::InvalidOpcode(22));
        assert_eq!(fault.pc, Word::new(1));
        assert_eq!(cpu.last_fault(), Some(fault));
    }

    #[test]
    fn test_invalid_operand_faults() {
        // jmp with an operand in the invalid range.
        let mut cpu = cpu_with(&[6, 40000]);
        let fault = expect_fault(cpu.run());
        assert_eq!(fault.kind, FaultKind::InvalidOperand(40000));
        assert_eq!(fault.pc, Word::zero());
    }

    #[test]
    fn test_wmem_rmem_roundtrip() {
        // set R0, 2000 / wmem R0, 77 / rmem R1, R0 / halt
        let mut cpu = cpu_with(&[
            1, 32768, 2000, //
            16, 32768, 77, //
            15, 32769, 32768, //
            0,
        ]);
        cpu.run().unwrap();
        assert_eq!(cpu.mem.read(Word::new(2000)), 77);
        assert_eq!(cpu.regs.get(1).get(), 77);
    }

    #[test]
    fn test_rmem_of_unwritten_memory_is_zero() {
        // rmem R0, 30000 / halt
        let mut cpu = cpu_with(&[15, 32768, 30000, 0]);
        cpu.run().unwrap();
        assert!(cpu.regs.get(0).is_zero());
    }

    #[test]
    fn test_in_reads_scripted_input() {
        // in R0 / in R1 / halt, fed "A\n"
        let mut cpu = Cpu::new(ScriptedConsole::with_input("A\n"));
        cpu.load_image(&[20, 32768, 20, 32769, 0]).unwrap();
        cpu.run().unwrap();
        assert_eq!(cpu.regs.get(0).get(), 'A' as u16);
        assert_eq!(cpu.regs.get(1).get(), '\n' as u16);
    }

    #[test]
    fn test_in_with_exhausted_script_is_io_error() {
        let mut cpu = cpu_with(&[20, 32768, 0]);
        match cpu.run() {
            Err(CpuError::Io { pc, .. }) => assert_eq!(pc, Word::zero()),
            other => panic!("expected i/o error, got {:?}", other.map(|_| ())),
        }
        assert_eq!(cpu.state, CpuState::Faulted);
        assert_eq!(cpu.last_fault(), None);
    }

    #[test]
    fn test_noop_changes_nothing_but_pc() {
        let mut cpu = cpu_with(&[21, 0]);
        cpu.step().unwrap();
        assert_eq!(cpu.pc, Word::new(1));
        assert_eq!(cpu.regs, Registers::new());
        assert!(cpu.stack.is_empty());
    }

    #[test]
    fn test_run_limited_stops_at_budget() {
        // jmp 0 — an infinite loop.
        let mut cpu = cpu_with(&[6, 0]);
        let executed = cpu.run_limited(100).unwrap();
        assert_eq!(executed, 100);
        assert!(cpu.is_running());
    }

    #[test]
    fn test_out_with_register_operand() {
        // set R3, 33 ('!') / out R3 / halt
        let mut cpu = cpu_with(&[1, 32771, 33, 19, 32771, 0]);
        cpu.run().unwrap();
        assert_eq!(cpu.console.output(), "!");
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut cpu = cpu_with(&[1, 32768, 5, 2, 7, 0]);
        cpu.run().unwrap();
        let snapshot = cpu.snapshot();
        assert_eq!(snapshot.state, CpuState::Halted);
        assert_eq!(snapshot.registers.get(0).get(), 5);
        assert_eq!(snapshot.stack, vec![Word::new(7)]);
        assert_eq!(snapshot.cycles, 3);
        assert_eq!(snapshot.fault, None);
    }
}
