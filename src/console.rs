//! The console I/O boundary.
//!
//! The `in` and `out` opcodes move single words across this trait.
//! Keeping it an explicit object handed to the machine at construction
//! time (rather than a hidden global input buffer) makes the engine
//! testable against a scripted source.

use crate::word::Word;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Single-word input and single-character output.
pub trait Console {
    /// Produce the next input word. May block until input is available.
    fn input_word(&mut self) -> io::Result<Word>;

    /// Emit the character whose code point is `w mod 32768`.
    fn output_word(&mut self, w: Word) -> io::Result<()>;
}

/// Line-buffered console over stdin/stdout.
///
/// Input is read a line at a time: when the buffer runs dry the console
/// prompts, reads a line (re-prompting on blank lines), appends a line
/// terminator, then yields one character per call. Output is written and
/// flushed per character so each `out` lands in program order.
#[derive(Debug, Default)]
pub struct StdConsole {
    buffer: VecDeque<char>,
}

impl StdConsole {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::new(),
        }
    }
}

impl Console for StdConsole {
    fn input_word(&mut self) -> io::Result<Word> {
        loop {
            if let Some(ch) = self.buffer.pop_front() {
                return Ok(Word::from_raw((ch as u32 % Word::MODULUS) as u16));
            }

            let mut out = io::stdout().lock();
            write!(out, "> ")?;
            out.flush()?;
            drop(out);

            let mut line = String::new();
            if io::stdin().lock().read_line(&mut line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "end of input",
                ));
            }
            let trimmed = line.trim_end_matches(['\r', '\n']);
            if trimmed.is_empty() {
                continue;
            }
            self.buffer.extend(trimmed.chars());
            self.buffer.push_back('\n');
        }
    }

    fn output_word(&mut self, w: Word) -> io::Result<()> {
        let mut out = io::stdout().lock();
        write!(out, "{}", w.to_char())?;
        out.flush()
    }
}

/// A console fed from a preset script, capturing all output.
#[derive(Debug, Default)]
pub struct ScriptedConsole {
    input: VecDeque<char>,
    output: String,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a console whose input script is `input`, verbatim.
    pub fn with_input(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            output: String::new(),
        }
    }

    /// Append a line to the input script, with its terminator.
    pub fn push_line(&mut self, line: &str) {
        self.input.extend(line.chars());
        self.input.push_back('\n');
    }

    /// Everything the program has written so far.
    pub fn output(&self) -> &str {
        &self.output
    }
}

impl Console for ScriptedConsole {
    fn input_word(&mut self) -> io::Result<Word> {
        match self.input.pop_front() {
            Some(ch) => Ok(Word::from_raw((ch as u32 % Word::MODULUS) as u16)),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "input script exhausted",
            )),
        }
    }

    fn output_word(&mut self, w: Word) -> io::Result<()> {
        self.output.push(w.to_char());
        Ok(())
    }
}
