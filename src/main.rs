//! Synacor VM - CLI Entry Point
//!
//! Commands:
//! - `synacor-vm run <image>` - Execute a binary program image
//! - `synacor-vm disasm <image>` - Disassemble an image to a listing

use clap::{Parser, Subcommand};
use synacor::asm::disasm::list_instruction;
use synacor::{disassemble, load_image, Cpu, CpuState, Memory, StdConsole, Word};

#[derive(Parser)]
#[command(name = "synacor-vm")]
#[command(version = "0.1.0")]
#[command(about = "A virtual machine for the Synacor challenge architecture")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a program image until it halts
    Run {
        /// Path to the binary image to execute
        image: String,
        /// Maximum number of instructions to execute
        #[arg(short, long)]
        max_cycles: Option<u64>,
        /// Print each instruction before executing it
        #[arg(short, long)]
        trace: bool,
        /// Print a JSON snapshot of the final machine state
        #[arg(long)]
        dump_state: bool,
    },
    /// Disassemble an image to readable text
    Disasm {
        /// Path to the binary image
        image: String,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            image,
            max_cycles,
            trace,
            dump_state,
        } => {
            run_program(&image, max_cycles, trace, dump_state);
        }
        Commands::Disasm { image } => {
            disassemble_file(&image);
        }
    }
}

fn run_program(path: &str, max_cycles: Option<u64>, trace: bool, dump_state: bool) {
    let image = match load_image(path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Failed to load image: {}", e);
            std::process::exit(1);
        }
    };
    println!("Read {} bytes from {}", image.bytes_read, path);

    let mut cpu = Cpu::new(StdConsole::new());
    if let Err(e) = cpu.load_image(&image.words) {
        eprintln!("Failed to load program: {}", e);
        std::process::exit(1);
    }
    println!("Memory loaded {} words", image.len());

    let result = loop {
        if !cpu.is_running() {
            break Ok(());
        }
        if let Some(limit) = max_cycles {
            if cpu.cycles >= limit {
                break Ok(());
            }
        }
        if trace {
            let line = list_instruction(&cpu.mem, cpu.pc);
            eprintln!("{:05}: {:<20} {}", line.addr.get(), line.raw, line.text);
        }
        if let Err(e) = cpu.step() {
            break Err(e);
        }
    };

    if dump_state {
        match serde_json::to_string_pretty(&cpu.snapshot()) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Failed to serialize state: {}", e),
        }
    }

    match result {
        Ok(()) => {
            if cpu.state == CpuState::Running {
                eprintln!(
                    "Reached max cycles limit ({}). Use --max-cycles to increase.",
                    cpu.cycles
                );
            }
        }
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

fn disassemble_file(path: &str) {
    let image = match load_image(path) {
        Ok(image) => image,
        Err(e) => {
            eprintln!("Failed to load image: {}", e);
            std::process::exit(1);
        }
    };

    let mut mem = Memory::new();
    if let Err(e) = mem.load_image(&image.words) {
        eprintln!("Failed to load program: {}", e);
        std::process::exit(1);
    }

    print!("{}", disassemble(&mem, Word::zero(), image.len()));
}
