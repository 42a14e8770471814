//! Motorola 68000 core with a table-driven decoder and declarative
//! microcoded instructions.
//!
//! Instructions are described, not hand-decoded: each one is an opcode
//! bit-pattern with wildcards, an optional size encoding, and a pipeline
//! of composable microcode steps. The decoder expands the descriptions
//! into size-specialised permutations, builds a 4-level 16-ary trie over
//! all 2^16 opcode words, and compresses it by interning pages. Decode is
//! four dependent table loads; the table is built once per process.
//!
//! The host owns the CPU and a bus; `Cpu::step` executes one instruction
//! and returns the cycles it consumed:
//!
//! ```ignore
//! let mut cpu = Cpu::new();
//! cpu.regs.pc = 0x0400;
//! cpu.prefetch(&mut bus);
//! loop {
//!     let cycles = cpu.step(&mut bus)?;
//!     clock.advance(cycles);
//! }
//! ```

pub mod addressing;
pub mod alu;
pub mod bus;
pub mod cpu;
pub mod decode;
pub mod disasm;
pub mod execute;
pub mod flags;
pub mod instruction;
pub mod isa;
pub mod microcode;
pub mod pattern;
pub mod registers;

pub use addressing::{AddrMode, AddrModeEncoding};
pub use alu::{Size, SizeEncoding};
pub use bus::M68kBus;
pub use cpu::Cpu;
pub use decode::DecodeTable;
pub use execute::ExecCtx;
pub use instruction::{Instruction, Permutation, SizeSpec};
pub use microcode::{BcdOp, EaOp, EaSide, Handler, Pipeline, RegClass, Transfer};
pub use pattern::{OpcodePattern, PatternError};
pub use registers::Registers;
