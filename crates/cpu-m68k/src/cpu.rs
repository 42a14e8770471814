//! The CPU proper: register state plus the step loop entry point.
//!
//! Execution is table-driven: `step` looks the current opcode word up in
//! the decode table and runs the bound pipeline against a fresh execution
//! context. The pipeline's trailing prefetch leaves the next opcode in
//! `ir`, so the host just calls `step` in a loop after priming once with
//! [`Cpu::prefetch`].

#![allow(clippy::cast_possible_truncation)]

use crate::bus::M68kBus;
use crate::decode::DecodeTable;
use crate::execute::ExecCtx;
use crate::isa;
use crate::pattern::PatternError;
use crate::registers::Registers;

/// Motorola 68000 CPU state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cpu {
    /// Register file.
    pub regs: Registers,
    /// Instruction register: the opcode word being executed.
    pub ir: u16,
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

impl Cpu {
    /// A CPU in reset state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            ir: 0,
        }
    }

    /// Prime the instruction register from `pc`.
    ///
    /// Loads `ir` with the word at `pc` and advances `pc` past it, the
    /// state every instruction pipeline starts from.
    pub fn prefetch(&mut self, bus: &mut dyn M68kBus) {
        let mut exec = ExecCtx::new(bus);
        self.ir = exec.fetch(crate::alu::Size::Word, self) as u16;
    }

    /// Execute one instruction using the built-in instruction set.
    /// Returns the cycles consumed; fails only when the built-in set's
    /// opcode templates do not compile.
    pub fn step(&mut self, bus: &mut dyn M68kBus) -> Result<u32, PatternError> {
        Ok(self.step_with(isa::decode_table()?, bus))
    }

    /// Execute one instruction against a caller-built decode table.
    pub fn step_with(&mut self, table: &DecodeTable, bus: &mut dyn M68kBus) -> u32 {
        let mut exec = ExecCtx::new(bus);
        table.handler(self.ir).run(self, &mut exec);
        exec.clk
    }
}
