//! Instruction descriptors and size-variant expansion.
//!
//! An [`Instruction`] is the declarative unit the decoder is built from:
//! a mnemonic, an opcode pattern, an optional size field, and a microcode
//! pipeline. Before table construction each instruction is expanded into
//! [`Permutation`]s, one per concrete size its encoding admits, each with
//! the size field pinned in its opcode pattern.

#![allow(clippy::cast_possible_truncation)]

use crate::alu::{Size, SizeEncoding};
use crate::microcode::{OperandInfo, Pipeline};
use crate::pattern::OpcodePattern;

/// How an instruction encodes its operand size.
#[derive(Debug, Clone, Copy)]
pub enum SizeSpec {
    /// No size: the instruction is width-independent.
    None,
    /// Fixed size not present in the encoding (ABCD is always byte).
    Static(Size),
    /// Size field at bit `pos`, interpreted through `enc`.
    Dynamic { pos: u8, enc: SizeEncoding },
}

/// One instruction of the declarative instruction set.
#[derive(Debug, Clone)]
pub struct Instruction {
    /// Mnemonic, lower case.
    pub name: &'static str,
    /// Size encoding, if any.
    pub size: SizeSpec,
    /// Opcode pattern with wildcards.
    pub opcode: OpcodePattern,
    /// Microcode body.
    pub code: Pipeline,
}

impl Instruction {
    /// Expand into one permutation per admissible size.
    ///
    /// For a dynamic size the field's bits are cleared from the wildcards
    /// and pinned to each mapped code in turn; field values that map to no
    /// size produce no permutation. Static and size-less instructions pass
    /// through unchanged.
    #[must_use]
    pub fn permutations(&self) -> Vec<Permutation> {
        match self.size {
            SizeSpec::None => vec![self.permutation(None, self.opcode)],
            SizeSpec::Static(size) => vec![self.permutation(Some(size), self.opcode)],
            SizeSpec::Dynamic { pos, enc } => {
                let width = enc.backing_width() as u8;
                (0..1u16 << width)
                    .filter_map(|code| {
                        let size = enc.decode(code)?;
                        Some(self.permutation(Some(size), self.opcode.with_field(pos, width, code)))
                    })
                    .collect()
            }
        }
    }

    fn permutation(&self, size: Option<Size>, opcode: OpcodePattern) -> Permutation {
        Permutation {
            name: self.name,
            size,
            opcode,
            code: self.code.clone(),
            info: self.code.info(),
        }
    }
}

/// One size-specialised variant of an instruction: the decoder's atom.
#[derive(Debug, Clone)]
pub struct Permutation {
    /// Mnemonic of the originating instruction.
    pub name: &'static str,
    /// Concrete operand size, or `None` for width-independent bodies.
    pub size: Option<Size>,
    /// Refined opcode pattern with the size field pinned.
    pub opcode: OpcodePattern,
    /// The originating instruction's microcode body.
    pub code: Pipeline,
    /// Operand descriptors for the disassembler.
    pub info: OperandInfo,
}
