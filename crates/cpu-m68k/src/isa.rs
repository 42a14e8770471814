//! The declarative instruction set.
//!
//! Each instruction is one builder expression: an opcode template straight
//! from the data sheet, a size spec, and a microcode pipeline. The decode
//! table built from this list is process-constant and lives behind a
//! `Lazy`, so the first `step` pays the construction cost once; a template
//! error surfaces as a `Result` at that point rather than a panic.
//!
//! The set covers what the step vocabulary expresses: the MOVE family, the
//! BCD add/subtract pair, and NOP. Everything else decodes to the
//! illegal-instruction sentinel.

use once_cell::sync::Lazy;

use crate::addressing::{BCD_DST, BCD_SRC, EA_DST, EA_SRC};
use crate::alu::{Size, SizeEncoding};
use crate::decode::DecodeTable;
use crate::instruction::{Instruction, SizeSpec};
use crate::microcode::{BcdOp, EaOp, EaSide, Pipeline, RegClass};
use crate::pattern::{OpcodePattern, PatternError};

/// Build the instruction list.
pub fn instruction_set() -> Result<Vec<Instruction>, PatternError> {
    Ok(vec![
        Instruction {
            name: "move",
            size: SizeSpec::Dynamic {
                pos: 12,
                enc: SizeEncoding::MOVE,
            },
            opcode: OpcodePattern::new("00xxxxxxxxxxxxxx")?,
            code: Pipeline::new()
                .ea(EaSide::Src, true, true, EaOp::Load, &EA_SRC)
                .ea(EaSide::Dst, true, false, EaOp::Store, &EA_DST)
                .fetch(),
        },
        Instruction {
            name: "movea",
            size: SizeSpec::Dynamic {
                pos: 12,
                enc: SizeEncoding::MOVEA,
            },
            opcode: OpcodePattern::new("00xxxxx001xxxxxx")?,
            code: Pipeline::new()
                .ea(EaSide::Src, true, true, EaOp::Load, &EA_SRC)
                .streg(RegClass::Addr, 9)
                .fetch(),
        },
        Instruction {
            name: "abcd",
            size: SizeSpec::Static(Size::Byte),
            opcode: OpcodePattern::new("1100xxx10000xxxx")?,
            code: bcd_body(BcdOp::Add),
        },
        Instruction {
            name: "sbcd",
            size: SizeSpec::Static(Size::Byte),
            opcode: OpcodePattern::new("1000xxx10000xxxx")?,
            code: bcd_body(BcdOp::Sub),
        },
        Instruction {
            name: "nop",
            size: SizeSpec::None,
            opcode: OpcodePattern::new("0100111001110001")?,
            code: Pipeline::new().fetch(),
        },
    ])
}

/// ABCD/SBCD share a body up to the operation: load both operands through
/// the register/memory encoding, combine, store back, prefetch.
fn bcd_body(op: BcdOp) -> Pipeline {
    Pipeline::new()
        .ea(EaSide::Src, true, false, EaOp::Load, &BCD_SRC)
        .ea(EaSide::Dst, true, false, EaOp::Load, &BCD_DST)
        .bcd(op)
        .ea(EaSide::Dst, false, false, EaOp::Store, &BCD_DST)
        .fetch()
}

static DECODE: Lazy<Result<DecodeTable, PatternError>> =
    Lazy::new(|| Ok(DecodeTable::new(&instruction_set()?)));

/// The process-wide decode table for [`instruction_set`]. Fails only when
/// one of the set's opcode templates does not compile.
pub fn decode_table() -> Result<&'static DecodeTable, PatternError> {
    match &*DECODE {
        Ok(table) => Ok(table),
        Err(err) => Err(err.clone()),
    }
}
