//! Operand rendering from decoded permutations.
//!
//! The renderer never inspects a pipeline: everything it needs about the
//! operands is in the permutation's [`OperandInfo`] sidecar. Extension
//! words (displacements, absolute addresses, immediates) are pulled from
//! the supplied stream source in the order the CPU would fetch them.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

use std::fmt::Write;

use crate::addressing::{AddrMode, AddrModeEncoding};
use crate::alu::Size;
use crate::decode::DecodeTable;
use crate::microcode::Transfer;

/// Render one instruction in Motorola syntax: `mnemonic[.size] [src[,dst]]`.
///
/// `ext` supplies extension words following the opcode, in stream order.
/// Unmatched words render as a `dc.w` directive.
#[must_use]
pub fn disassemble(
    table: &DecodeTable,
    word: u16,
    ext: &mut dyn FnMut() -> u16,
) -> String {
    let Some(perm) = table.permutation(word) else {
        return format!("dc.w ${word:04x}");
    };

    let mut out = String::from(perm.name);
    if let Some(size) = perm.size {
        out.push('.');
        out.push(size.suffix());
    }

    let operands: Vec<String> = [perm.info.src, perm.info.dst]
        .iter()
        .filter_map(|transfer| operand(transfer, word, perm.size, &mut *ext))
        .collect();
    if !operands.is_empty() {
        out.push(' ');
        out.push_str(&operands.join(","));
    }
    out
}

fn operand(
    transfer: &Transfer,
    word: u16,
    size: Option<Size>,
    ext: &mut dyn FnMut() -> u16,
) -> Option<String> {
    match *transfer {
        Transfer::None => None,
        Transfer::Data(bit) => Some(format!("d{}", (word >> bit) & 7)),
        Transfer::Addr(bit) => Some(format!("a{}", (word >> bit) & 7)),
        Transfer::Modes(enc) => Some(addr_mode(enc, word, size, ext)),
    }
}

fn addr_mode(
    enc: &AddrModeEncoding,
    word: u16,
    size: Option<Size>,
    ext: &mut dyn FnMut() -> u16,
) -> String {
    let Some(mode) = enc.decode(word) else {
        return String::from("?");
    };
    let n = enc.reg(word);
    match mode {
        AddrMode::DataReg => format!("d{n}"),
        AddrMode::AddrReg => format!("a{n}"),
        AddrMode::AddrInd => format!("(a{n})"),
        AddrMode::AddrIndPostInc => format!("(a{n})+"),
        AddrMode::AddrIndPreDec => format!("-(a{n})"),
        AddrMode::AddrIndDisp => format!("{}(a{n})", signed16(ext())),
        AddrMode::AddrIndIndex => {
            let (disp, index) = brief_ext(ext());
            format!("{disp}(a{n},{index})")
        }
        AddrMode::PcDisp => format!("{}(pc)", signed16(ext())),
        AddrMode::PcIndex => {
            let (disp, index) = brief_ext(ext());
            format!("{disp}(pc,{index})")
        }
        AddrMode::AbsShort => format!("${:04x}.w", ext()),
        AddrMode::AbsLong => {
            let hi = ext();
            let lo = ext();
            format!("${:08x}.l", (u32::from(hi) << 16) | u32::from(lo))
        }
        AddrMode::Immediate => immediate(size, ext),
    }
}

fn immediate(size: Option<Size>, ext: &mut dyn FnMut() -> u16) -> String {
    match size {
        Some(Size::Byte) => format!("#${:02x}", ext() & 0xFF),
        Some(Size::Long) => {
            let hi = ext();
            let lo = ext();
            format!("#${:08x}", (u32::from(hi) << 16) | u32::from(lo))
        }
        _ => format!("#${:04x}", ext()),
    }
}

/// Signed rendering of a 16-bit displacement: `-$2` rather than `$fffe`.
fn signed16(value: u16) -> String {
    let v = value as i16;
    let mut out = String::new();
    if v < 0 {
        let _ = write!(out, "-${:x}", -i32::from(v));
    } else {
        let _ = write!(out, "${v:x}");
    }
    out
}

/// Split a brief extension word into its displacement and index register
/// text: `{disp:i8, pad:u3, size:u1, n:u3, m:u1}` from the low bit up.
fn brief_ext(ext: u16) -> (String, String) {
    let disp = signed16((ext as u8 as i8 as i16) as u16);
    let reg = (ext >> 12) & 7;
    let class = if ext & 0x8000 != 0 { 'a' } else { 'd' };
    let width = if ext & 0x0800 != 0 { 'l' } else { 'w' };
    (disp, format!("{class}{reg}.{width}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa;

    fn disasm(word: u16, ext_words: &[u16]) -> String {
        let mut stream = ext_words.iter().copied();
        disassemble(isa::decode_table().expect("instruction set builds"), word, &mut || {
            stream.next().expect("enough extension words")
        })
    }

    #[test]
    fn renders_register_forms() {
        assert_eq!(disasm(0x4E71, &[]), "nop");
        assert_eq!(disasm(0xC300, &[]), "abcd.b d0,d1");
        assert_eq!(disasm(0x8300, &[]), "sbcd.b d0,d1");
        assert_eq!(disasm(0x1200, &[]), "move.b d0,d1");
    }

    #[test]
    fn renders_memory_forms() {
        assert_eq!(disasm(0xC308, &[]), "abcd.b -(a0),-(a1)");
        assert_eq!(disasm(0x3612, &[]), "move.w (a2),d3");
        assert_eq!(disasm(0x24DA, &[]), "move.l (a2)+,(a2)+");
    }

    #[test]
    fn renders_extension_word_forms() {
        // move.w $12(a0),d1
        assert_eq!(disasm(0x3228, &[0x0012]), "move.w $12(a0),d1");
        // move.w -2(a0),d1
        assert_eq!(disasm(0x3228, &[0xFFFE]), "move.w -$2(a0),d1");
        // move.w $4(a0,d2.w),d1
        assert_eq!(disasm(0x3230, &[0x2004]), "move.w $4(a0,d2.w),d1");
        // move.w $1234.w,d1
        assert_eq!(disasm(0x3238, &[0x1234]), "move.w $1234.w,d1");
        // move.l $00123456.l,d1
        assert_eq!(disasm(0x2239, &[0x0012, 0x3456]), "move.l $00123456.l,d1");
        // move.w #$42,d1
        assert_eq!(disasm(0x323C, &[0x0042]), "move.w #$0042,d1");
        // movea.w $8(pc),a1
        assert_eq!(disasm(0x327A, &[0x0008]), "movea.w $8(pc),a1");
    }

    #[test]
    fn unmatched_words_render_as_data() {
        assert_eq!(disasm(0x4AFC, &[]), "dc.w $4afc");
    }
}
