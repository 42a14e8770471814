//! Addressing mode definitions and opcode-field encodings for the 68000.
//!
//! The base 68000 has 12 addressing modes. Which modes an instruction
//! accepts, and where the mode/register fields sit in the opcode word, is
//! instruction-specific: MOVE carries a second, mirrored field pair for its
//! destination, and the BCD family collapses the mode field to a single
//! register/memory bit. An [`AddrModeEncoding`] captures one such field
//! layout and decodes it through a dense lookup table.

#![allow(clippy::cast_possible_truncation)]

use crate::alu::field;

/// Addressing mode for 68000 instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    /// Data register direct: Dn
    DataReg,
    /// Address register direct: An
    AddrReg,
    /// Address register indirect: (An)
    AddrInd,
    /// Address register indirect with postincrement: (An)+
    AddrIndPostInc,
    /// Address register indirect with predecrement: -(An)
    AddrIndPreDec,
    /// Address register indirect with displacement: d16(An)
    AddrIndDisp,
    /// Address register indirect with index: d8(An,Xn)
    AddrIndIndex,
    /// Program counter with displacement: d16(PC)
    PcDisp,
    /// Program counter with index: d8(PC,Xn)
    PcIndex,
    /// Absolute short: (xxx).W
    AbsShort,
    /// Absolute long: (xxx).L
    AbsLong,
    /// Immediate: #<data>
    Immediate,
}

impl AddrMode {
    /// Extra internal cycles the mode costs on top of its bus accesses.
    #[must_use]
    pub const fn penalty(self) -> u32 {
        match self {
            Self::AddrIndPreDec | Self::AddrIndIndex | Self::PcIndex => 2,
            _ => 0,
        }
    }

    /// Whether the operand lives in a register or the instruction stream
    /// rather than behind a memory address.
    #[must_use]
    pub const fn is_register_or_immediate(self) -> bool {
        matches!(self, Self::DataReg | Self::AddrReg | Self::Immediate)
    }
}

/// Field constraint for one mode within an encoding. `None` means the
/// field does not participate in selecting this mode (for register modes
/// the n field is the register number, not a selector).
#[derive(Debug, Clone, Copy)]
pub struct ModeSpec {
    pub m: Option<u8>,
    pub n: Option<u8>,
}

impl ModeSpec {
    const fn m(m: u8) -> Self {
        Self { m: Some(m), n: None }
    }

    const fn mn(m: u8, n: u8) -> Self {
        Self {
            m: Some(m),
            n: Some(n),
        }
    }
}

/// Mapping from opcode bit fields to addressing modes.
///
/// An encoding names the positions and widths of the mode field `m` and the
/// register field `n`, plus the constraint table saying which `(m, n)`
/// combinations select which mode. Decode is a single lookup in a table
/// indexed by the concatenated fields; `m_width + n_width` never exceeds 6.
#[derive(Debug)]
pub struct AddrModeEncoding {
    m_pos: u8,
    m_width: u8,
    n_pos: u8,
    n_width: u8,
    lut: [Option<AddrMode>; 64],
}

/// The canonical constraint table: 3-bit mode field, with `m = 0b111`
/// subdividing on the register field.
const CANONICAL: &[(AddrMode, ModeSpec)] = &[
    (AddrMode::DataReg, ModeSpec::m(0)),
    (AddrMode::AddrReg, ModeSpec::m(1)),
    (AddrMode::AddrInd, ModeSpec::m(2)),
    (AddrMode::AddrIndPostInc, ModeSpec::m(3)),
    (AddrMode::AddrIndPreDec, ModeSpec::m(4)),
    (AddrMode::AddrIndDisp, ModeSpec::m(5)),
    (AddrMode::AddrIndIndex, ModeSpec::m(6)),
    (AddrMode::AbsShort, ModeSpec::mn(7, 0)),
    (AddrMode::AbsLong, ModeSpec::mn(7, 1)),
    (AddrMode::PcDisp, ModeSpec::mn(7, 2)),
    (AddrMode::PcIndex, ModeSpec::mn(7, 3)),
    (AddrMode::Immediate, ModeSpec::mn(7, 4)),
];

/// Register/memory table used by the BCD family: a 1-bit mode field
/// selecting Dn or -(An).
const REG_MEM: &[(AddrMode, ModeSpec)] = &[
    (AddrMode::DataReg, ModeSpec::m(0)),
    (AddrMode::AddrIndPreDec, ModeSpec::m(1)),
];

/// Canonical source field: mode at bit 3, register at bit 0.
pub static EA_SRC: AddrModeEncoding = AddrModeEncoding::new(3, 3, 0, 3, CANONICAL);

/// MOVE's destination field: mode at bit 6, register at bit 9.
pub static EA_DST: AddrModeEncoding = AddrModeEncoding::new(6, 3, 9, 3, CANONICAL);

/// BCD source field: register/memory bit at 3, register at bit 0.
pub static BCD_SRC: AddrModeEncoding = AddrModeEncoding::new(3, 1, 0, 3, REG_MEM);

/// BCD destination field: register/memory bit at 3, register at bit 9.
pub static BCD_DST: AddrModeEncoding = AddrModeEncoding::new(3, 1, 9, 3, REG_MEM);

impl AddrModeEncoding {
    /// Build an encoding from field positions and a constraint table.
    ///
    /// The table is scanned in order for each `(m, n)` pair; tables are
    /// expected to be unambiguous.
    #[must_use]
    pub const fn new(
        m_pos: u8,
        m_width: u8,
        n_pos: u8,
        n_width: u8,
        table: &[(AddrMode, ModeSpec)],
    ) -> Self {
        let mut lut = [None; 64];
        let depth = 1usize << (m_width + n_width);
        let mut idx = 0usize;
        while idx < depth {
            let m = (idx >> n_width) as u8;
            let n = (idx & ((1usize << n_width) - 1)) as u8;
            let mut entry = 0usize;
            while entry < table.len() {
                let (mode, spec) = table[entry];
                let m_ok = match spec.m {
                    Some(want) => want == m,
                    None => true,
                };
                let n_ok = match spec.n {
                    Some(want) => want == n,
                    None => true,
                };
                if m_ok && n_ok {
                    lut[idx] = Some(mode);
                    break;
                }
                entry += 1;
            }
            idx += 1;
        }
        Self {
            m_pos,
            m_width,
            n_pos,
            n_width,
            lut,
        }
    }

    /// Decode the addressing mode selected by an opcode word, or `None`
    /// when the field combination selects nothing.
    #[must_use]
    pub fn decode(&self, word: u16) -> Option<AddrMode> {
        let m = field(word, self.m_pos, self.m_width);
        let n = field(word, self.n_pos, self.n_width);
        self.lut[((m << self.n_width) | n) as usize]
    }

    /// The register number carried in the n field.
    #[must_use]
    pub fn reg(&self, word: u16) -> u8 {
        field(word, self.n_pos, self.n_width) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_decodes_all_twelve_modes() {
        let words = [
            (0b000_000, AddrMode::DataReg),
            (0b001_010, AddrMode::AddrReg),
            (0b010_000, AddrMode::AddrInd),
            (0b011_111, AddrMode::AddrIndPostInc),
            (0b100_000, AddrMode::AddrIndPreDec),
            (0b101_011, AddrMode::AddrIndDisp),
            (0b110_000, AddrMode::AddrIndIndex),
            (0b111_000, AddrMode::AbsShort),
            (0b111_001, AddrMode::AbsLong),
            (0b111_010, AddrMode::PcDisp),
            (0b111_011, AddrMode::PcIndex),
            (0b111_100, AddrMode::Immediate),
        ];
        for (bits, mode) in words {
            assert_eq!(EA_SRC.decode(bits), Some(mode), "bits {bits:06b}");
        }
    }

    #[test]
    fn canonical_rejects_invalid_combinations() {
        assert_eq!(EA_SRC.decode(0b111_101), None);
        assert_eq!(EA_SRC.decode(0b111_110), None);
        assert_eq!(EA_SRC.decode(0b111_111), None);
    }

    #[test]
    fn move_destination_field_is_mirrored() {
        // move.w d3,(a2): dst mode 010 at bit 6, dst reg 010 at bit 9.
        let word = 0b0011_0100_1000_0011;
        assert_eq!(EA_DST.decode(word), Some(AddrMode::AddrInd));
        assert_eq!(EA_DST.reg(word), 2);
        assert_eq!(EA_SRC.decode(word), Some(AddrMode::DataReg));
        assert_eq!(EA_SRC.reg(word), 3);
    }

    #[test]
    fn reg_mem_field_selects_predecrement() {
        assert_eq!(BCD_SRC.decode(0xC300), Some(AddrMode::DataReg));
        assert_eq!(BCD_SRC.decode(0xC308), Some(AddrMode::AddrIndPreDec));
        assert_eq!(BCD_SRC.reg(0xC30A), 2);
        assert_eq!(BCD_DST.decode(0xC308), Some(AddrMode::AddrIndPreDec));
        assert_eq!(BCD_DST.reg(0xC308), 1);
    }

    #[test]
    fn index_modes_cost_extra_cycles() {
        assert_eq!(AddrMode::AddrIndPreDec.penalty(), 2);
        assert_eq!(AddrMode::AddrIndIndex.penalty(), 2);
        assert_eq!(AddrMode::PcIndex.penalty(), 2);
        assert_eq!(AddrMode::AddrIndPostInc.penalty(), 0);
        assert_eq!(AddrMode::PcDisp.penalty(), 0);
    }
}
