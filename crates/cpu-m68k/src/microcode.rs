//! Declarative microcode: the steps an instruction is assembled from.
//!
//! An instruction's body is a short pipeline of steps built with
//! [`Pipeline`]'s combinators. Steps are data, not closures: the
//! interpreter in `execute` walks the step list with a match, so there is
//! no per-step indirect call. Alongside the steps the builder maintains an
//! [`OperandInfo`] sidecar describing where the source and destination
//! operands come from; the operand renderer consumes that record instead of
//! re-deriving it from the step list.
//!
//! Steps that move operand data are parameterised by the operand width and
//! may only appear in instructions that carry a size; `fetch`, `bcd` and
//! `cycles` are width-independent.

use crate::addressing::AddrModeEncoding;
use crate::alu::Size;

/// Selects one of the two effective-address slots of the execution context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EaSide {
    /// Source operand.
    Src,
    /// Destination operand.
    Dst,
}

impl EaSide {
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Src => 0,
            Self::Dst => 1,
        }
    }
}

/// What an `ea` step does with the operand once the address is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EaOp {
    /// Load the operand into the slot's data.
    Load,
    /// Store the slot's data to the operand.
    Store,
    /// Address calculation only, no transfer.
    None,
}

/// Register class for `ldreg`/`streg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegClass {
    /// Data register Dn.
    Data,
    /// Address register An.
    Addr,
}

/// BCD operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BcdOp {
    Add,
    Sub,
}

/// One microcode step.
#[derive(Debug, Clone, Copy)]
pub enum Step {
    /// Effective-address step: optionally compute the address for `side`
    /// (register side effects for postincrement/predecrement included),
    /// optionally charge the mode's cycle penalty, then perform the
    /// transfer `op` at the pipeline width.
    Ea {
        side: EaSide,
        calc: bool,
        clk: bool,
        op: EaOp,
        enc: &'static AddrModeEncoding,
    },
    /// Load a register (number read from the opcode at `bit`) into a
    /// slot's data at the pipeline width.
    LdReg {
        side: EaSide,
        class: RegClass,
        bit: u8,
    },
    /// Store the destination slot's data to a register.
    StReg { class: RegClass, bit: u8 },
    /// Prefetch: load the next opcode word into `ir`.
    Fetch,
    /// BCD add or subtract of the two slots' data bytes.
    Bcd { op: BcdOp },
    /// Charge `n` internal cycles.
    Cycles { n: u32 },
}

impl Step {
    /// Whether the step's behaviour depends on the operand width.
    pub(crate) const fn is_sized(self) -> bool {
        matches!(
            self,
            Self::Ea { .. } | Self::LdReg { .. } | Self::StReg { .. }
        )
    }
}

/// Where one operand of an instruction comes from, as the disassembler
/// needs to know it.
#[derive(Debug, Clone, Copy)]
pub enum Transfer {
    /// No operand.
    None,
    /// Full addressing-mode operand under the given field encoding.
    Modes(&'static AddrModeEncoding),
    /// Data register numbered by the opcode field at `bit`.
    Data(u8),
    /// Address register numbered by the opcode field at `bit`.
    Addr(u8),
}

/// Source and destination operand descriptors for one instruction.
#[derive(Debug, Clone, Copy)]
pub struct OperandInfo {
    pub src: Transfer,
    pub dst: Transfer,
}

impl Default for OperandInfo {
    fn default() -> Self {
        Self {
            src: Transfer::None,
            dst: Transfer::None,
        }
    }
}

impl OperandInfo {
    fn set(&mut self, side: EaSide, transfer: Transfer) {
        match side {
            EaSide::Src => self.src = transfer,
            EaSide::Dst => self.dst = transfer,
        }
    }
}

/// Builder for an instruction body.
///
/// Every combinator returns a new pipeline with one step appended, so a
/// shared prefix can be cloned and extended in different directions.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<Step>,
    info: OperandInfo,
}

impl Pipeline {
    /// An empty pipeline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append an effective-address step and record the operand in the
    /// sidecar.
    #[must_use]
    pub fn ea(
        mut self,
        side: EaSide,
        calc: bool,
        clk: bool,
        op: EaOp,
        enc: &'static AddrModeEncoding,
    ) -> Self {
        self.info.set(side, Transfer::Modes(enc));
        self.push(Step::Ea {
            side,
            calc,
            clk,
            op,
            enc,
        })
    }

    /// Append a register load into `side`'s data.
    #[must_use]
    pub fn ldreg(mut self, side: EaSide, class: RegClass, bit: u8) -> Self {
        self.info.set(
            side,
            match class {
                RegClass::Data => Transfer::Data(bit),
                RegClass::Addr => Transfer::Addr(bit),
            },
        );
        self.push(Step::LdReg { side, class, bit })
    }

    /// Append a register store from the destination slot.
    #[must_use]
    pub fn streg(mut self, class: RegClass, bit: u8) -> Self {
        self.info.set(
            EaSide::Dst,
            match class {
                RegClass::Data => Transfer::Data(bit),
                RegClass::Addr => Transfer::Addr(bit),
            },
        );
        self.push(Step::StReg { class, bit })
    }

    /// Append the standard trailing prefetch.
    #[must_use]
    pub fn fetch(self) -> Self {
        self.push(Step::Fetch)
    }

    /// Append a BCD add/subtract of the two slots.
    #[must_use]
    pub fn bcd(self, op: BcdOp) -> Self {
        self.push(Step::Bcd { op })
    }

    /// Append `n` internal cycles.
    #[must_use]
    pub fn cycles(self, n: u32) -> Self {
        self.push(Step::Cycles { n })
    }

    /// The operand sidecar accumulated so far.
    #[must_use]
    pub fn info(&self) -> OperandInfo {
        self.info
    }

    /// Whether any step depends on the operand width.
    #[must_use]
    pub fn has_sized_steps(&self) -> bool {
        self.steps.iter().any(|step| step.is_sized())
    }

    /// Bind the pipeline to a concrete operand width, producing the
    /// runnable handler for one permutation.
    #[must_use]
    pub fn bind(&self, size: Option<Size>) -> Handler {
        debug_assert!(
            size.is_some() || !self.has_sized_steps(),
            "width-parameterised step in a pipeline without a size"
        );
        Handler {
            steps: self.steps.clone(),
            size,
        }
    }
}

/// A pipeline bound to one permutation's operand width.
#[derive(Debug, Clone)]
pub struct Handler {
    pub(crate) steps: Vec<Step>,
    pub(crate) size: Option<Size>,
}

impl Handler {
    /// The no-op fallback installed behind the illegal-instruction
    /// sentinel.
    #[must_use]
    pub fn noop() -> Self {
        Self {
            steps: Vec::new(),
            size: None,
        }
    }

    /// The width the pipeline was bound with.
    #[must_use]
    pub fn size(&self) -> Option<Size> {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addressing::{EA_DST, EA_SRC};

    #[test]
    fn builder_appends_steps_in_order() {
        let p = Pipeline::new()
            .ea(EaSide::Src, true, true, EaOp::Load, &EA_SRC)
            .ea(EaSide::Dst, true, false, EaOp::Store, &EA_DST)
            .fetch();
        assert_eq!(p.steps.len(), 3);
        assert!(matches!(p.steps[2], Step::Fetch));
        assert!(p.has_sized_steps());
    }

    #[test]
    fn sidecar_tracks_both_operands() {
        let p = Pipeline::new()
            .ea(EaSide::Src, true, true, EaOp::Load, &EA_SRC)
            .streg(RegClass::Addr, 9);
        assert!(matches!(p.info().src, Transfer::Modes(_)));
        assert!(matches!(p.info().dst, Transfer::Addr(9)));
    }

    #[test]
    fn shared_prefix_stays_intact() {
        let prefix = Pipeline::new().ea(EaSide::Src, true, false, EaOp::Load, &EA_SRC);
        let a = prefix.clone().bcd(BcdOp::Add).fetch();
        let b = prefix.bcd(BcdOp::Sub).fetch();
        assert_eq!(a.steps.len(), 3);
        assert_eq!(b.steps.len(), 3);
        assert!(matches!(a.steps[1], Step::Bcd { op: BcdOp::Add }));
        assert!(matches!(b.steps[1], Step::Bcd { op: BcdOp::Sub }));
    }

    #[test]
    fn unsized_pipeline_binds_without_size() {
        let handler = Pipeline::new().fetch().bind(None);
        assert_eq!(handler.size(), None);
        assert_eq!(handler.steps.len(), 1);
    }
}
