//! The execution context and the microcode interpreter.
//!
//! An [`ExecCtx`] lives for exactly one instruction step: it borrows the
//! bus, carries the two effective-address slots, and accumulates the cycle
//! count. [`Handler::run`] walks a bound pipeline's step list and applies
//! each step to `(cpu, exec)`.
//!
//! Access widths and costs: byte and word accesses are one bus word
//! (4 cycles), longs are two word accesses at `addr` and `addr + 2`
//! (8 cycles). Byte accesses synthesise the half-word mask from bit 0 of
//! the address; the instruction stream is word-granular, so a byte fetch
//! still consumes a full word and takes its value from the low half.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

use crate::addressing::AddrMode;
use crate::alu::{self, Size};
use crate::bus::M68kBus;
use crate::cpu::Cpu;
use crate::flags::{C, X, Z};
use crate::microcode::{BcdOp, EaOp, EaSide, Handler, RegClass, Step};

/// One effective-address slot: the computed address and the data moved
/// through it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EaSlot {
    pub addr: u32,
    pub data: u32,
}

/// Per-instruction scratch state: borrowed bus, EA slots, cycle counter.
pub struct ExecCtx<'a> {
    bus: &'a mut dyn M68kBus,
    /// Source and destination slots, indexed by [`EaSide`].
    pub ea: [EaSlot; 2],
    /// Cycles consumed so far.
    pub clk: u32,
}

impl<'a> ExecCtx<'a> {
    /// A fresh context borrowing `bus` for one instruction.
    pub fn new(bus: &'a mut dyn M68kBus) -> Self {
        Self {
            bus,
            ea: [EaSlot::default(); 2],
            clk: 0,
        }
    }

    /// Read a value of `size` from `addr`, charging bus cycles.
    pub fn read(&mut self, addr: u32, size: Size) -> u32 {
        match size {
            Size::Byte => {
                self.clk += 4;
                let mask = if addr & 1 == 1 { 0xFF00 } else { 0x00FF };
                let word = self.bus.read(addr, mask);
                if addr & 1 == 1 {
                    u32::from(word & 0x00FF)
                } else {
                    u32::from(word >> 8)
                }
            }
            Size::Word => {
                self.clk += 4;
                u32::from(self.bus.read(addr, 0))
            }
            Size::Long => {
                self.clk += 8;
                let hi = self.bus.read(addr, 0);
                let lo = self.bus.read(addr.wrapping_add(2), 0);
                (u32::from(hi) << 16) | u32::from(lo)
            }
        }
    }

    /// Write a value of `size` to `addr`, charging bus cycles.
    pub fn write(&mut self, addr: u32, size: Size, data: u32) {
        match size {
            Size::Byte => {
                self.clk += 4;
                if addr & 1 == 1 {
                    self.bus.write(addr, 0xFF00, data as u16 & 0x00FF);
                } else {
                    self.bus.write(addr, 0x00FF, (data as u16) << 8);
                }
            }
            Size::Word => {
                self.clk += 4;
                self.bus.write(addr, 0, data as u16);
            }
            Size::Long => {
                self.clk += 8;
                self.bus.write(addr, 0, (data >> 16) as u16);
                self.bus.write(addr.wrapping_add(2), 0, data as u16);
            }
        }
    }

    /// Fetch a value of `size` from the instruction stream at `pc`.
    ///
    /// The stream is word-granular: a byte immediate occupies a full word
    /// and arrives in its low half, and `pc` always advances by at least 2.
    pub fn fetch(&mut self, size: Size, cpu: &mut Cpu) -> u32 {
        let value = match size {
            Size::Byte => self.read(cpu.regs.pc, Size::Word) & 0xFF,
            Size::Word => self.read(cpu.regs.pc, Size::Word),
            Size::Long => self.read(cpu.regs.pc, Size::Long),
        };
        cpu.regs.pc = cpu.regs.pc.wrapping_add(size.bytes().max(2));
        value
    }

    /// Fetch and resolve one brief extension word:
    /// `{disp:i8, pad:u3, size:u1, n:u3, m:u1}` from the low bit up.
    ///
    /// Returns `disp + index` where the index register is `d[n]` (m = 0)
    /// or `a[n]` (m = 1), sign-extended from its low word unless the size
    /// bit asks for the full 32 bits.
    pub fn extword(&mut self, cpu: &mut Cpu) -> u32 {
        let ext = self.fetch(Size::Word, cpu);
        let disp = ext as u8 as i8 as i32 as u32;
        let n = ((ext >> 12) & 7) as usize;
        let reg = if ext & 0x8000 != 0 {
            cpu.regs.a[n]
        } else {
            cpu.regs.d[n]
        };
        let index = if ext & 0x0800 != 0 {
            reg
        } else {
            alu::extend(reg, Size::Word)
        };
        disp.wrapping_add(index)
    }
}

impl Handler {
    /// Execute the bound pipeline against `(cpu, exec)`.
    pub fn run(&self, cpu: &mut Cpu, exec: &mut ExecCtx<'_>) {
        // Width for the sized steps; unsized pipelines never read it.
        let size = self.size.unwrap_or(Size::Word);
        for step in &self.steps {
            match *step {
                Step::Ea {
                    side,
                    calc,
                    clk,
                    op,
                    enc,
                } => {
                    let Some(mode) = enc.decode(cpu.ir) else {
                        // Field combination outside the encoding; the word
                        // matched on pattern bits alone. Nothing to do.
                        continue;
                    };
                    let n = usize::from(enc.reg(cpu.ir));
                    if calc {
                        calc_ea(cpu, exec, side, mode, n, size);
                    }
                    if clk {
                        exec.clk += mode.penalty();
                    }
                    match op {
                        EaOp::Load => {
                            let data = match mode {
                                AddrMode::DataReg => alu::truncate(cpu.regs.d[n], size),
                                AddrMode::AddrReg => alu::extend(cpu.regs.a[n], size),
                                AddrMode::Immediate => exec.fetch(size, cpu),
                                _ => {
                                    let addr = exec.ea[side.index()].addr;
                                    exec.read(addr, size)
                                }
                            };
                            exec.ea[side.index()].data = data;
                        }
                        EaOp::Store => {
                            let data = exec.ea[side.index()].data;
                            match mode {
                                AddrMode::DataReg => {
                                    cpu.regs.d[n] = alu::overwrite(cpu.regs.d[n], data, size);
                                }
                                AddrMode::AddrReg => {
                                    cpu.regs.a[n] = alu::extend(data, size);
                                }
                                AddrMode::Immediate => {}
                                _ => {
                                    let addr = exec.ea[side.index()].addr;
                                    exec.write(addr, size, data);
                                }
                            }
                        }
                        EaOp::None => {}
                    }
                }
                Step::LdReg { side, class, bit } => {
                    let n = usize::from(alu::field(cpu.ir, bit, 3));
                    exec.ea[side.index()].data = match class {
                        RegClass::Data => alu::truncate(cpu.regs.d[n], size),
                        RegClass::Addr => alu::extend(cpu.regs.a[n], size),
                    };
                }
                Step::StReg { class, bit } => {
                    let n = usize::from(alu::field(cpu.ir, bit, 3));
                    let data = exec.ea[EaSide::Dst.index()].data;
                    match class {
                        RegClass::Data => {
                            cpu.regs.d[n] = alu::overwrite(cpu.regs.d[n], data, size);
                        }
                        RegClass::Addr => {
                            cpu.regs.a[n] = alu::extend(data, size);
                        }
                    }
                }
                Step::Fetch => {
                    cpu.ir = exec.fetch(Size::Word, cpu) as u16;
                }
                Step::Bcd { op } => bcd_step(cpu, exec, op),
                Step::Cycles { n } => exec.clk += n,
            }
        }
    }
}

/// Compute the effective address for `mode` into the slot, applying the
/// register side effects of the auto-modifying modes.
fn calc_ea(cpu: &mut Cpu, exec: &mut ExecCtx<'_>, side: EaSide, mode: AddrMode, n: usize, size: Size) {
    let addr = match mode {
        // No address: the operand lives in a register or the stream.
        AddrMode::DataReg | AddrMode::AddrReg | AddrMode::Immediate => return,
        AddrMode::AddrInd => cpu.regs.a[n],
        AddrMode::AddrIndPostInc => {
            let addr = cpu.regs.a[n];
            cpu.regs.a[n] = addr.wrapping_add(size.bytes());
            addr
        }
        AddrMode::AddrIndPreDec => {
            let addr = cpu.regs.a[n].wrapping_sub(size.bytes());
            cpu.regs.a[n] = addr;
            addr
        }
        AddrMode::AddrIndDisp => {
            let disp = alu::extend(exec.fetch(Size::Word, cpu), Size::Word);
            cpu.regs.a[n].wrapping_add(disp)
        }
        AddrMode::AddrIndIndex => {
            let base = cpu.regs.a[n];
            base.wrapping_add(exec.extword(cpu))
        }
        AddrMode::PcDisp => {
            let base = cpu.regs.pc;
            let disp = alu::extend(exec.fetch(Size::Word, cpu), Size::Word);
            base.wrapping_add(disp)
        }
        AddrMode::PcIndex => {
            let base = cpu.regs.pc;
            base.wrapping_add(exec.extword(cpu))
        }
        AddrMode::AbsShort => alu::extend(exec.fetch(Size::Word, cpu), Size::Word),
        AddrMode::AbsLong => exec.fetch(Size::Long, cpu),
    };
    exec.ea[side.index()].addr = addr;
}

/// BCD add/subtract of the two slots' data bytes: `dst ± src ± X`,
/// modulo 100.
///
/// C and X take the carry/borrow. Z only ever clears: a zero result leaves
/// it alone, so a multi-precision loop ends with Z set only if every byte
/// came out zero.
fn bcd_step(cpu: &mut Cpu, exec: &mut ExecCtx<'_>, op: BcdOp) {
    let src = alu::frombcd(exec.ea[EaSide::Src.index()].data as u8);
    let dst = alu::frombcd(exec.ea[EaSide::Dst.index()].data as u8);
    let x = u8::from(cpu.regs.flag(X));

    let (result, carry) = match op {
        BcdOp::Add => {
            let sum = u16::from(dst) + u16::from(src) + u16::from(x);
            (alu::tobcd((sum % 100) as u8).0, sum > 99)
        }
        BcdOp::Sub => {
            let borrow = u16::from(src) + u16::from(x) > u16::from(dst);
            let diff = (100 + u16::from(dst) - u16::from(src) - u16::from(x)) % 100;
            (alu::tobcd(diff as u8).0, borrow)
        }
    };

    exec.ea[EaSide::Dst.index()].data = u32::from(result);
    cpu.regs.set_flag(C, carry);
    cpu.regs.set_flag(X, carry);
    if result != 0 {
        cpu.regs.set_flag(Z, false);
    }
    exec.clk += 2;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flat byte-backed RAM implementing the masked word protocol.
    struct TestBus {
        bytes: Vec<u8>,
    }

    impl TestBus {
        fn new() -> Self {
            Self {
                bytes: vec![0; 0x1000],
            }
        }
    }

    impl M68kBus for TestBus {
        fn read(&mut self, addr: u32, mask: u16) -> u16 {
            let base = (addr as usize & !1) % self.bytes.len();
            let word = (u16::from(self.bytes[base]) << 8) | u16::from(self.bytes[base + 1]);
            word & !mask
        }

        fn write(&mut self, addr: u32, mask: u16, data: u16) {
            let base = (addr as usize & !1) % self.bytes.len();
            let old = (u16::from(self.bytes[base]) << 8) | u16::from(self.bytes[base + 1]);
            let new = (old & mask) | (data & !mask);
            self.bytes[base] = (new >> 8) as u8;
            self.bytes[base + 1] = new as u8;
        }
    }

    #[test]
    fn byte_reads_use_the_right_half() {
        let mut bus = TestBus::new();
        bus.bytes[0x10] = 0xAB;
        bus.bytes[0x11] = 0xCD;
        let mut exec = ExecCtx::new(&mut bus);
        assert_eq!(exec.read(0x10, Size::Byte), 0xAB);
        assert_eq!(exec.read(0x11, Size::Byte), 0xCD);
        assert_eq!(exec.clk, 8);
    }

    #[test]
    fn long_access_splits_into_two_words() {
        let mut bus = TestBus::new();
        let mut exec = ExecCtx::new(&mut bus);
        exec.write(0x20, Size::Long, 0x1234_5678);
        assert_eq!(exec.read(0x20, Size::Long), 0x1234_5678);
        assert_eq!(exec.read(0x20, Size::Word), 0x1234);
        assert_eq!(exec.read(0x22, Size::Word), 0x5678);
        assert_eq!(exec.clk, 8 + 8 + 4 + 4);
    }

    #[test]
    fn byte_writes_leave_the_other_half_alone() {
        let mut bus = TestBus::new();
        bus.bytes[0x30] = 0x11;
        bus.bytes[0x31] = 0x22;
        let mut exec = ExecCtx::new(&mut bus);
        exec.write(0x30, Size::Byte, 0xAA);
        assert_eq!(bus.bytes[0x30], 0xAA);
        assert_eq!(bus.bytes[0x31], 0x22);
    }

    #[test]
    fn fetch_byte_consumes_a_full_word() {
        let mut bus = TestBus::new();
        bus.bytes[0x100] = 0x00;
        bus.bytes[0x101] = 0x42;
        let mut cpu = Cpu::new();
        cpu.regs.pc = 0x100;
        let mut exec = ExecCtx::new(&mut bus);
        assert_eq!(exec.fetch(Size::Byte, &mut cpu), 0x42);
        assert_eq!(cpu.regs.pc, 0x102, "byte fetch advances a full word");
    }

    #[test]
    fn extword_sign_extends_word_index() {
        let mut bus = TestBus::new();
        // d3.w index, displacement -2: m=0, n=3, size=0, disp=0xFE.
        bus.bytes[0x100] = 0x30;
        bus.bytes[0x101] = 0xFE;
        let mut cpu = Cpu::new();
        cpu.regs.pc = 0x100;
        cpu.regs.d[3] = 0xFFFF_8000; // low word sign-extends negative
        let mut exec = ExecCtx::new(&mut bus);
        let offset = exec.extword(&mut cpu);
        assert_eq!(offset, 0xFFFF_7FFE);
    }

    #[test]
    fn extword_long_index_uses_all_bits() {
        let mut bus = TestBus::new();
        // a1.l index, displacement +4: m=1, n=1, size=1, disp=0x04.
        bus.bytes[0x100] = 0x98;
        bus.bytes[0x101] = 0x04;
        let mut cpu = Cpu::new();
        cpu.regs.pc = 0x100;
        cpu.regs.a[1] = 0x0001_0000;
        let mut exec = ExecCtx::new(&mut bus);
        assert_eq!(exec.extword(&mut cpu), 0x0001_0004);
    }
}
