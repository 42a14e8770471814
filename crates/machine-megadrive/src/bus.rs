//! Paged bus dispatch.
//!
//! An address space is split into fixed-size pages; a page-to-device table
//! gives O(1) routing from an address to the owning device. Devices own
//! contiguous page ranges and see addresses relative to the start of their
//! range. Pages nobody claims fall to a designated open-bus device, or are
//! a wiring error when none is given.
//!
//! Data and masks are the bus word type (`u16` for the 68000 side, `u8`
//! for the Z80 side); set mask bits mark ignored positions, exactly as the
//! CPU core's bus protocol defines them.

#![allow(clippy::cast_possible_truncation)]

use log::debug;
use thiserror::Error;

use cpu_m68k::M68kBus;

/// Data word of a bus: `u8` or `u16`.
pub trait BusWord: Copy + Eq + std::fmt::Debug {
    /// Width in bits.
    const BITS: u32;
    /// The all-zero word, what reads of nothing return.
    const ZERO: Self;

    fn from_u32(v: u32) -> Self;
    fn to_u32(self) -> u32;
}

impl BusWord for u8 {
    const BITS: u32 = 8;
    const ZERO: Self = 0;

    fn from_u32(v: u32) -> Self {
        v as u8
    }

    fn to_u32(self) -> u32 {
        u32::from(self)
    }
}

impl BusWord for u16 {
    const BITS: u32 = 16;
    const ZERO: Self = 0;

    fn from_u32(v: u32) -> Self {
        v as u16
    }

    fn to_u32(self) -> u32 {
        u32::from(self)
    }
}

/// A device on the bus. `addr` is relative to the device's page range;
/// set mask bits mark ignored positions.
pub trait Device<W: BusWord> {
    fn read(&mut self, addr: u32, mask: W) -> W;
    fn write(&mut self, addr: u32, mask: W, data: W);
}

/// Size parameters of one bus.
#[derive(Debug, Clone, Copy)]
pub struct BusLayout {
    /// Width of the address bus in bits.
    pub addr_width: u32,
    /// Page size in bytes; must be a power of two.
    pub page_size: u32,
    /// Device budget, open bus included.
    pub max_devices: usize,
}

impl BusLayout {
    /// Number of pages in the address space.
    #[must_use]
    pub const fn pages(&self) -> usize {
        ((1u64 << self.addr_width) / self.page_size as u64) as usize
    }

    /// Mask selecting the addressable bits.
    #[must_use]
    pub const fn addr_mask(&self) -> u32 {
        ((1u64 << self.addr_width) - 1) as u32
    }
}

/// Wiring errors caught at bus construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BusError {
    /// `page_size` was not a power of two.
    #[error("page size {0:#x} is not a power of two")]
    PageSizeNotPowerOfTwo(u32),
    /// Two devices claimed the same page.
    #[error("conflicting device mappings on page {0}")]
    ConflictingDeviceMappings(usize),
    /// A page has no owner and no open-bus device was designated.
    #[error("page {0} is unmapped and no open-bus device was given")]
    UnmappedPages(usize),
    /// More devices than the layout allows.
    #[error("device limit of {0} exceeded")]
    MaxDeviceLimitReached(usize),
}

/// One device claiming an inclusive page range.
pub struct Mapping<W: BusWord> {
    pub first_page: usize,
    pub last_page: usize,
    pub device: Box<dyn Device<W>>,
}

impl<W: BusWord> Mapping<W> {
    /// Map `device` over pages `first..=last`.
    #[must_use]
    pub fn new(first_page: usize, last_page: usize, device: Box<dyn Device<W>>) -> Self {
        Self {
            first_page,
            last_page,
            device,
        }
    }
}

const UNMAPPED: u8 = u8::MAX;

/// A bus with page-granular device dispatch.
pub struct PagedBus<W: BusWord> {
    page_size: u32,
    addr_mask: u32,
    /// Page index to device index; [`UNMAPPED`] routes nowhere.
    page_map: Vec<u8>,
    /// Base address of each device's range.
    bases: Vec<u32>,
    devices: Vec<Box<dyn Device<W>>>,
}

impl<W: BusWord> PagedBus<W> {
    /// Wire up a bus.
    ///
    /// Page conflicts are always an error. Coverage (every page owned,
    /// either explicitly or by `open_bus`) and the device budget are
    /// checked in debug builds only.
    pub fn new(
        layout: BusLayout,
        open_bus: Option<Box<dyn Device<W>>>,
        mappings: Vec<Mapping<W>>,
    ) -> Result<Self, BusError> {
        if !layout.page_size.is_power_of_two() {
            return Err(BusError::PageSizeNotPowerOfTwo(layout.page_size));
        }

        #[cfg(debug_assertions)]
        {
            let count = mappings.len() + usize::from(open_bus.is_some());
            if count > layout.max_devices {
                return Err(BusError::MaxDeviceLimitReached(layout.max_devices));
            }
        }

        let pages = layout.pages();
        let mut page_map = vec![UNMAPPED; pages];
        let mut bases = Vec::with_capacity(mappings.len() + 1);
        let mut devices: Vec<Box<dyn Device<W>>> = Vec::with_capacity(mappings.len() + 1);

        for mapping in mappings {
            let index = devices.len() as u8;
            for page in mapping.first_page..=mapping.last_page {
                if page_map[page] != UNMAPPED {
                    return Err(BusError::ConflictingDeviceMappings(page));
                }
                page_map[page] = index;
            }
            bases.push(mapping.first_page as u32 * layout.page_size);
            devices.push(mapping.device);
        }

        if let Some(open) = open_bus {
            let index = devices.len() as u8;
            for slot in page_map.iter_mut().filter(|slot| **slot == UNMAPPED) {
                *slot = index;
            }
            // The open bus spans the gaps; it sees absolute addresses.
            bases.push(0);
            devices.push(open);
        } else {
            #[cfg(debug_assertions)]
            if let Some(page) = page_map.iter().position(|&slot| slot == UNMAPPED) {
                return Err(BusError::UnmappedPages(page));
            }
        }

        debug!(
            "bus: {} pages of {:#x} bytes across {} devices",
            pages,
            layout.page_size,
            devices.len(),
        );

        Ok(Self {
            page_size: layout.page_size,
            addr_mask: layout.addr_mask(),
            page_map,
            bases,
            devices,
        })
    }

    fn route(&self, addr: u32) -> Option<(usize, u32)> {
        let addr = addr & self.addr_mask;
        let page = (addr / self.page_size) as usize;
        let index = *self.page_map.get(page)?;
        if index == UNMAPPED {
            return None;
        }
        let index = usize::from(index);
        Some((index, addr - self.bases[index]))
    }

    /// Read through the page table. Unowned pages read as zero.
    pub fn read(&mut self, addr: u32, mask: W) -> W {
        match self.route(addr) {
            Some((device, local)) => self.devices[device].read(local, mask),
            None => W::ZERO,
        }
    }

    /// Write through the page table. Unowned pages swallow the write.
    pub fn write(&mut self, addr: u32, mask: W, data: W) {
        if let Some((device, local)) = self.route(addr) {
            self.devices[device].write(local, mask, data);
        }
    }

    /// Number of devices on the bus, open bus included.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}

impl M68kBus for PagedBus<u16> {
    fn read(&mut self, addr: u32, mask: u16) -> u16 {
        PagedBus::read(self, addr, mask)
    }

    fn write(&mut self, addr: u32, mask: u16, data: u16) {
        PagedBus::write(self, addr, mask, data);
    }
}
