//! Mega Drive bus model.
//!
//! The machine has two CPU buses: the 68000 main bus (16-bit data, 23-bit
//! address, megabyte pages) and the Z80 sub bus (8-bit data, 64 KiB space,
//! 4 KiB pages). Both are instances of the same paged dispatch structure;
//! this crate provides that structure, the two presets, and the memory
//! devices needed to assemble a working machine.

pub mod bus;
pub mod devices;

pub use bus::{BusError, BusLayout, BusWord, Device, Mapping, PagedBus};
pub use devices::{OpenBus, Ram, Rom};

/// Main 68000 bus: 23-bit addressing, 16-bit data, 1 MiB pages, up to 7
/// devices (CPU, cartridge I/O, peripheral I/O, work RAM, bus arbiter,
/// I/O controller, VDP).
pub const MAIN_BUS: BusLayout = BusLayout {
    addr_width: 23,
    page_size: 0x10_0000,
    max_devices: 7,
};

/// Sub Z80 bus: 16-bit addressing, 8-bit data, 4 KiB pages, up to 5
/// devices (Z80 CPU, bus arbiter, sound RAM, I/O controller, sound chip).
pub const SUB_BUS: BusLayout = BusLayout {
    addr_width: 16,
    page_size: 0x1000,
    max_devices: 5,
};

/// Wire up a main-bus instance from device mappings.
pub fn main_bus(
    open_bus: Option<Box<dyn Device<u16>>>,
    mappings: Vec<Mapping<u16>>,
) -> Result<PagedBus<u16>, BusError> {
    PagedBus::new(MAIN_BUS, open_bus, mappings)
}

/// Wire up a sub-bus instance from device mappings.
pub fn sub_bus(
    open_bus: Option<Box<dyn Device<u8>>>,
    mappings: Vec<Mapping<u8>>,
) -> Result<PagedBus<u8>, BusError> {
    PagedBus::new(SUB_BUS, open_bus, mappings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_bus_has_eight_megabyte_pages() {
        assert_eq!(MAIN_BUS.pages(), 8);
        assert_eq!(MAIN_BUS.addr_mask(), 0x7F_FFFF);
    }

    #[test]
    fn sub_bus_has_sixteen_small_pages() {
        assert_eq!(SUB_BUS.pages(), 16);
        assert_eq!(SUB_BUS.addr_mask(), 0xFFFF);
    }

    #[test]
    fn presets_build_with_open_bus_and_ram() {
        let main = main_bus(
            Some(Box::new(OpenBus)),
            vec![Mapping::new(0, 0, Box::new(Ram::new(0x1_0000)))],
        );
        assert!(main.is_ok());

        let sub = sub_bus(
            Some(Box::new(OpenBus)),
            vec![Mapping::new(0, 1, Box::new(Ram::new(0x2000)))],
        );
        assert!(sub.is_ok());
    }
}
