//! Unmapped cartridge space emulation.
//!
//! Trimmed dumps are shorter than the chip they came from, and titles probe
//! past the end of ROM for copy protection and size detection. The space past
//! the image therefore has to read back exactly what real hardware returns.

use agbmode_shared::{MIN_ROM_SIZE, padded_rom_size};

/// Byte an erased/unprogrammed ROM reads as.
pub const ERASED_BYTE: u8 = 0xFF;

/// Per-word increment of the open-bus pattern, applied to each half-word.
const OPEN_BUS_STEP: u32 = 0x0002_0002;

/// Pad the window after `raw_size` bytes of image data have been written.
///
/// * `[raw_size, padded)` becomes [`ERASED_BYTE`].
/// * If the padded size is above the smallest chip, the rest of the window
///   gets the open-bus pattern for `base`.
/// * Otherwise the image is mirrored across the whole window.
///
/// Returns the padded (emulated cartridge) size.
pub fn fix_rom_padding(window: &mut [u8], raw_size: usize, base: u32) -> usize {
    let rom_size = padded_rom_size(raw_size);
    debug_assert!(rom_size <= window.len(), "ROM larger than its window");

    window[raw_size..rom_size].fill(ERASED_BYTE);

    if rom_size > MIN_ROM_SIZE {
        fill_open_bus(&mut window[rom_size..], base.wrapping_add(rom_size as u32));
    } else {
        mirror_image(window, rom_size);
    }

    rom_size
}

/// First word of the open-bus pattern at bus address `addr`.
///
/// The bus floats to the half-word address of the access: the low half holds
/// `addr / 2`, the high half the next half-word address.
pub const fn open_bus_seed(addr: u32) -> u32 {
    let halfword = addr / 2;
    (halfword & 0xFFFF) | (halfword.wrapping_add(1) << 16)
}

fn fill_open_bus(area: &mut [u8], start_addr: u32) {
    let mut value = open_bus_seed(start_addr);
    for word in area.chunks_exact_mut(4) {
        word.copy_from_slice(&value.to_le_bytes());
        value = add_halfwords(value, OPEN_BUS_STEP);
    }
}

/// Half-word-wise wrapping addition (no carry between halves).
const fn add_halfwords(a: u32, b: u32) -> u32 {
    let lo = (a as u16).wrapping_add(b as u16);
    let hi = ((a >> 16) as u16).wrapping_add((b >> 16) as u16);
    (hi as u32) << 16 | lo as u32
}

fn mirror_image(window: &mut [u8], rom_size: usize) {
    let (image, rest) = window.split_at_mut(rom_size);
    for block in rest.chunks_mut(rom_size) {
        let len = block.len();
        block.copy_from_slice(&image[..len]);
    }
}
