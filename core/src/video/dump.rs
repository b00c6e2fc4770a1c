//! Debug dump of the raw capture texture.
//!
//! Copies the 512x240 capture texture to scratch VRAM with the transfer
//! engine and writes it out as a bottom-up-flipped 24-bit bitmap.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::info;

use crate::error::Result;
use crate::hal::{Accelerator, DisplayTransfer, TransferDims};

/// Output file name inside the work directory.
pub const TEXTURE_DUMP_FILE: &str = "texture_dump.bmp";

/// Capture texture written by the frame capture hardware.
pub const CAPTURE_TEXTURE_ADDR: u32 = 0x1820_0000;

/// Scratch VRAM the texture is copied to before readback.
pub const DUMP_SCRATCH_ADDR: u32 = 0x1840_0000;

/// Offset of the pixel data in the dump file.
pub const DUMP_PIXEL_OFFSET: u32 = 0x40;

const BMP_HEADER_SIZE: usize = 54;
const DUMP_WIDTH: u32 = 512;
/// The bitmap claims a square image; only the top 240 rows are transferred.
const DUMP_HEIGHT: u32 = 512;
const DUMP_PIXEL_BYTES: u32 = DUMP_WIDTH * DUMP_HEIGHT * 3;
/// 72 DPI.
const PIXELS_PER_METER: u32 = 0xB13;

const TEXTURE_DIMS: TransferDims = TransferDims::new(512, 240);

/// Transfer flags: 24-bit input and output format.
const DUMP_TRANSFER_FLAGS: u32 = 1 << 12 | 1 << 8;

/// Write the 54-byte BITMAPINFOHEADER file header.
///
/// Height is negative so the rows come out top-down.
pub fn write_bmp_header<W: Write>(w: &mut W) -> io::Result<()> {
    // File header
    w.write_all(b"BM")?;
    w.write_u32::<LittleEndian>(DUMP_PIXEL_OFFSET + DUMP_PIXEL_BYTES)?;
    w.write_u32::<LittleEndian>(0)?;
    w.write_u32::<LittleEndian>(DUMP_PIXEL_OFFSET)?;

    // Info header
    w.write_u32::<LittleEndian>(40)?;
    w.write_i32::<LittleEndian>(DUMP_WIDTH as i32)?;
    w.write_i32::<LittleEndian>(-(DUMP_HEIGHT as i32))?;
    w.write_u16::<LittleEndian>(1)?;
    w.write_u16::<LittleEndian>(24)?;
    w.write_u32::<LittleEndian>(0)?;
    w.write_u32::<LittleEndian>(DUMP_PIXEL_BYTES)?;
    w.write_u32::<LittleEndian>(PIXELS_PER_METER)?;
    w.write_u32::<LittleEndian>(PIXELS_PER_METER)?;
    w.write_u32::<LittleEndian>(0)?;
    w.write_u32::<LittleEndian>(0)?;
    Ok(())
}

/// Dump the capture texture to `dir/texture_dump.bmp`.
pub fn dump_frame_texture(accel: &mut dyn Accelerator, dir: &Path) -> Result<()> {
    accel.display_transfer(&DisplayTransfer {
        src: CAPTURE_TEXTURE_ADDR,
        src_dims: TEXTURE_DIMS,
        dst: DUMP_SCRATCH_ADDR + DUMP_PIXEL_OFFSET,
        dst_dims: TEXTURE_DIMS,
        flags: DUMP_TRANSFER_FLAGS,
    });
    accel.wait_for_transfer();

    let pixels = accel.read_vram(
        DUMP_SCRATCH_ADDR + DUMP_PIXEL_OFFSET,
        DUMP_PIXEL_BYTES as usize,
    );

    let path = dir.join(TEXTURE_DUMP_FILE);
    let mut out = BufWriter::new(File::create(&path)?);
    write_bmp_header(&mut out)?;
    out.write_all(&[0u8; DUMP_PIXEL_OFFSET as usize - BMP_HEADER_SIZE])?;
    out.write_all(&pixels)?;
    out.flush()?;

    info!("Texture dumped to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{DeviceLog, TestAccelerator};

    #[test]
    fn header_matches_known_bytes() {
        let mut header = Vec::new();
        write_bmp_header(&mut header).unwrap();
        assert_eq!(
            header,
            [
                0x42, 0x4D, 0x40, 0x00, 0x0C, 0x00, 0x00, 0x00, 0x00, 0x00, 0x40, 0x00, 0x00,
                0x00, 0x28, 0x00, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00, 0xFE, 0xFF, 0xFF,
                0x01, 0x00, 0x18, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0C, 0x00, 0x13,
                0x0B, 0x00, 0x00, 0x13, 0x0B, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
                0x00, 0x00,
            ]
        );
    }

    #[test]
    fn dump_writes_header_and_pixels() {
        let dir = tempfile::tempdir().unwrap();
        let log = DeviceLog::default();
        let mut accel = TestAccelerator::logging(log.clone());
        dump_frame_texture(&mut accel, dir.path()).unwrap();

        assert_eq!(log.ops(), vec!["transfer", "wait_transfer"]);
        let transfer = log.transfers()[0];
        assert_eq!(transfer.src, CAPTURE_TEXTURE_ADDR);
        assert_eq!(transfer.dst, 0x1840_0040);
        assert_eq!(transfer.src_dims.packed(), 240 << 16 | 512);

        let file = std::fs::read(dir.path().join(TEXTURE_DUMP_FILE)).unwrap();
        assert_eq!(file.len(), 0x40 + 512 * 512 * 3);
        assert_eq!(&file[..2], b"BM");
        assert!(file[54..0x40].iter().all(|&b| b == 0));
    }
}
