//! Streams a ROM file into the cartridge window.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use agbmode_shared::MAX_ROM_SIZE;
use tracing::debug;

use super::{RomImage, RomWindow};
use crate::error::{Error, Result};

/// Read granularity when streaming into the window.
pub const LOAD_CHUNK_SIZE: usize = 0x10_0000;

/// Load the ROM at `path` into `window` and pad it.
pub fn load_rom(path: &Path, window: RomWindow) -> Result<RomImage> {
    let file = File::open(path)?;
    let file_size = file.metadata()?.len();
    debug!("Loading ROM {} ({} bytes)", path.display(), file_size);
    load_rom_from_reader(file, file_size, window)
}

/// Load `file_size` bytes from `reader` into `window` and pad it.
///
/// Reads whole chunks until one comes back short. Running out of data before
/// `file_size` bytes arrived is an I/O error.
pub fn load_rom_from_reader<R: Read>(
    mut reader: R,
    file_size: u64,
    mut window: RomWindow,
) -> Result<RomImage> {
    if file_size > MAX_ROM_SIZE as u64 {
        return Err(Error::RomTooBig {
            size: file_size,
            max: MAX_ROM_SIZE as u64,
        });
    }
    let file_size = file_size as usize;

    let mut loaded = 0usize;
    for chunk in window.as_mut_slice().chunks_mut(LOAD_CHUNK_SIZE) {
        let read = read_chunk(&mut reader, chunk)?;
        loaded += read;
        if read < LOAD_CHUNK_SIZE {
            break;
        }
    }

    if loaded < file_size {
        return Err(Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("short read: got {loaded} of {file_size} bytes"),
        )));
    }

    let rom = RomImage::from_window(window, file_size);
    debug!(
        "ROM loaded: {:#x} bytes, padded to {:#x}",
        rom.raw_size(),
        rom.padded_size()
    );
    Ok(rom)
}

/// Fill `buf` as far as the reader allows. Returns bytes read.
fn read_chunk<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::ERASED_BYTE;
    use std::io::Cursor;

    /// Reader that hands out at most `max` bytes per call.
    struct Trickle<R> {
        inner: R,
        max: usize,
    }

    impl<R: Read> Read for Trickle<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(self.max);
            self.inner.read(&mut buf[..len])
        }
    }

    /// Reader that fails after `ok` bytes.
    struct Failing {
        ok: usize,
    }

    impl Read for Failing {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.ok == 0 {
                return Err(io::Error::other("media removed"));
            }
            let len = buf.len().min(self.ok);
            buf[..len].fill(0xAB);
            self.ok -= len;
            Ok(len)
        }
    }

    fn image(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 7) as u8).collect()
    }

    #[test]
    fn loads_multi_chunk_file() {
        let data = image(0x18_0000);
        let window = RomWindow::allocate().unwrap();
        let rom = load_rom_from_reader(Cursor::new(&data), data.len() as u64, window).unwrap();

        assert_eq!(rom.raw_size(), 0x18_0000);
        assert_eq!(rom.padded_size(), 0x20_0000);
        assert_eq!(&rom.cartridge()[..data.len()], &data[..]);
        assert_eq!(rom.cartridge()[0x18_0000], ERASED_BYTE);
    }

    #[test]
    fn partial_reads_are_reassembled() {
        let data = image(0x10_0010);
        let reader = Trickle {
            inner: Cursor::new(&data),
            max: 4096 + 3,
        };
        let rom =
            load_rom_from_reader(reader, data.len() as u64, RomWindow::allocate().unwrap())
                .unwrap();
        assert_eq!(&rom.cartridge()[..data.len()], &data[..]);
    }

    #[test]
    fn rejects_file_larger_than_window() {
        let err = load_rom_from_reader(
            Cursor::new(Vec::new()),
            MAX_ROM_SIZE as u64 + 1,
            RomWindow::allocate().unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::RomTooBig { .. }));
    }

    #[test]
    fn truncated_stream_is_io_error() {
        let data = image(0x1000);
        let err = load_rom_from_reader(Cursor::new(&data), 0x20_0000, RomWindow::allocate().unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn read_error_propagates() {
        let err = load_rom_from_reader(
            Failing { ok: 0x10_0000 + 5 },
            0x20_0000,
            RomWindow::allocate().unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn load_rom_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.gba");
        std::fs::write(&path, image(0x2345)).unwrap();

        let rom = load_rom(&path, RomWindow::allocate().unwrap()).unwrap();
        assert_eq!(rom.raw_size(), 0x2345);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_rom(&dir.path().join("nope.gba"), RomWindow::allocate().unwrap())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
