//! Sorted, fixed-record save database.
//!
//! The file is an array of [`GameDbRecord`]s sorted by hash key, read with a
//! plain binary search. Records are never inserted, removed or reordered at
//! runtime; the calibrator only rewrites a record's attribute word in place.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use agbmode_shared::{GAME_DB_ATTR_OFFSET, GAME_DB_RECORD_SIZE, GameDbRecord};
use bytemuck::Zeroable;
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// A record found by [`GameDb::search`].
#[derive(Debug, Clone, Copy)]
pub struct DbMatch {
    /// Position of the record in the file.
    pub index: u64,
    pub record: GameDbRecord,
}

/// Handle to an open database file.
pub struct GameDb<F> {
    file: F,
    record_count: u64,
}

impl GameDb<File> {
    /// Open for lookups.
    pub fn open(path: &Path) -> Result<Self> {
        Self::new(File::open(path)?)
    }

    /// Open for lookups and attribute corrections.
    pub fn open_writable(path: &Path) -> Result<Self> {
        Self::new(OpenOptions::new().read(true).write(true).open(path)?)
    }
}

impl<F: Seek> GameDb<F> {
    /// Wrap an already opened file. Trailing partial records are ignored.
    pub fn new(mut file: F) -> Result<Self> {
        let len = file.seek(SeekFrom::End(0))?;
        Ok(Self {
            file,
            record_count: len / GAME_DB_RECORD_SIZE as u64,
        })
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn into_inner(self) -> F {
        self.file
    }
}

impl<F: Read + Seek> GameDb<F> {
    /// Read the record at `index`.
    pub fn read_record(&mut self, index: u64) -> Result<GameDbRecord> {
        if index >= self.record_count {
            return Err(Error::RecordOutOfRange {
                index,
                count: self.record_count,
            });
        }
        self.file
            .seek(SeekFrom::Start(index * GAME_DB_RECORD_SIZE as u64))?;
        let mut record = GameDbRecord::zeroed();
        self.file.read_exact(bytemuck::bytes_of_mut(&mut record))?;
        Ok(record)
    }

    /// Binary search for the record whose key equals `key`.
    ///
    /// Reads at most `ceil(log2(n)) + 1` records and never one outside the
    /// file. Returns [`Error::NotFound`] when no record matches.
    pub fn search(&mut self, key: u64) -> Result<DbMatch> {
        debug!("Database search: '{:016X}'", key);

        let mut l: i64 = 0;
        let mut r: i64 = self.record_count as i64 - 1;
        while l <= r {
            let mid = l + (r - l) / 2;
            trace!("l: {} r: {} mid: {}", l, r, mid);

            let record = self.read_record(mid as u64)?;
            let record_key = record.key();
            if record_key == key {
                return Ok(DbMatch {
                    index: mid as u64,
                    record,
                });
            }

            if record_key > key {
                r = mid - 1;
            } else {
                l = mid + 1;
            }
        }

        Err(Error::NotFound(format!("no database entry for {key:016X}")))
    }

    /// Index of the first record that breaks ascending key order, if any.
    ///
    /// Lookups silently miss entries in an unsorted file, so tooling should
    /// check this after editing a database.
    pub fn first_unsorted(&mut self) -> Result<Option<u64>> {
        let mut prev: Option<u64> = None;
        for index in 0..self.record_count {
            let key = self.read_record(index)?.key();
            if prev.is_some_and(|p| p > key) {
                return Ok(Some(index));
            }
            prev = Some(key);
        }
        Ok(None)
    }
}

impl<F: Write + Seek> GameDb<F> {
    /// Rewrite only the attribute word of the record at `index`.
    pub fn write_attr(&mut self, index: u64, attr: u32) -> Result<()> {
        if index >= self.record_count {
            return Err(Error::RecordOutOfRange {
                index,
                count: self.record_count,
            });
        }
        let offset = index * GAME_DB_RECORD_SIZE as u64 + GAME_DB_ATTR_OFFSET as u64;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&attr.to_le_bytes())?;
        self.file.flush()?;
        debug!("Database record {} attr set to {:#010x}", index, attr);
        Ok(())
    }
}
