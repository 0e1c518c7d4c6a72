//! Single-block coefficient cache
//!
//! Every query needs the coefficients of exactly one block. The cache keeps
//! the most recently read block in memory and goes back to the file only
//! when a date falls outside it.
//!
//! Block `k` starts at byte `(2 + k) * ncoeff * 8`: the header record and
//! the constants record in front of it are each padded to one block.
//! Offsets are computed in `u64` and handed to a single absolute seek, so
//! files larger than 2 GiB are addressed directly.

use std::fmt;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::{debug, trace};

use crate::header::Endian;

/// Size of a double-precision value (bytes)
const DOUBLE_SIZE: u64 = 8;

/// Absolute byte offset of coefficient block `block_index`
///
/// `None` when the offset does not fit in a `u64`.
pub fn block_offset(block_index: usize, ncoeff: usize) -> Option<u64> {
    (block_index as u64)
        .checked_add(2)?
        .checked_mul(ncoeff as u64)?
        .checked_mul(DOUBLE_SIZE)
}

fn offset_or_invalid(block_index: usize, ncoeff: usize) -> io::Result<u64> {
    block_offset(block_index, ncoeff).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("offset of block {block_index} overflows"),
        )
    })
}

/// Read the two leading dates (start, end) of a block
pub fn read_block_dates<R: Read + Seek>(
    reader: &mut R,
    endian: Endian,
    ncoeff: usize,
    block_index: usize,
) -> io::Result<(f64, f64)> {
    reader.seek(SeekFrom::Start(offset_or_invalid(block_index, ncoeff)?))?;
    let mut buffer = [0u8; 16];
    reader.read_exact(&mut buffer)?;
    Ok((endian.read_f64(&buffer[..8]), endian.read_f64(&buffer[8..])))
}

/// One-slot cache of block coefficients backed by the open file
pub struct BlockCache {
    path: PathBuf,
    file: File,
    endian: Endian,
    /// Coefficients of the cached block; `[0]` and `[1]` are its dates
    coefficients: Vec<f64>,
    /// Raw bytes of the last read, reused between refills
    scratch: Vec<u8>,
    reads: u64,
}

impl BlockCache {
    /// Create an empty cache for blocks of `ncoeff` values
    ///
    /// The empty cache has zero dates, so the first lookup always reads.
    pub fn new(file: File, path: &Path, endian: Endian, ncoeff: usize) -> Self {
        Self {
            path: path.to_path_buf(),
            file,
            endian,
            coefficients: vec![0.0; ncoeff],
            scratch: vec![0u8; ncoeff * DOUBLE_SIZE as usize],
            reads: 0,
        }
    }

    /// Make sure the block holding `jed` is loaded
    ///
    /// `block_index` is the block the caller computed for `jed`; it is read
    /// only when the cached dates do not already cover `jed`. The last date
    /// of the file (`end_jed`) belongs to the last block.
    pub fn ensure(&mut self, jed: f64, end_jed: f64, block_index: usize) -> io::Result<()> {
        if self.covers(jed, end_jed) {
            trace!("Block cache hit for JED {}", jed);
            return Ok(());
        }
        self.load(block_index)
    }

    /// True when the cached block covers `jed`
    pub fn covers(&self, jed: f64, end_jed: f64) -> bool {
        let (start, end) = self.dates();
        if start >= end {
            return false;
        }
        (start <= jed && jed < end) || (jed == end_jed && end == end_jed)
    }

    /// Replace the cached block with block `block_index`
    ///
    /// A failed seek or short read leaves the previous block in place.
    pub fn load(&mut self, block_index: usize) -> io::Result<()> {
        let offset = offset_or_invalid(block_index, self.coefficients.len())?;
        debug!(
            "Reading block {} at byte {} of {:?}",
            block_index, offset, self.path
        );

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(&mut self.scratch)?;
        self.endian.read_f64_into(&self.scratch, &mut self.coefficients);
        self.reads += 1;
        Ok(())
    }

    /// Read the leading dates of any block without touching the cache
    pub fn block_dates(&mut self, block_index: usize) -> io::Result<(f64, f64)> {
        read_block_dates(
            &mut self.file,
            self.endian,
            self.coefficients.len(),
            block_index,
        )
    }

    /// Start and end date of the cached block (zero when empty)
    pub fn dates(&self) -> (f64, f64) {
        (self.coefficients[0], self.coefficients[1])
    }

    /// All coefficients of the cached block
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Number of block reads since the cache was created
    pub fn reads(&self) -> u64 {
        self.reads
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for BlockCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockCache")
            .field("path", &self.path)
            .field("dates", &self.dates())
            .field("ncoeff", &self.coefficients.len())
            .field("reads", &self.reads)
            .finish()
    }
}
