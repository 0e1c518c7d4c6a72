//! DE binary header parsing and validation
//!
//! A DE file starts with a fixed-layout header record followed by a record
//! of constant values. Both records are padded to the size of one
//! coefficient block (`ncoeff` doubles), and the coefficient blocks follow.
//!
//! Header record layout, in file order:
//!
//! | field | size |
//! |---|---|
//! | label | 3 x 84 bytes |
//! | constant names | 400 x 6 bytes |
//! | begin JED, end JED, block span | 3 x f64 |
//! | constant count | i32 |
//! | AU, EMRAT | 2 x f64 |
//! | item keys 0..=11 | 12 x 3 x i32 |
//! | release index (DE number) | i32 |
//! | item key 12 | 3 x i32 |
//! | extra constant names | (count - 400) x 6 bytes, only when count > 400 |
//! | item keys 13..=14 | 2 x 3 x i32 |

use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::{debug, warn};

use crate::block::{block_offset, read_block_dates};
use crate::errors::{corrupt, io_err, OpenError, OpenResult};
use crate::names::{Item, ITEM_COUNT};

/// Lines in the release label
pub const LABEL_LINES: usize = 3;
/// Characters per label line
pub const LABEL_SIZE: usize = 84;
/// Characters per constant name
pub const CONSTANT_NAME_SIZE: usize = 6;
/// Constant name slots in the fixed part of the header
pub const CONSTANT_SLOTS: usize = 400;
/// Largest supported number of constants
pub const MAX_CONSTANTS: usize = 1000;

const NAMES_OFFSET: usize = LABEL_LINES * LABEL_SIZE;
const BEGIN_OFFSET: usize = NAMES_OFFSET + CONSTANT_SLOTS * CONSTANT_NAME_SIZE;
const END_OFFSET: usize = BEGIN_OFFSET + 8;
const SPAN_OFFSET: usize = END_OFFSET + 8;
const COUNT_OFFSET: usize = SPAN_OFFSET + 8;
const AU_OFFSET: usize = COUNT_OFFSET + 4;
const EMRAT_OFFSET: usize = AU_OFFSET + 8;
const KEYS_OFFSET: usize = EMRAT_OFFSET + 8;
const INDEX_OFFSET: usize = KEYS_OFFSET + 12 * 3 * 4;
const KEY12_OFFSET: usize = INDEX_OFFSET + 4;

/// Size of the header up to and including the key of item 12
pub const FIXED_HEADER_SIZE: usize = KEY12_OFFSET + 3 * 4;

/// Byte order of the numeric fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

impl Endian {
    /// Decode one f64 from the first 8 bytes of `buf`
    pub fn read_f64(self, buf: &[u8]) -> f64 {
        match self {
            Endian::Little => LittleEndian::read_f64(buf),
            Endian::Big => BigEndian::read_f64(buf),
        }
    }

    /// Decode one i32 from the first 4 bytes of `buf`
    pub fn read_i32(self, buf: &[u8]) -> i32 {
        match self {
            Endian::Little => LittleEndian::read_i32(buf),
            Endian::Big => BigEndian::read_i32(buf),
        }
    }

    /// Decode `dst.len()` doubles; `src` must hold exactly `8 * dst.len()` bytes
    pub fn read_f64_into(self, src: &[u8], dst: &mut [f64]) {
        match self {
            Endian::Little => LittleEndian::read_f64_into(src, dst),
            Endian::Big => BigEndian::read_f64_into(src, dst),
        }
    }

    /// Work out the byte order from the fixed part of the header
    ///
    /// The constant count is small and non-negative, which only one byte
    /// order can produce. A count of zero reads the same both ways, so the
    /// block span breaks the tie.
    pub fn detect(fixed: &[u8]) -> OpenResult<Endian> {
        let plausible: Vec<Endian> = [Endian::Little, Endian::Big]
            .into_iter()
            .filter(|endian| {
                let count = endian.read_i32(&fixed[COUNT_OFFSET..]);
                (0..=MAX_CONSTANTS as i32).contains(&count)
            })
            .collect();

        match plausible.as_slice() {
            [] => Err(corrupt(format!(
                "constant count {} is outside 0..={}",
                Endian::Little.read_i32(&fixed[COUNT_OFFSET..]),
                MAX_CONSTANTS
            ))),
            [only] => Ok(*only),
            _ => {
                let span_ok = |endian: Endian| {
                    let span = endian.read_f64(&fixed[SPAN_OFFSET..]);
                    span.is_normal() && span > 0.0
                };
                if !span_ok(Endian::Little) && span_ok(Endian::Big) {
                    Ok(Endian::Big)
                } else {
                    Ok(Endian::Little)
                }
            }
        }
    }
}

/// Location of one item's coefficients inside a block
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ItemKey {
    /// 1-based position of the item's first coefficient in the block
    pub offset: usize,
    /// Coefficients per component in one subinterval
    pub coefficients: usize,
    /// Subintervals per block
    pub subintervals: usize,
}

impl ItemKey {
    /// True when the release does not store this item
    pub fn is_absent(&self) -> bool {
        self.coefficients == 0 && self.subintervals == 0
    }

    /// Number of doubles this item occupies in one block
    pub fn block_len(&self, item: Item) -> Option<usize> {
        item.component_count()
            .checked_mul(self.coefficients)?
            .checked_mul(self.subintervals)
    }
}

/// Parsed header of a DE file
#[derive(Clone, Debug)]
pub struct Header {
    /// Label lines with trailing blanks removed
    pub label: Vec<String>,
    /// Release number, e.g. 405 for DE405
    pub index: i32,
    /// First covered Julian Ephemeris Date
    pub begin_jed: f64,
    /// Last covered Julian Ephemeris Date
    pub end_jed: f64,
    /// Days covered by one coefficient block
    pub block_span: f64,
    /// Astronomical unit in km
    pub au: f64,
    /// Earth/Moon mass ratio
    pub emrat: f64,
    /// Coefficient layout of each item, in item order
    pub keys: [ItemKey; ITEM_COUNT],
    /// Named constants in file order (duplicates kept)
    pub constants: Vec<(String, f64)>,
    /// Doubles per block, including the two leading dates
    pub ncoeff: usize,
    /// Byte order of every numeric field in the file
    pub endian: Endian,
}

impl Header {
    /// Parse the header and the constant values from `reader`
    ///
    /// Only decoding happens here; call [`Header::validate`] to check the
    /// values for consistency.
    pub fn read<R: Read + Seek>(reader: &mut R, path: &Path) -> OpenResult<Header> {
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|e| io_err(path, e))?;

        let mut fixed = vec![0u8; FIXED_HEADER_SIZE];
        reader.read_exact(&mut fixed).map_err(|e| io_err(path, e))?;

        let endian = Endian::detect(&fixed)?;
        let constant_count = endian.read_i32(&fixed[COUNT_OFFSET..]) as usize;

        let label = fixed[..NAMES_OFFSET]
            .chunks_exact(LABEL_SIZE)
            .map(trim_field)
            .collect();

        let mut name_bytes = fixed[NAMES_OFFSET..BEGIN_OFFSET].to_vec();
        if constant_count > CONSTANT_SLOTS {
            let mut extra = vec![0u8; (constant_count - CONSTANT_SLOTS) * CONSTANT_NAME_SIZE];
            reader.read_exact(&mut extra).map_err(|e| io_err(path, e))?;
            name_bytes.extend_from_slice(&extra);
        }

        let mut tail = [0u8; 2 * 3 * 4];
        reader.read_exact(&mut tail).map_err(|e| io_err(path, e))?;

        let mut raw_keys = [[0i32; 3]; ITEM_COUNT];
        for (i, chunk) in fixed[KEYS_OFFSET..INDEX_OFFSET].chunks_exact(4).enumerate() {
            raw_keys[i / 3][i % 3] = endian.read_i32(chunk);
        }
        for (j, chunk) in fixed[KEY12_OFFSET..FIXED_HEADER_SIZE]
            .chunks_exact(4)
            .enumerate()
        {
            raw_keys[12][j] = endian.read_i32(chunk);
        }
        for (i, chunk) in tail.chunks_exact(4).enumerate() {
            raw_keys[13 + i / 3][i % 3] = endian.read_i32(chunk);
        }

        let keys = parse_keys(&raw_keys)?;
        let ncoeff = compute_ncoeff(&keys)
            .ok_or_else(|| corrupt("coefficient count per block overflows"))?;

        let mut constants = Vec::with_capacity(constant_count);
        if constant_count > 0 {
            let values_offset = (ncoeff as u64)
                .checked_mul(8)
                .ok_or_else(|| corrupt("constant record offset overflows"))?;
            reader
                .seek(SeekFrom::Start(values_offset))
                .map_err(|e| io_err(path, e))?;

            let mut value_bytes = vec![0u8; constant_count * 8];
            reader
                .read_exact(&mut value_bytes)
                .map_err(|e| io_err(path, e))?;
            let mut values = vec![0.0; constant_count];
            endian.read_f64_into(&value_bytes, &mut values);

            constants.extend(
                name_bytes
                    .chunks_exact(CONSTANT_NAME_SIZE)
                    .map(trim_field)
                    .zip(values),
            );
        }

        Ok(Header {
            label,
            index: endian.read_i32(&fixed[INDEX_OFFSET..]),
            begin_jed: endian.read_f64(&fixed[BEGIN_OFFSET..]),
            end_jed: endian.read_f64(&fixed[END_OFFSET..]),
            block_span: endian.read_f64(&fixed[SPAN_OFFSET..]),
            au: endian.read_f64(&fixed[AU_OFFSET..]),
            emrat: endian.read_f64(&fixed[EMRAT_OFFSET..]),
            keys,
            constants,
            ncoeff,
            endian,
        })
    }

    /// Check the header values for internal consistency
    pub fn validate(&self) -> OpenResult<()> {
        let finite = [
            ("begin date", self.begin_jed),
            ("end date", self.end_jed),
            ("block span", self.block_span),
            ("AU", self.au),
            ("EMRAT", self.emrat),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(corrupt(format!("{name} is not finite ({value})")));
            }
        }

        if self.begin_jed >= self.end_jed {
            return Err(corrupt(format!(
                "begin date {} is not before end date {}",
                self.begin_jed, self.end_jed
            )));
        }
        if self.block_span <= 0.0 {
            return Err(corrupt(format!(
                "block span must be positive, got {}",
                self.block_span
            )));
        }
        if self.end_jed - self.begin_jed < self.block_span {
            return Err(corrupt(format!(
                "date range {}..{} is shorter than one block ({} days)",
                self.begin_jed, self.end_jed, self.block_span
            )));
        }
        if self.emrat == 0.0 {
            return Err(corrupt("EMRAT is zero"));
        }
        if self.au == 0.0 {
            return Err(corrupt("AU is zero"));
        }
        if self.ncoeff <= 2 {
            return Err(corrupt("no items are stored in the coefficient blocks"));
        }
        if block_offset(self.block_count(), self.ncoeff).is_none() {
            return Err(corrupt(format!(
                "{} blocks of {} values do not fit in a 64-bit file offset",
                self.block_count(),
                self.ncoeff
            )));
        }

        for (item, key) in Item::ALL.iter().zip(self.keys.iter()) {
            if key.is_absent() {
                continue;
            }
            if key.coefficients == 0 || key.subintervals == 0 {
                return Err(corrupt(format!(
                    "{item} key is half empty: {} coefficients, {} subintervals",
                    key.coefficients, key.subintervals
                )));
            }
            if key.offset < 3 {
                return Err(corrupt(format!(
                    "{item} coefficients start at {}, inside the block dates",
                    key.offset
                )));
            }
            let end = key
                .block_len(*item)
                .and_then(|len| len.checked_add(key.offset - 1));
            match end {
                Some(end) if end <= self.ncoeff => {}
                _ => {
                    return Err(corrupt(format!(
                        "{item} coefficients run past the end of a {}-value block",
                        self.ncoeff
                    )))
                }
            }
        }

        Ok(())
    }

    /// Compare the leading dates of stored blocks with the header
    ///
    /// The quick check reads the first and the last block. With `exhaustive`
    /// every block is read and compared with `begin + k * span`.
    pub fn verify_blocks<R: Read + Seek>(
        &self,
        reader: &mut R,
        path: &Path,
        exhaustive: bool,
    ) -> OpenResult<()> {
        let block_count = self.block_count();
        let mut read = |block_index: usize| {
            read_block_dates(reader, self.endian, self.ncoeff, block_index)
                .map_err(|e| io_err(path, e))
        };

        let check = |block_index: usize, found: (f64, f64), expected: (f64, f64)| {
            if found == expected {
                Ok(())
            } else {
                Err(corrupt(format!(
                    "block {block_index} covers {}..{}, expected {}..{}",
                    found.0, found.1, expected.0, expected.1
                )))
            }
        };

        if exhaustive {
            for block_index in 0..block_count {
                let start = self.begin_jed + block_index as f64 * self.block_span;
                check(
                    block_index,
                    read(block_index)?,
                    (start, start + self.block_span),
                )?;
            }
            return Ok(());
        }

        check(
            0,
            read(0)?,
            (self.begin_jed, self.begin_jed + self.block_span),
        )?;
        let last = block_count.saturating_sub(1);
        check(
            last,
            read(last)?,
            (self.end_jed - self.block_span, self.end_jed),
        )
    }

    /// Number of coefficient blocks after the two header records
    pub fn block_count(&self) -> usize {
        ((self.end_jed - self.begin_jed) / self.block_span).floor() as usize
    }

    /// The key of `item`
    pub fn key(&self, item: Item) -> ItemKey {
        self.keys[item.index()]
    }

    /// Label lines joined by newlines
    pub fn label_text(&self) -> String {
        self.label.join("\n")
    }
}

/// Parse, validate and verify in one step, logging the outcome
pub(crate) fn load<R: Read + Seek>(
    reader: &mut R,
    path: &Path,
    exhaustive: bool,
) -> OpenResult<Header> {
    let outcome = Header::read(reader, path).and_then(|header| {
        header.validate()?;
        header.verify_blocks(reader, path, exhaustive)?;
        Ok(header)
    });

    match &outcome {
        Ok(header) => debug!(
            "Opened DE{} from {:?}: JED {}..{}, {} blocks of {} values, {:?} endian",
            header.index,
            path,
            header.begin_jed,
            header.end_jed,
            header.block_count(),
            header.ncoeff,
            header.endian
        ),
        Err(OpenError::Corrupt(reason)) => warn!("Rejected {:?}: {}", path, reason),
        Err(err) => warn!("Could not read {:?}: {}", path, err),
    }

    outcome
}

/// Sum of all item lengths plus the two block dates
pub fn compute_ncoeff(keys: &[ItemKey; ITEM_COUNT]) -> Option<usize> {
    Item::ALL
        .iter()
        .zip(keys.iter())
        .try_fold(2usize, |acc, (item, key)| acc.checked_add(key.block_len(*item)?))
}

fn parse_keys(raw: &[[i32; 3]; ITEM_COUNT]) -> OpenResult<[ItemKey; ITEM_COUNT]> {
    let mut keys = [ItemKey::default(); ITEM_COUNT];
    for (i, (key, fields)) in keys.iter_mut().zip(raw.iter()).enumerate() {
        let field = |value: i32| {
            usize::try_from(value)
                .map_err(|_| corrupt(format!("item {i} has a negative key field ({value})")))
        };
        *key = ItemKey {
            offset: field(fields[0])?,
            coefficients: field(fields[1])?,
            subintervals: field(fields[2])?,
        };
    }
    Ok(keys)
}

/// Text of a fixed-width field with trailing blanks and NULs removed
fn trim_field(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches([' ', '\0'])
        .to_string()
}
