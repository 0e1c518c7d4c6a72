//! Opening DE files and resolving body and item queries
//!
//! [`Ephemeris`] owns one open file and one cached coefficient block. Every
//! query reduces to one or two evaluations of a stored item:
//!
//! - a body relative to itself is the zero vector;
//! - a body relative to the solar system barycenter (or the reverse, with
//!   the sign flipped) comes from the body's own item, except for the Earth
//!   and the Moon, which are split out of the Earth-Moon barycenter using
//!   EMRAT;
//! - the Moon relative to the Earth (or the reverse) is stored directly;
//! - every other pair is the difference of two barycentric vectors.
//!
//! Positions are in km and velocities in km/s. Item rates are per second.
//!
//! Queries take `&mut self` because a cache miss reads from the file. To
//! query from several threads, give each thread its own handle with
//! [`Ephemeris::try_clone`].

use std::fs::File;
use std::path::{Path, PathBuf};

use log::error;
use nalgebra::Vector3;

use crate::block::BlockCache;
use crate::chebyshev;
use crate::errors::{io_err, OpenResult, QueryError, QueryResult};
use crate::header::{self, Header, ItemKey};
use crate::names::{Body, Item};

/// Settings used when opening an ephemeris file
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenOptions {
    exhaustive_check: bool,
}

impl OpenOptions {
    /// Default options: only the first and last block dates are checked
    pub fn new() -> Self {
        Self::default()
    }

    /// Check the leading dates of every block at open time
    ///
    /// This reads one small record per block, so it takes noticeably longer
    /// on long releases.
    pub fn exhaustive_check(mut self, enabled: bool) -> Self {
        self.exhaustive_check = enabled;
        self
    }

    /// Open and validate the file at `path`
    pub fn open<P: AsRef<Path>>(&self, path: P) -> OpenResult<Ephemeris> {
        let path = path.as_ref().to_path_buf();
        let mut file = File::open(&path).map_err(|e| io_err(&path, e))?;

        let header = header::load(&mut file, &path, self.exhaustive_check)?;
        let cache = BlockCache::new(file, &path, header.endian, header.ncoeff);

        Ok(Ephemeris {
            path,
            options: *self,
            header,
            cache,
            ready: true,
        })
    }
}

/// An open DE ephemeris file
#[derive(Debug)]
pub struct Ephemeris {
    path: PathBuf,
    options: OpenOptions,
    header: Header,
    cache: BlockCache,
    /// Cleared when reading a block fails
    ready: bool,
}

impl Ephemeris {
    /// Open the file at `path` with default options
    pub fn open<P: AsRef<Path>>(path: P) -> OpenResult<Self> {
        OpenOptions::new().open(path)
    }

    /// Options builder for [`OpenOptions::open`]
    pub fn options() -> OpenOptions {
        OpenOptions::new()
    }

    /// Open the same file again with its own handle and cache
    pub fn try_clone(&self) -> OpenResult<Self> {
        self.options.open(&self.path)
    }

    /// Position of `target` relative to `center` in km
    pub fn body_position(&mut self, target: Body, center: Body, jed: f64) -> QueryResult<[f64; 3]> {
        let vector = self.body_vector(target, center, jed, false)?;
        let mut position = [0.0; 3];
        position.copy_from_slice(&vector);
        Ok(position)
    }

    /// Position (km) then velocity (km/s) of `target` relative to `center`
    pub fn body_state(&mut self, target: Body, center: Body, jed: f64) -> QueryResult<[f64; 6]> {
        let vector = self.body_vector(target, center, jed, true)?;
        let mut state = [0.0; 6];
        state.copy_from_slice(&vector);
        Ok(state)
    }

    /// [`Ephemeris::body_position`] as a vector
    pub fn body_position_vector(
        &mut self,
        target: Body,
        center: Body,
        jed: f64,
    ) -> QueryResult<Vector3<f64>> {
        self.body_position(target, center, jed).map(|p| Vector3::from_row_slice(&p))
    }

    /// [`Ephemeris::body_state`] as position and velocity vectors
    pub fn body_state_vectors(
        &mut self,
        target: Body,
        center: Body,
        jed: f64,
    ) -> QueryResult<(Vector3<f64>, Vector3<f64>)> {
        let state = self.body_state(target, center, jed)?;
        Ok((
            Vector3::from_row_slice(&state[..3]),
            Vector3::from_row_slice(&state[3..]),
        ))
    }

    /// State of `target` relative to `center`: 3 positions, plus 3
    /// velocities when `want_derivative` is set
    pub fn body_vector(
        &mut self,
        target: Body,
        center: Body,
        jed: f64,
        want_derivative: bool,
    ) -> QueryResult<Vec<f64>> {
        self.check_query(jed)?;

        if target == center {
            return Ok(vec![0.0; if want_derivative { 6 } else { 3 }]);
        }

        match (target, center) {
            (Body::SolarSystemBarycenter, other) => {
                let mut vector = self.barycentric(other, jed, want_derivative)?;
                negate(&mut vector);
                Ok(vector)
            }
            (other, Body::SolarSystemBarycenter) => self.barycentric(other, jed, want_derivative),
            (Body::Moon, Body::Earth) => self.base_item(Item::Moon, jed, want_derivative),
            (Body::Earth, Body::Moon) => {
                let mut vector = self.base_item(Item::Moon, jed, want_derivative)?;
                negate(&mut vector);
                Ok(vector)
            }
            _ => {
                let mut vector = self.barycentric(target, jed, want_derivative)?;
                let center = self.barycentric(center, jed, want_derivative)?;
                vector.iter_mut().zip(&center).for_each(|(t, c)| *t -= c);
                Ok(vector)
            }
        }
    }

    /// Values of a stored item (`component_count` values)
    pub fn item(&mut self, item: Item, jed: f64) -> QueryResult<Vec<f64>> {
        self.item_vector(item, jed, false)
    }

    /// Per-second rates of a stored item (`component_count` values)
    pub fn item_derivative(&mut self, item: Item, jed: f64) -> QueryResult<Vec<f64>> {
        let mut state = self.item_vector(item, jed, true)?;
        Ok(state.split_off(item.component_count()))
    }

    /// Values of a stored item, followed by their rates when
    /// `want_derivative` is set
    pub fn item_vector(
        &mut self,
        item: Item,
        jed: f64,
        want_derivative: bool,
    ) -> QueryResult<Vec<f64>> {
        self.check_query(jed)?;
        self.base_item(item, jed, want_derivative)
    }

    /// Coefficients of the whole block covering `jed`, dates first
    pub fn block_coefficients(&mut self, jed: f64) -> QueryResult<&[f64]> {
        self.check_query(jed)?;
        let block_index = self.block_index(jed);
        self.ensure_block(jed, block_index)?;
        Ok(self.cache.coefficients())
    }

    /// A named constant from the header
    ///
    /// When a name occurs more than once the last entry wins. `AU`, `EMRAT`
    /// and `DENUM` fall back to the header fields if the table lacks them.
    pub fn constant(&self, name: &str) -> Option<f64> {
        let stored = self
            .header
            .constants
            .iter()
            .rev()
            .find(|(key, _)| key == name)
            .map(|(_, value)| *value);

        stored.or(match name {
            "AU" => Some(self.header.au),
            "EMRAT" => Some(self.header.emrat),
            "DENUM" => Some(f64::from(self.header.index)),
            _ => None,
        })
    }

    /// All constants in file order
    pub fn constants(&self) -> &[(String, f64)] {
        &self.header.constants
    }

    /// Items stored in this release
    pub fn items(&self) -> Vec<Item> {
        Item::ALL
            .iter()
            .copied()
            .filter(|item| !self.header.key(*item).is_absent())
            .collect()
    }

    /// Where `item` lives inside a block
    pub fn item_key(&self, item: Item) -> ItemKey {
        self.header.key(item)
    }

    pub fn begin_jed(&self) -> f64 {
        self.header.begin_jed
    }

    pub fn end_jed(&self) -> f64 {
        self.header.end_jed
    }

    /// Days covered by one block
    pub fn block_span(&self) -> f64 {
        self.header.block_span
    }

    pub fn block_count(&self) -> usize {
        self.header.block_count()
    }

    /// Doubles per block
    pub fn ncoeff(&self) -> usize {
        self.header.ncoeff
    }

    /// Release number (e.g. 430 for DE430)
    pub fn index(&self) -> i32 {
        self.header.index
    }

    /// The three label lines joined by newlines
    pub fn label(&self) -> String {
        self.header.label_text()
    }

    /// Astronomical unit in km
    pub fn au(&self) -> f64 {
        self.header.au
    }

    /// Earth/Moon mass ratio
    pub fn emrat(&self) -> f64 {
        self.header.emrat
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parsed header
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Number of block reads performed by queries so far
    pub fn block_reads(&self) -> u64 {
        self.cache.reads()
    }

    /// False once a block read has failed
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    fn check_query(&self, jed: f64) -> QueryResult<()> {
        if !self.ready {
            return Err(QueryError::NotReady);
        }
        if !(jed >= self.header.begin_jed && jed <= self.header.end_jed) {
            return Err(QueryError::OutOfRange {
                jed,
                begin_jed: self.header.begin_jed,
                end_jed: self.header.end_jed,
            });
        }
        Ok(())
    }

    /// Block holding `jed`; the end date belongs to the last block
    fn block_index(&self, jed: f64) -> usize {
        let last = self.header.block_count() - 1;
        if jed == self.header.end_jed {
            return last;
        }
        let normalized = (jed - self.header.begin_jed) / self.header.block_span;
        (normalized.floor() as usize).min(last)
    }

    fn ensure_block(&mut self, jed: f64, block_index: usize) -> QueryResult<()> {
        self.cache
            .ensure(jed, self.header.end_jed, block_index)
            .map_err(|source| {
                error!(
                    "Reading block {} of {:?} failed: {}",
                    block_index, self.path, source
                );
                self.ready = false;
                QueryError::Io {
                    path: self.path.clone(),
                    source,
                }
            })
    }

    /// Evaluate one stored item at `jed`
    fn base_item(&mut self, item: Item, jed: f64, want_derivative: bool) -> QueryResult<Vec<f64>> {
        let key = self.header.key(item);
        if key.is_absent() {
            return Err(QueryError::Unavailable(item));
        }

        let block_index = self.block_index(jed);
        self.ensure_block(jed, block_index)?;

        let normalized = (jed - self.header.begin_jed) / self.header.block_span;
        let (sub_index, t) = chebyshev::subinterval(
            normalized - block_index as f64,
            key.subintervals,
            jed == self.header.end_jed,
        );

        let components = item.component_count();
        let start = key.offset - 1 + components * sub_index * key.coefficients;
        let len = components * key.coefficients;
        let coeffs = self
            .cache
            .coefficients()
            .get(start..start + len)
            .ok_or(QueryError::InvalidIndex {
                kind: "coefficient offset",
                index: start as i64,
            })?;

        Ok(chebyshev::evaluate(
            coeffs,
            key.coefficients,
            t,
            components,
            want_derivative,
            chebyshev::derivative_scale(key.subintervals, self.header.block_span),
        ))
    }

    /// State of `body` relative to the solar system barycenter
    fn barycentric(
        &mut self,
        body: Body,
        jed: f64,
        want_derivative: bool,
    ) -> QueryResult<Vec<f64>> {
        if let Some(item) = body.barycentric_item() {
            return self.base_item(item, jed, want_derivative);
        }

        match body {
            Body::Earth | Body::Moon => {
                let mut vector = self.base_item(Item::EarthMoonBarycenter, jed, want_derivative)?;
                let moon = self.base_item(Item::Moon, jed, want_derivative)?;
                let factor = if body == Body::Earth {
                    -1.0 / (1.0 + self.header.emrat)
                } else {
                    self.header.emrat / (1.0 + self.header.emrat)
                };
                vector
                    .iter_mut()
                    .zip(&moon)
                    .for_each(|(v, m)| *v += m * factor);
                Ok(vector)
            }
            _ => Ok(vec![0.0; if want_derivative { 6 } else { 3 }]),
        }
    }
}

fn negate(vector: &mut [f64]) {
    vector.iter_mut().for_each(|v| *v = -*v);
}
