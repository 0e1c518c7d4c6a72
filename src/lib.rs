//! jplde: reader for JPL DE binary planetary and lunar ephemerides
//!
//! A DE file holds Chebyshev coefficients for the planets, the Sun, the Moon,
//! nutations, lunar librations and TT-TDB over a range of Julian Ephemeris
//! Dates. This crate opens such a file, validates its header and evaluates
//! positions and velocities of any body relative to any other.
//!
//! ```no_run
//! use jplde::{Body, Ephemeris};
//!
//! let mut eph = Ephemeris::open("linux_p1550p2650.430")?;
//! let moon = eph.body_position(Body::Moon, Body::Earth, 2451545.0)?;
//! println!("Moon at J2000: {:?} km", moon);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Positions are in km, velocities in km/s. An [`Ephemeris`] is a single
//! owner of its file handle; use [`Ephemeris::try_clone`] for other threads.

pub mod block;
pub mod chebyshev;
pub mod ephemeris;
pub mod errors;
pub mod header;
pub mod names;

// Re-export commonly used types
pub use ephemeris::{Ephemeris, OpenOptions};
pub use errors::{OpenError, OpenResult, QueryError, QueryResult};
pub use header::{Header, ItemKey};
pub use names::{Body, Item};
