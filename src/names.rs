//! Body codes, stored item indices and their names
//!
//! DE files store fifteen quantities ("items") per block. Public body
//! queries use a separate numbering in which the two barycenters are
//! ordinary bodies and the Earth and Moon are derived from the Earth-Moon
//! barycenter and the geocentric Moon.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;

use crate::errors::QueryError;

/// Bodies accepted by the target/center queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Body {
    Mercury = 1,
    Venus = 2,
    Earth = 3,
    Mars = 4,
    Jupiter = 5,
    Saturn = 6,
    Uranus = 7,
    Neptune = 8,
    Pluto = 9,
    Moon = 10,
    Sun = 11,
    SolarSystemBarycenter = 12,
    EarthMoonBarycenter = 13,
}

/// Quantities stored directly in every coefficient block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Item {
    Mercury = 0,
    Venus = 1,
    EarthMoonBarycenter = 2,
    Mars = 3,
    Jupiter = 4,
    Saturn = 5,
    Uranus = 6,
    Neptune = 7,
    Pluto = 8,
    /// Moon relative to the Earth
    Moon = 9,
    Sun = 10,
    /// Earth nutations in longitude and obliquity (IAU 1980)
    Nutations = 11,
    /// Lunar mantle libration angles
    Librations = 12,
    /// Lunar mantle angular velocity
    LunarAngularVelocity = 13,
    /// TT-TDB at the geocenter
    TtMinusTdb = 14,
}

/// Number of items stored in a DE file
pub const ITEM_COUNT: usize = 15;

impl Body {
    /// All bodies in code order
    pub const ALL: [Body; 13] = [
        Body::Mercury,
        Body::Venus,
        Body::Earth,
        Body::Mars,
        Body::Jupiter,
        Body::Saturn,
        Body::Uranus,
        Body::Neptune,
        Body::Pluto,
        Body::Moon,
        Body::Sun,
        Body::SolarSystemBarycenter,
        Body::EarthMoonBarycenter,
    ];

    /// The integer code of this body (1..=13)
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Canonical upper-case name
    pub fn name(self) -> &'static str {
        match self {
            Body::Mercury => "MERCURY",
            Body::Venus => "VENUS",
            Body::Earth => "EARTH",
            Body::Mars => "MARS",
            Body::Jupiter => "JUPITER",
            Body::Saturn => "SATURN",
            Body::Uranus => "URANUS",
            Body::Neptune => "NEPTUNE",
            Body::Pluto => "PLUTO",
            Body::Moon => "MOON",
            Body::Sun => "SUN",
            Body::SolarSystemBarycenter => "SSBARY",
            Body::EarthMoonBarycenter => "EMBARY",
        }
    }

    /// Look a body up by name, ignoring case
    pub fn from_name(name: &str) -> Option<Body> {
        BODY_IDS.get(&name.trim().to_lowercase()).copied()
    }

    /// The item holding this body's barycentric state, if it is stored directly
    ///
    /// The Earth and the Moon are derived from two items and the solar
    /// system barycenter is the origin itself, so all three return `None`.
    pub fn barycentric_item(self) -> Option<Item> {
        match self {
            Body::Mercury => Some(Item::Mercury),
            Body::Venus => Some(Item::Venus),
            Body::Mars => Some(Item::Mars),
            Body::Jupiter => Some(Item::Jupiter),
            Body::Saturn => Some(Item::Saturn),
            Body::Uranus => Some(Item::Uranus),
            Body::Neptune => Some(Item::Neptune),
            Body::Pluto => Some(Item::Pluto),
            Body::Sun => Some(Item::Sun),
            Body::EarthMoonBarycenter => Some(Item::EarthMoonBarycenter),
            Body::Earth | Body::Moon | Body::SolarSystemBarycenter => None,
        }
    }
}

impl Item {
    /// All items in file order
    pub const ALL: [Item; ITEM_COUNT] = [
        Item::Mercury,
        Item::Venus,
        Item::EarthMoonBarycenter,
        Item::Mars,
        Item::Jupiter,
        Item::Saturn,
        Item::Uranus,
        Item::Neptune,
        Item::Pluto,
        Item::Moon,
        Item::Sun,
        Item::Nutations,
        Item::Librations,
        Item::LunarAngularVelocity,
        Item::TtMinusTdb,
    ];

    /// Position of this item in the header key table (0..=14)
    pub fn index(self) -> usize {
        self as usize
    }

    /// Number of components interpolated for this item
    pub fn component_count(self) -> usize {
        match self {
            Item::Nutations => 2,
            Item::TtMinusTdb => 1,
            _ => 3,
        }
    }

    /// Canonical upper-case name
    pub fn name(self) -> &'static str {
        match self {
            Item::Mercury => "MERCURY",
            Item::Venus => "VENUS",
            Item::EarthMoonBarycenter => "EMBARY",
            Item::Mars => "MARS",
            Item::Jupiter => "JUPITER",
            Item::Saturn => "SATURN",
            Item::Uranus => "URANUS",
            Item::Neptune => "NEPTUNE",
            Item::Pluto => "PLUTO",
            Item::Moon => "MOON",
            Item::Sun => "SUN",
            Item::Nutations => "NUTATIONS",
            Item::Librations => "LIBRATIONS",
            Item::LunarAngularVelocity => "LUNAR_ANGULAR_VELOCITY",
            Item::TtMinusTdb => "TT-TDB",
        }
    }

    /// Look an item up by name, ignoring case
    pub fn from_name(name: &str) -> Option<Item> {
        ITEM_IDS.get(&name.trim().to_lowercase()).copied()
    }
}

lazy_static! {
    /// Map from lowercase body names and aliases to bodies
    static ref BODY_IDS: HashMap<String, Body> = {
        let mut m = HashMap::new();
        for &(body, name) in BODY_NAME_PAIRS.iter() {
            m.insert(name.to_lowercase(), body);
        }
        m
    };

    /// Map from lowercase item names and aliases to items
    static ref ITEM_IDS: HashMap<String, Item> = {
        let mut m = HashMap::new();
        for &(item, name) in ITEM_NAME_PAIRS.iter() {
            m.insert(name.to_lowercase(), item);
        }
        m
    };
}

/// Pairs of (body, name) including common aliases
const BODY_NAME_PAIRS: &[(Body, &str)] = &[
    (Body::Mercury, "MERCURY"),
    (Body::Venus, "VENUS"),
    (Body::Earth, "EARTH"),
    (Body::Mars, "MARS"),
    (Body::Jupiter, "JUPITER"),
    (Body::Saturn, "SATURN"),
    (Body::Uranus, "URANUS"),
    (Body::Neptune, "NEPTUNE"),
    (Body::Pluto, "PLUTO"),
    (Body::Moon, "MOON"),
    (Body::Sun, "SUN"),
    (Body::SolarSystemBarycenter, "SSBARY"),
    (Body::SolarSystemBarycenter, "SSB"),
    (Body::SolarSystemBarycenter, "SOLAR_SYSTEM_BARYCENTER"),
    (Body::SolarSystemBarycenter, "SOLAR SYSTEM BARYCENTER"),
    (Body::EarthMoonBarycenter, "EMBARY"),
    (Body::EarthMoonBarycenter, "EMB"),
    (Body::EarthMoonBarycenter, "EARTH_MOON_BARYCENTER"),
    (Body::EarthMoonBarycenter, "EARTH MOON BARYCENTER"),
    (Body::EarthMoonBarycenter, "EARTH-MOON BARYCENTER"),
];

/// Pairs of (item, name) including common aliases
const ITEM_NAME_PAIRS: &[(Item, &str)] = &[
    (Item::Mercury, "MERCURY"),
    (Item::Venus, "VENUS"),
    (Item::EarthMoonBarycenter, "EMBARY"),
    (Item::EarthMoonBarycenter, "EMB"),
    (Item::Mars, "MARS"),
    (Item::Jupiter, "JUPITER"),
    (Item::Saturn, "SATURN"),
    (Item::Uranus, "URANUS"),
    (Item::Neptune, "NEPTUNE"),
    (Item::Pluto, "PLUTO"),
    (Item::Moon, "MOON"),
    (Item::Sun, "SUN"),
    (Item::Nutations, "NUTATIONS"),
    (Item::Nutations, "NUTATION"),
    (Item::Librations, "LIBRATIONS"),
    (Item::Librations, "LIBRATION"),
    (Item::LunarAngularVelocity, "LUNAR_ANGULAR_VELOCITY"),
    (Item::LunarAngularVelocity, "LUNAR ANGULAR VELOCITY"),
    (Item::TtMinusTdb, "TT-TDB"),
    (Item::TtMinusTdb, "TT_TDB"),
];

impl TryFrom<i32> for Body {
    type Error = QueryError;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Body::ALL
            .iter()
            .copied()
            .find(|body| body.code() == code)
            .ok_or(QueryError::InvalidIndex {
                kind: "body",
                index: i64::from(code),
            })
    }
}

impl TryFrom<i32> for Item {
    type Error = QueryError;

    fn try_from(index: i32) -> Result<Self, Self::Error> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Item::ALL.get(i).copied())
            .ok_or(QueryError::InvalidIndex {
                kind: "item",
                index: i64::from(index),
            })
    }
}

impl FromStr for Body {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Body::from_name(s).ok_or_else(|| format!("unknown body name: {s}"))
    }
}

impl FromStr for Item {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Item::from_name(s).ok_or_else(|| format!("unknown item name: {s}"))
    }
}

impl fmt::Display for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
