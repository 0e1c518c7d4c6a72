//! Synthetic DE file writer shared by the integration tests
//!
//! Model files store exact Chebyshev expansions of a known quadratic per
//! item component, so every expected value below is analytic.

#![allow(dead_code)]

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use jplde::block::block_offset;
use jplde::names::ITEM_COUNT;
use jplde::{Body, Item};

pub const BEGIN_JED: f64 = 2451536.5;
pub const BLOCK_SPAN: f64 = 32.0;
pub const AU: f64 = 149597870.7;
pub const EMRAT: f64 = 81.30056;
pub const DE_INDEX: i32 = 999;
pub const SECONDS_PER_DAY: f64 = 86400.0;

/// `a + b*u + c*u^2` with `u` in days since [`BEGIN_JED`]
#[derive(Clone, Copy, Debug)]
pub struct Quadratic {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Quadratic {
    pub fn value(&self, u: f64) -> f64 {
        self.a + self.b * u + self.c * u * u
    }

    /// Rate per day
    pub fn rate(&self, u: f64) -> f64 {
        self.b + 2.0 * self.c * u
    }
}

/// The function stored for one component of one item
pub fn model(item: Item, component: usize) -> Quadratic {
    let i = item.index() as f64 + 1.0;
    let k = component as f64;
    Quadratic {
        a: 1.0e5 * i - 2.5e4 * k,
        b: 10.0 * i - 3.0 * k,
        c: 1.0e-3 * i * (k + 1.0),
    }
}

/// Analytic values of `item` at `jed`
pub fn item_values(item: Item, jed: f64) -> Vec<f64> {
    (0..item.component_count())
        .map(|k| model(item, k).value(jed - BEGIN_JED))
        .collect()
}

/// Analytic rates of `item` at `jed`, per second
pub fn item_rates(item: Item, jed: f64) -> Vec<f64> {
    (0..item.component_count())
        .map(|k| model(item, k).rate(jed - BEGIN_JED) / SECONDS_PER_DAY)
        .collect()
}

/// Analytic state of `body` relative to the solar system barycenter
pub fn barycentric(body: Body, jed: f64, rates: bool) -> Vec<f64> {
    let eval = |item: Item| {
        if rates {
            item_rates(item, jed)
        } else {
            item_values(item, jed)
        }
    };
    match body {
        Body::SolarSystemBarycenter => vec![0.0; 3],
        Body::Earth | Body::Moon => {
            let emb = eval(Item::EarthMoonBarycenter);
            let moon = eval(Item::Moon);
            let factor = if body == Body::Earth {
                -1.0 / (1.0 + EMRAT)
            } else {
                EMRAT / (1.0 + EMRAT)
            };
            emb.iter().zip(&moon).map(|(e, m)| e + m * factor).collect()
        }
        _ => eval(body.barycentric_item().unwrap()),
    }
}

/// Coefficients written into each block
#[derive(Clone, Debug)]
pub enum Coefficients {
    /// Expansions of [`model`]
    Model,
    /// Whole blocks, dates included
    Explicit(Vec<Vec<f64>>),
}

/// Builder for synthetic DE files
#[derive(Clone, Debug)]
pub struct DeBuilder {
    pub label: [String; 3],
    pub index: i32,
    pub begin_jed: f64,
    pub end_jed: f64,
    pub block_span: f64,
    pub au: f64,
    pub emrat: f64,
    /// (coefficients per component, subintervals) per item; (0, 0) is absent
    pub shapes: [(usize, usize); ITEM_COUNT],
    /// Raw key triples replacing the computed layout
    pub key_overrides: Vec<(usize, [i32; 3])>,
    pub constants: Vec<(String, f64)>,
    pub constant_count_override: Option<i32>,
    pub date_overrides: Vec<(usize, f64, f64)>,
    pub coefficients: Coefficients,
    pub big_endian: bool,
    /// Write only the first and the last block and extend the file sparsely
    pub sparse: bool,
}

impl DeBuilder {
    /// Every item stored with 6 coefficients over 2 subintervals, 4 blocks
    pub fn new() -> Self {
        Self {
            label: [
                format!("JPL TEST EPHEMERIS DE{}", DE_INDEX),
                format!("Start Epoch: JED= {:.1}", BEGIN_JED),
                format!("Final Epoch: JED= {:.1}", BEGIN_JED + 4.0 * BLOCK_SPAN),
            ],
            index: DE_INDEX,
            begin_jed: BEGIN_JED,
            end_jed: BEGIN_JED + 4.0 * BLOCK_SPAN,
            block_span: BLOCK_SPAN,
            au: AU,
            emrat: EMRAT,
            shapes: [(6, 2); ITEM_COUNT],
            key_overrides: Vec::new(),
            constants: vec![
                ("DENUM".to_string(), f64::from(DE_INDEX)),
                ("AU".to_string(), AU),
                ("EMRAT".to_string(), EMRAT),
                ("GMS".to_string(), 2.959122082855911e-4),
            ],
            constant_count_override: None,
            date_overrides: Vec::new(),
            coefficients: Coefficients::Model,
            big_endian: false,
            sparse: false,
        }
    }

    /// The one-block, Mercury-only file: x = 10 + 2t, y = 5 + t, z = 0
    pub fn single_mercury() -> Self {
        let mut shapes = [(0, 0); ITEM_COUNT];
        shapes[Item::Mercury.index()] = (2, 1);
        Self {
            label: Default::default(),
            begin_jed: 0.0,
            end_jed: 32.0,
            block_span: 32.0,
            shapes,
            constants: Vec::new(),
            coefficients: Coefficients::Explicit(vec![vec![
                0.0, 32.0, 10.0, 2.0, 5.0, 1.0, 0.0, 0.0,
            ]]),
            ..Self::new()
        }
    }

    pub fn blocks(mut self, count: usize) -> Self {
        self.end_jed = self.begin_jed + count as f64 * self.block_span;
        self
    }

    pub fn without(mut self, item: Item) -> Self {
        self.shapes[item.index()] = (0, 0);
        self
    }

    pub fn big_endian(mut self) -> Self {
        self.big_endian = true;
        self
    }

    /// Key triples in file order
    pub fn keys(&self) -> [[i32; 3]; ITEM_COUNT] {
        let mut keys = [[0i32; 3]; ITEM_COUNT];
        let mut offset = 3;
        for (item, ((cpec, span), key)) in Item::ALL
            .iter()
            .zip(self.shapes.iter().zip(keys.iter_mut()))
        {
            if *cpec == 0 && *span == 0 {
                continue;
            }
            *key = [offset as i32, *cpec as i32, *span as i32];
            offset += item.component_count() * cpec * span;
        }
        for (index, key) in &self.key_overrides {
            keys[*index] = *key;
        }
        keys
    }

    /// Doubles per block for the current keys
    pub fn ncoeff(&self) -> usize {
        Item::ALL
            .iter()
            .zip(self.keys().iter())
            .map(|(item, key)| {
                item.component_count() * key[1].max(0) as usize * key[2].max(0) as usize
            })
            .sum::<usize>()
            + 2
    }

    pub fn block_count(&self) -> usize {
        if self.block_span > 0.0 {
            ((self.end_jed - self.begin_jed) / self.block_span).floor() as usize
        } else {
            0
        }
    }

    fn header_bytes(&self) -> Vec<u8> {
        let mut out = Encoder::new(self.big_endian);
        for line in &self.label {
            out.text(line, 84);
        }

        let names: Vec<&str> = self.constants.iter().map(|(n, _)| n.as_str()).collect();
        for slot in 0..400 {
            out.text(names.get(slot).copied().unwrap_or(""), 6);
        }

        out.f64(self.begin_jed);
        out.f64(self.end_jed);
        out.f64(self.block_span);
        out.i32(
            self.constant_count_override
                .unwrap_or(self.constants.len() as i32),
        );
        out.f64(self.au);
        out.f64(self.emrat);

        let keys = self.keys();
        for key in &keys[..12] {
            key.iter().for_each(|v| out.i32(*v));
        }
        out.i32(self.index);
        keys[12].iter().for_each(|v| out.i32(*v));
        for name in names.iter().skip(400) {
            out.text(name, 6);
        }
        for key in &keys[13..] {
            key.iter().for_each(|v| out.i32(*v));
        }
        out.bytes
    }

    fn block(&self, block_index: usize, ncoeff: usize) -> Vec<f64> {
        let mut values = match &self.coefficients {
            Coefficients::Explicit(blocks) => blocks[block_index].clone(),
            Coefficients::Model => self.model_block(block_index, ncoeff),
        };
        for (index, start, end) in &self.date_overrides {
            if *index == block_index {
                values[0] = *start;
                values[1] = *end;
            }
        }
        values
    }

    fn model_block(&self, block_index: usize, ncoeff: usize) -> Vec<f64> {
        let start = self.begin_jed + block_index as f64 * self.block_span;
        let mut values = vec![0.0; ncoeff];
        values[0] = start;
        values[1] = start + self.block_span;

        for (item, key) in Item::ALL.iter().zip(self.keys().iter()) {
            let [offset, cpec, span] = *key;
            if offset < 3 || cpec <= 0 || span <= 0 {
                continue;
            }
            let (offset, cpec, span) = (offset as usize, cpec as usize, span as usize);
            let components = item.component_count();
            let width = self.block_span / span as f64;
            let h = width / 2.0;

            for sub in 0..span {
                let um = start + (sub as f64 + 0.5) * width - BEGIN_JED;
                for k in 0..components {
                    let q = model(*item, k);
                    let base = offset - 1 + (components * sub + k) * cpec;
                    let terms = [
                        q.a + q.b * um + q.c * um * um + q.c * h * h / 2.0,
                        q.b * h + 2.0 * q.c * um * h,
                        q.c * h * h / 2.0,
                    ];
                    for (n, term) in terms.iter().enumerate().take(cpec) {
                        if let Some(slot) = values.get_mut(base + n) {
                            *slot = *term;
                        }
                    }
                }
            }
        }
        values
    }

    /// Write the file to `path`
    pub fn write(&self, path: &Path) {
        let ncoeff = self.ncoeff();
        let block_count = self.block_count();
        let mut file = File::create(path).unwrap();

        file.write_all(&self.header_bytes()).unwrap();

        if !self.constants.is_empty() {
            let mut out = Encoder::new(self.big_endian);
            self.constants.iter().for_each(|(_, v)| out.f64(*v));
            file.seek(SeekFrom::Start(ncoeff as u64 * 8)).unwrap();
            file.write_all(&out.bytes).unwrap();
        }

        let indices: Vec<usize> = if self.sparse {
            vec![0, block_count - 1]
        } else {
            (0..block_count).collect()
        };
        for block_index in indices {
            let mut out = Encoder::new(self.big_endian);
            self.block(block_index, ncoeff)
                .iter()
                .for_each(|v| out.f64(*v));
            let offset = block_offset(block_index, ncoeff).unwrap();
            file.seek(SeekFrom::Start(offset)).unwrap();
            file.write_all(&out.bytes).unwrap();
        }

        let total = block_offset(block_count, ncoeff).unwrap();
        if file.metadata().unwrap().len() < total {
            file.set_len(total).unwrap();
        }
    }
}

struct Encoder {
    big_endian: bool,
    bytes: Vec<u8>,
}

impl Encoder {
    fn new(big_endian: bool) -> Self {
        Self {
            big_endian,
            bytes: Vec::new(),
        }
    }

    fn f64(&mut self, value: f64) {
        if self.big_endian {
            self.bytes.write_f64::<BigEndian>(value).unwrap();
        } else {
            self.bytes.write_f64::<LittleEndian>(value).unwrap();
        }
    }

    fn i32(&mut self, value: i32) {
        if self.big_endian {
            self.bytes.write_i32::<BigEndian>(value).unwrap();
        } else {
            self.bytes.write_i32::<LittleEndian>(value).unwrap();
        }
    }

    fn text(&mut self, text: &str, width: usize) {
        let mut field = text.as_bytes().to_vec();
        field.resize(width, b' ');
        self.bytes.extend_from_slice(&field[..width]);
    }
}
