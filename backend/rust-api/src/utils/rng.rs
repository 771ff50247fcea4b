//! Seeded, index-addressable pseudo-random draws.
//!
//! Every draw is a pure function of `(seed, index)`: the SplitMix64 finaliser
//! is applied to `seed + (index + 1) * GOLDEN_GAMMA` (wrapping u64 arithmetic)
//! and the top 53 bits are scaled into `[0, 1)`. Only integer operations are
//! involved before the final division by 2^53, so any runtime with 64-bit
//! unsigned arithmetic reproduces the same sequence bit for bit.

use chrono::NaiveDate;

const GOLDEN_GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;
const UNIT_SCALE: f64 = (1u64 << 53) as f64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeededRandom {
    seed: u64,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Raw 64-bit draw for `index`.
    pub fn draw_u64(&self, index: u64) -> u64 {
        let mut z = self
            .seed
            .wrapping_add(index.wrapping_add(1).wrapping_mul(GOLDEN_GAMMA));
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform draw in `[0, 1)` for `index`.
    pub fn unit(&self, index: u64) -> f64 {
        (self.draw_u64(index) >> 11) as f64 / UNIT_SCALE
    }

    /// Index in `0..len` derived from the draw at `index`. `len` must be non-zero.
    pub fn pick(&self, index: u64, len: usize) -> usize {
        let scaled = (self.unit(index) * len as f64) as usize;
        scaled.min(len - 1)
    }
}

/// Days since 1970-01-01 for `date`; the daily selection seed.
pub fn seed_for_date(date: NaiveDate) -> u64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
    date.signed_duration_since(epoch).num_days().max(0) as u64
}
