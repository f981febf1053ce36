//! Seed hashing and the Mulberry32 stream.
//!
//! Both operate on wrapping 32-bit arithmetic. The seed hash walks UTF-16
//! code units so a seed string hashes the same way as it does in browser
//! tooling that inspects rounds.

/// Hash a seed string into a 32-bit PRNG state.
///
/// FNV offset basis with a shift-add mixing step per UTF-16 unit.
pub fn hash_seed(seed: &str) -> u32 {
    let mut h: u32 = 2_166_136_261;
    for unit in seed.encode_utf16() {
        h ^= unit as u32;
        h = h
            .wrapping_add(h << 1)
            .wrapping_add(h << 4)
            .wrapping_add(h << 7)
            .wrapping_add(h << 8)
            .wrapping_add(h << 24);
    }
    h
}

/// Mulberry32: a small, fast 32-bit generator.
#[derive(Debug, Clone)]
pub struct Mulberry32 {
    state: u32,
}

impl Mulberry32 {
    pub const fn new(state: u32) -> Self {
        Self { state }
    }

    /// Generator seeded from a seed string.
    pub fn from_seed_str(seed: &str) -> Self {
        Self::new(hash_seed(seed))
    }

    /// Next raw 32-bit output.
    pub fn next_u32(&mut self) -> u32 {
        self.state = self.state.wrapping_add(0x6D2B_79F5);
        let mut t = self.state;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        t ^ (t >> 14)
    }

    /// Next float in [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.next_u32() as f64 / 4_294_967_296.0
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn index(&mut self, len: usize) -> usize {
        (self.next_f64() * len as f64).floor() as usize
    }
}
