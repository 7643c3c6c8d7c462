use rand::RngCore;

/// Replacement state for a zero seed; xorshift maps 0 to 0 forever.
const ZERO_SEED_REPLACEMENT: u32 = 0x6D2B_79F5;

/// Golden-ratio increment used to separate per-index streams.
const STREAM_SALT: u32 = 0x9E37_79B9;

/// One step of Marsaglia's 13/17/5 xorshift.
#[inline]
pub fn xorshift32(mut x: u32) -> u32 {
    x ^= x << 13;
    x ^= x >> 17;
    x ^= x << 5;
    x
}

/// Integer avalanche hash (lowbias32).
#[inline]
pub fn hash_u32(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7FEB_352D);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846C_A68B);
    x ^= x >> 16;
    x
}

/// Maps the low 23 bits of `bits` onto `[0, 1)` through the float mantissa.
#[inline]
pub fn unit_f32(bits: u32) -> f32 {
    const MANTISSA: u32 = 0x007F_FFFF;
    const ONE: u32 = 0x3F80_0000;
    f32::from_bits((bits & MANTISSA) | ONE) - 1.0
}

/// Independent generator for invocation `index` under `seed`.
#[inline]
pub fn stream(seed: u32, index: u32) -> Xorshift32 {
    Xorshift32::new(hash_u32(seed ^ hash_u32(index.wrapping_add(STREAM_SALT))))
}

/// Xorshift32 generator.
///
/// Implements [`rand::RngCore`] so the `rand::Rng` helpers work on top of it,
/// while the raw `next_u32`/`next_f32` sequence stays identical to the GPU side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Xorshift32 {
    state: u32,
}

impl Xorshift32 {
    pub fn new(seed: u32) -> Self {
        let state = if seed == 0 { ZERO_SEED_REPLACEMENT } else { seed };
        Self { state }
    }

    /// Current internal state.
    pub fn state(&self) -> u32 {
        self.state
    }

    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.state = xorshift32(self.state);
        self.state
    }

    /// Uniform float in `[0, 1)`.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        unit_f32(self.next_u32())
    }

    /// Uniform float in `[lo, hi)`.
    #[inline]
    pub fn range(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }
}

impl RngCore for Xorshift32 {
    fn next_u32(&mut self) -> u32 {
        Xorshift32::next_u32(self)
    }

    fn next_u64(&mut self) -> u64 {
        rand::rand_core::impls::next_u64_via_u32(self)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        rand::rand_core::impls::fill_bytes_via_next(self, dst)
    }
}
