#[derive(Copy, Clone, Debug)]
pub struct XorShift64 { state: u64 }

impl XorShift64 {
    pub fn new(seed: u64) -> Self { Self { state: seed | 1 } }
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x >> 12; x ^= x << 25; x ^= x >> 27;
        self.state = x;
        ((x.wrapping_mul(2685821657736338717)) >> 32) as u32
    }
    /// Uniform in [0, 1).
    pub fn next_f32(&mut self) -> f32 {
        // 24 mantissa bits keep the result strictly below 1.0
        (self.next_u32() >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
    }
    /// Uniform in [lo, hi).
    pub fn range_f32(&mut self, lo: f32, hi: f32) -> f32 {
        lo + (hi - lo) * self.next_f32()
    }
    pub fn state(&self) -> u64 { self.state }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test] fn range_is_half_open() {
        let mut r = XorShift64::new(0xC0FFEE);
        for _ in 0..10_000 {
            let v = r.range_f32(1.0, 5.0);
            assert!((1.0..5.0).contains(&v), "{v}");
        }
    }

    #[test] fn seeded_sequences_repeat() {
        let mut a = XorShift64::new(7);
        let mut b = XorShift64::new(7);
        for _ in 0..64 { assert_eq!(a.next_u32(), b.next_u32()); }
    }
}
