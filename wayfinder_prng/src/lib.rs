// Seeded random numbers for reproducible path searches.
//
// `wayfinder_nav` gives every `SearchSession` its own `GameRng`, seeded from
// `SearchConfig::seed`, and shuffles the candidate transitions of each
// expanded node with it so that equal-cost moves are not always tried in the
// same compass order. Tests pin the seed to get identical expansions.
//
// The generator is xoshiro256++ (Blackman & Vigna) with its state expanded
// from a single `u64` by SplitMix64. Bounded integers use Lemire's
// multiply-and-reject method, so nothing here touches floating point except
// `next_f64` itself.
//
// **Critical constraint: determinism.** Output depends only on the seed and
// the sequence of calls: no platform, pointer or clock input ever enters the
// state.

use serde::{Deserialize, Serialize};

/// xoshiro256++ generator. Small enough to own one per search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRng {
    state: [u64; 4],
}

impl GameRng {
    /// Generator whose whole stream is fixed by `seed`.
    pub fn new(seed: u64) -> Self {
        let mut mix = SplitMix64(seed);
        Self {
            state: std::array::from_fn(|_| mix.next_u64()),
        }
    }

    /// Next raw 64-bit output.
    pub fn next_u64(&mut self) -> u64 {
        let [a, b, c, d] = self.state;
        let out = a.wrapping_add(d).rotate_left(23).wrapping_add(a);
        let c = c ^ a;
        let d = d ^ b;
        let b = b ^ c;
        let a = a ^ d;
        self.state = [a, b, c ^ (self.state[1] << 17), d.rotate_left(45)];
        out
    }

    /// Uniform in [0, 1), from the top 53 bits.
    pub fn next_f64(&mut self) -> f64 {
        const SCALE: f64 = 1.0 / (1u64 << 53) as f64;
        (self.next_u64() >> 11) as f64 * SCALE
    }

    /// Uniform in `[0, bound)`. `bound` must be nonzero.
    fn below(&mut self, bound: u64) -> u64 {
        let mut wide = u128::from(self.next_u64()) * u128::from(bound);
        if (wide as u64) < bound {
            let reject_under = bound.wrapping_neg() % bound;
            while (wide as u64) < reject_under {
                wide = u128::from(self.next_u64()) * u128::from(bound);
            }
        }
        (wide >> 64) as u64
    }

    /// Uniform in `[low, high)`. Panics unless `low < high`.
    pub fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        assert!(low < high, "empty range {low}..{high}");
        low + self.below(high - low)
    }

    /// Uniform in `[low, high)`. Panics unless `low < high`.
    pub fn range_usize(&mut self, low: usize, high: usize) -> usize {
        self.range_u64(low as u64, high as u64) as usize
    }

    /// Fisher-Yates shuffle. Slices shorter than two elements draw nothing.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for top in (1..items.len()).rev() {
            let pick = self.below(top as u64 + 1) as usize;
            items.swap(top, pick);
        }
    }
}

/// Seed expander recommended by the xoshiro authors.
struct SplitMix64(u64);

impl SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}
