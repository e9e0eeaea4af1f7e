//! Seedable pseudo-random sources for the simulated analysis pipeline.

/// A source of pseudo-random numbers.
///
/// Implementors supply [`RandomSource::next_u64`]; the remaining helpers are
/// derived from it so that any deterministic sequence can drive the simulators.
pub trait RandomSource {
    /// Return the next raw 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Uniform float in `[0, 1)`.
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform integer in the inclusive range `[low, high]`.
    ///
    /// Returns `low` when the range is empty.
    fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        if high <= low {
            return low;
        }
        let span = high - low;
        if span == u64::MAX {
            return self.next_u64();
        }
        low + self.next_u64() % (span + 1)
    }

    /// Uniform signed integer in the inclusive range `[low, high]`.
    fn range_i64(&mut self, low: i64, high: i64) -> i64 {
        if high <= low {
            return low;
        }
        let span = high.abs_diff(low);
        let offset = self.range_u64(0, span);
        low.wrapping_add(offset as i64)
    }

    /// Uniform float in `[low, high)`.
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    /// True with the given probability.
    fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }

    /// Pick a uniformly random index below `len`, or `None` when `len` is zero.
    fn index(&mut self, len: usize) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(self.range_u64(0, len as u64 - 1) as usize)
    }

    /// Pick an index with probability proportional to its weight.
    ///
    /// Non-positive weights are never selected; `None` when every weight is.
    fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().filter(|weight| **weight > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let mut target = self.uniform(0.0, total);
        let mut last = None;
        for (position, weight) in weights.iter().enumerate() {
            if *weight <= 0.0 {
                continue;
            }
            if target < *weight {
                return Some(position);
            }
            target -= weight;
            last = Some(position);
        }
        last
    }
}

/// Pick a uniformly random element of a slice.
pub fn choose<'a, T, R: RandomSource + ?Sized>(rng: &mut R, items: &'a [T]) -> Option<&'a T> {
    rng.index(items.len()).map(|position| &items[position])
}

impl<R: RandomSource + ?Sized> RandomSource for &mut R {
    fn next_u64(&mut self) -> u64 {
        (**self).next_u64()
    }
}

/// Deterministic xorshift64 generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xorshift64 {
    state: u64,
}

impl Xorshift64 {
    /// Create a generator; a zero seed is replaced with one.
    pub fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    /// Create a generator seeded from a fresh random UUID.
    pub fn from_entropy() -> Self {
        let (high, low) = uuid::Uuid::new_v4().as_u64_pair();
        Self::new(high ^ low)
    }
}

impl RandomSource for Xorshift64 {
    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::RandomSource;

    /// Replays a fixed list of raw values, cycling when exhausted.
    pub(crate) struct ScriptedSource {
        values: Vec<u64>,
        position: usize,
    }

    impl ScriptedSource {
        pub(crate) fn new(values: Vec<u64>) -> Self {
            Self {
                values,
                position: 0,
            }
        }
    }

    impl RandomSource for ScriptedSource {
        fn next_u64(&mut self) -> u64 {
            let value = self.values[self.position % self.values.len()];
            self.position += 1;
            value
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedSource;
    use super::{RandomSource, Xorshift64, choose};

    #[test]
    fn zero_seed_is_coerced() {
        let mut rng = Xorshift64::new(0);
        assert_ne!(rng.next_u64(), 0);
        assert_eq!(Xorshift64::new(0), Xorshift64::new(1));
    }

    #[test]
    fn same_seed_replays_sequence() {
        let mut first = Xorshift64::new(42);
        let mut second = Xorshift64::new(42);
        for _ in 0..32 {
            assert_eq!(first.next_u64(), second.next_u64());
        }
    }

    #[test]
    fn ranges_stay_within_bounds() {
        let mut rng = Xorshift64::new(7);
        for _ in 0..1_000 {
            let value = rng.range_u64(10, 50);
            assert!((10..=50).contains(&value));
            let signed = rng.range_i64(-50, 200);
            assert!((-50..=200).contains(&signed));
            let float = rng.uniform(2.5, 45.0);
            assert!((2.5..45.0).contains(&float));
        }
        assert_eq!(rng.range_u64(9, 3), 9);
    }

    #[test]
    fn weighted_index_skips_zero_weights() {
        let mut rng = Xorshift64::new(99);
        for _ in 0..200 {
            let picked = rng.weighted_index(&[0.0, 1.0, 0.0]).expect("index");
            assert_eq!(picked, 1);
        }
        assert_eq!(rng.weighted_index(&[0.0, 0.0]), None);
    }

    #[test]
    fn choose_handles_empty_slices() {
        let mut rng = ScriptedSource::new(vec![3]);
        let empty: [u8; 0] = [];
        assert_eq!(choose(&mut rng, &empty), None);
        assert_eq!(choose(&mut rng, &["a", "b"]), Some(&"b"));
    }

    #[test]
    fn next_f64_is_half_open() {
        let mut low = ScriptedSource::new(vec![0]);
        assert_eq!(low.next_f64(), 0.0);
        let mut high = ScriptedSource::new(vec![u64::MAX]);
        assert!(high.next_f64() < 1.0);
    }
}
