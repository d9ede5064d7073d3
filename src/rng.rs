/*!
A seedable pseudo-random generator with the handful of draws the samplers need.

Every estimator and inferencer owns one [`DiscreteRng`]. Given the same seed and the
same sequence of calls it reproduces the same stream bit for bit, on every platform,
because it is backed by an explicitly named generator (`Xoshiro256PlusPlus`) rather
than by `SmallRng`, whose algorithm is allowed to change between `rand` releases.

# Examples

```rust
use topic_mcmc::rng::DiscreteRng;

let mut rng = DiscreteRng::seed_from_u64(42);
let topic = rng.next_int(10);
assert!(topic < 10);

let weights = [0.0, 2.0, 0.0];
assert_eq!(rng.next_discrete(&weights, 2.0), 1);
```
*/

use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscreteRng {
    /// Seed the generator was created from.
    pub seed: u64,
    inner: Xoshiro256PlusPlus,
}

impl DiscreteRng {
    pub fn seed_from_u64(seed: u64) -> Self {
        Self {
            seed,
            inner: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }

    /// Uniform integer in `[0, bound)`.
    ///
    /// Panics if `bound` is zero.
    pub fn next_int(&mut self, bound: usize) -> usize {
        assert!(bound > 0, "next_int called with an empty range");
        self.inner.gen_range(0..bound)
    }

    /// Uniform double in `[0, 1)`.
    pub fn next_double(&mut self) -> f64 {
        self.inner.gen::<f64>()
    }

    /**
    Draws an index from the unnormalized `weights`, whose total is `sum`.

    A single uniform `u` in `[0, sum)` is drawn and the first positive-weight index
    whose cumulative weight reaches `u` is returned, so a zero-weight index is never
    chosen. If rounding leaves `u` above the accumulated total, the last index with
    positive weight is returned.

    The caller guarantees `sum > 0`; Dirichlet pseudo-counts make that true for every
    conditional built by the samplers.
    */
    pub fn next_discrete(&mut self, weights: &[f64], sum: f64) -> usize {
        assert!(
            sum > 0.0 && sum.is_finite(),
            "next_discrete needs a positive finite total, got {sum}"
        );
        let u = self.next_double() * sum;
        select(weights, u)
    }

    /// A uniformly random permutation of `0..n`.
    pub fn permutation(&mut self, n: usize) -> Vec<usize> {
        let mut perm: Vec<usize> = (0..n).collect();
        perm.shuffle(&mut self.inner);
        perm
    }
}

fn select(weights: &[f64], u: f64) -> usize {
    let mut cumulative = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        cumulative += w;
        if w > 0.0 && cumulative >= u {
            return i;
        }
    }
    weights
        .iter()
        .rposition(|&w| w > 0.0)
        .unwrap_or(weights.len() - 1)
}

impl RngCore for DiscreteRng {
    fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.inner.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.inner.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.inner.try_fill_bytes(dest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = DiscreteRng::seed_from_u64(7);
        let mut b = DiscreteRng::seed_from_u64(7);
        for _ in 0..100 {
            assert_eq!(a.next_int(13), b.next_int(13));
            assert_eq!(a.next_double().to_bits(), b.next_double().to_bits());
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let mut a = DiscreteRng::seed_from_u64(1);
        let mut b = DiscreteRng::seed_from_u64(2);
        let xs: Vec<usize> = (0..32).map(|_| a.next_int(1000)).collect();
        let ys: Vec<usize> = (0..32).map(|_| b.next_int(1000)).collect();
        assert_ne!(xs, ys);
    }

    #[test]
    fn test_next_int_in_range() {
        let mut rng = DiscreteRng::seed_from_u64(3);
        for bound in 1..50 {
            for _ in 0..20 {
                assert!(rng.next_int(bound) < bound);
            }
        }
    }

    #[test]
    fn test_next_double_unit_interval() {
        let mut rng = DiscreteRng::seed_from_u64(4);
        for _ in 0..1000 {
            let u = rng.next_double();
            assert!((0.0..1.0).contains(&u), "Got {u}");
        }
    }

    #[test]
    fn test_next_discrete_skips_zero_weights() {
        let mut rng = DiscreteRng::seed_from_u64(5);
        let weights = [0.0, 0.0, 3.5, 0.0];
        for _ in 0..200 {
            assert_eq!(rng.next_discrete(&weights, 3.5), 2);
        }
    }

    #[test]
    fn test_next_discrete_frequencies() {
        let mut rng = DiscreteRng::seed_from_u64(6);
        let weights = [1.0, 3.0];
        let n = 40_000;
        let ones = (0..n).filter(|_| rng.next_discrete(&weights, 4.0) == 1).count();
        let freq = ones as f64 / n as f64;
        assert!((freq - 0.75).abs() < 0.01, "Empirical frequency {freq}");
    }

    #[test]
    fn test_next_discrete_overshooting_sum_falls_back() {
        // A sum larger than the weights forces u past the cumulative total now and then.
        let mut rng = DiscreteRng::seed_from_u64(8);
        let weights = [1.0, 1.0, 0.0];
        for _ in 0..200 {
            assert!(rng.next_discrete(&weights, 10.0) < 2);
        }
    }

    #[test]
    fn test_select_zero_draw_skips_zero_weight_prefix() {
        assert_eq!(select(&[0.0, 0.0, 2.0], 0.0), 2);
        assert_eq!(select(&[0.0, 1.0, 0.0, 1.0], 0.0), 1);
    }

    #[test]
    fn test_select_boundary_goes_to_earlier_index() {
        assert_eq!(select(&[1.0, 1.0], 1.0), 0);
        assert_eq!(select(&[1.0, 1.0], 1.5), 1);
        assert_eq!(select(&[1.0, 0.0, 1.0], 1.0), 0);
        assert_eq!(select(&[1.0, 0.0, 1.0], 1.25), 2);
    }

    #[test]
    fn test_select_past_total_returns_last_positive() {
        assert_eq!(select(&[1.0, 2.0, 0.0], 3.5), 1);
    }

    #[test]
    #[should_panic]
    fn test_next_discrete_rejects_zero_sum() {
        let mut rng = DiscreteRng::seed_from_u64(9);
        rng.next_discrete(&[0.0, 0.0], 0.0);
    }

    #[test]
    fn test_permutation_is_permutation() {
        let mut rng = DiscreteRng::seed_from_u64(10);
        let mut perm = rng.permutation(57);
        perm.sort_unstable();
        assert_eq!(perm, (0..57).collect::<Vec<_>>());
    }
}
