//! Explicit, splittable random number state.
//!
//! Randomness is never drawn from a hidden global generator. Every function
//! that needs random numbers takes an [`RngKey`] by value and hands back a
//! fresh one. Because keys are neither `Copy` nor `Clone`, the compiler
//! rejects any attempt to consume the same key twice.

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::integrator::Direction;

const SPLIT_STREAM: u64 = 0;
const DRAW_STREAM: u64 = 1;

/// A single-use token for a reproducible random stream.
#[derive(Debug, PartialEq, Eq)]
pub struct RngKey {
    seed: [u8; 32],
}

impl RngKey {
    /// Create the root key of a chain from an integer seed.
    pub fn new(seed: u64) -> RngKey {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        RngKey { seed }
    }

    /// Split the key into two independent children.
    ///
    /// By convention the first child is carried forward and the second one
    /// is consumed by a single draw.
    pub fn split(self) -> (RngKey, RngKey) {
        let mut rng = self.stream(SPLIT_STREAM);
        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        rng.fill_bytes(&mut first);
        rng.fill_bytes(&mut second);
        (RngKey { seed: first }, RngKey { seed: second })
    }

    /// Draw from `U[0, 1)`.
    pub fn uniform(self) -> f64 {
        self.stream(DRAW_STREAM).random::<f64>()
    }

    /// Draw a vector of independent standard normal values.
    pub fn standard_normal(self, dim: usize) -> Box<[f64]> {
        let mut rng = self.stream(DRAW_STREAM);
        (0..dim).map(|_| StandardNormal.sample(&mut rng)).collect()
    }

    /// Draw a trajectory direction, both directions being equally likely.
    pub fn direction(self) -> Direction {
        self.stream(DRAW_STREAM).random()
    }

    fn stream(self, stream: u64) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::from_seed(self.seed);
        rng.set_stream(stream);
        rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    #[test]
    fn deterministic() {
        assert_eq!(RngKey::new(42), RngKey::new(42));
        assert_ne!(RngKey::new(42), RngKey::new(43));

        let (a1, b1) = RngKey::new(7).split();
        let (a2, b2) = RngKey::new(7).split();
        assert_eq!(a1, a2);
        assert_eq!(b1.uniform(), b2.uniform());
    }

    #[test]
    fn split_children_differ() {
        let (a, b) = RngKey::new(1).split();
        assert_ne!(a, b);

        let (a, b) = RngKey::new(1).split();
        assert_ne!(a.uniform(), b.uniform());
    }

    #[test]
    fn draws() {
        let mut key = RngKey::new(3);
        let mut forward = 0;
        for _ in 0..1000 {
            let (next, sub) = key.split();
            key = next;
            let u = {
                let (next, sub) = sub.split();
                if let Direction::Forward = next.direction() {
                    forward += 1;
                }
                sub.uniform()
            };
            assert!((0. ..1.).contains(&u));
        }
        assert!((400..600).contains(&forward));

        let values = key.standard_normal(5000);
        assert_eq!(values.len(), 5000);
        let mean = values.iter().sum::<f64>() / 5000.;
        assert!(mean.abs() < 0.1);
    }
}
