//! Seedable simulation RNG.
//!
//! A single `SimRng` lives in the composition root and serves spawn-point
//! sampling and server-minted id suffixes.  Seeding it explicitly makes
//! spawn-placement tests reproducible; production seeds from entropy.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Simulation-level RNG for global operations (spawn sampling, id minting).
///
/// Used only on the simulation task — never shared across threads.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        SimRng(SmallRng::from_entropy())
    }

    #[inline]
    pub fn inner(&mut self) -> &mut SmallRng {
        &mut self.0
    }

    /// Uniform value in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// Uniform `f64` in `[0, 1)`.
    #[inline]
    pub fn unit(&mut self) -> f64 {
        self.0.r#gen::<f64>()
    }

    /// A lowercase base-36 suffix of `len` characters for minted ids
    /// (`agent-x7k2m9`, `battle-q04fnd`).
    pub fn id_suffix(&mut self, len: usize) -> String {
        const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
        (0..len)
            .map(|_| ALPHABET[self.0.gen_range(0..ALPHABET.len())] as char)
            .collect()
    }
}
