//! Deterministic RNG wrapper and seed-derivation helpers.

use std::f64::consts::TAU;
use std::hash::Hasher;

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use siphasher::sip::SipHasher13;

/// Deterministic RNG handle used for sampling noise and synthetic pairs.
///
/// A thin wrapper around `StdRng`. A master `seed: u64` must be provided by
/// the caller. Substreams are derived by hashing `(master_seed, substream_id)`
/// with SipHash-1-3 configured with fixed zero keys, so independent consumers
/// (pair sampling, encoder noise, reparameterisation) never share a stream.
#[derive(Debug, Clone)]
pub struct RngHandle {
    rng: StdRng,
}

impl RngHandle {
    /// Creates a new RNG handle from a master seed.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Creates a handle for the given substream of `master_seed`.
    pub fn substream(master_seed: u64, substream: u64) -> Self {
        Self::from_seed(derive_substream_seed(master_seed, substream))
    }

    /// Returns a mutable reference to the underlying RNG for advanced usage.
    pub fn inner_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Draws one sample from `N(0, 1)` using the Box-Muller transform.
    pub fn standard_normal(&mut self) -> f64 {
        // 1 - U keeps the radius argument inside (0, 1].
        let u1: f64 = 1.0 - self.rng.gen::<f64>();
        let u2: f64 = self.rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
    }

    /// Fills a `[rows, cols]` matrix with independent `N(0, 1)` draws in
    /// row-major order.
    pub fn normal_matrix(&mut self, rows: usize, cols: usize) -> DMatrix<f64> {
        let mut values = Vec::with_capacity(rows * cols);
        for _ in 0..rows * cols {
            values.push(self.standard_normal());
        }
        DMatrix::from_row_slice(rows, cols, &values)
    }
}

impl RngCore for RngHandle {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

/// Derives the deterministic seed for a specific substream.
pub fn derive_substream_seed(master_seed: u64, substream: u64) -> u64 {
    let mut hasher = SipHasher13::new_with_keys(0, 0);
    hasher.write_u64(master_seed);
    hasher.write_u64(substream);
    hasher.finish()
}
