//! Shared random source
//!
//! Template choice, sampling parameters and every shuffle in a run draw from
//! one generator so a seeded run is reproducible.

use std::sync::{Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

pub struct RandomSource {
    rng: Mutex<StdRng>,
}

impl RandomSource {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        // StdRng state is valid even after a poisoning panic
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn choose<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut *self.rng())
    }

    /// Integer in `low..=high`
    pub fn range_u32(&self, low: u32, high: u32) -> u32 {
        if low >= high {
            return low;
        }
        self.rng().gen_range(low..=high)
    }

    /// Float in `low..high`
    pub fn uniform(&self, low: f32, high: f32) -> f32 {
        if low >= high {
            return low;
        }
        self.rng().gen_range(low..high)
    }

    pub fn shuffle<T>(&self, items: &mut [T]) {
        items.shuffle(&mut *self.rng());
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::from_entropy()
    }
}
