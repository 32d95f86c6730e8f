//! Random audio start offsets.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Pick a uniformly distributed start offset in `[0, min(max_offset, duration))`.
///
/// A zero (or unusable) window yields 0.
pub fn random_offset<R: Rng + ?Sized>(rng: &mut R, duration_secs: f64, max_offset_secs: f64) -> f64 {
    // f64::min ignores NaN, so check the inputs rather than the window
    if !(duration_secs.is_finite() && duration_secs > 0.0) || !(max_offset_secs > 0.0) {
        return 0.0;
    }
    let window = duration_secs.min(max_offset_secs);
    rng.gen::<f64>() * window
}

/// Where offsets get their randomness from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetSource {
    /// Thread-local entropy; not reproducible.
    #[default]
    Entropy,
    /// Pair `i` uses `StdRng::seed_from_u64(seed + i)`.
    Seeded(u64),
}

impl OffsetSource {
    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or(OffsetSource::Entropy, OffsetSource::Seeded)
    }

    /// Offset for the pair at `index`.
    pub fn offset_for(&self, index: usize, duration_secs: f64, max_offset_secs: f64) -> f64 {
        match self {
            OffsetSource::Entropy => {
                random_offset(&mut rand::thread_rng(), duration_secs, max_offset_secs)
            }
            OffsetSource::Seeded(seed) => {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
                random_offset(&mut rng, duration_secs, max_offset_secs)
            }
        }
    }
}
