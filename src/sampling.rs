use rand::Rng;

use crate::error::{ReinforceError, Result};

/// Draw an index with probability proportional to `weights`.
///
/// Weights are expected to sum to one; zero-weight entries are never chosen.
/// A draw that falls past the cumulative sum is a malformed distribution and
/// fails with `SamplingExhausted`.
pub fn sample_weighted<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Result<usize> {
    let r: f64 = rng.gen();
    let mut c = 0.0;
    for (i, &w) in weights.iter().enumerate() {
        c += w;
        if w > 0.0 && c >= r {
            return Ok(i);
        }
    }
    Err(ReinforceError::SamplingExhausted { total: c, draw: r })
}

/// Index of the largest value; ties go to the first occurrence.
/// Returns `None` for an empty slice.
pub fn argmax(values: &[f64]) -> Option<usize> {
    let mut iter = values.iter().enumerate();
    let (mut best, mut best_value) = match iter.next() {
        Some((i, &v)) => (i, v),
        None => return None,
    };
    for (i, &v) in iter {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    Some(best)
}

/// Uniformly random index in `0..n`.
pub fn random_index<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Result<usize> {
    if n == 0 {
        return Err(ReinforceError::OutOfRange { index: 0, len: 0 });
    }
    Ok(rng.gen_range(0..n))
}
