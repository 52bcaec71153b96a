//! Seeded random sampling of aggregated rows.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index;
use tracing::{info, warn};

use crate::error::{AnalysisError, AnalysisResult};

/// Number of rows a `fraction` sample of `population` rows holds.
///
/// Exact halves round to the even neighbour, so 2.5 rows gives 2.
pub fn sample_size(population: usize, fraction: f64) -> usize {
    (fraction * population as f64).round_ties_even() as usize
}

/// Simple random sample without replacement of `round(fraction * len)` items.
///
/// The same `seed` and input always yield the same sample, in the same order.
pub fn sample_fraction<T: Clone>(items: &[T], fraction: f64, seed: u64) -> AnalysisResult<Vec<T>> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(AnalysisError::InvalidFraction(fraction));
    }

    let amount = sample_size(items.len(), fraction);
    let mut rng = StdRng::seed_from_u64(seed);
    let sample: Vec<T> = index::sample(&mut rng, items.len(), amount)
        .into_iter()
        .map(|i| items[i].clone())
        .collect();

    if sample.is_empty() {
        warn!(population = items.len(), fraction, "sample is empty");
    } else {
        info!(population = items.len(), sampled = sample.len(), seed, "drew random sample");
    }
    Ok(sample)
}
