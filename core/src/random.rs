//! Weighted draws shared by row and item generation.

use rand::Rng;

/// Index returned when a weight table cannot produce a draw.
///
/// Weight tables are ordered like [`crate::PlatformType::ALL`], so the fallback
/// resolves to the empty platform.
pub const FALLBACK_INDEX: usize = 0;

/// Picks one category out of `weights`, proportionally to its weight.
///
/// Non-positive weights are never selected. A table whose positive weights sum
/// to zero yields [`FALLBACK_INDEX`].
pub fn select_weighted<R>(weights: &[f32], rng: &mut R) -> usize
where
    R: Rng + ?Sized,
{
    let total: f32 = weights.iter().copied().filter(|weight| *weight > 0.0).sum();
    if !(total.is_finite() && total > 0.0) {
        log::warn!("weight table sums to {total}; falling back to index {FALLBACK_INDEX}");
        return FALLBACK_INDEX;
    }

    let mut remainder = rng.gen_range(0.0..total);
    let mut last_positive = FALLBACK_INDEX;
    for (index, weight) in weights.iter().copied().enumerate() {
        if weight <= 0.0 {
            continue;
        }
        last_positive = index;
        remainder -= weight;
        if remainder <= 0.0 {
            return index;
        }
    }

    // Rounding can leave a sliver of remainder after the last positive weight.
    last_positive
}

/// Runs a single Bernoulli trial succeeding with probability `chance`.
pub fn trial<R>(chance: f32, rng: &mut R) -> bool
where
    R: Rng + ?Sized,
{
    chance > 0.0 && rng.gen::<f32>() < chance
}

#[cfg(test)]
mod tests {
    use super::{select_weighted, trial, FALLBACK_INDEX};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn frequencies_follow_weights() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let trials = 100_000;
        let mut counts = [0_u32; 3];
        for _ in 0..trials {
            counts[select_weighted(&[2.0, 1.0, 1.0], &mut rng)] += 1;
        }

        let first = f64::from(counts[0]) / f64::from(trials);
        assert!((first - 0.5).abs() < 0.01, "observed {first}");
        let second = f64::from(counts[1]) / f64::from(trials);
        assert!((second - 0.25).abs() < 0.01, "observed {second}");
    }

    #[test]
    fn zero_weights_select_fallback() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..100 {
            assert_eq!(select_weighted(&[0.0, 0.0, 0.0], &mut rng), FALLBACK_INDEX);
        }
        assert_eq!(select_weighted(&[], &mut rng), FALLBACK_INDEX);
    }

    #[test]
    fn non_positive_weights_are_never_selected() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        for _ in 0..1_000 {
            assert_eq!(select_weighted(&[0.0, -1.0, 4.0, 0.0], &mut rng), 2);
        }
    }

    #[test]
    fn draws_are_reproducible_for_a_seed() {
        let weights = [1.0, 3.0, 0.5, 2.0];
        let mut first = ChaCha8Rng::seed_from_u64(99);
        let mut second = ChaCha8Rng::seed_from_u64(99);
        let a: Vec<usize> = (0..64).map(|_| select_weighted(&weights, &mut first)).collect();
        let b: Vec<usize> = (0..64).map(|_| select_weighted(&weights, &mut second)).collect();
        assert_eq!(a, b);
    }

    #[test]
    fn trial_extremes_are_certain() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..1_000 {
            assert!(!trial(0.0, &mut rng));
            assert!(trial(1.0, &mut rng));
        }
    }
}
