//! Rank-biased index picker shared by single- and multi-objective breeding
//! (§4.4). Lower indices are assumed fitter, matching a just-sorted
//! population or layer.

/// Draws `u` from the thread-local RNG and returns a biased index in
/// `[0, n)`. `beta == 0` is uniform; larger `beta` sharply favors index 0.
pub fn pick_index(beta: f64, n: usize) -> usize {
    let u = crate::random_provider::unit();
    pick_index_with(beta, n, u)
}

/// Pure, deterministic core of [`pick_index`], exposed for property tests
/// that need to sweep `u` exhaustively.
pub fn pick_index_with(beta: f64, n: usize, u: f64) -> usize {
    debug_assert!(n > 0, "pick_index_with requires a non-empty range");

    let exponent = 1.0 / (1.0 + beta);
    let raw = (1.0 - u.powf(exponent)) * n as f64;
    let idx = raw.floor() as i64;

    idx.clamp(0, n as i64 - 1) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_in_bounds_for_sampled_u() {
        let mut u = 0.0;
        while u < 1.0 {
            for n in 1..20 {
                let idx = pick_index_with(2.5, n, u);
                assert!(idx < n, "idx {idx} out of bounds for n {n} (u={u})");
            }
            u += 0.01;
        }
    }

    #[test]
    fn zero_beta_is_uniform_identity_at_extremes() {
        // beta=0 reduces to raw = (1 - u) * n: u near 0 lands near the top
        // index (clamped to n-1), u near 1 lands near index 0.
        assert_eq!(pick_index_with(0.0, 10, 0.0), 9);
        assert!(pick_index_with(0.0, 10, 0.999999) <= 1);
    }

    #[test]
    fn large_beta_favors_low_indices() {
        let low_hits = (0..1000)
            .map(|i| pick_index_with(50.0, 100, i as f64 / 1000.0))
            .filter(|&idx| idx < 10)
            .count();
        // A sharply biased picker should land in the first decile far more
        // than 10% of the time.
        assert!(low_hits > 500, "expected strong low-index bias, got {low_hits}/1000");
    }

    #[test]
    fn single_element_range_always_returns_zero() {
        for i in 0..100 {
            assert_eq!(pick_index_with(1.3, 1, i as f64 / 100.0), 0);
        }
    }

    #[rstest::rstest]
    #[case(0.0, 10, 0.0, 9)]
    #[case(0.0, 8, 0.25, 6)]
    #[case(0.0, 8, 0.875, 1)]
    #[case(5.0, 20, 0.0, 19)]
    #[case(10.0, 50, 0.5, 3)]
    fn pick_index_matches_worked_examples(
        #[case] beta: f64,
        #[case] n: usize,
        #[case] u: f64,
        #[case] expected: usize,
    ) {
        assert_eq!(pick_index_with(beta, n, u), expected);
    }
}
