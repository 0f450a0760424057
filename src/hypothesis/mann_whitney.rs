// Two-sample Wilcoxon rank-sum / Mann-Whitney U test
//
// W is the rank sum of the first sample minus n_a(n_a+1)/2, i.e. the number
// of (a, b) pairs with a > b (ties counting one half). Small tie-free samples
// use the exact null distribution; everything else uses the normal
// approximation with tie-corrected variance and a continuity correction.

use super::rank::average_ranks;
use crate::special::normal_two_sided;
use serde::Serialize;

/// How the p-value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PValueMethod {
    Exact,
    NormalApprox,
}

/// Result of a two-sided rank-sum test
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankSumTest {
    /// W statistic for the first sample
    pub statistic: f64,
    /// Standardized statistic (no continuity correction); sign follows W − E[W]
    pub z: f64,
    /// Two-sided p-value
    pub p_value: f64,
    pub n_a: usize,
    pub n_b: usize,
    pub method: PValueMethod,
}

/// Run the test; `None` if either sample is empty
///
/// `exact_threshold`: exact p-values are used when both samples are smaller
/// than this and there are no ties.
pub fn rank_sum_test(a: &[f64], b: &[f64], exact_threshold: usize) -> Option<RankSumTest> {
    if a.is_empty() || b.is_empty() {
        return None;
    }

    let n_a = a.len();
    let n_b = b.len();
    let pooled: Vec<f64> = a.iter().chain(b.iter()).copied().collect();
    let ranking = average_ranks(&pooled);

    let rank_sum_a: f64 = ranking.ranks[..n_a].iter().sum();
    let na = n_a as f64;
    let nb = n_b as f64;
    let statistic = rank_sum_a - na * (na + 1.0) / 2.0;

    let mean = na * nb / 2.0;
    let n = na + nb;
    let variance = (na * nb / 12.0) * ((n + 1.0) - ranking.tie_term() / (n * (n - 1.0)));
    let sigma = if variance > 0.0 { variance.sqrt() } else { 0.0 };
    let deviation = statistic - mean;
    let z = if sigma > 0.0 { deviation / sigma } else { 0.0 };

    let use_exact = n_a < exact_threshold && n_b < exact_threshold && !ranking.has_ties();

    let (p_value, method) = if use_exact {
        (exact_p_value(statistic, n_a, n_b), PValueMethod::Exact)
    } else if sigma > 0.0 {
        let correction = if deviation == 0.0 {
            0.0
        } else {
            0.5 * deviation.signum()
        };
        let z_corrected = (deviation - correction) / sigma;
        (normal_two_sided(z_corrected), PValueMethod::NormalApprox)
    } else {
        // Every value tied: no evidence of a difference
        (1.0, PValueMethod::NormalApprox)
    };

    Some(RankSumTest {
        statistic,
        z,
        p_value,
        n_a,
        n_b,
        method,
    })
}

/// Two-sided exact p-value for a tie-free W
fn exact_p_value(statistic: f64, n_a: usize, n_b: usize) -> f64 {
    let counts = rank_sum_distribution(n_a, n_b);
    let total: f64 = counts.iter().sum();
    let w = statistic.round() as usize;

    let tail = if statistic > (n_a * n_b) as f64 / 2.0 {
        counts[w..].iter().sum::<f64>()
    } else {
        counts[..=w].iter().sum::<f64>()
    };
    (2.0 * tail / total).min(1.0)
}

/// Null frequencies of W for sample sizes (m, n), indexed by W = 0..=m*n
///
/// Uses f(i, j, u) = f(i-1, j, u-j) + f(i, j-1, u), rolling over i.
pub(crate) fn rank_sum_distribution(m: usize, n: usize) -> Vec<f64> {
    // prev[j] holds the distribution for (i-1, j)
    let mut prev: Vec<Vec<f64>> = (0..=n).map(|_| vec![1.0]).collect();
    for i in 1..=m {
        let mut curr: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        curr.push(vec![1.0]);
        for j in 1..=n {
            let mut dist = vec![0.0; i * j + 1];
            // Largest element belongs to the first sample: shifts W by j
            for (u, &count) in prev[j].iter().enumerate() {
                dist[u + j] += count;
            }
            // Largest element belongs to the second sample
            for (u, &count) in curr[j - 1].iter().enumerate() {
                dist[u] += count;
            }
            curr.push(dist);
        }
        prev = curr;
    }
    prev.swap_remove(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() <= tol
    }

    #[test]
    fn test_distribution_total_is_binomial() {
        // C(7, 3) = 35 orderings
        let d = rank_sum_distribution(3, 4);
        assert_eq!(d.len(), 13);
        assert_eq!(d.iter().sum::<f64>(), 35.0);
        // Symmetric around m*n/2
        for u in 0..d.len() {
            assert_eq!(d[u], d[d.len() - 1 - u]);
        }
    }

    #[test]
    fn test_distribution_small_case() {
        // m = 2, n = 2: W in {0,1,2,2,3,4}
        assert_eq!(rank_sum_distribution(2, 2), vec![1.0, 1.0, 2.0, 1.0, 1.0]);
    }

    #[test]
    fn test_exact_complete_separation() {
        // Only 1 of C(6, 3) = 20 orderings is this extreme, on each side
        let t = rank_sum_test(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], 50).unwrap();
        assert_eq!(t.statistic, 0.0);
        assert_eq!(t.method, PValueMethod::Exact);
        assert!(close(t.p_value, 0.1, 1e-12));
    }

    #[test]
    fn test_exact_interleaved() {
        // 26 of the C(9, 4) = 126 orderings have W <= 6
        let t = rank_sum_test(&[1.1, 2.2, 3.3, 4.4], &[1.5, 2.5, 3.5, 4.5, 5.5], 50).unwrap();
        assert_eq!(t.statistic, 6.0);
        assert!(close(t.p_value, 26.0 / 63.0, 1e-12));
    }

    #[test]
    fn test_normal_approx_with_ties() {
        let t = rank_sum_test(&[1.0, 2.0, 2.0, 3.0], &[2.0, 3.0, 4.0, 4.0, 5.0], 50).unwrap();
        assert_eq!(t.method, PValueMethod::NormalApprox);
        assert_eq!(t.statistic, 2.5);
        assert!(close(t.p_value, 0.078_546, 1e-5), "p = {}", t.p_value);
        assert!(t.z < 0.0);
    }

    #[test]
    fn test_large_samples_use_normal_approx() {
        let a: Vec<f64> = (0..60).map(|i| i as f64).collect();
        let b: Vec<f64> = (0..60).map(|i| i as f64 + 0.5).collect();
        let t = rank_sum_test(&a, &b, 50).unwrap();
        assert_eq!(t.method, PValueMethod::NormalApprox);
        assert!(t.p_value > 0.5);
    }

    #[test]
    fn test_swap_symmetry() {
        let a = [3.0, 7.0, 7.0, 1.0, 9.0];
        let b = [2.0, 2.0, 4.0, 8.0];
        let ab = rank_sum_test(&a, &b, 50).unwrap();
        let ba = rank_sum_test(&b, &a, 50).unwrap();
        assert!(close(ab.statistic, 20.0 - ba.statistic, 1e-12));
        assert!(close(ab.z, -ba.z, 1e-12));
        assert!(close(ab.p_value, ba.p_value, 1e-12));
    }

    #[test]
    fn test_all_tied_gives_unit_p() {
        let t = rank_sum_test(&[5.0, 5.0], &[5.0, 5.0, 5.0], 50).unwrap();
        assert_eq!(t.p_value, 1.0);
        assert_eq!(t.z, 0.0);
    }

    #[test]
    fn test_empty_sample() {
        assert!(rank_sum_test(&[], &[1.0], 50).is_none());
        assert!(rank_sum_test(&[1.0], &[], 50).is_none());
    }
}
