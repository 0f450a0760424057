// Average ranks with tie bookkeeping, shared by the rank-based tests

use std::cmp::Ordering;

/// Ranks of a pooled sample plus the sizes of its tie groups
#[derive(Debug, Clone, PartialEq)]
pub struct Ranking {
    /// 1-based average ranks, aligned with the input order
    pub ranks: Vec<f64>,
    /// Size of every group of tied values (singletons included)
    pub tie_sizes: Vec<usize>,
}

impl Ranking {
    pub fn has_ties(&self) -> bool {
        self.tie_sizes.iter().any(|&t| t > 1)
    }

    /// Σ (t³ − t) over tie groups, the variance correction term
    pub fn tie_term(&self) -> f64 {
        self.tie_sizes
            .iter()
            .map(|&t| {
                let t = t as f64;
                t * t * t - t
            })
            .sum()
    }
}

/// Rank values, giving tied values the mean of the ranks they span
pub fn average_ranks(values: &[f64]) -> Ranking {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| {
        values[i]
            .partial_cmp(&values[j])
            .unwrap_or(Ordering::Equal)
            .then(i.cmp(&j))
    });

    let mut ranks = vec![0.0; values.len()];
    let mut tie_sizes = Vec::new();
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        // Positions start..end share ranks start+1..=end
        let avg = (start + 1 + end) as f64 / 2.0;
        for &idx in &order[start..end] {
            ranks[idx] = avg;
        }
        tie_sizes.push(end - start);
        start = end;
    }

    Ranking { ranks, tie_sizes }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks_without_ties() {
        let r = average_ranks(&[30.0, 10.0, 20.0]);
        assert_eq!(r.ranks, vec![3.0, 1.0, 2.0]);
        assert!(!r.has_ties());
        assert_eq!(r.tie_term(), 0.0);
    }

    #[test]
    fn test_ranks_with_ties() {
        let r = average_ranks(&[5.0, 1.0, 5.0, 5.0, 0.0]);
        assert_eq!(r.ranks, vec![4.0, 2.0, 4.0, 4.0, 1.0]);
        assert!(r.has_ties());
        // One triple: 27 - 3
        assert_eq!(r.tie_term(), 24.0);
    }

    #[test]
    fn test_rank_sum_is_triangular() {
        let values = [3.0, 3.0, 1.0, 8.0, 8.0, 8.0, 2.0];
        let r = average_ranks(&values);
        let n = values.len() as f64;
        assert_eq!(r.ranks.iter().sum::<f64>(), n * (n + 1.0) / 2.0);
    }

    #[test]
    fn test_empty_input() {
        let r = average_ranks(&[]);
        assert!(r.ranks.is_empty());
        assert!(r.tie_sizes.is_empty());
    }
}
