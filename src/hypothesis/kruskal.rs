// Kruskal-Wallis rank test across k >= 2 groups

use super::rank::average_ranks;
use crate::special::chi_squared_sf;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KruskalWallisTest {
    /// Tie-corrected H statistic
    pub statistic: f64,
    pub df: usize,
    pub p_value: f64,
    /// Total observations across non-empty groups
    pub n: usize,
}

/// Run the test over the non-empty groups; `None` if fewer than two remain
pub fn kruskal_wallis(groups: &[Vec<f64>]) -> Option<KruskalWallisTest> {
    let groups: Vec<&Vec<f64>> = groups.iter().filter(|g| !g.is_empty()).collect();
    if groups.len() < 2 {
        return None;
    }

    let pooled: Vec<f64> = groups.iter().flat_map(|g| g.iter().copied()).collect();
    let ranking = average_ranks(&pooled);
    let n = pooled.len() as f64;

    let mut offset = 0;
    let mut weighted = 0.0;
    for group in &groups {
        let rank_sum: f64 = ranking.ranks[offset..offset + group.len()].iter().sum();
        weighted += rank_sum * rank_sum / group.len() as f64;
        offset += group.len();
    }

    let h = 12.0 / (n * (n + 1.0)) * weighted - 3.0 * (n + 1.0);
    let tie_factor = 1.0 - ranking.tie_term() / (n * n * n - n);
    let df = groups.len() - 1;

    // All values tied: H is undefined, report no difference
    let (statistic, p_value) = if tie_factor > 0.0 {
        let statistic = (h / tie_factor).max(0.0);
        (statistic, chi_squared_sf(statistic, df as f64))
    } else {
        (0.0, 1.0)
    };

    Some(KruskalWallisTest {
        statistic,
        df,
        p_value,
        n: pooled.len(),
    })
}
