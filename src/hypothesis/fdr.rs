// Benjamini-Hochberg false discovery rate adjustment

use std::cmp::Ordering;

/// BH step-up adjusted p-values, in the input order
///
/// Sort ascending, scale p_(i) by m/i, take the running minimum from the
/// largest rank down, clip to [0, 1]. NaN inputs stay NaN and do not count
/// toward m.
pub fn benjamini_hochberg(pvalues: &[f64]) -> Vec<f64> {
    let mut adjusted = vec![f64::NAN; pvalues.len()];

    let mut order: Vec<usize> = (0..pvalues.len())
        .filter(|&i| !pvalues[i].is_nan())
        .collect();
    let m = order.len();
    if m == 0 {
        return adjusted;
    }

    order.sort_by(|&i, &j| {
        pvalues[i]
            .partial_cmp(&pvalues[j])
            .unwrap_or(Ordering::Equal)
            .then(i.cmp(&j))
    });

    let mut running_min = 1.0_f64;
    for (rank0, &idx) in order.iter().enumerate().rev() {
        let rank = rank0 + 1;
        let candidate = pvalues[idx] * m as f64 / rank as f64;
        running_min = running_min.min(candidate);
        adjusted[idx] = running_min.clamp(0.0, 1.0);
    }

    adjusted
}

/// Which adjusted p-values fall at or below `alpha`
pub fn discoveries(adjusted: &[f64], alpha: f64) -> Vec<bool> {
    adjusted.iter().map(|&q| q <= alpha).collect()
}
