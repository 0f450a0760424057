// Nonparametric hypothesis tests for the replication
//
// Pairwise two-sided Wilcoxon rank-sum (Mann-Whitney U) tests on `give`,
// grouped into families that are Benjamini-Hochberg adjusted together, plus
// Kruskal-Wallis omnibus tests across all levels of a factor.
//
// The comparison pairs are configuration records (see `config`), so the
// nine treatment/bully comparisons and the CRT comparisons run through the
// same code path. Recomputed p-values are checked against the printed ones
// without altering the algorithms to match them.

mod comparisons;
mod fdr;
mod kruskal;
mod mann_whitney;
mod rank;

pub use comparisons::{
    check_published, run_comparison, run_family, run_kruskal, ComparisonResult, KruskalResult,
    PublishedCheck,
};
pub use fdr::{benjamini_hochberg, discoveries};
pub use kruskal::{kruskal_wallis, KruskalWallisTest};
pub use mann_whitney::{rank_sum_test, PValueMethod, RankSumTest};
pub use rank::{average_ranks, Ranking};
