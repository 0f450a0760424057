// Shared fixtures for the integration tests: a reproducible subject file

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const HEADER: &str = "treatment,bully,kept,crt_right,crt_int,female,household_income,ee,nb,ne";

/// `n` subjects cycling through treatment x bully cells, one CSV row each
pub fn synthetic_csv(n: usize, seed: u64) -> String {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = String::from(HEADER);
    out.push('\n');

    for i in 0..n {
        let treatment = ["C", "TD", "MD"][i % 3];
        let bully = (i / 3) % 2;
        let crt_right: i64 = rng.gen_range(0..4);
        let crt_int = rng.gen_range(0..4_i64).min(3 - crt_right);
        let female = i64::from(rng.gen_bool(0.5));
        let income: i64 = rng.gen_range(1..=8);

        let linear = 0.4 + 0.3 * (i % 3) as f64 - 0.8 * bully as f64 + 0.2 * crt_right as f64;
        let give = if rng.gen::<f64>() < 1.0 / (1.0 + (-linear).exp()) {
            let scale = 8.0 + 6.0 * (i % 3) as f64 + 4.0 * female as f64;
            ((1.0 + (rng.gen::<f64>() * 2.0 * scale).floor()) as i64).min(60)
        } else {
            0
        };
        let ee: i64 = rng.gen_range(0..=60);
        let nb: i64 = rng.gen_range(0..=60);
        let ne: i64 = rng.gen_range(0..=60);

        let _ = writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{}",
            treatment,
            bully,
            60 - give,
            crt_right,
            crt_int,
            female,
            income,
            ee,
            nb,
            ne
        );
    }
    out
}

pub fn write_synthetic_csv(path: &Path, n: usize, seed: u64) {
    fs::write(path, synthetic_csv(n, seed)).expect("write fixture csv");
}
