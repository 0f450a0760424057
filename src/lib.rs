//! bdg-replication - Bullying Dictator Game replication pipeline
//!
//! Downloads (or reuses a cached copy of) the experiment data, derives the
//! treatment labels and give amounts, runs the rank-sum and Kruskal-Wallis
//! tests with Benjamini-Hochberg correction, fits the hurdle count models
//! and renders an HTML report with SVG charts.

pub mod cli;
pub mod config;
pub mod dataset;
pub mod describe;
pub mod error;
pub mod html_output;
pub mod hurdle;
pub mod hypothesis;
pub mod pipeline;
pub mod plots;
pub mod special;
pub mod table;

#[cfg(test)]
mod testdata;

pub use config::AnalysisConfig;
pub use dataset::Dataset;
pub use error::{AnalysisError, Result, SchemaError};
pub use pipeline::{analyze, run, Report};
